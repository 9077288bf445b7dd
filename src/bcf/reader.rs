//! BCF record decoder, reading over a BGZF-decompressed source.

use super::value::{self, Value, MISSING_FLOAT_BITS};
use crate::bgzf::BgzfSource;
use crate::buffered_reader::BufferedReader;
use crate::config::{open_plain_source, Config, PlainSource};
use crate::error::{Result, SeqioError};
use crate::source::ByteSource;

const MAGIC: &[u8; 5] = b"BCF\x02\x02";

/// A decoded BCF record. Variable-length fields (`id`, `ref`, `alts`) borrow
/// from the reader's internal buffer; `info` is the opaque trailing blob the
/// source format carries instead of typed INFO fields (see `bcf::writer`).
#[derive(Debug, Clone, PartialEq)]
pub struct BcfRecordView<'a> {
    pub chrom_id: i32,
    /// 1-based, converted from the 0-based on-disk position.
    pub pos: i32,
    pub rlen: i32,
    pub qual: Option<f32>,
    pub n_info: i16,
    pub n_allele: i16,
    pub n_sample: i32,
    pub n_fmt: u8,
    pub id: &'a [u8],
    pub reference: &'a [u8],
    pub alts: Vec<&'a [u8]>,
    pub filters: Vec<i64>,
    pub info: &'a [u8],
}

impl<'a> BcfRecordView<'a> {
    pub fn to_owned(&self) -> BcfRecord {
        BcfRecord {
            chrom_id: self.chrom_id,
            pos: self.pos,
            rlen: self.rlen,
            qual: self.qual,
            n_info: self.n_info,
            n_allele: self.n_allele,
            n_sample: self.n_sample,
            n_fmt: self.n_fmt,
            id: self.id.to_vec(),
            reference: self.reference.to_vec(),
            alts: self.alts.iter().map(|s| s.to_vec()).collect(),
            filters: self.filters.clone(),
            info: self.info.to_vec(),
        }
    }
}

/// An owned copy of a [`BcfRecordView`], usable past the next `next()` call.
#[derive(Debug, Clone, PartialEq)]
pub struct BcfRecord {
    pub chrom_id: i32,
    pub pos: i32,
    pub rlen: i32,
    pub qual: Option<f32>,
    pub n_info: i16,
    pub n_allele: i16,
    pub n_sample: i32,
    pub n_fmt: u8,
    pub id: Vec<u8>,
    pub reference: Vec<u8>,
    pub alts: Vec<Vec<u8>>,
    pub filters: Vec<i64>,
    pub info: Vec<u8>,
}

/// Streams BCF records out of a [`BufferedReader`] whose source has already
/// been unwrapped from BGZF (see [`BcfReader::new`], which does this for
/// callers).
pub struct BcfReader<S> {
    reader: BufferedReader<BgzfSource<S>>,
    cursor: usize,
    pub header_text: String,
}

impl<S: ByteSource> BcfReader<S> {
    pub fn new(source: S) -> Result<Self> {
        const PREFIX_LEN: usize = 7; // 5-byte magic + u16 header length
        let mut reader = BufferedReader::new(BgzfSource::new(source));
        let window = reader.read(PREFIX_LEN)?;
        if window.len() < PREFIX_LEN || &window[0..5] != MAGIC {
            return Err(SeqioError::MalformedHeader("missing BCF magic"));
        }
        let header_len = u16::from_le_bytes(window[5..7].try_into().unwrap()) as usize;
        let window = reader.read(PREFIX_LEN + header_len)?;
        if window.len() < PREFIX_LEN + header_len {
            return Err(SeqioError::Truncated);
        }
        let header_text =
            String::from_utf8_lossy(reader.string_view(PREFIX_LEN, PREFIX_LEN + header_len)).into_owned();
        let cursor = PREFIX_LEN + header_len;

        Ok(BcfReader {
            reader,
            cursor,
            header_text,
        })
    }

    pub fn next(&mut self) -> Result<Option<BcfRecordView<'_>>> {
        self.reader.drop_until(self.cursor);
        self.cursor = 0;

        if self.reader.read(1)?.is_empty() && self.reader.eof(0) {
            return Ok(None);
        }

        let window = self.reader.read(8)?;
        if window.len() < 8 {
            return Err(SeqioError::Truncated);
        }
        let l_shared = u32::from_le_bytes(window[0..4].try_into().unwrap()) as usize;
        let l_indiv = u32::from_le_bytes(window[4..8].try_into().unwrap()) as usize;

        let record_end = 8 + l_shared + l_indiv;
        self.reader.read(record_end)?;
        if self.reader.len() < record_end {
            return Err(SeqioError::Truncated);
        }

        let data = self.reader.string_view(0, record_end);
        let chrom_id = i32::from_le_bytes(data[8..12].try_into().unwrap());
        let pos_on_disk = i32::from_le_bytes(data[12..16].try_into().unwrap());
        let rlen = i32::from_le_bytes(data[16..20].try_into().unwrap());
        let qual_bits = u32::from_le_bytes(data[20..24].try_into().unwrap());
        let qual = if qual_bits == MISSING_FLOAT_BITS {
            None
        } else {
            Some(f32::from_bits(qual_bits))
        };
        let n_info = i16::from_le_bytes(data[24..26].try_into().unwrap());
        let n_allele = i16::from_le_bytes(data[26..28].try_into().unwrap());
        let n_sample_and_fmt = u32::from_le_bytes(data[28..32].try_into().unwrap());
        let n_sample = (n_sample_and_fmt & 0x00FF_FFFF) as i32;
        let n_fmt = (n_sample_and_fmt >> 24) as u8;

        let mut pos = 32usize;
        let (id_value, next) = value::decode(data, pos)?;
        pos = next;
        let id = match id_value {
            Value::String(s) => s,
            _ => return Err(SeqioError::Malformed("BCF id field is not a string")),
        };

        let (ref_value, next) = value::decode(data, pos)?;
        pos = next;
        let reference = match ref_value {
            Value::String(s) => s,
            _ => return Err(SeqioError::Malformed("BCF ref field is not a string")),
        };

        let mut alts = Vec::with_capacity((n_allele.max(1) - 1) as usize);
        for _ in 0..(n_allele.max(1) - 1) {
            let (alt_value, next) = value::decode(data, pos)?;
            pos = next;
            match alt_value {
                Value::String(s) => alts.push(s),
                _ => return Err(SeqioError::Malformed("BCF alt field is not a string")),
            }
        }

        let (filter_value, next) = value::decode(data, pos)?;
        pos = next;
        let filters = match filter_value {
            Value::Int(v) => v,
            _ => return Err(SeqioError::Malformed("BCF filter field is not an int vector")),
        };

        let shared_end = 8 + l_shared;
        let info = &data[pos..shared_end];

        self.cursor = record_end;

        Ok(Some(BcfRecordView {
            chrom_id,
            pos: pos_on_disk + 1,
            rlen,
            qual,
            n_info,
            n_allele,
            n_sample,
            n_fmt,
            id,
            reference,
            alts,
            filters,
            info,
        }))
    }
}

impl<'a> BcfReader<PlainSource<'a>> {
    pub fn open(config: Config<'a>) -> Result<Self> {
        BcfReader::new(open_plain_source(config)?)
    }
}
