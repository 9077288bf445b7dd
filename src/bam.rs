//! BAM (Binary Alignment/Map) decoder, read over a BGZF-decompressed source.

use crate::buffered_reader::BufferedReader;
use crate::config::{open_source, AnySource, Config};
use crate::error::{Result, SeqioError};
use crate::source::ByteSource;

const MAGIC: &[u8; 4] = b"BAM\x01";

/// A single entry of the BAM reference dictionary (`n_ref` block).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSequence {
    pub name: String,
    pub length: i32,
}

/// A BAM record, borrowed from the reader's internal buffer where the spec
/// calls for borrowed fields (`read_name`, `seq`, `qual`, `aux`); `cigar` is
/// decoded eagerly into owned `u32` operations since it is read a word at a
/// time regardless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BamRecordView<'a> {
    pub ref_id: i32,
    pub pos: i32,
    pub mapq: u8,
    pub bin: u16,
    pub flag: u16,
    pub next_ref_id: i32,
    pub next_pos: i32,
    pub tlen: i32,
    pub read_name: &'a [u8],
    pub cigar: Vec<u32>,
    /// 4-bit packed bases, two per byte, `l_seq` bases total.
    pub seq: &'a [u8],
    pub l_seq: i32,
    pub qual: &'a [u8],
    pub aux: &'a [u8],
}

impl<'a> BamRecordView<'a> {
    pub fn to_owned(&self) -> BamRecord {
        BamRecord {
            ref_id: self.ref_id,
            pos: self.pos,
            mapq: self.mapq,
            bin: self.bin,
            flag: self.flag,
            next_ref_id: self.next_ref_id,
            next_pos: self.next_pos,
            tlen: self.tlen,
            read_name: self.read_name.to_vec(),
            cigar: self.cigar.clone(),
            seq: self.seq.to_vec(),
            l_seq: self.l_seq,
            qual: self.qual.to_vec(),
            aux: self.aux.to_vec(),
        }
    }
}

/// An owned copy of a [`BamRecordView`], usable past the next `next()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BamRecord {
    pub ref_id: i32,
    pub pos: i32,
    pub mapq: u8,
    pub bin: u16,
    pub flag: u16,
    pub next_ref_id: i32,
    pub next_pos: i32,
    pub tlen: i32,
    pub read_name: Vec<u8>,
    pub cigar: Vec<u32>,
    pub seq: Vec<u8>,
    pub l_seq: i32,
    pub qual: Vec<u8>,
    pub aux: Vec<u8>,
}

/// Streams BAM records out of a [`BufferedReader`] whose source has already
/// been unwrapped from BGZF (see [`crate::bgzf::BgzfSource`]).
pub struct BamReader<S> {
    reader: BufferedReader<S>,
    cursor: usize,
    pub header_text: String,
    pub reference_sequences: Vec<ReferenceSequence>,
}

impl<S: ByteSource> BamReader<S> {
    pub fn new(source: S) -> Result<Self> {
        let mut reader = BufferedReader::new(source);
        let cursor = read_file_header(&mut reader)?;
        let (header_text, reference_sequences, cursor) = read_reference_dict(&mut reader, cursor)?;
        Ok(BamReader {
            reader,
            cursor,
            header_text,
            reference_sequences,
        })
    }

    pub fn next(&mut self) -> Result<Option<BamRecordView<'_>>> {
        self.reader.drop_until(self.cursor);
        self.cursor = 0;

        if self.reader.read(4)?.len() < 4 && self.reader.eof(0) {
            return Ok(None);
        }
        let window = self.reader.read(4)?;
        if window.len() < 4 {
            return Err(SeqioError::Truncated);
        }
        let block_size = i32::from_le_bytes(window[0..4].try_into().unwrap()) as usize;

        let record_end = 4 + block_size;
        self.reader.read(record_end)?;
        if self.reader.eof(0) || self.reader.len() < record_end {
            return Err(SeqioError::Truncated);
        }

        let mut cur = 4usize;
        fn body<S: ByteSource>(this: &BufferedReader<S>, at: usize, len: usize) -> &[u8] {
            this.string_view(at, at + len)
        }

        let ref_id = i32::from_le_bytes(body(&self.reader, cur, 4).try_into().unwrap());
        cur += 4;
        let pos = i32::from_le_bytes(body(&self.reader, cur, 4).try_into().unwrap());
        cur += 4;
        let l_read_name = body(&self.reader, cur, 1)[0] as usize;
        cur += 1;
        let mapq = body(&self.reader, cur, 1)[0];
        cur += 1;
        let bin = u16::from_le_bytes(body(&self.reader, cur, 2).try_into().unwrap());
        cur += 2;
        let n_cigar_op = u16::from_le_bytes(body(&self.reader, cur, 2).try_into().unwrap()) as usize;
        cur += 2;
        let flag = u16::from_le_bytes(body(&self.reader, cur, 2).try_into().unwrap());
        cur += 2;
        let l_seq = i32::from_le_bytes(body(&self.reader, cur, 4).try_into().unwrap());
        cur += 4;
        let next_ref_id = i32::from_le_bytes(body(&self.reader, cur, 4).try_into().unwrap());
        cur += 4;
        let next_pos = i32::from_le_bytes(body(&self.reader, cur, 4).try_into().unwrap());
        cur += 4;
        let tlen = i32::from_le_bytes(body(&self.reader, cur, 4).try_into().unwrap());
        cur += 4;

        let read_name_start = cur;
        cur += l_read_name;
        let read_name = {
            let raw = body(&self.reader, read_name_start, l_read_name);
            raw.strip_suffix(&[0]).unwrap_or(raw)
        };

        let cigar_start = cur;
        cur += 4 * n_cigar_op;
        let cigar: Vec<u32> = body(&self.reader, cigar_start, 4 * n_cigar_op)
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();

        let seq_bytes = (l_seq as usize).div_ceil(2);
        let seq_start = cur;
        cur += seq_bytes;
        let seq = body(&self.reader, seq_start, seq_bytes);

        let qual_start = cur;
        cur += l_seq as usize;
        let qual = body(&self.reader, qual_start, l_seq as usize);

        let aux_start = cur;
        let aux_len = record_end - aux_start;
        let aux = body(&self.reader, aux_start, aux_len);

        self.cursor = record_end;

        Ok(Some(BamRecordView {
            ref_id,
            pos,
            mapq,
            bin,
            flag,
            next_ref_id,
            next_pos,
            tlen,
            read_name,
            cigar,
            seq,
            l_seq,
            qual,
            aux,
        }))
    }
}

impl<'a> BamReader<AnySource<'a>> {
    pub fn open(config: Config<'a>) -> Result<Self> {
        BamReader::new(open_source(config)?)
    }
}

fn read_file_header<S: ByteSource>(reader: &mut BufferedReader<S>) -> Result<usize> {
    let window = reader.read(4)?;
    if window.len() < 4 || &window[0..4] != MAGIC {
        return Err(SeqioError::MalformedHeader("missing BAM magic"));
    }
    Ok(4)
}

fn read_reference_dict<S: ByteSource>(
    reader: &mut BufferedReader<S>,
    mut cur: usize,
) -> Result<(String, Vec<ReferenceSequence>, usize)> {
    let window = reader.read(cur + 4)?;
    if window.len() < cur + 4 {
        return Err(SeqioError::Truncated);
    }
    let l_text = i32::from_le_bytes(window[cur..cur + 4].try_into().unwrap()) as usize;
    cur += 4;

    let window = reader.read(cur + l_text)?;
    if window.len() < cur + l_text {
        return Err(SeqioError::Truncated);
    }
    let header_text = String::from_utf8_lossy(reader.string_view(cur, cur + l_text)).into_owned();
    cur += l_text;

    let window = reader.read(cur + 4)?;
    if window.len() < cur + 4 {
        return Err(SeqioError::Truncated);
    }
    let n_ref = i32::from_le_bytes(reader.string_view(cur, cur + 4).try_into().unwrap());
    cur += 4;

    let mut reference_sequences = Vec::with_capacity(n_ref.max(0) as usize);
    for _ in 0..n_ref {
        let window = reader.read(cur + 4)?;
        if window.len() < cur + 4 {
            return Err(SeqioError::Truncated);
        }
        let l_name = i32::from_le_bytes(reader.string_view(cur, cur + 4).try_into().unwrap()) as usize;
        cur += 4;

        let window = reader.read(cur + l_name + 4)?;
        if window.len() < cur + l_name + 4 {
            return Err(SeqioError::Truncated);
        }
        let raw_name = reader.string_view(cur, cur + l_name);
        let name = String::from_utf8_lossy(raw_name.strip_suffix(&[0]).unwrap_or(raw_name)).into_owned();
        cur += l_name;
        let length = i32::from_le_bytes(reader.string_view(cur, cur + 4).try_into().unwrap());
        cur += 4;

        reference_sequences.push(ReferenceSequence { name, length });
    }

    Ok((header_text, reference_sequences, cur))
}

#[cfg(test)]
mod test {
    use super::*;

    fn push_cstr(buf: &mut Vec<u8>, s: &str) {
        buf.extend_from_slice(s.as_bytes());
        buf.push(0);
    }

    fn sample_bam_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        let header_text = "@HD\tVN:1.6\n";
        buf.extend_from_slice(&(header_text.len() as i32).to_le_bytes());
        buf.extend_from_slice(header_text.as_bytes());
        buf.extend_from_slice(&1i32.to_le_bytes()); // n_ref
        let mut name = Vec::new();
        push_cstr(&mut name, "chr1");
        buf.extend_from_slice(&(name.len() as i32).to_le_bytes());
        buf.extend_from_slice(&name);
        buf.extend_from_slice(&248_956_422i32.to_le_bytes());

        // one record: read_name "r1\0", no cigar, 4-base seq, qual, no aux.
        let mut read_name = Vec::new();
        push_cstr(&mut read_name, "r1");
        let l_seq = 4i32;
        let seq_bytes = vec![0x12u8, 0x40u8]; // A,C,G,= packed (values are arbitrary)
        let qual_bytes = vec![30u8, 30, 30, 30];

        let block_size = 32 + read_name.len() + 0 /* cigar */ + seq_bytes.len() + qual_bytes.len();
        buf.extend_from_slice(&(block_size as i32).to_le_bytes());
        buf.extend_from_slice(&0i32.to_le_bytes()); // ref_id
        buf.extend_from_slice(&100i32.to_le_bytes()); // pos
        buf.push(read_name.len() as u8); // l_read_name
        buf.push(60u8); // mapq
        buf.extend_from_slice(&0u16.to_le_bytes()); // bin
        buf.extend_from_slice(&0u16.to_le_bytes()); // n_cigar_op
        buf.extend_from_slice(&0u16.to_le_bytes()); // flag
        buf.extend_from_slice(&l_seq.to_le_bytes());
        buf.extend_from_slice(&(-1i32).to_le_bytes()); // next_ref_id
        buf.extend_from_slice(&(-1i32).to_le_bytes()); // next_pos
        buf.extend_from_slice(&0i32.to_le_bytes()); // tlen
        buf.extend_from_slice(&read_name);
        buf.extend_from_slice(&seq_bytes);
        buf.extend_from_slice(&qual_bytes);

        buf
    }

    #[test]
    fn parses_header_and_single_record() -> anyhow::Result<()> {
        let mut r = BamReader::new(std::io::Cursor::new(sample_bam_bytes()))?;
        assert_eq!(r.header_text, "@HD\tVN:1.6\n");
        assert_eq!(r.reference_sequences.len(), 1);
        assert_eq!(r.reference_sequences[0].name, "chr1");
        assert_eq!(r.reference_sequences[0].length, 248_956_422);

        let rec = r.next()?.unwrap();
        assert_eq!(rec.read_name, b"r1");
        assert_eq!(rec.pos, 100);
        assert_eq!(rec.mapq, 60);
        assert_eq!(rec.l_seq, 4);
        assert!(rec.cigar.is_empty());
        assert_eq!(rec.qual, &[30, 30, 30, 30]);

        assert!(r.next()?.is_none());
        Ok(())
    }

    #[test]
    fn rejects_bad_magic() {
        match BamReader::new(std::io::Cursor::new(b"nope".to_vec())) {
            Err(SeqioError::MalformedHeader(_)) => {}
            Err(other) => panic!("expected MalformedHeader, got {other:?}"),
            Ok(_) => panic!("expected MalformedHeader, got Ok"),
        }
    }
}
