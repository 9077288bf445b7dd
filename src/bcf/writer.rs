//! BCF record encoder, writing into a BGZF-wrapped stream.
//!
//! Preserves a known limitation of the source encoder this is grounded on:
//! it never emits per-sample (`l_indiv`) bytes or a non-empty FILTER vector,
//! and INFO is passed through as an opaque byte blob rather than typed
//! key/value pairs. See `DESIGN.md`.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::value::{self, MISSING_FLOAT_BITS};
use crate::bgzf::writer::BgzfWriter;
use crate::bgzf::Compression;
use crate::error::Result;

/// A record to encode. `alts`, `filters` and `info` are accepted in the
/// shapes the writer can actually emit today (see the module doc).
pub struct BcfRecordInput<'a> {
    pub chrom_id: i32,
    /// 1-based position, matching the VCF convention; stored on disk 0-based.
    pub pos: i32,
    pub id: &'a [u8],
    pub reference: &'a [u8],
    pub alts: &'a [&'a [u8]],
    pub qual: Option<f32>,
    pub info: &'a [u8],
}

/// Writes a BCF stream: the `BCF\2\2` magic, a length-prefixed textual VCF
/// header, then one encoded record per `write_record` call.
pub struct BcfWriter<W: Write> {
    inner: BgzfWriter<W>,
    scratch: Vec<u8>,
}

impl<W: Write> BcfWriter<W> {
    pub fn new(writer: W, vcf_header_text: &str) -> Result<Self> {
        let mut inner = BgzfWriter::new(writer, Compression::default());
        inner.write_all(b"BCF\x02\x02")?;
        let len: u16 = vcf_header_text
            .len()
            .try_into()
            .map_err(|_| crate::error::SeqioError::Encoding("VCF header text too long for BCF"))?;
        inner.write_all(&len.to_le_bytes())?;
        inner.write_all(vcf_header_text.as_bytes())?;
        Ok(BcfWriter {
            inner,
            scratch: Vec::new(),
        })
    }

    pub fn write_record(&mut self, record: &BcfRecordInput<'_>) -> Result<()> {
        self.scratch.clear();
        let buf = &mut self.scratch;

        let l_shared_placeholder = buf.len();
        buf.extend_from_slice(&0u32.to_le_bytes()); // l_shared, backpatched below
        buf.extend_from_slice(&0u32.to_le_bytes()); // l_indiv: always 0, see module doc

        buf.extend_from_slice(&record.chrom_id.to_le_bytes());
        buf.extend_from_slice(&(record.pos - 1).to_le_bytes());
        let rlen = 0i32; // reference-allele length is not computed by this encoder
        buf.extend_from_slice(&rlen.to_le_bytes());

        let qual_bits = record
            .qual
            .map(f32::to_bits)
            .unwrap_or(MISSING_FLOAT_BITS);
        buf.extend_from_slice(&qual_bits.to_le_bytes());

        let n_info: i16 = 0; // INFO is written as a raw blob, not typed fields
        let n_allele: i16 = (1 + record.alts.len())
            .try_into()
            .map_err(|_| crate::error::SeqioError::Encoding("too many alleles"))?;
        buf.extend_from_slice(&n_info.to_le_bytes());
        buf.extend_from_slice(&n_allele.to_le_bytes());

        let n_sample_and_fmt: i32 = 0; // no per-sample data is ever emitted
        buf.extend_from_slice(&n_sample_and_fmt.to_le_bytes());

        value::write_string(buf, record.id)?;
        value::write_string(buf, record.reference)?;
        for alt in record.alts {
            value::write_string(buf, alt)?;
        }

        value::write_int_vector(buf, &[])?; // FILTER: always empty, see module doc

        buf.extend_from_slice(record.info);

        let l_shared = (buf.len() - l_shared_placeholder - 8) as u32;
        buf[l_shared_placeholder..l_shared_placeholder + 4].copy_from_slice(&l_shared.to_le_bytes());

        self.inner.write_all(&self.scratch)?;
        Ok(())
    }

    pub fn close(self) -> std::io::Result<()> {
        self.inner.close()
    }
}

impl BcfWriter<File> {
    /// Creates (or truncates) a file at `path` and writes the BCF prelude.
    pub fn create(path: impl AsRef<Path>, vcf_header_text: &str) -> Result<Self> {
        BcfWriter::new(File::create(path)?, vcf_header_text)
    }
}
