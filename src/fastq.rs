//! FASTQ record decoder.

use crate::buffered_reader::BufferedReader;
use crate::config::{open_source, AnySource, Config};
use crate::error::{Result, SeqioError};
use crate::source::ByteSource;

/// A FASTQ record borrowed from the reader's internal buffer. Valid until
/// the next call to [`FastqReader::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastqRecordView<'a> {
    pub id: &'a [u8],
    pub seq: &'a [u8],
    pub qual: &'a [u8],
}

impl<'a> FastqRecordView<'a> {
    pub fn to_owned(&self) -> FastqRecord {
        FastqRecord {
            id: self.id.to_vec(),
            seq: self.seq.to_vec(),
            qual: self.qual.to_vec(),
        }
    }
}

/// An owned copy of a [`FastqRecordView`], usable past the next `next()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastqRecord {
    pub id: Vec<u8>,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Streams FASTQ records out of a [`BufferedReader`], four source lines at a
/// time.
pub struct FastqReader<S> {
    reader: BufferedReader<S>,
    cursor: usize,
}

impl<S: ByteSource> FastqReader<S> {
    pub fn new(source: S) -> Self {
        FastqReader {
            reader: BufferedReader::new(source),
            cursor: 0,
        }
    }

    fn next_line(&mut self, from: usize) -> Result<(usize, usize)> {
        let end = self.reader.read_until(b'\n', from)?;
        let next = if self.reader.eof(end) { end } else { end + 1 };
        Ok((end, next))
    }

    pub fn next(&mut self) -> Result<Option<FastqRecordView<'_>>> {
        self.reader.drop_until(self.cursor);
        self.cursor = 0;

        if self.reader.read(1)?.is_empty() && self.reader.eof(0) {
            return Ok(None);
        }
        if self.reader.string_view(0, 1)[0] != b'@' {
            return Err(SeqioError::Malformed("FASTQ record must start with '@'"));
        }

        let (id_end, seq_start) = self.next_line(0)?;
        let id = strip_cr(self.reader.string_view(1, id_end));
        let id_len = id.len();

        let (seq_end, plus_start) = self.next_line(seq_start)?;
        if self.reader.eof(seq_start) {
            return Err(SeqioError::Truncated);
        }

        if self.reader.eof(plus_start) || self.reader.string_view(plus_start, plus_start + 1)[0] != b'+' {
            return Err(SeqioError::Malformed("FASTQ third line must start with '+'"));
        }
        let (_plus_end, qual_start) = self.next_line(plus_start)?;

        if self.reader.eof(qual_start) {
            return Err(SeqioError::Truncated);
        }
        let (qual_end, next_record) = self.next_line(qual_start)?;

        let seq = strip_cr(self.reader.string_view(seq_start, seq_end));
        let seq_len = seq.len();
        let qual = strip_cr(self.reader.string_view(qual_start, qual_end));

        if seq_len != qual.len() {
            return Err(SeqioError::Malformed("FASTQ seq/qual length mismatch"));
        }

        let id = self.reader.string_view(1, 1 + id_len);
        let seq = self.reader.string_view(seq_start, seq_start + seq_len);
        let qual = self.reader.string_view(qual_start, qual_start + qual.len());

        self.cursor = next_record;

        Ok(Some(FastqRecordView { id, seq, qual }))
    }
}

impl<'a> FastqReader<AnySource<'a>> {
    pub fn open(config: Config<'a>) -> Result<Self> {
        Ok(FastqReader::new(open_source(config)?))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn reader_over(data: &[u8]) -> FastqReader<std::io::Cursor<Vec<u8>>> {
        FastqReader::new(std::io::Cursor::new(data.to_vec()))
    }

    #[test]
    fn parses_single_record() -> anyhow::Result<()> {
        let mut r = reader_over(b"@r\nACGT\n+\n!!!!\n");
        let rec = r.next()?.unwrap();
        assert_eq!(rec.id, b"r");
        assert_eq!(rec.seq, b"ACGT");
        assert_eq!(rec.qual, b"!!!!");
        assert!(r.next()?.is_none());
        Ok(())
    }

    #[test]
    fn allows_at_sign_inside_quality_line() -> anyhow::Result<()> {
        let mut r = reader_over(b"@r\nACGT\n+\n@!@!\n");
        let rec = r.next()?.unwrap();
        assert_eq!(rec.qual, b"@!@!");
        Ok(())
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut r = reader_over(b"@r\nACGT\n+\n!!\n");
        assert!(matches!(r.next(), Err(SeqioError::Malformed(_))));
    }

    #[test]
    fn rejects_missing_plus_line() {
        let mut r = reader_over(b"@r\nACGT\nX\n!!!!\n");
        assert!(matches!(r.next(), Err(SeqioError::Malformed(_))));
    }

    #[test]
    fn multiple_records() -> anyhow::Result<()> {
        let mut r = reader_over(b"@r1\nAC\n+\n!!\n@r2\nGT\n+\n##\n");
        let rec = r.next()?.unwrap();
        assert_eq!(rec.id, b"r1");
        let rec = r.next()?.unwrap();
        assert_eq!(rec.id, b"r2");
        assert_eq!(rec.qual, b"##");
        assert!(r.next()?.is_none());
        Ok(())
    }
}
