//! FASTA record decoder.

use crate::buffered_reader::BufferedReader;
use crate::config::{open_source, AnySource, Config};
use crate::error::{Result, SeqioError};
use crate::source::ByteSource;

/// A FASTA record borrowed from the reader's internal buffer. Valid until
/// the next call to [`FastaReader::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastaRecordView<'a> {
    pub id: &'a [u8],
    pub desc: &'a [u8],
    pub seq: &'a [u8],
}

impl<'a> FastaRecordView<'a> {
    pub fn to_owned(&self) -> FastaRecord {
        FastaRecord {
            id: self.id.to_vec(),
            desc: self.desc.to_vec(),
            seq: self.seq.to_vec(),
        }
    }
}

/// An owned copy of a [`FastaRecordView`], usable past the next `next()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub id: Vec<u8>,
    pub desc: Vec<u8>,
    pub seq: Vec<u8>,
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Streams FASTA records out of a [`BufferedReader`].
pub struct FastaReader<S> {
    reader: BufferedReader<S>,
    cursor: usize,
    stitched: Vec<u8>,
}

impl<S: ByteSource> FastaReader<S> {
    pub fn new(source: S) -> Self {
        FastaReader {
            reader: BufferedReader::new(source),
            cursor: 0,
            stitched: Vec::new(),
        }
    }

    pub fn next(&mut self) -> Result<Option<FastaRecordView<'_>>> {
        self.reader.drop_until(self.cursor);
        self.cursor = 0;

        if self.reader.read(1)?.is_empty() && self.reader.eof(0) {
            return Ok(None);
        }
        if self.reader.string_view(0, 1)[0] != b'>' {
            return Err(SeqioError::Malformed("FASTA record must start with '>'"));
        }

        let header_end = self.reader.read_until(b'\n', 0)?;
        let header_line = strip_cr(self.reader.string_view(1, header_end));
        let (id_end, desc_start) = match header_line.iter().position(|&b| b == b' ' || b == b'\t') {
            Some(p) => (p, p + 1),
            None => (header_line.len(), header_line.len()),
        };
        let id_len = id_end;
        let desc_start_in_buf = 1 + desc_start;
        let id_range = (1, 1 + id_len);
        let desc_range = (desc_start_in_buf, 1 + header_line.len());

        let next_line_start = if self.reader.eof(header_end) {
            header_end
        } else {
            header_end + 1
        };

        let mut seq_lines: Vec<(usize, usize)> = Vec::new();
        let mut pos = next_line_start;
        loop {
            self.reader.read(pos + 1)?;
            if self.reader.eof(pos) {
                break;
            }
            if self.reader.string_view(pos, pos + 1)[0] == b'>' {
                break;
            }
            let line_end = self.reader.read_until(b'\n', pos)?;
            let line = strip_cr(self.reader.string_view(pos, line_end));
            seq_lines.push((pos, pos + line.len()));
            pos = if self.reader.eof(line_end) {
                line_end
            } else {
                line_end + 1
            };
        }

        let id = self.reader.string_view(id_range.0, id_range.1);
        let desc = self.reader.string_view(desc_range.0, desc_range.1);

        self.cursor = pos;

        let seq: &[u8] = match seq_lines.len() {
            0 => &[],
            1 => self.reader.string_view(seq_lines[0].0, seq_lines[0].1),
            _ => {
                self.stitched.clear();
                for &(a, b) in &seq_lines {
                    self.stitched.extend_from_slice(self.reader.string_view(a, b));
                }
                &self.stitched
            }
        };

        Ok(Some(FastaRecordView { id, desc, seq }))
    }
}

impl<'a> FastaReader<AnySource<'a>> {
    pub fn open(config: Config<'a>) -> Result<Self> {
        Ok(FastaReader::new(open_source(config)?))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn reader_over(data: &[u8]) -> FastaReader<std::io::Cursor<Vec<u8>>> {
        FastaReader::new(std::io::Cursor::new(data.to_vec()))
    }

    #[test]
    fn parses_single_and_multi_line_records() -> anyhow::Result<()> {
        let mut r = reader_over(b">r1 d\nACGT\nNNN\n>r2\nA\n");

        let rec = r.next()?.unwrap();
        assert_eq!(rec.id, b"r1");
        assert_eq!(rec.desc, b"d");
        assert_eq!(rec.seq, b"ACGTNNN");

        let rec = r.next()?.unwrap();
        assert_eq!(rec.id, b"r2");
        assert_eq!(rec.desc, b"");
        assert_eq!(rec.seq, b"A");

        assert!(r.next()?.is_none());
        assert!(r.next()?.is_none());
        Ok(())
    }

    #[test]
    fn rejects_missing_magic_byte() {
        let mut r = reader_over(b"not fasta\n");
        assert!(matches!(r.next(), Err(SeqioError::Malformed(_))));
    }

    #[test]
    fn handles_crlf_endings() -> anyhow::Result<()> {
        let mut r = reader_over(b">r1\r\nACGT\r\n");
        let rec = r.next()?.unwrap();
        assert_eq!(rec.seq, b"ACGT");
        Ok(())
    }

    #[test]
    fn empty_input_yields_none() -> anyhow::Result<()> {
        let mut r = reader_over(b"");
        assert!(r.next()?.is_none());
        Ok(())
    }
}
