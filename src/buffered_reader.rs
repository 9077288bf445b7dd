//! The buffered-reader core: a growable window over a [`ByteSource`] with
//! delimiter scanning and zero-copy borrowing.
//!
//! This is the one abstraction every decoder in this crate is built on top
//! of. It is not `Sync`, and sharing a single instance across threads is not
//! supported.

use crate::error::Result;
use crate::source::ByteSource;

/// Minimum chunk size pulled from the source per grow, per the `read_until`
/// contract ("pulling from source in chunks of at least 4 KiB").
const MIN_GROWTH: usize = 4 * 1024;

/// A growable, substring-borrowable window over a [`ByteSource`].
///
/// `buffer[0..len]` is always the live, unconsumed prefix of the source.
/// `drop_until` discards a prefix and renumbers every subsequent offset;
/// callers (decoders) are responsible for tracking the "last consumed
/// offset" the spec calls the drop cursor and translating their own saved
/// offsets after a drop.
pub struct BufferedReader<S> {
    source: S,
    buffer: Vec<u8>,
    exhausted: bool,
}

impl<S: ByteSource> BufferedReader<S> {
    pub fn new(source: S) -> Self {
        BufferedReader {
            source,
            buffer: Vec::new(),
            exhausted: false,
        }
    }

    /// Pulls from the source until the buffer has grown by at least
    /// `want_additional` bytes or the source is exhausted.
    fn grow(&mut self, want_additional: usize) -> Result<()> {
        if self.exhausted {
            return Ok(());
        }
        let chunk_len = want_additional.max(MIN_GROWTH);
        self.buffer.reserve(chunk_len.max(self.buffer.len()));
        let mut chunk = vec![0u8; chunk_len];
        let target = self.buffer.len() + want_additional;
        loop {
            let n = self.source.read_into(&mut chunk)?;
            if n == 0 {
                self.exhausted = true;
                return Ok(());
            }
            self.buffer.extend_from_slice(&chunk[..n]);
            if self.buffer.len() >= target {
                return Ok(());
            }
        }
    }

    /// Ensures at least `min` bytes are buffered unless the source is
    /// exhausted, then returns the whole live window.
    pub fn read(&mut self, min: usize) -> Result<&[u8]> {
        while self.buffer.len() < min && !self.exhausted {
            let need = min - self.buffer.len();
            self.grow(need)?;
        }
        Ok(&self.buffer)
    }

    /// Scans forward from `from` for `delim`, growing the buffer as needed.
    /// Returns the EOF sentinel (the final buffer length) if `delim` never
    /// appears before the source is exhausted.
    pub fn read_until(&mut self, delim: u8, from: usize) -> Result<usize> {
        loop {
            let start = from.min(self.buffer.len());
            if let Some(pos) = self.buffer[start..].iter().position(|&b| b == delim) {
                return Ok(start + pos);
            }
            if self.exhausted {
                return Ok(self.buffer.len());
            }
            self.grow(MIN_GROWTH)?;
        }
    }

    /// Discards bytes `[0, n)`. Every offset a caller is holding that was
    /// `>= n` must be renumbered to `i - n`; offsets `< n` are no longer
    /// valid.
    pub fn drop_until(&mut self, n: usize) {
        self.buffer.drain(0..n);
    }

    /// True iff `offset` equals the final buffer length after the source has
    /// been exhausted.
    pub fn eof(&self, offset: usize) -> bool {
        self.exhausted && offset >= self.buffer.len()
    }

    /// Borrows bytes `[a, b)` of the live window. Valid until the next
    /// `drop_until` or buffer-growing call.
    pub fn string_view(&self, a: usize, b: usize) -> &[u8] {
        &self.buffer[a..b]
    }

    /// Current length of the live window.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::source::StreamSource;

    fn reader_over(data: &'static [u8]) -> BufferedReader<std::io::Cursor<&'static [u8]>> {
        BufferedReader::new(std::io::Cursor::new(data))
    }

    impl ByteSource for std::io::Cursor<&'static [u8]> {
        fn read_into(&mut self, dest: &mut [u8]) -> Result<usize> {
            use std::io::Read;
            Ok(Read::read(self, dest)?)
        }
    }

    #[test]
    fn read_grows_buffer_to_at_least_min() -> anyhow::Result<()> {
        let mut r = reader_over(b"0123456789");
        let window = r.read(4)?;
        assert!(window.len() >= 4);
        assert!(window.starts_with(b"0123"));
        Ok(())
    }

    #[test]
    fn read_until_finds_delimiter() -> anyhow::Result<()> {
        let mut r = reader_over(b"abc\ndef\n");
        let first_nl = r.read_until(b'\n', 0)?;
        assert_eq!(r.string_view(0, first_nl), b"abc");
        let second_nl = r.read_until(b'\n', first_nl + 1)?;
        assert_eq!(r.string_view(first_nl + 1, second_nl), b"def");
        Ok(())
    }

    #[test]
    fn read_until_returns_eof_sentinel_when_absent() -> anyhow::Result<()> {
        let mut r = reader_over(b"no newline here");
        let pos = r.read_until(b'\n', 0)?;
        assert!(r.eof(pos));
        assert_eq!(pos, r.len());
        Ok(())
    }

    #[test]
    fn drop_until_renumbers_offsets() -> anyhow::Result<()> {
        let mut r = reader_over(b"abc\ndef\n");
        let first_nl = r.read_until(b'\n', 0)?;
        r.drop_until(first_nl + 1);
        let second_nl = r.read_until(b'\n', 0)?;
        assert_eq!(r.string_view(0, second_nl), b"def");
        Ok(())
    }

    #[test]
    fn repeated_eof_after_exhaustion_stays_eof() -> anyhow::Result<()> {
        let mut r = reader_over(b"x");
        let pos = r.read_until(b'\n', 0)?;
        assert!(r.eof(pos));
        r.drop_until(pos);
        let pos2 = r.read_until(b'\n', 0)?;
        assert!(r.eof(pos2));
        Ok(())
    }

    #[test]
    fn stream_source_round_trips() -> anyhow::Result<()> {
        let mut cursor = std::io::Cursor::new(b"hello\nworld\n".to_vec());
        let source = StreamSource::new(&mut cursor);
        let mut r = BufferedReader::new(source);
        let nl = r.read_until(b'\n', 0)?;
        assert_eq!(r.string_view(0, nl), b"hello");
        Ok(())
    }
}
