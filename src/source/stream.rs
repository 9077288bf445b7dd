use std::io::Read;

use super::ByteSource;
use crate::error::Result;

/// Reads from a caller-provided stream.
///
/// The stream is borrowed, not owned: this source never closes it.
pub struct StreamSource<'a, R: Read + ?Sized> {
    reader: &'a mut R,
}

impl<'a, R: Read + ?Sized> StreamSource<'a, R> {
    pub fn new(reader: &'a mut R) -> Self {
        StreamSource { reader }
    }
}

impl<'a, R: Read + ?Sized> ByteSource for StreamSource<'a, R> {
    fn read_into(&mut self, dest: &mut [u8]) -> Result<usize> {
        Ok(self.reader.read(dest)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads_from_borrowed_stream() -> anyhow::Result<()> {
        let mut cursor = std::io::Cursor::new(b"payload".to_vec());
        let mut source = StreamSource::new(&mut cursor);
        let mut buf = vec![0u8; 16];
        let n = source.read_into(&mut buf)?;
        assert_eq!(&buf[..n], b"payload");
        Ok(())
    }
}
