//! BGZF writer: deflates into independently-inflatable blocks and appends
//! the mandatory empty end-of-file block on close.

use std::io::{self, Write};

use super::deflate::{Compress, Compression, Crc};
use super::header::BgzfHeader;
use crate::error::Result;

/// Default uncompressed block size, matching the reference `bgzip`
/// implementation (chosen so the compressed block never exceeds 64 KiB).
pub const DEFAULT_COMPRESS_UNIT_SIZE: usize = 65280;
pub const MAXIMUM_COMPRESS_UNIT_SIZE: usize = 64 * 1024;
const EXTRA_COMPRESS_BUFFER_SIZE: usize = 200;
const FOOTER_SIZE: usize = 8;

/// Deflates a single block's worth of `original_data` into BGZF framing
/// (header + CDATA + CRC32 + ISIZE), returning the block's total length.
pub fn write_block(
    compressed_data: &mut Vec<u8>,
    original_data: &[u8],
    compress: &mut Compress,
) -> Result<usize> {
    let start = compressed_data.len();
    let mut header = BgzfHeader::new(false, 0, 0);
    let header_size: usize = header.header_size() as usize;
    compressed_data.resize(
        start + original_data.len() + EXTRA_COMPRESS_BUFFER_SIZE + header_size + FOOTER_SIZE,
        0,
    );

    let compressed_len = compress.compress(original_data, &mut compressed_data[(start + header_size)..])?;
    compressed_data.truncate(start + header_size + compressed_len);

    let mut crc = Crc::new();
    crc.update(original_data);
    compressed_data.extend_from_slice(&crc.sum().to_le_bytes());
    compressed_data.extend_from_slice(&(original_data.len() as u32).to_le_bytes());

    let block_size = compressed_data.len() - start;
    header.update_block_size(block_size.try_into().unwrap())?;
    header.write(&mut compressed_data[start..(start + header_size)])?;

    Ok(block_size)
}

/// Writes a BGZF stream to `W`, buffering up to `compress_unit_size` bytes of
/// plain data before deflating each block.
pub struct BgzfWriter<W: Write> {
    writer: W,
    original_data: Vec<u8>,
    compressed_buffer: Vec<u8>,
    compress: Compress,
    compress_unit_size: usize,
    closed: bool,
}

impl<W: Write> BgzfWriter<W> {
    pub fn new(writer: W, level: Compression) -> Self {
        Self::with_compress_unit_size(writer, level, DEFAULT_COMPRESS_UNIT_SIZE)
            .expect("default compress unit size is always valid")
    }

    pub fn with_compress_unit_size(
        writer: W,
        level: Compression,
        compress_unit_size: usize,
    ) -> Result<Self> {
        if compress_unit_size >= MAXIMUM_COMPRESS_UNIT_SIZE {
            return Err(crate::error::SeqioError::Encoding(
                "compress unit size exceeds the maximum BGZF block size",
            ));
        }
        Ok(BgzfWriter {
            writer,
            original_data: Vec::with_capacity(compress_unit_size),
            compressed_buffer: Vec::with_capacity(compress_unit_size + EXTRA_COMPRESS_BUFFER_SIZE),
            compress: Compress::new(level),
            compress_unit_size,
            closed: false,
        })
    }

    fn flush_block(&mut self) -> io::Result<()> {
        self.compressed_buffer.clear();
        write_block(
            &mut self.compressed_buffer,
            &self.original_data,
            &mut self.compress,
        )
        .map_err(crate::error::SeqioError::into_io_error)?;
        self.writer.write_all(&self.compressed_buffer)?;
        self.original_data.clear();
        Ok(())
    }

    /// Writes the end-of-file marker and consumes the writer. Prefer this
    /// over relying on `Drop` when I/O errors need to be observed.
    pub fn close(mut self) -> io::Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> io::Result<()> {
        if !self.closed {
            self.flush()?;
            self.writer.write_all(&super::EOF_MARKER)?;
            self.closed = true;
        }
        Ok(())
    }
}

impl<W: Write> Write for BgzfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < buf.len() {
            let to_write = (buf.len() - written).min(self.compress_unit_size - self.original_data.len());
            self.original_data
                .extend_from_slice(&buf[written..written + to_write]);
            written += to_write;
            if self.original_data.len() >= self.compress_unit_size {
                self.flush_block()?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.original_data.is_empty() {
            self.flush_block()?;
        }
        Ok(())
    }
}

impl<W: Write> Drop for BgzfWriter<W> {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.finish();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bgzf::source::BgzfSource;
    use crate::source::{ByteSource, StreamSource};

    #[test]
    fn writes_readable_bgzf_stream() -> anyhow::Result<()> {
        let mut out = Vec::new();
        {
            let mut w = BgzfWriter::new(&mut out, Compression::default());
            w.write_all(b"##fileformat=VCFv4.2\n")?;
            w.write_all(b"#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n")?;
            w.close()?;
        }

        let mut cursor = std::io::Cursor::new(out);
        let stream = StreamSource::new(&mut cursor);
        let mut source = BgzfSource::new(stream);
        let mut round_tripped = Vec::new();
        let mut buf = [0u8; 16];
        loop {
            let n = source.read_into(&mut buf)?;
            if n == 0 {
                break;
            }
            round_tripped.extend_from_slice(&buf[..n]);
        }
        assert_eq!(
            round_tripped,
            b"##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n".to_vec()
        );
        Ok(())
    }

    #[test]
    fn large_write_spans_multiple_blocks() -> anyhow::Result<()> {
        let mut data = Vec::new();
        for i in 0..20_000u32 {
            data.extend_from_slice(format!("line{i}\n").as_bytes());
        }

        let mut out = Vec::new();
        {
            let mut w = BgzfWriter::new(&mut out, Compression::default());
            w.write_all(&data)?;
            w.close()?;
        }

        let mut cursor = std::io::Cursor::new(out);
        let stream = StreamSource::new(&mut cursor);
        let mut source = BgzfSource::new(stream);
        let mut round_tripped = Vec::new();
        source_read_to_end(&mut source, &mut round_tripped)?;
        assert_eq!(round_tripped, data);
        Ok(())
    }

    fn source_read_to_end(
        source: &mut impl crate::source::ByteSource,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let mut buf = [0u8; 4096];
        loop {
            let n = source.read_into(&mut buf)?;
            if n == 0 {
                return Ok(());
            }
            out.extend_from_slice(&buf[..n]);
        }
    }
}
