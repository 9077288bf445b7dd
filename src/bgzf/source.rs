//! A [`ByteSource`] that lazily inflates BGZF blocks from an inner source.

use std::io::{self, Read};

use super::deflate::{Compression, Crc, Decompress};
use super::header::BgzfHeader;
use super::{EOF_BODY, EOF_MARKER};
use crate::error::{Result, SeqioError};
use crate::source::ByteSource;

/// Adapts a `&mut S: ByteSource` into `std::io::Read` so the gzip header
/// parser (which only needs `Read`) can be reused unchanged over any source.
pub(crate) struct AsRead<'a, S>(pub &'a mut S);

impl<'a, S: ByteSource> io::Read for AsRead<'a, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read_into(buf).map_err(SeqioError::into_io_error)
    }
}

/// Owns `S` and exposes it as `std::io::Read`, for wrapping in
/// `flate2::read::MultiGzDecoder` (which needs to own its inner reader).
struct OwnedRead<S>(S);

impl<S: ByteSource> io::Read for OwnedRead<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read_into(buf).map_err(SeqioError::into_io_error)
    }
}

/// A [`ByteSource`] that inflates a single-stream (non-BGZF) gzip member,
/// for `.gz` inputs that lack the `BC` extra subfield BGZF relies on.
/// Grounded on SPEC_FULL.md §4.3's "zlib mode".
#[cfg(feature = "flate2")]
pub struct GzSource<S: ByteSource> {
    decoder: flate2::read::MultiGzDecoder<OwnedRead<S>>,
}

#[cfg(feature = "flate2")]
impl<S: ByteSource> GzSource<S> {
    pub fn new(inner: S) -> Self {
        GzSource {
            decoder: flate2::read::MultiGzDecoder::new(OwnedRead(inner)),
        }
    }
}

#[cfg(feature = "flate2")]
impl<S: ByteSource> ByteSource for GzSource<S> {
    fn read_into(&mut self, dest: &mut [u8]) -> Result<usize> {
        Ok(Read::read(&mut self.decoder, dest)?)
    }
}

/// A [`ByteSource`] that replays previously-sniffed prefix bytes before
/// resuming reads from `inner`, so a gzip/BGZF header consumed to detect
/// which decoder to use can be fed back to that decoder unchanged.
pub struct PrefixedSource<S> {
    prefix: Vec<u8>,
    pos: usize,
    inner: S,
}

impl<S: ByteSource> PrefixedSource<S> {
    pub(crate) fn new(prefix: Vec<u8>, inner: S) -> Self {
        PrefixedSource {
            prefix,
            pos: 0,
            inner,
        }
    }
}

impl<S: ByteSource> ByteSource for PrefixedSource<S> {
    fn read_into(&mut self, dest: &mut [u8]) -> Result<usize> {
        if self.pos < self.prefix.len() {
            let remaining = &self.prefix[self.pos..];
            let n = remaining.len().min(dest.len());
            dest[..n].copy_from_slice(&remaining[..n]);
            self.pos += n;
            return Ok(n);
        }
        self.inner.read_into(dest)
    }
}

/// Peeks the gzip member header of `source` to decide whether it is BGZF
/// (has a two-byte `BC` extra subfield) or single-stream gzip, without
/// losing the peeked bytes: returns whether it looks like BGZF, plus the
/// exact bytes consumed while sniffing so they can be replayed via
/// [`PrefixedSource`].
pub(crate) fn sniff_bgzf<S: ByteSource>(source: &mut S) -> Result<(bool, Vec<u8>)> {
    struct Capturing<'a, S> {
        inner: AsRead<'a, S>,
        captured: Vec<u8>,
    }
    impl<'a, S: ByteSource> io::Read for Capturing<'a, S> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.captured.extend_from_slice(&buf[..n]);
            Ok(n)
        }
    }

    let mut capturing = Capturing {
        inner: AsRead(source),
        captured: Vec::new(),
    };
    let header = BgzfHeader::from_reader(&mut capturing)?;
    let is_bgzf = header.block_size().is_ok();
    Ok((is_bgzf, capturing.captured))
}

/// Reads one BGZF block (header + compressed body + CRC32 + ISIZE) from
/// `source`. The returned `Vec` is the body *and* the 8-byte CRC32/ISIZE
/// footer, matching [`decompress_block`]'s expectations.
fn load_block<S: ByteSource>(source: &mut S) -> Result<(BgzfHeader, Vec<u8>)> {
    let mut reader = AsRead(source);
    let header = BgzfHeader::from_reader(&mut reader)?;
    let block_size: u64 = header.block_size()?.into();
    let header_size = header.header_size();
    if block_size < header_size {
        return Err(SeqioError::BadBlock("BSIZE smaller than header"));
    }
    let mut body = vec![0u8; (block_size - header_size) as usize];
    reader
        .read_exact(&mut body)
        .map_err(|_| SeqioError::Truncated)?;
    Ok((header, body))
}

/// Inflates a single block body (as returned by [`load_block`]) into
/// `decompressed_data`, verifying the trailing CRC32.
fn decompress_block(
    decompressed_data: &mut Vec<u8>,
    compressed_block: &[u8],
    decompress: &mut Decompress,
) -> Result<()> {
    if compressed_block.len() < 8 {
        return Err(SeqioError::Truncated);
    }
    let start = decompressed_data.len();
    let (cdata, footer) = compressed_block.split_at(compressed_block.len() - 8);
    let expected_crc = u32::from_le_bytes(footer[0..4].try_into().unwrap());
    let expected_len = u32::from_le_bytes(footer[4..8].try_into().unwrap()) as usize;

    decompressed_data.resize(start + expected_len, 0);
    decompress.decompress(cdata, &mut decompressed_data[start..])?;

    let mut crc = Crc::new();
    crc.update(&decompressed_data[start..]);
    if crc.sum() != expected_crc {
        #[cfg(feature = "log")]
        log::warn!("BGZF block CRC32 mismatch: expected {expected_crc:#x}, got {:#x}", crc.sum());
        return Err(SeqioError::BadBlock("CRC32 mismatch"));
    }
    Ok(())
}

/// A [`ByteSource`] that decodes a BGZF (or plain gzip) stream one block at a
/// time, re-emitting inflated bytes through the same byte-source interface
/// consumed by [`crate::buffered_reader::BufferedReader`].
pub struct BgzfSource<S> {
    inner: S,
    current: Vec<u8>,
    pos: usize,
    finished: bool,
    thread_count: usize,
}

impl<S: ByteSource> BgzfSource<S> {
    pub fn new(inner: S) -> Self {
        Self::with_threads(inner, 1)
    }

    /// `thread_count` is advisory: values `> 1` only parallelize inflate when
    /// the `rayon` feature is enabled, and never change emitted byte order.
    pub fn with_threads(inner: S, thread_count: usize) -> Self {
        BgzfSource {
            inner,
            current: Vec::new(),
            pos: 0,
            finished: false,
            thread_count: thread_count.max(1),
        }
    }

    #[cfg(feature = "rayon")]
    fn fill_next(&mut self) -> Result<()> {
        if self.thread_count <= 1 {
            return self.fill_next_single();
        }

        use rayon::prelude::*;

        let mut batch = Vec::with_capacity(self.thread_count);
        for _ in 0..self.thread_count {
            let (_header, body) = load_block(&mut self.inner)?;
            let is_eof = body == EOF_BODY;
            batch.push(body);
            if is_eof {
                self.finished = true;
                break;
            }
        }

        let decompressed: Vec<Vec<u8>> = batch
            .par_iter()
            .map(|body| {
                if body == &EOF_BODY[..] {
                    return Ok(Vec::new());
                }
                let mut decompress = Decompress::new();
                let mut out = Vec::new();
                decompress_block(&mut out, body, &mut decompress)?;
                Ok(out)
            })
            .collect::<Result<Vec<_>>>()?;

        self.current.clear();
        self.pos = 0;
        for chunk in decompressed {
            self.current.extend_from_slice(&chunk);
        }
        Ok(())
    }

    #[cfg(not(feature = "rayon"))]
    fn fill_next(&mut self) -> Result<()> {
        self.fill_next_single()
    }

    fn fill_next_single(&mut self) -> Result<()> {
        let (_header, body) = load_block(&mut self.inner)?;
        if body == EOF_BODY {
            self.finished = true;
            self.current.clear();
            self.pos = 0;
            return Ok(());
        }
        self.current.clear();
        self.pos = 0;
        let mut decompress = Decompress::new();
        decompress_block(&mut self.current, &body, &mut decompress)?;
        Ok(())
    }
}

impl<S: ByteSource> ByteSource for BgzfSource<S> {
    fn read_into(&mut self, dest: &mut [u8]) -> Result<usize> {
        loop {
            if self.pos < self.current.len() {
                let remaining = &self.current[self.pos..];
                let n = remaining.len().min(dest.len());
                dest[..n].copy_from_slice(&remaining[..n]);
                self.pos += n;
                return Ok(n);
            }
            if self.finished {
                return Ok(0);
            }
            self.fill_next()?;
        }
    }
}

/// Silences the unused-import warning on builds without the
/// `rust_backend`/`libdeflater` features where `Compression` is otherwise
/// unused by this module.
#[allow(dead_code)]
fn _assert_compression_is_reachable() -> Compression {
    Compression::default()
}

#[allow(dead_code)]
fn _assert_eof_marker_len() {
    let _ = EOF_MARKER.len();
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bgzf::writer::BgzfWriter;
    use crate::source::StreamSource;
    use std::io::Write;

    fn encode_bgzf(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut w = BgzfWriter::new(&mut out, Compression::default());
            w.write_all(data).unwrap();
            w.close().unwrap();
        }
        out
    }

    #[test]
    fn inflates_single_block() -> anyhow::Result<()> {
        let encoded = encode_bgzf(b"the quick brown fox jumps over the lazy dog");
        let mut cursor = std::io::Cursor::new(encoded);
        let stream = StreamSource::new(&mut cursor);
        let mut source = BgzfSource::new(stream);
        let mut out = Vec::new();
        let mut buf = [0u8; 8];
        loop {
            let n = source.read_into(&mut buf)?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"the quick brown fox jumps over the lazy dog");
        Ok(())
    }

    #[test]
    fn empty_terminator_only_yields_immediate_eof() -> anyhow::Result<()> {
        let mut cursor = std::io::Cursor::new(EOF_MARKER.to_vec());
        let stream = StreamSource::new(&mut cursor);
        let mut source = BgzfSource::new(stream);
        let mut buf = [0u8; 8];
        assert_eq!(source.read_into(&mut buf)?, 0);
        Ok(())
    }

    #[test]
    fn detects_corrupted_crc() {
        let mut encoded = encode_bgzf(b"payload data");
        // Flip a byte inside the compressed block body (well past the header).
        let flip_at = 30;
        encoded[flip_at] ^= 0xff;
        let mut cursor = std::io::Cursor::new(encoded);
        let stream = StreamSource::new(&mut cursor);
        let mut source = BgzfSource::new(stream);
        let mut buf = [0u8; 64];
        let mut saw_err = false;
        loop {
            match source.read_into(&mut buf) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(_) => {
                    saw_err = true;
                    break;
                }
            }
        }
        assert!(saw_err);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn multi_threaded_inflate_matches_single_threaded() -> anyhow::Result<()> {
        let mut data = Vec::new();
        for i in 0..200_000u32 {
            data.extend_from_slice(i.to_string().as_bytes());
            data.push(b'\n');
        }
        let encoded = encode_bgzf(&data);

        let mut cursor = std::io::Cursor::new(encoded.clone());
        let stream = StreamSource::new(&mut cursor);
        let mut single = BgzfSource::new(stream);
        let mut single_out = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = single.read_into(&mut buf)?;
            if n == 0 {
                break;
            }
            single_out.extend_from_slice(&buf[..n]);
        }

        let mut cursor2 = std::io::Cursor::new(encoded);
        let stream2 = StreamSource::new(&mut cursor2);
        let mut multi = BgzfSource::with_threads(stream2, 4);
        let mut multi_out = Vec::new();
        loop {
            let n = multi.read_into(&mut buf)?;
            if n == 0 {
                break;
            }
            multi_out.extend_from_slice(&buf[..n]);
        }

        assert_eq!(single_out, multi_out);
        assert_eq!(single_out, data);
        Ok(())
    }
}
