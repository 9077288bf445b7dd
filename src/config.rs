//! Construction config shared by every reader's `open` constructor.
//!
//! Mirrors the teacher's builder-style construction (`BGZFWriter::with_compress_unit_size`)
//! generalized to the handful of knobs every format's `open` needs: where the
//! bytes come from, whether they're BGZF/gzip-compressed, and how many
//! threads to use for BGZF inflate.

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::bgzf::{sniff_bgzf, BgzfSource, PrefixedSource};
#[cfg(feature = "flate2")]
use crate::bgzf::GzSource;
use crate::error::Result;
#[cfg(not(feature = "flate2"))]
use crate::error::SeqioError;
use crate::source::{is_bgzf_extension, is_gzip_extension, ByteSource, FileSource, StreamSource};

/// Where a reader's bytes come from.
pub enum Input<'a> {
    Path(PathBuf),
    Stream(&'a mut dyn Read),
}

impl<'a> Input<'a> {
    pub fn path(path: impl AsRef<Path>) -> Self {
        Input::Path(path.as_ref().to_path_buf())
    }

    pub fn stream(reader: &'a mut dyn Read) -> Self {
        Input::Stream(reader)
    }
}

/// Construction config for `Reader::open`.
pub struct Config<'a> {
    pub input: Input<'a>,
    /// Consulted only for [`Input::Stream`]; path inputs detect compression
    /// from their extension (`.gz`, `.bgzf`, `.bam`, `.bcf`).
    pub compressed: bool,
    /// Advisory; `1` disables the `rayon` batch-inflate path.
    pub thread_count: usize,
}

impl<'a> Config<'a> {
    pub fn new(input: Input<'a>) -> Self {
        Config {
            input,
            compressed: false,
            thread_count: 1,
        }
    }

    pub fn compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    pub fn thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }
}

/// A source that is either a plain file/stream, or the same wrapped in a
/// BGZF inflate adapter, or (SPEC_FULL.md §4.3's "zlib mode") a
/// single-stream gzip inflate adapter for `.gz` inputs without the `BC`
/// extra subfield BGZF relies on. Picked at `open` time by [`Config`]. See
/// the "type-erased buffered reader" design note: the set of sources is
/// closed, so an enum is preferred over `dyn ByteSource`.
pub enum AnySource<'a> {
    File(FileSource),
    Stream(StreamSource<'a, dyn Read + 'a>),
    BgzfFile(Box<BgzfSource<PrefixedSource<FileSource>>>),
    BgzfStream(Box<BgzfSource<PrefixedSource<StreamSource<'a, dyn Read + 'a>>>>),
    #[cfg(feature = "flate2")]
    GzFile(Box<GzSource<PrefixedSource<FileSource>>>),
    #[cfg(feature = "flate2")]
    GzStream(Box<GzSource<PrefixedSource<StreamSource<'a, dyn Read + 'a>>>>),
}

impl<'a> ByteSource for AnySource<'a> {
    fn read_into(&mut self, dest: &mut [u8]) -> Result<usize> {
        match self {
            AnySource::File(s) => s.read_into(dest),
            AnySource::Stream(s) => s.read_into(dest),
            AnySource::BgzfFile(s) => s.read_into(dest),
            AnySource::BgzfStream(s) => s.read_into(dest),
            #[cfg(feature = "flate2")]
            AnySource::GzFile(s) => s.read_into(dest),
            #[cfg(feature = "flate2")]
            AnySource::GzStream(s) => s.read_into(dest),
        }
    }
}

/// Sniffs whether `source`'s gzip member is BGZF (has the `BC` extra
/// subfield) or single-stream gzip, wraps it in the matching adapter, and
/// returns it as `kind`. Shared by the file and stream branches of
/// `open_source`.
fn wrap_gzip_like<S: ByteSource>(
    mut source: S,
    thread_count: usize,
) -> Result<GzipLike<PrefixedSource<S>>> {
    let (is_bgzf, prefix) = sniff_bgzf(&mut source)?;
    let combined = PrefixedSource::new(prefix, source);
    if is_bgzf {
        Ok(GzipLike::Bgzf(Box::new(BgzfSource::with_threads(
            combined,
            thread_count,
        ))))
    } else {
        #[cfg(feature = "flate2")]
        {
            Ok(GzipLike::Gz(Box::new(GzSource::new(combined))))
        }
        #[cfg(not(feature = "flate2"))]
        {
            Err(SeqioError::BadBlock(
                "gzip stream is not BGZF; single-stream zlib mode requires the flate2 feature",
            ))
        }
    }
}

enum GzipLike<S: ByteSource> {
    Bgzf(Box<BgzfSource<S>>),
    #[cfg(feature = "flate2")]
    Gz(Box<GzSource<S>>),
}

/// A source that is always plain (never BGZF-wrapped here), for formats
/// like BCF whose own reader constructor always does its own BGZF wrapping.
pub enum PlainSource<'a> {
    File(FileSource),
    Stream(StreamSource<'a, dyn Read + 'a>),
}

impl<'a> ByteSource for PlainSource<'a> {
    fn read_into(&mut self, dest: &mut [u8]) -> Result<usize> {
        match self {
            PlainSource::File(s) => s.read_into(dest),
            PlainSource::Stream(s) => s.read_into(dest),
        }
    }
}

/// Builds the plain (never BGZF-wrapped) source a [`Config`] describes,
/// ignoring `compressed`/`thread_count`: for formats whose own reader
/// constructor always wraps its input in BGZF itself (BCF).
pub fn open_plain_source(config: Config<'_>) -> Result<PlainSource<'_>> {
    match config.input {
        Input::Path(path) => Ok(PlainSource::File(FileSource::open(&path)?)),
        Input::Stream(reader) => Ok(PlainSource::Stream(StreamSource::new(reader))),
    }
}

/// Builds the [`AnySource`] a [`Config`] describes: resolves compression
/// (by extension for path inputs, by `config.compressed` for streams). A
/// `.bgzf`/`.bam`/`.bcf` path is always treated as BGZF; a `.gz` path, and
/// any stream with `compressed` set, is sniffed to tell BGZF from
/// single-stream gzip (SPEC_FULL.md §4.3).
pub fn open_source(config: Config<'_>) -> Result<AnySource<'_>> {
    match config.input {
        Input::Path(path) => {
            let file = FileSource::open(&path)?;
            if is_bgzf_extension(&path) {
                Ok(AnySource::BgzfFile(Box::new(BgzfSource::with_threads(
                    PrefixedSource::new(Vec::new(), file),
                    config.thread_count,
                ))))
            } else if is_gzip_extension(&path) {
                match wrap_gzip_like(file, config.thread_count)? {
                    GzipLike::Bgzf(s) => Ok(AnySource::BgzfFile(s)),
                    #[cfg(feature = "flate2")]
                    GzipLike::Gz(s) => Ok(AnySource::GzFile(s)),
                }
            } else {
                Ok(AnySource::File(file))
            }
        }
        Input::Stream(reader) => {
            let stream = StreamSource::new(reader);
            if config.compressed {
                match wrap_gzip_like(stream, config.thread_count)? {
                    GzipLike::Bgzf(s) => Ok(AnySource::BgzfStream(s)),
                    #[cfg(feature = "flate2")]
                    GzipLike::Gz(s) => Ok(AnySource::GzStream(s)),
                }
            } else {
                Ok(AnySource::Stream(stream))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn opens_plain_file_by_extension() -> anyhow::Result<()> {
        let mut f = tempfile::NamedTempFile::with_suffix(".fasta")?;
        use std::io::Write;
        f.as_file_mut().write_all(b">r\nACGT\n")?;
        let source = open_source(Config::new(Input::path(f.path())))?;
        assert!(matches!(source, AnySource::File(_)));
        Ok(())
    }

    #[test]
    fn opens_bgzf_file_by_extension() -> anyhow::Result<()> {
        let mut f = tempfile::NamedTempFile::with_suffix(".bam")?;
        use std::io::Write;
        f.as_file_mut().write_all(&crate::bgzf::EOF_MARKER)?;
        let source = open_source(Config::new(Input::path(f.path())))?;
        assert!(matches!(source, AnySource::BgzfFile(_)));
        Ok(())
    }

    #[test]
    fn stream_input_honors_compressed_flag() -> anyhow::Result<()> {
        let mut cursor = std::io::Cursor::new(b"plain text".to_vec());
        let source = open_source(Config::new(Input::stream(&mut cursor)).compressed(false))?;
        assert!(matches!(source, AnySource::Stream(_)));
        Ok(())
    }

    #[test]
    fn sniffs_bgzf_content_behind_gz_extension() -> anyhow::Result<()> {
        let mut f = tempfile::NamedTempFile::with_suffix(".gz")?;
        use std::io::Write;
        f.as_file_mut().write_all(&crate::bgzf::EOF_MARKER)?;
        let source = open_source(Config::new(Input::path(f.path())))?;
        assert!(matches!(source, AnySource::BgzfFile(_)));
        Ok(())
    }

    #[cfg(feature = "flate2")]
    #[test]
    fn sniffs_single_stream_gzip_content_behind_gz_extension() -> anyhow::Result<()> {
        use crate::source::ByteSource;
        use std::io::Write;

        let mut encoded = Vec::new();
        {
            let mut encoder =
                flate2::write::GzEncoder::new(&mut encoded, flate2::Compression::default());
            encoder.write_all(b"plain single-stream gzip, no BC subfield")?;
            encoder.finish()?;
        }

        let mut f = tempfile::NamedTempFile::with_suffix(".gz")?;
        f.as_file_mut().write_all(&encoded)?;
        let mut source = open_source(Config::new(Input::path(f.path())))?;
        assert!(matches!(source, AnySource::GzFile(_)));

        let mut out = Vec::new();
        let mut buf = [0u8; 16];
        loop {
            let n = source.read_into(&mut buf)?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"plain single-stream gzip, no BC subfield");
        Ok(())
    }
}
