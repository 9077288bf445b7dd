//! Byte sources consumed by [`crate::buffered_reader::BufferedReader`].

mod file;
mod mmap;
mod stream;

pub use file::FileSource;
pub use mmap::MmapSource;
pub use stream::StreamSource;

use crate::error::Result;

/// A pull-model producer of raw bytes.
///
/// Implementations are owned exclusively by the [`BufferedReader`][crate::buffered_reader::BufferedReader]
/// wrapping them. `read_into` returns `0` at end of stream, matching `std::io::Read`.
pub trait ByteSource {
    fn read_into(&mut self, dest: &mut [u8]) -> Result<usize>;

    /// Seekable sources (currently only [`MmapSource`]) can expose the whole
    /// backing buffer at once, letting callers skip the copying `read_into` path.
    fn view_all(&self) -> Option<&[u8]> {
        None
    }
}

/// True for extensions that are always BGZF, never single-stream gzip:
/// `.bgzf`, `.bam`, `.bcf`.
pub fn is_bgzf_extension(path: &std::path::Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("bgzf") | Some("bam") | Some("bcf")
    )
}

/// True for `.gz`, which may be either BGZF or single-stream gzip; callers
/// must sniff the header to tell which (see `crate::bgzf::sniff_bgzf`).
pub fn is_gzip_extension(path: &std::path::Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}
