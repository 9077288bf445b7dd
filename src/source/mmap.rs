use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use super::ByteSource;
use crate::error::Result;

/// Reads a plain (uncompressed) file through a read-only memory mapping.
///
/// Like every other source, `read_into` copies through `BufferedReader`'s
/// own growable buffer rather than being special-cased; `view_all` exposes
/// the whole mapping without copying, but only as an escape hatch for a
/// caller that reads the mapping directly and bypasses `BufferedReader`
/// entirely.
pub struct MmapSource {
    mmap: Mmap,
    pos: usize,
}

impl MmapSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        // SAFETY: the file is not expected to be mutated concurrently by other
        // processes for the lifetime of the mapping; this matches the
        // sequential, single-reader-per-file usage this crate targets.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(MmapSource { mmap, pos: 0 })
    }
}

impl ByteSource for MmapSource {
    fn read_into(&mut self, dest: &mut [u8]) -> Result<usize> {
        let remaining = &self.mmap[self.pos..];
        let n = remaining.len().min(dest.len());
        dest[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }

    fn view_all(&self) -> Option<&[u8]> {
        Some(&self.mmap[..])
    }
}
