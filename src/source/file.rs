use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::ByteSource;
use crate::error::Result;

/// Reads a plain (uncompressed) file via repeated positional reads.
pub struct FileSource {
    file: File,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(FileSource {
            file: File::open(path)?,
        })
    }
}

impl ByteSource for FileSource {
    fn read_into(&mut self, dest: &mut [u8]) -> Result<usize> {
        Ok(self.file.read(dest)?)
    }
}
