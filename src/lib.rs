//! varseq
//! ======
//!
//! Streaming, high-throughput parsing and emission of bioinformatics
//! sequence and variant file formats: FASTA, FASTQ, VCF, BAM and BCF,
//! including their BGZF/gzip-compressed forms.
//!
//! The library is built in layers:
//!
//! 1. [`source`] — byte sources (file, mmap, stream).
//! 2. [`buffered_reader`] — a growable, substring-borrowable window over a
//!    byte source, the abstraction every decoder below is built on.
//! 3. [`bgzf`] — a decompressing byte source that re-emits inflated BGZF
//!    blocks through the same `ByteSource` interface, so the decoders below
//!    are unaware of compression.
//! 4. [`fasta`], [`fastq`], [`vcf`] — line-oriented text decoders.
//! 5. [`bam`], [`bcf`] — length-prefixed binary decoders (and, for BCF, an
//!    encoder).
//! 6. [`iter`] — an `Iterator` sugar layer (`.records()`) over any reader,
//!    yielding owned records instead of borrowed views.
//!
//! Every reader borrows record fields from its own internal buffer; a
//! borrowed view is valid only until the reader's next `next()` call. Call
//! `.to_owned()` on a view (where provided) to keep data past that point,
//! or use [`IntoRecords::records`] to iterate owned records directly.
//!
//! Feature flags
//! -------------
//!
//! * `rayon`: enable multi-threaded BGZF block inflate via [`bgzf::BgzfSource::with_threads`].
//! * `log`: enable the [log](https://github.com/rust-lang/log) crate for warnings.
//! * `rust_backend`: use `miniz_oxide` as the [flate2](https://github.com/rust-lang/flate2-rs) backend. Default.
//! * `zlib`, `zlib-ng`, `zlib-ng-compat`, `cloudflare_zlib`: alternate flate2 backends.
//! * `libdeflater`: use `libdeflater` instead of `flate2`.
//!
//! Examples
//! --------
//! ```rust
//! use varseq::fasta::FastaReader;
//! use varseq::source::FileSource;
//!
//! # fn main() -> Result<(), varseq::error::SeqioError> {
//! # let path = "testfiles/sample.fasta";
//! # if std::path::Path::new(path).exists() {
//! let mut reader = FastaReader::new(FileSource::open(path)?);
//! while let Some(record) = reader.next()? {
//!     let _ = record.id;
//! }
//! # }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod source;

pub(crate) mod binreader;
pub mod buffered_reader;

pub mod bgzf;

pub mod fasta;
pub mod fastq;
pub mod vcf;

pub mod bam;
pub mod bcf;

pub mod iter;

pub use config::{Config, Input};
pub use error::{Result, SeqioError};
pub use iter::{IntoRecords, RecordSource, Records};

impl crate::source::ByteSource for std::fs::File {
    fn read_into(&mut self, dest: &mut [u8]) -> Result<usize> {
        use std::io::Read;
        Ok(self.read(dest)?)
    }
}
