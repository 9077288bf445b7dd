//! BCF (binary VCF) typed-value codec, reader and writer.

pub mod reader;
pub mod value;
pub mod writer;

pub use reader::{BcfReader, BcfRecord, BcfRecordView};
pub use writer::{BcfRecordInput, BcfWriter};
