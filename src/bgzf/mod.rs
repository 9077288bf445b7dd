//! BGZF (Blocked GZip Format) support: a [`crate::source::ByteSource`]
//! adapter that inflates blocks on demand, and a writer that deflates into
//! BGZF blocks with the mandatory empty end-of-file block.

pub mod deflate;
pub mod header;
pub mod source;
pub mod writer;

pub use deflate::Compression;
#[cfg(feature = "flate2")]
pub use source::GzSource;
pub use source::BgzfSource;
pub use source::PrefixedSource;
pub(crate) use source::sniff_bgzf;
pub use writer::BgzfWriter;

/// The full 28-byte empty BGZF block that must terminate every BGZF stream.
pub const EOF_MARKER: [u8; 28] = [
    0x1f, 0x8b, 0x08, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0x06, 0x00, 0x42, 0x43, 0x02, 0x00,
    0x1b, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// The body (CDATA + CRC32 + ISIZE) of [`EOF_MARKER`], i.e. what `load_block`
/// sees after it has already consumed the 18-byte header.
pub const EOF_BODY: [u8; 10] = [3, 0, 0, 0, 0, 0, 0, 0, 0, 0];
