use thiserror::Error;

/// The error taxonomy shared by every reader and writer in this crate.
#[derive(Debug, Error)]
pub enum SeqioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not choose a decoder for path: {0}")]
    UnknownExtension(String),

    #[error("bad BGZF/zlib block: {0}")]
    BadBlock(&'static str),

    #[error("stream ended mid-record or mid-header")]
    Truncated,

    #[error("malformed header: {0}")]
    MalformedHeader(&'static str),

    #[error("malformed record: {0}")]
    Malformed(&'static str),

    #[error("failed to parse integer field: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    #[error("failed to parse float field: {0}")]
    ParseFloat(#[from] std::num::ParseFloatError),

    #[error("value cannot be encoded: {0}")]
    Encoding(&'static str),
}

impl From<SeqioError> for std::io::Error {
    fn from(e: SeqioError) -> std::io::Error {
        match e {
            SeqioError::Io(e) => e,
            other => std::io::Error::other(other),
        }
    }
}

impl SeqioError {
    pub fn into_io_error(self) -> std::io::Error {
        self.into()
    }
}

pub type Result<T> = std::result::Result<T, SeqioError>;
