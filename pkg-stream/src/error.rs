//! Error types and the stable error codes exposed across the stream boundary.

use std::io;
use std::path::PathBuf;

use crate::compression::Compression;

/// Stable negative codes for callers that speak the raw integer convention.
///
/// A non-negative value is always a byte count, so every code here is negative.
pub mod codes {
    /// The operation was attempted on an absent (or already closed) handle.
    pub const BAD_STREAM: i64 = -1;
    /// The caller supplied an empty buffer.
    pub const BAD_ARGS: i64 = -2;
    /// The backing target or the codec failed. The stream must not be used further.
    pub const INTERNAL_ERROR: i64 = -3;
}

pub type Result<T> = std::result::Result<T, StreamError>;

/// Failure of a single read, write or close call on a stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("No stream to operate on.")]
    BadStream,

    #[error("Stream has already been closed.")]
    Closed,

    #[error("Buffer must not be empty.")]
    BadArgs,

    #[error("Backing file failed.")]
    Io(#[from] io::Error),

    #[error("Codec failed.")]
    Codec(#[source] io::Error),

    #[error("Underlying stream failed.")]
    Underlying(#[source] Box<StreamError>),

    #[error("Short write: {written} of {expected} bytes accepted.")]
    ShortWrite { expected: usize, written: usize },

    #[error("Stream is in a failed state.")]
    Poisoned,
}

impl StreamError {
    /// The stable code for this error, one of [`codes`].
    pub const fn code(&self) -> i64 {
        match self {
            StreamError::BadStream | StreamError::Closed => codes::BAD_STREAM,
            StreamError::BadArgs => codes::BAD_ARGS,
            StreamError::Io(_)
            | StreamError::Codec(_)
            | StreamError::Underlying(_)
            | StreamError::ShortWrite { .. }
            | StreamError::Poisoned => codes::INTERNAL_ERROR,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.code() == codes::INTERNAL_ERROR
    }
}

/// Flatten a transfer result into a byte count or a negative code.
pub fn into_raw(result: Result<usize>) -> i64 {
    match result {
        Ok(n) => i64::try_from(n).unwrap_or(i64::MAX),
        Err(e) => e.code(),
    }
}

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        use io::ErrorKind;

        match err {
            StreamError::Io(e) | StreamError::Codec(e) => e,
            StreamError::BadArgs => io::Error::new(ErrorKind::InvalidInput, err),
            StreamError::BadStream | StreamError::Closed => {
                io::Error::new(ErrorKind::NotConnected, err)
            }
            StreamError::ShortWrite { .. } => io::Error::new(ErrorKind::WriteZero, err),
            other => io::Error::new(ErrorKind::Other, other),
        }
    }
}

/// Failure to construct a stream. No handle exists when this is returned.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("Compression {0} is not available.")]
    Unsupported(Compression),

    #[error("Could not initialize codec.")]
    CodecInit(#[source] io::Error),

    #[error("Could not open file for reading. Path: '{}'", .1.display())]
    OpenFile(#[source] io::Error, PathBuf),

    #[error("Could not create file for writing. Path: '{}'", .1.display())]
    CreateFile(#[source] io::Error, PathBuf),
}

impl From<OpenError> for io::Error {
    fn from(err: OpenError) -> Self {
        match err {
            OpenError::OpenFile(e, _) | OpenError::CreateFile(e, _) => e,
            OpenError::Unsupported(_) => io::Error::new(io::ErrorKind::Unsupported, err),
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
