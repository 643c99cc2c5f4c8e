//! Error type for the streaming driver and its configuration.

use std::io;

use thiserror::Error;

/// Failures surfaced by the streaming driver.
///
/// Malformed encoded bytes are not an error: decoding is garbage-in,
/// garbage-out unless the filter pass is enabled.
#[derive(Debug, Error)]
pub enum Error {
    /// The byte source failed mid-stream.
    #[error("read error: {0}")]
    Read(#[source] io::Error),

    /// The byte sink failed or accepted a short write.
    #[error("write error: {0}")]
    Write(#[source] io::Error),

    /// Rejected configuration, reported before any stream processing.
    #[error("invalid wrap size: '{0}'")]
    InvalidWrap(String),
}

impl Error {
    /// The underlying I/O error, if any.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Error::Read(e) | Error::Write(e) => Some(e),
            Error::InvalidWrap(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
