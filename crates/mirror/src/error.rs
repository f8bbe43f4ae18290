//! Mirror Error Types
//!
//! Kinds are grouped by what the retry layer should do with them: transport
//! failures and server errors are worth another attempt, everything else is
//! final for that URL.

use derive_more::{Display, Error};
use std::io::ErrorKind as IoErrorKind;

/// A mirror error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for mirror operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection, TLS, timeout or body transfer failure.
    #[display("request failed: {_0}")]
    Request(#[error(not(source))] String),
    /// The server answered with a non-success status.
    #[display("HTTP {_0}")]
    Status(#[error(not(source))] u16),
    /// The server answered successfully but sent nothing.
    #[display("empty response body")]
    EmptyBody,
    /// Every attempt failed; the most recent failure is the child error.
    #[display("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
    /// Interrupted while waiting to retry; the last failure is the child error.
    #[display("interrupted before retrying: {last}")]
    Cancelled { last: String },
    #[display("invalid URL: {_0}")]
    InvalidUrl(#[error(not(source))] String),
    /// The HTTP client could not be built from the given options.
    #[display("HTTP client error: {_0}")]
    Client(#[error(not(source))] String),
    /// Writing the downloaded body to local storage failed.
    #[display("write error: {_0}")]
    Write(#[error(not(source))] IoErrorKind),
    /// A directory listing could not be read; discovery skips it.
    #[display("could not read listing {_0}")]
    Listing(#[error(not(source))] String),
    #[display("unknown distribution: {_0}")]
    UnknownDistro(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Every network failure is worth another attempt. Local write failures
    /// and bad input are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Status(_) | Self::EmptyBody)
    }

    /// Returns `true` if the local disk ran out of space.
    pub fn is_disk_full(&self) -> bool {
        matches!(self, Self::Write(IoErrorKind::StorageFull))
    }
}

impl ErrorKind {
    /// Convert a client error into a mirror error, keeping the original as
    /// a child in the error tree.
    #[track_caller]
    pub fn request(err: reqwest::Error) -> Error {
        let kind = match err.status() {
            Some(status) => Self::Status(status.as_u16()),
            None => Self::Request(err.to_string()),
        };
        exn::Exn::from(err).raise(kind)
    }

    /// Convert a local I/O failure while saving a body.
    #[track_caller]
    pub fn write(err: std::io::Error) -> Error {
        let kind = err.kind();
        exn::Exn::from(err).raise(Self::Write(kind))
    }
}
