//! Failures while unpacking a package.
//!
//! None of these are worth retrying against the same bytes: a download that
//! is not a valid package stays invalid.

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The filename does not carry a known package suffix.
    #[display("unsupported package format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// The archive structure is broken or truncated.
    #[display("corrupt archive: {_0}")]
    Corrupt(#[error(not(source))] &'static str),
    /// The payload uses a compression this build cannot decode.
    #[display("cannot decompress payload: {_0}")]
    Decompression(#[error(not(source))] String),
    /// A member every archive of this format carries is absent.
    #[display("missing archive member: {_0}")]
    MissingMember(#[error(not(source))] &'static str),
    /// A member path escapes the extraction root.
    #[display("unsafe member path: {}", _0.display())]
    UnsafePath(#[error(not(source))] PathBuf),
    /// Reading the content of a member failed part way through.
    #[display("failed to read member: {_0}")]
    Read(#[error(not(source))] String),
}
