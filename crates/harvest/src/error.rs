//! Harvest Error Types
//!
//! Every failure while processing one package lands in one of three buckets:
//! the network (fetching), extraction (unpacking and parsing), or the local
//! filesystem (scratch space and result tables).

use derive_more::{Display, Error};
use mirrorhash_archive::error::{Error as ArchiveError, ErrorKind as ArchiveErrorKind};
use mirrorhash_mirror::error::{Error as MirrorError, ErrorKind as MirrorErrorKind};
use std::io::{Error as IoError, ErrorKind as IoErrorKind};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong with one package, by stage. The queue records the
/// rendered kind as the failure reason.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fetching failed after the retry bound.
    #[display("network error: {_0}")]
    Network(MirrorErrorKind),
    /// The archive couldn't be unpacked; retrying the same bytes won't help.
    #[display("extraction error: {_0}")]
    Extraction(ArchiveErrorKind),
    /// Scratch space or a result table couldn't be written.
    #[display("filesystem error: {_0}")]
    Filesystem(#[error(not(source))] IoErrorKind),
    #[display("work queue error")]
    Queue,
    /// A line of an imported URL table couldn't be understood.
    #[display("invalid URL table line {line}: {reason}")]
    InvalidTable { line: usize, reason: &'static str },
    /// Blocking work panicked or was cancelled by the runtime.
    #[display("background task failed")]
    Task,
}

impl ErrorKind {
    /// Convert a mirror error, preserving its error tree as a child.
    #[track_caller]
    pub fn network(err: MirrorError) -> Error {
        let inner = (*err).clone();
        match inner {
            // Saving the body is local I/O, whichever crate did it.
            MirrorErrorKind::Write(kind) => err.raise(ErrorKind::Filesystem(kind)),
            inner => err.raise(ErrorKind::Network(inner)),
        }
    }

    /// Convert an archive error, preserving its error tree as a child.
    #[track_caller]
    pub fn extraction(err: ArchiveError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Extraction(inner))
    }

    #[track_caller]
    pub fn filesystem(err: IoError) -> Error {
        let kind = err.kind();
        exn::Exn::from(err).raise(ErrorKind::Filesystem(kind))
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(inner) => inner.is_retryable(),
            _ => false,
        }
    }

    /// Returns `true` if the local disk ran out of space. The worker that
    /// hit this should stop taking work.
    pub fn is_disk_full(&self) -> bool {
        matches!(self, Self::Filesystem(IoErrorKind::StorageFull))
    }
}
