//! Decoding the compressed streams nested inside package archives.
//!
//! A Debian package carries a `data.tar.*` member, an RPM names its payload
//! compressor in a header tag, Alpine packages are concatenated gzip
//! segments and Arch packages are a single zstd tarball. [`Compression`]
//! names each of those codecs; it can be recognised from a member name
//! ([`Compression::from_member`]), a compressor tag ([`str::parse`]) or the
//! first bytes of the stream ([`Compression::sniff`]), and turned into a
//! streaming [`Compression::decoder`].
//!
//! [`Compression::encode`] exists so tests can build archives in memory.

mod decode;
mod detect;
mod encode;
pub mod error;

use derive_more::Display;

/// A codec found inside a package archive.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Stored as-is, such as a bare `data.tar`.
    #[default]
    #[display("none")]
    None,
    #[display("bzip2")]
    Bzip2,
    #[display("gzip")]
    Gzip,
    /// The legacy `.lzma` container older RPMs and Debian packages still use.
    #[display("lzma")]
    Lzma,
    #[display("xz")]
    Xz,
    #[display("zstd")]
    Zstd,
}

impl Compression {
    /// The suffix this codec adds to a member name, including the dot.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Bzip2 => ".bz2",
            Compression::Gzip => ".gz",
            Compression::Lzma => ".lzma",
            Compression::Xz => ".xz",
            Compression::Zstd => ".zst",
        }
    }
}
