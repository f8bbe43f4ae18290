use crate::Compression;
use crate::error::{Error, ErrorKind};
use std::str::FromStr;

// LZMA-alone has no real magic number. Every preset lzma(1) and rpmbuild
// write starts with this properties byte and dictionary size prefix.
const SIGNATURES: &[(&[u8], Compression)] = &[
    (&[0x28, 0xB5, 0x2F, 0xFD], Compression::Zstd),
    (&[0xFD, b'7', b'z', b'X', b'Z', 0x00], Compression::Xz),
    (&[0x1F, 0x8B], Compression::Gzip),
    (b"BZh", Compression::Bzip2),
    (&[0x5D, 0x00, 0x00], Compression::Lzma),
];

/// RPM `PAYLOADCOMPRESSOR` values, plus the names `Display` produces.
impl FromStr for Compression {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let codec = match tag.trim().to_ascii_lowercase().as_str() {
            "none" | "identity" => Compression::None,
            "bzip2" => Compression::Bzip2,
            "gzip" => Compression::Gzip,
            "lzma" => Compression::Lzma,
            "xz" => Compression::Xz,
            "zstd" => Compression::Zstd,
            _ => exn::bail!(ErrorKind::UnknownCompressor(tag.to_string())),
        };
        Ok(codec)
    }
}

impl Compression {
    /// Recognise a stream from its first bytes. Anything unrecognised,
    /// including a buffer too short to tell, is treated as stored.
    #[must_use]
    pub fn sniff(head: &[u8]) -> Self {
        SIGNATURES
            .iter()
            .find(|(magic, _)| head.starts_with(magic))
            .map_or(Compression::None, |&(_, codec)| codec)
    }

    /// Recognise a codec from an archive member name such as `data.tar.xz`.
    #[must_use]
    pub fn from_member(name: &str) -> Self {
        let Some((stem, suffix)) = name.rsplit_once('.') else {
            return Compression::None;
        };
        if stem.is_empty() {
            return Compression::None;
        }
        match suffix.to_ascii_lowercase().as_str() {
            "bz2" => Compression::Bzip2,
            "gz" => Compression::Gzip,
            "lzma" => Compression::Lzma,
            "xz" => Compression::Xz,
            "zst" => Compression::Zstd,
            _ => Compression::None,
        }
    }
}
