use crate::Compression;
use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An RPM names a payload compressor nothing here can decode.
    #[display("unknown payload compressor: {_0}")]
    UnknownCompressor(#[error(not(source))] String),
    #[display("cannot start {_0} decoder")]
    Decoder(#[error(not(source))] Compression),
    #[display("cannot start {_0} encoder")]
    Encoder(#[error(not(source))] Compression),
    #[display("write to encoder failed")]
    Io,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_codec() {
        assert_eq!(ErrorKind::Decoder(Compression::Zstd).to_string(), "cannot start zstd decoder");
        assert_eq!(
            ErrorKind::UnknownCompressor("lz4".to_string()).to_string(),
            "unknown payload compressor: lz4"
        );
    }
}
