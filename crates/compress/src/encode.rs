use crate::Compression;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::Write;
use tracing::instrument;
use xz2::stream::{LzmaOptions, Stream};

const PRESET: u32 = 6;

impl Compression {
    /// Encode `input` in memory.
    ///
    /// ```
    /// use mirrorhash_compress::Compression;
    ///
    /// let encoded = Compression::Xz.encode(b"Package: foo\n").unwrap();
    /// assert_eq!(Compression::sniff(&encoded), Compression::Xz);
    /// ```
    #[instrument(level = "trace", skip(input), fields(codec = %self, len = input.len()))]
    pub fn encode(self, input: &[u8]) -> Result<Vec<u8>> {
        let output = match self {
            Compression::None => input.to_vec(),
            Compression::Bzip2 => {
                let encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::fast());
                finish(encoder, input, |e| e.finish())?
            },
            Compression::Gzip => {
                let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
                finish(encoder, input, |e| e.finish())?
            },
            Compression::Lzma => {
                let options = LzmaOptions::new_preset(PRESET).or_raise(|| ErrorKind::Encoder(self))?;
                let stream = Stream::new_lzma_encoder(&options).or_raise(|| ErrorKind::Encoder(self))?;
                finish(xz2::write::XzEncoder::new_stream(Vec::new(), stream), input, |e| e.finish())?
            },
            Compression::Xz => finish(xz2::write::XzEncoder::new(Vec::new(), PRESET), input, |e| e.finish())?,
            Compression::Zstd => {
                let encoder = zstd::Encoder::new(Vec::new(), 0).or_raise(|| ErrorKind::Encoder(self))?;
                finish(encoder, input, |e| e.finish())?
            },
        };
        Ok(output)
    }
}

fn finish<W: Write>(
    mut encoder: W,
    input: &[u8],
    close: impl FnOnce(W) -> std::io::Result<Vec<u8>>,
) -> Result<Vec<u8>> {
    encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
    close(encoder).or_raise(|| ErrorKind::Io)
}
