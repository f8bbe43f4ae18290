use crate::Compression;
use crate::error::{ErrorKind, Result};
use bzip2::read::MultiBzDecoder;
use exn::ResultExt;
use flate2::read::MultiGzDecoder;
use std::io::Read;
use xz2::read::XzDecoder;
use xz2::stream::Stream;

// Payload sizes are bounded by the download, not by the decoder.
const LZMA_MEMLIMIT: u64 = u64::MAX;

impl Compression {
    /// Wrap `reader` so that reading yields the decoded stream.
    ///
    /// Gzip, bzip2 and xz decoders carry on across concatenated members,
    /// which is how Alpine lays out its packages.
    pub fn decoder<'a, R: Read + 'a>(self, reader: R) -> Result<Box<dyn Read + 'a>> {
        let decoder: Box<dyn Read + 'a> = match self {
            Compression::None => Box::new(reader),
            Compression::Bzip2 => Box::new(MultiBzDecoder::new(reader)),
            Compression::Gzip => Box::new(MultiGzDecoder::new(reader)),
            Compression::Lzma => {
                let stream = Stream::new_lzma_decoder(LZMA_MEMLIMIT).or_raise(|| ErrorKind::Decoder(self))?;
                Box::new(XzDecoder::new_stream(reader, stream))
            },
            Compression::Xz => Box::new(XzDecoder::new_multi_decoder(reader)),
            Compression::Zstd => Box::new(zstd::Decoder::new(reader).or_raise(|| ErrorKind::Decoder(self))?),
        };
        Ok(decoder)
    }
}
