pub(crate) mod apk;
pub(crate) mod ar;
pub(crate) mod arch;
pub(crate) mod cpio;
pub(crate) mod deb;
pub(crate) mod rpm;
pub(crate) mod tarball;

use std::io::{BufRead, BufReader, Read};

use exn::ResultExt;
use mirrorhash_compress::Compression;

use crate::error::{ErrorKind, Result};

/// Fill the read buffer, detect the compression from its magic bytes, and
/// return a decompressing reader positioned at the start of the stream.
pub(crate) fn sniff<'a, R: Read + 'a>(reader: R) -> Result<Box<dyn Read + 'a>> {
    let mut reader = BufReader::new(reader);
    let compression = Compression::sniff(reader.fill_buf().or_raise(|| ErrorKind::Corrupt("unreadable stream"))?);
    decompress(compression, reader)
}

pub(crate) fn decompress<'a, R: Read + 'a>(compression: Compression, reader: R) -> Result<Box<dyn Read + 'a>> {
    compression
        .decoder(reader)
        .or_raise(|| ErrorKind::Decompression(compression.to_string()))
}

/// Read until `buf` is full or the reader is exhausted, returning the number
/// of bytes read. Distinguishes a clean end of stream (0) from truncation.
pub(crate) fn read_fill(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {},
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Discard exactly `count` bytes.
pub(crate) fn skip(reader: &mut impl Read, count: u64) -> std::io::Result<()> {
    let skipped = std::io::copy(&mut reader.take(count), &mut std::io::sink())?;
    if skipped < count {
        return Err(std::io::ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}
