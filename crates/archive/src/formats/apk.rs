use std::io::Read;

use mirrorhash_compress::Compression;

use super::{decompress, tarball};
use crate::Visitor;
use crate::error::Result;
use crate::path::is_control_file;

/// An Alpine package is a signature segment, a control segment and a data
/// segment, each a gzip member holding part of one tar stream. Decoding the
/// members back to back yields the whole stream.
pub(crate) fn walk<R: Read>(reader: R, visit: &mut Visitor<'_>) -> Result<()> {
    let stream = decompress(Compression::Gzip, reader)?;
    tarball::walk(stream, is_control_file, visit)
}
