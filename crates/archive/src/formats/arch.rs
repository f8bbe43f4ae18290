use std::io::Read;

use super::{sniff, tarball};
use crate::Visitor;
use crate::error::Result;
use crate::path::is_control_file;

/// Arch packages are a single compressed tarball: zstd today, xz for older
/// packages still on the mirrors, so the compression is sniffed.
pub(crate) fn walk<R: Read>(reader: R, visit: &mut Visitor<'_>) -> Result<()> {
    tarball::walk(sniff(reader)?, is_control_file, visit)
}
