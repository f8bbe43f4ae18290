use std::io::Read;

use mirrorhash_compress::Compression;

use super::{ar, decompress, tarball};
use crate::Visitor;
use crate::consts::DEB_DATA_MEMBER;
use crate::error::{ErrorKind, Result};

/// Unpack the `data.tar[.gz|.xz|.bz2|.lzma|.zst]` member of a Debian package.
/// `debian-binary` and `control.tar.*` are skipped.
pub(crate) fn walk<R: Read>(reader: R, visit: &mut Visitor<'_>) -> Result<()> {
    let mut found = false;
    ar::for_each_member(reader, |name, member| {
        if !name.starts_with(DEB_DATA_MEMBER) {
            return Ok(());
        }
        if found {
            exn::bail!(ErrorKind::Corrupt("duplicate data member"));
        }
        found = true;
        let data = decompress(Compression::from_member(name), member)?;
        tarball::walk(data, |_| false, visit)
    })?;
    if !found {
        exn::bail!(ErrorKind::MissingMember(DEB_DATA_MEMBER));
    }
    Ok(())
}
