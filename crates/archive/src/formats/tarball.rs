use std::io::Read;
use std::path::Path;

use exn::ResultExt;

use crate::error::{ErrorKind, Result};
use crate::path::normalize;
use crate::{Member, Visitor};

/// Visit the regular files and hard links of a tar stream.
///
/// `skip` filters normalized paths before they reach the visitor. End-of-archive
/// markers are read past, since Alpine packages concatenate several tar
/// segments into one stream.
pub(crate) fn walk<R: Read>(reader: R, skip: impl Fn(&Path) -> bool, visit: &mut Visitor<'_>) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    archive.set_ignore_zeros(true);
    let entries = archive.entries().or_raise(|| ErrorKind::Corrupt("unreadable tar stream"))?;
    for entry in entries {
        let mut entry = entry.or_raise(|| ErrorKind::Corrupt("bad tar entry"))?;
        let kind = entry.header().entry_type();
        if !kind.is_file() && !kind.is_hard_link() {
            continue;
        }
        let raw = entry.path().or_raise(|| ErrorKind::Corrupt("bad tar entry path"))?.into_owned();
        let Some(path) = normalize(&raw)? else {
            continue;
        };
        if skip(&path) {
            continue;
        }
        if kind.is_hard_link() {
            let target = entry
                .link_name()
                .or_raise(|| ErrorKind::Corrupt("bad tar link target"))?
                .map(|target| target.into_owned());
            if let Some(target) = target.as_deref().map(normalize).transpose()?.flatten() {
                visit(&path, Member::HardLink(&target)).or_raise(|| ErrorKind::Read(path.display().to_string()))?;
            }
            continue;
        }
        visit(&path, Member::File(&mut entry)).or_raise(|| ErrorKind::Read(path.display().to_string()))?;
    }
    Ok(())
}
