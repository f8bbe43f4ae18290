//! Member path normalization.

use std::path::{Component, Path, PathBuf};

use crate::consts::{CONTROL_FILES, SIGNATURE_PREFIX};
use crate::error::{ErrorKind, Result};

/// Normalizes an archive member path relative to the extraction root.
///
/// Leading `./` and `/` are dropped and `..` is resolved, so tar's
/// `./usr/bin/foo` and cpio's `/usr/bin/foo` both become `usr/bin/foo`.
/// Returns `None` for the root itself (the `./` entry most tarballs start
/// with), and [`UnsafePath`](ErrorKind::UnsafePath) for anything that would
/// land outside the root.
pub(crate) fn normalize(path: impl AsRef<Path>) -> Result<Option<PathBuf>> {
    let path = path.as_ref();
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::UnsafePath(path.to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::UnsafePath(path.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::UnsafePath(path.to_path_buf()));
                }
            },
        }
    }
    Ok((!components.is_empty()).then(|| components.into_iter().collect()))
}

/// Whether a normalized member path is package-manager metadata rather than
/// installed content.
pub(crate) fn is_control_file(path: &Path) -> bool {
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => name.to_str().is_some_and(|name| {
            CONTROL_FILES.contains(&name) || name.starts_with(SIGNATURE_PREFIX)
        }),
        _ => false,
    }
}
