//! Package archive dispatch and extraction.
//!
//! Given a package filename and a reader over its bytes, [`walk`] selects the
//! unpacking strategy for the [`Format`] and streams every regular file inside
//! the archive to a visitor, without touching the filesystem:
//!
//! - **Debian** `.deb`: `ar` envelope, only the `data.tar.*` member is unpacked
//! - **RPM** `.rpm`: lead, signature and main headers, compressed `cpio` payload
//! - **Alpine** `.apk`: concatenated gzip segments forming one tar stream
//! - **Arch** `.pkg.tar.zst`: a compressed tarball
//!
//! Package-manager control files (`.PKGINFO`, `.MTREE`, `.INSTALL` and
//! friends) are never yielded. [`Label`] resolves the name and version a
//! package is recorded under.

mod consts;
pub mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
mod format;
mod formats;
mod label;
mod path;

use std::io::{self, Read};
use std::path::Path;

use tracing::instrument;

use crate::error::Result;
pub use crate::format::Format;
pub use crate::label::Label;

/// A regular file inside an archive, as handed to a [`walk`] visitor.
pub enum Member<'a> {
    /// The file's content, readable exactly once.
    File(&'a mut dyn Read),
    /// A hard link to a file already visited at the given path.
    HardLink(&'a Path),
}

pub(crate) type Visitor<'v> = dyn FnMut(&Path, Member<'_>) -> io::Result<()> + 'v;

/// Stream every regular file in a package archive to `visit`.
///
/// Paths are relative to the extraction root (`usr/bin/foo`). Directories,
/// symlinks, device nodes and control files are skipped. Returns the label
/// embedded in the archive's own metadata when the format has one (RPM), so
/// callers can pass it to [`Label::resolve`].
///
/// An error returned by the visitor aborts the walk.
#[instrument(skip(reader, visit))]
pub fn walk<R: Read>(
    format: Format,
    reader: R,
    mut visit: impl FnMut(&Path, Member<'_>) -> io::Result<()>,
) -> Result<Option<Label>> {
    let visit: &mut Visitor<'_> = &mut visit;
    match format {
        Format::Deb => formats::deb::walk(reader, visit).map(|()| None),
        Format::Rpm => formats::rpm::walk(reader, visit),
        Format::Apk => formats::apk::walk(reader, visit).map(|()| None),
        Format::Arch => formats::arch::walk(reader, visit).map(|()| None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, Node};
    use mirrorhash_compress::Compression;
    use rstest::rstest;
    use std::collections::BTreeMap;
    use std::io::Cursor;
    use std::path::PathBuf;

    const TREE: &[Node<'static>] = &[
        Node::Dir("usr/"),
        Node::Dir("usr/bin/"),
        Node::File("usr/bin/foo", b"#!/bin/sh\necho foo\n"),
        Node::File("usr/share/doc/foo/copyright", b"MIT"),
        Node::Symlink("usr/bin/bar", "foo"),
        Node::File("etc/foo.conf", b""),
    ];

    fn collect(format: Format, bytes: Vec<u8>) -> (Option<Label>, BTreeMap<PathBuf, Vec<u8>>) {
        let mut files = BTreeMap::new();
        let label = walk(format, Cursor::new(bytes), |path, member| {
            let content = match member {
                Member::File(reader) => {
                    let mut content = Vec::new();
                    reader.read_to_end(&mut content)?;
                    content
                },
                Member::HardLink(target) => files.get(target).cloned().unwrap_or_default(),
            };
            files.insert(path.to_path_buf(), content);
            Ok(())
        })
        .unwrap();
        (label, files)
    }

    fn expected() -> BTreeMap<PathBuf, Vec<u8>> {
        BTreeMap::from([
            (PathBuf::from("etc/foo.conf"), b"".to_vec()),
            (PathBuf::from("usr/bin/foo"), b"#!/bin/sh\necho foo\n".to_vec()),
            (PathBuf::from("usr/share/doc/foo/copyright"), b"MIT".to_vec()),
        ])
    }

    #[rstest]
    #[case(Compression::Gzip)]
    #[case(Compression::Xz)]
    #[case(Compression::Zstd)]
    #[case(Compression::None)]
    fn test_deb(#[case] compression: Compression) {
        let (label, files) = collect(Format::Deb, fixtures::deb(TREE, compression));
        assert_eq!(label, None);
        assert_eq!(files, expected());
    }

    #[rstest]
    #[case(Compression::Gzip)]
    #[case(Compression::Xz)]
    #[case(Compression::Zstd)]
    fn test_rpm(#[case] compression: Compression) {
        let bytes = fixtures::rpm(&Label::new("foo", "1.0"), "3.el9", TREE, compression);
        let (label, files) = collect(Format::Rpm, bytes);
        assert_eq!(label, Some(Label::new("foo", "1.0-3.el9")));
        assert_eq!(files, expected());
    }

    #[test]
    fn test_apk_skips_control_files() {
        let (label, files) = collect(Format::Apk, fixtures::apk(TREE));
        assert_eq!(label, None);
        assert_eq!(files, expected());
    }

    #[test]
    fn test_arch_skips_control_files() {
        let (label, files) = collect(Format::Arch, fixtures::arch(TREE));
        assert_eq!(label, None);
        assert_eq!(files, expected());
    }

    #[rstest]
    #[case(Format::Deb)]
    #[case(Format::Rpm)]
    #[case(Format::Apk)]
    #[case(Format::Arch)]
    fn test_garbage_is_an_error(#[case] format: Format) {
        let result = walk(format, Cursor::new(b"<html>404 Not Found</html>".to_vec()), |_, _| Ok(()));
        assert!(result.is_err());
    }

    #[rstest]
    #[case(Format::Deb)]
    #[case(Format::Rpm)]
    #[case(Format::Apk)]
    #[case(Format::Arch)]
    fn test_hard_links_reference_earlier_file(#[case] format: Format) {
        let tree = [Node::File("usr/bin/foo", b"foo"), Node::HardLink("usr/bin/foo-alias", "usr/bin/foo")];
        let bytes = match format {
            Format::Deb => fixtures::deb(&tree, Compression::Gzip),
            Format::Rpm => fixtures::rpm(&Label::new("foo", "1.0"), "1", &tree, Compression::Gzip),
            Format::Apk => fixtures::apk(&tree),
            Format::Arch => fixtures::arch(&tree),
        };
        let mut seen = Vec::new();
        walk(format, Cursor::new(bytes), |path, member| {
            let link = match member {
                Member::File(reader) => {
                    io::copy(reader, &mut io::sink())?;
                    None
                },
                Member::HardLink(target) => Some(target.to_path_buf()),
            };
            seen.push((path.to_path_buf(), link));
            Ok(())
        })
        .unwrap();
        assert_eq!(
            seen,
            vec![
                (PathBuf::from("usr/bin/foo"), None),
                (PathBuf::from("usr/bin/foo-alias"), Some(PathBuf::from("usr/bin/foo"))),
            ]
        );
    }

    #[test]
    fn test_visitor_error_aborts_walk() {
        let bytes = fixtures::deb(TREE, Compression::Gzip);
        let result = walk(Format::Deb, Cursor::new(bytes), |_, _| Err(io::Error::other("disk full")));
        assert!(result.is_err());
    }
}
