//! Builders for small but structurally valid package archives.
//!
//! Only available with the `fixtures` feature (and in this crate's tests).
//! Each builder lays out the same [`Node`] tree the way the real packaging
//! tool would, including the control files the walker must skip.

use std::collections::HashMap;

use mirrorhash_compress::Compression;
use tar::{Builder, EntryType, Header};

use crate::Label;
use crate::formats::{ar, cpio, rpm};

/// One entry of a package's file tree.
#[derive(Clone, Copy, Debug)]
pub enum Node<'a> {
    File(&'a str, &'a [u8]),
    Dir(&'a str),
    Symlink(&'a str, &'a str),
    /// `HardLink(path, target)`: a second name for an earlier [`Node::File`].
    HardLink(&'a str, &'a str),
}

/// A Debian package with the data member compressed as given.
pub fn deb(nodes: &[Node<'_>], compression: Compression) -> Vec<u8> {
    let control = Compression::Gzip
        .encode(&tarball(&[Node::File("./control", b"Package: fixture\nVersion: 1.0\n")], true))
        .expect("gzip control member");
    let data = compression.encode(&tarball(nodes, true)).expect("compress data member");

    let data_name = format!("data.tar{}", compression.suffix());
    let members: [(&str, &[u8]); 3] =
        [("debian-binary", b"2.0\n"), ("control.tar.gz", &control), (&data_name, &data)];

    let mut out = b"!<arch>\n".to_vec();
    for (name, member) in members {
        out.extend(ar::header(name, member.len()));
        out.extend_from_slice(member);
        if member.len() % 2 == 1 {
            out.push(b'\n');
        }
    }
    out
}

/// An RPM package whose header carries `label` and `release`, with the cpio
/// payload compressed as given.
pub fn rpm(label: &Label, release: &str, nodes: &[Node<'_>], compression: Compression) -> Vec<u8> {
    let payload = compression.encode(&cpio_archive(nodes)).expect("compress payload");
    let compressor = compression.to_string();
    rpm_with_tags(
        &[
            (rpm::TAG_NAME, label.name.as_str()),
            (rpm::TAG_VERSION, label.version.as_str()),
            (rpm::TAG_RELEASE, release),
            (rpm::TAG_PAYLOAD_FORMAT, "cpio"),
            (rpm::TAG_PAYLOAD_COMPRESSOR, compressor.as_str()),
        ],
        &payload,
    )
}

/// An RPM package with exactly the given string tags in its main header and
/// an already-compressed payload.
pub fn rpm_with_tags(tags: &[(u32, &str)], payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; rpm::LEAD_LEN];
    out[..4].copy_from_slice(&rpm::LEAD_MAGIC);
    out[4] = 3;
    out[79] = 5;
    // Empty signature header; 16 bytes is already 8-aligned.
    out.extend(rpm_header(&[]));
    out.extend(rpm_header(tags));
    out.extend_from_slice(payload);
    out
}

/// An Alpine package: signature, control and data segments, each its own
/// gzip member, with only the last tar segment terminated.
pub fn apk(nodes: &[Node<'_>]) -> Vec<u8> {
    let signature = [Node::File(".SIGN.RSA.fixture@example.org-00000000.rsa.pub", b"signature")];
    let control = [
        Node::File(".PKGINFO", b"pkgname = fixture\npkgver = 1.0-r0\n"),
        Node::File(".post-install", b"#!/bin/sh\nexit 0\n"),
    ];
    let mut out = Vec::new();
    for segment in [tarball(&signature, false), tarball(&control, false), tarball(nodes, true)] {
        out.extend(Compression::Gzip.encode(&segment).expect("gzip segment"));
    }
    out
}

/// An Arch package: one zstd tarball, metadata first.
pub fn arch(nodes: &[Node<'_>]) -> Vec<u8> {
    let mut all = vec![
        Node::File(".BUILDINFO", b"format = 2\n"),
        Node::File(".MTREE", b"\x1f\x8b"),
        Node::File(".PKGINFO", b"pkgname = fixture\npkgver = 1.0-1\n"),
        Node::File(".INSTALL", b"post_install() { :; }\n"),
    ];
    all.extend_from_slice(nodes);
    Compression::Zstd.encode(&tarball(&all, true)).expect("zstd tarball")
}

const EMPTY: &[u8] = &[];

fn tarball(nodes: &[Node<'_>], terminate: bool) -> Vec<u8> {
    let mut builder = Builder::new(Vec::new());
    for node in nodes {
        let (kind, mode, path, data, link) = match *node {
            Node::File(path, data) => (EntryType::Regular, 0o644, path, data, None),
            Node::Dir(path) => (EntryType::Directory, 0o755, path, EMPTY, None),
            Node::Symlink(path, target) => (EntryType::Symlink, 0o777, path, EMPTY, Some(target)),
            Node::HardLink(path, target) => (EntryType::Link, 0o644, path, EMPTY, Some(target)),
        };
        let mut header = Header::new_gnu();
        header.set_entry_type(kind);
        header.set_mode(mode);
        header.set_mtime(0);
        header.set_size(data.len() as u64);
        if let Some(target) = link {
            header.set_link_name(target).expect("short link target");
        }
        builder.append_data(&mut header, path, data).expect("append tar entry");
    }
    let mut bytes = builder.into_inner().expect("finish tarball");
    if !terminate {
        // Drop the two zero blocks of the end-of-archive marker.
        bytes.truncate(bytes.len() - 1024);
    }
    bytes
}

fn cpio_archive(nodes: &[Node<'_>]) -> Vec<u8> {
    let mut links: HashMap<&str, Vec<&str>> = HashMap::new();
    for node in nodes {
        if let Node::HardLink(path, target) = *node {
            links.entry(target).or_default().push(path);
        }
    }
    let mut out = Vec::new();
    for (ino, node) in (1..).zip(nodes) {
        match *node {
            Node::File(path, data) => {
                let aliases = links.remove(path).unwrap_or_default();
                let nlink = aliases.len() as u32 + 1;
                // rpm writes the data on the last name of a link set.
                for alias in aliases {
                    cpio::entry(&mut out, ino, 0o100_644, nlink, &format!("./{alias}"), b"");
                }
                cpio::entry(&mut out, ino, 0o100_644, nlink, &format!("./{path}"), data);
            },
            Node::Dir(path) => cpio::entry(&mut out, ino, 0o040_755, 2, &format!("./{path}"), b""),
            Node::Symlink(path, target) => {
                cpio::entry(&mut out, ino, 0o120_777, 1, &format!("./{path}"), target.as_bytes())
            },
            Node::HardLink(..) => {},
        }
    }
    cpio::entry(&mut out, 0, 0, 1, cpio::TRAILER, b"");
    out
}

fn rpm_header(tags: &[(u32, &str)]) -> Vec<u8> {
    let mut index = Vec::new();
    let mut store = Vec::new();
    for (tag, value) in tags {
        index.extend(tag.to_be_bytes());
        index.extend(rpm::TYPE_STRING.to_be_bytes());
        index.extend((store.len() as u32).to_be_bytes());
        index.extend(1u32.to_be_bytes());
        store.extend_from_slice(value.as_bytes());
        store.push(0);
    }
    let mut out = rpm::HEADER_MAGIC.to_vec();
    out.extend([0u8; 4]);
    out.extend((tags.len() as u32).to_be_bytes());
    out.extend((store.len() as u32).to_be_bytes());
    out.extend(index);
    out.extend(store);
    out
}
