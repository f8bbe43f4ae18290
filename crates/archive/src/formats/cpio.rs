//! Reader for the SVR4 "newc" cpio archives carried by RPM payloads.
//!
//! Each entry is a 110-byte ASCII-hex header, the NUL-terminated name, and
//! the file data; both name and data are padded to a 4-byte boundary. The
//! archive ends with an entry named `TRAILER!!!`.
//!
//! Hard links share an inode number; only the last entry of a link set
//! carries the data, the earlier ones have a size of zero.

use std::collections::HashMap;
use std::io::{self, Read};
use std::path::PathBuf;

use exn::{OptionExt, ResultExt};

use super::skip;
use crate::error::{ErrorKind, Result};
use crate::path::normalize;
use crate::{Member, Visitor};

const MAGIC_NEWC: &[u8; 6] = b"070701";
const MAGIC_CRC: &[u8; 6] = b"070702";
pub(crate) const HEADER_LEN: usize = 110;
pub(crate) const TRAILER: &str = "TRAILER!!!";
/// Longest name accepted, terminator included; matches Linux `PATH_MAX`.
const NAME_MAX: usize = 4096;

const S_IFMT: u32 = 0o170_000;
const S_IFREG: u32 = 0o100_000;

/// Header fields in on-disk order, after the magic.
#[derive(Clone, Copy)]
enum Field {
    Ino = 0,
    Mode = 1,
    Nlink = 4,
    FileSize = 6,
    DevMajor = 7,
    DevMinor = 8,
    NameSize = 11,
}

struct Header([u8; HEADER_LEN]);

impl Header {
    fn field(&self, field: Field) -> Result<u32> {
        let start = 6 + field as usize * 8;
        std::str::from_utf8(&self.0[start..start + 8])
            .ok()
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .ok_or_raise(|| ErrorKind::Corrupt("bad cpio header field"))
    }
}

/// Inode identity of a hard-link set.
type Inode = (u32, u32, u32);

pub(crate) fn walk<R: Read>(mut reader: R, visit: &mut Visitor<'_>) -> Result<()> {
    let mut offset: u64 = 0;
    // Paths of link-set members seen before the one carrying the data.
    let mut pending: HashMap<Inode, Vec<PathBuf>> = HashMap::new();
    loop {
        let mut header = Header([0u8; HEADER_LEN]);
        reader.read_exact(&mut header.0).or_raise(|| ErrorKind::Corrupt("truncated cpio header"))?;
        if &header.0[..6] != MAGIC_NEWC && &header.0[..6] != MAGIC_CRC {
            exn::bail!(ErrorKind::Corrupt("unsupported cpio format"));
        }
        offset += HEADER_LEN as u64;

        let name_size = header.field(Field::NameSize)? as usize;
        if name_size > NAME_MAX {
            exn::bail!(ErrorKind::Corrupt("cpio member name too long"));
        }
        let mut name = vec![0u8; name_size];
        reader.read_exact(&mut name).or_raise(|| ErrorKind::Corrupt("truncated cpio name"))?;
        offset += name_size as u64;
        align(&mut reader, &mut offset)?;
        let name = String::from_utf8_lossy(name.strip_suffix(&[0]).unwrap_or(&name)).into_owned();
        if name == TRAILER {
            break;
        }

        let size = u64::from(header.field(Field::FileSize)?);
        let mode = header.field(Field::Mode)?;
        let nlink = header.field(Field::Nlink)?;
        let inode = (header.field(Field::DevMajor)?, header.field(Field::DevMinor)?, header.field(Field::Ino)?);
        let mut data = (&mut reader).take(size);

        let path = match normalize(&name)? {
            Some(path) if mode & S_IFMT == S_IFREG => Some(path),
            _ => None,
        };
        if let Some(path) = path {
            if nlink > 1 && size == 0 {
                pending.entry(inode).or_default().push(path);
            } else {
                visit(&path, Member::File(&mut data)).or_raise(|| ErrorKind::Read(path.display().to_string()))?;
                for link in pending.remove(&inode).unwrap_or_default() {
                    visit(&link, Member::HardLink(&path)).or_raise(|| ErrorKind::Read(link.display().to_string()))?;
                }
            }
        }
        io::copy(&mut data, &mut io::sink()).or_raise(|| ErrorKind::Corrupt("truncated cpio data"))?;
        if data.limit() > 0 {
            exn::bail!(ErrorKind::Corrupt("truncated cpio data"));
        }
        offset += size;
        align(&mut reader, &mut offset)?;
    }
    // Link sets of empty files never carry data: the first path stands in
    // for the file, the rest link to it.
    for (_, paths) in pending {
        let mut paths = paths.into_iter();
        if let Some(first) = paths.next() {
            visit(&first, Member::File(&mut io::empty())).or_raise(|| ErrorKind::Read(first.display().to_string()))?;
            for link in paths {
                visit(&link, Member::HardLink(&first)).or_raise(|| ErrorKind::Read(link.display().to_string()))?;
            }
        }
    }
    Ok(())
}

fn align(reader: &mut impl Read, offset: &mut u64) -> Result<()> {
    let padding = (4 - *offset % 4) % 4;
    skip(reader, padding).or_raise(|| ErrorKind::Corrupt("truncated cpio padding"))?;
    *offset += padding;
    Ok(())
}

/// Encode one entry; used to build test archives.
#[cfg(any(test, feature = "fixtures"))]
pub(crate) fn entry(out: &mut Vec<u8>, ino: u32, mode: u32, nlink: u32, name: &str, data: &[u8]) {
    let fields = [ino, mode, 0, 0, nlink, 0, data.len() as u32, 0, 0, 0, 0, name.len() as u32 + 1, 0];
    out.extend_from_slice(MAGIC_NEWC);
    for field in fields {
        out.extend(format!("{field:08X}").into_bytes());
    }
    out.extend_from_slice(name.as_bytes());
    out.push(0);
    out.resize(out.len().next_multiple_of(4), 0);
    out.extend_from_slice(data);
    out.resize(out.len().next_multiple_of(4), 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::Path;

    const FILE: u32 = S_IFREG | 0o644;
    const DIR: u32 = 0o040_755;

    fn paths(bytes: Vec<u8>) -> Vec<(PathBuf, Vec<u8>)> {
        let mut seen = Vec::new();
        walk(Cursor::new(bytes), &mut |path: &Path, member: Member<'_>| {
            let mut content = Vec::new();
            match member {
                Member::File(reader) => {
                    reader.read_to_end(&mut content)?;
                },
                Member::HardLink(target) => content.extend(target.as_os_str().as_encoded_bytes()),
            }
            seen.push((path.to_path_buf(), content));
            Ok(())
        })
        .unwrap();
        seen
    }

    #[test]
    fn test_regular_files_only() {
        let mut bytes = Vec::new();
        entry(&mut bytes, 1, DIR, 2, "./usr", b"");
        entry(&mut bytes, 2, FILE, 1, "./usr/bin/a", b"abc");
        entry(&mut bytes, 3, 0o120_777, 1, "./usr/bin/b", b"a");
        entry(&mut bytes, 4, FILE, 1, "./usr/bin/c", b"");
        entry(&mut bytes, 0, 0, 1, TRAILER, b"");
        assert_eq!(
            paths(bytes),
            vec![(PathBuf::from("usr/bin/a"), b"abc".to_vec()), (PathBuf::from("usr/bin/c"), Vec::new())]
        );
    }

    #[test]
    fn test_empty_link_set() {
        let mut bytes = Vec::new();
        entry(&mut bytes, 7, FILE, 2, "./a", b"");
        entry(&mut bytes, 7, FILE, 2, "./b", b"");
        entry(&mut bytes, 0, 0, 1, TRAILER, b"");
        assert_eq!(paths(bytes), vec![(PathBuf::from("a"), Vec::new()), (PathBuf::from("b"), b"a".to_vec())]);
    }

    #[test]
    fn test_missing_trailer() {
        let mut bytes = Vec::new();
        entry(&mut bytes, 2, FILE, 1, "./a", b"abc");
        assert!(walk(Cursor::new(bytes), &mut |_, _| Ok(())).is_err());
    }

    #[test]
    fn test_odc_is_rejected() {
        let mut bytes = b"070707".to_vec();
        bytes.resize(HEADER_LEN, b'0');
        let err = walk(Cursor::new(bytes), &mut |_, _| Ok(())).unwrap_err();
        assert_eq!(*err, ErrorKind::Corrupt("unsupported cpio format"));
    }

    #[test]
    fn test_oversized_name_is_rejected() {
        let mut bytes = Vec::new();
        entry(&mut bytes, 2, FILE, 1, "./a", b"abc");
        let start = 6 + Field::NameSize as usize * 8;
        bytes[start..start + 8].copy_from_slice(format!("{:08X}", NAME_MAX + 1).as_bytes());
        let err = walk(Cursor::new(bytes), &mut |_, _| Ok(())).unwrap_err();
        assert_eq!(*err, ErrorKind::Corrupt("cpio member name too long"));
    }
}
