//! Reader for the `ar` envelope of Debian packages.
//!
//! Layout: an 8-byte global magic, then per member a 60-byte ASCII header
//! (name, mtime, uid, gid, mode, decimal size, terminator) followed by the
//! member data padded to an even offset.

use std::io::Read;

use exn::{OptionExt, ResultExt};

use super::read_fill;
use crate::error::{ErrorKind, Result};

const MAGIC: &[u8; 8] = b"!<arch>\n";
const HEADER_LEN: usize = 60;
const HEADER_END: &[u8; 2] = b"`\n";

/// Call `visit` with the name and a reader over each member's data, in
/// archive order. Whatever the visitor leaves unread is skipped.
pub(crate) fn for_each_member<R: Read>(
    mut reader: R,
    mut visit: impl FnMut(&str, &mut dyn Read) -> Result<()>,
) -> Result<()> {
    let mut magic = [0u8; MAGIC.len()];
    reader.read_exact(&mut magic).or_raise(|| ErrorKind::Corrupt("missing ar magic"))?;
    if &magic != MAGIC {
        exn::bail!(ErrorKind::Corrupt("missing ar magic"));
    }
    loop {
        let mut header = [0u8; HEADER_LEN];
        match read_fill(&mut reader, &mut header).or_raise(|| ErrorKind::Corrupt("unreadable ar header"))? {
            0 => return Ok(()),
            HEADER_LEN => {},
            _ => exn::bail!(ErrorKind::Corrupt("truncated ar header")),
        }
        if &header[58..60] != HEADER_END {
            exn::bail!(ErrorKind::Corrupt("bad ar header terminator"));
        }
        let name = std::str::from_utf8(&header[0..16])
            .or_raise(|| ErrorKind::Corrupt("non-ASCII ar member name"))?
            .trim_end()
            // GNU ar terminates names with a slash.
            .trim_end_matches('/')
            .to_string();
        let size: u64 = std::str::from_utf8(&header[48..58])
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .ok_or_raise(|| ErrorKind::Corrupt("bad ar member size"))?;

        let mut member = (&mut reader).take(size);
        visit(&name, &mut member)?;
        std::io::copy(&mut member, &mut std::io::sink()).or_raise(|| ErrorKind::Corrupt("truncated ar member"))?;
        if member.limit() > 0 {
            exn::bail!(ErrorKind::Corrupt("truncated ar member"));
        }
        if size % 2 == 1 {
            // The final member's padding byte is optional in practice.
            let mut pad = [0u8; 1];
            read_fill(&mut reader, &mut pad).or_raise(|| ErrorKind::Corrupt("unreadable ar padding"))?;
        }
    }
}

/// Encode one member header; used to build test archives.
#[cfg(any(test, feature = "fixtures"))]
pub(crate) fn header(name: &str, size: usize) -> Vec<u8> {
    format!("{name:<16}{:<12}{:<6}{:<6}{:<8}{size:<10}`\n", 0, 0, 0, "100644").into_bytes()
}
