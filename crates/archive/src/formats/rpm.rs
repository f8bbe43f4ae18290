//! RPM package reader.
//!
//! Layout: a 96-byte lead, the signature header (padded to 8 bytes), the
//! main header, then the compressed cpio payload. Both headers share one
//! structure: magic, reserved bytes, entry count, data size, 16-byte index
//! entries `(tag, type, offset, count)` and a data store they point into.

use std::io::{BufRead, BufReader, Read};

use exn::ResultExt;
use mirrorhash_compress::Compression;

use super::{cpio, decompress, skip};
use crate::Visitor;
use crate::error::{ErrorKind, Result};
use crate::label::Label;

pub(crate) const LEAD_LEN: usize = 96;
pub(crate) const LEAD_MAGIC: [u8; 4] = [0xED, 0xAB, 0xEE, 0xDB];
pub(crate) const HEADER_MAGIC: [u8; 4] = [0x8E, 0xAD, 0xE8, 0x01];

// rpm's own sanity limits for a header.
const MAX_ENTRIES: u32 = 0xFFFF;
const MAX_STORE: u32 = 256 * 1024 * 1024;

pub(crate) const TAG_NAME: u32 = 1000;
pub(crate) const TAG_VERSION: u32 = 1001;
pub(crate) const TAG_RELEASE: u32 = 1002;
pub(crate) const TAG_PAYLOAD_FORMAT: u32 = 1124;
pub(crate) const TAG_PAYLOAD_COMPRESSOR: u32 = 1125;

pub(crate) const TYPE_STRING: u32 = 6;
const TYPE_I18N_STRING: u32 = 9;

struct IndexEntry {
    tag: u32,
    kind: u32,
    offset: u32,
}

struct Header {
    index: Vec<IndexEntry>,
    store: Vec<u8>,
}

impl Header {
    fn read(reader: &mut impl Read, pad_to_eight: bool) -> Result<Self> {
        let mut intro = [0u8; 16];
        reader.read_exact(&mut intro).or_raise(|| ErrorKind::Corrupt("truncated rpm header"))?;
        if intro[..4] != HEADER_MAGIC {
            exn::bail!(ErrorKind::Corrupt("bad rpm header magic"));
        }
        let entries = be_u32(&intro[8..12]);
        let store_len = be_u32(&intro[12..16]);
        if entries > MAX_ENTRIES || store_len > MAX_STORE {
            exn::bail!(ErrorKind::Corrupt("oversized rpm header"));
        }

        let mut raw = vec![0u8; entries as usize * 16];
        reader.read_exact(&mut raw).or_raise(|| ErrorKind::Corrupt("truncated rpm header index"))?;
        let index = raw
            .chunks_exact(16)
            .map(|chunk| IndexEntry {
                tag: be_u32(&chunk[0..4]),
                kind: be_u32(&chunk[4..8]),
                offset: be_u32(&chunk[8..12]),
            })
            .collect();
        let mut store = vec![0u8; store_len as usize];
        reader.read_exact(&mut store).or_raise(|| ErrorKind::Corrupt("truncated rpm header store"))?;
        if pad_to_eight {
            let padding = (8 - u64::from(store_len) % 8) % 8;
            skip(reader, padding).or_raise(|| ErrorKind::Corrupt("truncated rpm signature padding"))?;
        }
        Ok(Self { index, store })
    }

    fn string(&self, tag: u32) -> Option<String> {
        let entry = self
            .index
            .iter()
            .find(|entry| entry.tag == tag && matches!(entry.kind, TYPE_STRING | TYPE_I18N_STRING))?;
        let value = self.store.get(entry.offset as usize..)?;
        let end = value.iter().position(|&b| b == 0)?;
        let value = String::from_utf8_lossy(&value[..end]).trim().to_string();
        (!value.is_empty()).then_some(value)
    }

    fn label(&self) -> Option<Label> {
        let name = self.string(TAG_NAME)?;
        let version = self.string(TAG_VERSION)?;
        Some(match self.string(TAG_RELEASE) {
            Some(release) => Label::new(name, format!("{version}-{release}")),
            None => Label::new(name, version),
        })
    }
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

pub(crate) fn walk<R: Read>(mut reader: R, visit: &mut Visitor<'_>) -> Result<Option<Label>> {
    let mut lead = [0u8; LEAD_LEN];
    reader.read_exact(&mut lead).or_raise(|| ErrorKind::Corrupt("truncated rpm lead"))?;
    if lead[..4] != LEAD_MAGIC {
        exn::bail!(ErrorKind::Corrupt("bad rpm lead magic"));
    }
    Header::read(&mut reader, true)?;
    let header = Header::read(&mut reader, false)?;

    if let Some(format) = header.string(TAG_PAYLOAD_FORMAT)
        && format != "cpio"
    {
        exn::bail!(ErrorKind::Decompression(format!("{format} payload")));
    }
    let mut payload = BufReader::new(reader);
    let compression = match header.string(TAG_PAYLOAD_COMPRESSOR) {
        Some(name) => name.parse::<Compression>().or_raise(|| ErrorKind::Decompression(name.clone()))?,
        None => {
            let magic = payload.fill_buf().or_raise(|| ErrorKind::Corrupt("unreadable rpm payload"))?;
            Compression::sniff(magic)
        },
    };
    cpio::walk(decompress(compression, payload)?, visit)?;
    Ok(header.label())
}
