//! The database header (page 0): `magic, version, page_size, checksum`,
//! zero-padded to `page_size`. Unlike every other page it carries no 9-byte
//! frame — it predates page typing and must be self-describing before the
//! page size itself is known.

use crate::error::{Error, Result};
use crate::page::{self, PageId, HEADER_PAGE_ID};

pub const MAGIC: &[u8; 4] = b"PRRT";
pub const VERSION: u32 = 1;

/// Magic + version + page_size + checksum, all u32/4-byte-magic.
const HEADER_BODY_LEN: usize = 16;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HeaderPage {
    pub version: u32,
    pub page_size: u32,
}

impl HeaderPage {
    pub fn new(page_size: u32) -> Self {
        Self {
            version: VERSION,
            page_size,
        }
    }

    pub fn encode(&self, page_size: usize) -> Result<Vec<u8>> {
        if HEADER_BODY_LEN > page_size {
            return Err(Error::PageTooSmall {
                needed: HEADER_BODY_LEN,
                page_size,
            });
        }
        let mut buf = vec![0u8; page_size];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..12].copy_from_slice(&self.page_size.to_le_bytes());
        let crc = page::checksum(&buf[0..12]);
        buf[12..16].copy_from_slice(&crc.to_le_bytes());
        Ok(buf)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_BODY_LEN {
            return Err(Error::ShortPage {
                expected: HEADER_BODY_LEN,
                actual: data.len(),
            });
        }
        if &data[0..4] != MAGIC {
            return Err(Error::Corruption("invalid header magic".into()));
        }
        let version = u32::from_le_bytes(data[4..8].try_into().unwrap());
        let page_size = u32::from_le_bytes(data[8..12].try_into().unwrap());
        let stored_crc = u32::from_le_bytes(data[12..16].try_into().unwrap());
        let expected_crc = page::checksum(&data[0..12]);
        if stored_crc != expected_crc {
            return Err(Error::Corruption(format!(
                "header checksum mismatch: expected {expected_crc:08x}, got {stored_crc:08x}"
            )));
        }
        if version != VERSION {
            return Err(Error::Corruption(format!(
                "unsupported header version {version}"
            )));
        }
        if !page::is_valid_page_size(page_size) {
            return Err(Error::Corruption(format!(
                "invalid page size in header: {page_size}"
            )));
        }
        Ok(Self { version, page_size })
    }
}

pub const PAGE_ID: PageId = HEADER_PAGE_ID;
