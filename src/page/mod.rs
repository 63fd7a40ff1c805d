//! Page framing shared by every non-header page kind.
//!
//! Every page (other than page 0, the header) begins with a 9-byte frame:
//! `page_type:u8, page_id:u32, checksum:u32`, all little-endian. The
//! checksum covers the full page with this field zeroed.

pub mod branch;
pub mod freelist;
pub mod header;
pub mod leaf;
pub mod meta;

use crate::error::{Error, Result};

pub type PageId = u32;

pub const HEADER_PAGE_ID: PageId = 0;
pub const META_PAGE_A_ID: PageId = 1;
pub const META_PAGE_B_ID: PageId = 2;
pub const FIRST_DATA_PAGE_ID: PageId = 3;

pub const FRAME_LEN: usize = 9;

pub const MIN_PAGE_SIZE: u32 = 512;
pub const MAX_PAGE_SIZE: u32 = 65536;
pub const DEFAULT_PAGE_SIZE: u32 = 4096;

/// Discriminant stored in a page frame's first byte.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum PageKind {
    Meta = 1,
    Freelist = 2,
    Branch = 3,
    Leaf = 4,
}

impl PageKind {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Meta),
            2 => Some(Self::Freelist),
            3 => Some(Self::Branch),
            4 => Some(Self::Leaf),
            _ => None,
        }
    }
}

/// Returns true if `page_size` is a power of two within the supported range.
pub fn is_valid_page_size(page_size: u32) -> bool {
    (MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) && page_size.is_power_of_two()
}

/// CRC32 (IEEE / zlib polynomial) over a full page buffer.
pub fn checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// The 9-byte frame prefix common to every non-header page.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Frame {
    pub kind: PageKind,
    pub page_id: PageId,
    pub checksum: u32,
}

impl Frame {
    pub fn encode(&self, out: &mut [u8]) {
        debug_assert!(out.len() >= FRAME_LEN);
        out[0] = self.kind as u8;
        out[1..5].copy_from_slice(&self.page_id.to_le_bytes());
        out[5..9].copy_from_slice(&self.checksum.to_le_bytes());
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < FRAME_LEN {
            return Err(Error::ShortPage {
                expected: FRAME_LEN,
                actual: data.len(),
            });
        }
        let kind = PageKind::from_byte(data[0])
            .ok_or_else(|| Error::UnexpectedPageType(data[0], u32::from_le_bytes(data[1..5].try_into().unwrap())))?;
        let page_id = u32::from_le_bytes(data[1..5].try_into().unwrap());
        let checksum = u32::from_le_bytes(data[5..9].try_into().unwrap());
        Ok(Self {
            kind,
            page_id,
            checksum,
        })
    }
}

/// Encodes a full page: writes `body` after the frame, zero-pads to
/// `page_size`, computes the checksum with the frame's checksum field
/// zeroed, then repacks the frame with the real checksum.
///
/// Fails with `PageTooSmall` if `FRAME_LEN + body.len()` exceeds `page_size`.
pub fn assemble_page(kind: PageKind, page_id: PageId, body: &[u8], page_size: usize) -> Result<Vec<u8>> {
    let needed = FRAME_LEN + body.len();
    if needed > page_size {
        return Err(Error::PageTooSmall {
            needed,
            page_size,
        });
    }
    let mut buf = vec![0u8; page_size];
    let frame = Frame {
        kind,
        page_id,
        checksum: 0,
    };
    frame.encode(&mut buf[..FRAME_LEN]);
    buf[FRAME_LEN..FRAME_LEN + body.len()].copy_from_slice(body);
    let crc = checksum(&buf);
    buf[5..9].copy_from_slice(&crc.to_le_bytes());
    Ok(buf)
}

/// Validates the frame's checksum against the page as a whole. `data` must
/// be exactly one page long.
pub fn verify_checksum(data: &[u8]) -> Result<()> {
    let frame = Frame::decode(data)?;
    let mut scratch = data.to_vec();
    scratch[5..9].fill(0);
    let expected = checksum(&scratch);
    if expected != frame.checksum {
        return Err(Error::Corruption(format!(
            "checksum mismatch on page {}: expected {:08x}, got {:08x}",
            frame.page_id, expected, frame.checksum
        )));
    }
    Ok(())
}
