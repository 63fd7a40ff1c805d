//! Leaf pages: `cell_count:u16, right_sibling:u32, cell_offsets:u16 ×
//! cell_count`, then cells packed at the tail growing downward. Each cell is
//! `key_len:u16, value_len:u16, key_bytes, value_bytes`.
//!
//! `right_sibling` is written on every split/rewrite but is informational
//! only — the tree never reads it back for navigation (see `btree::scan`).

use crate::error::{Error, Result};
use crate::page::{self, Frame, PageId, PageKind, FRAME_LEN};

/// Bytes of fixed overhead before any cells: frame (9) + cell_count (2) +
/// right_sibling (4).
pub const FIXED_OVERHEAD: usize = FRAME_LEN + 2 + 4;

pub type Cell = (Vec<u8>, Vec<u8>);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LeafPage {
    pub page_id: PageId,
    pub right_sibling: PageId,
    pub cells: Vec<Cell>,
}

/// Exact byte size of a cell's encoding: 2 (offset) + 4 (lens) + key + value.
pub fn cell_size(key: &[u8], value: &[u8]) -> usize {
    2 + 4 + key.len() + value.len()
}

/// Pure size predicate: does this cell set fit in one page of `page_size`
/// bytes? Drives leaf-split decisions by exact byte accounting, never by
/// cell count.
pub fn leaf_fits(cells: &[Cell], page_size: usize) -> bool {
    let data: usize = cells.iter().map(|(k, v)| cell_size(k, v)).sum();
    FIXED_OVERHEAD + data <= page_size
}

impl LeafPage {
    pub fn encode(&self, page_size: usize) -> Result<Vec<u8>> {
        if !leaf_fits(&self.cells, page_size) {
            let data: usize = self.cells.iter().map(|(k, v)| cell_size(k, v)).sum();
            return Err(Error::PageTooSmall {
                needed: FIXED_OVERHEAD + data,
                page_size,
            });
        }
        let cell_count = self.cells.len();
        let offsets_start = FRAME_LEN + 6;
        let offsets_end = offsets_start + 2 * cell_count;

        let mut buf = vec![0u8; page_size];
        let frame = Frame {
            kind: PageKind::Leaf,
            page_id: self.page_id,
            checksum: 0,
        };
        frame.encode(&mut buf[..FRAME_LEN]);
        buf[FRAME_LEN..FRAME_LEN + 2].copy_from_slice(&(cell_count as u16).to_le_bytes());
        buf[FRAME_LEN + 2..FRAME_LEN + 6].copy_from_slice(&self.right_sibling.to_le_bytes());

        // Cells are packed from the tail of the page backward.
        let mut cursor = page_size;
        for (i, (key, value)) in self.cells.iter().enumerate() {
            let len = cell_size(key, value);
            cursor -= len;
            if cursor < offsets_end {
                return Err(Error::PageTooSmall {
                    needed: page_size - cursor + offsets_end,
                    page_size,
                });
            }
            buf[offsets_start + 2 * i..offsets_start + 2 * i + 2]
                .copy_from_slice(&(cursor as u16).to_le_bytes());
            buf[cursor..cursor + 2].copy_from_slice(&(key.len() as u16).to_le_bytes());
            buf[cursor + 2..cursor + 4].copy_from_slice(&(value.len() as u16).to_le_bytes());
            buf[cursor + 4..cursor + 4 + key.len()].copy_from_slice(key);
            buf[cursor + 4 + key.len()..cursor + len].copy_from_slice(value);
        }

        let crc = page::checksum(&buf);
        buf[5..9].copy_from_slice(&crc.to_le_bytes());
        Ok(buf)
    }

    pub fn decode(data: &[u8], verify: bool) -> Result<Self> {
        if verify {
            page::verify_checksum(data)?;
        }
        let frame = Frame::decode(data)?;
        if frame.kind != PageKind::Leaf {
            return Err(Error::UnexpectedPageType(frame.kind as u8, frame.page_id));
        }
        let mut off = FRAME_LEN;
        if data.len() < off + 6 {
            return Err(Error::ShortField {
                field: "leaf header",
                needed: off + 6 - data.len(),
            });
        }
        let cell_count = u16::from_le_bytes(data[off..off + 2].try_into().unwrap()) as usize;
        let right_sibling = u32::from_le_bytes(data[off + 2..off + 6].try_into().unwrap());
        off += 6;

        let mut offsets = Vec::with_capacity(cell_count);
        for _ in 0..cell_count {
            if data.len() < off + 2 {
                return Err(Error::ShortField {
                    field: "leaf cell offset",
                    needed: off + 2 - data.len(),
                });
            }
            offsets.push(u16::from_le_bytes(data[off..off + 2].try_into().unwrap()) as usize);
            off += 2;
        }

        let mut cells = Vec::with_capacity(cell_count);
        for cell_off in offsets {
            if data.len() < cell_off + 4 {
                return Err(Error::Corruption("leaf cell offset out of bounds".into()));
            }
            let key_len = u16::from_le_bytes(data[cell_off..cell_off + 2].try_into().unwrap()) as usize;
            let value_len =
                u16::from_le_bytes(data[cell_off + 2..cell_off + 4].try_into().unwrap()) as usize;
            let key_start = cell_off + 4;
            let value_start = key_start + key_len;
            let value_end = value_start + value_len;
            if data.len() < value_end {
                return Err(Error::Corruption("leaf cell body out of bounds".into()));
            }
            let key = data[key_start..value_start].to_vec();
            let value = data[value_start..value_end].to_vec();
            cells.push((key, value));
        }

        Ok(Self {
            page_id: frame.page_id,
            right_sibling,
            cells,
        })
    }
}
