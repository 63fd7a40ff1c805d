//! Branch pages: `key_count:u16, child_0:u32`, then `key_count` repetitions
//! of `(key_len:u16, key_bytes, child_{i+1}:u32)`. For `k` keys there are
//! `k+1` children; key `i` is the inclusive lower bound of the subtree
//! rooted at `children[i+1]`.

use crate::error::{Error, Result};
use crate::page::{self, Frame, PageId, PageKind, FRAME_LEN};

/// Bytes of fixed overhead before any keys: frame (9) + key_count (2) +
/// first child (4).
pub const FIXED_OVERHEAD: usize = FRAME_LEN + 2 + 4;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BranchPage {
    pub page_id: PageId,
    pub keys: Vec<Vec<u8>>,
    pub children: Vec<PageId>,
}

/// Bytes a single separator key contributes: 2 (len) + key + 4 (child).
pub fn key_size(key: &[u8]) -> usize {
    2 + key.len() + 4
}

/// Pure size predicate mirroring `leaf::leaf_fits`.
pub fn branch_fits(keys: &[Vec<u8>], page_size: usize) -> bool {
    let data: usize = keys.iter().map(|k| key_size(k)).sum();
    FIXED_OVERHEAD + data <= page_size
}

impl BranchPage {
    pub fn encode(&self, page_size: usize) -> Result<Vec<u8>> {
        debug_assert_eq!(self.children.len(), self.keys.len() + 1);
        if !branch_fits(&self.keys, page_size) {
            let data: usize = self.keys.iter().map(|k| key_size(k)).sum();
            return Err(Error::PageTooSmall {
                needed: FIXED_OVERHEAD + data,
                page_size,
            });
        }
        let mut body = Vec::with_capacity(page_size - FRAME_LEN);
        body.extend_from_slice(&(self.keys.len() as u16).to_le_bytes());
        body.extend_from_slice(&self.children[0].to_le_bytes());
        for (i, key) in self.keys.iter().enumerate() {
            body.extend_from_slice(&(key.len() as u16).to_le_bytes());
            body.extend_from_slice(key);
            body.extend_from_slice(&self.children[i + 1].to_le_bytes());
        }
        page::assemble_page(PageKind::Branch, self.page_id, &body, page_size)
    }

    pub fn decode(data: &[u8], verify: bool) -> Result<Self> {
        if verify {
            page::verify_checksum(data)?;
        }
        let frame = Frame::decode(data)?;
        if frame.kind != PageKind::Branch {
            return Err(Error::UnexpectedPageType(frame.kind as u8, frame.page_id));
        }
        let mut off = FRAME_LEN;
        if data.len() < off + 6 {
            return Err(Error::ShortField {
                field: "branch header",
                needed: off + 6 - data.len(),
            });
        }
        let key_count = u16::from_le_bytes(data[off..off + 2].try_into().unwrap()) as usize;
        off += 2;
        let mut children = Vec::with_capacity(key_count + 1);
        children.push(u32::from_le_bytes(data[off..off + 4].try_into().unwrap()));
        off += 4;

        let mut keys = Vec::with_capacity(key_count);
        for _ in 0..key_count {
            if data.len() < off + 2 {
                return Err(Error::ShortField {
                    field: "branch key length",
                    needed: off + 2 - data.len(),
                });
            }
            let key_len = u16::from_le_bytes(data[off..off + 2].try_into().unwrap()) as usize;
            off += 2;
            if data.len() < off + key_len + 4 {
                return Err(Error::Corruption("branch key/child out of bounds".into()));
            }
            keys.push(data[off..off + key_len].to_vec());
            off += key_len;
            children.push(u32::from_le_bytes(data[off..off + 4].try_into().unwrap()));
            off += 4;
        }

        if children.len() != keys.len() + 1 {
            return Err(Error::Corruption(
                "branch invariant violated: len(children) != len(keys)+1".into(),
            ));
        }
        for pair in keys.windows(2) {
            if pair[0] >= pair[1] {
                return Err(Error::Corruption(
                    "branch invariant violated: keys not strictly increasing".into(),
                ));
            }
        }

        Ok(Self {
            page_id: frame.page_id,
            keys,
            children,
        })
    }
}
