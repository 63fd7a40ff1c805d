//! Freelist pages: `count:u32` followed by `count` little-endian `u32` page
//! IDs. Lists pages made garbage by a CoW mutation and available for reuse.

use crate::error::{Error, Result};
use crate::page::{self, Frame, PageId, PageKind, FRAME_LEN};

/// Bytes of fixed overhead before the page-ID list: frame (9) + count (4).
pub const FIXED_OVERHEAD: usize = FRAME_LEN + 4;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FreelistPage {
    pub page_id: PageId,
    pub free_page_ids: Vec<PageId>,
}

/// How many page IDs fit in one freelist page: `(page_size - 13) / 4`.
pub fn capacity(page_size: usize) -> usize {
    page_size.saturating_sub(FIXED_OVERHEAD) / 4
}

impl FreelistPage {
    pub fn encode(&self, page_size: usize) -> Result<Vec<u8>> {
        let mut body = Vec::with_capacity(4 + self.free_page_ids.len() * 4);
        body.extend_from_slice(&(self.free_page_ids.len() as u32).to_le_bytes());
        for id in &self.free_page_ids {
            body.extend_from_slice(&id.to_le_bytes());
        }
        page::assemble_page(PageKind::Freelist, self.page_id, &body, page_size)
    }

    pub fn decode(data: &[u8], verify: bool) -> Result<Self> {
        if verify {
            page::verify_checksum(data)?;
        }
        let frame = Frame::decode(data)?;
        if frame.kind != PageKind::Freelist {
            return Err(Error::UnexpectedPageType(frame.kind as u8, frame.page_id));
        }
        let body = &data[FRAME_LEN..];
        if body.len() < 4 {
            return Err(Error::ShortField {
                field: "freelist count",
                needed: 4 - body.len(),
            });
        }
        let count = u32::from_le_bytes(body[0..4].try_into().unwrap()) as usize;
        let needed = 4 + count * 4;
        if body.len() < needed {
            return Err(Error::ShortField {
                field: "freelist entries",
                needed: needed - body.len(),
            });
        }
        let mut free_page_ids = Vec::with_capacity(count);
        for i in 0..count {
            let off = 4 + i * 4;
            free_page_ids.push(u32::from_le_bytes(body[off..off + 4].try_into().unwrap()));
        }
        Ok(Self {
            page_id: frame.page_id,
            free_page_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn round_trips_a_populated_freelist_page() {
        let page = FreelistPage {
            page_id: 5,
            free_page_ids: vec![10, 20, 30],
        };
        let encoded = page.encode(4096).unwrap();
        assert_eq!(FreelistPage::decode(&encoded, true).unwrap(), page);
    }

    #[test]
    fn round_trips_an_empty_freelist_page() {
        let page = FreelistPage {
            page_id: 5,
            free_page_ids: vec![],
        };
        let encoded = page.encode(4096).unwrap();
        assert_eq!(FreelistPage::decode(&encoded, true).unwrap(), page);
    }

    #[test]
    fn flipped_bit_outside_checksum_is_corruption() {
        let page = FreelistPage {
            page_id: 5,
            free_page_ids: vec![10, 20, 30],
        };
        let mut encoded = page.encode(4096).unwrap();
        encoded[FRAME_LEN] ^= 0x01; // first byte of the count field
        assert!(matches!(
            FreelistPage::decode(&encoded, true),
            Err(Error::Corruption(_))
        ));
    }

    proptest! {
        #[test]
        fn round_trip_holds_for_any_id_list(
            page_id in any::<PageId>(),
            free_page_ids in prop::collection::vec(any::<PageId>(), 0..200),
        ) {
            let page = FreelistPage { page_id, free_page_ids };
            let encoded = page.encode(4096).unwrap();
            prop_assert_eq!(FreelistPage::decode(&encoded, true).unwrap(), page);
        }

        #[test]
        fn any_single_bit_flip_outside_checksum_is_rejected(
            free_page_ids in prop::collection::vec(any::<PageId>(), 1..50),
            byte_index in (FRAME_LEN as usize)..(FRAME_LEN + 4),
            bit in 0u8..8,
        ) {
            let page = FreelistPage { page_id: 5, free_page_ids };
            let mut encoded = page.encode(4096).unwrap();
            encoded[byte_index] ^= 1 << bit;
            prop_assert!(matches!(FreelistPage::decode(&encoded, true), Err(Error::Corruption(_))));
        }
    }
}
