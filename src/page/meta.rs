//! Meta pages (IDs 1 and 2): `txn_id:u64, root_page_id:u32,
//! freelist_page_id:u32` after the common frame. The meta page with the
//! greater valid `txn_id` is active; a page ID of 0 for root/freelist means
//! "none".

use crate::error::{Error, Result};
use crate::page::{self, Frame, PageId, PageKind, FRAME_LEN, META_PAGE_A_ID, META_PAGE_B_ID};

const BODY_LEN: usize = 16;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MetaPage {
    pub page_id: PageId,
    pub txn_id: u64,
    pub root_page_id: PageId,
    pub freelist_page_id: PageId,
}

impl MetaPage {
    pub fn empty(page_id: PageId) -> Self {
        Self {
            page_id,
            txn_id: 0,
            root_page_id: 0,
            freelist_page_id: 0,
        }
    }

    pub fn is_meta_slot(page_id: PageId) -> bool {
        page_id == META_PAGE_A_ID || page_id == META_PAGE_B_ID
    }

    pub fn encode(&self, page_size: usize) -> Result<Vec<u8>> {
        let mut body = [0u8; BODY_LEN];
        body[0..8].copy_from_slice(&self.txn_id.to_le_bytes());
        body[8..12].copy_from_slice(&self.root_page_id.to_le_bytes());
        body[12..16].copy_from_slice(&self.freelist_page_id.to_le_bytes());
        page::assemble_page(PageKind::Meta, self.page_id, &body, page_size)
    }

    pub fn decode(data: &[u8], verify: bool) -> Result<Self> {
        if verify {
            page::verify_checksum(data)?;
        }
        let frame = Frame::decode(data)?;
        if frame.kind != PageKind::Meta {
            return Err(Error::UnexpectedPageType(frame.kind as u8, frame.page_id));
        }
        let body = &data[FRAME_LEN..];
        if body.len() < BODY_LEN {
            return Err(Error::ShortField {
                field: "meta body",
                needed: BODY_LEN - body.len(),
            });
        }
        let txn_id = u64::from_le_bytes(body[0..8].try_into().unwrap());
        let root_page_id = u32::from_le_bytes(body[8..12].try_into().unwrap());
        let freelist_page_id = u32::from_le_bytes(body[12..16].try_into().unwrap());
        Ok(Self {
            page_id: frame.page_id,
            txn_id,
            root_page_id,
            freelist_page_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn round_trips_a_populated_meta_page() {
        let meta = MetaPage {
            page_id: META_PAGE_A_ID,
            txn_id: 42,
            root_page_id: 7,
            freelist_page_id: 9,
        };
        let encoded = meta.encode(4096).unwrap();
        assert_eq!(MetaPage::decode(&encoded, true).unwrap(), meta);
    }

    #[test]
    fn flipped_bit_outside_checksum_is_corruption() {
        let meta = MetaPage {
            page_id: META_PAGE_B_ID,
            txn_id: 1,
            root_page_id: 3,
            freelist_page_id: 0,
        };
        let mut encoded = meta.encode(4096).unwrap();
        encoded[FRAME_LEN] ^= 0x01; // first byte of the txn_id field
        assert!(matches!(
            MetaPage::decode(&encoded, true),
            Err(Error::Corruption(_))
        ));
    }

    proptest! {
        #[test]
        fn round_trip_holds_for_any_meta_fields(
            page_id in prop_oneof![Just(META_PAGE_A_ID), Just(META_PAGE_B_ID)],
            txn_id in any::<u64>(),
            root_page_id in any::<u32>(),
            freelist_page_id in any::<u32>(),
        ) {
            let meta = MetaPage { page_id, txn_id, root_page_id, freelist_page_id };
            let encoded = meta.encode(4096).unwrap();
            prop_assert_eq!(MetaPage::decode(&encoded, true).unwrap(), meta);
        }

        #[test]
        fn any_single_bit_flip_outside_checksum_is_rejected(
            txn_id in any::<u64>(),
            byte_index in (FRAME_LEN as usize)..(FRAME_LEN + BODY_LEN),
            bit in 0u8..8,
        ) {
            let meta = MetaPage { page_id: META_PAGE_A_ID, txn_id, root_page_id: 1, freelist_page_id: 2 };
            let mut encoded = meta.encode(4096).unwrap();
            encoded[byte_index] ^= 1 << bit;
            prop_assert!(matches!(MetaPage::decode(&encoded, true), Err(Error::Corruption(_))));
        }
    }
}
