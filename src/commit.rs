//! Commit driver: publishes a new root atomically by writing to the
//! *inactive* meta slot and fsyncing, so a crash mid-write leaves the
//! previously active meta (and the tree it points at) intact.

use tracing::instrument;

use crate::error::Result;
use crate::page::meta::MetaPage;
use crate::pager::Pager;

/// Writes the freelist (if it has pending changes), swaps in a new meta
/// page pointing at `new_root`, and fsyncs. Returns the committed meta.
///
/// Order matters: the freelist page must land on disk before the meta that
/// references it, and the new meta must land before the fsync that makes it
/// durable.
///
/// A dirty freelist is always written to a **freshly allocated** page, never
/// back into `active.freelist_page_id` in place — that page is still owned
/// by the currently-active (not yet superseded) meta, and overwriting it
/// ahead of the meta swap would leave the old meta pointing at a freelist
/// whose content already changed if the process crashes before the new meta
/// is durable. The old freelist page itself becomes garbage and is folded
/// into the new freelist rather than leaked. A transaction that drains the
/// freelist back to empty still rewrites (or retires) the persisted page:
/// dirtiness, not emptiness, is what drives this.
#[instrument(skip(pager), fields(new_root))]
pub fn commit(pager: &mut Pager, new_root: u32) -> Result<MetaPage> {
    let active = pager.read_active_meta()?;
    let inactive_id = pager.get_inactive_meta_id()?;

    let freelist_page_id = if pager.freelist().is_dirty() {
        let old_freelist_id = active.freelist_page_id;
        if old_freelist_id != 0 {
            pager.freelist_mut().free(old_freelist_id)?;
        }
        let new_id = if pager.freelist().is_empty() {
            0
        } else {
            let new_id = pager.allocate_page();
            let freelist_page = pager.freelist().to_page(new_id);
            pager.write_freelist_page(&freelist_page)?;
            new_id
        };
        pager.freelist_mut().mark_clean();
        new_id
    } else {
        active.freelist_page_id
    };

    let new_meta = MetaPage {
        page_id: inactive_id,
        txn_id: active.txn_id + 1,
        root_page_id: new_root,
        freelist_page_id,
    };
    pager.write_meta(&new_meta)?;
    pager.sync()?;
    Ok(new_meta)
}
