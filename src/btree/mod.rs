//! Copy-on-write B+ tree: leaves hold key-value cells, branches hold
//! separator keys routing descent via `bisect_right` (a separator is the
//! inclusive lower bound of its right subtree). Every mutation path-copies
//! from the touched leaf up to a new root; the old root stays valid and
//! readable, which is how snapshots fall out for free.
//!
//! Splits are driven by exact byte accounting rather than cell count: see
//! `split::find_split_point`.

mod delete;
mod insert;
mod scan;
mod split;

use tracing::instrument;

use crate::error::{Error, Result};
use crate::page::branch::BranchPage;
use crate::page::leaf::LeafPage;
use crate::page::{PageId, PageKind};
use crate::pager::Pager;

pub use scan::RangeScan;

/// A page read and dispatched by its frame's type byte — the shape every
/// recursive tree walk operates on.
enum Node {
    Leaf(LeafPage),
    Branch(BranchPage),
}

fn read_node(pager: &mut Pager, page_id: PageId) -> Result<Node> {
    let raw = pager.read_raw(page_id)?;
    match raw.first().and_then(|&b| PageKind::from_byte(b)) {
        Some(PageKind::Leaf) => Ok(Node::Leaf(LeafPage::decode(&raw, true)?)),
        Some(PageKind::Branch) => Ok(Node::Branch(BranchPage::decode(&raw, true)?)),
        other => Err(Error::Corruption(format!(
            "page {page_id} has non-node type {other:?}"
        ))),
    }
}

/// Index of the child responsible for `key`: the count of separators `<=
/// key`. Equal keys route right, matching the rule that a separator is the
/// inclusive lower bound of its right subtree.
fn find_child(branch: &BranchPage, key: &[u8]) -> usize {
    branch.keys.partition_point(|sep| sep.as_slice() <= key)
}

/// Point lookup starting from `root`. `root == 0` means an empty tree.
#[instrument(skip(pager, key), fields(root))]
pub fn get(pager: &mut Pager, root: PageId, key: &[u8]) -> Result<Option<Vec<u8>>> {
    if root == 0 {
        return Ok(None);
    }
    let mut page_id = root;
    loop {
        match read_node(pager, page_id)? {
            Node::Leaf(leaf) => {
                let idx = leaf.cells.partition_point(|(k, _)| k.as_slice() < key);
                return Ok(leaf
                    .cells
                    .get(idx)
                    .filter(|(k, _)| k.as_slice() == key)
                    .map(|(_, v)| v.clone()));
            }
            Node::Branch(branch) => {
                let idx = find_child(&branch, key);
                page_id = branch.children[idx];
            }
        }
    }
}

/// Inserts or replaces `key`, returning the new root.
pub fn insert(pager: &mut Pager, root: PageId, key: &[u8], value: &[u8]) -> Result<PageId> {
    insert::insert(pager, root, key, value)
}

/// Deletes `key`, returning the new root (0 if the tree becomes empty, or
/// the original root if the key was absent).
pub fn delete(pager: &mut Pager, root: PageId, key: &[u8]) -> Result<PageId> {
    delete::delete(pager, root, key)
}

/// Iterates `[start, end)` in sorted key order without relying on leaf
/// sibling pointers, which go stale under copy-on-write.
pub fn range_scan<'p>(
    pager: &'p mut Pager,
    root: PageId,
    start: Option<Vec<u8>>,
    end: Option<Vec<u8>>,
) -> Result<RangeScan<'p>> {
    scan::RangeScan::new(pager, root, start, end)
}

/// Height of the tree: 0 for empty, 1 for a single leaf.
pub fn tree_height(pager: &mut Pager, root: PageId) -> Result<usize> {
    if root == 0 {
        return Ok(0);
    }
    let mut height = 0;
    let mut page_id = root;
    loop {
        height += 1;
        match read_node(pager, page_id)? {
            Node::Leaf(_) => return Ok(height),
            Node::Branch(branch) => page_id = branch.children[0],
        }
    }
}

/// Total number of keys reachable from `root`.
pub fn count_keys(pager: &mut Pager, root: PageId) -> Result<usize> {
    if root == 0 {
        return Ok(0);
    }
    let mut count = 0;
    let mut scan = range_scan(pager, root, None, None)?;
    while scan.next_pair()?.is_some() {
        count += 1;
    }
    Ok(count)
}
