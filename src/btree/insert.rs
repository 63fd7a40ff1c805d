use tracing::trace;

use super::split::{find_branch_split, find_leaf_split};
use super::{find_child, read_node, Node};
use crate::error::{Error, Result};
use crate::page::branch::BranchPage;
use crate::page::leaf::{Cell, LeafPage};
use crate::page::PageId;
use crate::pager::Pager;

/// A child's insert either replaced itself in place (`Simple`) or overflowed
/// and split in two, promoting a separator to the parent (`Split`).
enum Outcome {
    Simple(PageId),
    Split {
        left: PageId,
        right: PageId,
        separator: Vec<u8>,
    },
}

pub fn insert(pager: &mut Pager, root: PageId, key: &[u8], value: &[u8]) -> Result<PageId> {
    if root == 0 {
        let page_id = pager.allocate_page();
        let leaf = LeafPage {
            page_id,
            right_sibling: 0,
            cells: vec![(key.to_vec(), value.to_vec())],
        };
        pager.write_leaf(&leaf)?;
        return Ok(page_id);
    }

    match insert_recursive(pager, root, key, value)? {
        Outcome::Simple(page_id) => Ok(page_id),
        Outcome::Split {
            left,
            right,
            separator,
        } => {
            let new_root_id = pager.allocate_page();
            let new_root = BranchPage {
                page_id: new_root_id,
                keys: vec![separator],
                children: vec![left, right],
            };
            pager.write_branch(&new_root)?;
            trace!(new_root_id, "root split, new root branch created");
            Ok(new_root_id)
        }
    }
}

fn insert_recursive(pager: &mut Pager, page_id: PageId, key: &[u8], value: &[u8]) -> Result<Outcome> {
    match read_node(pager, page_id)? {
        Node::Leaf(leaf) => insert_leaf(pager, leaf, key, value),
        Node::Branch(branch) => insert_branch(pager, branch, key, value),
    }
}

fn insert_leaf(pager: &mut Pager, leaf: LeafPage, key: &[u8], value: &[u8]) -> Result<Outcome> {
    let idx = leaf.cells.partition_point(|(k, _)| k.as_slice() < key);
    let mut cells: Vec<Cell> = leaf.cells;
    if idx < cells.len() && cells[idx].0 == key {
        cells[idx].1 = value.to_vec();
    } else {
        cells.insert(idx, (key.to_vec(), value.to_vec()));
    }

    let page_size = pager.page_size() as usize;
    if crate::page::leaf::leaf_fits(&cells, page_size) {
        let page_id = pager.allocate_page();
        let new_leaf = LeafPage {
            page_id,
            right_sibling: leaf.right_sibling,
            cells,
        };
        pager.write_leaf(&new_leaf)?;
        Ok(Outcome::Simple(page_id))
    } else {
        split_leaf(pager, cells, leaf.right_sibling, page_size)
    }
}

fn split_leaf(
    pager: &mut Pager,
    cells: Vec<Cell>,
    old_right_sibling: PageId,
    page_size: usize,
) -> Result<Outcome> {
    let mid = find_leaf_split(&cells, page_size).ok_or_else(|| {
        Error::PageTooSmall {
            needed: cells.iter().map(|(k, v)| crate::page::leaf::cell_size(k, v)).sum(),
            page_size,
        }
    })?;
    let mut cells = cells;
    let right_cells = cells.split_off(mid);
    let left_cells = cells;

    let right_page_id = pager.allocate_page();
    let left_page_id = pager.allocate_page();

    let separator = right_cells[0].0.clone();

    let right_leaf = LeafPage {
        page_id: right_page_id,
        right_sibling: old_right_sibling,
        cells: right_cells,
    };
    let left_leaf = LeafPage {
        page_id: left_page_id,
        right_sibling: right_page_id,
        cells: left_cells,
    };
    pager.write_leaf(&left_leaf)?;
    pager.write_leaf(&right_leaf)?;

    Ok(Outcome::Split {
        left: left_page_id,
        right: right_page_id,
        separator,
    })
}

fn insert_branch(pager: &mut Pager, branch: BranchPage, key: &[u8], value: &[u8]) -> Result<Outcome> {
    let child_idx = find_child(&branch, key);
    let child_page_id = branch.children[child_idx];
    let result = insert_recursive(pager, child_page_id, key, value)?;

    match result {
        Outcome::Simple(new_child) => {
            let mut children = branch.children;
            children[child_idx] = new_child;
            let page_id = pager.allocate_page();
            let new_branch = BranchPage {
                page_id,
                keys: branch.keys,
                children,
            };
            pager.write_branch(&new_branch)?;
            Ok(Outcome::Simple(page_id))
        }
        Outcome::Split {
            left,
            right,
            separator,
        } => insert_separator(pager, branch, child_idx, separator, left, right),
    }
}

fn insert_separator(
    pager: &mut Pager,
    branch: BranchPage,
    child_idx: usize,
    separator: Vec<u8>,
    left: PageId,
    right: PageId,
) -> Result<Outcome> {
    let mut keys = branch.keys;
    let mut children = branch.children;
    children[child_idx] = left;
    keys.insert(child_idx, separator);
    children.insert(child_idx + 1, right);

    let page_size = pager.page_size() as usize;
    if crate::page::branch::branch_fits(&keys, page_size) {
        let page_id = pager.allocate_page();
        let new_branch = BranchPage {
            page_id,
            keys,
            children,
        };
        pager.write_branch(&new_branch)?;
        Ok(Outcome::Simple(page_id))
    } else {
        split_branch(pager, keys, children, page_size)
    }
}

fn split_branch(
    pager: &mut Pager,
    keys: Vec<Vec<u8>>,
    children: Vec<PageId>,
    page_size: usize,
) -> Result<Outcome> {
    let mid = find_branch_split(&keys, page_size).ok_or_else(|| Error::PageTooSmall {
        needed: keys.iter().map(|k| crate::page::branch::key_size(k)).sum(),
        page_size,
    })?;

    let mut keys = keys;
    let mut children = children;
    let right_keys = keys.split_off(mid + 1);
    let separator = keys.pop().expect("mid index was populated");
    let left_keys = keys;
    let right_children = children.split_off(mid + 1);
    let left_children = children;

    let left_page_id = pager.allocate_page();
    let right_page_id = pager.allocate_page();

    let left_branch = BranchPage {
        page_id: left_page_id,
        keys: left_keys,
        children: left_children,
    };
    let right_branch = BranchPage {
        page_id: right_page_id,
        keys: right_keys,
        children: right_children,
    };
    pager.write_branch(&left_branch)?;
    pager.write_branch(&right_branch)?;

    Ok(Outcome::Split {
        left: left_page_id,
        right: right_page_id,
        separator,
    })
}
