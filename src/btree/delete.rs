use super::{find_child, read_node, Node};
use crate::error::Result;
use crate::page::branch::BranchPage;
use crate::page::leaf::LeafPage;
use crate::page::PageId;
use crate::pager::Pager;

/// `new_page_id == 0` means the subtree collapsed to nothing; `deleted`
/// distinguishes "key absent, nothing changed" from a real removal so
/// ancestors know whether to path-copy or return themselves unchanged.
struct Outcome {
    new_page_id: PageId,
    deleted: bool,
}

pub fn delete(pager: &mut Pager, root: PageId, key: &[u8]) -> Result<PageId> {
    if root == 0 {
        return Ok(0);
    }
    let result = delete_recursive(pager, root, key)?;
    if !result.deleted {
        return Ok(root);
    }
    if result.new_page_id == 0 {
        return Ok(0);
    }

    // A root branch left with no separators is just a wrapper around its
    // single remaining child; drop it.
    if let Node::Branch(branch) = read_node(pager, result.new_page_id)? {
        if branch.keys.is_empty() {
            return Ok(branch.children[0]);
        }
    }
    Ok(result.new_page_id)
}

fn delete_recursive(pager: &mut Pager, page_id: PageId, key: &[u8]) -> Result<Outcome> {
    match read_node(pager, page_id)? {
        Node::Leaf(leaf) => delete_leaf(pager, leaf, key),
        Node::Branch(branch) => delete_branch(pager, branch, key),
    }
}

fn delete_leaf(pager: &mut Pager, leaf: LeafPage, key: &[u8]) -> Result<Outcome> {
    let idx = leaf.cells.partition_point(|(k, _)| k.as_slice() < key);
    if idx >= leaf.cells.len() || leaf.cells[idx].0 != key {
        return Ok(Outcome {
            new_page_id: leaf.page_id,
            deleted: false,
        });
    }

    let mut cells = leaf.cells;
    cells.remove(idx);

    if cells.is_empty() {
        return Ok(Outcome {
            new_page_id: 0,
            deleted: true,
        });
    }

    let page_id = pager.allocate_page();
    let new_leaf = LeafPage {
        page_id,
        right_sibling: leaf.right_sibling,
        cells,
    };
    pager.write_leaf(&new_leaf)?;
    Ok(Outcome {
        new_page_id: page_id,
        deleted: true,
    })
}

fn delete_branch(pager: &mut Pager, branch: BranchPage, key: &[u8]) -> Result<Outcome> {
    let child_idx = find_child(&branch, key);
    let child_page_id = branch.children[child_idx];
    let result = delete_recursive(pager, child_page_id, key)?;

    if !result.deleted {
        return Ok(Outcome {
            new_page_id: branch.page_id,
            deleted: false,
        });
    }

    let mut children = branch.children;
    let mut keys = branch.keys;

    if result.new_page_id == 0 {
        // The child subtree vanished entirely: drop it and the separator
        // that pointed to it. No merging/rebalancing beyond this collapse.
        children.remove(child_idx);
        if child_idx > 0 {
            keys.remove(child_idx - 1);
        } else if !keys.is_empty() {
            keys.remove(0);
        }

        if children.is_empty() {
            return Ok(Outcome {
                new_page_id: 0,
                deleted: true,
            });
        }
        if children.len() == 1 {
            return Ok(Outcome {
                new_page_id: children[0],
                deleted: true,
            });
        }
    } else {
        children[child_idx] = result.new_page_id;
    }

    let page_id = pager.allocate_page();
    let new_branch = BranchPage {
        page_id,
        keys,
        children,
    };
    pager.write_branch(&new_branch)?;
    Ok(Outcome {
        new_page_id: page_id,
        deleted: true,
    })
}
