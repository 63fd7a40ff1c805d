//! Byte-size-driven split points.
//!
//! A simple `len / 2` midpoint works only when cells are roughly uniform in
//! size. One oversized value among many small ones can make a "fair" half
//! overflow a page on its own, so the split point is chosen by actually
//! checking both halves against the size predicate: the smallest `mid` for
//! which `left_fits(items[..mid])` and `right_fits(items[mid..])` both hold.

use crate::page::branch::branch_fits;
use crate::page::leaf::{leaf_fits, Cell};

/// Smallest `mid` in `1..items.len()` such that both `cells[..mid]` and
/// `cells[mid..]` fit a page. Returns `None` if no such split exists (the
/// caller should treat this as the value being too large for any page,
/// which the encode-time `PageTooSmall` check will report precisely).
pub fn find_leaf_split(cells: &[Cell], page_size: usize) -> Option<usize> {
    for mid in 1..cells.len() {
        if leaf_fits(&cells[..mid], page_size) && leaf_fits(&cells[mid..], page_size) {
            return Some(mid);
        }
    }
    None
}

/// Smallest `mid` in `1..keys.len()` such that both halves of a branch fit,
/// once the key at `mid` is promoted out (left keeps `keys[..mid]` /
/// `children[..=mid]`, right keeps `keys[mid+1..]` / `children[mid+1..]`).
pub fn find_branch_split(keys: &[Vec<u8>], page_size: usize) -> Option<usize> {
    for mid in 1..keys.len() {
        let left_fits = branch_fits(&keys[..mid], page_size);
        let right_fits = branch_fits(&keys[mid + 1..], page_size);
        if left_fits && right_fits {
            return Some(mid);
        }
    }
    None
}
