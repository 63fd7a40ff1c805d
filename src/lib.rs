//! # ParrotKV
//!
//! An embedded, single-file key-value store built on a copy-on-write B+
//! tree over a fixed-size paged file. Keys and values are arbitrary byte
//! strings; lexicographic order is preserved and range iteration never
//! touches a stale sibling pointer.
//!
//! ## Quick start
//!
//! ```no_run
//! use parrotkv::Database;
//!
//! let mut db = Database::open("my.db")?;
//! db.put(b"alpha", b"1")?;
//! db.put(b"beta", b"2")?;
//! assert_eq!(db.get(b"alpha")?, Some(b"1".to_vec()));
//! db.delete(b"alpha")?;
//! # Ok::<(), parrotkv::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - **Page codecs** ([`page`]): byte-exact encode/decode for the five page
//!   kinds, each framed and CRC32-checksummed.
//! - **Freelist** ([`freelist`]): the in-memory set of recyclable page IDs.
//! - **Pager** ([`pager`]): fixed-offset block I/O, typed page access, active
//!   meta selection.
//! - **B+ tree** ([`btree`]): copy-on-write point and range operations.
//! - **Commit driver** ([`commit`]): atomic publication of a new root via
//!   dual alternating meta pages.
//!
//! A higher-level transactional façade (nested begin/commit/rollback) and
//! WAL replay are intentionally not part of this crate; see [`wal`] for the
//! record format alone.

pub mod btree;
pub mod commit;
pub mod error;
pub mod freelist;
pub mod page;
pub mod pager;
pub mod wal;

pub use crate::error::{Error, Result};
pub use crate::pager::{Pager, PagerOptions};

use std::path::Path;

use tracing::instrument;

/// A single-file key-value store. Every mutating call commits immediately:
/// there is no multi-operation transaction here, only the atomic
/// publication of one new root per call (see the module docs for where a
/// transactional façade would live instead).
pub struct Database {
    pager: Pager,
    root: page::PageId,
}

impl Database {
    /// Opens `path`, creating it with default options if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, PagerOptions::default())
    }

    #[instrument(skip(options), fields(path = %path.as_ref().display()))]
    pub fn open_with(path: impl AsRef<Path>, options: PagerOptions) -> Result<Self> {
        let mut pager = Pager::open(path, options)?;
        let meta = pager.read_active_meta()?;
        Ok(Self {
            pager,
            root: meta.root_page_id,
        })
    }

    /// Current root page ID; 0 means the tree is empty.
    pub fn root(&self) -> page::PageId {
        self.root
    }

    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        btree::get(&mut self.pager, self.root, key)
    }

    #[instrument(skip(self, key, value))]
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let new_root = btree::insert(&mut self.pager, self.root, key, value)?;
        self.publish(new_root)
    }

    #[instrument(skip(self, key))]
    pub fn delete(&mut self, key: &[u8]) -> Result<bool> {
        let existed = self.get(key)?.is_some();
        if !existed {
            return Ok(false);
        }
        let new_root = btree::delete(&mut self.pager, self.root, key)?;
        self.publish(new_root)?;
        Ok(true)
    }

    /// Iterates `[start, end)` in sorted key order.
    pub fn range_scan(
        &mut self,
        start: Option<Vec<u8>>,
        end: Option<Vec<u8>>,
    ) -> Result<btree::RangeScan<'_>> {
        btree::range_scan(&mut self.pager, self.root, start, end)
    }

    pub fn tree_height(&mut self) -> Result<usize> {
        btree::tree_height(&mut self.pager, self.root)
    }

    pub fn count_keys(&mut self) -> Result<usize> {
        btree::count_keys(&mut self.pager, self.root)
    }

    pub fn page_size(&self) -> u32 {
        self.pager.page_size()
    }

    pub fn pager(&mut self) -> &mut Pager {
        &mut self.pager
    }

    fn publish(&mut self, new_root: page::PageId) -> Result<()> {
        let meta = commit::commit(&mut self.pager, new_root)?;
        self.root = meta.root_page_id;
        Ok(())
    }

    pub fn close(mut self) -> Result<()> {
        self.pager.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn temp_db() -> (Database, NamedTempFile) {
        let file = NamedTempFile::new().unwrap();
        std::fs::remove_file(file.path()).ok();
        let db = Database::open(file.path()).unwrap();
        (db, file)
    }

    #[test]
    fn put_then_get_round_trips() {
        let (mut db, _file) = temp_db();
        db.put(b"hello", b"world").unwrap();
        assert_eq!(db.get(b"hello").unwrap(), Some(b"world".to_vec()));
        assert_eq!(db.get(b"missing").unwrap(), None);
    }

    #[test]
    fn overwrite_replaces_value() {
        let (mut db, _file) = temp_db();
        db.put(b"k", b"v1").unwrap();
        db.put(b"k", b"v2").unwrap();
        assert_eq!(db.get(b"k").unwrap(), Some(b"v2".to_vec()));
        assert_eq!(db.count_keys().unwrap(), 1);
    }

    #[test]
    fn delete_removes_key_and_is_idempotent() {
        let (mut db, _file) = temp_db();
        db.put(b"k", b"v").unwrap();
        assert!(db.delete(b"k").unwrap());
        assert_eq!(db.get(b"k").unwrap(), None);
        assert!(!db.delete(b"k").unwrap());
    }

    #[test]
    fn range_scan_yields_sorted_order() {
        let (mut db, _file) = temp_db();
        for key in [b"c", b"a", b"b"] {
            db.put(key, b"x").unwrap();
        }
        let mut scan = db.range_scan(None, None).unwrap();
        let mut keys = Vec::new();
        while let Some((k, _)) = scan.next_pair().unwrap() {
            keys.push(k);
        }
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn reopen_preserves_committed_state() {
        let file = NamedTempFile::new().unwrap();
        std::fs::remove_file(file.path()).ok();
        {
            let mut db = Database::open(file.path()).unwrap();
            db.put(b"durable", b"yes").unwrap();
        }
        let mut reopened = Database::open(file.path()).unwrap();
        assert_eq!(reopened.get(b"durable").unwrap(), Some(b"yes".to_vec()));
    }

    #[test]
    fn old_root_remains_valid_after_mutation_snapshot() {
        let (mut db, _file) = temp_db();
        db.put(b"a", b"1").unwrap();
        let snapshot_root = db.root();
        db.put(b"b", b"2").unwrap();
        assert_eq!(
            btree::get(db.pager(), snapshot_root, b"b").unwrap(),
            None,
            "mutation must not be visible through the old root"
        );
        assert_eq!(
            btree::get(db.pager(), snapshot_root, b"a").unwrap(),
            Some(b"1".to_vec())
        );
    }
}
