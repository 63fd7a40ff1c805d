//! End-to-end scenarios against the public `Database` API and, where a
//! scenario needs to see both an old and a new root, against `btree`
//! directly over a shared `Pager`.

use std::fs;

use parrotkv::pager::{Pager, PagerOptions};
use parrotkv::{btree, page, Database};
use tempfile::NamedTempFile;

fn temp_path() -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    fs::remove_file(file.path()).ok();
    file
}

/// S1: basic insert / get / range_scan.
#[test]
fn s1_basic_insert_get_scan() {
    let path = temp_path();
    let mut db = Database::open(path.path()).unwrap();
    db.put(b"a", b"1").unwrap();
    db.put(b"b", b"2").unwrap();
    db.put(b"c", b"3").unwrap();

    assert_eq!(db.get(b"b").unwrap(), Some(b"2".to_vec()));

    let mut scan = db.range_scan(None, None).unwrap();
    let mut pairs = Vec::new();
    while let Some(pair) = scan.next_pair().unwrap() {
        pairs.push(pair);
    }
    assert_eq!(
        pairs,
        vec![
            (b"a".to_vec(), b"1".to_vec()),
            (b"b".to_vec(), b"2".to_vec()),
            (b"c".to_vec(), b"3".to_vec()),
        ]
    );
}

/// S2: update then delete collapses the tree back to empty.
#[test]
fn s2_update_then_delete_empties_tree() {
    let path = temp_path();
    let mut db = Database::open(path.path()).unwrap();
    db.put(b"k", b"old").unwrap();
    db.put(b"k", b"new").unwrap();
    assert_eq!(db.get(b"k").unwrap(), Some(b"new".to_vec()));
    db.delete(b"k").unwrap();

    assert_eq!(db.get(b"k").unwrap(), None);
    assert_eq!(db.root(), 0);
}

/// S3: the old root remains a valid, unaffected snapshot after a delete.
#[test]
fn s3_snapshot_isolation_across_delete() {
    let path = temp_path();
    let mut pager = Pager::open(path.path(), PagerOptions::default()).unwrap();

    let mut root = 0;
    for i in 0..10u32 {
        let key = format!("key{i:03}").into_bytes();
        let value = format!("value{i}").into_bytes();
        root = btree::insert(&mut pager, root, &key, &value).unwrap();
    }
    let r0 = root;
    let r1 = btree::delete(&mut pager, r0, b"key005").unwrap();

    assert_eq!(
        btree::get(&mut pager, r0, b"key005").unwrap(),
        Some(b"value5".to_vec())
    );
    assert_eq!(btree::get(&mut pager, r1, b"key005").unwrap(), None);

    assert_eq!(btree::count_keys(&mut pager, r0).unwrap(), 10);
    assert_eq!(btree::count_keys(&mut pager, r1).unwrap(), 9);
}

/// S4: with enough keys to force splits, every branch separator begins its
/// own range scan.
#[test]
fn s4_split_at_separator() {
    let path = temp_path();
    let mut db = Database::open(path.path()).unwrap();
    for i in 0..500u32 {
        let key = format!("key{i:05}").into_bytes();
        db.put(&key, b"v").unwrap();
    }

    let height = db.tree_height().unwrap();
    assert!(height > 1, "500 keys should force at least one split");

    let separators = collect_separators(&mut db);
    assert!(!separators.is_empty());
    for sep in separators {
        let mut scan = db.range_scan(Some(sep.clone()), None).unwrap();
        let (first_key, _) = scan.next_pair().unwrap().expect("separator must be a live key");
        assert_eq!(first_key, sep);
    }
}

fn collect_separators(db: &mut Database) -> Vec<Vec<u8>> {
    let root = db.root();
    let mut separators = Vec::new();
    let mut stack = vec![root];
    while let Some(page_id) = stack.pop() {
        if page_id == 0 {
            continue;
        }
        let raw = db.pager().read_raw(page_id).unwrap();
        if raw.first().copied() == Some(page::PageKind::Branch as u8) {
            let branch = db.pager().read_branch(page_id).unwrap();
            separators.extend(branch.keys.iter().cloned());
            stack.extend(branch.children.iter().copied());
        }
    }
    separators
}

/// S5: zeroing the inactive meta page must not affect reopening — the
/// active meta (and its root) survives untouched.
#[test]
fn s5_crash_safe_commit_survives_inactive_meta_corruption() {
    let path = temp_path();
    {
        let mut db = Database::open(path.path()).unwrap();
        db.put(b"durable", b"value").unwrap();
    }

    let page_size = {
        let mut pager = Pager::open(path.path(), PagerOptions::default()).unwrap();
        let active = pager.read_active_meta().unwrap();
        let inactive_id = pager.get_inactive_meta_id().unwrap();
        assert_ne!(active.page_id, inactive_id);
        pager.page_size()
    };

    // Zero the inactive meta slot directly on disk, simulating a torn write
    // that never produced a valid checksum there.
    {
        use std::io::{Seek, SeekFrom, Write};
        let mut pager = Pager::open(path.path(), PagerOptions::default()).unwrap();
        let inactive_id = pager.get_inactive_meta_id().unwrap();
        drop(pager);

        let mut file = fs::OpenOptions::new().write(true).open(path.path()).unwrap();
        file.seek(SeekFrom::Start(inactive_id as u64 * page_size as u64)).unwrap();
        file.write_all(&vec![0u8; page_size as usize]).unwrap();
    }

    let mut reopened = Database::open(path.path()).unwrap();
    assert_eq!(reopened.get(b"durable").unwrap(), Some(b"value".to_vec()));
}

/// S6: one oversized cell mixed with many small ones must split safely —
/// this is exactly the case a count-based midpoint split gets wrong.
#[test]
fn s6_skewed_split_no_page_too_small_escapes() {
    let path = temp_path();
    let mut db = Database::open(path.path()).unwrap();

    for i in 0..100u32 {
        let key = format!("a{i:03}").into_bytes();
        let value = vec![b'x'; 33];
        db.put(&key, &value).unwrap();
    }
    let big_value = vec![b'y'; 3900];
    db.put(b"zzzz", &big_value).unwrap();

    assert_eq!(db.count_keys().unwrap(), 101);
    for i in 0..100u32 {
        let key = format!("a{i:03}").into_bytes();
        assert_eq!(db.get(&key).unwrap(), Some(vec![b'x'; 33]));
    }
    assert_eq!(db.get(b"zzzz").unwrap(), Some(big_value));
}

/// Property 7: height bound for 10,000 keys on 4 KB pages.
#[test]
fn height_bound_for_ten_thousand_keys() {
    let path = temp_path();
    let mut db = Database::open(path.path()).unwrap();
    for i in 0..10_000u32 {
        db.put(&i.to_be_bytes(), b"v").unwrap();
    }
    assert_eq!(db.count_keys().unwrap(), 10_000);
    assert!(db.tree_height().unwrap() <= 4);
}

/// Property 6: deleting an already-absent key is a no-op, twice over.
#[test]
fn idempotent_delete() {
    let path = temp_path();
    let mut db = Database::open(path.path()).unwrap();
    db.put(b"a", b"1").unwrap();
    db.put(b"b", b"2").unwrap();

    let first = db.delete(b"a").unwrap();
    let root_after_first = db.root();
    let second = db.delete(b"a").unwrap();
    let root_after_second = db.root();

    assert!(first);
    assert!(!second);
    assert_eq!(db.count_keys().unwrap(), 1);
    // Deleting an absent key must not publish a new root.
    assert_eq!(root_after_first, root_after_second);
}

/// Property 4 (order) plus a bounded end key.
#[test]
fn range_scan_respects_bounds_and_order() {
    let path = temp_path();
    let mut db = Database::open(path.path()).unwrap();
    for c in b'a'..=b'j' {
        db.put(&[c], b"v").unwrap();
    }

    let mut scan = db.range_scan(Some(b"c".to_vec()), Some(b"f".to_vec())).unwrap();
    let mut keys = Vec::new();
    while let Some((k, _)) = scan.next_pair().unwrap() {
        keys.push(k);
    }
    assert_eq!(keys, vec![b"c".to_vec(), b"d".to_vec(), b"e".to_vec()]);
}

/// Reopening an existing file restores the page size and committed state.
#[test]
fn reopen_restores_page_size_and_state() {
    let path = temp_path();
    {
        let mut db = Database::open_with(
            path.path(),
            PagerOptions {
                page_size: 1024,
                create_if_missing: true,
            },
        )
        .unwrap();
        db.put(b"x", b"1").unwrap();
    }
    let mut db = Database::open(path.path()).unwrap();
    assert_eq!(db.page_size(), 1024);
    assert_eq!(db.get(b"x").unwrap(), Some(b"1".to_vec()));
}

/// InvalidConfig on an unsupported page size.
#[test]
fn invalid_page_size_is_rejected() {
    let path = temp_path();
    let result = Database::open_with(
        path.path(),
        PagerOptions {
            page_size: 1000,
            create_if_missing: true,
        },
    );
    assert!(matches!(result, Err(parrotkv::Error::InvalidConfig(_))));
}

/// NotFound when opening without create permission and the file is absent.
#[test]
fn missing_file_without_create_is_not_found() {
    let path = temp_path();
    fs::remove_file(path.path()).ok();
    let result = Database::open_with(
        path.path(),
        PagerOptions {
            create_if_missing: false,
            ..PagerOptions::default()
        },
    );
    assert!(matches!(result, Err(parrotkv::Error::NotFound(_))));
}

/// Freeing a reserved page ID is rejected by the pager's freelist.
#[test]
fn freeing_a_reserved_page_fails() {
    let path = temp_path();
    let mut pager = Pager::open(path.path(), PagerOptions::default()).unwrap();
    assert!(matches!(
        pager.free_page(page::HEADER_PAGE_ID),
        Err(parrotkv::Error::ReservedPage(_))
    ));
}
