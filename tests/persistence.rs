//! Cross-reopen integration tests.
//!
//! Everything the engine recovers at open comes from byte-ordered key
//! scans, so these tests close the store between phases and verify the
//! recovered state against what was persisted.

use forest_storage::{
    IndexStorage, NodeId, ReadOnlyIndexStore, RocksDbIndexStore, StorageError, ITEM_ID_LIMIT,
};
use tempfile::TempDir;

#[test]
fn reopen_allocates_past_persisted_node_ids() {
    let tmp = TempDir::new().unwrap();
    let highest;
    {
        let store = RocksDbIndexStore::open(tmp.path(), 4).unwrap();
        let mut last = 0;
        for i in 0..10 {
            last = store.append_children(&[i]).unwrap();
        }
        highest = last;
        store.flush().unwrap();
    }

    let store = RocksDbIndexStore::open(tmp.path(), 4).unwrap();
    let first_after_reopen = store.append_children(&[99]).unwrap();
    assert!(
        first_after_reopen > highest,
        "first post-reopen id {} must exceed highest persisted id {}",
        first_after_reopen,
        highest
    );
}

#[test]
fn reopen_preserves_items_nodes_and_roots() {
    let tmp = TempDir::new().unwrap();
    let root;
    {
        let store = RocksDbIndexStore::open(tmp.path(), 3).unwrap();
        for id in 0..5 {
            store.add_item(id, &[id as f32, 0.0, -1.0]).unwrap();
        }
        let left = store.append_children(&[0, 1]).unwrap();
        let right = store.append_children(&[2, 3, 4]).unwrap();
        root = store.append_children(&[left, right]).unwrap();
        store.set_roots(&[root]).unwrap();
        store.flush().unwrap();
    }

    let store = RocksDbIndexStore::open(tmp.path(), 3).unwrap();
    assert_eq!(store.get_n_items().unwrap(), 5);
    assert_eq!(store.get_n_nodes().unwrap(), 8);
    assert_eq!(store.load_roots().unwrap(), vec![root]);

    // Walk the persisted tree from the root down to an item vector.
    let root_record = store.get_node(root).unwrap();
    assert_eq!(root_record.n_descendants(), 2);
    let right = root_record.children()[1];
    let right_record = store.get_node(right).unwrap();
    assert_eq!(right_record.children(), vec![2, 3, 4]);
    assert_eq!(store.get_item(4).unwrap(), vec![4.0, 0.0, -1.0]);
}

#[test]
fn reopen_counts_sparse_items_from_highest_key() {
    let tmp = TempDir::new().unwrap();
    {
        let store = RocksDbIndexStore::open(tmp.path(), 2).unwrap();
        store.add_item(0, &[1.0, 1.0]).unwrap();
        store.add_item(41, &[2.0, 2.0]).unwrap();
        store.flush().unwrap();
    }

    // The count is recovered by seeking to the highest item key, so the
    // gap is invisible: dense-ID contract, not a detected error.
    let store = RocksDbIndexStore::open(tmp.path(), 2).unwrap();
    assert_eq!(store.get_n_items().unwrap(), 42);
}

#[test]
fn read_only_store_matches_builder_view() {
    let tmp = TempDir::new().unwrap();
    let root;
    {
        let store = RocksDbIndexStore::open(tmp.path(), 2).unwrap();
        for id in 0..4 {
            store.add_item(id, &[id as f32, -(id as f32)]).unwrap();
        }
        root = store.append_children(&[0, 1, 2, 3]).unwrap();
        store.set_roots(&[root]).unwrap();
        store.flush().unwrap();
    }

    let reader = ReadOnlyIndexStore::open(tmp.path(), 2).unwrap();
    assert!(!reader.is_mutable());
    assert_eq!(reader.load_roots().unwrap(), vec![root]);
    assert_eq!(reader.get_n_nodes().unwrap(), 5);
    // dims = 2: s = 12 + 8 = 20, K = (20 - 4) / 4 = 4
    assert_eq!(reader.max_descendants(), 4);

    assert!(matches!(
        reader.add_item(9, &[0.0, 0.0]).unwrap_err(),
        StorageError::ReadOnly { .. }
    ));
}

#[test]
fn roots_survive_multiple_replacements_across_reopen() {
    let tmp = TempDir::new().unwrap();
    {
        let store = RocksDbIndexStore::open(tmp.path(), 2).unwrap();
        store.set_roots(&[ITEM_ID_LIMIT, ITEM_ID_LIMIT + 1]).unwrap();
        store
            .set_roots(&[ITEM_ID_LIMIT + 2, ITEM_ID_LIMIT + 3, ITEM_ID_LIMIT + 4])
            .unwrap();
        store.flush().unwrap();
    }

    let store = RocksDbIndexStore::open(tmp.path(), 2).unwrap();
    let expected: Vec<NodeId> = vec![ITEM_ID_LIMIT + 2, ITEM_ID_LIMIT + 3, ITEM_ID_LIMIT + 4];
    assert_eq!(store.load_roots().unwrap(), expected);
}
