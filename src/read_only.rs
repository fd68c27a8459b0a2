//! Read-only storage engine for pre-built, closed indices.
//!
//! Shares the [`IndexStorage`] contract with the mutable engine but opens
//! RocksDB in read-only mode. Every mutation call is rejected with a
//! diagnostic and performs no write; it never aborts the process.

use std::path::Path;

use rocksdb::Options;
use tracing::{info, warn};

use crate::column_families::cf_names;
use crate::id_space::NodeIdAllocator;
use crate::keys::NodeId;
use crate::node::{NodeLayout, NodeRecord};
use crate::rocksdb_store::{
    count_items, last_key, read_item_vector, read_node, read_roots, Db, StorageError,
};
use crate::store::IndexStorage;

/// Read-only RocksDB-backed index storage.
///
/// The allocator state is recovered exactly like the mutable engine's so
/// that `get_n_nodes` reports the same totals; it is never advanced.
pub struct ReadOnlyIndexStore {
    db: Db,
    path: String,
    layout: NodeLayout,
    allocator: NodeIdAllocator,
}

impl ReadOnlyIndexStore {
    /// Open an existing store in read-only mode.
    ///
    /// Fails if the database or any of its column families is missing;
    /// there is no create-if-missing for a read-only open.
    pub fn open<P: AsRef<Path>>(path: P, dims: usize) -> Result<Self, StorageError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let opts = Options::default();
        let db = Db::open_cf_for_read_only(&opts, &path_str, cf_names::ALL, false).map_err(
            |e| StorageError::OpenFailed {
                path: path_str.clone(),
                message: e.to_string(),
            },
        )?;

        let layout = NodeLayout::new(dims);
        let allocator = NodeIdAllocator::recover(last_key(&db, cf_names::NODES)?);

        info!(path = %path_str, dims, "opened read-only index store");

        Ok(Self {
            db,
            path: path_str,
            layout,
            allocator,
        })
    }

    /// The database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn reject(&self, op: &'static str) -> StorageError {
        warn!(op, path = %self.path, "mutation rejected on read-only storage");
        StorageError::ReadOnly { op }
    }
}

impl IndexStorage for ReadOnlyIndexStore {
    fn add_item(&self, _id: NodeId, _vector: &[f32]) -> Result<(), StorageError> {
        Err(self.reject("add_item"))
    }

    fn get_item(&self, id: NodeId) -> Result<Vec<f32>, StorageError> {
        read_item_vector(&self.db, &self.layout, id)
    }

    fn append_node(&self, _record: &NodeRecord) -> Result<NodeId, StorageError> {
        Err(self.reject("append_node"))
    }

    fn append_children(&self, _children: &[NodeId]) -> Result<NodeId, StorageError> {
        Err(self.reject("append_children"))
    }

    fn get_node(&self, id: NodeId) -> Result<NodeRecord, StorageError> {
        read_node(&self.db, &self.layout, id)
    }

    fn set_roots(&self, _roots: &[NodeId]) -> Result<(), StorageError> {
        Err(self.reject("set_roots"))
    }

    fn load_roots(&self) -> Result<Vec<NodeId>, StorageError> {
        read_roots(&self.db)
    }

    fn get_n_items(&self) -> Result<NodeId, StorageError> {
        count_items(&self.db)
    }

    fn get_n_nodes(&self) -> Result<NodeId, StorageError> {
        Ok(count_items(&self.db)? + self.allocator.allocated())
    }

    fn max_descendants(&self) -> usize {
        self.layout.max_descendants()
    }

    fn dims(&self) -> usize {
        self.layout.dims()
    }

    fn is_mutable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rocksdb_store::RocksDbIndexStore;
    use tempfile::TempDir;

    fn build_store(tmp: &TempDir) {
        let store = RocksDbIndexStore::open(tmp.path(), 4).expect("open mutable");
        for id in 0..3 {
            store.add_item(id, &[id as f32; 4]).unwrap();
        }
        let node = store.append_children(&[0, 1, 2]).unwrap();
        store.set_roots(&[node]).unwrap();
        store.flush().unwrap();
    }

    #[test]
    fn test_reads_work() {
        let tmp = TempDir::new().unwrap();
        build_store(&tmp);

        let store = ReadOnlyIndexStore::open(tmp.path(), 4).expect("open read-only");
        assert!(!store.is_mutable());
        assert_eq!(store.get_item(1).unwrap(), vec![1.0; 4]);
        assert_eq!(store.get_n_items().unwrap(), 3);
        assert_eq!(store.get_n_nodes().unwrap(), 4);

        let roots = store.load_roots().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(store.get_node(roots[0]).unwrap().children(), vec![0, 1, 2]);
    }

    #[test]
    fn test_mutations_rejected_without_effect() {
        let tmp = TempDir::new().unwrap();
        build_store(&tmp);

        let store = ReadOnlyIndexStore::open(tmp.path(), 4).expect("open read-only");

        let err = store.add_item(5, &[0.0; 4]).unwrap_err();
        assert!(matches!(err, StorageError::ReadOnly { op: "add_item" }));
        assert!(matches!(
            store.append_children(&[0]).unwrap_err(),
            StorageError::ReadOnly { .. }
        ));
        assert!(matches!(
            store.set_roots(&[1]).unwrap_err(),
            StorageError::ReadOnly { .. }
        ));

        // Nothing changed.
        assert_eq!(store.get_n_items().unwrap(), 3);
        assert!(matches!(
            store.get_item(5).unwrap_err(),
            StorageError::NotFound { id: 5 }
        ));
    }

    #[test]
    fn test_open_missing_database_fails() {
        let tmp = TempDir::new().unwrap();
        let result = ReadOnlyIndexStore::open(tmp.path().join("absent"), 4);
        assert!(matches!(result, Err(StorageError::OpenFailed { .. })));
    }
}
