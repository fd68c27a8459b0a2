//! Mutable RocksDB storage engine.
//!
//! Maps the forest onto three column families (items, nodes, roots) with
//! big-endian ID keys so that RocksDB's lexicographic key order coincides
//! with numeric ID order. Structural state is never held in a separate
//! metadata record: the tree-node ID counter and the item count are both
//! recovered by seeking to the last key of the relevant column family.
//!
//! # Thread Safety
//! The engine uses `DBWithThreadMode<MultiThreaded>` and can be shared
//! across threads via `Arc`. ID allocation inside `append_node` is an
//! atomic fetch-add; all other writes assume single-writer discipline.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{BoundColumnFamily, Cache, DBWithThreadMode, IteratorMode, MultiThreaded, Options};
use thiserror::Error;
use tracing::{debug, info};

use crate::column_families::{cf_names, get_column_family_descriptors, roots_options};
use crate::id_space::{classify, IdKind, NodeIdAllocator};
use crate::keys::{decode_id, decode_root_value, encode_id, encode_root_value, KeyError, NodeId};
use crate::node::{NodeLayout, NodeRecord, RecordError};
use crate::store::IndexStorage;

/// RocksDB handle type shared by the mutable and read-only engines.
pub(crate) type Db = DBWithThreadMode<MultiThreaded>;

/// Default block cache size: 64MB.
pub const DEFAULT_CACHE_SIZE: usize = 64 * 1024 * 1024;

/// Default maximum open files.
pub const DEFAULT_MAX_OPEN_FILES: i32 = 1000;

/// Storage operation errors.
///
/// Store-level failures (open, read, write, flush) propagate to the
/// caller; logical contract violations the layer does not defend against
/// (sparse item IDs, dangling children written by a crashed builder) are
/// documented on the operations that can observe them.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database failed to open. The engine is never usable in a
    /// partially-opened state; construction either succeeds or fails.
    #[error("failed to open database at '{path}': {message}")]
    OpenFailed { path: String, message: String },

    /// Column family not found (should never happen once opened).
    #[error("column family '{name}' not found")]
    ColumnFamilyNotFound { name: String },

    /// Write operation failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Read operation failed.
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// Flush operation failed.
    #[error("flush failed: {0}")]
    FlushFailed(String),

    /// No record stored under the given ID. This is also how a dangling
    /// child reference surfaces at resolution time.
    #[error("no record stored for id {id}")]
    NotFound { id: NodeId },

    /// Item ID is negative or falls in the tree-node half of the ID space.
    #[error("item id {id} is outside the item half of the id space")]
    ItemIdOutOfRange { id: NodeId },

    /// Mutation attempted on a read-only store.
    #[error("storage is read-only: {op} rejected")]
    ReadOnly { op: &'static str },

    /// Stored key has the wrong byte width.
    #[error("key codec error: {0}")]
    Key(#[from] KeyError),

    /// Record build or decode failed.
    #[error("record codec error: {0}")]
    Record(#[from] RecordError),
}

/// Configuration options for [`RocksDbIndexStore`].
///
/// # Defaults
/// - `max_open_files`: 1000
/// - `block_cache_size`: 64MB
/// - `enable_wal`: true (durability)
/// - `create_if_missing`: true
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Maximum open files.
    pub max_open_files: i32,
    /// Shared block cache size in bytes.
    pub block_cache_size: usize,
    /// Enable write-ahead logging.
    pub enable_wal: bool,
    /// Create the database if missing.
    pub create_if_missing: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            max_open_files: DEFAULT_MAX_OPEN_FILES,
            block_cache_size: DEFAULT_CACHE_SIZE,
            enable_wal: true,
            create_if_missing: true,
        }
    }
}

// === Shared read path ===
//
// The read-only engine resolves records exactly like the mutable one, so
// the read path lives in free functions over the raw handle.

pub(crate) fn cf_handle<'a>(
    db: &'a Db,
    name: &str,
) -> Result<Arc<BoundColumnFamily<'a>>, StorageError> {
    db.cf_handle(name)
        .ok_or_else(|| StorageError::ColumnFamilyNotFound {
            name: name.to_string(),
        })
}

/// Decode the lexicographically last key of a column family, if any.
///
/// This is the recovery primitive behind both the allocator seed and
/// `get_n_items`: one backward seek per call, meaningful because keys are
/// big-endian.
pub(crate) fn last_key(db: &Db, name: &str) -> Result<Option<NodeId>, StorageError> {
    let cf = cf_handle(db, name)?;
    match db.iterator_cf(&cf, IteratorMode::End).next() {
        Some(Ok((key, _))) => Ok(Some(decode_id(&key)?)),
        Some(Err(e)) => Err(StorageError::ReadFailed(e.to_string())),
        None => Ok(None),
    }
}

pub(crate) fn read_node(
    db: &Db,
    layout: &NodeLayout,
    id: NodeId,
) -> Result<NodeRecord, StorageError> {
    let cf_name = match classify(id) {
        IdKind::Item => cf_names::ITEMS,
        IdKind::TreeNode => cf_names::NODES,
    };
    let cf = cf_handle(db, cf_name)?;
    let bytes = db
        .get_cf(&cf, encode_id(id))
        .map_err(|e| StorageError::ReadFailed(e.to_string()))?
        .ok_or(StorageError::NotFound { id })?;
    Ok(NodeRecord::from_bytes(layout, &bytes)?)
}

pub(crate) fn read_item_vector(
    db: &Db,
    layout: &NodeLayout,
    id: NodeId,
) -> Result<Vec<f32>, StorageError> {
    let cf = cf_handle(db, cf_names::ITEMS)?;
    let bytes = db
        .get_cf(&cf, encode_id(id))
        .map_err(|e| StorageError::ReadFailed(e.to_string()))?
        .ok_or(StorageError::NotFound { id })?;
    Ok(NodeRecord::from_bytes(layout, &bytes)?.vector())
}

pub(crate) fn read_roots(db: &Db) -> Result<Vec<NodeId>, StorageError> {
    let cf = cf_handle(db, cf_names::ROOTS)?;
    let mut roots = Vec::new();
    for entry in db.iterator_cf(&cf, IteratorMode::Start) {
        let (_key, value) = entry.map_err(|e| StorageError::ReadFailed(e.to_string()))?;
        roots.push(decode_root_value(&value)?);
    }
    Ok(roots)
}

pub(crate) fn count_items(db: &Db) -> Result<NodeId, StorageError> {
    Ok(last_key(db, cf_names::ITEMS)?.map_or(0, |highest| highest + 1))
}

/// Mutable RocksDB-backed index storage.
///
/// Opening either succeeds fully or fails; there is no partially-open
/// state. Dropping the store closes it, so no operation is reachable on a
/// closed store.
pub struct RocksDbIndexStore {
    db: Db,
    /// Shared block cache, kept alive for the DB lifetime.
    #[allow(dead_code)]
    cache: Cache,
    path: String,
    layout: NodeLayout,
    allocator: NodeIdAllocator,
}

impl RocksDbIndexStore {
    /// Open (creating if missing) a store for `dims`-component vectors
    /// with default configuration.
    pub fn open<P: AsRef<Path>>(path: P, dims: usize) -> Result<Self, StorageError> {
        Self::open_with_config(path, dims, RocksDbConfig::default())
    }

    /// Open a store with custom configuration.
    ///
    /// Opens all three column families and recovers the tree-node ID
    /// counter by seeking to the last key of the nodes column family, so
    /// IDs allocated after a restart never collide with persisted ones.
    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        dims: usize,
        config: RocksDbConfig,
    ) -> Result<Self, StorageError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let cache = Cache::new_lru_cache(config.block_cache_size);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(config.create_if_missing);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_open_files(config.max_open_files);
        if !config.enable_wal {
            db_opts.set_manual_wal_flush(true);
        }

        let descriptors = get_column_family_descriptors(&cache);
        let db = Db::open_cf_descriptors(&db_opts, &path_str, descriptors).map_err(|e| {
            StorageError::OpenFailed {
                path: path_str.clone(),
                message: e.to_string(),
            }
        })?;

        let layout = NodeLayout::new(dims);
        let allocator = NodeIdAllocator::recover(last_key(&db, cf_names::NODES)?);

        info!(
            path = %path_str,
            dims,
            record_size = layout.record_size(),
            max_descendants = layout.max_descendants(),
            "opened index store"
        );

        Ok(Self {
            db,
            cache,
            path: path_str,
            layout,
            allocator,
        })
    }

    /// The database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The record layout this store was opened with.
    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    /// Flush all column families to disk.
    pub fn flush(&self) -> Result<(), StorageError> {
        for name in cf_names::ALL {
            let cf = cf_handle(&self.db, name)?;
            self.db
                .flush_cf(&cf)
                .map_err(|e| StorageError::FlushFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl IndexStorage for RocksDbIndexStore {
    fn add_item(&self, id: NodeId, vector: &[f32]) -> Result<(), StorageError> {
        if id < 0 || classify(id) != IdKind::Item {
            return Err(StorageError::ItemIdOutOfRange { id });
        }
        let record = NodeRecord::leaf(&self.layout, vector)?;
        let cf = cf_handle(&self.db, cf_names::ITEMS)?;
        self.db
            .put_cf(&cf, encode_id(id), record.as_bytes())
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        debug!(id, "stored item");
        Ok(())
    }

    fn get_item(&self, id: NodeId) -> Result<Vec<f32>, StorageError> {
        read_item_vector(&self.db, &self.layout, id)
    }

    fn append_node(&self, record: &NodeRecord) -> Result<NodeId, StorageError> {
        if record.as_bytes().len() != self.layout.record_size() {
            return Err(RecordError::InvalidSize {
                expected: self.layout.record_size(),
                actual: record.as_bytes().len(),
            }
            .into());
        }
        let id = self.allocator.allocate();
        let cf = cf_handle(&self.db, cf_names::NODES)?;
        self.db
            .put_cf(&cf, encode_id(id), record.as_bytes())
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        debug!(id, n_descendants = record.n_descendants(), "appended tree node");
        Ok(id)
    }

    fn append_children(&self, children: &[NodeId]) -> Result<NodeId, StorageError> {
        let record = NodeRecord::branch(&self.layout, children)?;
        self.append_node(&record)
    }

    fn get_node(&self, id: NodeId) -> Result<NodeRecord, StorageError> {
        read_node(&self.db, &self.layout, id)
    }

    fn set_roots(&self, roots: &[NodeId]) -> Result<(), StorageError> {
        // Wholesale replacement: drop and recreate the roots column
        // family, then rewrite. The window between drop and the last put
        // is visible to concurrent readers of load_roots.
        self.db
            .drop_cf(cf_names::ROOTS)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        self.db
            .create_cf(cf_names::ROOTS, &roots_options())
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;

        let cf = cf_handle(&self.db, cf_names::ROOTS)?;
        for (index, root) in roots.iter().enumerate() {
            self.db
                .put_cf(&cf, encode_id(index as NodeId), encode_root_value(*root))
                .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        }
        info!(n_roots = roots.len(), "replaced root set");
        Ok(())
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
        true
    }
}
