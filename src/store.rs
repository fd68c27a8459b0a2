//! Storage capability trait consumed by the index builder and searcher.
//!
//! The tree-construction and query algorithms live outside this crate and
//! reach storage only through [`IndexStorage`]; they never touch key
//! encoding or ID classification directly.
//!
//! # Implementors
//! - [`crate::rocksdb_store::RocksDbIndexStore`]: mutable RocksDB engine
//! - [`crate::read_only::ReadOnlyIndexStore`]: read-only sibling for
//!   pre-built, closed indices
//!
//! # Object Safety
//! The trait is object-safe and usable as `dyn IndexStorage`; all methods
//! take `&self` and return concrete types.
//!
//! # Thread Safety
//! Implementors must be `Send + Sync`. Only ID allocation inside
//! `append_node` is guaranteed safe under concurrent callers; everything
//! else assumes single-writer-at-a-time discipline (see `set_roots`).

use crate::keys::NodeId;
use crate::node::NodeRecord;
use crate::rocksdb_store::StorageError;

/// Storage contract for one forest of fixed-degree split trees plus its
/// item vectors.
pub trait IndexStorage: Send + Sync {
    // === Item operations ===

    /// Store an item vector under an application-chosen ID.
    ///
    /// Builds a leaf record (descendant count 1, zeroed child slots, the
    /// vector embedded) and writes it into the items keyspace. Writing the
    /// same ID again replaces the prior value.
    ///
    /// Item IDs are assumed dense from 0; gaps inflate
    /// [`get_n_items`](Self::get_n_items) and are not detected.
    ///
    /// # Errors
    /// - `StorageError::ItemIdOutOfRange` if `id` is negative or falls in
    ///   the tree-node half of the ID space
    /// - `StorageError::Record` if the vector dimensionality is wrong
    /// - `StorageError::ReadOnly` on an immutable store
    fn add_item(&self, id: NodeId, vector: &[f32]) -> Result<(), StorageError>;

    /// Item vector payload by ID (the vector only, not the full record).
    ///
    /// # Errors
    /// - `StorageError::NotFound` if no item is stored under `id`
    fn get_item(&self, id: NodeId) -> Result<Vec<f32>, StorageError>;

    // === Tree operations ===

    /// Persist a tree node and return its freshly allocated ID.
    ///
    /// The node is durably written before the ID is returned, which gives
    /// the builder its write-before-reference order: append all children
    /// first, then embed the returned IDs in the parent it appends next.
    /// No further fencing is provided.
    fn append_node(&self, record: &NodeRecord) -> Result<NodeId, StorageError>;

    /// Convenience form of [`append_node`](Self::append_node): build a
    /// fan-out record from a raw child ID list and persist it.
    fn append_children(&self, children: &[NodeId]) -> Result<NodeId, StorageError>;

    /// Resolve an ID to its decoded record, picking the items or nodes
    /// keyspace by the midpoint partition.
    ///
    /// The returned record owns its buffer; dropping it releases the
    /// decode allocation. A child reference written by a crashed builder
    /// may dangle, in which case this surfaces `NotFound` rather than
    /// masking it.
    fn get_node(&self, id: NodeId) -> Result<NodeRecord, StorageError>;

    // === Root set ===

    /// Replace the entire root set.
    ///
    /// Drops the roots keyspace wholesale and rewrites one entry per root,
    /// keyed by sequence index. The drop+rewrite pair is NOT crash-atomic:
    /// a concurrent reader of [`load_roots`](Self::load_roots) can observe
    /// an empty or partial root set. Callers needing atomic visibility
    /// must serialize root replacement against readers themselves.
    fn set_roots(&self, roots: &[NodeId]) -> Result<(), StorageError>;

    /// Read the root set back in sequence order.
    fn load_roots(&self) -> Result<Vec<NodeId>, StorageError>;

    // === Counters and geometry ===

    /// Highest stored item ID plus one. Correct only under the dense-ID
    /// caller contract; sparse IDs overcount silently.
    fn get_n_items(&self) -> Result<NodeId, StorageError>;

    /// Total record count: items plus every tree-node ID handed out over
    /// the store's lifetime.
    fn get_n_nodes(&self) -> Result<NodeId, StorageError>;

    /// Fan-out capacity `K`: how many child IDs one record can hold. The
    /// builder splits a node once it would exceed this.
    fn max_descendants(&self) -> usize;

    /// Vector dimensionality `f` this store was opened with.
    fn dims(&self) -> usize;

    /// Whether mutation calls are accepted. The read-only variant returns
    /// false and rejects all mutations with a diagnostic.
    fn is_mutable(&self) -> bool;
}
