//! ID-space partitioning and monotonic tree-node ID allocation.
//!
//! One signed 32-bit ID space serves both record kinds, split at
//! [`ITEM_ID_LIMIT`]: the application owns the lower half (item IDs), the
//! allocator owns the upper half (tree-node IDs). Because the two halves
//! map to separate column families, no uniqueness check across them is
//! ever needed.
//!
//! The allocator is a plain atomic counter. Durability across restarts
//! comes from the store, not from a metadata record: at open, the engine
//! seeks to the last key of the nodes column family and seeds the counter
//! past it (see [`NodeIdAllocator::recover`]).

use std::sync::atomic::{AtomicI32, Ordering};

use crate::keys::NodeId;

/// Midpoint of the ID space. IDs below it are items, IDs at or above it
/// are tree nodes.
pub const ITEM_ID_LIMIT: NodeId = NodeId::MAX / 2;

/// Which half of the ID space an ID belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// Application-assigned item ID, strictly below [`ITEM_ID_LIMIT`].
    Item,
    /// Allocator-assigned tree-node ID, at or above [`ITEM_ID_LIMIT`].
    TreeNode,
}

/// Classify an ID by the midpoint partition.
#[inline]
pub fn classify(id: NodeId) -> IdKind {
    if id < ITEM_ID_LIMIT {
        IdKind::Item
    } else {
        IdKind::TreeNode
    }
}

/// Process-wide monotonic allocator for tree-node IDs.
///
/// [`allocate`](Self::allocate) is the one operation in this layer that
/// must be safe under concurrent callers; it is a single atomic fetch-add,
/// never a read-modify-write under a lock.
#[derive(Debug)]
pub struct NodeIdAllocator {
    next: AtomicI32,
}

impl NodeIdAllocator {
    /// Seed the counter from the highest tree-node ID found in the store,
    /// if any.
    ///
    /// The first allocation after reopen is strictly greater than any ID
    /// ever persisted, so child references written in a prior process
    /// lifetime can never be collided with.
    pub fn recover(highest_persisted: Option<NodeId>) -> Self {
        let next = match highest_persisted {
            Some(id) => (id + 1).max(ITEM_ID_LIMIT),
            None => ITEM_ID_LIMIT,
        };
        Self {
            next: AtomicI32::new(next),
        }
    }

    /// Return the next tree-node ID and advance the counter atomically.
    pub fn allocate(&self) -> NodeId {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Number of tree-node IDs handed out over the store's lifetime,
    /// including prior process lifetimes recovered at open.
    pub fn allocated(&self) -> NodeId {
        self.next.load(Ordering::SeqCst) - ITEM_ID_LIMIT
    }
}
