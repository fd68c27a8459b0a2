//! Fixed-size tree node records.
//!
//! Every record for a given dimensionality `f` has the same byte size
//! `record_size = VECTOR_OFFSET + f * 4`, so the fan-out capacity `K`
//! derived from it is fixed for the lifetime of a store.
//!
//! # Record layout
//! | Offset | Field | Width |
//! |--------|-------|-------|
//! | 0 | `n_descendants` (i32, little-endian) | 4 |
//! | [`CHILDREN_OFFSET`] | child ID array | up to `K * 4` |
//! | [`VECTOR_OFFSET`] | f32 vector (leaf view) | `f * 4` |
//!
//! The child-array and vector regions overlap past [`VECTOR_OFFSET`]. That
//! is deliberate space reuse: a record is either an internal fan-out node
//! (children populated) or a single-item leaf (vector populated), and the
//! two interpretations never coexist. No tag byte is stored; the keyspace a
//! record was read from already disambiguates it.
//!
//! Decoding checks length only, never content. A corrupted record surfaces
//! later as a dangling child reference, not here.

use thiserror::Error;

use crate::keys::{NodeId, ID_SIZE};

/// Byte offset of the child ID array within a record.
pub const CHILDREN_OFFSET: usize = ID_SIZE;

/// Byte offset of the vector region within a record. The two child slots
/// between [`CHILDREN_OFFSET`] and here are zeroed in a leaf.
pub const VECTOR_OFFSET: usize = ID_SIZE + 2 * ID_SIZE;

const COMPONENT_SIZE: usize = std::mem::size_of::<f32>();

/// Errors from building or decoding node records.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Record byte slice does not match the layout's record size.
    #[error("invalid record size: expected {expected} bytes, got {actual}")]
    InvalidSize { expected: usize, actual: usize },

    /// Vector component count does not match the layout's dimensionality.
    #[error("invalid vector dimensionality: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Child list does not fit into one record.
    #[error("child list of {count} exceeds fan-out capacity {capacity}")]
    TooManyChildren { count: usize, capacity: usize },
}

/// Record geometry derived once from the vector dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLayout {
    dims: usize,
    record_size: usize,
    max_descendants: usize,
}

impl NodeLayout {
    /// Compute the layout for `dims`-component vectors.
    pub fn new(dims: usize) -> Self {
        let record_size = VECTOR_OFFSET + dims * COMPONENT_SIZE;
        let max_descendants = (record_size - CHILDREN_OFFSET) / ID_SIZE;
        Self {
            dims,
            record_size,
            max_descendants,
        }
    }

    /// Vector dimensionality `f`.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Fixed byte size of every record under this layout.
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Fan-out capacity `K`: the number of child IDs one record can hold.
    pub fn max_descendants(&self) -> usize {
        self.max_descendants
    }
}

/// One fixed-size node record, owning its decode buffer.
///
/// The buffer is reclaimed on drop, which replaces the original
/// borrow/release accessor pair with scoped ownership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    buf: Vec<u8>,
}

impl NodeRecord {
    /// Build a single-item leaf: descendant count 1, zeroed child slots,
    /// the vector embedded at [`VECTOR_OFFSET`].
    pub fn leaf(layout: &NodeLayout, vector: &[f32]) -> Result<Self, RecordError> {
        if vector.len() != layout.dims() {
            return Err(RecordError::DimensionMismatch {
                expected: layout.dims(),
                actual: vector.len(),
            });
        }
        let mut buf = vec![0u8; layout.record_size()];
        buf[..ID_SIZE].copy_from_slice(&1i32.to_le_bytes());
        for (i, component) in vector.iter().enumerate() {
            let at = VECTOR_OFFSET + i * COMPONENT_SIZE;
            buf[at..at + COMPONENT_SIZE].copy_from_slice(&component.to_le_bytes());
        }
        Ok(Self { buf })
    }

    /// Build an internal fan-out record from a child ID list. The
    /// descendant count is the list length.
    pub fn branch(layout: &NodeLayout, children: &[NodeId]) -> Result<Self, RecordError> {
        if children.len() > layout.max_descendants() {
            return Err(RecordError::TooManyChildren {
                count: children.len(),
                capacity: layout.max_descendants(),
            });
        }
        let mut buf = vec![0u8; layout.record_size()];
        buf[..ID_SIZE].copy_from_slice(&(children.len() as i32).to_le_bytes());
        for (i, child) in children.iter().enumerate() {
            let at = CHILDREN_OFFSET + i * ID_SIZE;
            buf[at..at + ID_SIZE].copy_from_slice(&child.to_le_bytes());
        }
        Ok(Self { buf })
    }

    /// Decode a record from stored bytes. Length is checked against the
    /// layout; content is not validated.
    pub fn from_bytes(layout: &NodeLayout, bytes: &[u8]) -> Result<Self, RecordError> {
        if bytes.len() != layout.record_size() {
            return Err(RecordError::InvalidSize {
                expected: layout.record_size(),
                actual: bytes.len(),
            });
        }
        Ok(Self {
            buf: bytes.to_vec(),
        })
    }

    /// The raw record bytes, suitable for a store value.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Descendant count. 1 marks a single-item leaf.
    pub fn n_descendants(&self) -> i32 {
        let mut arr = [0u8; ID_SIZE];
        arr.copy_from_slice(&self.buf[..ID_SIZE]);
        i32::from_le_bytes(arr)
    }

    /// Child IDs of a fan-out record: `n_descendants` slots starting at
    /// [`CHILDREN_OFFSET`]. Only meaningful when `n_descendants > 1`; a
    /// leaf's slots are zero.
    pub fn children(&self) -> Vec<NodeId> {
        let capacity = (self.buf.len() - CHILDREN_OFFSET) / ID_SIZE;
        let count = (self.n_descendants().max(0) as usize).min(capacity);
        (0..count)
            .map(|i| {
                let at = CHILDREN_OFFSET + i * ID_SIZE;
                let mut arr = [0u8; ID_SIZE];
                arr.copy_from_slice(&self.buf[at..at + ID_SIZE]);
                NodeId::from_le_bytes(arr)
            })
            .collect()
    }

    /// Vector payload of a leaf record. Dimensionality is recovered from
    /// the buffer length.
    pub fn vector(&self) -> Vec<f32> {
        self.buf[VECTOR_OFFSET..]
            .chunks_exact(COMPONENT_SIZE)
            .map(|chunk| {
                let mut arr = [0u8; COMPONENT_SIZE];
                arr.copy_from_slice(chunk);
                f32::from_le_bytes(arr)
            })
            .collect()
    }
}
