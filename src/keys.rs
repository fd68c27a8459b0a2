//! Order-preserving ID key encoding.
//!
//! The allocator and `get_n_items` both recover state by asking RocksDB for
//! the lexicographically last key in a column family. That backward seek is
//! only meaningful when byte order coincides with numeric order, so every
//! sort key is the big-endian encoding of its ID, regardless of host byte
//! order.
//!
//! Root *values* are opaque payload rather than sort keys and stay in
//! native byte order; see [`encode_root_value`].

use thiserror::Error;

/// Storage ID type.
///
/// Items and tree nodes share one signed 32-bit ID space, partitioned at
/// [`crate::id_space::ITEM_ID_LIMIT`]: item IDs live below the midpoint,
/// tree-node IDs at or above it.
pub type NodeId = i32;

/// Byte width of an encoded ID key.
pub const ID_SIZE: usize = std::mem::size_of::<NodeId>();

/// Errors from decoding ID keys or root values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Key byte slice is not exactly [`ID_SIZE`] bytes wide.
    #[error("invalid key width: expected {expected} bytes, got {actual}")]
    InvalidWidth { expected: usize, actual: usize },
}

/// Encode an ID as a big-endian sort key.
///
/// For any two non-negative IDs `i < j`, `encode_id(i)` compares
/// lexicographically less than `encode_id(j)`.
#[inline]
pub fn encode_id(id: NodeId) -> [u8; ID_SIZE] {
    id.to_be_bytes()
}

/// Decode a big-endian sort key back into an ID. Exact inverse of
/// [`encode_id`].
#[inline]
pub fn decode_id(bytes: &[u8]) -> Result<NodeId, KeyError> {
    let arr: [u8; ID_SIZE] = bytes.try_into().map_err(|_| KeyError::InvalidWidth {
        expected: ID_SIZE,
        actual: bytes.len(),
    })?;
    Ok(NodeId::from_be_bytes(arr))
}

/// Encode a root-set value.
///
/// Root values are never compared by the store, so they keep native byte
/// order instead of paying the big-endian swap.
#[inline]
pub fn encode_root_value(id: NodeId) -> [u8; ID_SIZE] {
    id.to_ne_bytes()
}

/// Decode a root-set value written by [`encode_root_value`].
#[inline]
pub fn decode_root_value(bytes: &[u8]) -> Result<NodeId, KeyError> {
    let arr: [u8; ID_SIZE] = bytes.try_into().map_err(|_| KeyError::InvalidWidth {
        expected: ID_SIZE,
        actual: bytes.len(),
    })?;
    Ok(NodeId::from_ne_bytes(arr))
}
