//! Forest Storage Layer
//!
//! Durable storage for a forest of fixed-degree binary-split tree nodes
//! and their raw item vectors, mapped onto RocksDB column families. The
//! index-construction and query algorithms are external collaborators
//! that consume this crate through the [`IndexStorage`] contract.
//!
//! # Architecture
//! - `keys`: order-preserving big-endian ID key encoding
//! - `node`: fixed-size node record codec (leaf vector / fan-out views)
//! - `id_space`: item vs tree-node ID partition and atomic allocation
//! - `column_families`: column family names, options, descriptors
//! - `store`: the [`IndexStorage`] capability trait
//! - `rocksdb_store`: mutable engine, [`RocksDbIndexStore`]
//! - `read_only`: immutable sibling, [`ReadOnlyIndexStore`]
//!
//! # Structural consistency
//! The engine keeps no in-memory index of its own. Every ID ever handed
//! out stays unique across restarts because the allocator is re-seeded at
//! open from a backward seek over the nodes column family, and big-endian
//! keys make that seek equivalent to "highest ID ever persisted".

pub mod column_families;
pub mod id_space;
pub mod keys;
pub mod node;
pub mod read_only;
pub mod rocksdb_store;
pub mod store;

pub use column_families::{cf_names, get_column_family_descriptors, record_options, roots_options};
pub use id_space::{classify, IdKind, NodeIdAllocator, ITEM_ID_LIMIT};
pub use keys::{decode_id, decode_root_value, encode_id, encode_root_value, KeyError, NodeId, ID_SIZE};
pub use node::{NodeLayout, NodeRecord, RecordError, CHILDREN_OFFSET, VECTOR_OFFSET};
pub use read_only::ReadOnlyIndexStore;
pub use rocksdb_store::{RocksDbConfig, RocksDbIndexStore, StorageError};
pub use store::IndexStorage;
