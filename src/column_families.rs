//! RocksDB column family definitions.
//!
//! Column families give the engine its three logical keyspaces and keep
//! their iteration spaces independent, which the backward-seek recovery
//! scans rely on.
//!
//! # Column Families (3 total)
//! | Name | Purpose | Key Format | Value |
//! |------|---------|------------|-------|
//! | items | Item leaf records | big-endian item ID (4 bytes) | fixed-size node record |
//! | nodes | Internal tree-node records | big-endian node ID (4 bytes) | fixed-size node record |
//! | roots | Forest root set | big-endian sequence index (4 bytes) | native-endian node ID |
//!
//! # Shared Block Cache
//! The record column families share one LRU block cache so memory is
//! bounded regardless of how the forest is split between items and nodes.

use rocksdb::{BlockBasedOptions, Cache, ColumnFamilyDescriptor, Options};

/// Column family name constants.
pub mod cf_names {
    /// Item leaf records, keyed by big-endian item ID.
    pub const ITEMS: &str = "items";

    /// Internal tree-node records, keyed by big-endian node ID.
    pub const NODES: &str = "nodes";

    /// Root set, keyed by big-endian sequence index.
    pub const ROOTS: &str = "roots";

    /// All column family names, in descriptor order.
    pub const ALL: &[&str] = &[ITEMS, NODES, ROOTS];
}

/// Options for the record column families (items, nodes).
///
/// Records are read by point lookup during tree descent, so these CFs get
/// a bloom filter and the shared block cache. LZ4 keeps the fixed-size
/// records cheap to store without hurting read latency.
pub fn record_options(cache: &Cache) -> Options {
    let mut block_opts = BlockBasedOptions::default();
    block_opts.set_block_cache(cache);
    block_opts.set_bloom_filter(10.0, false);
    block_opts.set_cache_index_and_filter_blocks(true);

    let mut opts = Options::default();
    opts.set_block_based_table_factory(&block_opts);
    opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
    opts.create_if_missing(true);

    opts
}

/// Options for the roots column family.
///
/// The root set holds one tiny entry per tree and is rewritten wholesale,
/// so compression and bloom filters are not worth their overhead.
pub fn roots_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::None);
    opts.create_if_missing(true);

    opts
}

/// All column family descriptors with their tuned options, in
/// `cf_names::ALL` order.
pub fn get_column_family_descriptors(cache: &Cache) -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(cf_names::ITEMS, record_options(cache)),
        ColumnFamilyDescriptor::new(cf_names::NODES, record_options(cache)),
        ColumnFamilyDescriptor::new(cf_names::ROOTS, roots_options()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_cf_names_count() {
        assert_eq!(cf_names::ALL.len(), 3);
    }

    #[test]
    fn test_cf_names_unique() {
        let set: HashSet<_> = cf_names::ALL.iter().collect();
        assert_eq!(set.len(), cf_names::ALL.len());
    }

    #[test]
    fn test_descriptor_order_matches_names() {
        let cache = Cache::new_lru_cache(1024 * 1024);
        let descriptors = get_column_family_descriptors(&cache);
        assert_eq!(descriptors.len(), cf_names::ALL.len());
        for (descriptor, name) in descriptors.iter().zip(cf_names::ALL) {
            assert_eq!(descriptor.name(), *name);
        }
    }

    #[test]
    fn test_options_build_with_shared_cache() {
        let cache = Cache::new_lru_cache(1024 * 1024);
        // Builders must not panic when sharing one cache.
        let _items = record_options(&cache);
        let _nodes = record_options(&cache);
        let _roots = roots_options();
    }
}
