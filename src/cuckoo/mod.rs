//! Space-efficient probabilistic data structure to test for membership in a set with the ability
//! to remove items.

mod config;
mod cuckoo_filter;

pub use self::config::CuckooConfig;
pub use self::cuckoo_filter::CuckooFilter;

use serde::{Deserialize, Serialize};

/// Diagnostic snapshot of a [`CuckooFilter`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CuckooInfo {
    /// Total number of fingerprint slots.
    pub capacity: usize,
    /// Number of buckets.
    pub bucket_count: usize,
    /// Fingerprints per bucket.
    pub bucket_size: usize,
    /// Bits per fingerprint.
    pub fingerprint_bits: usize,
    /// Relocations attempted before an insert fails.
    pub max_kicks: usize,
    /// Number of occupied slots.
    pub occupied: usize,
    /// Successful inserts.
    pub items_inserted: u64,
    /// Successful deletes.
    pub items_deleted: u64,
    /// Number of inserts rejected because the filter was full.
    pub overflow_count: u64,
    /// Fraction of occupied slots.
    pub load_factor: f64,
    /// Estimated false positive probability at the current load.
    pub estimated_fpp: f64,
    /// Memory used by the bucket table.
    pub size_in_bytes: usize,
}
