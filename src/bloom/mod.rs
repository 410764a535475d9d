//! Space-efficient probabilistic data structure for approximate membership queries in a set.

mod bloom_filter;
mod config;
mod sub_filter;

pub use self::bloom_filter::BloomFilter;
pub use self::config::BloomConfig;
pub use self::sub_filter::SubFilter;

use serde::{Deserialize, Serialize};

/// Diagnostic snapshot of a [`BloomFilter`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BloomInfo {
    /// Sum of the capacities of every sub-filter.
    pub capacity: usize,
    /// Error rate of the first sub-filter.
    pub error_rate: f64,
    /// Capacity growth factor, or `None` for a non-scaling filter.
    pub expansion: Option<u32>,
    /// Number of sub-filters.
    pub filter_count: usize,
    /// Number of successful adds.
    pub item_count: usize,
    /// Total number of bits across sub-filters.
    pub bit_count: usize,
    /// Memory used by the bit arrays.
    pub size_in_bytes: usize,
    /// Fill ratio of the active sub-filter.
    pub fill_ratio: f64,
    /// Estimated number of distinct items.
    pub cardinality: usize,
    /// Estimated compound false positive probability.
    pub estimated_fpp: f64,
}
