//! Tracker of the most frequent items of a stream.

mod config;
mod heavy_keeper;
mod tracker;

pub use self::config::TopKConfig;
pub use self::tracker::TopK;

use serde::{Deserialize, Serialize};

/// Diagnostic snapshot of a [`TopK`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TopKInfo {
    /// Maximum number of tracked items.
    pub k: usize,
    /// Buckets per row of the admission sketch.
    pub width: usize,
    /// Rows of the admission sketch.
    pub depth: usize,
    /// Decay base of the admission sketch.
    pub decay: f64,
    /// Number of tracked items.
    pub tracked: usize,
    /// Size of the admission sketch plus the bytes of the tracked items.
    pub size_in_bytes: usize,
}
