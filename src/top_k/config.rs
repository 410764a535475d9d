use crate::error::{invalid_config, Result};
use crate::hash::HashKit;
use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_K: usize = 10;
pub(crate) const DEFAULT_WIDTH: usize = 8;
pub(crate) const DEFAULT_DEPTH: usize = 7;
pub(crate) const DEFAULT_DECAY: f64 = 0.9;

/// Upper bound on the number of buckets of the admission sketch.
pub(crate) const MAX_BUCKET_COUNT: usize = 1 << 30;

/// Configuration of a [`TopK`](super::TopK).
///
/// Defaults to tracking 10 items with an admission sketch of 7 rows of 8 buckets and a decay of
/// 0.9.
///
/// # Examples
///
/// ```
/// use probabilistic_sketches::top_k::TopKConfig;
///
/// let config = TopKConfig::new().with_k(50).with_width(2_000).with_depth(5);
///
/// assert!(config.validate().is_ok());
/// assert!(TopKConfig::new().with_decay(1.5).validate().is_err());
/// ```
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct TopKConfig {
    k: usize,
    width: usize,
    depth: usize,
    decay: f64,
    hash_kit: HashKit,
}

impl TopKConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        TopKConfig {
            k: DEFAULT_K,
            width: DEFAULT_WIDTH,
            depth: DEFAULT_DEPTH,
            decay: DEFAULT_DECAY,
            hash_kit: HashKit::default(),
        }
    }

    /// Sets the number of tracked items.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Sets the number of buckets per row of the admission sketch.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Sets the number of rows of the admission sketch.
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Sets the base of the probability `decay^count` with which a colliding increment decays a
    /// bucket held by another item.
    pub fn with_decay(mut self, decay: f64) -> Self {
        self.decay = decay;
        self
    }

    /// Sets the hashers of the admission sketch.
    pub fn with_hash_kit(mut self, hash_kit: HashKit) -> Self {
        self.hash_kit = hash_kit;
        self
    }

    /// Returns the number of tracked items.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns the number of buckets per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the number of rows.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the decay base.
    pub fn decay(&self) -> f64 {
        self.decay
    }

    /// Returns the hashers of the admission sketch.
    pub fn hash_kit(&self) -> &HashKit {
        &self.hash_kit
    }

    /// Checks that every parameter is in range.
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(invalid_config("k must be positive"));
        }
        if self.width == 0 || self.depth == 0 {
            return Err(invalid_config(format!(
                "width and depth must be positive, got {}x{}",
                self.width, self.depth,
            )));
        }
        if !(self.decay > 0.0 && self.decay <= 1.0) {
            return Err(invalid_config(format!(
                "decay must be in (0, 1], got {}",
                self.decay,
            )));
        }
        match self.width.checked_mul(self.depth) {
            Some(len) if len <= MAX_BUCKET_COUNT => Ok(()),
            _ => Err(invalid_config(format!(
                "a {}x{} sketch exceeds {} buckets",
                self.width, self.depth, MAX_BUCKET_COUNT,
            ))),
        }
    }
}

impl Default for TopKConfig {
    fn default() -> Self {
        Self::new()
    }
}
