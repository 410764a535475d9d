use crate::error::{invalid_config, Result};
use crate::hash::HashKit;
use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_CAPACITY: usize = 100;
pub(crate) const DEFAULT_ERROR_RATE: f64 = 0.01;
pub(crate) const DEFAULT_EXPANSION: u32 = 2;
pub(crate) const DEFAULT_TIGHTENING_RATIO: f64 = 0.5;

/// Upper bound on the number of bits of a single sub-filter.
pub(crate) const MAX_BIT_COUNT: usize = 1 << 40;

/// Configuration of a [`BloomFilter`](super::BloomFilter).
///
/// Defaults to a capacity of 100 items, an error rate of 1%, and scaling enabled with an
/// expansion of 2 and a tightening ratio of 0.5.
///
/// # Examples
///
/// ```
/// use probabilistic_sketches::bloom::BloomConfig;
///
/// let config = BloomConfig::new()
///     .with_capacity(1_000)
///     .with_error_rate(0.001)
///     .non_scaling();
///
/// assert!(config.validate().is_ok());
/// assert!(!config.is_scaling());
/// ```
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct BloomConfig {
    capacity: usize,
    error_rate: f64,
    expansion: u32,
    scaling: bool,
    tightening_ratio: f64,
    hash_kit: HashKit,
}

impl BloomConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        BloomConfig {
            capacity: DEFAULT_CAPACITY,
            error_rate: DEFAULT_ERROR_RATE,
            expansion: DEFAULT_EXPANSION,
            scaling: true,
            tightening_ratio: DEFAULT_TIGHTENING_RATIO,
            hash_kit: HashKit::default(),
        }
    }

    /// Sets the number of items the first sub-filter is sized for.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the target false positive probability of the first sub-filter.
    pub fn with_error_rate(mut self, error_rate: f64) -> Self {
        self.error_rate = error_rate;
        self
    }

    /// Sets the factor by which each new sub-filter's capacity grows. Enables scaling.
    pub fn with_expansion(mut self, expansion: u32) -> Self {
        self.expansion = expansion;
        self.scaling = true;
        self
    }

    /// Sets the factor applied to the error rate of each new sub-filter.
    pub fn with_tightening_ratio(mut self, tightening_ratio: f64) -> Self {
        self.tightening_ratio = tightening_ratio;
        self
    }

    /// Disables scaling: the filter keeps a single sub-filter that saturates past capacity.
    pub fn non_scaling(mut self) -> Self {
        self.scaling = false;
        self
    }

    /// Sets the hashers shared by every sub-filter.
    pub fn with_hash_kit(mut self, hash_kit: HashKit) -> Self {
        self.hash_kit = hash_kit;
        self
    }

    /// Returns the capacity of the first sub-filter.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the false positive probability of the first sub-filter.
    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    /// Returns the capacity growth factor between consecutive sub-filters.
    pub fn expansion(&self) -> u32 {
        self.expansion
    }

    /// Returns `true` if the filter appends sub-filters once full.
    pub fn is_scaling(&self) -> bool {
        self.scaling
    }

    /// Returns the error rate ratio between consecutive sub-filters.
    pub fn tightening_ratio(&self) -> f64 {
        self.tightening_ratio
    }

    /// Returns the hashers shared by every sub-filter.
    pub fn hash_kit(&self) -> &HashKit {
        &self.hash_kit
    }

    /// Checks that every parameter is in range.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(invalid_config("capacity must be positive"));
        }
        if !(self.error_rate > 0.0 && self.error_rate < 1.0) {
            return Err(invalid_config(format!(
                "error rate must be in (0, 1), got {}",
                self.error_rate,
            )));
        }
        if self.scaling && self.expansion < 1 {
            return Err(invalid_config("expansion must be at least 1"));
        }
        if !(self.tightening_ratio > 0.0 && self.tightening_ratio < 1.0) {
            return Err(invalid_config(format!(
                "tightening ratio must be in (0, 1), got {}",
                self.tightening_ratio,
            )));
        }
        if optimal_bit_count(self.capacity, self.error_rate) > MAX_BIT_COUNT {
            return Err(invalid_config(format!(
                "a capacity of {} at an error rate of {} needs more than {} bits",
                self.capacity, self.error_rate, MAX_BIT_COUNT,
            )));
        }
        Ok(())
    }
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// `m = ceil(-n * ln(p) / ln(2)^2)`
pub(crate) fn optimal_bit_count(capacity: usize, error_rate: f64) -> usize {
    let bit_count = -(capacity as f64) * error_rate.ln() / (2f64.ln() * 2f64.ln());
    bit_count.ceil().max(1.0) as usize
}

/// `k = round(m / n * ln(2))`, at least one.
pub(crate) fn optimal_hasher_count(bit_count: usize, capacity: usize) -> usize {
    let hasher_count = (bit_count as f64) / (capacity as f64) * 2f64.ln();
    hasher_count.round().max(1.0) as usize
}
