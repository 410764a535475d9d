use crate::error::{invalid_config, Result};
use crate::hash::HashKit;
use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_CAPACITY: usize = 1024;
pub(crate) const DEFAULT_FINGERPRINT_BITS: usize = 8;
pub(crate) const DEFAULT_BUCKET_SIZE: usize = 4;
pub(crate) const DEFAULT_MAX_KICKS: usize = 500;

pub(crate) const MAX_FINGERPRINT_BITS: usize = 32;
pub(crate) const MAX_BUCKET_SIZE: usize = 255;
pub(crate) const MAX_KICKS: usize = 1 << 16;

/// Upper bound on the number of fingerprint slots of a filter.
pub(crate) const MAX_SLOT_COUNT: usize = 1 << 36;

/// Configuration of a [`CuckooFilter`](super::CuckooFilter).
///
/// Defaults to a capacity of 1024 items, 8-bit fingerprints, 4 fingerprints per bucket and 500
/// relocations before an insert gives up.
///
/// # Examples
///
/// ```
/// use probabilistic_sketches::cuckoo::CuckooConfig;
///
/// let config = CuckooConfig::new()
///     .with_capacity(100)
///     .with_fingerprint_bits(16)
///     .with_bucket_size(2);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.bucket_count(), 64);
/// ```
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct CuckooConfig {
    capacity: usize,
    fingerprint_bits: usize,
    bucket_size: usize,
    max_kicks: usize,
    hash_kit: HashKit,
}

impl CuckooConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        CuckooConfig {
            capacity: DEFAULT_CAPACITY,
            fingerprint_bits: DEFAULT_FINGERPRINT_BITS,
            bucket_size: DEFAULT_BUCKET_SIZE,
            max_kicks: DEFAULT_MAX_KICKS,
            hash_kit: HashKit::default(),
        }
    }

    /// Sets the estimated number of items the filter holds.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the number of bits per fingerprint.
    pub fn with_fingerprint_bits(mut self, fingerprint_bits: usize) -> Self {
        self.fingerprint_bits = fingerprint_bits;
        self
    }

    /// Sets the number of fingerprints per bucket.
    pub fn with_bucket_size(mut self, bucket_size: usize) -> Self {
        self.bucket_size = bucket_size;
        self
    }

    /// Sets the number of relocations attempted before an insert fails.
    pub fn with_max_kicks(mut self, max_kicks: usize) -> Self {
        self.max_kicks = max_kicks;
        self
    }

    /// Sets the hashers used to derive fingerprints and bucket indexes.
    pub fn with_hash_kit(mut self, hash_kit: HashKit) -> Self {
        self.hash_kit = hash_kit;
        self
    }

    /// Returns the requested capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of bits per fingerprint.
    pub fn fingerprint_bits(&self) -> usize {
        self.fingerprint_bits
    }

    /// Returns the number of fingerprints per bucket.
    pub fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    /// Returns the number of relocations an insert attempts before failing.
    pub fn max_kicks(&self) -> usize {
        self.max_kicks
    }

    /// Returns the hashers used to derive fingerprints and bucket indexes.
    pub fn hash_kit(&self) -> &HashKit {
        &self.hash_kit
    }

    /// Returns the number of buckets, `ceil(capacity / bucket_size)` rounded up to the next
    /// power of two, or zero if that overflows or the bucket size is zero.
    pub fn bucket_count(&self) -> usize {
        if self.bucket_size == 0 {
            return 0;
        }
        let exact = self.capacity / self.bucket_size
            + usize::from(self.capacity % self.bucket_size != 0);
        exact.checked_next_power_of_two().unwrap_or(0)
    }

    /// Checks that every parameter is in range.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(invalid_config("capacity must be positive"));
        }
        if self.fingerprint_bits == 0 || self.fingerprint_bits > MAX_FINGERPRINT_BITS {
            return Err(invalid_config(format!(
                "fingerprint bits must be in 1..={}, got {}",
                MAX_FINGERPRINT_BITS, self.fingerprint_bits,
            )));
        }
        if self.bucket_size == 0 || self.bucket_size > MAX_BUCKET_SIZE {
            return Err(invalid_config(format!(
                "bucket size must be in 1..={}, got {}",
                MAX_BUCKET_SIZE, self.bucket_size,
            )));
        }
        if self.max_kicks == 0 || self.max_kicks > MAX_KICKS {
            return Err(invalid_config(format!(
                "max kicks must be in 1..={}, got {}",
                MAX_KICKS, self.max_kicks,
            )));
        }
        let slot_count = self.bucket_count().checked_mul(self.bucket_size);
        match slot_count {
            Some(slot_count) if slot_count > 0 && slot_count <= MAX_SLOT_COUNT => Ok(()),
            _ => Err(invalid_config(format!(
                "a capacity of {} needs more than {} slots",
                self.capacity, MAX_SLOT_COUNT,
            ))),
        }
    }
}

impl Default for CuckooConfig {
    fn default() -> Self {
        Self::new()
    }
}
