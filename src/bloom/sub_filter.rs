use crate::bit_vec::BitVec;
use crate::bloom::config::{optimal_bit_count, optimal_hasher_count};
use crate::error::{corrupt_state, Result};
use crate::hash::HashIter;
use serde::{Deserialize, Serialize};

/// A single fixed-size bloom filter inside a [`BloomFilter`](super::BloomFilter).
///
/// At its core, a sub-filter is a bit array, initially all set to zero. `K` hash values map each
/// element to `K` bits in the bit array. An element definitely does not exist in the sub-filter
/// if any of the `K` bits are unset. The bit count and hash count are derived once from the
/// capacity and false positive probability and never change afterwards.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SubFilter {
    bit_vec: BitVec,
    hasher_count: usize,
    capacity: usize,
    error_rate: f64,
}

impl SubFilter {
    pub(crate) fn new(capacity: usize, error_rate: f64) -> Self {
        let bit_count = optimal_bit_count(capacity, error_rate);
        SubFilter {
            bit_vec: BitVec::new(bit_count),
            hasher_count: optimal_hasher_count(bit_count, capacity),
            capacity,
            error_rate,
        }
    }

    /// Sets the bits of an item, returning `true` if at least one of them was unset.
    pub(crate) fn insert(&mut self, hash_iter: HashIter) -> bool {
        let len = self.bit_vec.len() as u64;
        let mut inserted = false;
        for hash in hash_iter.take(self.hasher_count) {
            inserted |= !self.bit_vec.set((hash % len) as usize);
        }
        inserted
    }

    pub(crate) fn contains(&self, hash_iter: HashIter) -> bool {
        let len = self.bit_vec.len() as u64;
        hash_iter
            .take(self.hasher_count)
            .all(|hash| self.bit_vec[(hash % len) as usize])
    }

    pub(crate) fn union(&mut self, other: &SubFilter) {
        self.bit_vec.union(&other.bit_vec);
    }

    pub(crate) fn clear(&mut self) {
        self.bit_vec.clear();
    }

    pub(crate) fn is_compatible(&self, other: &SubFilter) -> bool {
        self.bit_vec.len() == other.bit_vec.len()
            && self.hasher_count == other.hasher_count
            && self.capacity == other.capacity
    }

    /// Returns the number of bits.
    pub fn len(&self) -> usize {
        self.bit_vec.len()
    }

    /// Returns `true` if the sub-filter has no bits.
    pub fn is_empty(&self) -> bool {
        self.bit_vec.is_empty()
    }

    /// Returns the number of hash values used per item.
    pub fn hasher_count(&self) -> usize {
        self.hasher_count
    }

    /// Returns the number of items this sub-filter was sized for.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the false positive probability this sub-filter was sized for.
    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    /// Returns the number of set bits.
    pub fn count_ones(&self) -> usize {
        self.bit_vec.count_ones()
    }

    /// Returns the memory used by the bit array.
    pub fn size_in_bytes(&self) -> usize {
        self.bit_vec.size_in_bytes()
    }

    /// Returns the fraction of set bits.
    pub fn fill_ratio(&self) -> f64 {
        self.bit_vec.count_ones() as f64 / self.bit_vec.len() as f64
    }

    /// Returns the fill ratio expected once `capacity` distinct items have been inserted,
    /// `1 - e^(-k * n / m)`.
    pub fn target_load(&self) -> f64 {
        let exponent = -(self.hasher_count as f64) * (self.capacity as f64) / (self.len() as f64);
        1.0 - exponent.exp()
    }

    /// Returns the estimated false positive probability. This value increases as items are
    /// added.
    pub fn estimated_fpp(&self) -> f64 {
        self.fill_ratio().powi(self.hasher_count as i32)
    }

    /// Estimates the number of distinct items inserted, `-m / k * ln(1 - X / m)`.
    pub fn estimated_cardinality(&self) -> f64 {
        let len = self.len() as f64;
        let zeros = self.bit_vec.count_zeros();
        if zeros == 0 {
            // Saturated; report the estimate for a single unset bit.
            return len / self.hasher_count as f64 * len.ln();
        }
        -len / self.hasher_count as f64 * (zeros as f64 / len).ln()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.bit_vec.validate()?;
        if self.bit_vec.is_empty() || self.hasher_count == 0 || self.capacity == 0 {
            return Err(corrupt_state("sub-filter has a zero dimension"));
        }
        if !(self.error_rate > 0.0 && self.error_rate < 1.0) {
            return Err(corrupt_state("sub-filter error rate out of range"));
        }
        let bit_count = optimal_bit_count(self.capacity, self.error_rate);
        let hasher_count = optimal_hasher_count(bit_count, self.capacity);
        if self.bit_vec.len() != bit_count || self.hasher_count != hasher_count {
            return Err(corrupt_state(format!(
                "sub-filter of {} bits and {} hashers does not match a capacity of {} at an \
                 error rate of {}",
                self.bit_vec.len(),
                self.hasher_count,
                self.capacity,
                self.error_rate,
            )));
        }
        Ok(())
    }
}
