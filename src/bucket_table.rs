//! Bucketed table of bit-packed fingerprints.

use crate::error::{corrupt_state, Result};
use serde::{Deserialize, Serialize};
use std::mem;

const BLOCK_BIT_COUNT: usize = mem::size_of::<u64>() * 8;

/// A table of `bucket_len` buckets, each holding `entries_per_bucket` fingerprints of
/// `fingerprint_bit_count` bits. Fingerprints are packed back to back into 64-bit blocks and may
/// straddle two blocks. A fingerprint of zero marks an empty slot.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct BucketTable {
    blocks: Vec<u64>,
    fingerprint_bit_count: usize,
    bucket_len: usize,
    entries_per_bucket: usize,
    occupied_len: usize,
}

impl BucketTable {
    #[inline]
    fn get_block_count(bit_count: usize, len: usize) -> usize {
        (bit_count * len + BLOCK_BIT_COUNT - 1) / BLOCK_BIT_COUNT
    }

    #[inline]
    fn get_mask(size: usize) -> u64 {
        if size == 64 {
            !0
        } else {
            (1u64 << size) - 1
        }
    }

    /// Constructs a table of `bucket_len` empty buckets of `entries_per_bucket` slots, each
    /// holding a fingerprint of `fingerprint_bit_count` bits.
    pub fn new(fingerprint_bit_count: usize, bucket_len: usize, entries_per_bucket: usize) -> Self {
        let len = bucket_len * entries_per_bucket;
        BucketTable {
            blocks: vec![0; Self::get_block_count(fingerprint_bit_count, len)],
            fingerprint_bit_count,
            bucket_len,
            entries_per_bucket,
            occupied_len: 0,
        }
    }

    #[inline]
    fn get_index(&self, bucket: usize, entry: usize) -> usize {
        assert!(bucket < self.bucket_len && entry < self.entries_per_bucket);
        bucket * self.entries_per_bucket + entry
    }

    /// Returns the fingerprint stored at `entry` of `bucket`.
    pub fn get(&self, bucket: usize, entry: usize) -> u64 {
        let bit_offset = self.get_index(bucket, entry) * self.fingerprint_bit_count;
        let block_index = bit_offset / BLOCK_BIT_COUNT;
        let bit_index = bit_offset % BLOCK_BIT_COUNT;
        let mut fingerprint =
            (self.blocks[block_index] >> bit_index) & Self::get_mask(self.fingerprint_bit_count);
        let bits_left = (bit_index + self.fingerprint_bit_count).saturating_sub(BLOCK_BIT_COUNT);
        if bits_left > 0 {
            let offset = self.fingerprint_bit_count - bits_left;
            fingerprint |= (self.blocks[block_index + 1] & Self::get_mask(bits_left)) << offset;
        }
        fingerprint
    }

    /// Stores `fingerprint` at `entry` of `bucket` and returns the fingerprint it replaced.
    pub fn set(&mut self, bucket: usize, entry: usize, fingerprint: u64) -> u64 {
        let prev = self.get(bucket, entry);
        let fingerprint = fingerprint & Self::get_mask(self.fingerprint_bit_count);
        let bit_offset = self.get_index(bucket, entry) * self.fingerprint_bit_count;
        let block_index = bit_offset / BLOCK_BIT_COUNT;
        let bit_index = bit_offset % BLOCK_BIT_COUNT;
        self.blocks[block_index] &= !(Self::get_mask(self.fingerprint_bit_count) << bit_index);
        self.blocks[block_index] |= fingerprint << bit_index;
        let bits_left = (bit_index + self.fingerprint_bit_count).saturating_sub(BLOCK_BIT_COUNT);
        if bits_left > 0 {
            let offset = self.fingerprint_bit_count - bits_left;
            self.blocks[block_index + 1] &= !Self::get_mask(bits_left);
            self.blocks[block_index + 1] |= fingerprint >> offset;
        }
        match (prev == 0, fingerprint == 0) {
            (true, false) => self.occupied_len += 1,
            (false, true) => self.occupied_len -= 1,
            _ => {}
        }
        prev
    }

    /// Stores `fingerprint` in the first empty entry of `bucket`, returning the entry used.
    pub fn insert(&mut self, bucket: usize, fingerprint: u64) -> Option<usize> {
        let entry = (0..self.entries_per_bucket).find(|entry| self.get(bucket, *entry) == 0)?;
        self.set(bucket, entry, fingerprint);
        Some(entry)
    }

    /// Clears the first entry of `bucket` holding `fingerprint`.
    pub fn remove(&mut self, bucket: usize, fingerprint: u64) -> bool {
        match (0..self.entries_per_bucket).find(|entry| self.get(bucket, *entry) == fingerprint) {
            Some(entry) => {
                self.set(bucket, entry, 0);
                true
            }
            None => false,
        }
    }

    /// Returns `true` if `bucket` holds `fingerprint`.
    pub fn contains(&self, bucket: usize, fingerprint: u64) -> bool {
        (0..self.entries_per_bucket).any(|entry| self.get(bucket, entry) == fingerprint)
    }

    /// Returns the number of entries of `bucket` holding `fingerprint`.
    pub fn count(&self, bucket: usize, fingerprint: u64) -> usize {
        (0..self.entries_per_bucket)
            .filter(|entry| self.get(bucket, *entry) == fingerprint)
            .count()
    }

    /// Returns an iterator over `(bucket, fingerprint)` for every occupied entry.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        (0..self.bucket_len).flat_map(move |bucket| {
            (0..self.entries_per_bucket)
                .map(move |entry| (bucket, self.get(bucket, entry)))
                .filter(|(_, fingerprint)| *fingerprint != 0)
        })
    }

    /// Empties every slot.
    pub fn clear(&mut self) {
        for block in &mut self.blocks {
            *block = 0;
        }
        self.occupied_len = 0;
    }

    /// Returns the number of buckets.
    pub fn bucket_len(&self) -> usize {
        self.bucket_len
    }

    /// Returns the number of slots per bucket.
    pub fn entries_per_bucket(&self) -> usize {
        self.entries_per_bucket
    }

    /// Returns the number of bits per fingerprint.
    pub fn fingerprint_bit_count(&self) -> usize {
        self.fingerprint_bit_count
    }

    /// Returns the total number of entries.
    pub fn capacity(&self) -> usize {
        self.bucket_len * self.entries_per_bucket
    }

    /// Returns the number of non-empty entries.
    pub fn occupied_len(&self) -> usize {
        self.occupied_len
    }

    /// Returns the memory used by the packed slots.
    pub fn size_in_bytes(&self) -> usize {
        self.blocks.len() * mem::size_of::<u64>()
    }

    /// Checks the invariants of a decoded `BucketTable`.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.fingerprint_bit_count == 0 || self.fingerprint_bit_count > 64 {
            return Err(corrupt_state(format!(
                "fingerprint width of {} bits",
                self.fingerprint_bit_count,
            )));
        }
        let len = self
            .bucket_len
            .checked_mul(self.entries_per_bucket)
            .ok_or_else(|| corrupt_state("bucket table size overflows"))?;
        let expected_blocks = len
            .checked_mul(self.fingerprint_bit_count)
            .map(|bits| (bits + BLOCK_BIT_COUNT - 1) / BLOCK_BIT_COUNT)
            .ok_or_else(|| corrupt_state("bucket table size overflows"))?;
        if self.blocks.len() != expected_blocks {
            return Err(corrupt_state(format!(
                "bucket table of {} entries has {} blocks",
                len,
                self.blocks.len(),
            )));
        }
        if self.occupied().count() != self.occupied_len {
            return Err(corrupt_state("bucket table occupancy does not match its entries"));
        }
        Ok(())
    }
}
