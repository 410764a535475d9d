//! Admission sketch of the Top-K tracker.

use crate::error::{corrupt_state, Result};
use crate::hash::HashIter;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
struct Bucket {
    fingerprint: u32,
    count: u64,
}

/// A grid of `depth` rows of `width` `(fingerprint, count)` buckets.
///
/// An increment either adds to a bucket that is empty or already holds the item's fingerprint, or
/// decays a bucket held by another item: each unit of the increment decrements the count with
/// probability `decay^count`, and the item takes the bucket over once the count reaches zero.
/// Large counts are practically never decayed, so frequent items keep their buckets. With a decay
/// of 1 every unit decrements, and the update is applied in one step.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub(crate) struct HeavyKeeper {
    width: usize,
    depth: usize,
    decay: f64,
    buckets: Vec<Bucket>,
}

/// Samples the number of trials up to and including the first success of a Bernoulli process
/// with success probability `probability`.
fn trials_until_success<R: Rng>(rng: &mut R, probability: f64) -> f64 {
    if probability >= 1.0 {
        return 1.0;
    }
    if probability <= 0.0 {
        return f64::INFINITY;
    }
    let sample: f64 = rng.gen();
    ((-sample).ln_1p() / (-probability).ln_1p())
        .ceil()
        .max(1.0)
}

impl HeavyKeeper {
    pub(crate) fn new(width: usize, depth: usize, decay: f64) -> Self {
        HeavyKeeper {
            width,
            depth,
            decay,
            buckets: vec![Bucket::default(); width * depth],
        }
    }

    fn offsets(&self, hash_iter: HashIter) -> impl Iterator<Item = usize> {
        let width = self.width;
        hash_iter
            .take(self.depth)
            .enumerate()
            .map(move |(row, hash)| row * width + (hash % width as u64) as usize)
    }

    fn update<R: Rng>(bucket: &mut Bucket, fingerprint: u32, delta: u64, decay: f64, rng: &mut R) {
        if bucket.count == 0 {
            bucket.fingerprint = fingerprint;
            bucket.count = delta;
            return;
        }
        if bucket.fingerprint == fingerprint {
            bucket.count = bucket.count.saturating_add(delta);
            return;
        }

        let mut remaining = delta;
        while remaining > 0 {
            let probability = decay.powf(bucket.count as f64);
            // every unit decays
            if probability >= 1.0 {
                if remaining < bucket.count {
                    bucket.count -= remaining;
                } else {
                    bucket.fingerprint = fingerprint;
                    bucket.count = remaining - bucket.count + 1;
                }
                return;
            }
            // infinite once the probability underflows
            let trials = trials_until_success(rng, probability);
            if trials > remaining as f64 {
                return;
            }
            remaining -= trials as u64;
            bucket.count -= 1;
            if bucket.count == 0 {
                bucket.fingerprint = fingerprint;
                bucket.count = remaining + 1;
                return;
            }
        }
    }

    /// Adds `delta` occurrences of an item and returns its estimate afterwards.
    pub(crate) fn incr_by<R: Rng>(
        &mut self,
        hash_iter: HashIter,
        fingerprint: u32,
        delta: u64,
        rng: &mut R,
    ) -> u64 {
        let decay = self.decay;
        let mut estimate = 0;
        for offset in self.offsets(hash_iter) {
            let bucket = &mut self.buckets[offset];
            Self::update(bucket, fingerprint, delta, decay, rng);
            if bucket.fingerprint == fingerprint {
                estimate = estimate.max(bucket.count);
            }
        }
        estimate
    }

    /// Returns the largest count among the buckets holding the item's fingerprint.
    pub(crate) fn query(&self, hash_iter: HashIter, fingerprint: u32) -> u64 {
        self.offsets(hash_iter)
            .map(|offset| self.buckets[offset])
            .filter(|bucket| bucket.count > 0 && bucket.fingerprint == fingerprint)
            .map(|bucket| bucket.count)
            .max()
            .unwrap_or(0)
    }

    /// Combines the buckets of two sketches of equal dimensions. Buckets holding the same
    /// fingerprint add up, and of two different fingerprints the one with the larger count wins.
    pub(crate) fn merged(&self, other: &HeavyKeeper) -> HeavyKeeper {
        let buckets = self
            .buckets
            .iter()
            .zip(&other.buckets)
            .map(|(bucket, other_bucket)| {
                if other_bucket.count == 0 {
                    *bucket
                } else if bucket.count == 0 {
                    *other_bucket
                } else if bucket.fingerprint == other_bucket.fingerprint {
                    Bucket {
                        fingerprint: bucket.fingerprint,
                        count: bucket.count.saturating_add(other_bucket.count),
                    }
                } else if bucket.count >= other_bucket.count {
                    *bucket
                } else {
                    *other_bucket
                }
            })
            .collect();
        HeavyKeeper {
            width: self.width,
            depth: self.depth,
            decay: self.decay,
            buckets,
        }
    }

    pub(crate) fn clear(&mut self) {
        for bucket in &mut self.buckets {
            *bucket = Bucket::default();
        }
    }

    pub(crate) fn size_in_bytes(&self) -> usize {
        self.buckets.len() * std::mem::size_of::<Bucket>()
    }

    pub(crate) fn validate(&self, width: usize, depth: usize, decay: f64) -> Result<()> {
        if self.width != width || self.depth != depth || self.decay != decay {
            return Err(corrupt_state("admission sketch does not match its configuration"));
        }
        if width.checked_mul(depth) != Some(self.buckets.len()) {
            return Err(corrupt_state(format!(
                "admission sketch of {}x{} has {} buckets",
                width,
                depth,
                self.buckets.len(),
            )));
        }
        Ok(())
    }
}
