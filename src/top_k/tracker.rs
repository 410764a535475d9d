use crate::codec;
use crate::error::{corrupt_state, invalid_config, Error, Result};
use crate::hash::{mix64, HashIter};
use crate::structure::{Merge, Sketch, StructureKind};
use crate::top_k::heavy_keeper::HeavyKeeper;
use crate::top_k::{TopKConfig, TopKInfo};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
struct Slot {
    item: Vec<u8>,
    count: u64,
    admitted_at: u64,
}

/// A tracker of the `k` most frequent items of a stream.
///
/// Every increment first goes through a HeavyKeeper admission sketch, which estimates the
/// frequency of items that are not tracked. An untracked item is admitted while fewer than `k`
/// items are tracked. Once the tracker is full, it only displaces the tracked item with the
/// smallest count when its estimate is larger, so a single occurrence of a rare item cannot
/// evict a frequent one. Of several tracked items with the smallest count, the one admitted
/// first is evicted.
///
/// # Examples
///
/// ```
/// use probabilistic_sketches::top_k::TopK;
///
/// let mut top_k = TopK::create(2, 64, 4, 0.9).unwrap();
///
/// top_k.incr_by("foo", 10).unwrap();
/// top_k.incr_by("bar", 5).unwrap();
/// assert_eq!(top_k.incr_by("baz", 20), Ok(Some(b"bar".to_vec())));
///
/// assert_eq!(top_k.list(), vec![b"baz".to_vec(), b"foo".to_vec()]);
/// assert_eq!(top_k.query("foo"), Some(10));
/// assert_eq!(top_k.query("bar"), None);
/// ```
#[derive(Clone, Debug)]
pub struct TopK<R = XorShiftRng> {
    config: TopKConfig,
    sketch: HeavyKeeper,
    slots: Vec<Slot>,
    index: HashMap<Vec<u8>, usize>,
    next_sequence: u64,
    rng: R,
}

#[derive(Serialize)]
struct TopKStateRef<'a> {
    config: &'a TopKConfig,
    sketch: &'a HeavyKeeper,
    slots: &'a [Slot],
    next_sequence: u64,
}

#[derive(Deserialize)]
struct TopKState {
    config: TopKConfig,
    sketch: HeavyKeeper,
    slots: Vec<Slot>,
    next_sequence: u64,
}

fn build_index(slots: &[Slot]) -> HashMap<Vec<u8>, usize> {
    slots
        .iter()
        .enumerate()
        .map(|(position, slot)| (slot.item.clone(), position))
        .collect()
}

impl TopK {
    /// Constructs a new, empty `TopK` tracking `k` items, with an admission sketch of `depth`
    /// rows of `width` buckets decaying with base `decay`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `k`, `width` or `depth` is zero, or `decay` is not in
    /// `(0, 1]`.
    pub fn create(k: usize, width: usize, depth: usize, decay: f64) -> Result<Self> {
        Self::with_config(
            TopKConfig::new()
                .with_k(k)
                .with_width(width)
                .with_depth(depth)
                .with_decay(decay),
        )
    }

    /// Constructs a new, empty `TopK` from a configuration, with an entropy-seeded random number
    /// generator.
    pub fn with_config(config: TopKConfig) -> Result<Self> {
        Self::with_rng(config, XorShiftRng::from_entropy())
    }
}

impl<R> TopK<R>
where
    R: Rng,
{
    /// Constructs a new, empty `TopK` from a configuration and the random number generator
    /// driving the decay of the admission sketch.
    pub fn with_rng(config: TopKConfig, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(TopK {
            sketch: HeavyKeeper::new(config.width(), config.depth(), config.decay()),
            config,
            slots: Vec::new(),
            index: HashMap::new(),
            next_sequence: 0,
            rng,
        })
    }

    /// Adds `delta` occurrences of `item`, returning the item it expelled from the tracked set,
    /// if any.
    ///
    /// A tracked item's count grows by `delta`. An untracked item is admitted with a count equal
    /// to the sketch estimate after the increment, which may be zero if every bucket of the item
    /// is held by another one. An increment of zero changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `delta` is negative. The tracker is unchanged in that
    /// case.
    pub fn incr_by(&mut self, item: impl AsRef<[u8]>, delta: i64) -> Result<Option<Vec<u8>>> {
        if delta < 0 {
            return Err(invalid_config(format!(
                "increment must not be negative, got {}",
                delta,
            )));
        }
        if delta == 0 {
            return Ok(None);
        }
        let item = item.as_ref();
        let delta = delta as u64;
        let hash_iter = self.config.hash_kit().hash_iter(item);
        let estimate = self.sketch.incr_by(
            hash_iter,
            Self::fingerprint(hash_iter),
            delta,
            &mut self.rng,
        );

        if let Some(&position) = self.index.get(item) {
            let slot = &mut self.slots[position];
            slot.count = slot.count.saturating_add(delta);
            return Ok(None);
        }

        let count = estimate;
        if self.slots.len() < self.config.k() {
            self.index.insert(item.to_vec(), self.slots.len());
            let slot = self.new_slot(item.to_vec(), count);
            self.slots.push(slot);
            return Ok(None);
        }

        let (position, min_count) = match self
            .slots
            .iter()
            .enumerate()
            .min_by_key(|(_, slot)| (slot.count, slot.admitted_at))
        {
            Some((position, slot)) => (position, slot.count),
            None => return Ok(None),
        };
        if count <= min_count {
            return Ok(None);
        }

        let slot = self.new_slot(item.to_vec(), count);
        let expelled = std::mem::replace(&mut self.slots[position], slot);
        self.index.remove(&expelled.item);
        self.index.insert(item.to_vec(), position);
        tracing::trace!(
            expelled_count = expelled.count,
            admitted_count = count,
            "top-k evicted its minimum"
        );
        Ok(Some(expelled.item))
    }

    /// Adds a single occurrence of `item`.
    pub fn add(&mut self, item: impl AsRef<[u8]>) -> Option<Vec<u8>> {
        self.incr_by(item, 1).ok().flatten()
    }

    /// Merges `other` into this tracker. Admission sketches are combined bucket by bucket, tracked
    /// items present in both trackers add up their counts, and the `k` largest counts are kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] unless both trackers share a configuration.
    pub fn merge<S>(&mut self, other: &TopK<S>) -> Result<()> {
        if self.config != other.config {
            return Err(Error::DimensionMismatch(
                "top-k trackers have different configurations".to_string(),
            ));
        }

        let sketch = self.sketch.merged(&other.sketch);
        let mut slots = self.slots.clone();
        let mut index = self.index.clone();
        let mut next_sequence = self.next_sequence;
        let mut incoming: Vec<&Slot> = other.slots.iter().collect();
        incoming.sort_by_key(|slot| slot.admitted_at);
        for slot in incoming {
            match index.get(&slot.item) {
                Some(&position) => {
                    slots[position].count = slots[position].count.saturating_add(slot.count);
                }
                None => {
                    index.insert(slot.item.clone(), slots.len());
                    slots.push(Slot {
                        item: slot.item.clone(),
                        count: slot.count,
                        admitted_at: next_sequence,
                    });
                    next_sequence += 1;
                }
            }
        }
        if slots.len() > self.config.k() {
            slots.sort_by_key(|slot| (Reverse(slot.count), slot.admitted_at));
            slots.truncate(self.config.k());
            index = build_index(&slots);
        }

        self.sketch = sketch;
        self.slots = slots;
        self.index = index;
        self.next_sequence = next_sequence;
        tracing::debug!(tracked = self.slots.len(), "merged top-k trackers");
        Ok(())
    }
}

impl<R> TopK<R> {
    fn fingerprint(mut hash_iter: HashIter) -> u32 {
        let hash = hash_iter.next().unwrap_or_default();
        (mix64(hash) >> 32) as u32
    }

    fn new_slot(&mut self, item: Vec<u8>, count: u64) -> Slot {
        let admitted_at = self.next_sequence;
        self.next_sequence += 1;
        Slot {
            item,
            count,
            admitted_at,
        }
    }

    fn sorted_slots(&self) -> Vec<&Slot> {
        let mut slots: Vec<&Slot> = self.slots.iter().collect();
        slots.sort_by_key(|slot| (Reverse(slot.count), slot.admitted_at));
        slots
    }

    /// Returns the count of `item` if it is tracked, or `None` if it is not in the top `k`.
    pub fn query(&self, item: impl AsRef<[u8]>) -> Option<u64> {
        self.index
            .get(item.as_ref())
            .map(|&position| self.slots[position].count)
    }

    /// Returns the admission sketch's estimate of the number of occurrences of `item`, whether
    /// it is tracked or not.
    pub fn count(&self, item: impl AsRef<[u8]>) -> u64 {
        let hash_iter = self.config.hash_kit().hash_iter(item.as_ref());
        self.sketch.query(hash_iter, Self::fingerprint(hash_iter))
    }

    /// Returns the tracked items by descending count. Items with equal counts are ordered by
    /// admission, earliest first.
    pub fn list(&self) -> Vec<Vec<u8>> {
        self.sorted_slots()
            .into_iter()
            .map(|slot| slot.item.clone())
            .collect()
    }

    /// Returns the tracked items and their counts, ordered as [`TopK::list`].
    pub fn list_with_count(&self) -> Vec<(Vec<u8>, u64)> {
        self.sorted_slots()
            .into_iter()
            .map(|slot| (slot.item.clone(), slot.count))
            .collect()
    }

    /// Forgets every tracked item and resets the admission sketch.
    pub fn clear(&mut self) {
        self.sketch.clear();
        self.slots.clear();
        self.index.clear();
        self.next_sequence = 0;
    }

    /// Returns the number of tracked items.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no item is tracked.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the configuration of the tracker.
    pub fn config(&self) -> &TopKConfig {
        &self.config
    }

    /// Returns a diagnostic snapshot of the tracker.
    pub fn info(&self) -> TopKInfo {
        TopKInfo {
            k: self.config.k(),
            width: self.config.width(),
            depth: self.config.depth(),
            decay: self.config.decay(),
            tracked: self.slots.len(),
            size_in_bytes: self.sketch.size_in_bytes()
                + self.slots.iter().map(|slot| slot.item.len()).sum::<usize>(),
        }
    }

    /// Decodes a tracker produced by [`Sketch::to_bytes`], using `rng` for future decays.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptState`] if the buffer is not a valid Top-K tracker.
    pub fn from_bytes_with_rng(bytes: &[u8], rng: R) -> Result<Self> {
        let state: TopKState = codec::decode(StructureKind::TopK, bytes)?;
        let config = state.config;
        config
            .validate()
            .map_err(|err| corrupt_state(err.to_string()))?;
        state
            .sketch
            .validate(config.width(), config.depth(), config.decay())?;
        if state.slots.len() > config.k() {
            return Err(corrupt_state(format!(
                "top-k tracker of {} holds {} items",
                config.k(),
                state.slots.len(),
            )));
        }
        if state
            .slots
            .iter()
            .any(|slot| slot.admitted_at >= state.next_sequence)
        {
            return Err(corrupt_state("top-k slot admitted in the future"));
        }
        let index = build_index(&state.slots);
        if index.len() != state.slots.len() {
            return Err(corrupt_state("top-k tracker holds duplicate items"));
        }
        Ok(TopK {
            config,
            sketch: state.sketch,
            slots: state.slots,
            index,
            next_sequence: state.next_sequence,
            rng,
        })
    }
}

impl<R> PartialEq for TopK<R> {
    fn eq(&self, other: &TopK<R>) -> bool {
        self.config == other.config
            && self.sketch == other.sketch
            && self.slots == other.slots
            && self.next_sequence == other.next_sequence
    }
}

impl<R> Sketch for TopK<R>
where
    R: Rng + SeedableRng,
{
    const KIND: StructureKind = StructureKind::TopK;

    fn to_bytes(&self) -> Result<Vec<u8>> {
        codec::encode(
            Self::KIND,
            &TopKStateRef {
                config: &self.config,
                sketch: &self.sketch,
                slots: &self.slots,
                next_sequence: self.next_sequence,
            },
        )
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_with_rng(bytes, R::from_entropy())
    }
}

impl<R> Merge for TopK<R>
where
    R: Rng,
{
    fn merge_from(&mut self, other: &Self) -> Result<()> {
        self.merge(other)
    }
}
