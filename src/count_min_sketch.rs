//! Space-efficient probabilistic data structure for estimating the number of item occurrences.

use crate::codec;
use crate::error::{corrupt_state, invalid_config, Error, Result};
use crate::hash::{HashIter, HashKit};
use crate::structure::{Merge, Sketch, StructureKind};
use serde::{Deserialize, Serialize};
use std::f64::consts::E;
use std::mem;

/// Upper bound on the number of counters of a sketch.
const MAX_COUNTER_COUNT: usize = 1 << 32;

/// A space-efficient probabilistic data structure that serves as a frequency table of events in a
/// stream of data.
///
/// `CountMinSketch` hashes every item to one column in each of `depth` rows of `width` counters.
/// An increment adds to every hashed counter, and a query returns the minimum of them. Collisions
/// only ever add to a counter, so the estimate never falls below the true count, and with
/// probability `1 - δ` exceeds it by at most `ε` times the total count.
///
/// # Examples
///
/// ```
/// use probabilistic_sketches::count_min_sketch::CountMinSketch;
///
/// let mut sketch = CountMinSketch::create_by_prob(0.01, 0.01).unwrap();
///
/// assert_eq!(sketch.incr_by("foo", 3), Ok(3));
/// assert_eq!(sketch.incr_by("bar", 5), Ok(5));
/// assert_eq!(sketch.query("foo"), 3);
/// assert_eq!(sketch.query("baz"), 0);
///
/// assert_eq!(sketch.width(), 272);
/// assert_eq!(sketch.depth(), 5);
/// assert_eq!(sketch.total_count(), 8);
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CountMinSketch {
    width: usize,
    depth: usize,
    total_count: u64,
    grid: Vec<u64>,
    hash_kit: HashKit,
}

/// Diagnostic snapshot of a [`CountMinSketch`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CountMinInfo {
    /// Number of counters per row.
    pub width: usize,
    /// Number of rows.
    pub depth: usize,
    /// Sum of every increment.
    pub total_count: u64,
    /// Overestimate bound as a fraction of the total count.
    pub error: f64,
    /// Probability that an estimate is within the bound.
    pub confidence: f64,
    /// Memory used by the counters.
    pub size_in_bytes: usize,
}

impl CountMinSketch {
    /// Constructs a new, empty `CountMinSketch` whose estimates exceed the true count by at most
    /// `error_rate` times the total count, with probability at least `1 - probability`.
    ///
    /// `width = ceil(e / error_rate)` and `depth = ceil(ln(1 / probability))`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if either parameter is not in `(0, 1)`.
    pub fn create_by_prob(error_rate: f64, probability: f64) -> Result<Self> {
        if !(error_rate > 0.0 && error_rate < 1.0) {
            return Err(invalid_config(format!(
                "error rate must be in (0, 1), got {}",
                error_rate,
            )));
        }
        if !(probability > 0.0 && probability < 1.0) {
            return Err(invalid_config(format!(
                "probability must be in (0, 1), got {}",
                probability,
            )));
        }
        let width = (E / error_rate).ceil() as usize;
        let depth = (1.0 / probability).ln().ceil().max(1.0) as usize;
        Self::create_by_dim(width, depth)
    }

    /// Constructs a new, empty `CountMinSketch` with `depth` rows of `width` counters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if either dimension is zero or the sketch is too large.
    pub fn create_by_dim(width: usize, depth: usize) -> Result<Self> {
        Self::with_hash_kit(width, depth, HashKit::default())
    }

    /// Constructs a new, empty `CountMinSketch` with `depth` rows of `width` counters hashed by
    /// `hash_kit`. Only sketches with equal hash kits can be merged.
    pub fn with_hash_kit(width: usize, depth: usize, hash_kit: HashKit) -> Result<Self> {
        if width == 0 || depth == 0 {
            return Err(invalid_config(format!(
                "width and depth must be positive, got {}x{}",
                width, depth,
            )));
        }
        match width.checked_mul(depth) {
            Some(len) if len <= MAX_COUNTER_COUNT => Ok(CountMinSketch {
                width,
                depth,
                total_count: 0,
                grid: vec![0; len],
                hash_kit,
            }),
            _ => Err(invalid_config(format!(
                "a {}x{} sketch exceeds {} counters",
                width, depth, MAX_COUNTER_COUNT,
            ))),
        }
    }

    fn offsets(&self, hash_iter: HashIter) -> impl Iterator<Item = usize> {
        let width = self.width;
        hash_iter
            .take(self.depth)
            .enumerate()
            .map(move |(row, hash)| row * width + (hash % width as u64) as usize)
    }

    /// Adds `delta` occurrences of `item` and returns its new estimate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `delta` is negative. The sketch is unchanged in that
    /// case.
    pub fn incr_by(&mut self, item: impl AsRef<[u8]>, delta: i64) -> Result<u64> {
        if delta < 0 {
            return Err(invalid_config(format!(
                "increment must not be negative, got {}",
                delta,
            )));
        }
        let delta = delta as u64;
        let offsets = self.offsets(self.hash_kit.hash_iter(item.as_ref()));
        let mut estimate = u64::max_value();
        for offset in offsets {
            let counter = &mut self.grid[offset];
            *counter = counter.saturating_add(delta);
            estimate = estimate.min(*counter);
        }
        self.total_count = self.total_count.saturating_add(delta);
        Ok(estimate)
    }

    /// Returns the estimated number of occurrences of `item`.
    pub fn query(&self, item: impl AsRef<[u8]>) -> u64 {
        let hash_iter = self.hash_kit.hash_iter(item.as_ref());
        self.offsets(hash_iter)
            .map(|offset| self.grid[offset])
            .min()
            .unwrap_or(0)
    }

    fn check_dimensions(&self, other: &CountMinSketch) -> Result<()> {
        if self.width != other.width || self.depth != other.depth {
            return Err(Error::DimensionMismatch(format!(
                "cannot merge a {}x{} sketch into a {}x{} sketch",
                other.width, other.depth, self.width, self.depth,
            )));
        }
        if self.hash_kit != other.hash_kit {
            return Err(Error::DimensionMismatch(
                "sketches use different hash seeds".to_string(),
            ));
        }
        Ok(())
    }

    /// Overwrites this sketch with the weighted sum of `sources`. Weights default to 1.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `sources` is empty or `weights` does not hold one
    /// weight per source, and [`Error::DimensionMismatch`] if any source differs from this sketch
    /// in dimensions or hashing. The sketch is unchanged on error.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_sketches::count_min_sketch::CountMinSketch;
    ///
    /// let mut sketch_1 = CountMinSketch::create_by_dim(100, 4).unwrap();
    /// let mut sketch_2 = CountMinSketch::create_by_dim(100, 4).unwrap();
    /// sketch_1.incr_by("foo", 2).unwrap();
    /// sketch_2.incr_by("foo", 3).unwrap();
    ///
    /// let mut merged = CountMinSketch::create_by_dim(100, 4).unwrap();
    /// merged.merge(&[&sketch_1, &sketch_2], Some(&[1, 10])).unwrap();
    /// assert_eq!(merged.query("foo"), 32);
    /// ```
    pub fn merge(&mut self, sources: &[&CountMinSketch], weights: Option<&[u64]>) -> Result<()> {
        if sources.is_empty() {
            return Err(invalid_config("merge needs at least one source"));
        }
        if let Some(weights) = weights {
            if weights.len() != sources.len() {
                return Err(invalid_config(format!(
                    "{} weights given for {} sources",
                    weights.len(),
                    sources.len(),
                )));
            }
        }
        for source in sources {
            self.check_dimensions(source)?;
        }

        let mut grid = vec![0u64; self.grid.len()];
        let mut total_count = 0u64;
        for (index, source) in sources.iter().enumerate() {
            let weight = weights.map_or(1, |weights| weights[index]);
            for (counter, source_counter) in grid.iter_mut().zip(&source.grid) {
                *counter = counter.saturating_add(source_counter.saturating_mul(weight));
            }
            total_count = total_count.saturating_add(source.total_count.saturating_mul(weight));
        }
        self.grid = grid;
        self.total_count = total_count;
        tracing::debug!(
            sources = sources.len(),
            width = self.width,
            depth = self.depth,
            "merged count-min sketches"
        );
        Ok(())
    }

    /// Resets every counter to zero.
    pub fn clear(&mut self) {
        for counter in &mut self.grid {
            *counter = 0;
        }
        self.total_count = 0;
    }

    /// Returns the number of counters per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the number of rows.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the sum of every increment.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Returns the bound on the overestimate relative to the total count, `e / width`.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_sketches::count_min_sketch::CountMinSketch;
    ///
    /// let sketch = CountMinSketch::create_by_prob(0.1, 0.05).unwrap();
    /// assert!(sketch.error() <= 0.1);
    /// assert!(sketch.confidence() >= 0.95);
    /// ```
    pub fn error(&self) -> f64 {
        E / self.width as f64
    }

    /// Returns the probability that an estimate is within the error bound, `1 - e^-depth`.
    pub fn confidence(&self) -> f64 {
        1.0 - (-(self.depth as f64)).exp()
    }

    /// Returns the hashers of the sketch.
    pub fn hash_kit(&self) -> &HashKit {
        &self.hash_kit
    }

    /// Returns a diagnostic snapshot of the sketch.
    pub fn info(&self) -> CountMinInfo {
        CountMinInfo {
            width: self.width,
            depth: self.depth,
            total_count: self.total_count,
            error: self.error(),
            confidence: self.confidence(),
            size_in_bytes: self.grid.len() * mem::size_of::<u64>(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.depth == 0 {
            return Err(corrupt_state("count-min sketch has a zero dimension"));
        }
        if self.width.checked_mul(self.depth) != Some(self.grid.len()) {
            return Err(corrupt_state(format!(
                "count-min sketch of {}x{} has {} counters",
                self.width,
                self.depth,
                self.grid.len(),
            )));
        }
        Ok(())
    }
}

impl Sketch for CountMinSketch {
    const KIND: StructureKind = StructureKind::CountMinSketch;

    fn to_bytes(&self) -> Result<Vec<u8>> {
        codec::encode(Self::KIND, self)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let sketch: CountMinSketch = codec::decode(Self::KIND, bytes)?;
        sketch.validate()?;
        Ok(sketch)
    }
}

impl Merge for CountMinSketch {
    /// Adds the counters of `other` to this sketch.
    fn merge_from(&mut self, other: &Self) -> Result<()> {
        self.check_dimensions(other)?;
        for (counter, other_counter) in self.grid.iter_mut().zip(&other.grid) {
            *counter = counter.saturating_add(*other_counter);
        }
        self.total_count = self.total_count.saturating_add(other.total_count);
        Ok(())
    }
}
