use crate::bloom::config::{optimal_bit_count, MAX_BIT_COUNT};
use crate::bloom::{BloomConfig, BloomInfo, SubFilter};
use crate::codec;
use crate::error::{corrupt_state, Error, Result};
use crate::structure::{Merge, Sketch, StructureKind};
use serde::{Deserialize, Serialize};
use std::iter;
use std::mem;

/// A space-efficient, optionally growable probabilistic data structure to test for membership
/// in a set.
///
/// The filter is a chain of fixed-size sub-filters. Items are always added to the last (active)
/// sub-filter. When scaling is enabled and the active sub-filter's fill ratio exceeds the ratio
/// expected at its capacity, a new sub-filter is appended with `expansion` times the capacity
/// and `tightening_ratio` times the false positive probability of the previous one, so the
/// compound false positive probability stays bounded by
/// `error_rate / (1 - tightening_ratio)`.
///
/// False negatives are impossible: an item that was added is reported present by the sub-filter
/// that absorbed it for the lifetime of the filter.
///
/// # Examples
///
/// ```
/// use probabilistic_sketches::bloom::BloomFilter;
///
/// let mut filter = BloomFilter::create(10, 0.01).unwrap();
///
/// assert!(!filter.exists("foo"));
/// assert!(filter.add("foo"));
/// assert!(!filter.add("foo"));
/// assert!(filter.exists("foo"));
///
/// assert_eq!(filter.add_multi(["bar", "foo", "bar"]), vec![true, false, false]);
///
/// assert_eq!(filter.len(), 96);
/// assert_eq!(filter.filter_count(), 1);
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BloomFilter {
    config: BloomConfig,
    sealed: Vec<SubFilter>,
    active: SubFilter,
    item_count: usize,
}

impl BloomFilter {
    /// Constructs a new, empty, scaling `BloomFilter` sized for `capacity` items at a false
    /// positive probability of `error_rate`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `capacity` is zero or `error_rate` is not in `(0, 1)`.
    pub fn create(capacity: usize, error_rate: f64) -> Result<Self> {
        Self::with_config(
            BloomConfig::new()
                .with_capacity(capacity)
                .with_error_rate(error_rate),
        )
    }

    /// Constructs a new, empty `BloomFilter` from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration does not validate. Nothing is
    /// allocated in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_sketches::bloom::{BloomConfig, BloomFilter};
    ///
    /// let filter = BloomFilter::with_config(
    ///     BloomConfig::new().with_capacity(1_000).with_error_rate(0.001).with_expansion(4),
    /// ).unwrap();
    ///
    /// assert_eq!(filter.config().expansion(), 4);
    /// ```
    pub fn with_config(config: BloomConfig) -> Result<Self> {
        config.validate()?;
        Ok(BloomFilter {
            active: SubFilter::new(config.capacity(), config.error_rate()),
            sealed: Vec::new(),
            config,
            item_count: 0,
        })
    }

    fn filters(&self) -> impl Iterator<Item = &SubFilter> {
        self.sealed.iter().chain(iter::once(&self.active))
    }

    fn try_grow(&mut self) {
        if !self.config.is_scaling() || self.active.fill_ratio() <= self.active.target_load() {
            return;
        }

        let capacity = match self.active.capacity().checked_mul(self.config.expansion() as usize)
        {
            Some(capacity) => capacity,
            None => return,
        };
        let exponent = self.sealed.len() as i32 + 1;
        let error_rate = self.config.error_rate() * self.config.tightening_ratio().powi(exponent);
        if error_rate <= 0.0 || optimal_bit_count(capacity, error_rate) > MAX_BIT_COUNT {
            tracing::warn!(
                capacity,
                error_rate,
                "bloom filter reached its maximum size and stopped scaling"
            );
            return;
        }

        let next = SubFilter::new(capacity, error_rate);
        tracing::debug!(
            filter_count = self.sealed.len() + 2,
            capacity,
            error_rate,
            bit_count = next.len(),
            "bloom filter appended a sub-filter"
        );
        let prev = mem::replace(&mut self.active, next);
        self.sealed.push(prev);
    }

    /// Adds an item, returning `true` if it was not already probably present.
    ///
    /// An item reported present by any sub-filter leaves the filter untouched. Otherwise the
    /// filter may first grow, and the item's bits are set in the active sub-filter.
    pub fn add(&mut self, item: impl AsRef<[u8]>) -> bool {
        let hash_iter = self.config.hash_kit().hash_iter(item.as_ref());
        if self.filters().any(|filter| filter.contains(hash_iter)) {
            return false;
        }
        self.try_grow();
        let inserted = self.active.insert(hash_iter);
        if inserted {
            self.item_count += 1;
        }
        inserted
    }

    /// Adds every item in order, returning one result per item as [`BloomFilter::add`] would.
    /// Later items observe the effects of earlier ones.
    pub fn add_multi<I, T>(&mut self, items: I) -> Vec<bool>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        items.into_iter().map(|item| self.add(item)).collect()
    }

    /// Checks if an item is possibly in the filter. `false` means the item was never added.
    pub fn exists(&self, item: impl AsRef<[u8]>) -> bool {
        let hash_iter = self.config.hash_kit().hash_iter(item.as_ref());
        self.filters().any(|filter| filter.contains(hash_iter))
    }

    /// Combines `other` into this filter with a bitwise union of every sub-filter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] unless both filters share a configuration and have
    /// grown to the same sub-filter layout.
    pub fn merge(&mut self, other: &BloomFilter) -> Result<()> {
        if self.config != other.config {
            return Err(Error::DimensionMismatch(
                "bloom filters have different configurations".to_string(),
            ));
        }
        let compatible = self.sealed.len() == other.sealed.len()
            && self
                .filters()
                .zip(other.filters())
                .all(|(filter, other_filter)| filter.is_compatible(other_filter));
        if !compatible {
            return Err(Error::DimensionMismatch(format!(
                "bloom filters have {} and {} sub-filters of different sizes",
                self.filter_count(),
                other.filter_count(),
            )));
        }

        for (filter, other_filter) in self.sealed.iter_mut().zip(&other.sealed) {
            filter.union(other_filter);
        }
        self.active.union(&other.active);
        self.item_count = self.item_count.saturating_add(other.item_count);
        tracing::debug!(filter_count = self.filter_count(), "merged bloom filters");
        Ok(())
    }

    /// Removes every item and drops all but the first sub-filter.
    pub fn clear(&mut self) {
        if !self.sealed.is_empty() {
            let mut sealed = mem::take(&mut self.sealed);
            self.active = sealed.swap_remove(0);
        }
        self.active.clear();
        self.item_count = 0;
    }

    /// Returns the total number of bits across sub-filters.
    pub fn len(&self) -> usize {
        self.filters().map(SubFilter::len).sum()
    }

    /// Returns `true` if no item has been added.
    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }

    /// Returns the number of sub-filters.
    pub fn filter_count(&self) -> usize {
        self.sealed.len() + 1
    }

    /// Returns the sub-filters, oldest first.
    pub fn sub_filters(&self) -> Vec<&SubFilter> {
        self.filters().collect()
    }

    /// Returns the number of successful adds.
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Returns the total number of set bits across sub-filters.
    pub fn count_ones(&self) -> usize {
        self.filters().map(SubFilter::count_ones).sum()
    }

    /// Estimates the number of distinct items added from the fill of every sub-filter.
    pub fn cardinality(&self) -> usize {
        self.filters()
            .map(SubFilter::estimated_cardinality)
            .sum::<f64>()
            .round() as usize
    }

    /// Returns the estimated false positive probability of the filter. This value increases as
    /// items are added.
    pub fn estimated_fpp(&self) -> f64 {
        1.0 - self
            .filters()
            .map(|filter| 1.0 - filter.estimated_fpp())
            .product::<f64>()
    }

    /// Returns the configuration of the filter.
    pub fn config(&self) -> &BloomConfig {
        &self.config
    }

    /// Returns a diagnostic snapshot of the filter.
    pub fn info(&self) -> BloomInfo {
        BloomInfo {
            capacity: self.filters().map(SubFilter::capacity).sum(),
            error_rate: self.config.error_rate(),
            expansion: if self.config.is_scaling() {
                Some(self.config.expansion())
            } else {
                None
            },
            filter_count: self.filter_count(),
            item_count: self.item_count,
            bit_count: self.len(),
            size_in_bytes: self.filters().map(SubFilter::size_in_bytes).sum(),
            fill_ratio: self.active.fill_ratio(),
            cardinality: self.cardinality(),
            estimated_fpp: self.estimated_fpp(),
        }
    }

    fn validate(&self) -> Result<()> {
        self.config
            .validate()
            .map_err(|err| corrupt_state(err.to_string()))?;
        if !self.config.is_scaling() && !self.sealed.is_empty() {
            return Err(corrupt_state("non-scaling bloom filter has several sub-filters"));
        }

        let mut capacity = Some(self.config.capacity());
        for (index, filter) in self.filters().enumerate() {
            filter.validate()?;
            let error_rate =
                self.config.error_rate() * self.config.tightening_ratio().powi(index as i32);
            if capacity != Some(filter.capacity()) || filter.error_rate() != error_rate {
                return Err(corrupt_state(format!(
                    "sub-filter {} does not follow the growth of its configuration",
                    index,
                )));
            }
            capacity = filter.capacity().checked_mul(self.config.expansion() as usize);
        }
        Ok(())
    }
}

impl Sketch for BloomFilter {
    const KIND: StructureKind = StructureKind::BloomFilter;

    fn to_bytes(&self) -> Result<Vec<u8>> {
        codec::encode(Self::KIND, self)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let filter: BloomFilter = codec::decode(Self::KIND, bytes)?;
        filter.validate()?;
        Ok(filter)
    }
}

impl Merge for BloomFilter {
    fn merge_from(&mut self, other: &Self) -> Result<()> {
        self.merge(other)
    }
}

#[cfg(test)]
mod tests {
    use super::BloomFilter;
    use crate::bloom::{BloomConfig, SubFilter};
    use crate::error::Error;
    use crate::hash::tests::{hash_kit_1, hash_kit_2};
    use crate::structure::Sketch;

    fn filter(capacity: usize, error_rate: f64) -> BloomFilter {
        BloomFilter::with_config(
            BloomConfig::new()
                .with_capacity(capacity)
                .with_error_rate(error_rate)
                .with_hash_kit(hash_kit_1()),
        )
        .unwrap()
    }

    #[test]
    fn test_create() {
        let filter = BloomFilter::create(1000, 0.01).unwrap();
        assert_eq!(filter.len(), 9586);
        assert_eq!(filter.sub_filters()[0].hasher_count(), 7);
        assert_eq!(filter.filter_count(), 1);
        assert_eq!(filter.item_count(), 0);
        assert_eq!(filter.cardinality(), 0);
        assert!(filter.is_empty());
    }

    #[test]
    fn test_is_empty() {
        let mut filter = filter(100, 0.01);
        assert!(filter.is_empty());
        filter.add("foo");
        assert!(!filter.is_empty());
        filter.add("foo");
        assert!(!filter.is_empty());
        filter.clear();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_create_invalid() {
        assert!(matches!(
            BloomFilter::create(0, 0.01),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            BloomFilter::create(100, 1.0),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            BloomFilter::create(100, 0.0),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_add_exists() {
        let mut filter = filter(100, 0.01);

        assert!(!filter.exists("item0"));
        assert!(filter.add("item0"));
        assert!(!filter.add("item0"));
        assert!(filter.exists("item0"));
        assert!(!filter.exists("item1"));
        assert_eq!(filter.item_count(), 1);

        assert_eq!(
            filter.add_multi(["item1", "item2", "item3"]),
            vec![true, true, true],
        );
        assert_eq!(filter.add_multi(vec!["item4", "item4"]), vec![true, false]);
        assert_eq!(filter.item_count(), 5);
    }

    #[test]
    fn test_grow() {
        let mut filter = filter(100, 0.01);
        for item in 0..1000u32 {
            filter.add(item.to_le_bytes());
        }

        assert!(filter.filter_count() > 1);
        let sub_filters = filter.sub_filters();
        assert_eq!(sub_filters[1].capacity(), 200);
        assert!((sub_filters[1].error_rate() - 0.005).abs() < std::f64::EPSILON);
        assert!(sub_filters[1].hasher_count() > sub_filters[0].hasher_count());
        assert!((0..1000u32).all(|item| filter.exists(item.to_le_bytes())));
    }

    #[test]
    fn test_non_scaling() {
        let mut filter = BloomFilter::with_config(
            BloomConfig::new()
                .with_capacity(10)
                .with_error_rate(0.01)
                .non_scaling(),
        )
        .unwrap();
        for item in 0..100u32 {
            filter.add(item.to_le_bytes());
        }
        assert_eq!(filter.filter_count(), 1);
        assert_eq!(filter.info().expansion, None);
        assert!((0..100u32).all(|item| filter.exists(item.to_le_bytes())));
    }

    #[test]
    fn test_false_positive_rate() {
        let mut filter = filter(1000, 0.01);
        for item in 0..1000u32 {
            filter.add(item.to_le_bytes());
        }

        let false_positives = (1000..101_000u32)
            .filter(|item| filter.exists(item.to_le_bytes()))
            .count();
        assert!(
            (false_positives as f64) / 100_000.0 < 0.02,
            "false positives: {}",
            false_positives,
        );
    }

    #[test]
    fn test_merge() {
        let mut filter_1 = filter(100, 0.01);
        let mut filter_2 = filter(100, 0.01);
        filter_1.add("foo");
        filter_2.add("bar");

        filter_1.merge(&filter_2).unwrap();
        assert!(filter_1.exists("foo"));
        assert!(filter_1.exists("bar"));
        assert_eq!(filter_1.item_count(), 2);
    }

    #[test]
    fn test_merge_mismatch() {
        let mut filter_1 = filter(100, 0.01);
        let filter_2 = filter(200, 0.01);
        assert!(matches!(
            filter_1.merge(&filter_2),
            Err(Error::DimensionMismatch(_))
        ));

        let filter_3 = BloomFilter::with_config(
            BloomConfig::new()
                .with_capacity(100)
                .with_hash_kit(hash_kit_2()),
        )
        .unwrap();
        assert!(matches!(
            filter_1.merge(&filter_3),
            Err(Error::DimensionMismatch(_))
        ));

        let mut filter_4 = filter(100, 0.01);
        for item in 0..1000u32 {
            filter_4.add(item.to_le_bytes());
        }
        assert!(matches!(
            filter_1.merge(&filter_4),
            Err(Error::DimensionMismatch(_))
        ));
        assert_eq!(filter_1.count_ones(), 0);
    }

    #[test]
    fn test_clear() {
        let mut filter = filter(10, 0.01);
        for item in 0..100u32 {
            filter.add(item.to_le_bytes());
        }
        filter.clear();

        assert_eq!(filter.filter_count(), 1);
        assert_eq!(filter.count_ones(), 0);
        assert_eq!(filter.item_count(), 0);
        assert_eq!(filter.len(), 96);
        assert!(!filter.exists(0u32.to_le_bytes()));
    }

    #[test]
    fn test_info() {
        let mut filter = filter(1000, 0.01);
        for item in 0..400u32 {
            filter.add(item.to_le_bytes());
        }
        let info = filter.info();
        assert_eq!(info.capacity, 1000);
        assert_eq!(info.expansion, Some(2));
        assert_eq!(info.filter_count, 1);
        assert_eq!(info.item_count, filter.item_count());
        assert_eq!(info.bit_count, 9586);
        assert_eq!(info.size_in_bytes, 150 * 8);
        assert!(info.cardinality > 380 && info.cardinality < 420);
        assert!(info.estimated_fpp < 0.01);
    }

    #[test]
    fn test_ser_de() {
        let mut filter = filter(10, 0.01);
        for item in 0..50u32 {
            filter.add(item.to_le_bytes());
        }

        let bytes = filter.to_bytes().unwrap();
        let de_filter = BloomFilter::from_bytes(&bytes).unwrap();

        assert_eq!(filter, de_filter);
        assert!((0..50u32).all(|item| de_filter.exists(item.to_le_bytes())));
        assert_eq!(filter.info(), de_filter.info());
    }

    #[test]
    fn test_de_corrupt() {
        let filter = filter(10, 0.01);
        let mut bytes = filter.to_bytes().unwrap();
        assert!(matches!(
            BloomFilter::from_bytes(&bytes[..bytes.len() - 1]),
            Err(Error::CorruptState(_))
        ));
        assert!(matches!(
            BloomFilter::from_bytes(&bytes[..10]),
            Err(Error::CorruptState(_))
        ));

        bytes.push(0);
        assert!(matches!(
            BloomFilter::from_bytes(&bytes),
            Err(Error::CorruptState(_))
        ));
    }

    #[test]
    fn test_de_forged_hasher_count() {
        let filter = filter(10, 0.01);
        let mut bytes = filter.to_bytes().unwrap();

        // active sub-filter hasher count, capacity, error rate, then the item count
        let offset = bytes.len() - 32;
        let mut hasher_count = [0u8; 8];
        hasher_count.copy_from_slice(&bytes[offset..offset + 8]);
        assert_eq!(u64::from_be_bytes(hasher_count), 7);

        bytes[offset..offset + 8].copy_from_slice(&(1u64 << 28).to_be_bytes());
        assert!(matches!(
            BloomFilter::from_bytes(&bytes),
            Err(Error::CorruptState(_))
        ));
    }

    #[test]
    fn test_de_broken_growth() {
        let mut tightened = filter(10, 0.01);
        tightened.active = SubFilter::new(10, 0.02);
        assert!(matches!(
            BloomFilter::from_bytes(&tightened.to_bytes().unwrap()),
            Err(Error::CorruptState(_))
        ));

        let mut grown = filter(10, 0.01);
        for item in 0..100u32 {
            grown.add(item.to_le_bytes());
        }
        assert!(grown.filter_count() > 1);
        assert!(BloomFilter::from_bytes(&grown.to_bytes().unwrap()).is_ok());

        grown.sealed[0] = SubFilter::new(20, 0.01);
        assert!(matches!(
            BloomFilter::from_bytes(&grown.to_bytes().unwrap()),
            Err(Error::CorruptState(_))
        ));
    }
}
