use crate::bucket_table::BucketTable;
use crate::codec;
use crate::cuckoo::{CuckooConfig, CuckooInfo};
use crate::error::{corrupt_state, Error, Result};
use crate::hash::mix64;
use crate::structure::{Merge, Sketch, StructureKind};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use serde::{Deserialize, Serialize};

/// A space-efficient probabilistic data structure to test for membership in a set. Cuckoo filters
/// also provide the flexibility to remove items.
///
/// A cuckoo filter is a cuckoo hash table storing a small fingerprint of each item. An item may
/// live in one of two buckets: its primary bucket, derived from its hash, and its secondary
/// bucket, derived by XOR-ing the primary bucket with a hash of the fingerprint. Since the
/// secondary bucket only depends on the current bucket and the fingerprint, a stored fingerprint
/// can be moved to its other bucket without knowing the item it came from.
///
/// When both buckets are full, a random stored fingerprint is evicted to its other bucket, which
/// may evict another one, and so on. If the walk does not settle within `max_kicks` relocations,
/// every relocation is undone and the insert fails with [`Error::FilterFull`].
///
/// # Examples
///
/// ```
/// use probabilistic_sketches::cuckoo::CuckooFilter;
///
/// let mut filter = CuckooFilter::create(100, 8, 4).unwrap();
///
/// assert!(!filter.exists("foo"));
/// assert_eq!(filter.add_nx("foo"), Ok(true));
/// assert_eq!(filter.add_nx("foo"), Ok(false));
/// assert!(filter.exists("foo"));
///
/// assert!(filter.delete("foo"));
/// assert!(!filter.exists("foo"));
///
/// assert_eq!(filter.capacity(), 128);
/// assert_eq!(filter.bucket_count(), 32);
/// ```
#[derive(Clone, Debug)]
pub struct CuckooFilter<R = XorShiftRng> {
    config: CuckooConfig,
    table: BucketTable,
    items_inserted: u64,
    items_deleted: u64,
    overflow_count: u64,
    rng: R,
}

#[derive(Serialize)]
struct CuckooStateRef<'a> {
    config: &'a CuckooConfig,
    table: &'a BucketTable,
    items_inserted: u64,
    items_deleted: u64,
    overflow_count: u64,
}

#[derive(Deserialize)]
struct CuckooState {
    config: CuckooConfig,
    table: BucketTable,
    items_inserted: u64,
    items_deleted: u64,
    overflow_count: u64,
}

impl CuckooFilter {
    /// Constructs a new, empty `CuckooFilter` holding an estimated `capacity` items in buckets of
    /// `bucket_size` fingerprints of `fingerprint_bits` bits. The number of buckets is rounded up
    /// to the next power of two.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `capacity` is zero, `fingerprint_bits` is not in
    /// `1..=32` or `bucket_size` is not in `1..=255`.
    pub fn create(capacity: usize, fingerprint_bits: usize, bucket_size: usize) -> Result<Self> {
        Self::with_config(
            CuckooConfig::new()
                .with_capacity(capacity)
                .with_fingerprint_bits(fingerprint_bits)
                .with_bucket_size(bucket_size),
        )
    }

    /// Constructs a new, empty `CuckooFilter` from a configuration, with an entropy-seeded random
    /// number generator.
    pub fn with_config(config: CuckooConfig) -> Result<Self> {
        Self::with_rng(config, XorShiftRng::from_entropy())
    }
}

impl<R> CuckooFilter<R>
where
    R: Rng,
{
    /// Constructs a new, empty `CuckooFilter` from a configuration and the random number
    /// generator used to pick relocation victims.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_sketches::cuckoo::{CuckooConfig, CuckooFilter};
    /// use rand::SeedableRng;
    /// use rand_xorshift::XorShiftRng;
    ///
    /// let filter = CuckooFilter::with_rng(
    ///     CuckooConfig::new().with_capacity(100),
    ///     XorShiftRng::seed_from_u64(0),
    /// ).unwrap();
    ///
    /// assert!(filter.is_empty());
    /// ```
    pub fn with_rng(config: CuckooConfig, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(CuckooFilter {
            table: BucketTable::new(
                config.fingerprint_bits(),
                config.bucket_count(),
                config.bucket_size(),
            ),
            config,
            items_inserted: 0,
            items_deleted: 0,
            overflow_count: 0,
            rng,
        })
    }

    #[inline]
    fn bucket_mask(&self) -> usize {
        self.table.bucket_len() - 1
    }

    #[inline]
    fn alt_index(index: usize, fingerprint: u64, mask: usize) -> usize {
        (index ^ mix64(fingerprint) as usize) & mask
    }

    fn get_fingerprint_and_indexes(&self, item: &[u8]) -> (u64, usize, usize) {
        let (h1, h2) = self.config.hash_kit().base_hashes(item);
        let fingerprint_mask = (1u64 << self.config.fingerprint_bits()) - 1;
        let mut hash = h1;
        let mut fingerprint = hash & fingerprint_mask;

        // zero marks an empty slot
        while fingerprint == 0 {
            hash = mix64(hash.wrapping_add(0x9e37_79b9_7f4a_7c15));
            fingerprint = hash & fingerprint_mask;
        }

        let mask = self.bucket_mask();
        let index_1 = h2 as usize & mask;
        let index_2 = Self::alt_index(index_1, fingerprint, mask);
        (fingerprint, index_1, index_2)
    }

    /// Places `fingerprint` in `index_1` or `index_2`, relocating stored fingerprints if both are
    /// full. Leaves `table` untouched and returns `false` if no slot is found within `max_kicks`
    /// relocations.
    fn insert_fingerprint(
        table: &mut BucketTable,
        rng: &mut R,
        max_kicks: usize,
        fingerprint: u64,
        index_1: usize,
        index_2: usize,
    ) -> bool {
        if table.insert(index_1, fingerprint).is_some()
            || table.insert(index_2, fingerprint).is_some()
        {
            return true;
        }

        let mask = table.bucket_len() - 1;
        let mut index = if rng.gen::<bool>() { index_1 } else { index_2 };
        let mut fingerprint = fingerprint;
        let mut path = Vec::new();
        for _ in 0..max_kicks {
            let entry = rng.gen_range(0, table.entries_per_bucket());
            let evicted = table.set(index, entry, fingerprint);
            path.push((index, entry, evicted));
            fingerprint = evicted;
            index = Self::alt_index(index, fingerprint, mask);
            if table.insert(index, fingerprint).is_some() {
                return true;
            }
        }

        for (index, entry, evicted) in path.into_iter().rev() {
            table.set(index, entry, evicted);
        }
        false
    }

    fn insert(&mut self, item: &[u8]) -> Result<()> {
        let (fingerprint, index_1, index_2) = self.get_fingerprint_and_indexes(item);
        let max_kicks = self.config.max_kicks();
        if Self::insert_fingerprint(
            &mut self.table,
            &mut self.rng,
            max_kicks,
            fingerprint,
            index_1,
            index_2,
        ) {
            self.items_inserted += 1;
            return Ok(());
        }

        self.overflow_count += 1;
        tracing::warn!(
            kicks = max_kicks,
            occupied = self.table.occupied_len(),
            capacity = self.table.capacity(),
            "cuckoo filter is full"
        );
        Err(Error::FilterFull { kicks: max_kicks })
    }

    /// Adds an item unless it is probably present already, returning `true` if it was added.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FilterFull`] if no slot could be found for the item. Every previously
    /// added item is still present in that case, and the overflow counter is incremented.
    pub fn add_nx(&mut self, item: impl AsRef<[u8]>) -> Result<bool> {
        let item = item.as_ref();
        if self.exists(item) {
            return Ok(false);
        }
        self.insert(item).map(|_| true)
    }

    /// Adds an item, even if it is already present. An item added `n` times has to be deleted
    /// `n` times.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FilterFull`] under the same conditions as [`CuckooFilter::add_nx`].
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_sketches::cuckoo::CuckooFilter;
    ///
    /// let mut filter = CuckooFilter::create(100, 16, 4).unwrap();
    ///
    /// filter.add("foo").unwrap();
    /// filter.add("foo").unwrap();
    /// assert_eq!(filter.count("foo"), 2);
    /// ```
    pub fn add(&mut self, item: impl AsRef<[u8]>) -> Result<()> {
        self.insert(item.as_ref())
    }

    /// Checks if an item is possibly in the filter.
    pub fn exists(&self, item: impl AsRef<[u8]>) -> bool {
        let (fingerprint, index_1, index_2) = self.get_fingerprint_and_indexes(item.as_ref());
        self.table.contains(index_1, fingerprint) || self.table.contains(index_2, fingerprint)
    }

    /// Returns the number of stored fingerprints matching the item. This is an upper bound on the
    /// number of times the item was added and not deleted.
    pub fn count(&self, item: impl AsRef<[u8]>) -> usize {
        let (fingerprint, index_1, index_2) = self.get_fingerprint_and_indexes(item.as_ref());
        let mut count = self.table.count(index_1, fingerprint);
        if index_2 != index_1 {
            count += self.table.count(index_2, fingerprint);
        }
        count
    }

    /// Removes one occurrence of an item, looking in its primary bucket first. Returns `false`
    /// if no matching fingerprint was found.
    ///
    /// Deleting an item that was never added may remove an item sharing its fingerprint and
    /// buckets.
    pub fn delete(&mut self, item: impl AsRef<[u8]>) -> bool {
        let (fingerprint, index_1, index_2) = self.get_fingerprint_and_indexes(item.as_ref());
        let removed =
            self.table.remove(index_1, fingerprint) || self.table.remove(index_2, fingerprint);
        if removed {
            self.items_deleted += 1;
        }
        removed
    }

    /// Inserts every fingerprint of `other` into this filter.
    ///
    /// The merge is all-or-nothing: on error, this filter is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the filters differ in bucket count, bucket size,
    /// fingerprint width or hashing, and [`Error::FilterFull`] if a fingerprint of `other` finds
    /// no slot.
    pub fn merge<S>(&mut self, other: &CuckooFilter<S>) -> Result<()> {
        let compatible = self.table.bucket_len() == other.table.bucket_len()
            && self.table.entries_per_bucket() == other.table.entries_per_bucket()
            && self.table.fingerprint_bit_count() == other.table.fingerprint_bit_count()
            && self.config.hash_kit() == other.config.hash_kit();
        if !compatible {
            return Err(Error::DimensionMismatch(format!(
                "cuckoo filters of {}x{} and {}x{} slots are not compatible",
                self.table.bucket_len(),
                self.table.entries_per_bucket(),
                other.table.bucket_len(),
                other.table.entries_per_bucket(),
            )));
        }

        let mask = self.bucket_mask();
        let max_kicks = self.config.max_kicks();
        let mut table = self.table.clone();
        for (index, fingerprint) in other.table.occupied() {
            let alt_index = Self::alt_index(index, fingerprint, mask);
            if !Self::insert_fingerprint(
                &mut table,
                &mut self.rng,
                max_kicks,
                fingerprint,
                index,
                alt_index,
            ) {
                tracing::warn!(
                    occupied = self.table.occupied_len(),
                    incoming = other.table.occupied_len(),
                    "cuckoo filter merge ran out of room"
                );
                return Err(Error::FilterFull { kicks: max_kicks });
            }
        }

        self.table = table;
        self.items_inserted = self.items_inserted.saturating_add(other.items_inserted);
        self.items_deleted = self.items_deleted.saturating_add(other.items_deleted);
        tracing::debug!(occupied = self.table.occupied_len(), "merged cuckoo filters");
        Ok(())
    }
}

impl<R> CuckooFilter<R> {
    /// Removes every item. Counters are reset.
    pub fn clear(&mut self) {
        self.table.clear();
        self.items_inserted = 0;
        self.items_deleted = 0;
        self.overflow_count = 0;
    }

    /// Returns the number of occupied slots.
    pub fn len(&self) -> usize {
        self.table.occupied_len()
    }

    /// Returns `true` if the filter holds no fingerprint.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the total number of slots.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.table.bucket_len()
    }

    /// Returns the number of fingerprints per bucket.
    pub fn bucket_size(&self) -> usize {
        self.table.entries_per_bucket()
    }

    /// Returns the number of bits per fingerprint.
    pub fn fingerprint_bits(&self) -> usize {
        self.table.fingerprint_bit_count()
    }

    /// Returns the number of successful inserts.
    pub fn items_inserted(&self) -> u64 {
        self.items_inserted
    }

    /// Returns the number of successful deletes.
    pub fn items_deleted(&self) -> u64 {
        self.items_deleted
    }

    /// Returns the number of inserts rejected with [`Error::FilterFull`].
    pub fn overflow_count(&self) -> u64 {
        self.overflow_count
    }

    /// Returns the fraction of occupied slots.
    pub fn load_factor(&self) -> f64 {
        self.len() as f64 / self.capacity() as f64
    }

    /// Returns the estimated false positive probability of the filter. This value increases as
    /// items are added.
    pub fn estimated_fpp(&self) -> f64 {
        let fingerprints_count = 2.0f64.powi(self.fingerprint_bits() as i32);
        let single_fpp = (fingerprints_count - 2.0) / (fingerprints_count - 1.0);
        1.0 - single_fpp.powf(2.0 * self.bucket_size() as f64 * self.load_factor())
    }

    /// Returns the configuration of the filter.
    pub fn config(&self) -> &CuckooConfig {
        &self.config
    }

    /// Returns a diagnostic snapshot of the filter.
    pub fn info(&self) -> CuckooInfo {
        CuckooInfo {
            capacity: self.capacity(),
            bucket_count: self.bucket_count(),
            bucket_size: self.bucket_size(),
            fingerprint_bits: self.fingerprint_bits(),
            max_kicks: self.config.max_kicks(),
            occupied: self.len(),
            items_inserted: self.items_inserted,
            items_deleted: self.items_deleted,
            overflow_count: self.overflow_count,
            load_factor: self.load_factor(),
            estimated_fpp: self.estimated_fpp(),
            size_in_bytes: self.table.size_in_bytes(),
        }
    }

    /// Decodes a filter produced by [`Sketch::to_bytes`], using `rng` for future relocations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptState`] if the buffer is not a valid cuckoo filter.
    pub fn from_bytes_with_rng(bytes: &[u8], rng: R) -> Result<Self> {
        let state: CuckooState = codec::decode(StructureKind::CuckooFilter, bytes)?;
        state
            .config
            .validate()
            .map_err(|err| corrupt_state(err.to_string()))?;
        state.table.validate()?;
        if state.table.bucket_len() != state.config.bucket_count()
            || state.table.entries_per_bucket() != state.config.bucket_size()
            || state.table.fingerprint_bit_count() != state.config.fingerprint_bits()
        {
            return Err(corrupt_state(
                "cuckoo filter table does not match its configuration",
            ));
        }
        Ok(CuckooFilter {
            config: state.config,
            table: state.table,
            items_inserted: state.items_inserted,
            items_deleted: state.items_deleted,
            overflow_count: state.overflow_count,
            rng,
        })
    }
}

impl<R> PartialEq for CuckooFilter<R> {
    fn eq(&self, other: &CuckooFilter<R>) -> bool {
        self.config == other.config
            && self.table == other.table
            && self.items_inserted == other.items_inserted
            && self.items_deleted == other.items_deleted
            && self.overflow_count == other.overflow_count
    }
}

impl<R> Sketch for CuckooFilter<R>
where
    R: Rng + SeedableRng,
{
    const KIND: StructureKind = StructureKind::CuckooFilter;

    fn to_bytes(&self) -> Result<Vec<u8>> {
        codec::encode(
            Self::KIND,
            &CuckooStateRef {
                config: &self.config,
                table: &self.table,
                items_inserted: self.items_inserted,
                items_deleted: self.items_deleted,
                overflow_count: self.overflow_count,
            },
        )
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_with_rng(bytes, R::from_entropy())
    }
}

impl<R> Merge for CuckooFilter<R>
where
    R: Rng,
{
    fn merge_from(&mut self, other: &Self) -> Result<()> {
        self.merge(other)
    }
}

#[cfg(test)]
mod tests {
    use super::CuckooFilter;
    use crate::bloom::BloomFilter;
    use crate::cuckoo::CuckooConfig;
    use crate::error::Error;
    use crate::hash::tests::{hash_kit_1, hash_kit_2};
    use crate::structure::Sketch;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    fn filter(config: CuckooConfig) -> CuckooFilter {
        CuckooFilter::with_rng(config.with_hash_kit(hash_kit_1()), XorShiftRng::seed_from_u64(0))
            .unwrap()
    }

    fn config(capacity: usize, fingerprint_bits: usize, bucket_size: usize) -> CuckooConfig {
        CuckooConfig::new()
            .with_capacity(capacity)
            .with_fingerprint_bits(fingerprint_bits)
            .with_bucket_size(bucket_size)
    }

    #[test]
    fn test_create() {
        let filter = CuckooFilter::create(100, 8, 4).unwrap();
        assert_eq!(filter.len(), 0);
        assert!(filter.is_empty());
        assert_eq!(filter.capacity(), 128);
        assert_eq!(filter.bucket_count(), 32);
        assert_eq!(filter.bucket_size(), 4);
        assert_eq!(filter.fingerprint_bits(), 8);
        assert_eq!(filter.config().max_kicks(), 500);

        let filter = CuckooFilter::create(100, 16, 8).unwrap();
        assert_eq!(filter.capacity(), 128);
        assert_eq!(filter.bucket_count(), 16);
    }

    #[test]
    fn test_create_invalid() {
        assert!(matches!(
            CuckooFilter::create(0, 8, 4),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            CuckooFilter::create(100, 0, 4),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            CuckooFilter::create(100, 8, 0),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            CuckooFilter::with_config(CuckooConfig::new().with_max_kicks(0)),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            CuckooFilter::with_config(CuckooConfig::new().with_max_kicks(usize::MAX / 2)),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_fingerprint_and_indexes() {
        let filter = filter(config(100, 4, 4));
        for item in 0..1000u32 {
            let (fingerprint, index_1, index_2) =
                filter.get_fingerprint_and_indexes(&item.to_le_bytes());
            assert!(fingerprint > 0 && fingerprint < 16);
            assert!(index_1 < 32 && index_2 < 32);
            assert_eq!(
                CuckooFilter::<XorShiftRng>::alt_index(index_2, fingerprint, 31),
                index_1,
            );
        }
    }

    #[test]
    fn test_add_nx() {
        let mut filter = filter(config(100, 16, 4));
        assert_eq!(filter.add_nx("foo"), Ok(true));
        assert_eq!(filter.add_nx("foo"), Ok(false));
        assert_eq!(filter.len(), 1);
        assert_eq!(filter.items_inserted(), 1);
        assert!(filter.exists("foo"));
        assert!(!filter.exists("bar"));
    }

    #[test]
    fn test_add_duplicates() {
        let mut filter = filter(config(100, 16, 4));
        for _ in 0..3 {
            filter.add("foo").unwrap();
        }
        assert_eq!(filter.count("foo"), 3);
        assert_eq!(filter.len(), 3);

        assert!(filter.delete("foo"));
        assert_eq!(filter.count("foo"), 2);
        assert!(filter.exists("foo"));
    }

    #[test]
    fn test_delete() {
        let mut filter = filter(config(100, 16, 4));
        filter.add_nx("foo").unwrap();
        filter.add_nx("bar").unwrap();

        assert!(filter.delete("foo"));
        assert!(!filter.delete("foo"));
        assert!(!filter.exists("foo"));
        assert!(filter.exists("bar"));
        assert_eq!(filter.items_deleted(), 1);
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_delete_both_indexes() {
        let mut filter = filter(config(32, 16, 1));
        let items: Vec<_> = (0..6u32).map(u32::to_le_bytes).collect();
        for item in &items {
            filter.add(item).unwrap();
        }
        for item in &items {
            assert!(filter.delete(item));
        }
        assert!(filter.is_empty());
        assert!(items.iter().all(|item| !filter.exists(item)));
    }

    #[test]
    fn test_filter_full_single_bucket() {
        let mut filter = filter(config(1, 32, 1));
        assert_eq!(filter.add_nx("foo"), Ok(true));
        let table = filter.table.clone();

        assert_eq!(filter.add_nx("bar"), Err(Error::FilterFull { kicks: 500 }));
        assert_eq!(filter.table, table);
        assert!(filter.exists("foo"));
        assert!(!filter.exists("bar"));
        assert_eq!(filter.overflow_count(), 1);
        assert_eq!(filter.items_inserted(), 1);
    }

    #[test]
    fn test_filter_full_rolls_back() {
        let mut filter = filter(config(8, 16, 4));
        let mut added = Vec::new();
        let mut overflow = 0;
        for item in 0..100u32 {
            match filter.add(item.to_le_bytes()) {
                Ok(()) => added.push(item),
                Err(err) => {
                    assert_eq!(err, Error::FilterFull { kicks: 500 });
                    overflow += 1;
                }
            }
        }

        assert_eq!(added.len(), 8);
        assert_eq!(filter.len(), 8);
        assert_eq!(filter.overflow_count(), overflow);
        assert!(added.iter().all(|item| filter.exists(item.to_le_bytes())));
    }

    #[test]
    fn test_merge() {
        let mut filter_1 = filter(config(100, 16, 4));
        let mut filter_2 = filter(config(100, 16, 4));
        filter_1.add_nx("foo").unwrap();
        filter_2.add_nx("bar").unwrap();
        filter_2.add_nx("baz").unwrap();

        filter_1.merge(&filter_2).unwrap();
        assert!(filter_1.exists("foo"));
        assert!(filter_1.exists("bar"));
        assert!(filter_1.exists("baz"));
        assert_eq!(filter_1.len(), 3);
        assert_eq!(filter_1.items_inserted(), 3);
    }

    #[test]
    fn test_merge_mismatch() {
        let mut filter_1 = filter(config(100, 16, 4));
        let filter_2 = filter(config(1000, 16, 4));
        assert!(matches!(
            filter_1.merge(&filter_2),
            Err(Error::DimensionMismatch(_))
        ));

        let filter_3 = CuckooFilter::with_rng(
            config(100, 16, 4).with_hash_kit(hash_kit_2()),
            XorShiftRng::seed_from_u64(0),
        )
        .unwrap();
        assert!(matches!(
            filter_1.merge(&filter_3),
            Err(Error::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_merge_full_is_atomic() {
        let mut filter_1 = filter(config(8, 16, 4));
        let mut filter_2 = filter(config(8, 16, 4));
        for item in 0..100u32 {
            let _ = filter_1.add(item.to_le_bytes());
            let _ = filter_2.add((item + 100).to_le_bytes());
        }
        let before = filter_1.clone();

        assert!(matches!(
            filter_1.merge(&filter_2),
            Err(Error::FilterFull { .. })
        ));
        assert_eq!(filter_1, before);
    }

    #[test]
    fn test_clear() {
        let mut filter = filter(config(100, 16, 4));
        filter.add_nx("foo").unwrap();
        filter.add_nx("bar").unwrap();
        filter.clear();

        assert!(filter.is_empty());
        assert!(!filter.exists("foo"));
        assert!(!filter.exists("bar"));
        assert_eq!(filter.items_inserted(), 0);
    }

    #[test]
    fn test_estimated_fpp() {
        let mut filter = filter(config(100, 11, 4));
        assert!(filter.estimated_fpp() < std::f64::EPSILON);

        filter.add_nx("foo").unwrap();
        let expected_fpp = 1.0 - ((2f64.powi(11) - 2.0) / (2f64.powi(11) - 1.0)).powf(8.0 / 128.0);
        assert!((filter.estimated_fpp() - expected_fpp).abs() < std::f64::EPSILON);
    }

    #[test]
    fn test_info() {
        let mut filter = filter(config(100, 8, 4));
        filter.add_nx("foo").unwrap();
        filter.add_nx("bar").unwrap();
        filter.delete("bar");

        let info = filter.info();
        assert_eq!(info.capacity, 128);
        assert_eq!(info.bucket_count, 32);
        assert_eq!(info.bucket_size, 4);
        assert_eq!(info.fingerprint_bits, 8);
        assert_eq!(info.max_kicks, 500);
        assert_eq!(info.occupied, 1);
        assert_eq!(info.items_inserted, 2);
        assert_eq!(info.items_deleted, 1);
        assert_eq!(info.overflow_count, 0);
        assert_eq!(info.size_in_bytes, 128);
        assert!((info.load_factor - 1.0 / 128.0).abs() < std::f64::EPSILON);
    }

    #[test]
    fn test_ser_de() {
        let mut filter = filter(config(100, 12, 4));
        for item in 0..50u32 {
            filter.add_nx(item.to_le_bytes()).unwrap();
        }

        let bytes = filter.to_bytes().unwrap();
        let de_filter = CuckooFilter::<XorShiftRng>::from_bytes(&bytes).unwrap();

        assert_eq!(filter, de_filter);
        assert!((0..50u32).all(|item| de_filter.exists(item.to_le_bytes())));
        assert_eq!(filter.info(), de_filter.info());
    }

    #[test]
    fn test_de_corrupt() {
        let filter = filter(config(100, 12, 4));
        let bytes = filter.to_bytes().unwrap();
        assert!(matches!(
            CuckooFilter::<XorShiftRng>::from_bytes(&bytes[..bytes.len() - 1]),
            Err(Error::CorruptState(_))
        ));

        let bloom_bytes = BloomFilter::create(100, 0.01).unwrap().to_bytes().unwrap();
        assert!(matches!(
            CuckooFilter::<XorShiftRng>::from_bytes(&bloom_bytes),
            Err(Error::CorruptState(_))
        ));
    }

    #[test]
    fn test_de_unbounded_max_kicks() {
        let mut filter = filter(config(100, 12, 4));
        filter.config = filter.config.with_max_kicks(usize::MAX / 2);
        let bytes = filter.to_bytes().unwrap();
        assert!(matches!(
            CuckooFilter::<XorShiftRng>::from_bytes(&bytes),
            Err(Error::CorruptState(_))
        ));
    }

    #[test]
    fn test_false_positive_rate_small_fingerprints() {
        let mut filter = filter(config(1024, 8, 4));
        for item in 0..900u32 {
            filter.add(item.to_le_bytes()).unwrap();
        }

        // At most 2 * bucket_size / 2^fingerprint_bits, about 0.031.
        let samples = 100_000u32;
        let false_positives = (1_000_000..1_000_000 + samples)
            .filter(|item| filter.exists(item.to_le_bytes()))
            .count();
        let rate = false_positives as f64 / f64::from(samples);
        assert!(rate > 0.0);
        assert!(rate < 0.04, "false positive rate: {}", rate);
    }

    #[test]
    fn test_delete_non_member_small_fingerprints() {
        let mut filter = filter(config(1024, 8, 4));
        for item in 0..900u32 {
            filter.add(item.to_le_bytes()).unwrap();
        }

        let samples = 10_000u32;
        let removed = (1_000_000..1_000_000 + samples)
            .filter(|item| filter.delete(item.to_le_bytes()))
            .count();
        let rate = removed as f64 / f64::from(samples);
        assert!(rate < 0.04, "non-member delete rate: {}", rate);
        assert_eq!(filter.len(), 900 - removed);
        assert_eq!(filter.items_deleted(), removed as u64);
    }
}
