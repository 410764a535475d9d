//! Hashing substrate shared by every structure.
//!
//! [`HashKit`] derives any number of well-distributed positions for an item from only two keyed
//! SipHash digests. See Kirsch and Mitzenmacher, "Less Hashing, Same Performance: Building a
//! Better Bloom Filter".

use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher;
use std::fmt;
use std::hash::{BuildHasher, Hasher};

const DEFAULT_SEEDS: [(u64, u64); 2] = [
    (0x736f_6d65_7073_6575, 0x646f_7261_6e64_6f6d),
    (0x6c79_6765_6e65_7261, 0x7465_6462_7974_6573),
];

/// Hash builder producing SipHash-2-4 hashers keyed with `k0` and `k1`.
///
/// # Examples
///
/// ```
/// use probabilistic_sketches::hash::SipHasherBuilder;
///
/// let hash_builder = SipHasherBuilder::from_seed(0, 0);
/// ```
#[derive(Clone, Copy, Deserialize, Serialize)]
#[serde(from = "(u64, u64)", into = "(u64, u64)")]
pub struct SipHasherBuilder {
    k0: u64,
    k1: u64,
    hasher: SipHasher,
}

impl SipHasherBuilder {
    /// Constructs a new `SipHasherBuilder` that is seeded with the given keys.
    pub fn from_seed(k0: u64, k1: u64) -> Self {
        SipHasherBuilder {
            k0,
            k1,
            hasher: SipHasher::new_with_keys(k0, k1),
        }
    }

    /// Returns the two keys of the hasher.
    pub fn keys(&self) -> (u64, u64) {
        (self.k0, self.k1)
    }
}

impl From<(u64, u64)> for SipHasherBuilder {
    fn from((k0, k1): (u64, u64)) -> Self {
        Self::from_seed(k0, k1)
    }
}

impl From<SipHasherBuilder> for (u64, u64) {
    fn from(hash_builder: SipHasherBuilder) -> Self {
        hash_builder.keys()
    }
}

impl fmt::Debug for SipHasherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SipHasherBuilder")
            .field("k0", &self.k0)
            .field("k1", &self.k1)
            .finish()
    }
}

impl PartialEq for SipHasherBuilder {
    fn eq(&self, other: &SipHasherBuilder) -> bool {
        self.k0 == other.k0 && self.k1 == other.k1
    }
}

impl Eq for SipHasherBuilder {}

impl BuildHasher for SipHasherBuilder {
    type Hasher = SipHasher;

    #[inline]
    fn build_hasher(&self) -> SipHasher {
        self.hasher
    }
}

/// Produces `k` hash values for an item from two independent base hashes.
///
/// The `i`-th value is `h1 + i * h2 + i * i * mix`, where `h1` and `h2` are SipHash digests of
/// the item's bytes under two different key pairs and `mix` is a finalizer-mixed combination of
/// both. The quadratic term keeps the sequence from degenerating when `h2` shares factors with
/// the table size.
///
/// Two structures built with equal `HashKit`s map every item to the same positions, which is what
/// makes them mergeable. [`HashKit::default`] uses fixed seeds for that reason.
///
/// # Examples
///
/// ```
/// use probabilistic_sketches::hash::HashKit;
///
/// let hash_kit = HashKit::default();
/// let hashes = hash_kit.hashes(b"foo", 4);
///
/// assert_eq!(hashes.len(), 4);
/// assert_eq!(hashes, hash_kit.hashes(b"foo", 4));
/// ```
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct HashKit {
    hash_builders: [SipHasherBuilder; 2],
}

impl Default for HashKit {
    fn default() -> Self {
        HashKit::with_seeds(DEFAULT_SEEDS)
    }
}

impl HashKit {
    /// Constructs a new `HashKit` from two `(k0, k1)` SipHash key pairs.
    pub fn with_seeds(seeds: [(u64, u64); 2]) -> Self {
        HashKit::with_hashers([
            SipHasherBuilder::from_seed(seeds[0].0, seeds[0].1),
            SipHasherBuilder::from_seed(seeds[1].0, seeds[1].1),
        ])
    }

    /// Constructs a new `HashKit` from two hasher builders.
    pub fn with_hashers(hash_builders: [SipHasherBuilder; 2]) -> Self {
        HashKit { hash_builders }
    }

    /// Returns the two base hashes of `item`.
    pub fn base_hashes(&self, item: &[u8]) -> (u64, u64) {
        (
            hash_bytes(&self.hash_builders[0], item),
            hash_bytes(&self.hash_builders[1], item),
        )
    }

    /// Returns an infinite iterator over the hash values of `item`.
    pub fn hash_iter(&self, item: &[u8]) -> HashIter {
        let (h1, h2) = self.base_hashes(item);
        HashIter::new(h1, h2)
    }

    /// Returns the first `k` hash values of `item`.
    pub fn hashes(&self, item: &[u8], k: usize) -> Vec<u64> {
        self.hash_iter(item).take(k).collect()
    }

    /// Returns a reference to the hasher builders.
    pub fn hashers(&self) -> &[SipHasherBuilder; 2] {
        &self.hash_builders
    }
}

fn hash_bytes(hash_builder: &impl BuildHasher, item: &[u8]) -> u64 {
    let mut hasher = hash_builder.build_hasher();
    hasher.write(item);
    hasher.finish()
}

/// The 64-bit finalizer of MurmurHash3.
#[inline]
pub fn mix64(mut value: u64) -> u64 {
    value ^= value >> 33;
    value = value.wrapping_mul(0xff51_afd7_ed55_8ccd);
    value ^= value >> 33;
    value = value.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    value ^= value >> 33;
    value
}

/// An iterator over `h1 + i * h2 + i * i * mix` for `i = 0, 1, 2, ...`.
///
/// Successive values are computed with two additions using forward differences.
#[derive(Clone, Copy, Debug)]
pub struct HashIter {
    a: u64,
    b: u64,
    c: u64,
}

impl HashIter {
    fn new(h1: u64, h2: u64) -> Self {
        let mix = mix64(h1 ^ h2.rotate_left(32));
        HashIter {
            a: h1,
            b: h2.wrapping_add(mix),
            c: mix.wrapping_mul(2),
        }
    }
}

impl Iterator for HashIter {
    type Item = u64;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let ret = self.a;
        self.a = self.a.wrapping_add(self.b);
        self.b = self.b.wrapping_add(self.c);
        Some(ret)
    }
}
