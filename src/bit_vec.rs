//! Fixed-length list of bits.

use crate::error::{corrupt_state, Result};
use serde::{Deserialize, Serialize};
use std::mem;
use std::ops::Index;

/// A fixed-length bit array that keeps track of its population count.
///
/// # Examples
///
/// ```
/// use probabilistic_sketches::bit_vec::BitVec;
///
/// let mut bv = BitVec::new(10);
/// assert!(!bv.set(0));
/// assert!(bv.set(0));
///
/// assert!(bv[0]);
/// assert_eq!(bv.count_ones(), 1);
/// assert_eq!(bv.count_zeros(), 9);
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct BitVec {
    blocks: Vec<u64>,
    len: usize,
    one_count: usize,
}

const BLOCK_BIT_COUNT: usize = mem::size_of::<u64>() * 8;

impl BitVec {
    fn get_block_count(len: usize) -> usize {
        (len + BLOCK_BIT_COUNT - 1) / BLOCK_BIT_COUNT
    }

    /// Constructs a new `BitVec` of `len` unset bits.
    pub fn new(len: usize) -> Self {
        BitVec {
            blocks: vec![0; Self::get_block_count(len)],
            len,
            one_count: 0,
        }
    }

    /// Sets the bit at `index` and returns its previous value.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(&mut self, index: usize) -> bool {
        assert!(index < self.len);
        let block_index = index / BLOCK_BIT_COUNT;
        let mask = 1 << (index % BLOCK_BIT_COUNT);
        let prev = self.blocks[block_index] & mask != 0;
        if !prev {
            self.one_count += 1;
            self.blocks[block_index] |= mask;
        }
        prev
    }

    /// Returns the bit at `index`, or `None` if `index` is out of bounds.
    pub fn get(&self, index: usize) -> Option<bool> {
        if index >= self.len {
            return None;
        }
        let block_index = index / BLOCK_BIT_COUNT;
        let bit_index = index % BLOCK_BIT_COUNT;
        Some((self.blocks[block_index] >> bit_index) & 1 != 0)
    }

    /// Unsets every bit.
    pub fn clear(&mut self) {
        for block in &mut self.blocks {
            *block = 0;
        }
        self.one_count = 0;
    }

    /// Sets every bit that is set in `other`.
    ///
    /// # Panics
    ///
    /// Panics if the two bit vectors differ in length.
    pub fn union(&mut self, other: &Self) {
        assert_eq!(self.len, other.len);
        for (block, other_block) in self.blocks.iter_mut().zip(&other.blocks) {
            *block |= *other_block;
        }
        self.one_count = self.blocks.iter().map(|block| block.count_ones() as usize).sum();
    }

    /// Returns the number of bits.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if there are no bits.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of set bits.
    pub fn count_ones(&self) -> usize {
        self.one_count
    }

    /// Returns the number of unset bits.
    pub fn count_zeros(&self) -> usize {
        self.len - self.one_count
    }

    /// Returns the number of bytes used by the bit storage.
    pub fn size_in_bytes(&self) -> usize {
        self.blocks.len() * mem::size_of::<u64>()
    }

    /// Checks the invariants of a decoded `BitVec`.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.blocks.len() != Self::get_block_count(self.len) {
            return Err(corrupt_state(format!(
                "bit vector of length {} has {} blocks",
                self.len,
                self.blocks.len(),
            )));
        }
        let extra_bits = self.len % BLOCK_BIT_COUNT;
        if extra_bits > 0 {
            if let Some(last) = self.blocks.last() {
                if last >> extra_bits != 0 {
                    return Err(corrupt_state("bit vector has bits set past its length"));
                }
            }
        }
        let one_count: usize = self.blocks.iter().map(|block| block.count_ones() as usize).sum();
        if one_count != self.one_count {
            return Err(corrupt_state(format!(
                "bit vector records {} set bits but holds {}",
                self.one_count, one_count,
            )));
        }
        Ok(())
    }
}

static TRUE: bool = true;
static FALSE: bool = false;

impl Index<usize> for BitVec {
    type Output = bool;

    fn index(&self, index: usize) -> &bool {
        match self.get(index) {
            Some(true) => &TRUE,
            Some(false) => &FALSE,
            None => panic!("index out of bounds: the len is {} but the index is {}", self.len, index),
        }
    }
}
