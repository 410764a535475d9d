//! Common traits of the structures and a tagged enum that dispatches operations to them.
//!
//! A host that maps its own wire commands onto the structures of this crate keeps each keyed
//! value as a [`Structure`] and calls [`Structure::apply`] with an [`Operation`]. Operations that
//! only read are also available through [`Structure::inspect`], which takes `&self`.

use crate::bloom::{BloomFilter, BloomInfo};
use crate::codec;
use crate::count_min_sketch::{CountMinInfo, CountMinSketch};
use crate::cuckoo::{CuckooFilter, CuckooInfo};
use crate::error::{invalid_config, Error, Result};
use crate::top_k::{TopK, TopKInfo};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a structure, stored as the tag byte of every serialized buffer.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash, Serialize)]
pub enum StructureKind {
    /// A [`BloomFilter`].
    BloomFilter,
    /// A [`CuckooFilter`].
    CuckooFilter,
    /// A [`CountMinSketch`].
    CountMinSketch,
    /// A [`TopK`].
    TopK,
}

impl StructureKind {
    /// Returns the tag byte of the kind.
    pub fn tag(self) -> u8 {
        match self {
            StructureKind::BloomFilter => 1,
            StructureKind::CuckooFilter => 2,
            StructureKind::CountMinSketch => 3,
            StructureKind::TopK => 4,
        }
    }

    /// Returns the kind of a tag byte, or `None` if the tag is unknown.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(StructureKind::BloomFilter),
            2 => Some(StructureKind::CuckooFilter),
            3 => Some(StructureKind::CountMinSketch),
            4 => Some(StructureKind::TopK),
            _ => None,
        }
    }

    /// Returns a human readable name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            StructureKind::BloomFilter => "bloom filter",
            StructureKind::CuckooFilter => "cuckoo filter",
            StructureKind::CountMinSketch => "count-min sketch",
            StructureKind::TopK => "top-k",
        }
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A structure that can be written to and read back from a byte buffer.
///
/// Buffers start with a header holding a magic number, a format version and the structure's
/// [`StructureKind`], so a buffer of one kind is never decoded as another.
pub trait Sketch: Sized {
    /// Kind written in the header of every buffer.
    const KIND: StructureKind;

    /// Serializes the structure.
    fn to_bytes(&self) -> Result<Vec<u8>>;

    /// Deserializes a structure, rejecting buffers whose header or contents are inconsistent
    /// with `Self` with [`Error::CorruptState`].
    fn from_bytes(bytes: &[u8]) -> Result<Self>;
}

/// A structure that can absorb the contents of another structure of the same configuration.
pub trait Merge {
    /// Merges `other` into `self`. On error, `self` is left unchanged.
    fn merge_from(&mut self, other: &Self) -> Result<()>;
}

/// One of the structures of this crate.
///
/// # Examples
///
/// ```
/// use probabilistic_sketches::bloom::BloomFilter;
/// use probabilistic_sketches::{Operation, Reply, Structure};
///
/// let mut structure = Structure::from(BloomFilter::create(100, 0.01).unwrap());
///
/// let reply = structure.apply(Operation::Add(b"foo".to_vec())).unwrap();
/// assert_eq!(reply, Reply::Bool(true));
///
/// let reply = structure.inspect(&Operation::Exists(b"foo".to_vec())).unwrap();
/// assert_eq!(reply, Reply::Bool(true));
///
/// assert!(structure.apply(Operation::Query(b"foo".to_vec())).is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Structure {
    /// A scalable Bloom filter.
    BloomFilter(BloomFilter),
    /// A Cuckoo filter.
    CuckooFilter(CuckooFilter),
    /// A Count-Min Sketch.
    CountMinSketch(CountMinSketch),
    /// A Top-K heavy hitter tracker.
    TopK(TopK),
}

/// An operation on a [`Structure`].
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    /// Adds an item. Bloom filter, cuckoo filter and top-k.
    Add(Vec<u8>),
    /// Adds several items. Bloom filter.
    AddMulti(Vec<Vec<u8>>),
    /// Adds an item unless it may already be present. Cuckoo filter.
    AddNx(Vec<u8>),
    /// Tests whether an item may be present. Bloom filter and cuckoo filter.
    Exists(Vec<u8>),
    /// Counts an item. Cuckoo filter (stored fingerprints) and top-k (sketch estimate).
    Count(Vec<u8>),
    /// Deletes one copy of an item. Cuckoo filter.
    Delete(Vec<u8>),
    /// Adds a number of occurrences of an item. Count-min sketch and top-k.
    IncrBy(Vec<u8>, i64),
    /// Queries the count of an item. Count-min sketch and top-k.
    Query(Vec<u8>),
    /// Lists the tracked items. Top-k.
    List,
    /// Lists the tracked items with their counts. Top-k.
    ListWithCount,
    /// Merges another structure of the same kind and configuration.
    Merge(Box<Structure>),
    /// Overwrites a count-min sketch with the weighted sum of other sketches.
    MergeWeighted {
        /// Sketches to sum.
        sources: Vec<CountMinSketch>,
        /// One weight per source, or `None` for unit weights.
        weights: Option<Vec<u64>>,
    },
    /// Resets the structure to its freshly created state.
    Clear,
    /// Returns a diagnostic snapshot.
    Info,
}

impl Operation {
    /// Returns the name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Add(_) => "add",
            Operation::AddMulti(_) => "add_multi",
            Operation::AddNx(_) => "add_nx",
            Operation::Exists(_) => "exists",
            Operation::Count(_) => "count",
            Operation::Delete(_) => "delete",
            Operation::IncrBy(..) => "incr_by",
            Operation::Query(_) => "query",
            Operation::List => "list",
            Operation::ListWithCount => "list_with_count",
            Operation::Merge(_) => "merge",
            Operation::MergeWeighted { .. } => "merge_weighted",
            Operation::Clear => "clear",
            Operation::Info => "info",
        }
    }

    /// Returns `true` if the operation needs mutable access to the structure.
    pub fn is_mutation(&self) -> bool {
        match self {
            Operation::Exists(_)
            | Operation::Count(_)
            | Operation::Query(_)
            | Operation::List
            | Operation::ListWithCount
            | Operation::Info => false,
            Operation::Add(_)
            | Operation::AddMulti(_)
            | Operation::AddNx(_)
            | Operation::Delete(_)
            | Operation::IncrBy(..)
            | Operation::Merge(_)
            | Operation::MergeWeighted { .. }
            | Operation::Clear => true,
        }
    }
}

/// Diagnostic snapshot of a [`Structure`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum StructureInfo {
    /// Snapshot of a Bloom filter.
    BloomFilter(BloomInfo),
    /// Snapshot of a Cuckoo filter.
    CuckooFilter(CuckooInfo),
    /// Snapshot of a Count-Min Sketch.
    CountMinSketch(CountMinInfo),
    /// Snapshot of a Top-K tracker.
    TopK(TopKInfo),
}

/// Result of an [`Operation`].
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// The operation succeeded and has nothing to report.
    Ok,
    /// Outcome of `add` on a Bloom filter, `add_nx`, `exists` or `delete`.
    Bool(bool),
    /// Outcome of `add_multi`, one entry per item.
    Bools(Vec<bool>),
    /// A count.
    Count(u64),
    /// Count of an item that may not be tracked.
    MaybeCount(Option<u64>),
    /// Item evicted from a top-k by an `add` or `incr_by`.
    Expelled(Option<Vec<u8>>),
    /// Tracked items in descending order of count.
    Items(Vec<Vec<u8>>),
    /// Tracked items and their counts in descending order of count.
    ItemsWithCount(Vec<(Vec<u8>, u64)>),
    /// A diagnostic snapshot.
    Info(StructureInfo),
}

impl Structure {
    /// Returns the kind of the structure.
    pub fn kind(&self) -> StructureKind {
        match self {
            Structure::BloomFilter(_) => StructureKind::BloomFilter,
            Structure::CuckooFilter(_) => StructureKind::CuckooFilter,
            Structure::CountMinSketch(_) => StructureKind::CountMinSketch,
            Structure::TopK(_) => StructureKind::TopK,
        }
    }

    /// Returns a diagnostic snapshot of the structure.
    pub fn info(&self) -> StructureInfo {
        match self {
            Structure::BloomFilter(filter) => StructureInfo::BloomFilter(filter.info()),
            Structure::CuckooFilter(filter) => StructureInfo::CuckooFilter(filter.info()),
            Structure::CountMinSketch(sketch) => StructureInfo::CountMinSketch(sketch.info()),
            Structure::TopK(top_k) => StructureInfo::TopK(top_k.info()),
        }
    }

    /// Serializes the structure. The buffer is the same as the one the wrapped structure's
    /// [`Sketch::to_bytes`] returns.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Structure::BloomFilter(filter) => filter.to_bytes(),
            Structure::CuckooFilter(filter) => filter.to_bytes(),
            Structure::CountMinSketch(sketch) => sketch.to_bytes(),
            Structure::TopK(top_k) => top_k.to_bytes(),
        }
    }

    /// Deserializes a structure of any kind, reading the kind from the buffer's header.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (kind, _) = codec::decode_header(bytes)?;
        match kind {
            StructureKind::BloomFilter => BloomFilter::from_bytes(bytes).map(Structure::from),
            StructureKind::CuckooFilter => <CuckooFilter>::from_bytes(bytes).map(Structure::from),
            StructureKind::CountMinSketch => {
                CountMinSketch::from_bytes(bytes).map(Structure::from)
            }
            StructureKind::TopK => <TopK>::from_bytes(bytes).map(Structure::from),
        }
    }

    fn wrong_structure(&self, operation: &Operation) -> Error {
        Error::WrongStructure {
            operation: operation.name(),
            kind: self.kind().name(),
        }
    }

    /// Applies an operation to the structure.
    ///
    /// Operations that the structure's kind does not support fail with
    /// [`Error::WrongStructure`]. On error the structure is left unchanged, except for the
    /// overflow counter of a cuckoo filter.
    pub fn apply(&mut self, operation: Operation) -> Result<Reply> {
        if !operation.is_mutation() {
            return self.inspect(&operation);
        }
        let err = self.wrong_structure(&operation);
        match (self, operation) {
            (Structure::BloomFilter(filter), Operation::Add(item)) => {
                Ok(Reply::Bool(filter.add(item)))
            }
            (Structure::BloomFilter(filter), Operation::AddMulti(items)) => {
                Ok(Reply::Bools(filter.add_multi(items)))
            }
            (Structure::CuckooFilter(filter), Operation::Add(item)) => {
                filter.add(item).map(|_| Reply::Ok)
            }
            (Structure::CuckooFilter(filter), Operation::AddNx(item)) => {
                filter.add_nx(item).map(Reply::Bool)
            }
            (Structure::CuckooFilter(filter), Operation::Delete(item)) => {
                Ok(Reply::Bool(filter.delete(item)))
            }
            (Structure::CountMinSketch(sketch), Operation::IncrBy(item, delta)) => {
                sketch.incr_by(item, delta).map(Reply::Count)
            }
            (Structure::CountMinSketch(sketch), Operation::MergeWeighted { sources, weights }) => {
                let sources = sources.iter().collect::<Vec<_>>();
                sketch
                    .merge(&sources, weights.as_deref())
                    .map(|_| Reply::Ok)
            }
            (Structure::TopK(top_k), Operation::Add(item)) => Ok(Reply::Expelled(top_k.add(item))),
            (Structure::TopK(top_k), Operation::IncrBy(item, delta)) => {
                top_k.incr_by(item, delta).map(Reply::Expelled)
            }
            (structure, Operation::Merge(other)) => {
                structure.merge_from(&other).map(|_| Reply::Ok)
            }
            (structure, Operation::Clear) => {
                match structure {
                    Structure::BloomFilter(filter) => filter.clear(),
                    Structure::CuckooFilter(filter) => filter.clear(),
                    Structure::CountMinSketch(sketch) => sketch.clear(),
                    Structure::TopK(top_k) => top_k.clear(),
                }
                Ok(Reply::Ok)
            }
            _ => Err(err),
        }
    }

    /// Applies an operation that only reads the structure.
    ///
    /// Mutating operations fail with [`Error::InvalidConfig`], and operations that the
    /// structure's kind does not support fail with [`Error::WrongStructure`].
    pub fn inspect(&self, operation: &Operation) -> Result<Reply> {
        if operation.is_mutation() {
            return Err(invalid_config(format!(
                "operation `{}` needs mutable access",
                operation.name(),
            )));
        }
        match (self, operation) {
            (Structure::BloomFilter(filter), Operation::Exists(item)) => {
                Ok(Reply::Bool(filter.exists(item)))
            }
            (Structure::CuckooFilter(filter), Operation::Exists(item)) => {
                Ok(Reply::Bool(filter.exists(item)))
            }
            (Structure::CuckooFilter(filter), Operation::Count(item)) => {
                Ok(Reply::Count(filter.count(item) as u64))
            }
            (Structure::CountMinSketch(sketch), Operation::Query(item)) => {
                Ok(Reply::Count(sketch.query(item)))
            }
            (Structure::TopK(top_k), Operation::Query(item)) => {
                Ok(Reply::MaybeCount(top_k.query(item)))
            }
            (Structure::TopK(top_k), Operation::Count(item)) => {
                Ok(Reply::Count(top_k.count(item)))
            }
            (Structure::TopK(top_k), Operation::List) => Ok(Reply::Items(top_k.list())),
            (Structure::TopK(top_k), Operation::ListWithCount) => {
                Ok(Reply::ItemsWithCount(top_k.list_with_count()))
            }
            (structure, Operation::Info) => Ok(Reply::Info(structure.info())),
            (structure, operation) => Err(structure.wrong_structure(operation)),
        }
    }
}

impl Merge for Structure {
    fn merge_from(&mut self, other: &Self) -> Result<()> {
        match (self, other) {
            (Structure::BloomFilter(filter), Structure::BloomFilter(other)) => filter.merge(other),
            (Structure::CuckooFilter(filter), Structure::CuckooFilter(other)) => {
                filter.merge(other)
            }
            (Structure::CountMinSketch(sketch), Structure::CountMinSketch(other)) => {
                sketch.merge_from(other)
            }
            (Structure::TopK(top_k), Structure::TopK(other)) => top_k.merge(other),
            (structure, other) => Err(Error::DimensionMismatch(format!(
                "cannot merge a {} into a {}",
                other.kind(),
                structure.kind(),
            ))),
        }
    }
}

impl From<BloomFilter> for Structure {
    fn from(filter: BloomFilter) -> Self {
        Structure::BloomFilter(filter)
    }
}

impl From<CuckooFilter> for Structure {
    fn from(filter: CuckooFilter) -> Self {
        Structure::CuckooFilter(filter)
    }
}

impl From<CountMinSketch> for Structure {
    fn from(sketch: CountMinSketch) -> Self {
        Structure::CountMinSketch(sketch)
    }
}

impl From<TopK> for Structure {
    fn from(top_k: TopK) -> Self {
        Structure::TopK(top_k)
    }
}
