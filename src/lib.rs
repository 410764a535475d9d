//! # probabilistic-sketches
//!
//! `probabilistic-sketches` is an embeddable engine of approximate data structures that trade a
//! bounded amount of error for a small, fixed memory footprint. Every structure can be created
//! from a validated configuration, mutated, queried, merged with a compatible instance, written to
//! a versioned binary buffer and inspected through an `info()` snapshot.
//!
//! - [`BloomFilter`](bloom::BloomFilter): set membership without false negatives that grows by
//!   chaining sub-filters of tightening error rate.
//! - [`CuckooFilter`](cuckoo::CuckooFilter): set membership that supports deletion and counting
//!   of fingerprints.
//! - [`CountMinSketch`](count_min_sketch::CountMinSketch): frequency estimates that never
//!   undercount.
//! - [`TopK`](top_k::TopK): heavy hitter tracking over a decaying admission sketch.
//!
//! All structures hash items with the same [`HashKit`](hash::HashKit), and can be dispatched to
//! through the tagged [`Structure`] enum and shared between threads through [`Shared`].
//!
//! ## Usage
//!
//! ```rust
//! use probabilistic_sketches::count_min_sketch::CountMinSketch;
//! use probabilistic_sketches::top_k::TopK;
//!
//! let mut sketch = CountMinSketch::create_by_prob(0.001, 0.01).unwrap();
//! sketch.incr_by("foo", 3).unwrap();
//! assert!(sketch.query("foo") >= 3);
//!
//! let mut top_k = TopK::create(2, 64, 5, 0.9).unwrap();
//! top_k.incr_by("foo", 10).unwrap();
//! top_k.incr_by("bar", 5).unwrap();
//! assert_eq!(top_k.list(), vec![b"foo".to_vec(), b"bar".to_vec()]);
//! ```
//!
//! ## References
//!
//!  - [Scalable Bloom Filters](https://dl.acm.org/citation.cfm?id=1224501)
//!  > Almeida, Paulo Sérgio, Carlos Baquero, Nuno Preguiça, and David Hutchison. 2007. “Scalable Bloom Filters.” *Inf. Process. Lett.* 101 (6). Amsterdam, The Netherlands, The Netherlands: Elsevier North-Holland, Inc.: 255–61. doi:[10.1016/j.ipl.2006.10.007](https://doi.org/10.1016/j.ipl.2006.10.007).
//!  - [Cuckoo Filter: Practically Better Than Bloom](https://dl.acm.org/citation.cfm?id=2674994)
//!  > Fan, Bin, Dave G. Andersen, Michael Kaminsky, and Michael D. Mitzenmacher. 2014. “Cuckoo Filter: Practically Better Than Bloom.” In *Proceedings of the 10th Acm International on Conference on Emerging Networking Experiments and Technologies*, 75–88. CoNEXT ’14. New York, NY, USA: ACM. doi:[10.1145/2674005.2674994](https://doi.org/10.1145/2674005.2674994).
//!  - [An Improved Data Stream Summary: The Count-Min Sketch and its Applications](https://doi.org/10.1016/j.jalgor.2003.12.001)
//!  > Cormode, Graham, and S. Muthukrishnan. 2005. “An Improved Data Stream Summary: The Count-Min Sketch and Its Applications.” *J. Algorithms* 55 (1): 58–75. doi:[10.1016/j.jalgor.2003.12.001](https://doi.org/10.1016/j.jalgor.2003.12.001).
//!  - [HeavyKeeper: An Accurate Algorithm for Finding Top-k Elephant Flows](https://www.usenix.org/conference/atc18/presentation/gong)
//!  > Gong, Junzhi, Tong Yang, Haowei Zhang, Hao Li, Steve Uhlig, Shigang Chen, Lorna Uden, and Xiaoming Li. 2018. “HeavyKeeper: An Accurate Algorithm for Finding Top-k Elephant Flows.” In *2018 USENIX Annual Technical Conference*, 909–21.
//!  - [Less hashing, same performance: Building a better Bloom filter](https://dl.acm.org/citation.cfm?id=1400125)
//!  > Kirsch, Adam, and Michael Mitzenmacher. 2008. “Less Hashing, Same Performance: Building a Better Bloom Filter.” *Random Struct. Algorithms* 33 (2). New York, NY, USA: John Wiley & Sons, Inc.: 187–218. doi:[10.1002/rsa.v33:2](https://doi.org/10.1002/rsa.v33:2).

#![warn(missing_docs)]

pub mod bit_vec;
pub mod bloom;
pub mod bucket_table;
mod codec;
pub mod count_min_sketch;
pub mod cuckoo;
mod error;
pub mod hash;
mod shared;
mod structure;
pub mod top_k;

pub use self::error::{Error, Result};
pub use self::shared::Shared;
pub use self::structure::{
    Merge, Operation, Reply, Sketch, Structure, StructureInfo, StructureKind,
};
