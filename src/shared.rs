//! Lock wrapper that lets a structure be queried and mutated from several threads.

use crate::error::Result;
use crate::structure::{Merge, Operation, Reply, Structure};
use parking_lot::RwLock;
use std::ptr;

/// A structure behind a per-instance read/write lock.
///
/// Queries run concurrently under the read lock, and mutations are exclusive under the write
/// lock. Every method holds the lock for the duration of a single closure call.
///
/// # Examples
///
/// ```
/// use probabilistic_sketches::count_min_sketch::CountMinSketch;
/// use probabilistic_sketches::Shared;
/// use std::sync::Arc;
/// use std::thread;
///
/// let sketch = Arc::new(Shared::new(CountMinSketch::create_by_dim(100, 5).unwrap()));
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let sketch = Arc::clone(&sketch);
///         thread::spawn(move || sketch.write(|sketch| sketch.incr_by("foo", 1).unwrap()))
///     })
///     .collect();
/// for handle in handles {
///     handle.join().unwrap();
/// }
///
/// assert_eq!(sketch.read(|sketch| sketch.query("foo")), 4);
/// ```
#[derive(Debug, Default)]
pub struct Shared<S> {
    inner: RwLock<S>,
}

impl<S> Shared<S> {
    /// Wraps `structure`.
    pub fn new(structure: S) -> Self {
        Shared {
            inner: RwLock::new(structure),
        }
    }

    /// Calls `f` with shared access to the structure.
    pub fn read<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        f(&self.inner.read())
    }

    /// Calls `f` with exclusive access to the structure.
    pub fn write<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut S) -> T,
    {
        f(&mut self.inner.write())
    }

    /// Unwraps the structure.
    pub fn into_inner(self) -> S {
        self.inner.into_inner()
    }
}

impl<S> Shared<S>
where
    S: Merge + Clone,
{
    /// Merges the structure behind `other` into the structure behind `self`.
    ///
    /// Holds the write lock of `self` and the read lock of `other` for the duration of the merge.
    /// The two locks are taken in address order, so two threads merging `a` into `b` and `b`
    /// into `a` cannot deadlock. Merging a wrapper into itself merges a snapshot of the
    /// structure.
    pub fn merge_from(&self, other: &Shared<S>) -> Result<()> {
        if ptr::eq(self, other) {
            let mut structure = self.inner.write();
            let snapshot = structure.clone();
            return structure.merge_from(&snapshot);
        }

        if (self as *const Self) < (other as *const Self) {
            let mut structure = self.inner.write();
            let other = other.inner.read();
            structure.merge_from(&other)
        } else {
            let other = other.inner.read();
            let mut structure = self.inner.write();
            structure.merge_from(&other)
        }
    }
}

impl Shared<Structure> {
    /// Applies `operation`, taking the read lock for operations that only read and the write
    /// lock otherwise.
    pub fn apply(&self, operation: Operation) -> Result<Reply> {
        if operation.is_mutation() {
            self.write(|structure| structure.apply(operation))
        } else {
            self.read(|structure| structure.inspect(&operation))
        }
    }
}

impl<S> From<S> for Shared<S> {
    fn from(structure: S) -> Self {
        Self::new(structure)
    }
}
