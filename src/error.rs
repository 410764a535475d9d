//! Error type shared by every structure in the crate.

use thiserror::Error;

/// Errors returned by the structures in this crate.
///
/// Every error is local and recoverable. An operation that returns an error has not mutated the
/// structure it was called on, with the single exception of the overflow counter of a
/// [`CuckooFilter`](crate::cuckoo::CuckooFilter), which records the rejected insert.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Bad creation parameters, or a bad argument to a mutating operation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A cuckoo filter insert exhausted its relocation attempts.
    #[error("filter is full: insertion failed after {kicks} relocations")]
    FilterFull {
        /// Number of relocations attempted before giving up.
        kicks: usize,
    },

    /// Two structures with incompatible configurations were merged.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A buffer could not be decoded into a structure.
    #[error("corrupt state: {0}")]
    CorruptState(String),

    /// A structure could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// An operation was dispatched to a structure of a different kind.
    #[error("operation `{operation}` is not supported by a {kind}")]
    WrongStructure {
        /// Name of the rejected operation.
        operation: &'static str,
        /// Kind of the structure the operation was dispatched to.
        kind: &'static str,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn invalid_config(message: impl Into<String>) -> Error {
    Error::InvalidConfig(message.into())
}

pub(crate) fn corrupt_state(message: impl Into<String>) -> Error {
    Error::CorruptState(message.into())
}
