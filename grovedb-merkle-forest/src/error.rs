use thiserror::Error;

/// Alias for `core::result::Result<T, Error>`.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors from Merkle forest operations.
///
/// `StructuralError` means the forest's own bookkeeping is broken; it is a
/// bug, never a consequence of caller input.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Bad construction parameters (forest depth, accumulator shape).
    #[error("configuration error: {0}")]
    ConfigurationError(String),
    /// The forest or an accumulator tree has no free slot left.
    #[error("capacity exceeded (capacity {capacity}, count {count})")]
    CapacityExceeded {
        /// Number of slots.
        capacity: u64,
        /// Slots already taken.
        count: u64,
    },
    /// A digest or proof was requested for a size the forest never had.
    #[error("size {requested} is outside the observed range 0..={size}")]
    RangeError {
        /// Size asked for.
        requested: u64,
        /// Upper bound the request had to respect: the forest size, or
        /// the newer size when an older one exceeds it.
        size: u64,
    },
    /// A node the forest guarantees to exist is missing or incomplete.
    #[error("structural error: {0}")]
    StructuralError(String),
    /// The verifier was handed a malformed digest or proof.
    #[error("invalid proof: {0}")]
    InvalidProof(String),
    /// Encoding or decoding of a digest/proof failed.
    #[error("invalid data: {0}")]
    InvalidData(String),
}
