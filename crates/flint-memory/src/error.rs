//! Error types for allocator operations

use thiserror::Error;

/// Result type for allocator operations
pub type AllocResult<T> = Result<T, AllocError>;

/// Allocation errors
///
/// Invalid requests against the block pool are not errors: the pool answers
/// them with `None` by design, since callers are expected to pre-validate
/// against the known size classes. `AllocError` covers the scratch stack,
/// where exhaustion is fatal for the failing allocation and must reach the
/// caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    /// The fallback heap refused the request; nothing was allocated.
    #[error("out of memory: requested {requested} bytes ({available} bytes left in region)")]
    OutOfMemory {
        /// Size of the failed request in bytes, after alignment rounding.
        requested: usize,
        /// Bytes still unused in the fixed region at the time of failure.
        available: usize,
    },

    /// The bounded entry stack already holds the maximum number of
    /// outstanding allocations.
    #[error("scratch stack is full ({max} outstanding allocations)")]
    EntriesExhausted {
        /// Maximum number of simultaneously outstanding entries.
        max: usize,
    },

    /// Requested alignment is not a power of two.
    #[error("invalid alignment: {align} is not a power of two")]
    InvalidAlignment {
        /// The rejected alignment value.
        align: usize,
    },

    /// A zero-byte region capacity was requested at construction.
    #[error("invalid capacity: scratch region cannot be empty")]
    InvalidCapacity,
}
