//! Frame and level memory allocators for the Flint engine
//!
//! Flint keeps game objects off the global heap on the hot path. This crate
//! provides the two allocators the rest of the engine is built on:
//!
//! - [`allocator::BlockAllocator`]: a segregated free-list pool for
//!   long-lived, individually freed objects (entities, sprites, shapes).
//!   Fixed size classes, chunked growth, O(1) allocate and deallocate,
//!   bulk teardown with `reset` at the end of a level.
//! - [`allocator::StackAllocator`]: a bump-pointer scratch stack for
//!   short-lived, strictly nested allocations (per-frame temporary
//!   buffers). Strict LIFO deallocation, heap fallback when the fixed
//!   region is exhausted, high-water-mark telemetry.
//!
//! Both allocators are single-owner: no locks, no atomics. A caller that
//! needs allocators on several threads owns one instance per thread.
//!
//! # Example
//!
//! ```
//! use flint_memory::allocator::{BlockAllocator, StackAllocator};
//!
//! let mut pool = BlockAllocator::new();
//! let block = pool.allocate(48).expect("48 bytes fits a size class");
//! unsafe { pool.deallocate(block, 48) };
//!
//! let mut scratch = StackAllocator::new();
//! let mut slot = Some(scratch.allocate(4096)?);
//! unsafe { scratch.deallocate(&mut slot) };
//! assert!(slot.is_none());
//! # Ok::<(), flint_memory::AllocError>(())
//! ```

#![warn(missing_docs)]
#![warn(unsafe_op_in_unsafe_fn)]

pub mod allocator;
pub mod error;
pub mod utils;

pub use error::{AllocError, AllocResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
