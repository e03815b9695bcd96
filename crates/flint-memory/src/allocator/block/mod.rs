//! Segregated free-list pool allocator
//!
//! Fixed-size blocks organized into per-size-class free lists, backed by
//! lazily allocated chunks. Allocation resolves a request to the smallest
//! size class that fits, so internal fragmentation is bounded by the gap
//! between neighboring classes.
//!
//! ## Modules
//! - `allocator` - Main `BlockAllocator` implementation
//! - `size_class` - Size-class geometry and the size-to-class lookup table
//! - `chunk` - Chunk ownership and free-list carving
//! - `config` - Diagnostic configuration (debug fill patterns)
//! - `stats` - Statistics snapshot type

pub mod allocator;
pub mod config;
pub mod size_class;
pub mod stats;

pub(crate) mod chunk;

pub use allocator::BlockAllocator;
pub use config::BlockConfig;
pub use size_class::{BLOCK_ALIGN, BLOCK_COUNT, BLOCK_SIZES, CHUNK_SIZE, CHUNK_STRIDE, MAX_BLOCK_SIZE};
pub use stats::BlockStats;
