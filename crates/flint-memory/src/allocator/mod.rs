//! Custom allocators for frame and level memory
//!
//! Two allocation patterns cover the object lifetimes a frame-based game
//! has. The [`block`] pool serves long-lived, individually freed objects
//! out of segregated free lists; the [`stack`] allocator serves short-lived
//! scratch memory in strict LIFO order. Neither depends on the other, and
//! each instance has a single logical owner.

pub mod block;
pub mod stack;

pub use block::{BlockAllocator, BlockConfig, BlockStats};
pub use stack::{StackAllocator, StackConfig, StackStats};

pub use crate::error::{AllocError, AllocResult};
