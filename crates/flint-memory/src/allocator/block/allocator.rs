//! Main block pool implementation
//!
//! # Safety
//!
//! The pool owns every chunk it hands slots out of, and every free-list
//! link lives inside a slot the pool owns:
//! - A block address is either on exactly one free list or owned by
//!   exactly one live caller, never both.
//! - Free-list mutation is private to this type; no external code can
//!   construct or inspect a link.
//! - `deallocate` trusts the caller's pointer and size. A pointer that did
//!   not come from `allocate` with the same size is undefined behavior, by
//!   design: the hot path carries no origin validation.

use core::ptr::{self, NonNull};

use tracing::debug;

use super::chunk::{Chunk, FreeBlock};
use super::size_class::{BLOCK_COUNT, BLOCK_SIZES, CHUNK_SIZE, CHUNK_STRIDE, SIZE_CLASSES};
use super::{BlockConfig, BlockStats};

/// Segregated free-list pool allocator for fixed-size game objects
///
/// Requests are resolved to the smallest size class that fits and served
/// from that class's free list in O(1). An empty free list triggers the
/// allocation of a fresh 16 KiB chunk, carved into slots of the class
/// block size. One pool typically lives for one game level and is torn
/// down with [`reset`](Self::reset) instead of per-object deallocation.
///
/// # Memory Layout
/// ```text
/// free_lists[class] → [slot] → [slot] → [slot] → None
/// chunks: [Chunk 16B][Chunk 16B][Chunk 64B]...      (grown by stride)
/// ```
pub struct BlockAllocator {
    /// Chunk descriptors; capacity grows by `CHUNK_STRIDE`, never shrinks
    chunks: Vec<Chunk>,

    /// One free-list head per size class
    free_lists: [Option<NonNull<FreeBlock>>; BLOCK_COUNT],

    /// Configuration
    config: BlockConfig,

    /// Statistics
    total_allocs: u32,
    total_deallocs: u32,
    in_use: usize,
    peak_usage: usize,
}

impl BlockAllocator {
    /// Creates an empty pool with the default configuration
    ///
    /// No chunk memory is allocated until the first request.
    pub fn new() -> Self {
        Self::with_config(BlockConfig::default())
    }

    /// Creates an empty pool with a custom configuration
    pub fn with_config(config: BlockConfig) -> Self {
        Self {
            chunks: Vec::with_capacity(CHUNK_STRIDE),
            free_lists: [None; BLOCK_COUNT],
            config,
            total_allocs: 0,
            total_deallocs: 0,
            in_use: 0,
            peak_usage: 0,
        }
    }

    /// Allocates a block large enough for `size` bytes
    ///
    /// Returns `None` when `size` is zero or exceeds
    /// [`MAX_BLOCK_SIZE`](super::MAX_BLOCK_SIZE);
    /// neither touches any pool state. The returned block is at least
    /// `size` bytes (exactly the class block size) and 16-aligned. Its
    /// contents are unspecified.
    ///
    /// The pointer stays valid until it is passed back to
    /// [`deallocate`](Self::deallocate) with the same size, or until
    /// [`reset`](Self::reset) or drop reclaims the whole pool.
    pub fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        let index = SIZE_CLASSES.index_for(size)?;
        let block_size = BLOCK_SIZES[index];

        let ptr = if let Some(head) = self.free_lists[index] {
            // SAFETY: every block on a free list is an unaliased slot owned
            // by this pool whose first word is a valid FreeBlock link.
            self.free_lists[index] = unsafe { head.as_ref().next };
            head.cast::<u8>()
        } else {
            self.grow(index)
        };

        self.total_allocs = self.total_allocs.wrapping_add(1);
        self.in_use += block_size;
        self.peak_usage = self.peak_usage.max(self.in_use);

        Some(ptr)
    }

    /// Returns a block to its size class's free list
    ///
    /// No-op when `size` is zero or exceeds
    /// [`MAX_BLOCK_SIZE`](super::MAX_BLOCK_SIZE). The block
    /// becomes available for reuse immediately (O(1), LIFO within the
    /// class).
    ///
    /// # Safety
    ///
    /// Caller must ensure:
    /// - `ptr` came from [`allocate`](Self::allocate) on this pool with a
    ///   `size` that resolves to the same size class
    /// - `ptr` is not already on a free list (no double free)
    /// - no live reference into the block survives this call
    pub unsafe fn deallocate(&mut self, ptr: NonNull<u8>, size: usize) {
        let Some(index) = SIZE_CLASSES.index_for(size) else {
            return;
        };

        if let Some(pattern) = self.config.dealloc_pattern {
            // SAFETY: per this function's contract the block is live,
            // exclusively owned, and BLOCK_SIZES[index] bytes wide.
            unsafe { ptr::write_bytes(ptr.as_ptr(), pattern, BLOCK_SIZES[index]) };
        }

        let block = ptr.cast::<FreeBlock>();
        // SAFETY: the slot is at least one machine word and 16-aligned;
        // writing the link reclaims the word the caller just gave up.
        unsafe {
            block.as_ptr().write(FreeBlock {
                next: self.free_lists[index],
            });
        }
        self.free_lists[index] = Some(block);

        self.total_deallocs = self.total_deallocs.wrapping_add(1);
        self.in_use = self.in_use.saturating_sub(BLOCK_SIZES[index]);
    }

    /// Releases every chunk and clears every free list
    ///
    /// Bulk teardown for the end of a level: the pool returns to its
    /// just-constructed state (chunk array capacity is retained for
    /// reuse). Idempotent.
    ///
    /// # Safety
    ///
    /// Caller must ensure no pointer previously returned by
    /// [`allocate`](Self::allocate) is used again.
    pub unsafe fn reset(&mut self) {
        debug!(
            chunks = self.chunks.len(),
            in_use = self.in_use,
            "resetting block pool"
        );

        self.chunks.clear();
        self.free_lists = [None; BLOCK_COUNT];
        self.total_allocs = 0;
        self.total_deallocs = 0;
        self.in_use = 0;
        self.peak_usage = 0;
    }

    /// Number of chunks currently backing the pool
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Bytes currently handed out, measured in class block sizes
    pub fn used_memory(&self) -> usize {
        self.in_use
    }

    /// Checks whether a pointer falls inside any chunk of this pool
    pub fn contains(&self, ptr: *const u8) -> bool {
        self.chunks.iter().any(|chunk| chunk.contains(ptr))
    }

    /// Statistics snapshot
    pub fn stats(&self) -> BlockStats {
        BlockStats {
            total_allocs: self.total_allocs,
            total_deallocs: self.total_deallocs,
            chunk_count: self.chunks.len(),
            current_usage: self.in_use,
            peak_usage: self.peak_usage,
        }
    }

    /// Allocates a fresh chunk for `index` and hands out its first slot
    ///
    /// The remaining slots become the class's new free list. The chunk
    /// descriptor array grows by a fixed stride when full, which keeps
    /// previously issued block pointers stable: descriptors move, chunk
    /// buffers never do.
    fn grow(&mut self, index: usize) -> NonNull<u8> {
        if self.chunks.len() == self.chunks.capacity() {
            self.chunks.reserve_exact(CHUNK_STRIDE);
        }

        let block_size = BLOCK_SIZES[index];
        let mut chunk = Chunk::new(block_size);

        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: the chunk buffer is freshly allocated, CHUNK_SIZE
            // bytes, and not yet linked or handed out.
            unsafe { ptr::write_bytes(chunk.as_ptr(), pattern, CHUNK_SIZE) };
        }

        self.free_lists[index] = chunk.link_tail();
        let first = chunk.first_block();
        self.chunks.push(chunk);

        debug!(
            class = index,
            block_size,
            chunks = self.chunks.len(),
            "allocated new chunk"
        );

        first
    }
}

impl Default for BlockAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for BlockAllocator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlockAllocator")
            .field("chunks", &self.chunks.len())
            .field("in_use", &self.in_use)
            .field("peak_usage", &self.peak_usage)
            .finish_non_exhaustive()
    }
}

// SAFETY: BlockAllocator exclusively owns its chunks and free lists, and
// every method requires &mut self; moving the whole pool to another thread
// moves that ownership with it.
unsafe impl Send for BlockAllocator {}
