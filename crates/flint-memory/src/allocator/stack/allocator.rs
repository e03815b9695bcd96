//! Main scratch stack implementation
//!
//! # Safety
//!
//! This module implements a single-owner LIFO stack allocator:
//! - All region pointers lie inside one fixed buffer owned by the
//!   allocator; the cursor is the only record of how much is consumed.
//! - The entry stack is LIFO-consistent with the cursor: rewinding is only
//!   performed for the topmost, region-backed entry, to the offset it
//!   recorded at acquisition time.
//! - Heap-backed entries own their block until the matching deallocation
//!   releases it with the recorded layout.
//! - Every method takes `&mut self`; there is no interior mutability, no
//!   locking and no atomics. One logical owner per instance.

use core::ptr::{self, NonNull};
use std::alloc::{Layout, alloc, dealloc, handle_alloc_error};

use tracing::{debug, error};

use super::entry::{Backing, StackEntry};
use super::transaction::AllocationTransaction;
use super::{DEFAULT_ALIGNMENT, MAX_STACK_ENTRIES, STACK_CAPACITY, StackConfig, StackStats};
use crate::error::{AllocError, AllocResult};
use crate::utils::{align_up, is_aligned_ptr, prefetch_read};

const DEFAULT_REGION_LAYOUT: Layout =
    match Layout::from_size_align(STACK_CAPACITY, DEFAULT_ALIGNMENT) {
        Ok(layout) => layout,
        Err(_) => panic!("default region layout must be valid"),
    };

/// Fixed scratch buffer owned by one stack allocator
struct ScratchRegion {
    data: NonNull<u8>,
    layout: Layout,
}

impl ScratchRegion {
    fn new(layout: Layout) -> Self {
        debug_assert!(layout.size() > 0);
        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc(layout) };
        let Some(data) = NonNull::new(raw) else {
            handle_alloc_error(layout)
        };
        Self { data, layout }
    }

    #[inline]
    fn addr(&self) -> usize {
        self.data.as_ptr() as usize
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.layout.size()
    }
}

impl Drop for ScratchRegion {
    fn drop(&mut self) {
        // SAFETY: data was allocated with this layout and is released
        // exactly once.
        unsafe { dealloc(self.data.as_ptr(), self.layout) };
    }
}

/// Bump-pointer scratch allocator with strict LIFO reclamation
///
/// Serves variable-size, alignment-respecting requests by advancing a
/// cursor through a fixed region. Deallocation must happen in exact
/// reverse allocation order; the topmost entry's reclamation rewinds the
/// cursor to where it stood before that allocation. Requests the region
/// cannot satisfy spill to the heap and are counted, so the scratch budget
/// can be retuned from telemetry instead of crashing a frame.
///
/// # Memory Layout
/// ```text
/// [region start]--[alloc 1]--[alloc 2]--[alloc 3]--[cursor]----[region end]
///                 <------- outstanding ------->    <- available ->
/// ```
///
/// `MAX_ENTRIES` bounds how many allocations may be outstanding at once.
/// The default matches the engine's frame budget; tests instantiate
/// smaller stacks.
pub struct StackAllocator<const MAX_ENTRIES: usize = MAX_STACK_ENTRIES> {
    /// Fixed backing region
    region: ScratchRegion,

    /// Bytes consumed from the region
    pub(super) cursor: usize,

    /// Outstanding allocations, bottom to top
    pub(super) entries: heapless::Vec<StackEntry, MAX_ENTRIES>,

    /// Outstanding bytes, region and heap combined
    pub(super) allocation: usize,

    /// High-water mark of `allocation`
    pub(super) max_allocation: usize,

    /// Requests that spilled to the fallback heap
    pub(super) fallback_count: u32,

    /// Statistics
    pub(super) total_allocs: u32,
    pub(super) total_deallocs: u32,

    /// Configuration
    pub(super) config: StackConfig,
}

impl StackAllocator<MAX_STACK_ENTRIES> {
    /// Creates a scratch stack with the default region capacity
    pub fn new() -> Self {
        Self::from_layout(DEFAULT_REGION_LAYOUT, StackConfig::default())
    }
}

impl<const MAX_ENTRIES: usize> StackAllocator<MAX_ENTRIES> {
    /// Creates a scratch stack with a custom region capacity
    ///
    /// # Errors
    /// Returns [`AllocError::InvalidCapacity`] when `capacity` is zero or
    /// too large for a valid layout.
    pub fn with_capacity(capacity: usize) -> AllocResult<Self> {
        Self::with_config(capacity, StackConfig::default())
    }

    /// Creates a scratch stack with a custom capacity and configuration
    ///
    /// # Errors
    /// Returns [`AllocError::InvalidCapacity`] when `capacity` is zero or
    /// too large for a valid layout.
    pub fn with_config(capacity: usize, config: StackConfig) -> AllocResult<Self> {
        if capacity == 0 {
            return Err(AllocError::InvalidCapacity);
        }
        let layout = Layout::from_size_align(capacity, DEFAULT_ALIGNMENT)
            .map_err(|_| AllocError::InvalidCapacity)?;
        Ok(Self::from_layout(layout, config))
    }

    fn from_layout(layout: Layout, config: StackConfig) -> Self {
        let region = ScratchRegion::new(layout);

        if let Some(pattern) = config.alloc_pattern {
            // SAFETY: the region buffer is freshly allocated and nothing
            // has been carved out of it yet.
            unsafe { ptr::write_bytes(region.data.as_ptr(), pattern, region.capacity()) };
        }

        Self {
            region,
            cursor: 0,
            entries: heapless::Vec::new(),
            allocation: 0,
            max_allocation: 0,
            fallback_count: 0,
            total_allocs: 0,
            total_deallocs: 0,
            config,
        }
    }

    /// Allocates `size` bytes at the default alignment
    ///
    /// See [`allocate_aligned`](Self::allocate_aligned).
    pub fn allocate(&mut self, size: usize) -> AllocResult<NonNull<u8>> {
        self.allocate_aligned(size, DEFAULT_ALIGNMENT)
    }

    /// Allocates `size` bytes at the given alignment
    ///
    /// The size is rounded up to a multiple of `align`. If the aligned
    /// request fits between the cursor and the end of the region it is
    /// carved out of the region; otherwise it is satisfied by the fallback
    /// heap and counted. Either way the returned pointer must be handed
    /// back through [`deallocate`](Self::deallocate) in reverse allocation
    /// order.
    ///
    /// # Errors
    /// - [`AllocError::EntriesExhausted`] when `MAX_ENTRIES` allocations
    ///   are already outstanding; nothing is acquired.
    /// - [`AllocError::OutOfMemory`] when the fallback heap refuses the
    ///   request; the region cursor is untouched.
    /// - [`AllocError::InvalidAlignment`] when `align` is not a power of
    ///   two.
    pub fn allocate_aligned(&mut self, size: usize, align: usize) -> AllocResult<NonNull<u8>> {
        if !align.is_power_of_two() {
            return Err(AllocError::InvalidAlignment { align });
        }
        if self.entries.is_full() {
            return Err(AllocError::EntriesExhausted { max: MAX_ENTRIES });
        }

        let rounded = align_up(size, align);
        let start = self.region.addr();
        let aligned_addr = align_up(start + self.cursor, align);
        let fits = aligned_addr
            .checked_add(rounded)
            .is_some_and(|end| end <= start + self.capacity());

        let tx = if fits {
            let restore = self.cursor;
            self.cursor = aligned_addr - start + rounded;
            // SAFETY: aligned_addr lies inside the non-null region buffer.
            let ptr = unsafe { NonNull::new_unchecked(aligned_addr as *mut u8) };
            AllocationTransaction::new(self, StackEntry::region(ptr, rounded, restore))
        } else {
            // Zero-size spills still get a unique, releasable address.
            let layout = Layout::from_size_align(rounded.max(1), align)
                .map_err(|_| AllocError::InvalidAlignment { align })?;
            // SAFETY: layout has non-zero size.
            let raw = unsafe { alloc(layout) };
            let Some(ptr) = NonNull::new(raw) else {
                error!(requested = rounded, "fallback heap allocation failed");
                return Err(AllocError::OutOfMemory {
                    requested: rounded,
                    available: self.available(),
                });
            };
            debug!(
                requested = rounded,
                used = self.cursor,
                capacity = self.capacity(),
                "scratch region exhausted, spilling to heap"
            );
            AllocationTransaction::new(self, StackEntry::heap(ptr, rounded, layout))
        };

        let ptr = tx.commit()?;
        debug_assert!(is_aligned_ptr(ptr.as_ptr(), align));

        if fits && self.config.prefetch && self.cursor < self.capacity() {
            prefetch_read((self.region.addr() + self.cursor) as *const u8);
        }

        Ok(ptr)
    }

    /// Reclaims the most recent allocation and clears the caller's pointer
    ///
    /// No-op when `*slot` is `None`. A region-backed entry rewinds the
    /// cursor to the offset recorded at its allocation; a heap-backed
    /// entry releases its block. `*slot` is set to `None` so the caller
    /// cannot reuse the pointer by accident.
    ///
    /// # Panics
    /// Panics when `*slot` does not match the topmost outstanding
    /// allocation. Out-of-order reclamation is a protocol violation that
    /// would corrupt the cursor; it is never silently accepted.
    ///
    /// # Safety
    ///
    /// Caller must ensure:
    /// - `*slot` was returned by an allocation on this stack and has not
    ///   been deallocated already
    /// - no live reference into the allocation survives this call
    pub unsafe fn deallocate(&mut self, slot: &mut Option<NonNull<u8>>) {
        let Some(ptr) = *slot else {
            return;
        };

        let entry = match self.entries.last() {
            Some(entry) => *entry,
            None => panic!("scratch deallocation with no outstanding allocations"),
        };
        assert_eq!(
            ptr, entry.ptr,
            "scratch deallocation must match the most recent allocation (LIFO order)"
        );
        self.entries.pop();

        if let Some(pattern) = self.config.dealloc_pattern {
            if entry.size > 0 {
                // SAFETY: the entry is live and exclusively owned until
                // this call returns; it is entry.size bytes wide.
                unsafe { ptr::write_bytes(ptr.as_ptr(), pattern, entry.size) };
            }
        }

        match entry.backing {
            Backing::Region { restore } => {
                self.cursor = restore;
            }
            Backing::Heap { layout } => {
                // SAFETY: the block was allocated with this layout when the
                // entry was created.
                unsafe { dealloc(ptr.as_ptr(), layout) };
            }
        }

        self.allocation -= entry.size;
        self.total_deallocs = self.total_deallocs.wrapping_add(1);
        *slot = None;
    }

    /// Fixed region capacity in bytes
    pub fn capacity(&self) -> usize {
        self.region.capacity()
    }

    /// Bytes consumed from the region
    pub fn used(&self) -> usize {
        self.cursor
    }

    /// Bytes still unused in the region
    pub fn available(&self) -> usize {
        self.capacity().saturating_sub(self.cursor)
    }

    /// Number of outstanding allocations
    pub fn outstanding_entries(&self) -> usize {
        self.entries.len()
    }

    /// Peak simultaneous outstanding bytes over this allocator's lifetime
    ///
    /// Includes heap-backed spills. Never decreases.
    pub fn max_allocation(&self) -> usize {
        self.max_allocation
    }

    /// Cumulative count of requests that spilled to the fallback heap
    pub fn fallback_count(&self) -> u32 {
        self.fallback_count
    }

    /// Statistics snapshot
    pub fn stats(&self) -> StackStats {
        StackStats {
            total_allocs: self.total_allocs,
            total_deallocs: self.total_deallocs,
            fallback_allocs: self.fallback_count,
            outstanding: self.entries.len(),
            current_usage: self.allocation,
            peak_usage: self.max_allocation,
            region_used: self.cursor,
            capacity: self.capacity(),
        }
    }
}

impl Default for StackAllocator<MAX_STACK_ENTRIES> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const MAX_ENTRIES: usize> core::fmt::Debug for StackAllocator<MAX_ENTRIES> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StackAllocator")
            .field("capacity", &self.capacity())
            .field("cursor", &self.cursor)
            .field("outstanding", &self.entries.len())
            .field("max_allocation", &self.max_allocation)
            .field("fallback_count", &self.fallback_count)
            .finish_non_exhaustive()
    }
}

impl<const MAX_ENTRIES: usize> Drop for StackAllocator<MAX_ENTRIES> {
    fn drop(&mut self) {
        // Teardown with outstanding scratch allocations is a lifetime bug
        // in the owning scope. Skipped while unwinding so a failing test
        // does not escalate into an abort.
        if !std::thread::panicking() {
            debug_assert!(
                self.entries.is_empty(),
                "scratch stack dropped with {} outstanding allocations",
                self.entries.len()
            );
            debug_assert_eq!(
                self.cursor, 0,
                "scratch stack dropped with a non-zero cursor"
            );
        }
    }
}

// SAFETY: StackAllocator exclusively owns its region, entry records and
// heap-backed blocks, and every method requires &mut self; moving the
// whole allocator to another thread moves that ownership with it.
unsafe impl<const MAX_ENTRIES: usize> Send for StackAllocator<MAX_ENTRIES> {}
