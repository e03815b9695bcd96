//! Chunk ownership and free-list carving
//!
//! # Safety
//!
//! A chunk is a contiguous 16 KiB buffer owned by exactly one size class
//! for its whole lifetime:
//! - Slots are laid out back to back at multiples of the class block size.
//! - Free slots store a next-link in their first machine word; the link is
//!   only ever written while the slot is on a free list.
//! - The buffer is released on drop, never resized.

use core::ptr::NonNull;
use std::alloc::{Layout, alloc, dealloc, handle_alloc_error};

use super::size_class::{BLOCK_ALIGN, CHUNK_SIZE};

/// Free-list node
///
/// While a slot is unused, its first machine word holds the link to the
/// next free slot of the same class. The moment a slot is handed out, the
/// word becomes caller-owned opaque memory.
#[repr(C)]
pub(crate) struct FreeBlock {
    pub(crate) next: Option<NonNull<FreeBlock>>,
}

const CHUNK_LAYOUT: Layout = match Layout::from_size_align(CHUNK_SIZE, BLOCK_ALIGN) {
    Ok(layout) => layout,
    Err(_) => panic!("chunk layout must be valid"),
};

/// A contiguous buffer subdivided into fixed-size slots of one class
pub(crate) struct Chunk {
    data: NonNull<u8>,
    block_size: usize,
}

impl Chunk {
    /// Allocates a chunk for the given class block size
    ///
    /// Aborts through [`handle_alloc_error`] if the system is truly out of
    /// memory; the pool has no meaningful way to continue without backing
    /// storage.
    pub(crate) fn new(block_size: usize) -> Self {
        debug_assert!(block_size >= core::mem::size_of::<FreeBlock>());
        debug_assert!(block_size <= CHUNK_SIZE);

        // SAFETY: CHUNK_LAYOUT has non-zero size.
        let raw = unsafe { alloc(CHUNK_LAYOUT) };
        let Some(data) = NonNull::new(raw) else {
            handle_alloc_error(CHUNK_LAYOUT)
        };
        Self { data, block_size }
    }

    /// Number of slots this chunk holds
    #[inline]
    pub(crate) fn block_count(&self) -> usize {
        CHUNK_SIZE / self.block_size
    }

    /// Pointer to the first slot
    #[inline]
    pub(crate) fn first_block(&self) -> NonNull<u8> {
        self.data
    }

    /// Raw pointer to the start of the buffer
    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.data.as_ptr()
    }

    /// Links every slot except the first into a free list
    ///
    /// Returns the head of that list (the second slot), or `None` when the
    /// chunk holds a single slot. The first slot is left untouched so the
    /// caller can hand it out directly, skipping one list round-trip.
    pub(crate) fn link_tail(&mut self) -> Option<NonNull<FreeBlock>> {
        let count = self.block_count();
        let base = self.data.as_ptr();

        for i in 1..count {
            let next = if i + 1 < count {
                // SAFETY: (i + 1) * block_size < CHUNK_SIZE, so the slot
                // address is in bounds.
                NonNull::new(unsafe { base.add((i + 1) * self.block_size) }.cast::<FreeBlock>())
            } else {
                None
            };
            // SAFETY: slot i is in bounds, 16-aligned, and at least one
            // machine word wide; nothing else references it yet.
            unsafe {
                base.add(i * self.block_size)
                    .cast::<FreeBlock>()
                    .write(FreeBlock { next });
            }
        }

        if count > 1 {
            // SAFETY: slot 1 exists and was linked above.
            NonNull::new(unsafe { base.add(self.block_size) }.cast::<FreeBlock>())
        } else {
            None
        }
    }

    /// Checks whether a pointer falls inside this chunk's buffer
    pub(crate) fn contains(&self, ptr: *const u8) -> bool {
        let addr = ptr as usize;
        let start = self.data.as_ptr() as usize;
        addr >= start && addr < start + CHUNK_SIZE
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        // SAFETY: data was allocated with CHUNK_LAYOUT in Chunk::new and
        // is released exactly once.
        unsafe { dealloc(self.data.as_ptr(), CHUNK_LAYOUT) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carves_expected_slot_count() {
        let chunk = Chunk::new(64);
        assert_eq!(chunk.block_count(), CHUNK_SIZE / 64);
    }

    #[test]
    fn tail_links_chain_every_remaining_slot() {
        let mut chunk = Chunk::new(640);
        let mut head = chunk.link_tail();

        let mut walked = 0;
        while let Some(block) = head {
            assert!(chunk.contains(block.as_ptr().cast()));
            // SAFETY: every block on the list was just written by link_tail.
            head = unsafe { block.as_ref().next };
            walked += 1;
        }
        assert_eq!(walked, chunk.block_count() - 1);
    }

    #[test]
    fn first_block_is_chunk_base_and_aligned() {
        let chunk = Chunk::new(96);
        assert_eq!(chunk.first_block().as_ptr(), chunk.as_ptr());
        assert_eq!(chunk.first_block().as_ptr() as usize % BLOCK_ALIGN, 0);
    }
}
