//! Integration tests for the scratch stack allocator

use flint_memory::AllocError;
use flint_memory::allocator::StackAllocator;
use flint_memory::allocator::stack::DEFAULT_ALIGNMENT;

#[test]
fn test_stack_allocator_basic() {
    let mut stack = StackAllocator::<16>::with_capacity(4096).expect("failed to create stack");

    let ptr = stack.allocate(128).expect("allocation failed");
    assert_eq!(ptr.as_ptr() as usize % DEFAULT_ALIGNMENT, 0);

    unsafe {
        std::ptr::write_bytes(ptr.as_ptr(), 0x55, 128);
        assert_eq!(*ptr.as_ptr(), 0x55);
        assert_eq!(*ptr.as_ptr().add(127), 0x55);
    }

    let mut slot = Some(ptr);
    unsafe { stack.deallocate(&mut slot) };
    assert!(slot.is_none(), "deallocate must clear the caller's pointer");
    assert_eq!(stack.used(), 0);
}

#[test]
fn test_stack_allocator_lifo_teardown_restores_cursor() {
    let mut stack = StackAllocator::<16>::with_capacity(8192).expect("failed to create stack");

    let sizes = [64usize, 300, 16, 1024, 7];
    let mut slots: Vec<_> = sizes
        .iter()
        .map(|&size| Some(stack.allocate(size).expect("allocation failed")))
        .collect();

    assert_eq!(stack.outstanding_entries(), sizes.len());
    assert!(stack.used() > 0);

    for slot in slots.iter_mut().rev() {
        unsafe { stack.deallocate(slot) };
    }

    assert_eq!(stack.used(), 0, "cursor must return to its initial value");
    assert_eq!(stack.outstanding_entries(), 0);
}

#[test]
#[should_panic(expected = "LIFO")]
fn test_stack_allocator_rejects_non_lifo_deallocation() {
    let mut stack = StackAllocator::<16>::with_capacity(4096).expect("failed to create stack");

    let mut first = Some(stack.allocate(64).expect("allocation failed"));
    let _second = Some(stack.allocate(64).expect("allocation failed"));

    // `first` is not the topmost entry.
    unsafe { stack.deallocate(&mut first) };
}

#[test]
fn test_stack_allocator_heap_fallback_scenario() {
    let mut stack = StackAllocator::<4>::with_capacity(1024).expect("failed to create stack");

    let mut a = Some(stack.allocate_aligned(300, 4).expect("allocation failed"));
    let mut b = Some(stack.allocate_aligned(300, 4).expect("allocation failed"));
    let mut c = Some(stack.allocate_aligned(300, 4).expect("allocation failed"));
    assert_eq!(stack.used(), 900);
    assert_eq!(stack.fallback_count(), 0);

    // 200 more bytes exceed the 1024-byte region: spill to the heap.
    let mut d = Some(stack.allocate_aligned(200, 4).expect("fallback failed"));
    assert_eq!(stack.fallback_count(), 1);
    assert_eq!(stack.used(), 900, "a spilled request must not move the cursor");
    assert_eq!(stack.outstanding_entries(), 4);

    // The heap-backed entry is written and reclaimed like any other.
    unsafe {
        std::ptr::write_bytes(d.unwrap().as_ptr(), 0x7F, 200);
        stack.deallocate(&mut d);
        stack.deallocate(&mut c);
        stack.deallocate(&mut b);
        stack.deallocate(&mut a);
    }

    assert_eq!(stack.used(), 0);
    assert_eq!(stack.outstanding_entries(), 0);
    assert_eq!(stack.fallback_count(), 1, "fallback count is cumulative");
}

#[test]
fn test_stack_allocator_entry_limit_is_an_error() {
    let mut stack = StackAllocator::<4>::with_capacity(4096).expect("failed to create stack");

    let mut slots: Vec<_> = (0..4)
        .map(|_| Some(stack.allocate(16).expect("allocation failed")))
        .collect();

    assert_eq!(
        stack.allocate(16),
        Err(AllocError::EntriesExhausted { max: 4 })
    );

    for slot in slots.iter_mut().rev() {
        unsafe { stack.deallocate(slot) };
    }
}

#[test]
fn test_stack_allocator_peak_usage_telemetry() {
    let mut stack = StackAllocator::<8>::with_capacity(4096).expect("failed to create stack");
    assert_eq!(stack.max_allocation(), 0);

    let mut a = Some(stack.allocate(160).expect("allocation failed"));
    assert_eq!(stack.max_allocation(), 160);

    let mut b = Some(stack.allocate(320).expect("allocation failed"));
    assert_eq!(stack.max_allocation(), 480);

    unsafe { stack.deallocate(&mut b) };
    assert_eq!(
        stack.max_allocation(),
        480,
        "the high-water mark never decreases"
    );

    // A smaller new peak does not disturb the mark; a larger one raises it.
    let mut c = Some(stack.allocate(64).expect("allocation failed"));
    assert_eq!(stack.max_allocation(), 480);
    let mut d = Some(stack.allocate(512).expect("allocation failed"));
    assert_eq!(stack.max_allocation(), 160 + 64 + 512);

    unsafe {
        stack.deallocate(&mut d);
        stack.deallocate(&mut c);
        stack.deallocate(&mut a);
    }
}

#[test]
fn test_stack_allocator_peak_includes_heap_spills() {
    let mut stack = StackAllocator::<4>::with_capacity(256).expect("failed to create stack");

    let mut a = Some(stack.allocate(192).expect("allocation failed"));
    let mut b = Some(stack.allocate(512).expect("fallback failed"));
    assert_eq!(stack.fallback_count(), 1);
    assert_eq!(stack.max_allocation(), 192 + 512);

    unsafe {
        stack.deallocate(&mut b);
        stack.deallocate(&mut a);
    }
}

#[test]
fn test_stack_allocator_null_slot_is_a_no_op() {
    let mut stack = StackAllocator::<4>::with_capacity(1024).expect("failed to create stack");

    let mut empty: Option<core::ptr::NonNull<u8>> = None;
    unsafe { stack.deallocate(&mut empty) };

    // A cleared slot makes repeated deallocation harmless.
    let mut slot = Some(stack.allocate(64).expect("allocation failed"));
    unsafe {
        stack.deallocate(&mut slot);
        stack.deallocate(&mut slot);
    }
    assert_eq!(stack.used(), 0);
}

#[test]
fn test_stack_allocator_respects_requested_alignment() {
    let mut stack = StackAllocator::<8>::with_capacity(8192).expect("failed to create stack");

    let mut a = Some(stack.allocate_aligned(64, 8).expect("allocation failed"));
    let mut b = Some(stack.allocate_aligned(64, 32).expect("allocation failed"));
    let mut c = Some(stack.allocate_aligned(64, 128).expect("allocation failed"));

    assert_eq!(a.unwrap().as_ptr() as usize % 8, 0);
    assert_eq!(b.unwrap().as_ptr() as usize % 32, 0);
    assert_eq!(c.unwrap().as_ptr() as usize % 128, 0);

    unsafe {
        stack.deallocate(&mut c);
        stack.deallocate(&mut b);
        stack.deallocate(&mut a);
    }
    assert_eq!(stack.used(), 0);
}

#[test]
fn test_stack_allocator_telemetry_snapshot() {
    let mut stack = StackAllocator::<8>::with_capacity(2048).expect("failed to create stack");

    let mut a = Some(stack.allocate(256).expect("allocation failed"));
    let stats = stack.stats();
    assert_eq!(stats.total_allocs, 1);
    assert_eq!(stats.outstanding, 1);
    assert_eq!(stats.current_usage, 256);
    assert_eq!(stats.region_used, 256);
    assert_eq!(stats.capacity, 2048);
    assert_eq!(stats.fallback_allocs, 0);

    unsafe { stack.deallocate(&mut a) };
    let stats = stack.stats();
    assert_eq!(stats.total_deallocs, 1);
    assert_eq!(stats.outstanding, 0);
    assert_eq!(stats.current_usage, 0);
    assert_eq!(stats.peak_usage, 256);
}
