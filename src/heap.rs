//! Kernel heap
//!
//! Backs the `alloc` crate with a linked-list allocator over a region handed
//! in by the boot code. Thread stacks, TLS areas and the scheduler lists all
//! come out of this heap.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use linked_list_allocator::LockedHeap;

#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

static HEAP_READY: AtomicBool = AtomicBool::new(false);
static HEAP_SIZE: AtomicUsize = AtomicUsize::new(0);

/// Hand a memory region to the kernel heap. Must be called exactly once
/// before any allocation, with a region that is mapped and unused.
///
/// # Safety
/// `start..start + size` must be valid, writable and exclusively owned by
/// the heap for the lifetime of the kernel.
pub unsafe fn init(start: usize, size: usize) {
    if HEAP_READY.swap(true, Ordering::SeqCst) {
        crate::kwarn!("heap: init called twice, ignoring");
        return;
    }

    ALLOCATOR.lock().init(start as *mut u8, size);
    HEAP_SIZE.store(size, Ordering::Relaxed);
    crate::kinfo!("heap: {} KiB at {:#x}", size / 1024, start);
}

pub fn is_initialized() -> bool {
    HEAP_READY.load(Ordering::Relaxed)
}

pub fn total_size() -> usize {
    HEAP_SIZE.load(Ordering::Relaxed)
}

pub fn free_size() -> usize {
    ALLOCATOR.lock().free()
}
