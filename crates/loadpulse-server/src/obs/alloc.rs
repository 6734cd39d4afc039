//! Live heap accounting.
//!
//! With the `heap-tracking` feature a counting global allocator wraps the
//! system allocator and keeps a running total of live heap bytes. Without it,
//! heap readings fall back to resident memory.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

static LIVE_BYTES: AtomicUsize = AtomicUsize::new(0);

/// Global allocator wrapper that tracks live heap bytes.
pub struct TrackingAlloc;

// SAFETY: every call is forwarded to `System` with the caller's layout; the
// counter is a relaxed atomic and never allocates.
unsafe impl GlobalAlloc for TrackingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: same layout contract as the caller's.
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            LIVE_BYTES.fetch_add(layout.size(), Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        // SAFETY: same layout contract as the caller's.
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            LIVE_BYTES.fetch_add(layout.size(), Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: ptr came from `System` with this layout.
        unsafe { System.dealloc(ptr, layout) };
        LIVE_BYTES.fetch_sub(layout.size(), Ordering::Relaxed);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: ptr came from `System` with `layout`; new_size is caller-checked.
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            if new_size >= layout.size() {
                LIVE_BYTES.fetch_add(new_size - layout.size(), Ordering::Relaxed);
            } else {
                LIVE_BYTES.fetch_sub(layout.size() - new_size, Ordering::Relaxed);
            }
        }
        new_ptr
    }
}

#[cfg(feature = "heap-tracking")]
#[global_allocator]
static GLOBAL: TrackingAlloc = TrackingAlloc;

/// Live heap bytes, if the tracking allocator is installed.
pub fn tracked_heap_bytes() -> Option<u64> {
    if cfg!(feature = "heap-tracking") {
        Some(LIVE_BYTES.load(Ordering::Relaxed) as u64)
    } else {
        None
    }
}

/// Current heap usage in KB (resident memory when tracking is disabled).
pub fn heap_used_kb() -> f64 {
    let bytes = tracked_heap_bytes()
        .or_else(super::process::resident_memory_bytes)
        .unwrap_or(0);
    bytes as f64 / 1024.0
}
