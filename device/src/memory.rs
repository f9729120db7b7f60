//! Raw host memory primitive used by the caching allocator.

use std::alloc::Layout;
use std::fmt::Debug;
use std::ptr::NonNull;

use snafu::{OptionExt, ensure};

use crate::error::{InvalidLayoutSnafu, Result};

/// Preferred alignment for host blocks. 16 bytes is enough on ARM; 64 covers AVX-512 elsewhere.
#[cfg(any(target_arch = "aarch64", target_arch = "arm"))]
pub const MEMORY_ALIGNMENT: usize = 16;
#[cfg(not(any(target_arch = "aarch64", target_arch = "arm")))]
pub const MEMORY_ALIGNMENT: usize = 64;

/// Alignment used for sizes that are not a multiple of the preferred alignment.
pub const PLAIN_ALIGNMENT: usize = std::mem::align_of::<usize>();

/// Source of raw host memory.
pub trait HostMemory: Send + Sync + Debug {
    /// Allocate a block for `layout`, or `None` when the host is out of memory.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Return a block to the host.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`HostMemory::allocate`] on this instance with the same
    /// `layout`, and must not be used afterwards.
    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout);

    fn name(&self) -> &str {
        "host"
    }
}

/// [`HostMemory`] backed by the global allocator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMemory;

impl HostMemory for SystemMemory {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        debug_assert!(layout.size() > 0);
        // SAFETY: callers never ask for zero-sized blocks.
        NonNull::new(unsafe { std::alloc::alloc(layout) })
    }

    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded from the caller's contract.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }

    fn name(&self) -> &str {
        "system"
    }
}

/// Layout of a block of `size` bytes: `alignment`-aligned when `size` is a multiple of it,
/// word-aligned otherwise. Fails unless `alignment` is a power of two.
pub fn block_layout(size: usize, alignment: usize) -> Result<Layout> {
    ensure!(alignment.is_power_of_two(), InvalidLayoutSnafu { size, alignment });
    let align = if size % alignment == 0 { alignment } else { PLAIN_ALIGNMENT };
    Layout::from_size_align(size, align).ok().context(InvalidLayoutSnafu { size, alignment: align })
}
