use std::fmt;
use std::ptr::NonNull;
use std::sync::{Arc, Weak};

use snafu::{OptionExt, ensure};

use crate::allocator::Pool;
use crate::device::Device;
use crate::error::{AllocatorGoneSnafu, Result, SizeMismatchSnafu};

/// Everything needed to hand a block back to the allocator that issued it.
///
/// The allocator is referenced weakly and checked at use, so a context that outlives its
/// allocator reports an error instead of touching freed bookkeeping.
pub struct ReleaseContext {
    ptr: NonNull<u8>,
    capacity: usize,
    allocator: Weak<Pool>,
}

// SAFETY: the context is the unique token for one live block; the pool it points at is
// synchronized internally.
unsafe impl Send for ReleaseContext {}
unsafe impl Sync for ReleaseContext {}

impl ReleaseContext {
    pub(crate) fn new(ptr: NonNull<u8>, capacity: usize, allocator: Weak<Pool>) -> Self {
        Self { ptr, capacity, allocator }
    }

    pub fn address(&self) -> usize {
        self.ptr.as_ptr().addr()
    }

    /// Size of the underlying block, which may exceed the buffer's requested size.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True while the issuing allocator still exists.
    pub fn allocator_alive(&self) -> bool {
        self.allocator.strong_count() > 0
    }

    fn pool(&self) -> Result<Arc<Pool>> {
        self.allocator.upgrade().context(AllocatorGoneSnafu { address: self.address() })
    }
}

impl fmt::Debug for ReleaseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseContext")
            .field("address", &format_args!("{:#x}", self.address()))
            .field("capacity", &self.capacity)
            .field("allocator_alive", &self.allocator_alive())
            .finish()
    }
}

/// Return the block described by `context` to its allocator. `None` is a no-op.
pub fn deallocate(context: Option<ReleaseContext>) -> Result<()> {
    let Some(context) = context else {
        return Ok(());
    };

    match context.pool() {
        Ok(pool) => pool.return_mem(context.ptr.as_ptr()),
        Err(err) => {
            tracing::error!(
                address = context.address(),
                capacity = context.capacity,
                "release context outlived its allocator"
            );
            Err(err)
        }
    }
}

/// Exclusive owner of one block of host memory.
///
/// Dropping the buffer returns the block to its allocator. Use [`Buffer::release`] to observe
/// failures of that hand-back instead of having them logged.
pub struct Buffer {
    ptr: Option<NonNull<u8>>,
    size: usize,
    device: Device,
    context: Option<ReleaseContext>,
}

// SAFETY: the buffer owns its block exclusively; shared access only reads through `&self`.
unsafe impl Send for Buffer {}
unsafe impl Sync for Buffer {}

impl Buffer {
    /// Buffer that owns nothing.
    pub fn empty(device: Device) -> Self {
        Self { ptr: None, size: 0, device, context: None }
    }

    pub(crate) fn from_parts(ptr: NonNull<u8>, size: usize, device: Device, context: ReleaseContext) -> Self {
        Self { ptr: Some(ptr), size, device, context: Some(context) }
    }

    /// Requested size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Size of the block backing this buffer.
    pub fn capacity(&self) -> usize {
        self.context.as_ref().map_or(0, ReleaseContext::capacity)
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    /// Data pointer, null for an empty buffer.
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.map_or(std::ptr::null(), |ptr| ptr.as_ptr().cast_const())
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.map_or(std::ptr::null_mut(), NonNull::as_ptr)
    }

    pub fn release_context(&self) -> Option<&ReleaseContext> {
        self.context.as_ref()
    }

    /// Copy `src` into the buffer. `src` must be exactly [`Buffer::size`] bytes long.
    pub fn copyin(&mut self, src: &[u8]) -> Result<()> {
        ensure!(src.len() == self.size, SizeMismatchSnafu { expected: self.size, actual: src.len() });
        let (Some(ptr), Some(context)) = (self.ptr, &self.context) else {
            return Ok(());
        };

        let _pool = context.pool()?;
        // SAFETY: the block holds at least `size` bytes and is owned exclusively by `self`.
        unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), ptr.as_ptr(), self.size) };
        Ok(())
    }

    /// Copy the buffer into `dst`. `dst` must be exactly [`Buffer::size`] bytes long.
    pub fn copyout(&self, dst: &mut [u8]) -> Result<()> {
        ensure!(dst.len() == self.size, SizeMismatchSnafu { expected: self.size, actual: dst.len() });
        let (Some(ptr), Some(context)) = (self.ptr, &self.context) else {
            return Ok(());
        };

        let _pool = context.pool()?;
        // SAFETY: the block holds at least `size` bytes and `dst` cannot alias it.
        unsafe { std::ptr::copy_nonoverlapping(ptr.as_ptr().cast_const(), dst.as_mut_ptr(), self.size) };
        Ok(())
    }

    /// Return the block to its allocator now.
    pub fn release(mut self) -> Result<()> {
        self.ptr = None;
        deallocate(self.context.take())
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Err(err) = deallocate(self.context.take()) {
            tracing::error!(%err, device = %self.device, "failed to release buffer");
        }
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("ptr", &self.as_ptr())
            .field("size", &self.size)
            .field("device", &self.device)
            .field("context", &self.context)
            .finish()
    }
}
