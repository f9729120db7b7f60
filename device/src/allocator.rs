//! Caching host allocator.
//!
//! Returned blocks are kept in a size-ordered pool and handed out again to any request they can
//! hold (best fit). The pool only shrinks when the host runs out of memory, when
//! [`CachingAllocator::release_cached`] is called, or when the allocator is torn down.

use std::alloc::Layout;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::ptr::NonNull;
use std::sync::Arc;

use parking_lot::Mutex;
use snafu::OptionExt;

use crate::buffer::{Buffer, ReleaseContext};
use crate::config::AllocatorConfig;
use crate::device::Device;
use crate::error::{ForeignPointerSnafu, NullPointerSnafu, OutOfMemorySnafu, Result};
use crate::memory::{HostMemory, SystemMemory, block_layout};

/// Memory provider for one device.
pub trait Allocator: Send + Sync + Debug {
    /// Allocate `size` bytes. A zero-sized request yields an empty buffer that owns nothing.
    fn allocate(&self, size: usize) -> Result<Buffer>;

    fn device(&self) -> Device;

    fn name(&self) -> &str;
}

/// Snapshot of an allocator's bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Blocks currently owned by buffers.
    pub live_blocks: usize,
    pub live_bytes: usize,
    /// Blocks waiting in the pool for reuse.
    pub cached_blocks: usize,
    pub cached_bytes: usize,
}

#[derive(Debug)]
struct Block {
    ptr: NonNull<u8>,
    layout: Layout,
}

// SAFETY: a block is plain host memory owned by exactly one pool entry at a time.
unsafe impl Send for Block {}

impl Block {
    fn address(&self) -> usize {
        self.ptr.as_ptr().addr()
    }

    fn size(&self) -> usize {
        self.layout.size()
    }
}

/// Free blocks keyed by size, live blocks keyed by address. The two sets never overlap.
#[derive(Debug, Default)]
struct PoolState {
    free: BTreeMap<usize, Vec<Block>>,
    live: HashMap<usize, Block>,
}

impl PoolState {
    /// Remove the smallest cached block that holds at least `size` bytes.
    fn take_best_fit(&mut self, size: usize) -> Option<Block> {
        let key = *self.free.range(size..).next()?.0;
        let blocks = self.free.get_mut(&key)?;
        let block = blocks.pop();
        if blocks.is_empty() {
            self.free.remove(&key);
        }
        block
    }
}

/// State shared between an allocator and the release contexts of its buffers.
#[derive(Debug)]
pub(crate) struct Pool {
    name: String,
    device: Device,
    config: AllocatorConfig,
    memory: Arc<dyn HostMemory>,
    state: Mutex<PoolState>,
}

impl Pool {
    fn allocate(self: &Arc<Self>, size: usize) -> Result<Buffer> {
        if size == 0 {
            return Ok(Buffer::empty(self.device));
        }

        let mut state = self.state.lock();
        let block = match state.take_best_fit(size) {
            Some(block) => {
                tracing::trace!(size, capacity = block.size(), allocator = %self.name, "reusing cached block");
                block
            }
            None => self.allocate_block(&mut state, size)?,
        };

        let (ptr, capacity) = (block.ptr, block.size());
        let previous = state.live.insert(block.address(), block);
        debug_assert!(previous.is_none(), "block handed out twice");
        drop(state);

        let context = ReleaseContext::new(ptr, capacity, Arc::downgrade(self));
        Ok(Buffer::from_parts(ptr, size, self.device, context))
    }

    fn allocate_block(&self, state: &mut PoolState, size: usize) -> Result<Block> {
        let layout = block_layout(size, self.config.alignment())?;
        tracing::trace!(size, align = layout.align(), allocator = %self.name, "no cached block fits");
        if let Some(ptr) = self.memory.allocate(layout) {
            return Ok(Block { ptr, layout });
        }

        if self.config.evict_on_oom() {
            let evicted = self.evict(state);
            tracing::warn!(size, evicted, allocator = %self.name, "allocation failed, retrying with an empty cache");
            if let Some(ptr) = self.memory.allocate(layout) {
                return Ok(Block { ptr, layout });
            }
        }

        tracing::error!(size, allocator = %self.name, "cannot allocate memory");
        OutOfMemorySnafu { size, allocator: self.name.clone() }.fail()
    }

    pub(crate) fn return_mem(&self, ptr: *mut u8) -> Result<()> {
        let ptr = NonNull::new(ptr).context(NullPointerSnafu)?;
        let address = ptr.as_ptr().addr();

        let mut state = self.state.lock();
        let block = state.live.remove(&address).context(ForeignPointerSnafu { address, allocator: &self.name })?;
        state.free.entry(block.size()).or_default().push(block);
        Ok(())
    }

    /// Hand every cached block back to the host. Returns how many were freed.
    fn evict(&self, state: &mut PoolState) -> usize {
        let free = std::mem::take(&mut state.free);
        free.into_values().flatten().map(|block| self.free_block(block)).count()
    }

    fn free_block(&self, block: Block) {
        // SAFETY: every block was produced by `self.memory` with exactly this layout and is
        // removed from the pool before being freed.
        unsafe { self.memory.free(block.ptr, block.layout) }
    }

    fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            live_blocks: state.live.len(),
            live_bytes: state.live.values().map(Block::size).sum(),
            cached_blocks: state.free.values().map(Vec::len).sum(),
            cached_bytes: state.free.iter().map(|(size, blocks)| size * blocks.len()).sum(),
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        let state = std::mem::take(self.state.get_mut());
        if !state.live.is_empty() {
            tracing::warn!(
                leaked = state.live.len(),
                allocator = %self.name,
                "allocator dropped while buffers are alive, force-freeing their memory"
            );
        }

        for block in state.free.into_values().flatten().chain(state.live.into_values()) {
            self.free_block(block);
        }
        tracing::debug!(allocator = %self.name, "allocator torn down");
    }
}

/// CPU allocator that caches returned blocks for reuse.
///
/// Cloning shares the same pool. All bookkeeping of one pool sits behind a single mutex.
#[derive(Debug, Clone)]
pub struct CachingAllocator {
    pool: Arc<Pool>,
}

impl CachingAllocator {
    pub fn new() -> Self {
        Self::with_config(AllocatorConfig::default())
    }

    pub fn with_config(config: AllocatorConfig) -> Self {
        Self::with_memory(config, Arc::new(SystemMemory))
    }

    /// Create an allocator drawing from a custom host memory source.
    pub fn with_memory(config: AllocatorConfig, memory: Arc<dyn HostMemory>) -> Self {
        let device = Device::cpu();
        let name = format!("{device}/{}", memory.name());
        tracing::debug!(allocator = %name, alignment = config.alignment(), "creating caching allocator");

        let pool = Pool { name, device, config, memory, state: Mutex::new(PoolState::default()) };
        Self { pool: Arc::new(pool) }
    }

    /// Move a live block back into the pool.
    ///
    /// Fails for a null pointer and for pointers this allocator does not currently own.
    pub fn return_mem(&self, ptr: *mut u8) -> Result<()> {
        self.pool.return_mem(ptr)
    }

    /// Free every cached block. Returns how many blocks were handed back to the host.
    pub fn release_cached(&self) -> usize {
        let mut state = self.pool.state.lock();
        self.pool.evict(&mut state)
    }

    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.pool.config
    }
}

impl Default for CachingAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Allocator for CachingAllocator {
    fn allocate(&self, size: usize) -> Result<Buffer> {
        self.pool.allocate(size)
    }

    fn device(&self) -> Device {
        self.pool.device
    }

    fn name(&self) -> &str {
        &self.pool.name
    }
}
