use tessera_intrusive::{Intrusive, IntrusiveTarget};

use crate::allocator::Allocator;
use crate::buffer::Buffer;
use crate::device::Device;
use crate::error::Result;

/// Buffer shared by every tensor view that addresses it.
///
/// The buffer goes back to its allocator as soon as the last strong handle is dropped, even if
/// weak handles keep the storage block itself around.
#[derive(Debug)]
pub struct Storage {
    buffer: Buffer,
}

impl Storage {
    /// Allocate `nbytes` from `allocator` and wrap them in a shared handle.
    pub fn allocate(allocator: &dyn Allocator, nbytes: usize) -> Result<Intrusive<Storage>> {
        let buffer = allocator.allocate(nbytes)?;
        tracing::trace!(nbytes, device = %buffer.device(), allocator = allocator.name(), "allocated storage");
        Ok(Self::from_buffer(buffer))
    }

    pub fn from_buffer(buffer: Buffer) -> Intrusive<Storage> {
        Intrusive::new(Self { buffer })
    }

    pub fn nbytes(&self) -> usize {
        self.buffer.size()
    }

    pub fn device(&self) -> Device {
        self.buffer.device()
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Mutable access, reachable through [`Intrusive::get_mut`] while the handle is unique.
    pub fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }
}

impl IntrusiveTarget for Storage {
    fn release_resources(&mut self) {
        let device = self.buffer.device();
        let buffer = std::mem::replace(&mut self.buffer, Buffer::empty(device));
        if let Err(err) = buffer.release() {
            tracing::error!(%err, %device, "failed to release storage buffer");
        }
    }
}
