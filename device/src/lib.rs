//! Devices, the caching host allocator and the buffers it hands out.
//!
//! A [`Device`] selects an [`Allocator`] from the [`AllocatorRegistry`]; the allocator produces
//! [`Buffer`]s, which go back to the allocator's pool when dropped. A [`Storage`] shares one
//! buffer between several owners through [`tessera_intrusive::Intrusive`].
//!
//! ```
//! use tessera_device::{Allocator, registry};
//!
//! let cpu = registry().get_str("cpu").unwrap().unwrap();
//! let mut buffer = cpu.allocate(16).unwrap();
//! buffer.copyin(&[7; 16]).unwrap();
//! ```

pub mod allocator;
pub mod buffer;
pub mod config;
pub mod device;
pub mod error;
pub mod memory;
pub mod registry;
pub mod storage;


pub use allocator::{Allocator, CachingAllocator, PoolStats};
pub use buffer::{Buffer, ReleaseContext, deallocate};
pub use config::AllocatorConfig;
pub use device::{Device, DeviceIndex, DeviceType};
pub use error::{Error, Result};
pub use memory::{HostMemory, MEMORY_ALIGNMENT, SystemMemory, block_layout};
pub use registry::{AllocatorRegistry, cpu, registry};
pub use storage::Storage;
