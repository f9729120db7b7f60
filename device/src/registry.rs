use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::allocator::{Allocator, CachingAllocator};
use crate::config::AllocatorConfig;
use crate::device::{Device, DeviceIndex, DeviceType};
use crate::error::Result;

/// Map from device identity to the allocator serving it.
///
/// A fresh registry already serves the CPU device with a [`CachingAllocator`].
pub struct AllocatorRegistry {
    allocators: RwLock<HashMap<Device, Arc<dyn Allocator>>>,
}

impl AllocatorRegistry {
    pub fn new() -> Self {
        Self::with_cpu_config(AllocatorConfig::default())
    }

    /// Registry whose CPU allocator uses `config`.
    pub fn with_cpu_config(config: AllocatorConfig) -> Self {
        let cpu: Arc<dyn Allocator> = Arc::new(CachingAllocator::with_config(config));
        Self { allocators: RwLock::new(HashMap::from([(Device::cpu(), cpu)])) }
    }

    /// Look up the allocator for `(kind, index)`. Unknown devices yield `None` and a warning.
    pub fn get(&self, kind: DeviceType, index: DeviceIndex) -> Option<Arc<dyn Allocator>> {
        let device = match Device::new(kind, index) {
            Ok(device) => device,
            Err(err) => {
                tracing::warn!(%err, %kind, index, "no allocator for invalid device");
                return None;
            }
        };
        self.get_device(&device)
    }

    pub fn get_device(&self, device: &Device) -> Option<Arc<dyn Allocator>> {
        let allocator = self.allocators.read().get(device).map(Arc::clone);
        if allocator.is_none() {
            tracing::warn!(%device, "no allocator registered for device");
        }
        allocator
    }

    /// Parse a device string and look up its allocator.
    pub fn get_str(&self, device: &str) -> Result<Option<Arc<dyn Allocator>>> {
        let device = Device::parse(device)?;
        Ok(self.get_device(&device))
    }

    /// Install `allocator` for `device`, returning the one it replaces.
    pub fn register(&self, device: Device, allocator: Arc<dyn Allocator>) -> Option<Arc<dyn Allocator>> {
        tracing::debug!(%device, allocator = allocator.name(), "registering allocator");
        self.allocators.write().insert(device, allocator)
    }

    /// Registered devices, sorted.
    pub fn devices(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.allocators.read().keys().copied().collect();
        devices.sort_unstable();
        devices
    }
}

impl Default for AllocatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global allocator registry instance.
static REGISTRY: Lazy<AllocatorRegistry> =
    Lazy::new(|| AllocatorRegistry::with_cpu_config(AllocatorConfig::from_env()));

/// Get the global allocator registry.
pub fn registry() -> &'static AllocatorRegistry {
    &REGISTRY
}

/// Convenience function to get the CPU allocator.
pub fn cpu() -> Arc<dyn Allocator> {
    let allocator = registry().allocators.read().get(&Device::cpu()).map(Arc::clone);
    allocator.unwrap_or_else(|| {
        tracing::warn!("global registry has no CPU allocator, creating a detached one");
        Arc::new(CachingAllocator::new())
    })
}
