use std::sync::Arc;

use crate::{Allocator, AllocatorRegistry, CachingAllocator, Device, DeviceType, Error, cpu, registry};

#[test]
fn test_new_registry_serves_cpu() {
    let registry = AllocatorRegistry::new();

    let allocator = registry.get(DeviceType::Cpu, 0).unwrap();
    assert_eq!(allocator.device(), Device::cpu());
    assert_eq!(registry.devices(), vec![Device::cpu()]);
}

#[test]
fn test_missing_device() {
    let registry = AllocatorRegistry::new();

    assert!(registry.get(DeviceType::Cuda, 0).is_none());
    assert!(registry.get(DeviceType::Cpu, 1).is_none());
}

#[test]
fn test_get_str() {
    let registry = AllocatorRegistry::new();

    assert!(registry.get_str("cpu").unwrap().is_some());
    assert!(registry.get_str("").unwrap().is_some());
    assert!(registry.get_str("metal").unwrap().is_none());

    let err = registry.get_str("tpu:0").unwrap_err();
    assert!(matches!(err, Error::UnknownDeviceType { .. }), "{err}");
}

#[test]
fn test_register_replaces() {
    let registry = AllocatorRegistry::new();
    let cuda = Device::parse("cuda").unwrap();
    let first: Arc<dyn Allocator> = Arc::new(CachingAllocator::new());
    let second: Arc<dyn Allocator> = Arc::new(CachingAllocator::new());

    assert!(registry.register(cuda, Arc::clone(&first)).is_none());
    let previous = registry.register(cuda, Arc::clone(&second)).unwrap();

    assert!(Arc::ptr_eq(&previous, &first));
    assert!(Arc::ptr_eq(&registry.get_device(&cuda).unwrap(), &second));
    assert_eq!(registry.devices(), vec![Device::cpu(), cuda]);
}

#[test]
fn test_global_cpu_allocator() {
    let allocator = cpu();
    let registered = registry().get_device(&Device::cpu()).unwrap();

    assert!(Arc::ptr_eq(&allocator, &registered));
    let buffer = allocator.allocate(8).unwrap();
    assert_eq!(buffer.device(), Device::cpu());
}

#[test]
fn test_concurrent_lookups() {
    let handles: Vec<_> = (0..8)
        .map(|_| std::thread::spawn(|| Arc::as_ptr(&cpu()).cast::<()>() as usize))
        .collect();

    let addresses: Vec<usize> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();
    assert!(addresses.windows(2).all(|pair| pair[0] == pair[1]));
}
