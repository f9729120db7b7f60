use tessera_intrusive::Intrusive;

use crate::{Allocator, CachingAllocator, Device, PoolStats, Storage};

#[test]
fn test_allocate_storage() {
    let allocator = CachingAllocator::new();
    let storage = Storage::allocate(&allocator, 64).unwrap();

    assert_eq!(storage.nbytes(), 64);
    assert_eq!(storage.device(), Device::cpu());
    assert!(!storage.buffer().is_empty());
}

#[test]
fn test_buffer_released_with_last_strong_handle() {
    let allocator = CachingAllocator::new();
    let storage = Storage::allocate(&allocator, 32).unwrap();
    let shared = storage.clone();
    let weak = storage.downgrade();

    drop(storage);
    assert_eq!(allocator.stats().live_blocks, 1);

    drop(shared);
    assert!(weak.lock().is_none());
    assert_eq!(allocator.stats(), PoolStats { cached_blocks: 1, cached_bytes: 32, ..Default::default() });
}

#[test]
fn test_unique_storage_is_writable() {
    let allocator = CachingAllocator::new();
    let mut storage = Storage::allocate(&allocator, 4).unwrap();

    storage.get_mut().unwrap().buffer_mut().copyin(&[9, 8, 7, 6]).unwrap();

    let view = storage.clone();
    assert!(storage.get_mut().is_none());
    let mut out = [0u8; 4];
    view.buffer().copyout(&mut out).unwrap();
    assert_eq!(out, [9, 8, 7, 6]);
}

#[test]
fn test_storage_from_buffer() {
    let allocator = CachingAllocator::new();
    let storage: Intrusive<Storage> = Storage::from_buffer(allocator.allocate(16).unwrap());

    assert!(storage.is_unique());
    assert_eq!(storage.nbytes(), 16);
}

#[test]
fn test_empty_storage() {
    let allocator = CachingAllocator::new();
    let storage = Storage::allocate(&allocator, 0).unwrap();

    assert_eq!(storage.nbytes(), 0);
    drop(storage);
    assert_eq!(allocator.stats(), PoolStats::default());
}
