use crate::{Allocator, Buffer, CachingAllocator, Device, Error, PoolStats, deallocate};

#[test]
fn test_copy_round_trip() {
    let allocator = CachingAllocator::new();
    let mut buffer = allocator.allocate(8).unwrap();

    buffer.copyin(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
    let mut out = [0u8; 8];
    buffer.copyout(&mut out).unwrap();

    assert_eq!(out, [1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn test_copy_length_mismatch() {
    let allocator = CachingAllocator::new();
    let mut buffer = allocator.allocate(8).unwrap();

    let err = buffer.copyin(&[0; 4]).unwrap_err();
    assert!(matches!(err, Error::SizeMismatch { expected: 8, actual: 4 }), "unexpected error: {err}");

    let mut out = [0u8; 16];
    let err = buffer.copyout(&mut out).unwrap_err();
    assert!(matches!(err, Error::SizeMismatch { expected: 8, actual: 16 }), "unexpected error: {err}");
}

#[test]
fn test_copy_after_allocator_teardown() {
    let allocator = CachingAllocator::new();
    let mut buffer = allocator.allocate(4).unwrap();
    drop(allocator);

    assert!(buffer.release_context().is_some_and(|context| !context.allocator_alive()));
    let err = buffer.copyin(&[0; 4]).unwrap_err();
    assert!(matches!(err, Error::AllocatorGone { .. }), "unexpected error: {err}");
}

#[test]
fn test_empty_buffer() {
    let mut buffer = Buffer::empty(Device::cpu());

    assert!(buffer.is_empty());
    assert!(buffer.as_mut_ptr().is_null());
    assert!(buffer.release_context().is_none());
    buffer.copyin(&[]).unwrap();
    buffer.copyout(&mut []).unwrap();
    buffer.release().unwrap();
}

#[test]
fn test_release_returns_block() {
    let allocator = CachingAllocator::new();
    let buffer = allocator.allocate(24).unwrap();
    assert_eq!(allocator.stats().live_blocks, 1);

    buffer.release().unwrap();
    assert_eq!(allocator.stats(), PoolStats { cached_blocks: 1, cached_bytes: 24, ..Default::default() });
}

#[test]
fn test_deallocate_without_context() {
    deallocate(None).unwrap();
}

#[test]
fn test_release_context_describes_block() {
    let allocator = CachingAllocator::new();
    drop(allocator.allocate(96).unwrap());
    let buffer = allocator.allocate(40).unwrap();

    let context = buffer.release_context().unwrap();
    assert_eq!(context.address(), buffer.as_ptr().addr());
    assert_eq!(context.capacity(), 96);
    assert!(context.allocator_alive());
}

#[test]
fn test_buffer_moves_across_threads() {
    let allocator = CachingAllocator::new();
    let mut buffer = allocator.allocate(3).unwrap();
    buffer.copyin(b"abc").unwrap();

    let out = std::thread::spawn(move || {
        let mut out = [0u8; 3];
        buffer.copyout(&mut out).unwrap();
        out
    })
    .join()
    .unwrap();

    assert_eq!(&out, b"abc");
    assert_eq!(allocator.stats().cached_blocks, 1);
}
