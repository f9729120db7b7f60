use test_case::test_case;

use crate::{Error, MAX_INLINE_RANK, ViewPack};

#[test]
fn test_default_is_rank_zero() {
    let pack = ViewPack::default();
    assert_eq!(pack.rank(), 0);
    assert!(pack.shape().is_empty());
    assert_eq!(pack.numel(), 1);
    assert!(pack.is_inline());
}

#[test_case(&[2, 3, 4], 24 ; "three axes")]
#[test_case(&[7], 7 ; "one axis")]
#[test_case(&[3, 0, 5], 0 ; "empty axis")]
#[test_case(&[1, 2, 1, 2, 1, 2, 1], 8 ; "heap rank")]
#[test_case(&[1 << 40, 1 << 40], i64::MAX ; "saturates")]
#[test_case(&[1 << 40, 1 << 40, 0], 0 ; "saturated then empty")]
fn test_numel(shape: &[i64], expected: i64) {
    assert_eq!(ViewPack::from_shape(shape).numel(), expected);
}

#[test]
fn test_numel_invalidated_by_shape_change() {
    let mut pack = ViewPack::from_shape(&[2, 3, 4]);
    assert_eq!(pack.numel(), 24);

    pack.set_shape_at(0, 5);
    assert_eq!(pack.numel(), 60);

    pack.set_shape(&[6, 6]);
    assert_eq!(pack.numel(), 36);

    pack.resize(3);
    assert_eq!(pack.numel(), 0);
}

#[test]
fn test_with_rank_is_zeroed() {
    for rank in [0, 3, MAX_INLINE_RANK, MAX_INLINE_RANK + 1, 9] {
        let pack = ViewPack::with_rank(rank);
        assert_eq!(pack.shape(), vec![0; rank].as_slice());
        assert_eq!(pack.stride(), vec![0; rank].as_slice());
        assert_eq!(pack.is_inline(), rank <= MAX_INLINE_RANK);
    }
}

#[test]
fn test_inline_grow_zero_fills() {
    let mut pack = ViewPack::from_parts(&[2, 3, 4], &[12, 4, 1]).unwrap();

    pack.resize(2);
    pack.resize(4);

    assert_eq!(pack.shape(), &[2, 3, 0, 0]);
    assert_eq!(pack.stride(), &[12, 4, 0, 0]);
}

#[test]
fn test_resize_across_heap_threshold_keeps_prefix() {
    let mut pack = ViewPack::from_parts(&[2, 3, 4], &[12, 4, 1]).unwrap();

    pack.resize(7);
    assert!(!pack.is_inline());
    assert_eq!(pack.shape(), &[2, 3, 4, 0, 0, 0, 0]);
    assert_eq!(pack.stride(), &[12, 4, 1, 0, 0, 0, 0]);

    pack.resize(3);
    assert!(pack.is_inline());
    assert_eq!(pack.shape(), &[2, 3, 4]);
    assert_eq!(pack.stride(), &[12, 4, 1]);
}

#[test]
fn test_heap_to_heap_resize() {
    let shape = [1, 2, 3, 4, 5, 6, 7];
    let stride = [11, 12, 13, 14, 15, 16, 17];
    let mut pack = ViewPack::from_parts(&shape, &stride).unwrap();

    pack.resize(9);
    assert_eq!(pack.shape(), &[1, 2, 3, 4, 5, 6, 7, 0, 0]);
    assert_eq!(pack.stride(), &[11, 12, 13, 14, 15, 16, 17, 0, 0]);

    pack.resize(6);
    assert!(!pack.is_inline());
    assert_eq!(pack.shape(), &shape[..6]);
    assert_eq!(pack.stride(), &stride[..6]);
}

#[test]
fn test_set_stride_requires_matching_rank() {
    let mut pack = ViewPack::from_shape(&[2, 3]);

    assert_eq!(pack.set_stride(&[1]), Err(Error::StrideLengthMismatch { expected: 2, actual: 1 }));
    pack.set_stride(&[3, 1]).unwrap();
    assert_eq!(pack.stride(), &[3, 1]);
}

#[test]
fn test_set_shape_keeps_surviving_strides() {
    let mut pack = ViewPack::from_parts(&[2, 3], &[3, 1]).unwrap();

    pack.set_shape(&[4, 5, 6]);
    assert_eq!(pack.shape(), &[4, 5, 6]);
    assert_eq!(pack.stride(), &[3, 1, 0]);
}

#[test]
fn test_single_entry_access() {
    let mut pack = ViewPack::from_parts(&[2, 3], &[3, 1]).unwrap();

    pack.set_stride_at(0, 9);
    assert_eq!(pack.shape_at(1), 3);
    assert_eq!(pack.stride_at(0), 9);
}

#[test]
#[should_panic]
fn test_shape_at_out_of_range() {
    let _ = ViewPack::from_shape(&[2, 3]).shape_at(2);
}

#[test]
fn test_equality_ignores_stale_entries() {
    let mut shrunk = ViewPack::from_parts(&[2, 3, 4], &[12, 4, 1]).unwrap();
    shrunk.resize(2);

    assert_eq!(shrunk, ViewPack::from_parts(&[2, 3], &[12, 4]).unwrap());
    assert_eq!(format!("{shrunk:?}"), "ViewPack { shape: [2, 3], stride: [12, 4] }");
}
