use test_case::test_case;

use crate::memory::PLAIN_ALIGNMENT;
use crate::{Error, MEMORY_ALIGNMENT, block_layout};

#[test_case(MEMORY_ALIGNMENT * 2, MEMORY_ALIGNMENT ; "multiple of the alignment")]
#[test_case(MEMORY_ALIGNMENT + 1, PLAIN_ALIGNMENT ; "odd size")]
#[test_case(3, PLAIN_ALIGNMENT ; "smaller than the alignment")]
fn test_block_layout(size: usize, align: usize) {
    let layout = block_layout(size, MEMORY_ALIGNMENT).unwrap();
    assert_eq!(layout.size(), size);
    assert_eq!(layout.align(), align);
}

#[test_case(0 ; "zero")]
#[test_case(48 ; "not a power of two")]
fn test_block_layout_rejects_alignment(alignment: usize) {
    let err = block_layout(96, alignment).unwrap_err();
    assert!(matches!(err, Error::InvalidLayout { size: 96, .. }), "unexpected error: {err}");
}
