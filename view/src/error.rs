use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("stride has {actual} entries but the view has rank {expected}"))]
    StrideLengthMismatch { expected: usize, actual: usize },

    #[snafu(display("got {actual} indices for a view of rank {expected}"))]
    IndexCountMismatch { expected: usize, actual: usize },

    #[snafu(display("index {index} is out of range for axis {axis} of size {size}"))]
    IndexOutOfRange { axis: usize, index: i64, size: i64 },

    #[snafu(display("invalid permutation {axes:?}: expected each axis of 0..{} exactly once", axes.len()))]
    InvalidPermutation { axes: Vec<usize> },

    #[snafu(display("expand dimension mismatch: view has {expected} dimensions, target has {actual}"))]
    ExpandDimensionMismatch { expected: usize, actual: usize },

    /// Only axes of size 1 can be broadcast.
    #[snafu(display("cannot expand axis {axis} from size {from} to {to} (can only expand from 1)"))]
    ExpandInvalidDimension { axis: usize, from: i64, to: i64 },

    #[snafu(display("{operation} expects {expected} arguments, one per axis, got {actual}"))]
    ArgumentCountMismatch { operation: &'static str, expected: usize, actual: usize },

    #[snafu(display("shrink range [{start}, {end}) is out of bounds for axis {axis} of size {size}"))]
    ShrinkOutOfBounds { axis: usize, start: i64, end: i64, size: i64 },

    #[snafu(display("step for axis {axis} is zero"))]
    ZeroStep { axis: usize },

    #[snafu(display("padding ({before}, {after}) for axis {axis} must be non-negative"))]
    PadNegative { axis: usize, before: i64, after: i64 },

    #[snafu(display("dimension size must be non-negative, got {dim}"))]
    NegativeDimension { dim: i64 },

    #[snafu(display("reshape size mismatch: view has {from} elements, target shape has {to}"))]
    ReshapeSizeMismatch { from: i64, to: i64 },

    /// Reshaping a strided view would need a copy.
    #[snafu(display("cannot reshape non-contiguous view with shape {shape:?} and stride {stride:?}"))]
    ReshapeNonContiguous { shape: Vec<i64>, stride: Vec<i64> },

    #[snafu(display("only one dimension can be inferred with -1"))]
    MultipleInferDimensions,

    /// Shape, stride or offset arithmetic left the `i64` range.
    #[snafu(display("{operation} overflows i64 at axis {axis}"))]
    Overflow { operation: &'static str, axis: usize },
}
