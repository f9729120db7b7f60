//! Strided views over an external data region.
//!
//! Every operation returns a new [`TensorView`] and leaves the receiver untouched. Only shape,
//! stride and offset change; the data the view describes is never read or written.

use smallvec::SmallVec;
use snafu::{OptionExt, ensure};

use crate::error::*;
use crate::pack::{MAX_INLINE_RANK, ViewPack};

/// Scratch storage for per-axis values built by view operations.
pub type Dims = SmallVec<[i64; MAX_INLINE_RANK]>;

/// Row-major strides for `shape`. Axes of size 0 count as size 1 so the strides stay usable.
pub fn contiguous_strides(shape: &[i64]) -> Result<Dims> {
    let mut strides: Dims = SmallVec::from_elem(1, shape.len());
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1]
            .checked_mul(shape[axis + 1].max(1))
            .context(OverflowSnafu { operation: "contiguous_strides", axis })?;
    }
    Ok(strides)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TensorView {
    offset: i64,
    pack: ViewPack,
}

impl TensorView {
    /// Row-major view of `shape` starting at element 0.
    pub fn contiguous(shape: &[i64]) -> Result<Self> {
        check_dims("contiguous", shape)?;
        Self::from_dims(shape, &contiguous_strides(shape)?, 0)
    }

    /// Fails when a size is negative or the element count does not fit in an `i64`.
    pub fn new(shape: &[i64], stride: &[i64], offset: i64) -> Result<Self> {
        check_dims("new", shape)?;
        Ok(Self { offset, pack: ViewPack::from_parts(shape, stride)? })
    }

    fn from_dims(shape: &[i64], stride: &[i64], offset: i64) -> Result<Self> {
        Ok(Self { offset, pack: ViewPack::from_parts(shape, stride)? })
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn shape(&self) -> &[i64] {
        self.pack.shape()
    }

    pub fn stride(&self) -> &[i64] {
        self.pack.stride()
    }

    pub fn rank(&self) -> usize {
        self.pack.rank()
    }

    pub fn numel(&self) -> i64 {
        self.pack.numel()
    }

    pub fn pack(&self) -> &ViewPack {
        &self.pack
    }

    /// True for row-major layouts. Views with no axes or with an empty axis count as contiguous.
    pub fn is_contiguous(&self) -> bool {
        let (shape, stride) = (self.shape(), self.stride());
        if shape.is_empty() || shape.contains(&0) {
            return true;
        }

        let last = shape.len() - 1;
        stride[last] == 1 && (0..last).all(|axis| stride[axis + 1].checked_mul(shape[axis + 1]) == Some(stride[axis]))
    }

    /// Element offset of `indices`. Negative indices count from the end of their axis.
    pub fn get_indices_offset(&self, indices: &[i64]) -> Result<i64> {
        ensure!(indices.len() == self.rank(), IndexCountMismatchSnafu { expected: self.rank(), actual: indices.len() });

        let mut offset = self.offset;
        for (axis, ((&index, &size), &stride)) in indices.iter().zip(self.shape()).zip(self.stride()).enumerate() {
            let normalized = if index < 0 { index + size } else { index };
            ensure!((0..size).contains(&normalized), IndexOutOfRangeSnafu { axis, index, size });
            offset = normalized
                .checked_mul(stride)
                .and_then(|step| offset.checked_add(step))
                .context(OverflowSnafu { operation: "get_indices_offset", axis })?;
        }
        Ok(offset)
    }

    /// Reorder the axes: axis `i` of the result is axis `axes[i]` of `self`.
    pub fn permute(&self, axes: &[usize]) -> Result<Self> {
        self.check_arguments("permute", axes.len())?;

        let mut seen: SmallVec<[bool; MAX_INLINE_RANK]> = SmallVec::from_elem(false, axes.len());
        for &axis in axes {
            let slot = seen.get_mut(axis).context(InvalidPermutationSnafu { axes })?;
            ensure!(!*slot, InvalidPermutationSnafu { axes });
            *slot = true;
        }

        let shape: Dims = axes.iter().map(|&axis| self.shape()[axis]).collect();
        let stride: Dims = axes.iter().map(|&axis| self.stride()[axis]).collect();
        Self::from_dims(&shape, &stride, self.offset)
    }

    /// Broadcast axes of size 1 to `shape`. Broadcast axes get stride 0.
    pub fn expand(&self, shape: &[i64]) -> Result<Self> {
        let (expected, actual) = (self.rank(), shape.len());
        ensure!(expected == actual, ExpandDimensionMismatchSnafu { expected, actual });
        check_dims("expand", shape)?;

        let mut stride: Dims = self.stride().into();
        for (axis, (&from, &to)) in self.shape().iter().zip(shape).enumerate() {
            if from == to {
                continue;
            }
            ensure!(from == 1, ExpandInvalidDimensionSnafu { axis, from, to });
            stride[axis] = 0;
        }
        Self::from_dims(shape, &stride, self.offset)
    }

    /// Narrow each axis to the half-open range `[start, end)`. Negative bounds count from the end
    /// of the axis.
    pub fn shrink(&self, ranges: &[(i64, i64)]) -> Result<Self> {
        self.check_arguments("shrink", ranges.len())?;

        let mut shape: Dims = self.shape().into();
        let mut offset = self.offset;
        for (axis, (&(start, end), &stride)) in ranges.iter().zip(self.stride()).enumerate() {
            let size = shape[axis];
            let begin = if start < 0 { start + size } else { start };
            let stop = if end < 0 { end + size } else { end };
            ensure!(0 <= begin && begin <= stop && stop <= size, ShrinkOutOfBoundsSnafu { axis, start, end, size });

            shape[axis] = stop - begin;
            offset = begin
                .checked_mul(stride)
                .and_then(|step| offset.checked_add(step))
                .context(OverflowSnafu { operation: "shrink", axis })?;
        }
        Self::from_dims(&shape, self.stride(), offset)
    }

    /// Take every `steps[i]`-th element along axis `i`. A negative step walks the axis backwards
    /// from its last element.
    pub fn strided(&self, steps: &[i64]) -> Result<Self> {
        self.check_arguments("strided", steps.len())?;

        let mut shape: Dims = self.shape().into();
        let mut stride: Dims = self.stride().into();
        let mut offset = self.offset;
        for (axis, &step) in steps.iter().enumerate() {
            ensure!(step != 0, ZeroStepSnafu { axis });
            let overflow = OverflowSnafu { operation: "strided", axis };
            let magnitude = step.checked_abs().context(overflow)?;

            let size = shape[axis];
            if step < 0 && size > 0 {
                offset = (size - 1)
                    .checked_mul(stride[axis])
                    .and_then(|last| offset.checked_add(last))
                    .context(overflow)?;
            }
            shape[axis] = if size == 0 { 0 } else { (size - 1) / magnitude + 1 };
            stride[axis] = stride[axis].checked_mul(step).context(overflow)?;
        }
        Self::from_dims(&shape, &stride, offset)
    }

    /// Grow each axis by `(before, after)` elements. The new positions are not backed by the
    /// original data; the offset moves back to address the first padded element.
    pub fn pad(&self, paddings: &[(i64, i64)]) -> Result<Self> {
        self.check_arguments("pad", paddings.len())?;

        let mut shape: Dims = self.shape().into();
        let mut offset = self.offset;
        for (axis, (&(before, after), &stride)) in paddings.iter().zip(self.stride()).enumerate() {
            ensure!(before >= 0 && after >= 0, PadNegativeSnafu { axis, before, after });
            let overflow = OverflowSnafu { operation: "pad", axis };
            let size = before.checked_add(after).and_then(|grow| shape[axis].checked_add(grow)).context(overflow)?;
            shape[axis] = size;
            offset = before.checked_mul(stride).and_then(|back| offset.checked_sub(back)).context(overflow)?;
        }
        checked_numel("pad", &shape)?;
        Self::from_dims(&shape, self.stride(), offset)
    }

    /// View the same elements under `shape`. One entry may be `-1` and is inferred from the
    /// element count.
    ///
    /// Only contiguous views and single-element views can be reshaped without a copy.
    pub fn reshape(&self, shape: &[i64]) -> Result<Self> {
        let shape = self.resolve_reshape(shape)?;

        let (from, to) = (self.numel(), checked_numel("reshape", &shape)?);
        ensure!(from == to, ReshapeSizeMismatchSnafu { from, to });
        ensure!(
            self.is_contiguous() || from == 1,
            ReshapeNonContiguousSnafu { shape: self.shape().to_vec(), stride: self.stride().to_vec() }
        );

        Self::from_dims(&shape, &contiguous_strides(&shape)?, self.offset)
    }

    /// Replace a single `-1` with the size that keeps the element count.
    fn resolve_reshape(&self, shape: &[i64]) -> Result<Dims> {
        ensure!(shape.iter().filter(|&&size| size == -1).count() <= 1, MultipleInferDimensionsSnafu);
        for &dim in shape {
            ensure!(dim >= -1, NegativeDimensionSnafu { dim });
        }

        let mut resolved: Dims = shape.into();
        if let Some(position) = shape.iter().position(|&size| size == -1) {
            let known: Dims = shape.iter().map(|&size| if size == -1 { 1 } else { size }).collect();
            let known = checked_numel("reshape", &known)?;
            let total = self.numel();
            ensure!(known != 0 && total % known == 0, ReshapeSizeMismatchSnafu { from: total, to: known });
            resolved[position] = total / known;
        }
        Ok(resolved)
    }

    fn check_arguments(&self, operation: &'static str, actual: usize) -> Result<()> {
        ensure!(actual == self.rank(), ArgumentCountMismatchSnafu { operation, expected: self.rank(), actual });
        Ok(())
    }
}

/// Reject negative sizes and shapes whose element count leaves the `i64` range.
fn check_dims(operation: &'static str, shape: &[i64]) -> Result<()> {
    if let Some(&dim) = shape.iter().find(|&&dim| dim < 0) {
        return NegativeDimensionSnafu { dim }.fail();
    }
    checked_numel(operation, shape).map(drop)
}

/// Element count of `shape`. Fails at the axis where the running product overflows, unless some
/// axis is empty.
fn checked_numel(operation: &'static str, shape: &[i64]) -> Result<i64> {
    if shape.contains(&0) {
        return Ok(0);
    }
    shape.iter().enumerate().try_fold(1i64, |numel, (axis, &size)| {
        numel.checked_mul(size).context(OverflowSnafu { operation, axis })
    })
}
