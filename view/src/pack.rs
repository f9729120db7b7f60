//! Packed shape and stride storage.
//!
//! Shape and stride share one block of integers, shape first. Views of rank up to
//! [`MAX_INLINE_RANK`] keep that block inline; larger ranks spill it to the heap:
//!
//! ```text
//! inline: [shape[0], .., shape[4], stride[0], .., stride[4]]
//! heap:   [shape[0], .., shape[rank - 1], stride[0], .., stride[rank - 1]]
//! ```

use std::fmt;
use std::sync::OnceLock;

use snafu::ensure;

use crate::error::{Result, StrideLengthMismatchSnafu};

/// Largest rank stored without a heap allocation.
pub const MAX_INLINE_RANK: usize = 5;

const INLINE_LEN: usize = 2 * MAX_INLINE_RANK;

/// Backing block. `Inline` is active exactly when the rank is at most [`MAX_INLINE_RANK`].
#[derive(Clone)]
enum Entries {
    Inline([i64; INLINE_LEN]),
    Heap(Box<[i64]>),
}

#[derive(Clone)]
pub struct ViewPack {
    rank: usize,
    entries: Entries,
    numel: OnceLock<i64>,
}

impl ViewPack {
    /// Pack of the given rank with every shape and stride entry set to zero.
    pub fn with_rank(rank: usize) -> Self {
        let entries = match rank {
            0..=MAX_INLINE_RANK => Entries::Inline([0; INLINE_LEN]),
            _ => Entries::Heap(vec![0; 2 * rank].into_boxed_slice()),
        };
        Self { rank, entries, numel: OnceLock::new() }
    }

    /// Pack holding `shape` with zero strides.
    pub fn from_shape(shape: &[i64]) -> Self {
        let mut pack = Self::with_rank(shape.len());
        pack.shape_mut().copy_from_slice(shape);
        pack
    }

    pub fn from_parts(shape: &[i64], stride: &[i64]) -> Result<Self> {
        let mut pack = Self::from_shape(shape);
        pack.set_stride(stride)?;
        Ok(pack)
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.entries, Entries::Inline(_))
    }

    pub fn shape(&self) -> &[i64] {
        match &self.entries {
            Entries::Inline(entries) => &entries[..self.rank],
            Entries::Heap(entries) => &entries[..self.rank],
        }
    }

    pub fn stride(&self) -> &[i64] {
        match &self.entries {
            Entries::Inline(entries) => &entries[MAX_INLINE_RANK..MAX_INLINE_RANK + self.rank],
            Entries::Heap(entries) => &entries[self.rank..],
        }
    }

    /// # Panics
    ///
    /// Panics if `axis >= rank`.
    pub fn shape_at(&self, axis: usize) -> i64 {
        self.shape()[axis]
    }

    /// # Panics
    ///
    /// Panics if `axis >= rank`.
    pub fn stride_at(&self, axis: usize) -> i64 {
        self.stride()[axis]
    }

    pub fn set_shape_at(&mut self, axis: usize, size: i64) {
        self.shape_mut()[axis] = size;
        self.numel.take();
    }

    pub fn set_stride_at(&mut self, axis: usize, stride: i64) {
        self.stride_mut()[axis] = stride;
    }

    /// Product of the shape entries, cached until the shape changes. A rank-0 pack has one element.
    ///
    /// The product saturates at the `i64` bounds. [`TensorView`](crate::TensorView) never builds a
    /// pack whose count does not fit.
    pub fn numel(&self) -> i64 {
        *self.numel.get_or_init(|| self.shape().iter().fold(1, |numel, &size| numel.saturating_mul(size)))
    }

    /// Resize to `shape.len()` and copy `shape` in. Strides of surviving axes are kept.
    pub fn set_shape(&mut self, shape: &[i64]) {
        self.resize(shape.len());
        self.shape_mut().copy_from_slice(shape);
        self.numel.take();
    }

    /// Replace the strides. The rank does not change, so `stride` must have one entry per axis.
    pub fn set_stride(&mut self, stride: &[i64]) -> Result<()> {
        ensure!(stride.len() == self.rank, StrideLengthMismatchSnafu { expected: self.rank, actual: stride.len() });
        self.stride_mut().copy_from_slice(stride);
        Ok(())
    }

    /// Change the rank, keeping the leading `min(old, new)` shape and stride entries. Newly exposed
    /// entries read as zero.
    pub fn resize(&mut self, rank: usize) {
        if rank == self.rank {
            return;
        }

        if rank <= MAX_INLINE_RANK && self.is_inline() {
            // Shrinking leaves the tail in place; it is unreachable until a later grow clears it.
            if let Entries::Inline(entries) = &mut self.entries
                && rank > self.rank
            {
                entries[self.rank..rank].fill(0);
                entries[MAX_INLINE_RANK + self.rank..MAX_INLINE_RANK + rank].fill(0);
            }
        } else {
            self.entries = self.relocate(rank);
        }

        self.rank = rank;
        self.numel.take();
    }

    /// Fresh backing block for `rank` holding the overlapping prefix of the current entries.
    fn relocate(&self, rank: usize) -> Entries {
        let keep = self.rank.min(rank);
        let (shape, stride) = (&self.shape()[..keep], &self.stride()[..keep]);

        if rank <= MAX_INLINE_RANK {
            let mut entries = [0; INLINE_LEN];
            entries[..keep].copy_from_slice(shape);
            entries[MAX_INLINE_RANK..MAX_INLINE_RANK + keep].copy_from_slice(stride);
            Entries::Inline(entries)
        } else {
            tracing::trace!(from = self.rank, to = rank, "view pack spills to the heap");
            let mut entries = vec![0; 2 * rank].into_boxed_slice();
            entries[..keep].copy_from_slice(shape);
            entries[rank..rank + keep].copy_from_slice(stride);
            Entries::Heap(entries)
        }
    }

    fn shape_mut(&mut self) -> &mut [i64] {
        let rank = self.rank;
        match &mut self.entries {
            Entries::Inline(entries) => &mut entries[..rank],
            Entries::Heap(entries) => &mut entries[..rank],
        }
    }

    fn stride_mut(&mut self) -> &mut [i64] {
        let rank = self.rank;
        match &mut self.entries {
            Entries::Inline(entries) => &mut entries[MAX_INLINE_RANK..MAX_INLINE_RANK + rank],
            Entries::Heap(entries) => &mut entries[rank..],
        }
    }
}

impl Default for ViewPack {
    fn default() -> Self {
        Self::with_rank(0)
    }
}

impl PartialEq for ViewPack {
    fn eq(&self, other: &Self) -> bool {
        self.shape() == other.shape() && self.stride() == other.stride()
    }
}

impl Eq for ViewPack {}

impl fmt::Debug for ViewPack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewPack").field("shape", &self.shape()).field("stride", &self.stride()).finish()
    }
}
