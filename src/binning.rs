//! Equal-frequency feature binning.
//!
//! Continuous feature values are quantized once, up front, into small integer
//! bin indices. A binning with `L` levels produces `2^L` ordinary bins plus a
//! dedicated bin 0 for missing (NaN) values. The `2^L - 1` interior cut
//! points are equal-frequency quantiles of the sorted sample - the median at
//! the root, the quartiles below it, and so on - so each bin holds roughly
//! the same number of events, and they are stored in an implicit
//! binary-search-tree layout: the root threshold sits at index 1 and node `k`
//! has children `2k` and `2k+1`. Mapping a value to its bin is then `L`
//! comparisons, no branching binary search over a sorted array.
//!
//! Array layout for `L` levels (`2^L + 1` stored values):
//!
//! ```text
//! [ min, t_1, t_2, ..., t_{2^L - 1}, max ]
//!        ^-- BST order, root at index 1
//! ```

use serde::{Deserialize, Serialize};

use crate::error::DataError;

// =============================================================================
// BinValue
// =============================================================================

/// Numeric types that can be quantized by a [`FeatureBinning`].
///
/// Implemented for `f32` and `f64`; everything downstream of the binning
/// layer works on integer bin indices, so no further numeric polymorphism
/// is needed.
pub trait BinValue: Copy + PartialOrd {
    /// True if the value denotes missing data.
    fn is_nan(self) -> bool;
}

impl BinValue for f32 {
    #[inline]
    fn is_nan(self) -> bool {
        f32::is_nan(self)
    }
}

impl BinValue for f64 {
    #[inline]
    fn is_nan(self) -> bool {
        f64::is_nan(self)
    }
}

// =============================================================================
// FeatureBinning
// =============================================================================

/// Equal-frequency binning of one continuous feature.
///
/// Immutable after construction. Bin 0 is reserved for NaN; finite values map
/// to bins `1..=2^L`. Values at or below the recorded minimum land in bin 1,
/// values above the recorded maximum (including `+inf`) land in bin `2^L`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureBinning<T> {
    n_levels: u32,
    binning: Vec<T>,
}

impl<T: BinValue> FeatureBinning<T> {
    /// Compute a binning from a data sample.
    ///
    /// NaN entries are skipped. The remaining values are sorted and the
    /// interior thresholds are picked level by level: the node at position
    /// `j` of level `l` covers the equal-frequency range
    /// `[j*n/2^l, (j+1)*n/2^l)` and takes the sample nearest the midpoint
    /// of that range, preferring the lower sample when the midpoint falls
    /// in the lower half of a sample step. With fewer samples than tree
    /// positions the same boundary sample is repeated across neighboring
    /// nodes, so low-statistics features degrade to coarser (but still
    /// valid) binnings.
    ///
    /// Returns [`DataError::EmptySample`] if no finite value remains.
    pub fn from_data(n_levels: u32, data: &[T]) -> Result<Self, DataError> {
        let mut values: Vec<T> = data.iter().copied().filter(|v| !v.is_nan()).collect();
        if values.is_empty() {
            return Err(DataError::EmptySample);
        }
        values.sort_by(|a, b| a.partial_cmp(b).expect("NaNs were filtered"));

        let n = values.len() as u64;
        let size = (1usize << n_levels) + 1;
        let mut binning = vec![values[0]; size];
        binning[size - 1] = values[values.len() - 1];

        let mut position = 1usize;
        for level in 0..n_levels {
            // The midpoint of node j's range is (2j+1)*n / 2^(level+1);
            // snap it to the previous sample unless the remainder reaches
            // half a step (an exact midpoint stays put).
            let denominator = 1u64 << (level + 1);
            for j in 0..(1u64 << level) {
                let numerator = (2 * j + 1) * n;
                let floor = numerator / denominator;
                let remainder = numerator % denominator;
                let index = if remainder != 0 && 2 * remainder < denominator {
                    floor.saturating_sub(1)
                } else {
                    floor
                };
                binning[position] = values[index as usize];
                position += 1;
            }
        }

        Ok(Self { n_levels, binning })
    }

    /// Build a binning from predefined boundaries.
    ///
    /// `boundaries` must hold exactly `2^L + 1` values: the minimum, the
    /// `2^L - 1` interior thresholds (any order), and the maximum. A working
    /// copy is sorted and the interior thresholds are laid back out in BST
    /// order, so passing the array returned by [`binning`](Self::binning)
    /// reproduces the original binning exactly.
    pub fn from_boundaries(n_levels: u32, boundaries: &[T]) -> Result<Self, DataError> {
        let size = (1usize << n_levels) + 1;
        if boundaries.len() != size {
            return Err(DataError::DimensionMismatch {
                expected: size,
                got: boundaries.len(),
            });
        }
        if boundaries.iter().any(|v| v.is_nan()) {
            return Err(DataError::EmptySample);
        }
        let mut sorted = boundaries.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).expect("checked for NaN above"));

        let mut binning = sorted.clone();
        // Interior boundaries are sorted[1..size-1]; 2^L - 1 of them split
        // evenly at every level, so the middle element is always exact.
        fn fill<T: Copy>(binning: &mut [T], sorted: &[T], lo: usize, hi: usize, position: usize) {
            if lo >= hi {
                return;
            }
            let mid = (lo + hi) / 2;
            binning[position] = sorted[mid];
            fill(binning, sorted, lo, mid, 2 * position);
            fill(binning, sorted, mid + 1, hi, 2 * position + 1);
        }
        fill(&mut binning, &sorted, 1, size - 1, 1);

        Ok(Self { n_levels, binning })
    }

    /// Reconstruct a binning from an already BST-ordered array, without
    /// sorting. Used by the persistence reader, which stores the array
    /// verbatim.
    pub(crate) fn from_raw(n_levels: u32, binning: Vec<T>) -> Result<Self, DataError> {
        let size = (1usize << n_levels) + 1;
        if binning.len() != size {
            return Err(DataError::DimensionMismatch {
                expected: size,
                got: binning.len(),
            });
        }
        Ok(Self { n_levels, binning })
    }

    /// Map a value to its bin index.
    ///
    /// NaN maps to bin 0; every other value (including infinities) maps to a
    /// bin in `[1, 2^L]` by walking the threshold tree.
    #[inline]
    pub fn value_to_bin(&self, value: T) -> u32 {
        if value.is_nan() {
            return 0;
        }
        let mut node = 1usize;
        for _ in 0..self.n_levels {
            node = 2 * node + usize::from(!(value < self.binning[node]));
        }
        (node - (1usize << self.n_levels) + 1) as u32
    }

    /// Number of bins, counting the NaN bin: `2^L + 1`.
    #[inline]
    pub fn n_bins(&self) -> u32 {
        (1u32 << self.n_levels) + 1
    }

    /// Number of binning levels.
    #[inline]
    pub fn n_levels(&self) -> u32 {
        self.n_levels
    }

    /// Smallest finite value observed when the binning was computed.
    #[inline]
    pub fn min(&self) -> T {
        self.binning[0]
    }

    /// Largest finite value observed when the binning was computed.
    #[inline]
    pub fn max(&self) -> T {
        self.binning[self.binning.len() - 1]
    }

    /// The stored boundary array: `[min, BST thresholds, max]`.
    #[inline]
    pub fn binning(&self) -> &[T] {
        &self.binning
    }
}

// =============================================================================
// Tests
// =============================================================================
