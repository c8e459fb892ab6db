//! Packed storage for binned feature values.

use crate::error::DataError;

/// Row-major column store of bin indices: `n_events x n_features` packed
/// into one allocation.
///
/// Each feature carries its own bin count (`2^levels + 1`, bin 0 = missing)
/// and the prefix sums over bin counts used to address per-feature slices of
/// flattened histograms.
#[derive(Debug, Clone)]
pub struct EventValues {
    values: Vec<u32>,
    n_features: usize,
    n_bins: Vec<u32>,
    n_bin_sums: Vec<usize>,
}

impl EventValues {
    /// Allocate storage for `n_events` events with the given per-feature
    /// binning levels. Fails if `n_levels.len() != n_features`.
    pub fn new(n_events: usize, n_features: usize, n_levels: &[u32]) -> Result<Self, DataError> {
        if n_levels.len() != n_features {
            return Err(DataError::DimensionMismatch {
                expected: n_features,
                got: n_levels.len(),
            });
        }
        let n_bins: Vec<u32> = n_levels.iter().map(|&l| (1u32 << l) + 1).collect();
        let mut n_bin_sums = Vec::with_capacity(n_features + 1);
        n_bin_sums.push(0usize);
        for &nb in &n_bins {
            n_bin_sums.push(n_bin_sums.last().unwrap() + nb as usize);
        }
        Ok(Self {
            values: vec![0; n_events * n_features],
            n_features,
            n_bins,
            n_bin_sums,
        })
    }

    /// Store the bin indices of one event.
    ///
    /// Every index must be 0 (missing) or a valid bin below the feature's bin
    /// count; nothing is written if any index is rejected.
    pub fn set(&mut self, event: usize, values: &[u32]) -> Result<(), DataError> {
        if values.len() != self.n_features {
            return Err(DataError::DimensionMismatch {
                expected: self.n_features,
                got: values.len(),
            });
        }
        for (feature, (&v, &n_bins)) in values.iter().zip(&self.n_bins).enumerate() {
            if v >= n_bins {
                return Err(DataError::InvalidBinIndex { feature, bin: v, n_bins });
            }
        }
        let offset = event * self.n_features;
        self.values[offset..offset + self.n_features].copy_from_slice(values);
        Ok(())
    }

    /// Bin index of `event` on `feature`.
    #[inline]
    pub fn get(&self, event: usize, feature: usize) -> u32 {
        self.values[event * self.n_features + feature]
    }

    /// All bin indices of one event.
    #[inline]
    pub fn row(&self, event: usize) -> &[u32] {
        let offset = event * self.n_features;
        &self.values[offset..offset + self.n_features]
    }

    /// Number of features per event.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Per-feature bin counts (`2^levels + 1` each).
    #[inline]
    pub fn n_bins(&self) -> &[u32] {
        &self.n_bins
    }

    /// Prefix sums over bin counts; `n_bin_sums()[f]` is the flat offset of
    /// feature `f` in a concatenated histogram, and the last entry is the
    /// total bin count.
    #[inline]
    pub fn n_bin_sums(&self) -> &[usize] {
        &self.n_bin_sums
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> EventValues {
        let mut values = EventValues::new(8, 4, &[3, 4, 2, 3]).unwrap();
        for i in 0..8u32 {
            let sign = 1 - 2 * (i as i32 % 2);
            let row = [
                i,
                (4 + sign * ((i as i32) + 1) / 2) as u32,
                i % 4 + 1,
                7 - i,
            ];
            values.set(i as usize, &row).unwrap();
        }
        values
    }

    #[test]
    fn set_and_get_round_trip() {
        let values = filled();
        assert_eq!(values.get(0, 0), 0);
        assert_eq!(values.get(1, 1), 3);
        assert_eq!(values.get(6, 2), 3);
        assert_eq!(values.row(7), &[7, 0, 4, 0]);
    }

    #[test]
    fn set_rejects_wrong_arity_and_bad_bins() {
        let mut values = filled();
        assert_eq!(
            values.set(1, &[1, 2, 3, 4, 5]),
            Err(DataError::DimensionMismatch { expected: 4, got: 5 })
        );
        assert_eq!(
            values.set(1, &[1, 20, 3, 1]),
            Err(DataError::InvalidBinIndex { feature: 1, bin: 20, n_bins: 17 })
        );
        // Rejected writes leave the previous row intact.
        assert_eq!(values.get(1, 1), 3);
    }

    #[test]
    fn construction_rejects_levels_arity_mismatch() {
        assert_eq!(
            EventValues::new(8, 3, &[1, 2]).unwrap_err(),
            DataError::DimensionMismatch { expected: 3, got: 2 }
        );
    }

    #[test]
    fn bin_counts_and_prefix_sums() {
        let values = filled();
        assert_eq!(values.n_features(), 4);
        assert_eq!(values.n_bins(), &[9, 17, 5, 9]);
        assert_eq!(values.n_bin_sums(), &[0, 9, 26, 31, 40]);
    }
}
