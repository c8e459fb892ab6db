//! Error types for sample construction and binning.

/// Errors raised while building binnings or filling an [`EventSample`].
///
/// All of these are synchronous, local failures: the receiver is left
/// unchanged and the call may simply be corrected and retried by the caller.
///
/// [`EventSample`]: crate::data::EventSample
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
    /// More events were added than the sample promised at construction.
    #[error("event capacity exceeded: sample was sized for {capacity} events")]
    CapacityExceeded { capacity: usize },

    /// A value vector does not match the declared feature count.
    #[error("expected {expected} feature values, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A bin index is outside the feature's declared bin range.
    #[error("bin index {bin} out of range for feature {feature} ({n_bins} bins)")]
    InvalidBinIndex { feature: usize, bin: u32, n_bins: u32 },

    /// A binning was requested over a sample with no finite values.
    #[error("cannot compute a binning from an empty or all-NaN sample")]
    EmptySample,
}
