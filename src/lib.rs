//! binboost: stochastic gradient-boosted decision trees for Rust.
//!
//! A trainer and evaluator for binary classification (signal vs. background)
//! over equal-frequency binned features. Continuous inputs are quantized once
//! into small integer bins; all training passes then run over cumulative
//! per-bin histograms, so split search costs O(bins) instead of O(events).
//!
//! # Key Types
//!
//! - [`FeatureBinning`] - Equal-frequency quantile binning with a missing bin
//! - [`EventSample`] - Column store of binned events, weights and flags
//! - [`TreeBuilder`] / [`ForestBuilder`] - Layer-synchronous training
//! - [`Tree`] / [`Forest`] - Frozen evaluators
//! - [`GbdtConfig`] - End-to-end configuration for [`fit`]
//!
//! # Training
//!
//! Use [`fit`] for the end-to-end path (binning + boosting), or assemble an
//! [`EventSample`] yourself and drive [`ForestBuilder`] directly. See the
//! [`model`] module for details.
//!
//! # Persistence
//!
//! Trained forests round-trip exactly through the whitespace-separated text
//! format in the [`io`] module.

// Re-export approx traits for users who want to compare predictions
pub use approx;

pub mod binning;
pub mod data;
pub mod error;
pub mod io;
pub mod model;
pub mod repr;
pub mod testing;
pub mod training;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// Binning layer
pub use binning::{BinValue, FeatureBinning};

// Data layer
pub use data::{EventFlags, EventSample, EventValues, EventWeights};
pub use error::DataError;

// Training
pub use training::{
    BoostingParams, CumulativeDistributions, ForestBuilder, ForestFit, Parallelism, TreeBuilder,
    TrainingLogger, Verbosity,
};

// Frozen model types
pub use repr::{Cut, Forest, Tree};

// End-to-end model layer
pub use model::{fit, GbdtConfig};
