//! Training infrastructure for gradient boosting.
//!
//! This module provides the layer-synchronous training pipeline:
//!
//! - [`CumulativeDistributions`]: per-layer cumulative weight histograms
//! - [`Node`]: split-search state for one tree position
//! - [`TreeBuilder`]: builds one fixed-depth tree over an event sample
//! - [`ForestBuilder`], [`BoostingParams`]: the gradient-boosting outer loop
//! - [`TrainingLogger`], [`Verbosity`]: structured training output
//! - [`Parallelism`]: sequential vs. rayon-partitioned histogram builds

mod cdf;
mod forest_builder;
mod logger;
mod node;
mod tree_builder;

pub use cdf::CumulativeDistributions;
pub use forest_builder::{BoostingParams, ForestBuilder, ForestFit};
pub use logger::{TrainingLogger, Verbosity};
pub use node::{separation_loss, Node};
pub use tree_builder::TreeBuilder;

// =============================================================================
// Parallelism
// =============================================================================

/// How much parallelism training-time histogram construction may use.
///
/// Histogram accumulation is the only parallel region: events are split into
/// contiguous partitions, each partition fills a local histogram, and the
/// partials are reduced additively in partition order. Addition order is
/// therefore fixed, and results are bit-identical to a sequential build.
/// Flag updates stay sequential; each event has exactly one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Parallelism {
    /// Everything on the calling thread (default).
    #[default]
    Sequential,
    /// Partitioned histogram builds on up to `n_threads` rayon workers.
    Parallel {
        /// Upper bound on worker count; 0 means rayon's global default.
        n_threads: usize,
    },
}

impl Parallelism {
    /// Number of event partitions to use for `n_events` events.
    pub(crate) fn n_partitions(self, n_events: usize) -> usize {
        match self {
            Parallelism::Sequential => 1,
            Parallelism::Parallel { n_threads } => {
                let workers = if n_threads == 0 {
                    rayon::current_num_threads()
                } else {
                    n_threads
                };
                workers.clamp(1, n_events.max(1))
            }
        }
    }
}
