//! Per-layer cumulative weight distributions.

use ndarray::Array3;
use rayon::prelude::*;

use crate::data::EventSample;
use crate::training::Parallelism;

/// Index of the signal class on the class axis.
const SIGNAL: usize = 0;
/// Index of the background class on the class axis.
const BACKGROUND: usize = 1;

/// Cumulative signal/background weight distributions for one tree layer.
///
/// For every node at the layer, every class and every feature, the table
/// holds the running sum of effective event weight over bins: entry
/// `(node, class, n_bin_sums[f] + b)` is the weight mass with bin <= `b` on
/// feature `f`. Bin 0 (missing values) is deliberately left out of the
/// prefix sum; it keeps its raw mass and is consulted only by callers that
/// explicitly ask for the NaN bin, so split search over finite thresholds
/// never sees it.
#[derive(Debug, Clone)]
pub struct CumulativeDistributions {
    cdf: Array3<f64>,
    n_bins: Vec<u32>,
    n_bin_sums: Vec<usize>,
    n_nodes: usize,
}

impl CumulativeDistributions {
    /// Build the distributions for `layer` from the currently flagged
    /// events.
    pub fn new(layer: u32, sample: &EventSample) -> Self {
        Self::with_parallelism(layer, sample, Parallelism::Sequential)
    }

    /// Build the distributions, optionally accumulating event partitions on
    /// rayon workers. The partial histograms are merged in partition order,
    /// so the result is identical to the sequential build.
    pub fn with_parallelism(layer: u32, sample: &EventSample, parallelism: Parallelism) -> Self {
        let n_nodes = 1usize << layer;
        let n_bins = sample.values().n_bins().to_vec();
        let n_bin_sums = sample.values().n_bin_sums().to_vec();
        let total_bins = *n_bin_sums.last().unwrap();

        let n_events = sample.n_events();
        let n_partitions = parallelism.n_partitions(n_events);

        let mut cdf = if n_partitions <= 1 {
            let mut raw = Array3::<f64>::zeros((n_nodes, 2, total_bins));
            accumulate(&mut raw, sample, layer, 0, n_events);
            raw
        } else {
            let chunk = (n_events + n_partitions - 1) / n_partitions;
            let partials: Vec<Array3<f64>> = (0..n_partitions)
                .into_par_iter()
                .map(|p| {
                    let begin = p * chunk;
                    let end = ((p + 1) * chunk).min(n_events);
                    let mut local = Array3::<f64>::zeros((n_nodes, 2, total_bins));
                    accumulate(&mut local, sample, layer, begin, end);
                    local
                })
                .collect();
            let mut raw = Array3::<f64>::zeros((n_nodes, 2, total_bins));
            for partial in &partials {
                raw += partial;
            }
            raw
        };

        // Prefix sums over the finite bins; the NaN bin stays raw.
        for node in 0..n_nodes {
            for class in 0..2 {
                for (f, &nb) in n_bins.iter().enumerate() {
                    let offset = n_bin_sums[f];
                    for b in 2..nb as usize {
                        let previous = cdf[(node, class, offset + b - 1)];
                        cdf[(node, class, offset + b)] += previous;
                    }
                }
            }
        }

        Self { cdf, n_bins, n_bin_sums, n_nodes }
    }

    /// Cumulative signal weight at (node-in-layer, feature, bin).
    #[inline]
    pub fn signal(&self, node: usize, feature: usize, bin: u32) -> f64 {
        self.cdf[(node, SIGNAL, self.n_bin_sums[feature] + bin as usize)]
    }

    /// Cumulative background weight at (node-in-layer, feature, bin).
    #[inline]
    pub fn background(&self, node: usize, feature: usize, bin: u32) -> f64 {
        self.cdf[(node, BACKGROUND, self.n_bin_sums[feature] + bin as usize)]
    }

    /// Number of nodes at the layer this table was built for.
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    /// Per-feature bin counts.
    #[inline]
    pub fn n_bins(&self) -> &[u32] {
        &self.n_bins
    }
}

/// Scatter the effective weights of events `[begin, end)` into the raw
/// histogram.
fn accumulate(raw: &mut Array3<f64>, sample: &EventSample, layer: u32, begin: usize, end: usize) {
    let n_nodes = 1i64 << layer;
    let values = sample.values();
    let n_features = values.n_features();
    let n_bin_sums = values.n_bin_sums();
    for event in begin..end {
        let flag = sample.flags().get(event) as i64;
        if flag <= 0 {
            continue;
        }
        let node = flag - n_nodes;
        if node < 0 || node >= n_nodes {
            continue;
        }
        let weight = sample.weights().get(event);
        if weight == 0.0 {
            continue;
        }
        let class = if sample.is_signal(event) { SIGNAL } else { BACKGROUND };
        for feature in 0..n_features {
            let bin = values.get(event, feature) as usize;
            raw[(node as usize, class, n_bin_sums[feature] + bin)] += weight;
        }
    }
}
