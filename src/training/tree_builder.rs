//! Layer-synchronous tree construction.

use crate::data::EventSample;
use crate::repr::{Cut, Tree};
use crate::training::{CumulativeDistributions, Node, Parallelism};

/// Builds one fixed-depth tree over an event sample.
///
/// The builder sweeps the tree layer by layer: it rebuilds the cumulative
/// distributions for the layer, picks the best cut of every node, then
/// reroutes each event one level down by updating its flag to
/// `2 * flag + bit`, where the bit is 1 iff the cut is valid and the event's
/// bin on the cut feature is finite and at or above the threshold. Earlier
/// layers are never revisited; the bin quantization is the only search
/// resolution.
///
/// Event flags are read, not reset: callers mark excluded events with a
/// non-positive flag before building (stochastic sub-sampling), and a fresh
/// [`EventSample`] starts with every flag at 1.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    depth: u32,
    parallelism: Parallelism,
    feature_mask: Option<Vec<bool>>,
}

impl TreeBuilder {
    /// A builder for trees of the given depth.
    ///
    /// # Panics
    ///
    /// Panics if `depth` is 0.
    pub fn new(depth: u32) -> Self {
        assert!(depth >= 1, "tree depth must be at least 1, got {}", depth);
        Self {
            depth,
            parallelism: Parallelism::Sequential,
            feature_mask: None,
        }
    }

    /// Use the given parallelism for histogram construction.
    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Restrict split search to the enabled features.
    pub fn with_feature_mask(mut self, mask: Vec<bool>) -> Self {
        self.feature_mask = Some(mask);
        self
    }

    /// Build a tree, consuming the sample's flags as scratch state.
    ///
    /// After the call every active event's flag encodes its leaf:
    /// `flag - 2^depth` is the leaf index.
    pub fn build(&self, sample: &mut EventSample) -> Tree {
        let mut cuts: Vec<Cut> = Vec::with_capacity((1 << self.depth) - 1);
        let mut purities: Vec<f64> = Vec::with_capacity((1 << (self.depth + 1)) - 1);
        let mut boost_weights: Vec<f64> = Vec::with_capacity((1 << (self.depth + 1)) - 1);

        for layer in 0..self.depth {
            let cdfs = CumulativeDistributions::with_parallelism(layer, sample, self.parallelism);
            let nodes = accumulate_layer(layer, sample);

            let layer_cuts: Vec<Cut> = nodes
                .iter()
                .map(|node| {
                    purities.push(node.purity());
                    boost_weights.push(node.boost_weight());
                    node.best_cut(&cdfs, self.feature_mask.as_deref())
                })
                .collect();

            route_one_layer(layer, &layer_cuts, sample);
            cuts.extend(layer_cuts);
        }

        for node in accumulate_layer(self.depth, sample) {
            purities.push(node.purity());
            boost_weights.push(node.boost_weight());
        }

        Tree::new(cuts, purities, boost_weights)
    }
}

/// Accumulate per-node weight sums for one layer from the event flags.
fn accumulate_layer(layer: u32, sample: &EventSample) -> Vec<Node> {
    let n_nodes = 1usize << layer;
    let mut nodes: Vec<Node> = (0..n_nodes).map(|i| Node::new(layer, i)).collect();
    for event in 0..sample.n_events() {
        let flag = sample.flags().get(event) as i64;
        if flag <= 0 {
            continue;
        }
        let node = flag - n_nodes as i64;
        if node < 0 || node >= n_nodes as i64 {
            continue;
        }
        let weight = sample.weights().get(event);
        let original = sample.weights().original(event);
        if sample.is_signal(event) {
            nodes[node as usize].add_signal_weight(weight, original);
        } else {
            nodes[node as usize].add_background_weight(weight, original);
        }
    }
    nodes
}

/// Push every active event one layer down its path.
fn route_one_layer(layer: u32, layer_cuts: &[Cut], sample: &mut EventSample) {
    let n_nodes = 1i64 << layer;
    for event in 0..sample.n_events() {
        let flag = sample.flags().get(event);
        if flag <= 0 {
            continue;
        }
        let node = flag as i64 - n_nodes;
        if node < 0 || node >= n_nodes {
            continue;
        }
        let cut = layer_cuts[node as usize];
        let mut bit = 0;
        if cut.valid {
            let bin = sample.values().get(event, cut.feature as usize);
            // Missing values (bin 0) and invalid cuts share the low branch.
            if bin != 0 && bin >= cut.index {
                bit = 1;
            }
        }
        sample.flags_mut().set(event, 2 * flag + bit);
    }
}
