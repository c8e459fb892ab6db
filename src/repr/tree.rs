//! Frozen decision tree.

use serde::{Deserialize, Serialize};

// =============================================================================
// Cut
// =============================================================================

/// A chosen (or rejected) split.
///
/// `index` is a bin threshold: events whose bin on `feature` is at least
/// `index` descend one way, events below it the other. `gain` is only
/// meaningful while `valid` is set; an invalid cut means no positive-gain
/// split existed and evaluation simply stops at the node carrying it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cut {
    /// Index of the feature this cut tests.
    pub feature: u32,
    /// Bin threshold.
    pub index: u32,
    /// Separation gain achieved by the cut.
    pub gain: f64,
    /// Whether a positive-gain split was found.
    pub valid: bool,
}

// =============================================================================
// Tree
// =============================================================================

/// A fully built tree of depth `D`, immutable after construction.
///
/// Stores the `2^D - 1` inner-node cuts in level order plus purity and boost
/// weight for all `2^(D+1) - 1` node positions (inner nodes first, then the
/// `2^D` leaves). Inner-node statistics stay available on purpose: an
/// evaluation that stops early - missing value, degenerate split - reads the
/// aggregate of the subtree it stopped in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    cuts: Vec<Cut>,
    purities: Vec<f64>,
    boost_weights: Vec<f64>,
}

impl Tree {
    /// Assemble a tree from its frozen arrays.
    ///
    /// # Panics
    ///
    /// Panics if the array lengths are inconsistent: for `n` cuts there must
    /// be exactly `2n + 1` purities and boost weights.
    pub fn new(cuts: Vec<Cut>, purities: Vec<f64>, boost_weights: Vec<f64>) -> Self {
        assert_eq!(
            purities.len(),
            2 * cuts.len() + 1,
            "tree with {} cuts needs {} node statistics",
            cuts.len(),
            2 * cuts.len() + 1
        );
        assert_eq!(
            boost_weights.len(),
            purities.len(),
            "purity and boost-weight arrays must have equal length"
        );
        Self { cuts, purities, boost_weights }
    }

    /// Route a binned event to its node.
    ///
    /// Descends from the root while the current cut is valid and the event
    /// has a finite value (bin > 0) on the cut feature; bin >= threshold
    /// selects child `2k+2`, otherwise `2k+1`. The walk stops early at an
    /// invalid cut or a missing value and returns that inner position, whose
    /// stored purity and boost weight summarize the whole subtree.
    pub fn value_to_node(&self, values: &[u32]) -> usize {
        let mut node = 0usize;
        while node < self.cuts.len() {
            let cut = self.cuts[node];
            if !cut.valid {
                break;
            }
            let bin = values[cut.feature as usize];
            if bin == 0 {
                break;
            }
            node = if bin >= cut.index { 2 * node + 2 } else { 2 * node + 1 };
        }
        node
    }

    /// Purity at a node position (inner or leaf).
    #[inline]
    pub fn purity(&self, node: usize) -> f64 {
        self.purities[node]
    }

    /// Boost weight at a node position (inner or leaf).
    #[inline]
    pub fn boost_weight(&self, node: usize) -> f64 {
        self.boost_weights[node]
    }

    /// Inner-node cuts in level order.
    #[inline]
    pub fn cuts(&self) -> &[Cut] {
        &self.cuts
    }

    /// Purities of all node positions.
    #[inline]
    pub fn purities(&self) -> &[f64] {
        &self.purities
    }

    /// Boost weights of all node positions.
    #[inline]
    pub fn boost_weights(&self) -> &[f64] {
        &self.boost_weights
    }

    /// Tree depth.
    pub fn depth(&self) -> u32 {
        (self.cuts.len() + 1).trailing_zeros()
    }
}
