//! Frozen forest evaluator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::binning::{BinValue, FeatureBinning};
use crate::repr::Tree;

/// A trained forest: bias, shrinkage, an ordered sequence of trees and one
/// feature binning per input feature.
///
/// The boosted score of an event is `f0 + shrinkage * sum(boost weights)`
/// over the node each tree routes the event to; the signal probability is
/// the logistic link `sigmoid(2 * F)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forest<T> {
    f0: f64,
    shrinkage: f64,
    binnings: Vec<FeatureBinning<T>>,
    trees: Vec<Tree>,
}

impl<T: BinValue> Forest<T> {
    /// An empty forest with the given bias and shrinkage.
    pub fn new(f0: f64, shrinkage: f64) -> Self {
        Self {
            f0,
            shrinkage,
            binnings: Vec::new(),
            trees: Vec::new(),
        }
    }

    /// Assemble a forest from all of its parts.
    pub fn from_parts(
        f0: f64,
        shrinkage: f64,
        binnings: Vec<FeatureBinning<T>>,
        trees: Vec<Tree>,
    ) -> Self {
        Self { f0, shrinkage, binnings, trees }
    }

    /// Append a tree.
    pub fn add_tree(&mut self, tree: Tree) {
        self.trees.push(tree);
    }

    /// Attach the per-feature binnings used to quantize raw inputs.
    pub fn set_binnings(&mut self, binnings: Vec<FeatureBinning<T>>) {
        self.binnings = binnings;
    }

    /// The bias term.
    #[inline]
    pub fn f0(&self) -> f64 {
        self.f0
    }

    /// The shrinkage (learning rate) applied per tree.
    #[inline]
    pub fn shrinkage(&self) -> f64 {
        self.shrinkage
    }

    /// The trees, in boosting order.
    #[inline]
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// The stored feature binnings.
    #[inline]
    pub fn binnings(&self) -> &[FeatureBinning<T>] {
        &self.binnings
    }

    /// Boosted score for raw (unbinned) feature values.
    ///
    /// # Panics
    ///
    /// Panics if the feature count does not match the stored binnings.
    pub fn get_f(&self, features: &[T]) -> f64 {
        assert_eq!(
            features.len(),
            self.binnings.len(),
            "expected {} features, got {}",
            self.binnings.len(),
            features.len()
        );
        let bins: Vec<u32> = features
            .iter()
            .zip(&self.binnings)
            .map(|(&value, binning)| binning.value_to_bin(value))
            .collect();
        self.get_f_binned(&bins)
    }

    /// Boosted score for already-binned feature values.
    pub fn get_f_binned(&self, bins: &[u32]) -> f64 {
        let mut f = self.f0;
        for tree in &self.trees {
            f += self.shrinkage * tree.boost_weight(tree.value_to_node(bins));
        }
        f
    }

    /// Signal probability for raw feature values: `sigmoid(2 * F)`.
    pub fn probability(&self, features: &[T]) -> f64 {
        sigmoid2(self.get_f(features))
    }

    /// Signal probability for already-binned feature values.
    pub fn probability_binned(&self, bins: &[u32]) -> f64 {
        sigmoid2(self.get_f_binned(bins))
    }

    /// Variable importance: total separation gain of every valid cut, summed
    /// per feature over all trees. Features that never split are absent.
    pub fn variable_ranking(&self) -> BTreeMap<u32, f64> {
        let mut ranking = BTreeMap::new();
        for tree in &self.trees {
            for cut in tree.cuts() {
                if cut.valid {
                    *ranking.entry(cut.feature).or_insert(0.0) += cut.gain;
                }
            }
        }
        ranking
    }
}

/// The logistic link used throughout boosting: `1 / (1 + exp(-2x))`.
#[inline]
pub(crate) fn sigmoid2(x: f64) -> f64 {
    1.0 / (1.0 + (-2.0 * x).exp())
}
