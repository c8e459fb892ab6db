//! Split-search state for a single tree position.

use crate::repr::Cut;
use crate::training::CumulativeDistributions;

/// Gini-like separation loss of a node holding signal weight `s` and
/// background weight `b`: `s*b / (s+b)`, 0 for an empty node.
///
/// A pure node (either weight 0) has loss 0; a balanced node has the largest
/// loss for its total weight. Split gain is the parent loss minus the
/// children's losses.
#[inline]
pub fn separation_loss(signal: f64, background: f64) -> f64 {
    if signal + background == 0.0 {
        0.0
    } else {
        signal * background / (signal + background)
    }
}

/// One node position during tree construction.
///
/// Accumulates the weight statistics of the events currently routed to it
/// and derives purity, boost weight and the best cut over the layer's
/// cumulative distributions. Created per layer by the tree builder, then
/// frozen into the [`Tree`](crate::repr::Tree) arrays.
#[derive(Debug, Clone)]
pub struct Node {
    layer: u32,
    index: usize,
    signal_weight: f64,
    background_weight: f64,
    squared_weight: f64,
}

impl Node {
    /// A fresh node at (`layer`, `index`-in-layer) with zeroed sums.
    pub fn new(layer: u32, index: usize) -> Self {
        Self {
            layer,
            index,
            signal_weight: 0.0,
            background_weight: 0.0,
            squared_weight: 0.0,
        }
    }

    /// True if this node sits at the given layer.
    #[inline]
    pub fn is_in_layer(&self, layer: u32) -> bool {
        self.layer == layer
    }

    /// Level-order position in the whole tree: `2^layer - 1 + index`.
    #[inline]
    pub fn position(&self) -> usize {
        (1usize << self.layer) - 1 + self.index
    }

    /// Add a signal event's effective weight and its original weight.
    ///
    /// The squared-weight sum accumulates `weight^2 / original`, which equals
    /// `w^2 * o` for an effective weight `w * o`. Events with original weight
    /// 0 carry no information and are skipped entirely.
    #[inline]
    pub fn add_signal_weight(&mut self, weight: f64, original: f64) {
        if original == 0.0 {
            return;
        }
        self.signal_weight += weight;
        self.squared_weight += weight * weight / original;
    }

    /// Add a background event's effective weight and its original weight.
    #[inline]
    pub fn add_background_weight(&mut self, weight: f64, original: f64) {
        if original == 0.0 {
            return;
        }
        self.background_weight += weight;
        self.squared_weight += weight * weight / original;
    }

    /// Overwrite the accumulated sums: `[signal, background, squared]`.
    pub fn set_weights(&mut self, weights: [f64; 3]) {
        self.signal_weight = weights[0];
        self.background_weight = weights[1];
        self.squared_weight = weights[2];
    }

    /// Signal weight fraction `s / (s + b)`, 0 for an empty node.
    ///
    /// With negative event weights the analytic ratio is returned as-is and
    /// may leave `[0, 1]`.
    pub fn purity(&self) -> f64 {
        let total = self.signal_weight + self.background_weight;
        if total == 0.0 {
            0.0
        } else {
            self.signal_weight / total
        }
    }

    /// The boosting step this node contributes if it ends up a leaf:
    /// `(s - b) / (2*(s + b) - sum(w^2 * o))`, 0 for a vanishing denominator.
    pub fn boost_weight(&self) -> f64 {
        let denominator = 2.0 * (self.signal_weight + self.background_weight) - self.squared_weight;
        if denominator == 0.0 {
            0.0
        } else {
            (self.signal_weight - self.background_weight) / denominator
        }
    }

    /// Find the maximum-gain cut for this node.
    ///
    /// Scans features in ascending order and thresholds `t` in
    /// `2..=n_bins-1` ascending, so ties keep the first maximum and the
    /// result is deterministic. For each feature the parent loss uses that
    /// feature's finite totals, which keeps NaN mass (bin 0) out of the
    /// search on both sides of every candidate cut. A gain that never
    /// exceeds 0 yields an invalid cut.
    ///
    /// `feature_mask`, when given, restricts the scan to enabled features.
    pub fn best_cut(
        &self,
        cdfs: &CumulativeDistributions,
        feature_mask: Option<&[bool]>,
    ) -> Cut {
        let mut best = Cut::default();
        for (feature, &n_bins) in cdfs.n_bins().iter().enumerate() {
            if let Some(mask) = feature_mask {
                if !mask[feature] {
                    continue;
                }
            }
            let signal_total = cdfs.signal(self.index, feature, n_bins - 1);
            let background_total = cdfs.background(self.index, feature, n_bins - 1);
            let parent_loss = separation_loss(signal_total, background_total);
            for threshold in 2..n_bins {
                let signal_low = cdfs.signal(self.index, feature, threshold - 1);
                let background_low = cdfs.background(self.index, feature, threshold - 1);
                let signal_high = signal_total - signal_low;
                let background_high = background_total - background_low;
                let gain = parent_loss
                    - separation_loss(signal_low, background_low)
                    - separation_loss(signal_high, background_high);
                if gain > best.gain {
                    best = Cut {
                        feature: feature as u32,
                        index: threshold,
                        gain,
                        valid: true,
                    };
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::EventSample;

    /// The 8-event, 2-feature fixture used throughout split-search tests.
    fn node_sample() -> EventSample {
        let mut sample = EventSample::new(8, 2, &[1, 1]).unwrap();
        let events: [([u32; 2], f64, bool); 8] = [
            ([1, 1], 4.0, true),
            ([1, 2], 1.0, true),
            ([2, 1], 4.0, false),
            ([2, 2], 3.0, false),
            ([1, 1], 2.0, true),
            ([1, 2], 1.0, false),
            ([2, 1], 3.0, true),
            ([2, 2], 2.0, false),
        ];
        for (values, weight, is_signal) in events {
            sample.add_event(&values, weight, is_signal).unwrap();
        }
        sample
    }

    #[test]
    fn layer_membership_and_position() {
        assert!(Node::new(0, 0).is_in_layer(0));
        assert!(!Node::new(0, 0).is_in_layer(1));
        assert!(Node::new(1, 0).is_in_layer(1));

        assert_eq!(Node::new(0, 0).position(), 0);
        assert_eq!(Node::new(1, 0).position(), 1);
        assert_eq!(Node::new(1, 1).position(), 2);
        assert_eq!(Node::new(2, 0).position(), 3);
        assert_eq!(Node::new(2, 3).position(), 6);
        assert_eq!(Node::new(3, 0).position(), 7);
        assert_eq!(Node::new(3, 7).position(), 14);
    }

    #[test]
    fn separation_loss_is_gini_like() {
        assert_eq!(separation_loss(4.0, 4.0), 2.0);
        assert_eq!(separation_loss(1.0, 4.0), 0.8);
        assert_eq!(separation_loss(4.0, 1.0), 0.8);
        assert_eq!(separation_loss(2.0, 0.0), 0.0);
        assert_eq!(separation_loss(0.0, 2.0), 0.0);
    }

    #[test]
    fn boost_weight_formula() {
        let mut node = Node::new(0, 0);
        node.set_weights([2.0, 2.0, 4.0]);
        assert_eq!(node.boost_weight(), 0.0);

        node.set_weights([0.0, 0.0, 0.0]);
        node.add_signal_weight(1.0, 1.0);
        node.add_signal_weight(3.0, 1.0);
        node.add_background_weight(2.0, 1.0);
        assert_eq!(node.boost_weight(), -1.0);
    }

    #[test]
    fn purity_is_signal_fraction() {
        let mut node = Node::new(0, 0);
        node.set_weights([2.0, 2.0, 4.0]);
        assert_eq!(node.purity(), 0.5);

        node.set_weights([0.0, 0.0, 0.0]);
        node.add_signal_weight(2.0, 1.0);
        node.add_signal_weight(4.0, 1.0);
        node.add_background_weight(4.0, 1.0);
        assert_eq!(node.purity(), 0.6);
    }

    #[test]
    fn negative_weights_are_handled_analytically() {
        let mut node = Node::new(0, 0);
        node.add_signal_weight(-2.0, -1.0);
        node.add_signal_weight(-4.0, -1.0);
        node.add_background_weight(-4.0, -1.0);
        assert_eq!(node.purity(), 0.6);
        assert_eq!(node.boost_weight(), -0.125);

        let mut node = Node::new(0, 0);
        node.add_signal_weight(-2.0, 1.0);
        node.add_signal_weight(1.0, -2.0);
        node.add_background_weight(0.5, -0.5);
        // Purity above 1 is expected once weights go negative.
        assert_eq!(node.purity(), 2.0);
        assert_eq!(node.boost_weight(), 0.375);
    }

    #[test]
    fn zero_original_weight_changes_nothing() {
        let mut node = Node::new(0, 0);
        node.add_signal_weight(2.0, 1.0);
        node.add_signal_weight(2.0, -1.0);
        node.add_signal_weight(4.0, 1.0);
        node.add_signal_weight(-4.0, 2.0);
        node.add_background_weight(4.0, 1.0);
        node.add_background_weight(4.0, 1.0);
        node.add_background_weight(3.0, -1.0);
        node.add_background_weight(2.0, 2.0);
        node.add_background_weight(0.5, 0.1);

        let mut padded = Node::new(0, 0);
        padded.add_signal_weight(2.0, 1.0);
        padded.add_signal_weight(2.0, -1.0);
        padded.add_signal_weight(2.0, 0.0);
        padded.add_signal_weight(4.0, 1.0);
        padded.add_signal_weight(-4.0, 2.0);
        padded.add_signal_weight(-4.0, 0.0);
        padded.add_background_weight(4.0, 1.0);
        padded.add_background_weight(4.0, 0.0);
        padded.add_background_weight(4.0, 1.0);
        padded.add_background_weight(3.0, -1.0);
        padded.add_background_weight(2.0, 2.0);
        padded.add_background_weight(0.0, 0.0);
        padded.add_background_weight(0.5, 0.1);

        assert_eq!(node.purity(), padded.purity());
        assert_eq!(node.boost_weight(), padded.boost_weight());
    }

    #[test]
    fn best_cut_at_the_root() {
        let sample = node_sample();
        let cdfs = CumulativeDistributions::new(0, &sample);
        let node = Node::new(0, 0);

        let cut = node.best_cut(&cdfs, None);
        assert_eq!(cut.feature, 0);
        assert_eq!(cut.index, 2);
        assert_eq!(cut.gain, 1.875);
        assert!(cut.valid);
    }

    #[test]
    fn best_cut_ignores_nan_mass() {
        // A variant of the root sample where heavily asymmetric NaN events
        // are stacked onto both features; the chosen cut must not move.
        let sample = node_sample();
        let cdfs = CumulativeDistributions::new(0, &sample);
        let baseline = Node::new(0, 0).best_cut(&cdfs, None);

        let mut noisy = EventSample::new(24, 2, &[1, 1]).unwrap();
        for event in 0..8 {
            let values = [sample.values().get(event, 0), sample.values().get(event, 1)];
            noisy
                .add_event(&values, sample.weights().original(event), sample.is_signal(event))
                .unwrap();
        }
        for _ in 0..8 {
            noisy.add_event(&[0, 0], 100.0, true).unwrap();
            noisy.add_event(&[0, 0], 800.0, false).unwrap();
        }
        let noisy_cdfs = CumulativeDistributions::new(0, &noisy);
        assert_eq!(noisy_cdfs.signal(0, 0, 0), 800.0);
        assert_eq!(noisy_cdfs.background(0, 1, 0), 6400.0);

        let cut = Node::new(0, 0).best_cut(&noisy_cdfs, None);
        assert_eq!(cut.feature, baseline.feature);
        assert_eq!(cut.index, baseline.index);
        assert_eq!(cut.gain, baseline.gain);
        assert_eq!(cut.valid, baseline.valid);
    }

    #[test]
    fn best_cut_at_layer_one() {
        let mut sample = node_sample();
        let flags: [i32; 8] = [2, 2, 2, 3, 3, 2, 3, 3];
        for (event, &flag) in flags.iter().enumerate() {
            sample.flags_mut().set(event, flag);
        }
        let cdfs = CumulativeDistributions::new(1, &sample);

        let first = Node::new(1, 0).best_cut(&cdfs, None);
        assert_eq!(first.feature, 1);
        assert_eq!(first.index, 2);
        assert_eq!(first.gain, 0.375);
        assert!(first.valid);

        let second = Node::new(1, 1).best_cut(&cdfs, None);
        assert_eq!(second.feature, 1);
        assert_eq!(second.index, 2);
        assert!((second.gain - 15.0 / 28.0).abs() < 1e-12);
        assert!(second.valid);
    }

    #[test]
    fn feature_mask_restricts_the_scan() {
        let sample = node_sample();
        let cdfs = CumulativeDistributions::new(0, &sample);
        let node = Node::new(0, 0);

        let cut = node.best_cut(&cdfs, Some(&[false, true]));
        assert_eq!(cut.feature, 1);
        assert!(cut.valid);

        let cut = node.best_cut(&cdfs, Some(&[false, false]));
        assert!(!cut.valid);
    }

    #[test]
    fn pure_node_has_no_valid_cut() {
        let mut sample = EventSample::new(4, 1, &[1]).unwrap();
        sample.add_event(&[1], 1.0, true).unwrap();
        sample.add_event(&[2], 1.0, true).unwrap();
        sample.add_event(&[1], 1.0, true).unwrap();
        sample.add_event(&[2], 1.0, true).unwrap();
        let cdfs = CumulativeDistributions::new(0, &sample);
        let cut = Node::new(0, 0).best_cut(&cdfs, None);
        assert!(!cut.valid);
        assert_eq!(cut.gain, 0.0);
    }
}
