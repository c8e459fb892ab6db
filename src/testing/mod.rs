//! Synthetic data generators shared by tests and benchmarks.

use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::data::EventSample;

/// Two overlapping uniform clusters in two dimensions.
///
/// Signal events scatter around (0.3, 0.3), background events around
/// (0.7, 0.7), with enough spread that the classes overlap but remain
/// mostly separable. Returns per-feature columns and per-event labels.
pub fn separable_columns(n_events: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<bool>) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut columns = vec![Vec::with_capacity(n_events), Vec::with_capacity(n_events)];
    let mut labels = Vec::with_capacity(n_events);
    for event in 0..n_events {
        let is_signal = event % 2 == 0;
        let center = if is_signal { 0.3 } else { 0.7 };
        columns[0].push(center + rng.gen_range(-0.25..0.25));
        columns[1].push(center + rng.gen_range(-0.25..0.25));
        labels.push(is_signal);
    }
    (columns, labels)
}

/// A pre-binned sample of the same two-cluster problem, ready for the tree
/// and forest builders.
pub fn separable_sample(n_events: usize, n_levels: u32, seed: u64) -> EventSample {
    let (columns, labels) = separable_columns(n_events, seed);
    let binnings: Vec<_> = columns
        .iter()
        .map(|column| crate::binning::FeatureBinning::from_data(n_levels, column).unwrap())
        .collect();
    let mut sample = EventSample::new(n_events, columns.len(), &vec![n_levels; columns.len()])
        .expect("level count matches feature count");
    for event in 0..n_events {
        let bins: Vec<u32> = columns
            .iter()
            .zip(&binnings)
            .map(|(column, binning)| binning.value_to_bin(column[event]))
            .collect();
        sample.add_event(&bins, 1.0, labels[event]).unwrap();
    }
    sample
}
