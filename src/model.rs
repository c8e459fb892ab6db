//! End-to-end model layer: binning + boosting in one call.

use serde::{Deserialize, Serialize};

use crate::binning::FeatureBinning;
use crate::data::EventSample;
use crate::error::DataError;
use crate::repr::Forest;
use crate::training::{BoostingParams, ForestBuilder};

/// Configuration for [`fit`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbdtConfig {
    /// Binning levels per feature; every feature gets `2^n_levels` ordinary
    /// bins plus the missing bin.
    pub n_levels: u32,
    /// Boosting parameters.
    pub boosting: BoostingParams,
}

impl Default for GbdtConfig {
    fn default() -> Self {
        Self {
            n_levels: 4,
            boosting: BoostingParams::default(),
        }
    }
}

/// Train a forest from raw feature columns.
///
/// `columns` holds one `Vec<f64>` per feature, all of equal length;
/// `labels[i]` marks event `i` as signal; `weights`, when given, supplies
/// per-event original weights (1.0 otherwise). One equal-frequency binning
/// is computed per column, every event is quantized, and a forest is
/// trained over the binned sample with the binnings attached.
pub fn fit(
    columns: &[Vec<f64>],
    labels: &[bool],
    weights: Option<&[f64]>,
    config: &GbdtConfig,
) -> Result<Forest<f64>, DataError> {
    let n_features = columns.len();
    let n_events = labels.len();
    for column in columns {
        if column.len() != n_events {
            return Err(DataError::DimensionMismatch {
                expected: n_events,
                got: column.len(),
            });
        }
    }
    if let Some(weights) = weights {
        if weights.len() != n_events {
            return Err(DataError::DimensionMismatch {
                expected: n_events,
                got: weights.len(),
            });
        }
    }

    let binnings: Vec<FeatureBinning<f64>> = columns
        .iter()
        .map(|column| FeatureBinning::from_data(config.n_levels, column))
        .collect::<Result<_, _>>()?;

    let n_levels = vec![config.n_levels; n_features];
    let mut sample = EventSample::new(n_events, n_features, &n_levels)?;
    let mut bins = vec![0u32; n_features];
    for event in 0..n_events {
        for (feature, (column, binning)) in columns.iter().zip(&binnings).enumerate() {
            bins[feature] = binning.value_to_bin(column[event]);
        }
        let weight = weights.map_or(1.0, |w| w[event]);
        sample.add_event(&bins, weight, labels[event])?;
    }

    let trained = ForestBuilder::new(config.boosting.clone()).train(&mut sample);
    Ok(trained.into_forest(binnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::separable_columns;
    use crate::training::Verbosity;

    #[test]
    fn fit_learns_a_separable_problem() {
        let (columns, labels) = separable_columns(400, 11);
        let config = GbdtConfig {
            n_levels: 3,
            boosting: BoostingParams {
                n_trees: 20,
                depth: 2,
                shrinkage: 0.3,
                ..Default::default()
            },
        };
        let forest = fit(&columns, &labels, None, &config).unwrap();
        assert_eq!(forest.trees().len(), 20);
        assert_eq!(forest.binnings().len(), columns.len());

        // The forest should separate the two clusters it was trained on.
        let mut correct = 0;
        for event in 0..labels.len() {
            let features: Vec<f64> = columns.iter().map(|c| c[event]).collect();
            let p = forest.probability(&features);
            if (p > 0.5) == labels[event] {
                correct += 1;
            }
        }
        assert!(
            correct >= labels.len() * 9 / 10,
            "only {}/{} training events classified correctly",
            correct,
            labels.len()
        );

        // Both features carry gain on this problem.
        let ranking = forest.variable_ranking();
        assert!(ranking.len() >= 2);
    }

    #[test]
    fn fit_rejects_ragged_columns() {
        let columns = vec![vec![1.0, 2.0], vec![1.0]];
        let labels = vec![true, false];
        let err = fit(&columns, &labels, None, &GbdtConfig::default()).unwrap_err();
        assert_eq!(err, DataError::DimensionMismatch { expected: 2, got: 1 });
    }

    #[test]
    fn fit_respects_silent_verbosity_by_default() {
        let config = GbdtConfig::default();
        assert_eq!(config.boosting.verbosity, Verbosity::Silent);
    }
}
