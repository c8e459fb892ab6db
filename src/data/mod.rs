//! Training-sample storage: binned values, weights, flags.
//!
//! An [`EventSample`] owns everything the tree and forest builders read:
//!
//! - [`EventValues`]: packed per-event bin indices
//! - [`EventWeights`]: boosting weight x original weight per event
//! - [`EventFlags`]: per-event node path / exclusion marker
//!
//! Signal events fill the sample from the front, background events from the
//! back, so class membership is a single index comparison.

mod flags;
mod sample;
mod values;
mod weights;

pub use flags::EventFlags;
pub use sample::EventSample;
pub use values::EventValues;
pub use weights::EventWeights;
