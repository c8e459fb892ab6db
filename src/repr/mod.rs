//! Frozen model representations.
//!
//! Training emits immutable [`Tree`]s which a [`Forest`] owns together with
//! the feature binnings; both may outlive the sample they were trained on.

mod forest;
mod tree;

pub use forest::Forest;
pub(crate) use forest::sigmoid2;
pub use tree::{Cut, Tree};
