//! Preference learning
//!
//! This module learns a criterion weight vector from a user's tournament
//! choices and packages it as a portable profile for later runs.

pub mod learner;
pub mod profile;

pub use learner::{
    derive_weights, evaluate_fit, feature_map, is_holdout, pairs_from_comparisons,
    summarize_weights, DerivedPreferences, FitReport, PreferenceLearner, PreferencePair,
    WeightBounds, FIT_METHOD, HOLDOUT_STRIDE,
};
pub use profile::{PreferenceProfile, ProfileStats, PROFILE_VERSION};

pub mod prelude {
    pub use super::learner::{derive_weights, evaluate_fit, FitReport, PreferenceLearner};
    pub use super::profile::PreferenceProfile;
}
