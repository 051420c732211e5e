//! Ideas and run state
//!
//! This module provides the criterion/score records, the Idea type and the
//! RunState arena that owns a run's population.

pub mod criterion;
#[allow(clippy::module_inception)]
pub mod idea;
pub mod state;

pub use criterion::{Criterion, FeatureVector, Scores, CRITERION_COUNT, MAX_SCORE, MIN_SCORE};
pub use idea::{Facets, Idea, IdeaId, IdeaStatus, Origin};
pub use state::{RunId, RunState};

pub mod prelude {
    pub use super::criterion::*;
    pub use super::idea::*;
    pub use super::state::*;
}
