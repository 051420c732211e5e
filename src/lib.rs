//! # evoidea
//!
//! Scoring, selection, tournament ranking and preference calibration for
//! evolving a population of ideas.
//!
//! ## Core Concepts
//!
//! - **Weighted scoring**: eight fixed criteria combine into one overall
//!   score under a normalized weight vector; hard-constraint violations
//!   force the score to zero
//! - **Elitist selection**: each round archives the weaker half, keeps the
//!   elite and one seeded diversity pick, and tracks stagnation
//! - **Pairwise tournaments**: binary-insertion ranking driven by a decision
//!   provider, with Elo ratings over the comparison log
//! - **Preference learning**: multiplicative-weights calibration of the
//!   criterion weights from tournament choices, with positional holdout
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use evoidea::prelude::*;
//!
//! let config = RunConfig::default().with_diversity_seed(42);
//! let mut events = EventLog::new();
//! let critiques = critic.review(&state)?;
//!
//! let mut ctx = PhaseContext::new(&config, &critiques, &mut events);
//! let (state, stop) = run_iteration(state, &mut ctx)?;
//! if let Some(reason) = stop {
//!     let result = compose_final(&state, Some(reason))?;
//! }
//! ```

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod idea;
pub mod phase;
pub mod preference;
pub mod record;
pub mod scoring;
pub mod selection;
pub mod tournament;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::checkpoint::prelude::*;
    pub use crate::config::{CriterionWeights, RunConfig};
    pub use crate::error::*;
    pub use crate::idea::prelude::*;
    pub use crate::phase::{run_iteration, CritiqueOutcome, PhaseContext, PhaseKind};
    pub use crate::preference::prelude::*;
    pub use crate::record::{compose_final, EventLog, FinalResult};
    pub use crate::scoring::{CritiquePatch, ScoringEngine};
    pub use crate::selection::prelude::*;
    pub use crate::tournament::prelude::*;
}
