//! Selection and stopping
//!
//! This module provides the per-iteration selection round and the stop
//! conditions evaluated after it.

pub mod elite;
pub mod termination;

pub use elite::{diversity_band, plan_selection, select, SelectionOutcome};
pub use termination::{
    detect_stagnation, stop_condition, MaxRounds, ScoreThreshold, Stagnation, StagnationCheck,
    StopCriterion, StopReason,
};

pub mod prelude {
    pub use super::elite::*;
    pub use super::termination::*;
}
