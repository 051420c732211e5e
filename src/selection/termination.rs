//! Stopping rules
//!
//! This module provides the stagnation counter and the stop criteria of a
//! run. Criteria are checked in a fixed priority order: threshold first,
//! then stagnation, then the round limit.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::idea::RunState;

/// Why a run stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    ThresholdReached,
    StagnationDetected,
    MaxRoundsCompleted,
}

impl StopReason {
    /// Human-readable reason
    pub fn description(&self) -> &'static str {
        match self {
            Self::ThresholdReached => "threshold reached",
            Self::StagnationDetected => "stagnation detected",
            Self::MaxRoundsCompleted => "max rounds completed",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Updated stagnation counter after one iteration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StagnationCheck {
    pub counter: u32,
    pub stagnated: bool,
}

/// Advance the stagnation counter
///
/// The counter grows when `new_best <= prev_best` and resets to 0 on any
/// improvement.
pub fn detect_stagnation(
    prev_best: f64,
    new_best: f64,
    counter: u32,
    patience: u32,
) -> StagnationCheck {
    let counter = if new_best <= prev_best {
        counter.saturating_add(1)
    } else {
        0
    };
    StagnationCheck {
        counter,
        stagnated: counter >= patience,
    }
}

/// Stop criterion trait
pub trait StopCriterion {
    /// Check if the run should stop
    fn should_stop(&self, state: &RunState) -> bool;

    /// Reason reported when this criterion fires
    fn reason(&self) -> StopReason;
}

/// Stop when the best score reaches a threshold
#[derive(Clone, Debug)]
pub struct ScoreThreshold(pub f64);

impl StopCriterion for ScoreThreshold {
    fn should_stop(&self, state: &RunState) -> bool {
        state.best_score.is_some_and(|best| best >= self.0)
    }

    fn reason(&self) -> StopReason {
        StopReason::ThresholdReached
    }
}

/// Stop after too many non-improving iterations
#[derive(Clone, Debug)]
pub struct Stagnation(pub u32);

impl StopCriterion for Stagnation {
    fn should_stop(&self, state: &RunState) -> bool {
        state.stagnation_counter >= self.0
    }

    fn reason(&self) -> StopReason {
        StopReason::StagnationDetected
    }
}

/// Stop after a fixed number of rounds
#[derive(Clone, Debug)]
pub struct MaxRounds(pub u32);

impl StopCriterion for MaxRounds {
    fn should_stop(&self, state: &RunState) -> bool {
        state.iteration >= self.0
    }

    fn reason(&self) -> StopReason {
        StopReason::MaxRoundsCompleted
    }
}

/// First criterion that fires, in priority order
pub fn stop_condition(state: &RunState, config: &RunConfig) -> Option<StopReason> {
    let threshold = ScoreThreshold(config.score_threshold);
    let stagnation = Stagnation(config.stagnation_patience);
    let max_rounds = MaxRounds(config.max_rounds);
    let criteria: [&dyn StopCriterion; 3] = [&threshold, &stagnation, &max_rounds];

    criteria
        .iter()
        .find(|c| c.should_stop(state))
        .map(|c| c.reason())
}
