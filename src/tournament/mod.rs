//! Pairwise tournaments with Elo ratings
//!
//! This module provides the comparison log and rating state, and the
//! scheduler that turns pairwise decisions into a ranking.

pub mod elo;
pub mod schedule;

pub use elo::{
    expected_score, Comparison, EloUpdate, TournamentState, ELO_BASE_RATING, ELO_K_FACTOR,
};
pub use schedule::{
    eligible_ideas, run_auto, run_pairwise, Choice, DecisionProvider, ScoreOracle,
    TournamentOutcome,
};

pub mod prelude {
    pub use super::elo::{Comparison, TournamentState};
    pub use super::schedule::{run_pairwise, Choice, DecisionProvider, TournamentOutcome};
}
