//! Pairwise tournament scheduling
//!
//! Ideas are ranked by binary insertion: each new idea is compared against
//! the midpoint of the already-ranked list until its position is found.
//! A full ranking of `n` ideas therefore needs `O(n log n)` comparisons.
//!
//! Decisions come from a [`DecisionProvider`], usually a human. Pairs that
//! already have a logged outcome are never asked again, so an interrupted
//! tournament resumes without repeating questions.
//!
//! Callers that choose pairs adaptively instead of by insertion can ask
//! [`TournamentState::closest_unplayed_pair`] for the next question and
//! feed the answer to [`TournamentState::record_comparison`].

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::elo::TournamentState;
use crate::error::{EvoIdeaError, EvoResult};
use crate::idea::{Idea, IdeaId, RunState};

/// Answer to a single pairwise question
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    /// First idea wins
    A,
    /// Second idea wins
    B,
    /// Stop the tournament now
    Quit,
}

/// Source of pairwise decisions
///
/// A provider failure aborts the tournament with the error; comparisons
/// recorded before the failure stay in the log.
pub trait DecisionProvider {
    /// Pick the better of two ideas
    fn decide(&mut self, a: &Idea, b: &Idea) -> EvoResult<Choice>;
}

impl<F> DecisionProvider for F
where
    F: FnMut(&Idea, &Idea) -> EvoResult<Choice>,
{
    fn decide(&mut self, a: &Idea, b: &Idea) -> EvoResult<Choice> {
        self(a, b)
    }
}

/// Provider that prefers the higher overall score
///
/// Ties go to the lower id, matching the ranking order used by selection.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScoreOracle;

impl DecisionProvider for ScoreOracle {
    fn decide(&mut self, a: &Idea, b: &Idea) -> EvoResult<Choice> {
        Ok(match a.rank_cmp(b) {
            Ordering::Greater => Choice::B,
            _ => Choice::A,
        })
    }
}

/// Result of a tournament session
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TournamentOutcome {
    /// Ideas placed so far, best first
    pub ranking: Vec<IdeaId>,
    /// Questions put to the provider
    pub comparisons_made: usize,
    /// Outcomes taken from the existing log
    pub comparisons_reused: usize,
    /// False if the provider quit before every idea was placed
    pub completed: bool,
}

/// Ideas that may take part in a tournament: active and scored
pub fn eligible_ideas(state: &RunState) -> Vec<&Idea> {
    state.ideas.iter().filter(|i| i.is_rankable()).collect()
}

/// Rank ideas by pairwise decisions, recording every new comparison
///
/// Needs at least two ideas. On [`Choice::Quit`] the partial ranking of the
/// ideas placed so far is returned with `completed == false`.
pub fn run_pairwise<P: DecisionProvider + ?Sized>(
    tournament: &mut TournamentState,
    ideas: &[&Idea],
    provider: &mut P,
) -> EvoResult<TournamentOutcome> {
    if ideas.len() < 2 {
        return Err(EvoIdeaError::InsufficientIdeas {
            found: ideas.len(),
            required: 2,
        });
    }

    let mut outcome = TournamentOutcome::default();
    let mut ranked: Vec<&Idea> = Vec::with_capacity(ideas.len());

    'insert: for candidate in ideas {
        let mut lo = 0;
        let mut hi = ranked.len();

        while lo < hi {
            let mid = (lo + hi) / 2;
            let incumbent = ranked[mid];

            let winner = match tournament.logged_winner(candidate.id, incumbent.id) {
                Some(winner) => {
                    outcome.comparisons_reused += 1;
                    winner
                }
                None => {
                    let winner = match provider.decide(candidate, incumbent)? {
                        Choice::A => candidate.id,
                        Choice::B => incumbent.id,
                        Choice::Quit => {
                            tracing::info!(
                                placed = ranked.len(),
                                total = ideas.len(),
                                "Tournament stopped early"
                            );
                            break 'insert;
                        }
                    };
                    tournament.record_comparison(candidate.id, incumbent.id, winner)?;
                    outcome.comparisons_made += 1;
                    winner
                }
            };

            if winner == candidate.id {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }

        ranked.insert(lo, candidate);
    }

    outcome.completed = ranked.len() == ideas.len();
    outcome.ranking = ranked.iter().map(|i| i.id).collect();

    tracing::info!(
        asked = outcome.comparisons_made,
        reused = outcome.comparisons_reused,
        completed = outcome.completed,
        "Tournament finished"
    );
    Ok(outcome)
}

/// Run a tournament decided by overall score
pub fn run_auto(tournament: &mut TournamentState, ideas: &[&Idea]) -> EvoResult<TournamentOutcome> {
    run_pairwise(tournament, ideas, &mut ScoreOracle)
}
