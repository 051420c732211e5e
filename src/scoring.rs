//! Scoring engine
//!
//! Turns per-criterion scores and a weight vector into a single ranking
//! number, and applies hard-constraint eliminations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::CriterionWeights;
use crate::error::{ConfigError, ValidationError};
use crate::idea::{Criterion, Idea, IdeaStatus, RunState, Scores};

/// Weighted mean of criterion scores
///
/// `overall = Σ score[k]·weight[k] / Σ weight[k]`. Scores outside [0, 10]
/// are rejected, never clamped. Dividing by the weight total keeps the
/// result unchanged under any uniform rescaling of the weights.
pub fn compute_overall_score(
    scores: &Scores,
    weights: &CriterionWeights,
) -> Result<f64, ValidationError> {
    scores.validate()?;

    let weighted: f64 = Criterion::ALL
        .iter()
        .map(|c| scores.get(*c) * weights.get(*c))
        .sum();
    Ok(weighted / weights.total())
}

/// Eliminate an idea for violating a hard constraint
///
/// Forces `overall_score` to 0 whatever the raw scores or weights are.
pub fn apply_constraint_violation(idea: &mut Idea, reason: impl Into<String>) {
    idea.overall_score = Some(0.0);
    idea.status = IdeaStatus::Eliminated;
    idea.violation_reason = Some(reason.into());
}

/// Structured output of the external critic for one idea
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CritiquePatch {
    /// Raw `criterion name -> score` map
    pub scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub judge_notes: Option<String>,
    /// Set when the idea breaks a hard constraint
    #[serde(default)]
    pub constraint_violation: Option<String>,
}

/// What applying a critique did to an idea
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScoreOutcome {
    /// Idea scored with this overall score
    Scored(f64),
    /// Idea eliminated by a constraint violation
    Eliminated,
}

/// Scoring engine bound to one weight vector
#[derive(Clone, Debug, Default)]
pub struct ScoringEngine {
    weights: CriterionWeights,
}

impl ScoringEngine {
    /// Create an engine with the given weights
    pub fn new(weights: CriterionWeights) -> Self {
        Self { weights }
    }

    /// Create an engine from a `criterion name -> weight` map
    pub fn from_weight_map(map: &BTreeMap<String, f64>) -> Result<Self, ConfigError> {
        Ok(Self::new(CriterionWeights::from_map(map)?))
    }

    /// Weights in use
    pub fn weights(&self) -> &CriterionWeights {
        &self.weights
    }

    /// Overall score for a set of criterion scores
    pub fn score(&self, scores: &Scores) -> Result<f64, ValidationError> {
        compute_overall_score(scores, &self.weights)
    }

    /// Apply a critic patch to an idea
    ///
    /// A constraint violation is checked first and short-circuits the
    /// weighted sum. Otherwise the scores are validated and the overall score
    /// computed; on a validation error the idea is left unscored.
    pub fn apply_patch(
        &self,
        idea: &mut Idea,
        patch: &CritiquePatch,
    ) -> Result<ScoreOutcome, ValidationError> {
        if patch.judge_notes.is_some() {
            idea.judge_notes = patch.judge_notes.clone();
        }

        if let Some(reason) = &patch.constraint_violation {
            idea.scores = Scores::from_map(&patch.scores).ok();
            apply_constraint_violation(idea, reason.clone());
            tracing::debug!(idea_id = %idea.id, reason = %reason, "Idea eliminated");
            return Ok(ScoreOutcome::Eliminated);
        }

        let scored = Scores::from_map(&patch.scores).and_then(|scores| {
            let overall = self.score(&scores)?;
            Ok((scores, overall))
        });

        match scored {
            Ok((scores, overall)) => {
                idea.scores = Some(scores);
                idea.overall_score = Some(overall);
                tracing::debug!(idea_id = %idea.id, overall, "Idea scored");
                Ok(ScoreOutcome::Scored(overall))
            }
            Err(err) => {
                idea.mark_unscored();
                Err(err)
            }
        }
    }

    /// Recompute the overall score of every active scored idea
    ///
    /// Used when a run switches weight vectors. Returns the number of ideas
    /// rescored.
    pub fn rescore_active(&self, state: &mut RunState) -> Result<usize, ValidationError> {
        let mut rescored = 0;
        for idea in state.ideas.iter_mut().filter(|i| i.is_active()) {
            if let Some(scores) = &idea.scores {
                idea.overall_score = Some(self.score(scores)?);
                rescored += 1;
            }
        }
        tracing::info!(count = rescored, "Rescored active ideas");
        Ok(rescored)
    }
}
