//! Idea records
//!
//! An idea is a candidate solution carrying descriptive facets, criterion
//! scores and a lifecycle status. Parents are referenced by id only; the
//! population in [`RunState`](super::state::RunState) owns every idea.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::criterion::Scores;

/// Unique identifier of an idea within a run
///
/// Ordering follows the underlying UUID and is used to break score ties
/// deterministically.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdeaId(pub Uuid);

impl IdeaId {
    /// Fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic id, mostly useful for fixtures and replay
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl Default for IdeaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IdeaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for IdeaId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// How an idea came into existence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Generated,
    Crossover,
    Mutated,
    Refined,
}

impl Origin {
    /// Whether ideas of this origin must reference at least one parent
    pub fn requires_parents(&self) -> bool {
        !matches!(self, Self::Generated)
    }
}

/// Lifecycle status of an idea
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaStatus {
    /// Competing in selection
    Active,
    /// Lost a selection round
    Archived,
    /// Violated a hard constraint
    Eliminated,
}

/// Descriptive text attributes of an idea
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Facets {
    pub audience: String,
    /// The job to be done
    #[serde(alias = "jtbd")]
    pub problem: String,
    pub differentiator: String,
    pub monetization: String,
    pub distribution: String,
    pub risks: String,
}

/// A candidate idea
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub id: IdeaId,
    /// Generation in which this idea was created
    #[serde(alias = "gen")]
    pub generation: u32,
    pub origin: Origin,
    pub parents: Vec<IdeaId>,
    pub title: String,
    pub summary: String,
    pub facets: Facets,
    /// Criterion scores, absent until critiqued
    pub scores: Option<Scores>,
    /// Weighted aggregate of `scores`, computed by the scoring engine
    pub overall_score: Option<f64>,
    pub status: IdeaStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation_reason: Option<String>,
}

impl Idea {
    /// Create a new active, unscored idea with a fresh id
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        facets: Facets,
        generation: u32,
        origin: Origin,
    ) -> Self {
        Self {
            id: IdeaId::new(),
            generation,
            origin,
            parents: Vec::new(),
            title: title.into(),
            summary: summary.into(),
            facets,
            scores: None,
            overall_score: None,
            status: IdeaStatus::Active,
            judge_notes: None,
            violation_reason: None,
        }
    }

    /// Replace the id
    pub fn with_id(mut self, id: IdeaId) -> Self {
        self.id = id;
        self
    }

    /// Set the parent references
    pub fn with_parents(mut self, parents: Vec<IdeaId>) -> Self {
        self.parents = parents;
        self
    }

    /// Check if the idea is still competing
    pub fn is_active(&self) -> bool {
        self.status == IdeaStatus::Active
    }

    /// Check if the idea carries an overall score
    pub fn is_scored(&self) -> bool {
        self.overall_score.is_some()
    }

    /// Active and scored, i.e. eligible for ranking this iteration
    pub fn is_rankable(&self) -> bool {
        self.is_active() && self.is_scored()
    }

    /// Clear scores so the idea sits out ranking until critiqued again
    pub fn mark_unscored(&mut self) {
        self.scores = None;
        self.overall_score = None;
    }

    /// Ranking order: higher overall score first, then ascending id
    ///
    /// Unscored ideas sort after every scored one.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        let a = self.overall_score.unwrap_or(f64::NEG_INFINITY);
        let b = other.overall_score.unwrap_or(f64::NEG_INFINITY);
        b.partial_cmp(&a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.id.cmp(&other.id))
    }
}
