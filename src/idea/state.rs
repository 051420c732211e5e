//! Run state
//!
//! The idea population for one run, stored as an arena indexed by id, plus
//! the iteration counters. Ideas are never removed, only re-statused, so the
//! full lineage stays available for audit.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::idea::{Idea, IdeaId, IdeaStatus};
use crate::error::ValidationError;

/// Unique identifier of a run
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Fresh random run id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable state of a run, threaded explicitly through every phase
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: RunId,
    pub iteration: u32,
    /// Every idea ever created in this run, in insertion order
    pub ideas: Vec<Idea>,
    pub best_idea_id: Option<IdeaId>,
    pub best_score: Option<f64>,
    pub stagnation_counter: u32,
}

impl RunState {
    /// Create an empty state for a run
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            iteration: 0,
            ideas: Vec::new(),
            best_idea_id: None,
            best_score: None,
            stagnation_counter: 0,
        }
    }

    /// Add an idea, checking id uniqueness and lineage
    ///
    /// Parents must already be in the arena and belong to an earlier
    /// generation, which keeps the lineage acyclic.
    pub fn insert_idea(&mut self, idea: Idea) -> Result<(), ValidationError> {
        if self.get(idea.id).is_some() {
            return Err(ValidationError::DuplicateIdeaId(idea.id));
        }
        self.check_lineage(&idea)?;
        self.ideas.push(idea);
        Ok(())
    }

    /// Add a batch of ideas; invalid ones are skipped and reported
    pub fn insert_batch(&mut self, ideas: Vec<Idea>) -> Vec<ValidationError> {
        let mut rejected = Vec::new();
        for idea in ideas {
            let id = idea.id;
            if let Err(err) = self.insert_idea(idea) {
                tracing::warn!(idea_id = %id, error = %err, "Rejected idea from batch");
                rejected.push(err);
            }
        }
        rejected
    }

    /// Look an idea up by id
    pub fn get(&self, id: IdeaId) -> Option<&Idea> {
        self.ideas.iter().find(|i| i.id == id)
    }

    /// Look an idea up by id for modification
    pub fn get_mut(&mut self, id: IdeaId) -> Option<&mut Idea> {
        self.ideas.iter_mut().find(|i| i.id == id)
    }

    /// Ideas currently competing
    pub fn active_ideas(&self) -> impl Iterator<Item = &Idea> {
        self.ideas.iter().filter(|i| i.is_active())
    }

    /// Active, scored ideas in ranking order (best first, ties by id)
    pub fn ranked_ideas(&self) -> Vec<&Idea> {
        let mut ranked: Vec<&Idea> = self.ideas.iter().filter(|i| i.is_rankable()).collect();
        ranked.sort_by(|a, b| a.rank_cmp(b));
        ranked
    }

    /// Direct parents of an idea
    pub fn parents_of(&self, id: IdeaId) -> Vec<&Idea> {
        self.get(id)
            .map(|idea| idea.parents.iter().filter_map(|p| self.get(*p)).collect())
            .unwrap_or_default()
    }

    /// Ideas that list `id` as a parent
    pub fn children_of(&self, id: IdeaId) -> Vec<&Idea> {
        self.ideas
            .iter()
            .filter(|i| i.parents.contains(&id))
            .collect()
    }

    /// Every transitive ancestor of an idea, nearest first
    pub fn ancestors_of(&self, id: IdeaId) -> Vec<IdeaId> {
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<IdeaId> = self
            .get(id)
            .map(|i| i.parents.iter().copied().collect())
            .unwrap_or_default();

        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            order.push(next);
            if let Some(parent) = self.get(next) {
                queue.extend(parent.parents.iter().copied());
            }
        }
        order
    }

    /// Recompute the best idea from the current ranking
    ///
    /// Returns the previous best score.
    pub fn refresh_best(&mut self) -> Option<f64> {
        let previous = self.best_score;
        if let Some((id, score)) = self
            .ranked_ideas()
            .first()
            .map(|best| (best.id, best.overall_score))
        {
            self.best_idea_id = Some(id);
            self.best_score = score;
        }
        previous
    }

    /// Re-check every invariant of the population
    ///
    /// Used when loading persisted state, where any violation is fatal.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen: HashSet<IdeaId> = HashSet::with_capacity(self.ideas.len());
        for idea in &self.ideas {
            if !seen.insert(idea.id) {
                return Err(ValidationError::DuplicateIdeaId(idea.id));
            }
        }

        for idea in &self.ideas {
            self.check_lineage(idea)?;
            check_score_fields(idea)?;
        }

        if let Some(best) = self.best_idea_id {
            if self.get(best).is_none() {
                return Err(ValidationError::UnknownIdea(best));
            }
        }
        Ok(())
    }

    fn check_lineage(&self, idea: &Idea) -> Result<(), ValidationError> {
        match (idea.origin.requires_parents(), idea.parents.is_empty()) {
            (true, true) => {
                return Err(ValidationError::Lineage {
                    idea: idea.id,
                    reason: format!("{:?} idea has no parents", idea.origin),
                })
            }
            (false, false) => {
                return Err(ValidationError::Lineage {
                    idea: idea.id,
                    reason: "generated idea has parents".to_string(),
                })
            }
            _ => {}
        }

        for parent_id in &idea.parents {
            let parent = self.get(*parent_id).ok_or(ValidationError::UnknownParent {
                idea: idea.id,
                parent: *parent_id,
            })?;
            if parent.generation >= idea.generation {
                return Err(ValidationError::Lineage {
                    idea: idea.id,
                    reason: format!(
                        "parent {} is from generation {}, not before {}",
                        parent.id, parent.generation, idea.generation
                    ),
                });
            }
        }
        Ok(())
    }
}

fn check_score_fields(idea: &Idea) -> Result<(), ValidationError> {
    if let Some(scores) = &idea.scores {
        scores.validate()?;
    }

    let invariant = |reason: &str| ValidationError::ScoreInvariant {
        idea: idea.id,
        reason: reason.to_string(),
    };

    if idea.status == IdeaStatus::Eliminated {
        return match idea.overall_score {
            Some(score) if score == 0.0 => Ok(()),
            _ => Err(invariant("eliminated idea must have overall score 0")),
        };
    }

    match (&idea.scores, idea.overall_score) {
        (Some(_), None) => Err(invariant("scores present without overall score")),
        (None, Some(_)) => Err(invariant("overall score present without scores")),
        (_, Some(score)) if !(0.0..=10.0).contains(&score) => {
            Err(invariant("overall score outside [0, 10]"))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idea::criterion::Scores;
    use crate::idea::idea::{Facets, Origin};

    fn generated(n: u128, generation: u32) -> Idea {
        Idea::new("g", "", Facets::default(), generation, Origin::Generated)
            .with_id(IdeaId::from_u128(n))
    }

    fn child(n: u128, generation: u32, parents: &[u128]) -> Idea {
        Idea::new("c", "", Facets::default(), generation, Origin::Crossover)
            .with_id(IdeaId::from_u128(n))
            .with_parents(parents.iter().map(|p| IdeaId::from_u128(*p)).collect())
    }

    fn scored(mut idea: Idea, score: f64) -> Idea {
        idea.scores = Some(Scores::uniform(score));
        idea.overall_score = Some(score);
        idea
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let mut state = RunState::new(RunId::new());
        state.insert_idea(generated(1, 1)).unwrap();
        assert_eq!(
            state.insert_idea(generated(1, 1)),
            Err(ValidationError::DuplicateIdeaId(IdeaId::from_u128(1)))
        );
    }

    #[test]
    fn test_insert_rejects_unknown_parent() {
        let mut state = RunState::new(RunId::new());
        let err = state.insert_idea(child(2, 2, &[9])).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownParent { .. }));
    }

    #[test]
    fn test_insert_rejects_parent_from_same_generation() {
        let mut state = RunState::new(RunId::new());
        state.insert_idea(generated(1, 2)).unwrap();
        let err = state.insert_idea(child(2, 2, &[1])).unwrap_err();
        assert!(matches!(err, ValidationError::Lineage { .. }));
    }

    #[test]
    fn test_insert_rejects_origin_parent_mismatch() {
        let mut state = RunState::new(RunId::new());
        state.insert_idea(generated(1, 1)).unwrap();

        let orphan = child(2, 2, &[]);
        assert!(state.insert_idea(orphan).is_err());

        let adopted = generated(3, 2).with_parents(vec![IdeaId::from_u128(1)]);
        assert!(state.insert_idea(adopted).is_err());
    }

    #[test]
    fn test_insert_batch_skips_invalid_ideas() {
        let mut state = RunState::new(RunId::new());
        let rejected = state.insert_batch(vec![generated(1, 1), generated(1, 1), generated(2, 1)]);
        assert_eq!(rejected.len(), 1);
        assert_eq!(state.ideas.len(), 2);
    }

    #[test]
    fn test_lineage_queries() {
        let mut state = RunState::new(RunId::new());
        state.insert_idea(generated(1, 1)).unwrap();
        state.insert_idea(generated(2, 1)).unwrap();
        state.insert_idea(child(3, 2, &[1, 2])).unwrap();
        state.insert_idea(child(4, 3, &[3])).unwrap();

        let parents: Vec<IdeaId> = state
            .parents_of(IdeaId::from_u128(3))
            .iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(parents, vec![IdeaId::from_u128(1), IdeaId::from_u128(2)]);

        let children: Vec<IdeaId> = state
            .children_of(IdeaId::from_u128(1))
            .iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(children, vec![IdeaId::from_u128(3)]);

        assert_eq!(
            state.ancestors_of(IdeaId::from_u128(4)),
            vec![IdeaId::from_u128(3), IdeaId::from_u128(1), IdeaId::from_u128(2)]
        );
    }

    #[test]
    fn test_ranked_ideas_excludes_unscored_and_inactive() {
        let mut state = RunState::new(RunId::new());
        state.insert_idea(scored(generated(1, 1), 6.0)).unwrap();
        state.insert_idea(scored(generated(2, 1), 8.0)).unwrap();
        state.insert_idea(generated(3, 1)).unwrap();
        let mut archived = scored(generated(4, 1), 9.0);
        archived.status = IdeaStatus::Archived;
        state.insert_idea(archived).unwrap();

        let ranked: Vec<IdeaId> = state.ranked_ideas().iter().map(|i| i.id).collect();
        assert_eq!(ranked, vec![IdeaId::from_u128(2), IdeaId::from_u128(1)]);
    }

    #[test]
    fn test_refresh_best_returns_previous() {
        let mut state = RunState::new(RunId::new());
        state.insert_idea(scored(generated(1, 1), 6.0)).unwrap();
        assert_eq!(state.refresh_best(), None);
        assert_eq!(state.best_score, Some(6.0));
        assert_eq!(state.best_idea_id, Some(IdeaId::from_u128(1)));

        state.insert_idea(scored(generated(2, 1), 7.5)).unwrap();
        assert_eq!(state.refresh_best(), Some(6.0));
        assert_eq!(state.best_score, Some(7.5));
    }

    #[test]
    fn test_validate_detects_score_invariants() {
        let mut state = RunState::new(RunId::new());
        state.insert_idea(scored(generated(1, 1), 6.0)).unwrap();
        assert!(state.validate().is_ok());

        state.ideas[0].overall_score = None;
        assert!(matches!(
            state.validate(),
            Err(ValidationError::ScoreInvariant { .. })
        ));

        state.ideas[0].overall_score = Some(3.0);
        state.ideas[0].status = IdeaStatus::Eliminated;
        assert!(state.validate().is_err());

        state.ideas[0].overall_score = Some(0.0);
        assert!(state.validate().is_ok());
    }

    #[test]
    fn test_validate_detects_duplicates_in_loaded_state() {
        let mut state = RunState::new(RunId::new());
        state.ideas.push(generated(1, 1));
        state.ideas.push(generated(1, 1));
        assert!(matches!(
            state.validate(),
            Err(ValidationError::DuplicateIdeaId(_))
        ));
    }

    #[test]
    fn test_state_json_roundtrip() {
        let mut state = RunState::new(RunId::new());
        state.insert_idea(scored(generated(1, 1), 6.0)).unwrap();
        state.iteration = 3;
        state.stagnation_counter = 1;

        let json = serde_json::to_string(&state).unwrap();
        let parsed: RunState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }
}
