//! Portable preference profiles
//!
//! A profile packages one run's tournament (comparisons and Elo ratings)
//! with the weights learned from it, so a later run can score ideas the way
//! this user ranks them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::learner::{DerivedPreferences, PreferenceLearner};
use crate::config::CriterionWeights;
use crate::error::{EvoResult, StorageError};
use crate::idea::{IdeaId, RunId, RunState};
use crate::tournament::{Comparison, TournamentState};

/// Current profile format version
pub const PROFILE_VERSION: u32 = 1;

/// Counts describing the tournament behind a profile
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStats {
    pub comparisons: usize,
    pub ideas_rated: usize,
}

/// Exported preferences of one run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreferenceProfile {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub source_run: RunId,
    pub stats: ProfileStats,
    pub comparisons: Vec<Comparison>,
    pub elo_ratings: BTreeMap<IdeaId, f64>,
    /// Learned weights; absent in profiles exported without a fit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedPreferences>,
}

impl PreferenceProfile {
    /// Profile holding a tournament without derived weights
    pub fn new(source_run: RunId, tournament: &TournamentState) -> Self {
        Self {
            version: PROFILE_VERSION,
            created_at: Utc::now(),
            source_run,
            stats: ProfileStats {
                comparisons: tournament.comparisons.len(),
                ideas_rated: tournament.ratings.len(),
            },
            comparisons: tournament.comparisons.clone(),
            elo_ratings: tournament.ratings.clone(),
            derived: None,
        }
    }

    /// Profile for a finished tournament, with weights learned from it
    pub fn build(
        state: &RunState,
        tournament: &TournamentState,
        learner: &PreferenceLearner,
    ) -> EvoResult<Self> {
        let derived = learner.learn_from_log(&tournament.comparisons, state)?;
        Ok(Self::new(state.run_id, tournament).with_derived(derived))
    }

    /// Attach learned preferences
    pub fn with_derived(mut self, derived: DerivedPreferences) -> Self {
        self.derived = Some(derived);
        self
    }

    /// Weights to score with: the derived ones, or uniform
    pub fn weights(&self) -> CriterionWeights {
        self.derived
            .as_ref()
            .map(|d| d.criterion_weights.clone())
            .unwrap_or_default()
    }

    /// Rebuild the tournament state carried by this profile
    pub fn tournament(&self) -> TournamentState {
        TournamentState {
            comparisons: self.comparisons.clone(),
            ratings: self.elo_ratings.clone(),
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string_pretty(self).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Parse a profile, refusing versions newer than [`PROFILE_VERSION`]
    ///
    /// The version is read before the rest of the document so a newer layout
    /// is reported as such instead of as a parse failure.
    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| StorageError::Deserialization(e.to_string()))?;

        let version = value
            .get("version")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| StorageError::Deserialization("missing profile version".to_string()))?;
        let version = u32::try_from(version).unwrap_or(u32::MAX);
        if version > PROFILE_VERSION {
            return Err(StorageError::VersionTooNew(version));
        }

        serde_json::from_value(value).map_err(|e| StorageError::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idea::{Facets, Idea, Origin, Scores};

    fn scored(n: u128, scores: Scores) -> Idea {
        let mut idea = Idea::new("t", "s", Facets::default(), 1, Origin::Generated)
            .with_id(IdeaId::from_u128(n));
        idea.scores = Some(scores);
        idea.overall_score = Some(5.0);
        idea
    }

    fn sample() -> (RunState, TournamentState) {
        let mut state = RunState::new(RunId::new());
        let mut a = Scores::uniform(5.0);
        a.clarity = 9.0;
        let mut b = Scores::uniform(5.0);
        b.distribution = 8.0;
        let c = Scores::uniform(4.0);
        state.insert_idea(scored(1, a)).unwrap();
        state.insert_idea(scored(2, b)).unwrap();
        state.insert_idea(scored(3, c)).unwrap();

        let (x, y, z) = (IdeaId::from_u128(1), IdeaId::from_u128(2), IdeaId::from_u128(3));
        let mut t = TournamentState::new();
        t.record_comparison(x, y, x).unwrap();
        t.record_comparison(y, z, y).unwrap();
        t.record_comparison(x, z, x).unwrap();
        (state, t)
    }

    #[test]
    fn test_build_profile() {
        let (state, t) = sample();
        let profile = PreferenceProfile::build(&state, &t, &PreferenceLearner::new()).unwrap();

        assert_eq!(profile.version, PROFILE_VERSION);
        assert_eq!(profile.source_run, state.run_id);
        assert_eq!(profile.stats, ProfileStats { comparisons: 3, ideas_rated: 3 });
        let derived = profile.derived.as_ref().unwrap();
        assert_eq!(derived.fit.comparisons_used, 3);
        assert_eq!(derived.fit.holdout_accuracy, None);
        assert!(profile.weights().get(crate::idea::Criterion::Clarity) > 0.125);
    }

    #[test]
    fn test_round_trip_preserves_weights() {
        let (state, t) = sample();
        let profile = PreferenceProfile::build(&state, &t, &PreferenceLearner::new()).unwrap();
        let restored = PreferenceProfile::from_json(&profile.to_json().unwrap()).unwrap();

        for (a, b) in profile.weights().values().iter().zip(restored.weights().values()) {
            assert!((a - b).abs() < 1e-9);
        }
        assert_eq!(restored.comparisons, profile.comparisons);
        for (id, rating) in &t.ratings {
            assert!((restored.tournament().rating(*id) - rating).abs() < 1e-9);
        }
    }

    #[test]
    fn test_profile_without_derived_uses_uniform() {
        let (_, t) = sample();
        let profile = PreferenceProfile::new(RunId::new(), &t);
        let json = profile.to_json().unwrap();
        assert!(!json.contains("derived"));

        let restored = PreferenceProfile::from_json(&json).unwrap();
        assert_eq!(restored.weights(), CriterionWeights::uniform());
    }

    #[test]
    fn test_newer_version_is_rejected() {
        let (_, t) = sample();
        let mut value = serde_json::to_value(PreferenceProfile::new(RunId::new(), &t)).unwrap();
        value["version"] = serde_json::json!(PROFILE_VERSION + 1);
        value["comparisons"] = serde_json::json!("layout changed");

        let err = PreferenceProfile::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, StorageError::VersionTooNew(v) if v == PROFILE_VERSION + 1));
    }

    #[test]
    fn test_malformed_profile() {
        assert!(matches!(
            PreferenceProfile::from_json("{\"stats\": {}}"),
            Err(StorageError::Deserialization(_))
        ));
    }
}
