//! Run configuration
//!
//! Criterion weights and the numeric knobs of a run. Everything here is
//! validated once, before a run starts; a bad configuration is a
//! [`ConfigError`] and never reaches the engines.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::idea::{Criterion, FeatureVector, RunId, CRITERION_COUNT};
use crate::phase::PhaseKind;
use crate::preference::PreferenceProfile;

/// Default learning rate for preference calibration
pub const DEFAULT_LEARNING_RATE: f64 = 0.05;

/// Positive weight per criterion, normalized to sum to 1.0
///
/// Serialized as a `criterion name -> weight` map. Construction and
/// deserialization both require exactly the eight criteria with finite,
/// strictly positive values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct CriterionWeights {
    values: FeatureVector,
}

impl CriterionWeights {
    /// Equal weight (0.125) on every criterion
    pub fn uniform() -> Self {
        Self {
            values: [1.0 / CRITERION_COUNT as f64; CRITERION_COUNT],
        }
    }

    /// Build from values in [`Criterion::ALL`] order, normalizing them
    pub fn from_values(values: FeatureVector) -> Result<Self, ConfigError> {
        for criterion in Criterion::ALL {
            let value = values[criterion.index()];
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositiveWeight {
                    criterion: criterion.name().to_string(),
                    value,
                });
            }
        }

        // Scale by the largest weight first so the sum cannot overflow
        let max = values.iter().cloned().fold(f64::MIN_POSITIVE, f64::max);
        let scaled = values.map(|v| v / max);
        let sum: f64 = scaled.iter().sum();
        let normalized = scaled.map(|v| v / sum);
        if normalized.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "criterion_weights",
                reason: "weight ratios exceed the f64 range".to_string(),
            });
        }
        Ok(Self { values: normalized })
    }

    /// Build from a `criterion name -> weight` map
    pub fn from_map(map: &BTreeMap<String, f64>) -> Result<Self, ConfigError> {
        if let Some(unknown) = map.keys().find(|k| Criterion::from_name(k).is_none()) {
            return Err(ConfigError::UnknownWeight(unknown.clone()));
        }

        let mut values = [0.0; CRITERION_COUNT];
        for criterion in Criterion::ALL {
            values[criterion.index()] = *map
                .get(criterion.name())
                .ok_or_else(|| ConfigError::MissingWeight(criterion.name().to_string()))?;
        }
        Self::from_values(values)
    }

    /// Weight of one criterion
    pub fn get(&self, criterion: Criterion) -> f64 {
        self.values[criterion.index()]
    }

    /// All weights in [`Criterion::ALL`] order
    pub fn values(&self) -> FeatureVector {
        self.values
    }

    /// Sum of the weights (1.0 up to rounding)
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Weighted sum of a feature vector
    pub fn dot(&self, features: &FeatureVector) -> f64 {
        self.values
            .iter()
            .zip(features.iter())
            .map(|(w, f)| w * f)
            .sum()
    }

    /// Weights as a `criterion name -> weight` map
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        Criterion::ALL
            .iter()
            .map(|c| (c.name().to_string(), self.get(*c)))
            .collect()
    }
}

impl Default for CriterionWeights {
    fn default() -> Self {
        Self::uniform()
    }
}

impl TryFrom<BTreeMap<String, f64>> for CriterionWeights {
    type Error = ConfigError;

    fn try_from(map: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        Self::from_map(&map)
    }
}

impl From<CriterionWeights> for BTreeMap<String, f64> {
    fn from(weights: CriterionWeights) -> Self {
        weights.to_map()
    }
}

/// Configuration of a single run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub run_id: RunId,
    /// Criterion weights used by the scoring engine
    #[serde(default)]
    pub weights: CriterionWeights,
    /// Stop once the best overall score reaches this value
    pub score_threshold: f64,
    /// Consecutive non-improving iterations tolerated
    pub stagnation_patience: u32,
    pub max_rounds: u32,
    /// Ideas kept active by selection, besides the diversity slot
    pub elite_count: usize,
    /// Target size of the active population handed to generation
    pub population_size: usize,
    /// Base seed for the diversity draw
    #[serde(default)]
    pub diversity_seed: u64,
    /// Learning rate for preference calibration
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Phases applied, in order, on every iteration
    #[serde(default = "default_phases")]
    pub phases: Vec<PhaseKind>,
}

fn default_learning_rate() -> f64 {
    DEFAULT_LEARNING_RATE
}

fn default_phases() -> Vec<PhaseKind> {
    vec![PhaseKind::Score, PhaseKind::Select]
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            run_id: RunId::new(),
            weights: CriterionWeights::uniform(),
            score_threshold: 8.7,
            stagnation_patience: 2,
            max_rounds: 6,
            elite_count: 4,
            population_size: 12,
            diversity_seed: 0,
            learning_rate: DEFAULT_LEARNING_RATE,
            phases: default_phases(),
        }
    }
}

impl RunConfig {
    /// Create a configuration with default parameters for the given run
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            ..Self::default()
        }
    }

    /// Set the criterion weights
    pub fn with_weights(mut self, weights: CriterionWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Set the stopping threshold
    pub fn with_score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = threshold;
        self
    }

    /// Set the stagnation patience
    pub fn with_stagnation_patience(mut self, patience: u32) -> Self {
        self.stagnation_patience = patience;
        self
    }

    /// Set the maximum number of rounds
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Set the elite count
    pub fn with_elite_count(mut self, elite_count: usize) -> Self {
        self.elite_count = elite_count;
        self
    }

    /// Set the population size
    pub fn with_population_size(mut self, population_size: usize) -> Self {
        self.population_size = population_size;
        self
    }

    /// Set the diversity seed
    pub fn with_diversity_seed(mut self, seed: u64) -> Self {
        self.diversity_seed = seed;
        self
    }

    /// Set the preference learning rate
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the phase sequence
    pub fn with_phases(mut self, phases: Vec<PhaseKind>) -> Self {
        self.phases = phases;
        self
    }

    /// Use the weights learned in a preference profile
    ///
    /// Profiles without derived weights leave the uniform default in place.
    pub fn with_profile(mut self, profile: &PreferenceProfile) -> Self {
        self.weights = profile.weights();
        self
    }

    /// Check every parameter
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=10.0).contains(&self.score_threshold) {
            return Err(ConfigError::InvalidThreshold(self.score_threshold));
        }
        if self.stagnation_patience == 0 {
            return Err(invalid("stagnation_patience", "must be at least 1"));
        }
        if self.max_rounds == 0 {
            return Err(invalid("max_rounds", "must be at least 1"));
        }
        if self.elite_count == 0 {
            return Err(invalid("elite_count", "must be at least 1"));
        }
        if self.population_size < self.elite_count {
            return Err(invalid(
                "population_size",
                format!("must be at least elite_count ({})", self.elite_count),
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(invalid(
                "learning_rate",
                format!("must be finite and > 0, got {}", self.learning_rate),
            ));
        }
        if self.phases.is_empty() {
            return Err(invalid("phases", "at least one phase is required"));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Malformed(e.to_string()))
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}
