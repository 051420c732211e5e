//! Scoring criteria and per-criterion score records
//!
//! Every idea is judged on the same eight fixed criteria. All of them,
//! `risk` included, are oriented "higher is better": a risk score of 9
//! means a low-risk idea. Nothing in the crate inverts a criterion.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lowest admissible criterion score
pub const MIN_SCORE: f64 = 0.0;

/// Highest admissible criterion score
pub const MAX_SCORE: f64 = 10.0;

/// Number of scoring criteria
pub const CRITERION_COUNT: usize = 8;

/// Per-criterion numeric features of an idea, in [`Criterion::ALL`] order
pub type FeatureVector = [f64; CRITERION_COUNT];

/// One of the eight fixed scoring criteria
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Feasibility,
    SpeedToValue,
    Differentiation,
    MarketSize,
    Distribution,
    Moats,
    Risk,
    Clarity,
}

impl Criterion {
    /// All criteria in canonical order
    pub const ALL: [Criterion; CRITERION_COUNT] = [
        Criterion::Feasibility,
        Criterion::SpeedToValue,
        Criterion::Differentiation,
        Criterion::MarketSize,
        Criterion::Distribution,
        Criterion::Moats,
        Criterion::Risk,
        Criterion::Clarity,
    ];

    /// Wire name of this criterion
    pub fn name(&self) -> &'static str {
        match self {
            Self::Feasibility => "feasibility",
            Self::SpeedToValue => "speed_to_value",
            Self::Differentiation => "differentiation",
            Self::MarketSize => "market_size",
            Self::Distribution => "distribution",
            Self::Moats => "moats",
            Self::Risk => "risk",
            Self::Clarity => "clarity",
        }
    }

    /// Look a criterion up by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }

    /// Position of this criterion in [`Criterion::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scores for all eight criteria, each in [0, 10]
///
/// Deserialization rejects unknown and missing keys; the range is checked by
/// [`Scores::validate`] so that out-of-range input is reported rather than
/// clamped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scores {
    pub feasibility: f64,
    pub speed_to_value: f64,
    pub differentiation: f64,
    pub market_size: f64,
    pub distribution: f64,
    pub moats: f64,
    pub risk: f64,
    pub clarity: f64,
}

impl Scores {
    /// Same score on every criterion
    pub fn uniform(value: f64) -> Self {
        Self::from_features([value; CRITERION_COUNT])
    }

    /// Build from a feature vector in [`Criterion::ALL`] order
    pub fn from_features(f: FeatureVector) -> Self {
        Self {
            feasibility: f[0],
            speed_to_value: f[1],
            differentiation: f[2],
            market_size: f[3],
            distribution: f[4],
            moats: f[5],
            risk: f[6],
            clarity: f[7],
        }
    }

    /// Build from a name -> score map as produced by an external critic
    ///
    /// The map must name exactly the eight criteria and every value must lie
    /// in [0, 10].
    pub fn from_map(map: &BTreeMap<String, f64>) -> Result<Self, ValidationError> {
        if let Some(unknown) = map.keys().find(|k| Criterion::from_name(k).is_none()) {
            return Err(ValidationError::UnknownCriterion(unknown.clone()));
        }

        let mut features = [0.0; CRITERION_COUNT];
        for criterion in Criterion::ALL {
            let value = map
                .get(criterion.name())
                .ok_or_else(|| ValidationError::MissingCriterion(criterion.name().to_string()))?;
            features[criterion.index()] = *value;
        }

        let scores = Self::from_features(features);
        scores.validate()?;
        Ok(scores)
    }

    /// Score for one criterion
    pub fn get(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Feasibility => self.feasibility,
            Criterion::SpeedToValue => self.speed_to_value,
            Criterion::Differentiation => self.differentiation,
            Criterion::MarketSize => self.market_size,
            Criterion::Distribution => self.distribution,
            Criterion::Moats => self.moats,
            Criterion::Risk => self.risk,
            Criterion::Clarity => self.clarity,
        }
    }

    /// Feature vector used for ranking and preference learning
    pub fn features(&self) -> FeatureVector {
        Criterion::ALL.map(|c| self.get(c))
    }

    /// Check that every score is finite and within [0, 10]
    pub fn validate(&self) -> Result<(), ValidationError> {
        for criterion in Criterion::ALL {
            let value = self.get(criterion);
            if !(MIN_SCORE..=MAX_SCORE).contains(&value) {
                return Err(ValidationError::ScoreOutOfRange {
                    criterion: criterion.name().to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}
