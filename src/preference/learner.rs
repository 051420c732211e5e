//! Criterion weights learned from pairwise preferences
//!
//! Each `(winner, loser)` pair nudges the weight of every criterion by
//! `exp(learning_rate · delta)`, where `delta` is how much better the winner
//! scored on that criterion. Weights start at 1.0, are clamped into
//! [`WeightBounds`] after every update and normalized once at the end.
//!
//! Pairs are processed strictly in input order, so identical inputs always
//! produce bit-identical weights.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{CriterionWeights, DEFAULT_LEARNING_RATE};
use crate::error::{ConfigError, EvoResult, ValidationError};
use crate::idea::{Criterion, FeatureVector, IdeaId, RunState, CRITERION_COUNT};
use crate::tournament::Comparison;

/// Tag recorded in fit reports
pub const FIT_METHOD: &str = "pairwise-multiplicative-weights";

/// Every `HOLDOUT_STRIDE`-th pair is held out for testing
pub const HOLDOUT_STRIDE: usize = 5;

/// Whether the pair at `index` belongs to the holdout set
pub fn is_holdout(index: usize) -> bool {
    index % HOLDOUT_STRIDE == HOLDOUT_STRIDE - 1
}

/// Clamp range for raw (pre-normalization) weights
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightBounds {
    pub min: f64,
    pub max: f64,
}

impl WeightBounds {
    /// Create bounds
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Check `0 < min <= max`, both finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min.is_finite() && self.max.is_finite() && self.min > 0.0 && self.min <= self.max)
        {
            return Err(ConfigError::InvalidParameter {
                name: "weight_bounds",
                reason: format!("need 0 < min <= max, got [{}, {}]", self.min, self.max),
            });
        }
        Ok(())
    }
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self::new(0.1, 10.0)
    }
}

/// One observed preference
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencePair {
    pub winner: IdeaId,
    pub loser: IdeaId,
}

impl From<&Comparison> for PreferencePair {
    fn from(comparison: &Comparison) -> Self {
        Self {
            winner: comparison.winner,
            loser: comparison.loser(),
        }
    }
}

/// Feature vectors of every idea in the run that carries scores
pub fn feature_map(state: &RunState) -> BTreeMap<IdeaId, FeatureVector> {
    state
        .ideas
        .iter()
        .filter_map(|idea| idea.scores.as_ref().map(|s| (idea.id, s.features())))
        .collect()
}

/// Preference pairs from a comparison log, in log order
///
/// Comparisons involving an idea without a feature vector are skipped.
pub fn pairs_from_comparisons(
    comparisons: &[Comparison],
    features: &BTreeMap<IdeaId, FeatureVector>,
) -> Vec<PreferencePair> {
    let mut skipped = 0usize;
    let pairs: Vec<PreferencePair> = comparisons
        .iter()
        .map(PreferencePair::from)
        .filter(|pair| {
            let usable =
                features.contains_key(&pair.winner) && features.contains_key(&pair.loser);
            if !usable {
                skipped += 1;
            }
            usable
        })
        .collect();

    if skipped > 0 {
        tracing::warn!(skipped, "Skipped comparisons without feature vectors");
    }
    pairs
}

fn features_of(
    features: &BTreeMap<IdeaId, FeatureVector>,
    id: IdeaId,
) -> Result<&FeatureVector, ValidationError> {
    features.get(&id).ok_or(ValidationError::MissingFeatures(id))
}

fn feature_delta(
    pair: &PreferencePair,
    features: &BTreeMap<IdeaId, FeatureVector>,
) -> Result<FeatureVector, ValidationError> {
    let winner = features_of(features, pair.winner)?;
    let loser = features_of(features, pair.loser)?;
    Ok(std::array::from_fn(|k| winner[k] - loser[k]))
}

fn check_learning_rate(learning_rate: f64) -> Result<(), ConfigError> {
    if !learning_rate.is_finite() || learning_rate <= 0.0 {
        return Err(ConfigError::InvalidParameter {
            name: "learning_rate",
            reason: format!("must be finite and > 0, got {learning_rate}"),
        });
    }
    Ok(())
}

/// Fit criterion weights to an ordered list of preferences
///
/// An empty list yields the uniform vector. Every id in `pairs` must have a
/// feature vector.
pub fn derive_weights(
    pairs: &[PreferencePair],
    features: &BTreeMap<IdeaId, FeatureVector>,
    learning_rate: f64,
    bounds: WeightBounds,
) -> EvoResult<CriterionWeights> {
    check_learning_rate(learning_rate)?;
    bounds.validate()?;

    if pairs.is_empty() {
        return Ok(CriterionWeights::uniform());
    }

    let mut weights = [1.0; CRITERION_COUNT];
    for pair in pairs {
        let delta = feature_delta(pair, features)?;
        for (w, d) in weights.iter_mut().zip(delta.iter()) {
            *w = (*w * (learning_rate * d).exp()).clamp(bounds.min, bounds.max);
        }
    }

    Ok(CriterionWeights::from_values(weights)?)
}

/// Fit metadata stored alongside derived weights
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub method: String,
    pub comparisons_used: usize,
    /// Share of holdout pairs the train-only weights predict; `None` when
    /// nothing was held out
    pub holdout_accuracy: Option<f64>,
    #[serde(default)]
    pub train_size: usize,
    #[serde(default)]
    pub test_size: usize,
}

/// Share of pairs where the weights strictly prefer the winner
fn pairwise_accuracy(
    weights: &CriterionWeights,
    pairs: &[PreferencePair],
    features: &BTreeMap<IdeaId, FeatureVector>,
) -> Result<Option<f64>, ValidationError> {
    if pairs.is_empty() {
        return Ok(None);
    }
    let mut correct = 0usize;
    for pair in pairs {
        if weights.dot(&feature_delta(pair, features)?) > 0.0 {
            correct += 1;
        }
    }
    Ok(Some(correct as f64 / pairs.len() as f64))
}

/// Holdout evaluation of [`derive_weights`] with default bounds
///
/// Pairs at index `i` with `i % 5 == 4` form the test set; weights are fit
/// on the rest and scored on the test set.
pub fn evaluate_fit(
    pairs: &[PreferencePair],
    features: &BTreeMap<IdeaId, FeatureVector>,
    learning_rate: f64,
) -> EvoResult<FitReport> {
    evaluate_fit_with_bounds(pairs, features, learning_rate, WeightBounds::default())
}

fn evaluate_fit_with_bounds(
    pairs: &[PreferencePair],
    features: &BTreeMap<IdeaId, FeatureVector>,
    learning_rate: f64,
    bounds: WeightBounds,
) -> EvoResult<FitReport> {
    let (test, train): (Vec<(usize, &PreferencePair)>, Vec<(usize, &PreferencePair)>) =
        pairs.iter().enumerate().partition(|(i, _)| is_holdout(*i));
    let train: Vec<PreferencePair> = train.into_iter().map(|(_, p)| *p).collect();
    let test: Vec<PreferencePair> = test.into_iter().map(|(_, p)| *p).collect();

    let weights = derive_weights(&train, features, learning_rate, bounds)?;
    let holdout_accuracy = pairwise_accuracy(&weights, &test, features)?;

    Ok(FitReport {
        method: FIT_METHOD.to_string(),
        comparisons_used: pairs.len(),
        holdout_accuracy,
        train_size: train.len(),
        test_size: test.len(),
    })
}

/// Two-line description of the strongest and weakest criteria
pub fn summarize_weights(weights: &CriterionWeights) -> Vec<String> {
    let mut ranked: Vec<(Criterion, f64)> =
        Criterion::ALL.iter().map(|c| (*c, weights.get(*c))).collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let top = &ranked[..2];
    let bottom = &ranked[CRITERION_COUNT - 2..];
    vec![
        format!(
            "Prioritizes {} and {} over other criteria.",
            top[0].0, top[1].0
        ),
        format!(
            "De-emphasizes {} and {} relative to other criteria.",
            bottom[1].0, bottom[0].0
        ),
    ]
}

/// Weights, fit metadata and summary learned from one set of preferences
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DerivedPreferences {
    pub criterion_weights: CriterionWeights,
    pub fit: FitReport,
    pub summary: Vec<String>,
}

/// Multiplicative-weights preference learner
#[derive(Clone, Debug)]
pub struct PreferenceLearner {
    learning_rate: f64,
    bounds: WeightBounds,
}

impl PreferenceLearner {
    /// Create a learner with the default learning rate and bounds
    pub fn new() -> Self {
        Self {
            learning_rate: DEFAULT_LEARNING_RATE,
            bounds: WeightBounds::default(),
        }
    }

    /// Set the learning rate
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the weight clamp range
    pub fn with_bounds(mut self, bounds: WeightBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Fit on every pair and report holdout accuracy
    ///
    /// The returned weights use all pairs; the fit report reflects a model
    /// trained without the holdout set.
    pub fn learn(
        &self,
        pairs: &[PreferencePair],
        features: &BTreeMap<IdeaId, FeatureVector>,
    ) -> EvoResult<DerivedPreferences> {
        let criterion_weights = derive_weights(pairs, features, self.learning_rate, self.bounds)?;
        let fit = evaluate_fit_with_bounds(pairs, features, self.learning_rate, self.bounds)?;
        let summary = summarize_weights(&criterion_weights);

        tracing::info!(
            comparisons = fit.comparisons_used,
            holdout_accuracy = ?fit.holdout_accuracy,
            "Preference weights derived"
        );
        Ok(DerivedPreferences {
            criterion_weights,
            fit,
            summary,
        })
    }

    /// Learn from a tournament log over a run's ideas
    pub fn learn_from_log(
        &self,
        comparisons: &[Comparison],
        state: &RunState,
    ) -> EvoResult<DerivedPreferences> {
        let features = feature_map(state);
        let pairs = pairs_from_comparisons(comparisons, &features);
        self.learn(&pairs, &features)
    }
}

impl Default for PreferenceLearner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvoIdeaError;

    fn id(n: u128) -> IdeaId {
        IdeaId::from_u128(n)
    }

    fn features(entries: &[(u128, FeatureVector)]) -> BTreeMap<IdeaId, FeatureVector> {
        entries.iter().map(|(n, f)| (id(*n), *f)).collect()
    }

    fn pair(winner: u128, loser: u128) -> PreferencePair {
        PreferencePair {
            winner: id(winner),
            loser: id(loser),
        }
    }

    /// Idea 1 is strong on feasibility, idea 2 on moats
    fn feasibility_vs_moats() -> BTreeMap<IdeaId, FeatureVector> {
        let mut feasible = [5.0; CRITERION_COUNT];
        feasible[Criterion::Feasibility.index()] = 9.0;
        feasible[Criterion::Moats.index()] = 2.0;
        let mut moated = [5.0; CRITERION_COUNT];
        moated[Criterion::Feasibility.index()] = 2.0;
        moated[Criterion::Moats.index()] = 9.0;
        features(&[(1, feasible), (2, moated)])
    }

    #[test]
    fn test_no_pairs_gives_uniform() {
        let weights =
            derive_weights(&[], &BTreeMap::new(), 0.05, WeightBounds::default()).unwrap();
        assert_eq!(weights.values(), [0.125; CRITERION_COUNT]);

        let fit = evaluate_fit(&[], &BTreeMap::new(), 0.05).unwrap();
        assert_eq!(fit.comparisons_used, 0);
        assert_eq!(fit.holdout_accuracy, None);
        assert_eq!(fit.method, FIT_METHOD);
    }

    #[test]
    fn test_winning_criterion_gains_weight() {
        let f = feasibility_vs_moats();
        let pairs = vec![pair(1, 2); 6];
        let weights = derive_weights(&pairs, &f, 0.05, WeightBounds::default()).unwrap();

        let feasibility = weights.get(Criterion::Feasibility);
        let moats = weights.get(Criterion::Moats);
        let clarity = weights.get(Criterion::Clarity);
        assert!(feasibility > clarity);
        assert!(clarity > moats);
        assert!((weights.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_comparison_raises_deciding_criterion() {
        let mut a = [5.0; CRITERION_COUNT];
        a[Criterion::Feasibility.index()] = 8.0;
        let mut b = [5.0; CRITERION_COUNT];
        b[Criterion::Feasibility.index()] = 3.0;
        let f = features(&[(1, a), (2, b)]);

        let weights = derive_weights(&[pair(1, 2)], &f, 0.05, WeightBounds::default()).unwrap();
        assert!(weights.get(Criterion::Feasibility) > 0.125);
        for criterion in Criterion::ALL.iter().filter(|c| **c != Criterion::Feasibility) {
            assert!(weights.get(*criterion) <= 0.125);
        }
    }

    #[test]
    fn test_clamp_bounds_raw_weights() {
        let f = feasibility_vs_moats();
        let pairs = vec![pair(1, 2); 200];
        let weights = derive_weights(&pairs, &f, 0.5, WeightBounds::default()).unwrap();

        // raw: feasibility 10, moats 0.1, six others 1.0
        let total = 10.0 + 0.1 + 6.0;
        assert!((weights.get(Criterion::Feasibility) - 10.0 / total).abs() < 1e-12);
        assert!((weights.get(Criterion::Moats) - 0.1 / total).abs() < 1e-12);
    }

    #[test]
    fn test_order_matters_but_is_deterministic() {
        let f = feasibility_vs_moats();
        let pairs = vec![pair(1, 2), pair(2, 1), pair(1, 2)];
        let a = derive_weights(&pairs, &f, 0.3, WeightBounds::default()).unwrap();
        let b = derive_weights(&pairs, &f, 0.3, WeightBounds::default()).unwrap();
        assert_eq!(a.values(), b.values());
    }

    #[test]
    fn test_missing_features_is_an_error() {
        let f = feasibility_vs_moats();
        let err = derive_weights(&[pair(1, 3)], &f, 0.05, WeightBounds::default()).unwrap_err();
        assert!(matches!(
            err,
            EvoIdeaError::Validation(ValidationError::MissingFeatures(missing)) if missing == id(3)
        ));
    }

    #[test]
    fn test_invalid_learning_rate_and_bounds() {
        let f = feasibility_vs_moats();
        assert!(matches!(
            derive_weights(&[pair(1, 2)], &f, 0.0, WeightBounds::default()),
            Err(EvoIdeaError::Config(_))
        ));
        assert!(matches!(
            derive_weights(&[pair(1, 2)], &f, 0.05, WeightBounds::new(2.0, 1.0)),
            Err(EvoIdeaError::Config(_))
        ));
    }

    #[test]
    fn test_holdout_split_is_positional() {
        let held: Vec<usize> = (0..12).filter(|i| is_holdout(*i)).collect();
        assert_eq!(held, vec![4, 9]);

        let f = feasibility_vs_moats();
        let pairs = vec![pair(1, 2); 4];
        let fit = evaluate_fit(&pairs, &f, 0.05).unwrap();
        assert_eq!(fit.test_size, 0);
        assert_eq!(fit.holdout_accuracy, None);
    }

    #[test]
    fn test_consistent_preferences_predict_holdout() {
        let f = feasibility_vs_moats();
        let pairs = vec![pair(1, 2); 10];
        let fit = evaluate_fit(&pairs, &f, 0.05).unwrap();

        assert_eq!(fit.comparisons_used, 10);
        assert_eq!(fit.train_size, 8);
        assert_eq!(fit.test_size, 2);
        assert_eq!(fit.holdout_accuracy, Some(1.0));
    }

    #[test]
    fn test_contradicted_holdout_scores_zero() {
        let f = feasibility_vs_moats();
        let mut pairs = vec![pair(1, 2); 5];
        pairs[4] = pair(2, 1);
        let fit = evaluate_fit(&pairs, &f, 0.05).unwrap();
        assert_eq!(fit.holdout_accuracy, Some(0.0));
    }

    #[test]
    fn test_pairs_from_comparisons_skips_unknown_ideas() {
        let f = feasibility_vs_moats();
        let log = vec![
            Comparison {
                idea_a: id(1),
                idea_b: id(2),
                winner: id(2),
            },
            Comparison {
                idea_a: id(1),
                idea_b: id(7),
                winner: id(1),
            },
        ];
        assert_eq!(pairs_from_comparisons(&log, &f), vec![pair(2, 1)]);
    }

    #[test]
    fn test_summary_names_extremes() {
        let mut raw = [1.0; CRITERION_COUNT];
        raw[Criterion::Clarity.index()] = 4.0;
        raw[Criterion::SpeedToValue.index()] = 3.0;
        raw[Criterion::Risk.index()] = 0.2;
        raw[Criterion::MarketSize.index()] = 0.5;
        let weights = CriterionWeights::from_values(raw).unwrap();

        assert_eq!(
            summarize_weights(&weights),
            vec![
                "Prioritizes clarity and speed_to_value over other criteria.".to_string(),
                "De-emphasizes risk and market_size relative to other criteria.".to_string(),
            ]
        );
    }

    #[test]
    fn test_learner_combines_fit_and_summary() {
        let f = feasibility_vs_moats();
        let pairs = vec![pair(1, 2); 5];
        let derived = PreferenceLearner::new().learn(&pairs, &f).unwrap();

        assert_eq!(derived.fit.comparisons_used, 5);
        assert_eq!(derived.summary.len(), 2);
        assert!(derived.summary[0].contains("feasibility"));
        assert!(derived.summary[1].contains("moats"));
    }

    #[test]
    fn test_fit_report_uses_learner_bounds() {
        let mut strong = [4.0; CRITERION_COUNT];
        strong[Criterion::Feasibility.index()] = 9.0;
        let f = features(&[(1, [6.0; CRITERION_COUNT]), (2, strong)]);
        // Training favors feasibility; the holdout pair favors everything else
        let pairs = vec![pair(2, 1), pair(2, 1), pair(2, 1), pair(2, 1), pair(1, 2)];

        let clamped = PreferenceLearner::new().with_learning_rate(1.0);
        let derived = clamped.learn(&pairs, &f).unwrap();
        assert_eq!(derived.fit.holdout_accuracy, Some(0.0));

        let fixed = clamped.with_bounds(WeightBounds::new(1.0, 1.0));
        let derived = fixed.learn(&pairs, &f).unwrap();
        assert_eq!(derived.criterion_weights, CriterionWeights::uniform());
        assert_eq!(derived.fit.holdout_accuracy, Some(1.0));
    }
}
