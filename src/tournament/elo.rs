//! Elo ratings over a comparison log
//!
//! Every recorded comparison is appended to the log and immediately folded
//! into the ratings with the classic logistic expectation. There are no
//! draws: every comparison has exactly one winner.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::idea::IdeaId;

/// Rating change per game
pub const ELO_K_FACTOR: f64 = 32.0;

/// Rating assigned to an idea on its first appearance
pub const ELO_BASE_RATING: f64 = 1200.0;

/// Probability that a player rated `rating_a` beats one rated `rating_b`
pub fn expected_score(rating_a: f64, rating_b: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf((rating_b - rating_a) / 400.0))
}

/// One pairwise comparison
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub idea_a: IdeaId,
    pub idea_b: IdeaId,
    pub winner: IdeaId,
}

impl Comparison {
    /// The losing side
    pub fn loser(&self) -> IdeaId {
        if self.winner == self.idea_a {
            self.idea_b
        } else {
            self.idea_a
        }
    }

    /// Whether this comparison is between `x` and `y`, in either order
    pub fn involves_pair(&self, x: IdeaId, y: IdeaId) -> bool {
        (self.idea_a == x && self.idea_b == y) || (self.idea_a == y && self.idea_b == x)
    }
}

/// Ratings before and after one comparison
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EloUpdate {
    pub rating_a_before: f64,
    pub rating_b_before: f64,
    pub rating_a_after: f64,
    pub rating_b_after: f64,
}

/// Comparison log plus current Elo ratings
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TournamentState {
    /// Every comparison, in the order recorded
    pub comparisons: Vec<Comparison>,
    /// Current rating per idea
    #[serde(rename = "elo_ratings")]
    pub ratings: BTreeMap<IdeaId, f64>,
}

impl TournamentState {
    /// Create an empty tournament
    pub fn new() -> Self {
        Self::default()
    }

    /// Current rating of an idea, or the base rating if unseen
    pub fn rating(&self, id: IdeaId) -> f64 {
        self.ratings.get(&id).copied().unwrap_or(ELO_BASE_RATING)
    }

    /// Record a comparison and update both ratings
    ///
    /// `K·(actual − expected)` is added to one side and subtracted from the
    /// other, so the rating total is preserved.
    pub fn record_comparison(
        &mut self,
        idea_a: IdeaId,
        idea_b: IdeaId,
        winner: IdeaId,
    ) -> Result<EloUpdate, ValidationError> {
        if idea_a == idea_b {
            return Err(ValidationError::SelfComparison(idea_a));
        }
        if winner != idea_a && winner != idea_b {
            return Err(ValidationError::WinnerNotParticipant {
                idea_a,
                idea_b,
                winner,
            });
        }

        let rating_a = self.rating(idea_a);
        let rating_b = self.rating(idea_b);

        let expected_a = expected_score(rating_a, rating_b);
        let actual_a = if winner == idea_a { 1.0 } else { 0.0 };
        let delta = ELO_K_FACTOR * (actual_a - expected_a);

        let update = EloUpdate {
            rating_a_before: rating_a,
            rating_b_before: rating_b,
            rating_a_after: rating_a + delta,
            rating_b_after: rating_b - delta,
        };

        self.ratings.insert(idea_a, update.rating_a_after);
        self.ratings.insert(idea_b, update.rating_b_after);
        self.comparisons.push(Comparison {
            idea_a,
            idea_b,
            winner,
        });

        tracing::debug!(
            idea_a = %idea_a,
            idea_b = %idea_b,
            winner = %winner,
            rating_a = update.rating_a_after,
            rating_b = update.rating_b_after,
            "Comparison recorded"
        );
        Ok(update)
    }

    /// Most recent logged winner between two ideas, if they have met
    pub fn logged_winner(&self, x: IdeaId, y: IdeaId) -> Option<IdeaId> {
        self.comparisons
            .iter()
            .rev()
            .find(|c| c.involves_pair(x, y))
            .map(|c| c.winner)
    }

    /// Ideas ordered by rating, highest first, ties by ascending id
    pub fn rankings(&self) -> Vec<(IdeaId, f64)> {
        let mut ranked: Vec<(IdeaId, f64)> = self.ratings.iter().map(|(id, r)| (*id, *r)).collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked
    }

    /// Pair not yet compared whose ratings are closest
    ///
    /// Comparing near-equal ideas is the most informative next question.
    /// Returns `None` once every pair has been played.
    pub fn closest_unplayed_pair(&self, ids: &[IdeaId]) -> Option<(IdeaId, IdeaId)> {
        let played: BTreeSet<(IdeaId, IdeaId)> = self
            .comparisons
            .iter()
            .map(|c| ordered_pair(c.idea_a, c.idea_b))
            .collect();

        let mut best: Option<((IdeaId, IdeaId), f64)> = None;
        for (i, a) in ids.iter().enumerate() {
            for b in ids.iter().skip(i + 1) {
                if a == b || played.contains(&ordered_pair(*a, *b)) {
                    continue;
                }
                let gap = (self.rating(*a) - self.rating(*b)).abs();
                if best.map_or(true, |(_, g)| gap < g) {
                    best = Some(((*a, *b), gap));
                }
            }
        }
        best.map(|(pair, _)| pair)
    }

    /// Number of comparisons recorded
    pub fn comparison_count(&self) -> usize {
        self.comparisons.len()
    }
}

fn ordered_pair(x: IdeaId, y: IdeaId) -> (IdeaId, IdeaId) {
    if x <= y {
        (x, y)
    } else {
        (y, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u128) -> IdeaId {
        IdeaId::from_u128(n)
    }

    #[test]
    fn test_first_comparison_from_base_rating() {
        let mut t = TournamentState::new();
        let update = t.record_comparison(id(1), id(2), id(1)).unwrap();

        assert_eq!(update.rating_a_before, ELO_BASE_RATING);
        assert_eq!(update.rating_b_before, ELO_BASE_RATING);
        assert!((update.rating_a_after - 1216.0).abs() < 1e-9);
        assert!((update.rating_b_after - 1184.0).abs() < 1e-9);
        assert_eq!(t.comparison_count(), 1);
    }

    #[test]
    fn test_update_is_zero_sum() {
        let mut t = TournamentState::new();
        t.record_comparison(id(1), id(2), id(1)).unwrap();
        t.record_comparison(id(1), id(3), id(1)).unwrap();
        let update = t.record_comparison(id(2), id(1), id(2)).unwrap();

        let before = update.rating_a_before + update.rating_b_before;
        let after = update.rating_a_after + update.rating_b_after;
        assert!((before - after).abs() < 1e-9);
    }

    #[test]
    fn test_upset_moves_more_than_expected_win() {
        let mut t = TournamentState::new();
        t.ratings.insert(id(1), 1400.0);
        t.ratings.insert(id(2), 1200.0);

        let expected = t.clone().record_comparison(id(1), id(2), id(1)).unwrap();
        let upset = t.record_comparison(id(1), id(2), id(2)).unwrap();

        let expected_gain = expected.rating_a_after - expected.rating_a_before;
        let upset_gain = upset.rating_b_after - upset.rating_b_before;
        assert!(upset_gain > expected_gain);
    }

    #[test]
    fn test_rejects_invalid_comparisons() {
        let mut t = TournamentState::new();
        assert_eq!(
            t.record_comparison(id(1), id(1), id(1)),
            Err(ValidationError::SelfComparison(id(1)))
        );
        assert!(matches!(
            t.record_comparison(id(1), id(2), id(3)),
            Err(ValidationError::WinnerNotParticipant { .. })
        ));
        assert!(t.comparisons.is_empty());
        assert!(t.ratings.is_empty());
    }

    #[test]
    fn test_logged_winner_is_order_independent() {
        let mut t = TournamentState::new();
        t.record_comparison(id(1), id(2), id(2)).unwrap();
        assert_eq!(t.logged_winner(id(2), id(1)), Some(id(2)));
        assert_eq!(t.logged_winner(id(1), id(3)), None);
    }

    #[test]
    fn test_rankings_sorted_by_rating() {
        let mut t = TournamentState::new();
        t.record_comparison(id(1), id(2), id(2)).unwrap();
        t.record_comparison(id(3), id(1), id(3)).unwrap();

        let ranked: Vec<IdeaId> = t.rankings().into_iter().map(|(i, _)| i).collect();
        assert_eq!(ranked[0], id(2));
        assert_eq!(ranked[2], id(1));
    }

    #[test]
    fn test_closest_unplayed_pair() {
        let mut t = TournamentState::new();
        t.ratings.insert(id(1), 1000.0);
        t.ratings.insert(id(2), 1100.0);
        t.ratings.insert(id(3), 1500.0);
        t.ratings.insert(id(4), 1110.0);

        let ids = [id(1), id(2), id(3), id(4)];
        assert_eq!(t.closest_unplayed_pair(&ids), Some((id(2), id(4))));

        t.comparisons.push(Comparison {
            idea_a: id(4),
            idea_b: id(2),
            winner: id(4),
        });
        assert_eq!(t.closest_unplayed_pair(&ids), Some((id(1), id(2))));
    }

    #[test]
    fn test_closest_unplayed_pair_exhausted() {
        let mut t = TournamentState::new();
        t.record_comparison(id(1), id(2), id(1)).unwrap();
        assert_eq!(t.closest_unplayed_pair(&[id(1), id(2)]), None);
    }

    #[test]
    fn test_state_json_uses_elo_ratings_key() {
        let mut t = TournamentState::new();
        t.record_comparison(id(1), id(2), id(1)).unwrap();
        let json = serde_json::to_value(&t).unwrap();
        assert!(json.get("elo_ratings").is_some());
        assert_eq!(json["comparisons"].as_array().map(|c| c.len()), Some(1));
    }
}
