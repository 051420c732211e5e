//! Elitist selection with a diversity slot
//!
//! Each round the scored active population is ranked, the lower half is
//! archived, the top `elite_count` survivors stay active, and one more
//! survivor drawn from the middle of the ranking stays active as well so the
//! population does not collapse onto a single line of ideas.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::idea::{Idea, IdeaId, IdeaStatus, RunState};

/// Result of one selection round
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionOutcome {
    /// Pre-selection ranking, best first
    pub ranking: Vec<IdeaId>,
    /// Survivors kept for their rank
    pub elite: Vec<IdeaId>,
    /// Survivor kept by the diversity draw
    pub diversity: Option<IdeaId>,
    /// Lower half of the ranking
    pub archived: Vec<IdeaId>,
    /// Upper-half survivors that were neither elite nor drawn
    pub trimmed: Vec<IdeaId>,
}

impl SelectionOutcome {
    /// Ideas that remain active after the round
    pub fn retained(&self) -> Vec<IdeaId> {
        self.elite.iter().copied().chain(self.diversity).collect()
    }

    /// Every idea archived by the round
    pub fn all_archived(&self) -> Vec<IdeaId> {
        self.archived
            .iter()
            .chain(self.trimmed.iter())
            .copied()
            .collect()
    }
}

/// Rank band eligible for the diversity draw: `[ceil(0.3n), ceil(0.7n))`
pub fn diversity_band(n: usize) -> std::ops::Range<usize> {
    let lo = (3 * n).div_ceil(10);
    let hi = (7 * n).div_ceil(10);
    lo..hi
}

/// Decide a selection round over already-ranked ideas
///
/// `ranked` must be in ranking order. The smaller half (`floor(n/2)`) at the
/// bottom is archived. The diversity pick is drawn uniformly from survivors
/// outside the elite whose rank falls in [`diversity_band`].
pub fn plan_selection<R: Rng>(
    ranked: &[&Idea],
    elite_count: usize,
    rng: &mut R,
) -> SelectionOutcome {
    let n = ranked.len();
    let ranking: Vec<IdeaId> = ranked.iter().map(|i| i.id).collect();

    let survivors = n - n / 2;
    let elite_len = elite_count.min(survivors);

    let band = diversity_band(n);
    let draw_from = band.start.max(elite_len)..band.end.min(survivors);
    let diversity_rank = if draw_from.is_empty() {
        None
    } else {
        Some(rng.gen_range(draw_from))
    };

    let trimmed = (elite_len..survivors)
        .filter(|r| Some(*r) != diversity_rank)
        .map(|r| ranking[r])
        .collect();

    SelectionOutcome {
        elite: ranking[..elite_len].to_vec(),
        diversity: diversity_rank.map(|r| ranking[r]),
        archived: ranking[survivors..].to_vec(),
        trimmed,
        ranking,
    }
}

/// Run a selection round over the state's scored active ideas
///
/// Unscored active ideas take no part and keep their status. The diversity
/// draw uses a [`StdRng`] seeded with `seed`, so equal inputs always select
/// the same ideas.
pub fn select(state: &mut RunState, elite_count: usize, seed: u64) -> SelectionOutcome {
    let mut rng = StdRng::seed_from_u64(seed);
    let outcome = plan_selection(&state.ranked_ideas(), elite_count, &mut rng);

    for id in outcome.all_archived() {
        if let Some(idea) = state.get_mut(id) {
            idea.status = IdeaStatus::Archived;
        }
    }

    if let Some(id) = outcome.diversity {
        tracing::debug!(idea_id = %id, "Diversity slot filled");
    }
    tracing::info!(
        ranked = outcome.ranking.len(),
        retained = outcome.elite.len() + usize::from(outcome.diversity.is_some()),
        archived = outcome.archived.len() + outcome.trimmed.len(),
        "Selection round complete"
    );

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idea::{Facets, Origin, RunId, Scores};

    fn state_with_scores(scores: &[f64]) -> RunState {
        let mut state = RunState::new(RunId::new());
        for (i, score) in scores.iter().enumerate() {
            let mut idea = Idea::new("t", "", Facets::default(), 1, Origin::Generated)
                .with_id(IdeaId::from_u128(i as u128 + 1));
            idea.scores = Some(Scores::uniform(*score));
            idea.overall_score = Some(*score);
            state.insert_idea(idea).unwrap();
        }
        state
    }

    fn id(n: u128) -> IdeaId {
        IdeaId::from_u128(n)
    }

    #[test]
    fn test_diversity_band() {
        assert_eq!(diversity_band(10), 3..7);
        assert_eq!(diversity_band(12), 4..9);
        assert_eq!(diversity_band(0), 0..0);
    }

    #[test]
    fn test_archives_bottom_half() {
        let scores = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 0.5, 0.25];
        let mut state = state_with_scores(&scores);
        let outcome = select(&mut state, 4, 7);

        assert_eq!(outcome.archived.len(), 6);
        assert_eq!(outcome.archived, outcome.ranking[6..].to_vec());
        assert_eq!(outcome.elite, vec![id(10), id(9), id(8), id(7)]);
        for archived in &outcome.archived {
            assert_eq!(state.get(*archived).unwrap().status, IdeaStatus::Archived);
        }
    }

    #[test]
    fn test_odd_population_archives_smaller_half() {
        let mut state = state_with_scores(&[5.0, 4.0, 3.0, 2.0, 1.0]);
        let outcome = select(&mut state, 10, 0);

        assert_eq!(outcome.archived, vec![id(4), id(5)]);
        assert_eq!(outcome.elite, vec![id(1), id(2), id(3)]);
        assert_eq!(outcome.diversity, None);
        assert_eq!(state.active_ideas().count(), 3);
    }

    #[test]
    fn test_diversity_pick_comes_from_middle_band() {
        let scores: Vec<f64> = (0..12).map(|i| 9.0 - i as f64 * 0.5).collect();
        for seed in 0..20 {
            let mut state = state_with_scores(&scores);
            let outcome = select(&mut state, 4, seed);
            let pick = outcome.diversity.unwrap();
            let rank = outcome.ranking.iter().position(|i| *i == pick).unwrap();
            assert!((4..6).contains(&rank), "rank {rank} outside band");
            assert!(state.get(pick).unwrap().is_active());
            assert_eq!(state.active_ideas().count(), 5);
        }
    }

    #[test]
    fn test_same_seed_same_selection() {
        let scores: Vec<f64> = (0..20).map(|i| (i % 7) as f64).collect();
        let mut a = state_with_scores(&scores);
        let mut b = state_with_scores(&scores);
        assert_eq!(select(&mut a, 3, 42), select(&mut b, 3, 42));
    }

    #[test]
    fn test_ties_broken_by_ascending_id() {
        let mut state = state_with_scores(&[7.0, 7.0, 7.0, 7.0]);
        let outcome = select(&mut state, 1, 0);
        assert_eq!(outcome.ranking, vec![id(1), id(2), id(3), id(4)]);
        assert_eq!(outcome.elite, vec![id(1)]);
        assert_eq!(outcome.archived, vec![id(3), id(4)]);
    }

    #[test]
    fn test_unscored_ideas_sit_out() {
        let mut state = state_with_scores(&[6.0, 5.0]);
        state
            .insert_idea(
                Idea::new("u", "", Facets::default(), 1, Origin::Generated)
                    .with_id(IdeaId::from_u128(99)),
            )
            .unwrap();

        let outcome = select(&mut state, 1, 0);
        assert_eq!(outcome.ranking.len(), 2);
        assert!(state.get(id(99)).unwrap().is_active());
    }

    #[test]
    fn test_empty_population() {
        let mut state = RunState::new(RunId::new());
        let outcome = select(&mut state, 4, 0);
        assert!(outcome.ranking.is_empty());
        assert!(outcome.retained().is_empty());
    }
}
