//! Run records
//!
//! The append-only event log written while a run progresses, and the final
//! result composed once it stops. Both are plain data; where they are
//! stored is up to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EvoIdeaError, EvoResult};
use crate::idea::{Criterion, Facets, Idea, IdeaId, RunId, RunState, Scores};
use crate::selection::StopReason;

/// Maximum number of runners-up in a final result
pub const MAX_RUNNERS_UP: usize = 4;

/// Kind of a logged event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    IterationStarted,
    PhaseStarted,
    PhaseCompleted,
    /// An idea was left unscored for this iteration
    IdeaExcluded,
    Stopped,
}

/// One entry of the event log
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    pub timestamp: DateTime<Utc>,
    pub iteration: u32,
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

/// Append-only list of run events
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<RunEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event stamped with the current time
    pub fn push(&mut self, iteration: u32, event_type: EventType, payload: serde_json::Value) {
        self.events.push(RunEvent {
            timestamp: Utc::now(),
            iteration,
            event_type,
            payload,
        });
    }

    /// All events, oldest first
    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events of one type, oldest first
    pub fn of_type(&self, event_type: EventType) -> impl Iterator<Item = &RunEvent> {
        self.events.iter().filter(move |e| e.event_type == event_type)
    }

    /// Most recent event
    pub fn last(&self) -> Option<&RunEvent> {
        self.events.last()
    }
}

/// Winning idea with the reasons it won
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinalBest {
    pub idea_id: IdeaId,
    pub title: String,
    pub summary: String,
    pub facets: Facets,
    pub scores: Scores,
    pub overall_score: f64,
    pub why_won: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunnerUp {
    pub idea_id: IdeaId,
    pub title: String,
    pub overall_score: f64,
}

/// Outcome of a finished run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    pub run_id: RunId,
    pub best: FinalBest,
    pub runners_up: Vec<RunnerUp>,
    pub stop_reason: Option<StopReason>,
}

fn why_won(scores: &Scores, overall: f64) -> Vec<String> {
    let mut strongest: Vec<(Criterion, f64)> =
        Criterion::ALL.iter().map(|c| (*c, scores.get(*c))).collect();
    strongest.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut lines = vec![format!("Highest overall score: {overall:.2}")];
    lines.extend(
        strongest
            .iter()
            .take(2)
            .map(|(criterion, score)| format!("Strong {criterion}: {score:.1}")),
    );
    lines
}

/// Compose the final result from the active scored ideas
///
/// The best idea leads and up to [`MAX_RUNNERS_UP`] follow in ranking order.
pub fn compose_final(state: &RunState, stop_reason: Option<StopReason>) -> EvoResult<FinalResult> {
    let ranked = state.ranked_ideas();
    let (best, scores, overall) = ranked
        .first()
        .and_then(|idea| Some((*idea, idea.scores.as_ref()?, idea.overall_score?)))
        .ok_or(EvoIdeaError::EmptyPopulation)?;

    let runners_up = ranked
        .iter()
        .skip(1)
        .take(MAX_RUNNERS_UP)
        .map(|idea: &&Idea| RunnerUp {
            idea_id: idea.id,
            title: idea.title.clone(),
            overall_score: idea.overall_score.unwrap_or(0.0),
        })
        .collect();

    tracing::info!(
        best_id = %best.id,
        best_title = %best.title,
        best_score = overall,
        "Final result composed"
    );

    Ok(FinalResult {
        run_id: state.run_id,
        best: FinalBest {
            idea_id: best.id,
            title: best.title.clone(),
            summary: best.summary.clone(),
            facets: best.facets.clone(),
            scores: scores.clone(),
            overall_score: overall,
            why_won: why_won(scores, overall),
        },
        runners_up,
        stop_reason,
    })
}
