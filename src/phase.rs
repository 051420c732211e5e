//! Iteration pipeline
//!
//! An iteration runs the configured phases in order over an owned
//! [`RunState`], logging one event per phase transition, then checks the
//! stop criteria. Generation and critique of ideas happen outside the
//! library: the caller collects critic results for the batch and hands them
//! in as [`CritiqueOutcome`]s once every external task has finished, failed
//! or timed out.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::RunConfig;
use crate::error::EvoResult;
use crate::idea::{IdeaId, RunState};
use crate::record::{EventLog, EventType};
use crate::scoring::{CritiquePatch, ScoreOutcome, ScoringEngine};
use crate::selection::{detect_stagnation, select, stop_condition, StopReason};

/// A step of the per-iteration pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    /// Apply critic results and compute overall scores
    Score,
    /// Archive, keep the elite and the diversity pick, update best and stagnation
    Select,
}

impl PhaseKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Score => "score",
            Self::Select => "select",
        }
    }

    /// Run this phase
    pub fn run(&self, state: RunState, ctx: &mut PhaseContext<'_>) -> EvoResult<RunState> {
        match self {
            Self::Score => score_phase(state, ctx),
            Self::Select => select_phase(state, ctx),
        }
    }
}

/// How an external critique task ended
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum ExternalStatus {
    Completed(CritiquePatch),
    Failed(String),
    TimedOut,
}

/// Critic result for one idea
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CritiqueOutcome {
    pub idea_id: IdeaId,
    pub status: ExternalStatus,
}

impl CritiqueOutcome {
    pub fn completed(idea_id: IdeaId, patch: CritiquePatch) -> Self {
        Self {
            idea_id,
            status: ExternalStatus::Completed(patch),
        }
    }

    pub fn failed(idea_id: IdeaId, reason: impl Into<String>) -> Self {
        Self {
            idea_id,
            status: ExternalStatus::Failed(reason.into()),
        }
    }

    pub fn timed_out(idea_id: IdeaId) -> Self {
        Self {
            idea_id,
            status: ExternalStatus::TimedOut,
        }
    }
}

/// Inputs shared by the phases of one iteration
pub struct PhaseContext<'a> {
    pub config: &'a RunConfig,
    /// Critic results for this iteration's batch
    pub critiques: &'a [CritiqueOutcome],
    pub events: &'a mut EventLog,
}

impl<'a> PhaseContext<'a> {
    pub fn new(
        config: &'a RunConfig,
        critiques: &'a [CritiqueOutcome],
        events: &'a mut EventLog,
    ) -> Self {
        Self {
            config,
            critiques,
            events,
        }
    }
}

fn exclude(state: &mut RunState, ctx: &mut PhaseContext<'_>, id: IdeaId, reason: &str) {
    if let Some(idea) = state.get_mut(id) {
        idea.mark_unscored();
    }
    tracing::warn!(idea_id = %id, reason, "Idea left unscored");
    ctx.events.push(
        state.iteration,
        EventType::IdeaExcluded,
        json!({ "idea_id": id, "reason": reason }),
    );
}

/// Apply the critic results of the batch
///
/// Failures of one idea never stop the rest of the batch: invalid score
/// maps, failed and timed-out tasks leave only that idea unscored.
fn score_phase(mut state: RunState, ctx: &mut PhaseContext<'_>) -> EvoResult<RunState> {
    let engine = ScoringEngine::new(ctx.config.weights.clone());
    let mut scored = 0usize;
    let mut eliminated = 0usize;
    let mut excluded = 0usize;

    let critiques = ctx.critiques;
    for critique in critiques {
        let id = critique.idea_id;
        match state.get(id) {
            Some(idea) if idea.is_active() => {}
            Some(_) => {
                tracing::debug!(idea_id = %id, "Critique for inactive idea ignored");
                continue;
            }
            None => {
                tracing::warn!(idea_id = %id, "Critique for unknown idea ignored");
                continue;
            }
        }

        match &critique.status {
            ExternalStatus::Completed(patch) => {
                let applied = match state.get_mut(id) {
                    Some(idea) => engine.apply_patch(idea, patch),
                    None => continue,
                };
                match applied {
                    Ok(ScoreOutcome::Scored(_)) => scored += 1,
                    Ok(ScoreOutcome::Eliminated) => eliminated += 1,
                    Err(err) => {
                        excluded += 1;
                        exclude(&mut state, ctx, id, &err.to_string());
                    }
                }
            }
            ExternalStatus::Failed(reason) => {
                excluded += 1;
                exclude(&mut state, ctx, id, &format!("critique failed: {reason}"));
            }
            ExternalStatus::TimedOut => {
                excluded += 1;
                exclude(&mut state, ctx, id, "critique timed out");
            }
        }
    }

    tracing::info!(scored, eliminated, excluded, "Scored ideas");
    ctx.events.push(
        state.iteration,
        EventType::PhaseCompleted,
        json!({
            "phase": PhaseKind::Score.name(),
            "scored": scored,
            "eliminated": eliminated,
            "excluded": excluded,
        }),
    );
    Ok(state)
}

/// Run selection, then refresh the best idea and the stagnation counter
fn select_phase(mut state: RunState, ctx: &mut PhaseContext<'_>) -> EvoResult<RunState> {
    let config = ctx.config;
    let previous_best = state.best_score;

    let seed = config.diversity_seed.wrapping_add(u64::from(state.iteration));
    let outcome = select(&mut state, config.elite_count, seed);

    state.refresh_best();
    let check = detect_stagnation(
        previous_best.unwrap_or(f64::NEG_INFINITY),
        state.best_score.unwrap_or(f64::NEG_INFINITY),
        state.stagnation_counter,
        config.stagnation_patience,
    );
    state.stagnation_counter = check.counter;

    tracing::info!(
        retained = outcome.retained().len(),
        archived = outcome.all_archived().len(),
        best_score = ?state.best_score,
        stagnation = state.stagnation_counter,
        "Selection complete"
    );
    ctx.events.push(
        state.iteration,
        EventType::PhaseCompleted,
        json!({
            "phase": PhaseKind::Select.name(),
            "retained": outcome.retained(),
            "archived": outcome.all_archived().len(),
            "diversity": outcome.diversity,
            "best_score": state.best_score,
        }),
    );
    Ok(state)
}

/// Run one iteration and check whether the run should stop
///
/// Returns the new state and the stop reason, if any criterion fired. A
/// `Stopped` event is logged when one did.
pub fn run_iteration(
    mut state: RunState,
    ctx: &mut PhaseContext<'_>,
) -> EvoResult<(RunState, Option<StopReason>)> {
    ctx.config.validate()?;

    state.iteration += 1;
    ctx.events.push(
        state.iteration,
        EventType::IterationStarted,
        json!({ "active": state.active_ideas().count() }),
    );

    let config = ctx.config;
    for phase in &config.phases {
        ctx.events.push(
            state.iteration,
            EventType::PhaseStarted,
            json!({ "phase": phase.name() }),
        );
        state = phase.run(state, ctx)?;
    }

    let stop = stop_condition(&state, config);
    if let Some(reason) = stop {
        tracing::info!(
            iteration = state.iteration,
            reason = %reason,
            best_score = ?state.best_score,
            "Run stopped"
        );
        ctx.events.push(
            state.iteration,
            EventType::Stopped,
            json!({ "reason": reason, "best_score": state.best_score }),
        );
    }
    Ok((state, stop))
}

/// Iterate until a stop criterion fires
///
/// `critic` is called once per iteration with the current state and the
/// number of the iteration about to run; it returns the critic results for
/// that iteration's batch.
pub fn run_until_stopped<F>(
    mut state: RunState,
    config: &RunConfig,
    events: &mut EventLog,
    mut critic: F,
) -> EvoResult<(RunState, StopReason)>
where
    F: FnMut(&RunState, u32) -> EvoResult<Vec<CritiqueOutcome>>,
{
    loop {
        let critiques = critic(&state, state.iteration + 1)?;
        let mut ctx = PhaseContext::new(config, &critiques, events);
        let (next, stop) = run_iteration(state, &mut ctx)?;
        state = next;
        if let Some(reason) = stop {
            return Ok((state, reason));
        }
    }
}
