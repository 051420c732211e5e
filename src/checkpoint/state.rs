//! Persisted run record
//!
//! Everything needed to resume or audit a run: its configuration, the full
//! idea arena, the event log, the tournament if one was held, and the final
//! result once the run has stopped.

use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::error::StorageError;
use crate::idea::{RunId, RunState};
use crate::record::{EventLog, FinalResult};
use crate::tournament::TournamentState;

/// Current run record format version
pub const RUN_RECORD_VERSION: u32 = 1;

/// Complete state of a run as stored
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedRun {
    /// Schema version for forward compatibility
    pub version: u32,
    pub config: RunConfig,
    pub state: RunState,
    #[serde(default)]
    pub events: EventLog,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tournament: Option<TournamentState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_result: Option<FinalResult>,
}

impl PersistedRun {
    /// Record for a run with no events yet
    pub fn new(config: RunConfig, state: RunState) -> Self {
        Self {
            version: RUN_RECORD_VERSION,
            config,
            state,
            events: EventLog::new(),
            tournament: None,
            final_result: None,
        }
    }

    /// Set the event log
    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    /// Set the tournament
    pub fn with_tournament(mut self, tournament: TournamentState) -> Self {
        self.tournament = Some(tournament);
        self
    }

    /// Set the final result
    pub fn with_final_result(mut self, final_result: FinalResult) -> Self {
        self.final_result = Some(final_result);
        self
    }

    pub fn run_id(&self) -> RunId {
        self.state.run_id
    }

    /// Check if this record can be read by this version of the library
    pub fn is_compatible(&self) -> bool {
        self.version <= RUN_RECORD_VERSION
    }

    /// Check the record before it is handed back to a caller
    ///
    /// Any population invariant violation makes the whole record unusable.
    pub fn validate(&self) -> Result<(), StorageError> {
        if !self.is_compatible() {
            return Err(StorageError::VersionTooNew(self.version));
        }
        self.state.validate()?;
        Ok(())
    }
}
