//! Error types for evoidea
//!
//! This module defines all error types used throughout the library.
//! Constraint violations, stop reasons and unscored ideas are outcomes,
//! not errors, and never appear here.

use thiserror::Error;

use crate::idea::IdeaId;

/// Error type for configuration problems
///
/// Always fatal, and surfaced before a run starts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A required criterion weight is absent
    #[error("Missing weight for criterion: {0}")]
    MissingWeight(String),

    /// A weight was given for a name that is not a criterion
    #[error("Unknown weight key: {0}")]
    UnknownWeight(String),

    /// Weights must be finite and strictly positive
    #[error("Weight for {criterion} must be finite and > 0, got {value}")]
    NonPositiveWeight { criterion: String, value: f64 },

    /// Score threshold outside [0, 10]
    #[error("Score threshold must lie in [0, 10], got {0}")]
    InvalidThreshold(f64),

    /// Any other out-of-range numeric parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Configuration text could not be parsed
    #[error("Malformed configuration: {0}")]
    Malformed(String),
}

/// Error type for invalid data about ideas, scores and comparisons
///
/// Raised mid-batch it only excludes the offending idea; raised while
/// loading persisted state it is fatal for the whole run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Criterion score outside [0, 10] (never clamped)
    #[error("Score for {criterion} must lie in [0, 10], got {value}")]
    ScoreOutOfRange { criterion: String, value: f64 },

    /// A score map carried a key that is not a criterion
    #[error("Unknown criterion: {0}")]
    UnknownCriterion(String),

    /// A score map lacked one of the criteria
    #[error("Missing criterion: {0}")]
    MissingCriterion(String),

    /// Two ideas in one run share an id
    #[error("Duplicate idea id: {0}")]
    DuplicateIdeaId(IdeaId),

    /// A parent reference points at no idea in the run
    #[error("Idea {idea} references unknown parent {parent}")]
    UnknownParent { idea: IdeaId, parent: IdeaId },

    /// Origin, parents or generation numbers are inconsistent
    #[error("Lineage violation for idea {idea}: {reason}")]
    Lineage { idea: IdeaId, reason: String },

    /// Score fields are inconsistent with each other or with the status
    #[error("Score invariant violated for idea {idea}: {reason}")]
    ScoreInvariant { idea: IdeaId, reason: String },

    /// An id that is not in the population
    #[error("Unknown idea: {0}")]
    UnknownIdea(IdeaId),

    /// The declared winner took no part in the comparison
    #[error("Winner {winner} is neither {idea_a} nor {idea_b}")]
    WinnerNotParticipant {
        idea_a: IdeaId,
        idea_b: IdeaId,
        winner: IdeaId,
    },

    /// An idea cannot be compared against itself
    #[error("Idea {0} cannot be compared with itself")]
    SelfComparison(IdeaId),

    /// No feature vector is known for an idea in a comparison
    #[error("No feature vector for idea {0}")]
    MissingFeatures(IdeaId),
}

/// Error type for persistence operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Stored record version is newer than this library understands
    #[error("Record version {0} is newer than supported")]
    VersionTooNew(u32),

    /// Nothing stored under this key
    #[error("Run not found: {0}")]
    NotFound(String),

    /// Stored state failed validation
    #[error("Corrupted run state: {0}")]
    Corrupted(#[from] ValidationError),
}

/// Top-level error type
#[derive(Debug, Error)]
pub enum EvoIdeaError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// No scored active idea is available
    #[error("Empty population")]
    EmptyPopulation,

    /// Not enough eligible ideas for an operation
    #[error("Need at least {required} scored active ideas, found {found}")]
    InsufficientIdeas { found: usize, required: usize },

    /// The external decision provider failed
    #[error("Decision provider failed: {0}")]
    DecisionProvider(String),
}

/// Result type alias for evoidea operations
pub type EvoResult<T> = Result<T, EvoIdeaError>;
