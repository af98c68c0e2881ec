//src/error.rs
use std::fmt;
use thiserror::Error;

use crate::archive::ArchiveStep;
use crate::grid::StoreError;

/// The adapter call an engine operation was making when the store failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Read,
    Write,
    /// The session write of `create_exercise_with_session`. The record row
    /// already exists when this step fails.
    InitialSession,
    Archive(ArchiveStep),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Read => write!(f, "read"),
            Step::Write => write!(f, "write"),
            Step::InitialSession => write!(f, "initial session write"),
            Step::Archive(step) => write!(f, "archive {step}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Exercise not found: {0}")]
    NotFound(String),
    #[error("Exercise name must be unique (case-insensitive): '{0}' already exists.")]
    DuplicateExercise(String),
    #[error("Not enough free rows under '{exercise}': {needed} set(s) but only {available} free row(s).")]
    CapacityExceeded {
        exercise: String,
        needed: usize,
        available: usize,
    },
    #[error("Malformed session: {0}")]
    MalformedPayload(String),
    #[error("Invalid exercise name: '{0}'")]
    InvalidName(String),
    #[error("Limit must be at least 1.")]
    InvalidLimit,
    #[error("Grid store unavailable during {step}: {source}")]
    StoreUnavailable {
        step: Step,
        #[source]
        source: StoreError,
    },
}

impl LedgerError {
    /// Wraps an adapter failure with the step it happened in.
    pub(crate) fn at(step: Step) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::StoreUnavailable { step, source }
    }

    /// True when the failure left the grid changed but incomplete, so an
    /// operator has to reconcile it by hand.
    pub fn left_partial_state(&self) -> bool {
        match self {
            Self::StoreUnavailable { step, .. } => match step {
                Step::InitialSession => true,
                Step::Archive(archive_step) => archive_step.partial_state().is_some(),
                Step::Read | Step::Write => false,
            },
            _ => false,
        }
    }
}
