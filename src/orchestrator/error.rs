use thiserror::Error;

use super::report::RunReport;
use super::state::PresentationState;
use crate::cache::CacheError;

/// A presentation was moved along an edge its state machine does not have.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition for '{id}': {from} -> {to}")]
pub struct TransitionError {
    pub id: String,
    pub from: PresentationState,
    pub to: PresentationState,
}

/// Fatal run outcomes. Per-presentation failures are data in the report, never these.
#[derive(Debug, Error)]
pub enum RunError {
    /// Zero presentations reached `scored`. The report is still complete.
    #[error("run aborted: none of {total} presentations could be scored")]
    Aborted {
        total: usize,
        report: Box<RunReport>,
    },

    #[error("no presentations to score")]
    NoPresentations,

    #[error("presentation id '{id}' appears more than once")]
    DuplicateId { id: String },

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("cache setup failed: {0}")]
    Cache(#[from] CacheError),
}

pub type RunResult<T> = Result<T, RunError>;
