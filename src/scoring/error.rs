use std::time::Duration;

use thiserror::Error;

use super::types::{FailureKind, FailureReason};

/// Failures of one call to the scoring model.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("model call timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },

    #[error("rate limited by model endpoint")]
    RateLimited { retry_after: Option<Duration> },

    #[error("model endpoint unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("transport error: {reason}")]
    Transport { reason: String },

    #[error("request rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("model returned an empty response")]
    EmptyResponse,
}

impl ModelError {
    /// Rejected requests will be rejected again; everything else may be transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ModelError::Rejected { .. })
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ModelError::Timeout { .. } => FailureKind::Timeout,
            ModelError::RateLimited { .. } => FailureKind::RateLimited,
            ModelError::EmptyResponse => FailureKind::UnparseableResponse,
            ModelError::Unavailable { .. }
            | ModelError::Transport { .. }
            | ModelError::Rejected { .. } => FailureKind::ModelUnavailable,
        }
    }
}

/// The model answered, but not with usable scores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no JSON object found in response")]
    NoJson,

    #[error("response JSON has unexpected shape: {reason}")]
    UnexpectedShape { reason: String },

    #[error("no result for submission '{id}'")]
    MissingSubmission { id: String },

    #[error("missing score for criterion '{criterion}'")]
    MissingCriterion { criterion: String },

    #[error("score for criterion '{criterion}' is not a number: {value}")]
    NotANumber { criterion: String, value: String },
}

/// Why one attempt for one request did not settle it.
#[derive(Debug, Clone, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl AttemptError {
    pub fn is_retryable(&self) -> bool {
        match self {
            AttemptError::Model(e) => e.is_retryable(),
            AttemptError::Parse(_) => true,
        }
    }

    pub fn to_failure(&self) -> FailureReason {
        let kind = match self {
            AttemptError::Model(e) => e.failure_kind(),
            AttemptError::Parse(_) => FailureKind::UnparseableResponse,
        };
        FailureReason::with_detail(kind, self.to_string())
    }
}
