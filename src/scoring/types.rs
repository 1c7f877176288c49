use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome class of one scoring request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreStatus {
    /// Every criterion parsed and was in range.
    Ok,
    /// Usable, but at least one sub-score was clamped into range.
    Partial,
    /// No usable scores; see [`ScoreResult::failure`].
    Failed,
}

/// Why a presentation has no usable score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    ExtractionError,
    Timeout,
    UnparseableResponse,
    RateLimited,
    ModelUnavailable,
    Cancelled,
    /// The presentation's worker panicked or broke its lifecycle.
    WorkerFailed,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ExtractionError => "extraction-error",
            FailureKind::Timeout => "timeout",
            FailureKind::UnparseableResponse => "unparseable-response",
            FailureKind::RateLimited => "rate-limited",
            FailureKind::ModelUnavailable => "model-unavailable",
            FailureKind::Cancelled => "cancelled",
            FailureKind::WorkerFailed => "worker-failed",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure carried as data in results and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    pub kind: FailureKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl FailureReason {
    pub fn new(kind: FailureKind) -> Self {
        Self { kind, detail: None }
    }

    pub fn with_detail(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: Some(detail.into()),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.kind, detail),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Score of one presentation under one rubric version. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub rubric_version: String,
    /// Criterion name to sub-score, already clamped into the rubric's range.
    pub scores: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    pub status: ScoreStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
    /// Criteria whose raw value was out of range.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clamped: Vec<String>,
    /// Model attempts spent on this result (zero when never sent).
    pub attempts: u32,
}

impl ScoreResult {
    /// Successful result; `Partial` when `clamped` is non-empty.
    pub fn scored(
        rubric_version: impl Into<String>,
        scores: BTreeMap<String, f64>,
        rationale: Option<String>,
        clamped: Vec<String>,
        attempts: u32,
    ) -> Self {
        let status = if clamped.is_empty() {
            ScoreStatus::Ok
        } else {
            ScoreStatus::Partial
        };
        Self {
            rubric_version: rubric_version.into(),
            scores,
            rationale,
            status,
            failure: None,
            clamped,
            attempts,
        }
    }

    pub fn failed(rubric_version: impl Into<String>, reason: FailureReason, attempts: u32) -> Self {
        Self {
            rubric_version: rubric_version.into(),
            scores: BTreeMap::new(),
            rationale: None,
            status: ScoreStatus::Failed,
            failure: Some(reason),
            clamped: Vec::new(),
            attempts,
        }
    }

    /// `true` for `ok` and `partial` results.
    pub fn is_scored(&self) -> bool {
        self.status != ScoreStatus::Failed
    }
}
