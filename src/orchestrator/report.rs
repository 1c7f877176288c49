//! Run output handed to reporting collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::PresentationState;
use crate::cache::CacheStatus;
use crate::extraction::ExtractionSummary;
use crate::presentation::PresentationRef;
use crate::ranking::Ranking;
use crate::scoring::{FailureKind, ScoreResult};

/// Everything known about one input presentation after a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub rank: usize,
    pub presentation: PresentationRef,
    pub state: PresentationState,
    pub total: Option<f64>,
    pub percent_of_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Absent when extraction never produced content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractionSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_cache: Option<CacheStatus>,
    pub score: ScoreResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_cache: Option<CacheStatus>,
}

impl ReportEntry {
    pub fn id(&self) -> &str {
        &self.presentation.id
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.score.failure.as_ref().map(|f| f.kind)
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total: usize,
    pub scored: usize,
    pub failed: usize,
    /// Never dispatched because the run was cancelled.
    pub cancelled: usize,
    /// Model calls issued during this run, retries included.
    pub model_calls: u64,
    pub extraction_hits: usize,
    pub extraction_misses: usize,
    pub score_hits: usize,
    pub score_misses: usize,
    /// Most presentations extracting or scoring at the same time.
    pub peak_active: usize,
}

/// Final ranking plus every presentation's full result, in rank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rubric_version: String,
    pub ranking: Ranking,
    pub entries: Vec<ReportEntry>,
    pub stats: RunStats,
}

impl RunReport {
    pub fn entry(&self, presentation_id: &str) -> Option<&ReportEntry> {
        self.entries.iter().find(|e| e.id() == presentation_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
