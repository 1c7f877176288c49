use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hashing::Fingerprint;
use crate::scoring::{FailureReason, ScoreStatus};

/// Secondary ordering key for equal totals (and for unscored entries).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// Lexicographic presentation id.
    #[default]
    PresentationId,
    /// Hex content fingerprint; stable across id renames.
    Fingerprint,
}

impl TieBreak {
    pub fn as_str(&self) -> &'static str {
        match self {
            TieBreak::PresentationId => "presentation-id",
            TieBreak::Fingerprint => "fingerprint",
        }
    }

    /// Key for one entry. Entries without a fingerprint fall back to their id.
    pub fn key(&self, presentation_id: &str, fingerprint: Option<&Fingerprint>) -> String {
        match (self, fingerprint) {
            (TieBreak::Fingerprint, Some(fp)) => fp.to_hex(),
            _ => presentation_id.to_string(),
        }
    }
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a [`Ranking`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    /// 1-based position.
    pub rank: usize,
    pub presentation_id: String,
    /// Weighted sum of sub-scores; `None` means unscored.
    pub total: Option<f64>,
    /// `total` as a percentage of the rubric's maximum attainable total.
    pub percent_of_max: Option<f64>,
    /// Rubric category band `percent_of_max` falls in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub status: ScoreStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
    pub tie_break_key: String,
}

impl RankedEntry {
    pub fn is_scored(&self) -> bool {
        self.total.is_some()
    }
}

/// Ordered ranking for one rubric version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub rubric_version: String,
    pub tie_break: TieBreak,
    pub entries: Vec<RankedEntry>,
}

impl Ranking {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn scored(&self) -> usize {
        self.entries.iter().filter(|e| e.is_scored()).count()
    }

    pub fn position(&self, presentation_id: &str) -> Option<&RankedEntry> {
        self.entries
            .iter()
            .find(|e| e.presentation_id == presentation_id)
    }

    /// Presentation ids in rank order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.presentation_id.as_str())
    }
}
