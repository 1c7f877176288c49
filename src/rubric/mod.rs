//! Weighted, versioned scoring rubric.
//!
//! The version string is part of every score cache key. Rubric files that omit it get a
//! version derived from the criteria, so editing a criterion still invalidates scores.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::RubricError;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CATEGORY_BANDS, DEFAULT_SCORE_MAX, DEFAULT_SCORE_MIN};

/// Inclusive bounds for every sub-score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_SCORE_MIN,
            max: DEFAULT_SCORE_MAX,
        }
    }
}

impl ScoreRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Clamps `value` into range; the flag is `true` if it had to move.
    pub fn clamp(&self, value: f64) -> (f64, bool) {
        let clamped = value.clamp(self.min, self.max);
        (clamped, clamped != value)
    }
}

/// One scored dimension of a presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricCriterion {
    pub name: String,
    /// Non-negative; weights need not sum to one.
    pub weight: f64,
    /// Prompt fragment telling the model what to look for.
    #[serde(default)]
    pub instructions: String,
}

impl RubricCriterion {
    pub fn new(name: impl Into<String>, weight: f64, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight,
            instructions: instructions.into(),
        }
    }
}

/// A named band of totals, as a percentage of the maximum attainable total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCategory {
    pub label: String,
    /// Inclusive lower bound in `0.0..=100.0`.
    pub min_percent: f64,
}

impl ScoreCategory {
    pub fn new(label: impl Into<String>, min_percent: f64) -> Self {
        Self {
            label: label.into(),
            min_percent,
        }
    }

    pub fn defaults() -> Vec<Self> {
        DEFAULT_CATEGORY_BANDS
            .iter()
            .map(|(label, min)| Self::new(*label, *min))
            .collect()
    }
}

/// Criteria, weights and a version identifier.
///
/// `categories` only labels totals; it is not part of the version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rubric {
    #[serde(default)]
    pub version: String,
    pub criteria: Vec<RubricCriterion>,
    #[serde(default)]
    pub score_range: ScoreRange,
    #[serde(default = "ScoreCategory::defaults")]
    pub categories: Vec<ScoreCategory>,
}

impl Rubric {
    /// Builds and validates a rubric with the default 0..=10 range.
    pub fn new(
        version: impl Into<String>,
        criteria: Vec<RubricCriterion>,
    ) -> Result<Self, RubricError> {
        let mut rubric = Self {
            version: version.into(),
            criteria,
            score_range: ScoreRange::default(),
            categories: ScoreCategory::defaults(),
        };
        rubric.normalize()?;
        Ok(rubric)
    }

    pub fn with_score_range(mut self, range: ScoreRange) -> Result<Self, RubricError> {
        self.score_range = range;
        self.validate()?;
        Ok(self)
    }

    pub fn with_categories(mut self, categories: Vec<ScoreCategory>) -> Result<Self, RubricError> {
        self.categories = categories;
        self.validate()?;
        Ok(self)
    }

    pub fn from_json_str(json: &str) -> Result<Self, RubricError> {
        let mut rubric: Rubric = serde_json::from_str(json)?;
        rubric.normalize()?;
        Ok(rubric)
    }

    pub fn load(path: &Path) -> Result<Self, RubricError> {
        let json = std::fs::read_to_string(path).map_err(|source| RubricError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    fn normalize(&mut self) -> Result<(), RubricError> {
        for criterion in &mut self.criteria {
            criterion.name = criterion.name.trim().to_string();
        }
        self.validate()?;
        if self.version.trim().is_empty() {
            self.version = self.derived_version();
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), RubricError> {
        if self.criteria.is_empty() {
            return Err(RubricError::NoCriteria);
        }

        let range = self.score_range;
        if !(range.min.is_finite() && range.max.is_finite() && range.min < range.max) {
            return Err(RubricError::InvalidRange {
                min: range.min,
                max: range.max,
            });
        }

        let mut seen = HashSet::new();
        for criterion in &self.criteria {
            if criterion.name.is_empty() {
                return Err(RubricError::EmptyCriterionName);
            }
            if !criterion.weight.is_finite() || criterion.weight < 0.0 {
                return Err(RubricError::InvalidWeight {
                    name: criterion.name.clone(),
                    weight: criterion.weight,
                });
            }
            if !seen.insert(criterion.name.as_str()) {
                return Err(RubricError::DuplicateCriterion {
                    name: criterion.name.clone(),
                });
            }
        }

        for category in &self.categories {
            if category.label.trim().is_empty()
                || !(0.0..=100.0).contains(&category.min_percent)
            {
                return Err(RubricError::InvalidCategory {
                    label: category.label.clone(),
                    min_percent: category.min_percent,
                });
            }
        }
        Ok(())
    }

    /// `auto-<hash>` over names, weights, instructions and range.
    pub fn derived_version(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for criterion in &self.criteria {
            hasher.update(criterion.name.as_bytes());
            hasher.update(&[0]);
            hasher.update(&criterion.weight.to_le_bytes());
            hasher.update(criterion.instructions.as_bytes());
            hasher.update(&[0]);
        }
        hasher.update(&self.score_range.min.to_le_bytes());
        hasher.update(&self.score_range.max.to_le_bytes());
        let hex = hasher.finalize().to_hex();
        format!("auto-{}", &hex.as_str()[..12])
    }

    pub fn criterion(&self, name: &str) -> Option<&RubricCriterion> {
        self.criteria.iter().find(|c| c.name == name)
    }

    /// Weighted sum over criteria, in criterion order. `None` if a criterion is missing.
    pub fn weighted_total(&self, scores: &BTreeMap<String, f64>) -> Option<f64> {
        self.criteria.iter().try_fold(0.0, |total, criterion| {
            scores
                .get(&criterion.name)
                .map(|score| total + score * criterion.weight)
        })
    }

    /// Label of the highest band whose lower bound `percent` reaches.
    pub fn category_for(&self, percent: f64) -> Option<&str> {
        self.categories
            .iter()
            .filter(|c| percent >= c.min_percent)
            .max_by(|a, b| a.min_percent.total_cmp(&b.min_percent))
            .map(|c| c.label.as_str())
    }

    /// Highest attainable weighted total.
    pub fn max_total(&self) -> f64 {
        self.criteria
            .iter()
            .map(|c| c.weight * self.score_range.max)
            .sum()
    }
}
