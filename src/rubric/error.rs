use std::path::PathBuf;

use thiserror::Error;

/// Rubric loading and validation errors.
#[derive(Debug, Error)]
pub enum RubricError {
    #[error("rubric has no criteria")]
    NoCriteria,

    #[error("criterion name must not be empty")]
    EmptyCriterionName,

    #[error("duplicate criterion '{name}'")]
    DuplicateCriterion { name: String },

    #[error("criterion '{name}' has invalid weight {weight} (must be finite and >= 0)")]
    InvalidWeight { name: String, weight: f64 },

    #[error("category '{label}' has invalid lower bound {min_percent} (must be within 0..=100)")]
    InvalidCategory { label: String, min_percent: f64 },

    #[error("invalid score range [{min}, {max}]")]
    InvalidRange { min: f64, max: f64 },

    #[error("failed to read rubric {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rubric JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
