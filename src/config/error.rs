//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Batch size must be a positive integer.
    #[error("invalid batch size '{value}': must be a positive integer")]
    InvalidBatchSize { value: String },

    /// A numeric variable could not be parsed.
    #[error("failed to parse {name}='{value}': {source}")]
    ParseInt {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// A boolean variable held something other than true/false/1/0/yes/no.
    #[error("invalid boolean for {name}: '{value}'")]
    InvalidBool { name: &'static str, value: String },

    /// Retry policy needs at least one attempt.
    #[error("max attempts must be at least 1, got {value}")]
    InvalidMaxAttempts { value: u32 },

    /// Path exists but is not a directory (when a directory was expected).
    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}
