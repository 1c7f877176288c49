use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::types::DocumentFormat;

/// Whole-file extraction failures. Fatal for that presentation only.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported presentation format: {name}")]
    UnsupportedFormat { name: String },

    #[error("corrupt {format} file: {reason}")]
    Corrupt {
        format: DocumentFormat,
        reason: String,
    },

    #[error("presentation contains no slides")]
    NoSlides,

    #[error("extraction task failed: {reason}")]
    TaskFailed { reason: String },
}

impl ExtractionError {
    pub(crate) fn corrupt(format: DocumentFormat, reason: impl std::fmt::Display) -> Self {
        ExtractionError::Corrupt {
            format,
            reason: reason.to_string(),
        }
    }
}

/// Failures of the OCR or rasterizer collaborators. Degrade one slide, never the file.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("{tool} unavailable: {reason}")]
    Unavailable { tool: String, reason: String },

    #[error("{tool} timed out after {elapsed:?}")]
    Timeout { tool: String, elapsed: Duration },

    #[error("{tool} failed: {stderr}")]
    ToolFailed { tool: String, stderr: String },

    #[error("{tool} produced no output")]
    NoOutput { tool: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
