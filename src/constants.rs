//! Cross-cutting, shared constants.
//!
//! Defaults here back [`PipelineConfig`](crate::config::PipelineConfig); modules that need
//! a value at runtime read it from the config, not from these constants.

/// Presentations in flight at once, and submissions per model call.
pub const DEFAULT_BATCH_SIZE: usize = 5;

pub const DEFAULT_MODEL_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_MODEL_NAME: &str = "llama3.1:8b-instruct-q4_K_M";
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 120;

/// How long the scoring batcher waits for more requests before sending a partial batch.
pub const BATCH_WINDOW_MS: u64 = 25;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 500;
/// Upper bound for any single backoff delay.
pub const MAX_BACKOFF_MS: u64 = 30_000;

pub const DEFAULT_OCR_COMMAND: &str = "tesseract";
/// Block-text page segmentation; faster than tesseract's default layout analysis.
pub const OCR_PAGE_SEG_MODE: &str = "6";
pub const OCR_TIMEOUT_SECS: u64 = 60;
pub const RASTERIZE_DPI: u32 = 150;

/// Native text shorter than this (non-whitespace chars) is treated as image-only.
pub const DEFAULT_MIN_TEXT_CHARS: usize = 20;

/// Embedded pictures smaller than this are icons or bullets, not slide content.
pub const MIN_OCR_IMAGE_BYTES: usize = 1_024;

pub const DEFAULT_MAX_CONTENT_CHARS: usize = 10_000;

/// Default bounds for a criterion sub-score.
pub const DEFAULT_SCORE_MIN: f64 = 0.0;
pub const DEFAULT_SCORE_MAX: f64 = 10.0;


/// Default score categories as `(label, minimum percent of the maximum total)`.
pub const DEFAULT_CATEGORY_BANDS: &[(&str, f64)] = &[
    ("Top-tier / Likely Winner", 120.0 / 140.0 * 100.0),
    ("Strong Contender", 100.0 / 140.0 * 100.0),
    ("Average / Needs Refinement", 75.0 / 140.0 * 100.0),
    ("Weak / Major Gaps", 50.0 / 140.0 * 100.0),
    ("Non-competitive", 0.0),
];
