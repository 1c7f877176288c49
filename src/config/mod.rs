//! Environment-backed configuration.
//!
//! `BATCH_SIZE` and `ENABLE_CACHE` keep their historical names; everything else is read
//! from `PITCHRANK_*` variables. The pipeline reads configuration once at start.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BACKOFF_MS, DEFAULT_BATCH_SIZE, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_CONTENT_CHARS,
    DEFAULT_MIN_TEXT_CHARS, DEFAULT_MODEL_NAME, DEFAULT_MODEL_TIMEOUT_SECS, DEFAULT_MODEL_URL,
    DEFAULT_OCR_COMMAND,
};

/// Pipeline configuration loaded from environment variables.
///
/// Use [`PipelineConfig::from_env`] to read overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bound on presentations concurrently extracting or scoring, and on
    /// submissions per model call. Default: `5`.
    pub batch_size: usize,

    /// Persist cache entries under [`cache_dir`](Self::cache_dir). Default: `true`.
    pub enable_cache: bool,

    /// Directory for persisted cache entries. Default: `./cache`.
    pub cache_dir: PathBuf,

    /// OpenAI-compatible endpoint (Ollama's `/v1` works). Default: `http://localhost:11434/v1`.
    pub model_base_url: String,

    /// Model identifier sent with each request.
    pub model_name: String,

    /// Bearer token for hosted endpoints.
    pub model_api_key: Option<String>,

    /// Wall-clock limit for one model call. Default: 120s.
    pub model_timeout: Duration,

    /// Attempts per scoring request, including the first. Default: `3`.
    pub max_attempts: u32,

    /// Backoff before the second attempt; doubles afterwards. Default: 500ms.
    pub initial_backoff: Duration,

    /// How long a `failed` score stays reusable. Default: zero (retry next run).
    pub failed_score_ttl: Duration,

    /// OCR binary. `None` disables OCR entirely.
    pub ocr_command: Option<String>,

    /// Native text with fewer non-whitespace characters falls back to OCR. Default: `20`.
    pub min_text_chars: usize,

    /// Extracted content is truncated to this many characters in prompts. Default: `10_000`.
    pub max_content_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            enable_cache: true,
            cache_dir: PathBuf::from("./cache"),
            model_base_url: DEFAULT_MODEL_URL.to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            model_api_key: None,
            model_timeout: Duration::from_secs(DEFAULT_MODEL_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
            failed_score_ttl: Duration::ZERO,
            ocr_command: Some(DEFAULT_OCR_COMMAND.to_string()),
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
        }
    }
}

impl PipelineConfig {
    const ENV_BATCH_SIZE: &'static str = "BATCH_SIZE";
    const ENV_ENABLE_CACHE: &'static str = "ENABLE_CACHE";
    const ENV_CACHE_DIR: &'static str = "PITCHRANK_CACHE_DIR";
    const ENV_MODEL_URL: &'static str = "PITCHRANK_MODEL_URL";
    const ENV_MODEL_NAME: &'static str = "PITCHRANK_MODEL_NAME";
    const ENV_MODEL_API_KEY: &'static str = "PITCHRANK_MODEL_API_KEY";
    const ENV_MODEL_TIMEOUT_SECS: &'static str = "PITCHRANK_MODEL_TIMEOUT_SECS";
    const ENV_MAX_ATTEMPTS: &'static str = "PITCHRANK_MAX_ATTEMPTS";
    const ENV_BACKOFF_MS: &'static str = "PITCHRANK_BACKOFF_MS";
    const ENV_FAILED_TTL_SECS: &'static str = "PITCHRANK_FAILED_TTL_SECS";
    const ENV_OCR_CMD: &'static str = "PITCHRANK_OCR_CMD";
    const ENV_MIN_TEXT_CHARS: &'static str = "PITCHRANK_MIN_TEXT_CHARS";
    const ENV_MAX_CONTENT_CHARS: &'static str = "PITCHRANK_MAX_CONTENT_CHARS";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let batch_size = Self::parse_batch_size_from_env(defaults.batch_size)?;
        let enable_cache =
            Self::parse_bool_from_env(Self::ENV_ENABLE_CACHE, defaults.enable_cache)?;
        let cache_dir = env::var(Self::ENV_CACHE_DIR)
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);
        let model_base_url = env::var(Self::ENV_MODEL_URL).unwrap_or(defaults.model_base_url);
        let model_name = env::var(Self::ENV_MODEL_NAME).unwrap_or(defaults.model_name);
        let model_api_key = Self::parse_optional_string_from_env(Self::ENV_MODEL_API_KEY);
        let model_timeout = Duration::from_secs(Self::parse_u64_from_env(
            Self::ENV_MODEL_TIMEOUT_SECS,
            defaults.model_timeout.as_secs(),
        )?);
        let max_attempts = Self::parse_u64_from_env(
            Self::ENV_MAX_ATTEMPTS,
            u64::from(defaults.max_attempts),
        )?
        .min(u64::from(u32::MAX)) as u32;
        let initial_backoff = Duration::from_millis(Self::parse_u64_from_env(
            Self::ENV_BACKOFF_MS,
            defaults.initial_backoff.as_millis() as u64,
        )?);
        let failed_score_ttl = Duration::from_secs(Self::parse_u64_from_env(
            Self::ENV_FAILED_TTL_SECS,
            defaults.failed_score_ttl.as_secs(),
        )?);
        let ocr_command = match env::var(Self::ENV_OCR_CMD) {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(value.trim().to_string()),
            Err(_) => defaults.ocr_command,
        };
        let min_text_chars =
            Self::parse_u64_from_env(Self::ENV_MIN_TEXT_CHARS, defaults.min_text_chars as u64)?
                as usize;
        let max_content_chars = Self::parse_u64_from_env(
            Self::ENV_MAX_CONTENT_CHARS,
            defaults.max_content_chars as u64,
        )? as usize;

        Ok(Self {
            batch_size,
            enable_cache,
            cache_dir,
            model_base_url,
            model_name,
            model_api_key,
            model_timeout,
            max_attempts,
            initial_backoff,
            failed_score_ttl,
            ocr_command,
            min_text_chars,
            max_content_chars,
        })
    }

    /// Validates basic invariants (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize {
                value: self.batch_size.to_string(),
            });
        }

        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts {
                value: self.max_attempts,
            });
        }

        if self.cache_dir.exists() && !self.cache_dir.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.cache_dir.clone(),
            });
        }

        Ok(())
    }

    fn parse_batch_size_from_env(default: usize) -> Result<usize, ConfigError> {
        match env::var(Self::ENV_BATCH_SIZE) {
            Ok(value) => match value.trim().parse::<usize>() {
                Ok(0) | Err(_) => Err(ConfigError::InvalidBatchSize { value }),
                Ok(size) => Ok(size),
            },
            Err(_) => Ok(default),
        }
    }

    fn parse_bool_from_env(name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match env::var(name) {
            Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(ConfigError::InvalidBool { name, value }),
            },
            Err(_) => Ok(default),
        }
    }

    fn parse_u64_from_env(name: &'static str, default: u64) -> Result<u64, ConfigError> {
        match env::var(name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|source| ConfigError::ParseInt {
                    name,
                    value: value.clone(),
                    source,
                }),
            Err(_) => Ok(default),
        }
    }

    fn parse_optional_string_from_env(name: &str) -> Option<String> {
        env::var(name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}
