//! Rubric scoring through a language model.
//!
//! [`ScoringClient`] batches concurrent requests into one model call, retries transient
//! failures with exponential backoff, and asks for a corrected reply when the model's
//! output cannot be parsed. Every request settles as a [`ScoreResult`]; failures are data.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;
pub mod parse;
pub mod prompt;
pub mod retry;
pub mod types;


pub use client::{ClientSettings, ScoringClient};
pub use error::{AttemptError, ModelError, ParseError};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockScoringModel;
pub use model::{OpenAiCompatibleModel, ScoringModel};
pub use parse::{ParsedScores, extract_json, parse_batch_reply};
pub use prompt::{CORRECTION_PROMPT, ModelPrompt, SYSTEM_PROMPT, Submission, build_prompt};
pub use retry::{AttemptState, NextStep};
pub use types::{FailureKind, FailureReason, ScoreResult, ScoreStatus};
