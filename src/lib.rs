//! Pitchrank library crate (used by the CLI and integration tests).
//!
//! # Pipeline
//!
//! presentation set → [`DocumentExtractor`] (+ [`ExtractionCache`]) → extracted content →
//! [`ScoringClient`] (+ [`ScoringCache`]) → score results → [`RankAggregator`] → [`RunReport`].
//! [`ScoringOrchestrator`] drives the whole run under a bounded worker pool.
//!
//! ## Core Types
//! - [`PipelineConfig`], [`ConfigError`] - Environment configuration
//! - [`Presentation`], [`PresentationInput`], [`Fingerprint`] - Inputs and identity
//! - [`Rubric`], [`RubricCriterion`] - Weighted, versioned criteria
//! - [`ScoreResult`], [`FailureReason`] - Per-presentation outcomes (failures are data)
//! - [`Ranking`], [`RankedEntry`] - Deterministic final order
//!
//! ## Collaborators
//! - [`ContentExtractor`], [`OcrEngine`], [`SlideRasterizer`] - Extraction seams
//! - [`ScoringModel`], [`OpenAiCompatibleModel`] - Language model seam
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod config;
pub mod constants;
pub mod extraction;
pub mod hashing;
pub mod orchestrator;
pub mod presentation;
pub mod ranking;
pub mod rubric;
pub mod scoring;

pub use cache::{CacheError, CacheStats, CacheStatus, DiskStore, ExtractionCache, ScoringCache};
pub use config::{ConfigError, PipelineConfig};
#[cfg(any(test, feature = "mock"))]
pub use extraction::{MockExtractor, MockOcrEngine, MockRasterizer};
pub use extraction::{
    ContentExtractor, DocumentExtractor, DocumentFormat, ExtractedContent, ExtractionError,
    ExtractionMethod, ExtractionSummary, OcrEngine, OcrError, PdftoppmRasterizer,
    SlideRasterizer, SlideText, StructureMetrics, TesseractOcr,
};
pub use hashing::{Fingerprint, hash_score_key};
pub use orchestrator::{
    PresentationState, ReportEntry, RunError, RunReport, RunStats, ScoringOrchestrator,
};
pub use presentation::{Presentation, PresentationInput, PresentationRef, PresentationSource};
pub use ranking::{RankAggregator, RankedEntry, Ranking, TieBreak};
pub use rubric::{Rubric, RubricCriterion, RubricError, ScoreCategory, ScoreRange};
#[cfg(any(test, feature = "mock"))]
pub use scoring::MockScoringModel;
pub use scoring::{
    ClientSettings, FailureKind, FailureReason, ModelError, OpenAiCompatibleModel, ScoreResult,
    ScoreStatus, ScoringClient, ScoringModel,
};
