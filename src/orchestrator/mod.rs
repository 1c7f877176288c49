//! End-to-end pipeline over a presentation set.
//!
//! [`ScoringOrchestrator`] dispatches presentations to at most `batch_size` concurrent
//! workers. Each worker ingests, extracts (through [`ExtractionCache`]) and scores
//! (through [`ScoringCache`]) one presentation. Ranking starts only after every worker
//! has reached a terminal state.

pub mod error;
pub mod report;
pub mod state;


pub use error::{RunError, RunResult, TransitionError};
pub use report::{ReportEntry, RunReport, RunStats};
pub use state::{PresentationState, StateBoard};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::cache::{CacheStatus, ExtractionCache, ScoringCache};
use crate::config::PipelineConfig;
use crate::extraction::{ContentExtractor, ExtractionSummary};
use crate::presentation::{Presentation, PresentationInput, PresentationRef};
use crate::ranking::{RankAggregator, TieBreak};
use crate::rubric::Rubric;
use crate::scoring::{FailureKind, FailureReason, ScoreResult, ScoringClient};

/// Injected collaborators for a run. Caches outlive runs; tests pass in-memory ones.
#[derive(Clone)]
pub struct ScoringOrchestrator {
    extractor: Arc<dyn ContentExtractor>,
    extraction_cache: Arc<ExtractionCache>,
    scoring_cache: Arc<ScoringCache>,
    client: ScoringClient,
    batch_size: usize,
    tie_break: TieBreak,
}

impl std::fmt::Debug for ScoringOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringOrchestrator")
            .field("batch_size", &self.batch_size)
            .field("tie_break", &self.tie_break)
            .field("client", &self.client)
            .finish()
    }
}

/// Result of one worker, before ranking.
#[derive(Debug)]
struct Outcome {
    presentation: PresentationRef,
    state: PresentationState,
    extraction: Option<ExtractionSummary>,
    extraction_cache: Option<CacheStatus>,
    score: ScoreResult,
    score_cache: Option<CacheStatus>,
}

impl ScoringOrchestrator {
    pub fn new(
        extractor: Arc<dyn ContentExtractor>,
        extraction_cache: Arc<ExtractionCache>,
        scoring_cache: Arc<ScoringCache>,
        client: ScoringClient,
        batch_size: usize,
    ) -> Self {
        Self {
            extractor,
            extraction_cache,
            scoring_cache,
            client,
            batch_size: batch_size.max(1),
            tie_break: TieBreak::default(),
        }
    }

    /// Caches and model client from configuration. Must be called inside a Tokio runtime.
    pub fn from_config(
        config: &PipelineConfig,
        extractor: Arc<dyn ContentExtractor>,
    ) -> RunResult<Self> {
        Ok(Self::new(
            extractor,
            Arc::new(ExtractionCache::from_config(config)?),
            Arc::new(ScoringCache::from_config(config)?),
            ScoringClient::from_config(config),
            config.batch_size,
        ))
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn client(&self) -> &ScoringClient {
        &self.client
    }

    pub fn extraction_cache(&self) -> &ExtractionCache {
        &self.extraction_cache
    }

    pub fn scoring_cache(&self) -> &ScoringCache {
        &self.scoring_cache
    }

    /// Runs to completion.
    pub async fn run(
        &self,
        inputs: &[PresentationInput],
        rubric: Arc<Rubric>,
    ) -> RunResult<RunReport> {
        self.run_with_cancel(inputs, rubric, CancellationToken::new())
            .await
    }

    /// Runs until done or `cancel` fires. After cancellation no new presentation is
    /// dispatched; in-flight ones finish and undispatched ones are reported as
    /// `failed` / `cancelled`.
    #[instrument(skip_all, fields(presentations = inputs.len(), rubric_version = %rubric.version, batch_size = self.batch_size))]
    pub async fn run_with_cancel(
        &self,
        inputs: &[PresentationInput],
        rubric: Arc<Rubric>,
        cancel: CancellationToken,
    ) -> RunResult<RunReport> {
        if inputs.is_empty() {
            return Err(RunError::NoPresentations);
        }
        check_unique_ids(inputs)?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let calls_before = self.client.model_calls();
        info!(%run_id, "run started");

        let board = Arc::new(StateBoard::new(
            inputs.iter().map(|input| input.id.clone()).collect(),
        ));
        let semaphore = Arc::new(Semaphore::new(self.batch_size));
        let mut handles: Vec<(usize, JoinHandle<RunResult<Outcome>>)> = Vec::new();

        for (index, input) in inputs.iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let worker = self.clone();
            let input = input.clone();
            let rubric = Arc::clone(&rubric);
            let board = Arc::clone(&board);
            let handle = tokio::spawn(async move {
                let _permit = permit;
                worker.process(index, &input, &rubric, &board).await
            });
            handles.push((index, handle));
        }

        let dispatched = handles.len();
        let mut outcomes: Vec<Option<Outcome>> = inputs.iter().map(|_| None).collect();
        for (index, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => worker_failed(&inputs[index], index, &board, &rubric.version, &e),
                Err(e) => worker_failed(&inputs[index], index, &board, &rubric.version, &e),
            };
            outcomes[index] = Some(outcome);
        }

        let mut cancelled = 0;
        for (index, slot) in outcomes.iter_mut().enumerate() {
            if slot.is_none() {
                board.advance(index, PresentationState::Failed)?;
                cancelled += 1;
                *slot = Some(cancelled_outcome(&inputs[index], &rubric.version));
            }
        }
        if cancelled > 0 {
            warn!(cancelled, dispatched, "run cancelled before all presentations were dispatched");
        }

        let outcomes: Vec<Outcome> = outcomes.into_iter().flatten().collect();
        let report = self.build_report(
            run_id,
            started_at,
            &rubric,
            outcomes,
            RunStats {
                cancelled,
                model_calls: self.client.model_calls().saturating_sub(calls_before),
                peak_active: board.peak_active(),
                ..RunStats::default()
            },
        );

        info!(
            %run_id,
            total = report.stats.total,
            scored = report.stats.scored,
            failed = report.stats.failed,
            model_calls = report.stats.model_calls,
            "run finished"
        );

        if report.stats.scored == 0 {
            error!(%run_id, total = report.stats.total, "no presentation could be scored");
            return Err(RunError::Aborted {
                total: report.stats.total,
                report: Box::new(report),
            });
        }
        Ok(report)
    }

    #[instrument(skip_all, fields(presentation_id = %input.id))]
    async fn process(
        &self,
        index: usize,
        input: &PresentationInput,
        rubric: &Arc<Rubric>,
        board: &StateBoard,
    ) -> RunResult<Outcome> {
        board.advance(index, PresentationState::Extracting)?;

        let presentation = match Presentation::ingest(input).await {
            Ok(presentation) => presentation,
            Err(e) => {
                warn!(error = %e, "could not read presentation");
                board.advance(index, PresentationState::Failed)?;
                return Ok(extraction_failed(PresentationRef::from(input), &rubric.version, &e));
            }
        };

        let (content, extraction_status) = match self
            .extraction_cache
            .get_or_extract(&presentation, self.extractor.as_ref())
            .await
        {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!(error = %e, "extraction failed");
                board.advance(index, PresentationState::Failed)?;
                return Ok(extraction_failed(
                    PresentationRef::from(&presentation),
                    &rubric.version,
                    &e,
                ));
            }
        };
        board.advance(index, PresentationState::Extracted)?;

        board.advance(index, PresentationState::Scoring)?;
        let (score, score_status) = self
            .scoring_cache
            .get_or_score(
                presentation.fingerprint(),
                presentation.id(),
                presentation.problem_statement(),
                &content,
                rubric,
                &self.client,
            )
            .await;

        let state = if score.is_scored() {
            PresentationState::Scored
        } else {
            PresentationState::Failed
        };
        board.advance(index, state)?;
        info!(status = ?score.status, %state, "presentation settled");

        Ok(Outcome {
            presentation: PresentationRef::from(&presentation),
            state,
            extraction: Some(content.summary()),
            extraction_cache: Some(extraction_status),
            score,
            score_cache: Some(score_status),
        })
    }

    fn build_report(
        &self,
        run_id: Uuid,
        started_at: chrono::DateTime<Utc>,
        rubric: &Arc<Rubric>,
        outcomes: Vec<Outcome>,
        mut stats: RunStats,
    ) -> RunReport {
        let ranking = RankAggregator::new(Arc::clone(rubric))
            .with_tie_break(self.tie_break)
            .rank(outcomes.iter().map(|o| (&o.presentation, &o.score)));

        stats.total = outcomes.len();
        for outcome in &outcomes {
            if outcome.state == PresentationState::Scored {
                stats.scored += 1;
            } else {
                stats.failed += 1;
            }
            match outcome.extraction_cache {
                Some(CacheStatus::Hit) => stats.extraction_hits += 1,
                Some(CacheStatus::Miss) => stats.extraction_misses += 1,
                None => {}
            }
            match outcome.score_cache {
                Some(CacheStatus::Hit) => stats.score_hits += 1,
                Some(CacheStatus::Miss) => stats.score_misses += 1,
                None => {}
            }
        }

        let mut by_id: HashMap<String, Outcome> = outcomes
            .into_iter()
            .map(|o| (o.presentation.id.clone(), o))
            .collect();
        let entries = ranking
            .entries
            .iter()
            .filter_map(|ranked| {
                by_id.remove(&ranked.presentation_id).map(|o| ReportEntry {
                    rank: ranked.rank,
                    presentation: o.presentation,
                    state: o.state,
                    total: ranked.total,
                    percent_of_max: ranked.percent_of_max,
                    category: ranked.category.clone(),
                    extraction: o.extraction,
                    extraction_cache: o.extraction_cache,
                    score: o.score,
                    score_cache: o.score_cache,
                })
            })
            .collect();

        RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            rubric_version: rubric.version.clone(),
            ranking,
            entries,
            stats,
        }
    }
}

fn check_unique_ids(inputs: &[PresentationInput]) -> RunResult<()> {
    let mut seen = HashSet::with_capacity(inputs.len());
    for input in inputs {
        if !seen.insert(input.id.as_str()) {
            return Err(RunError::DuplicateId {
                id: input.id.clone(),
            });
        }
    }
    Ok(())
}

fn extraction_failed(
    presentation: PresentationRef,
    rubric_version: &str,
    error: &impl std::fmt::Display,
) -> Outcome {
    Outcome {
        presentation,
        state: PresentationState::Failed,
        extraction: None,
        extraction_cache: None,
        score: ScoreResult::failed(
            rubric_version,
            FailureReason::with_detail(FailureKind::ExtractionError, error.to_string()),
            0,
        ),
        score_cache: None,
    }
}

/// A worker that panicked or broke the lifecycle fails its own presentation only.
fn worker_failed(
    input: &PresentationInput,
    index: usize,
    board: &StateBoard,
    rubric_version: &str,
    error: &impl std::fmt::Display,
) -> Outcome {
    let left = board.abort(index);
    error!(presentation_id = %input.id, from = ?left, error = %error, "presentation worker failed");
    Outcome {
        presentation: PresentationRef::from(input),
        state: PresentationState::Failed,
        extraction: None,
        extraction_cache: None,
        score: ScoreResult::failed(
            rubric_version,
            FailureReason::with_detail(FailureKind::WorkerFailed, error.to_string()),
            0,
        ),
        score_cache: None,
    }
}

fn cancelled_outcome(input: &PresentationInput, rubric_version: &str) -> Outcome {
    Outcome {
        presentation: PresentationRef::from(input),
        state: PresentationState::Failed,
        extraction: None,
        extraction_cache: None,
        score: ScoreResult::failed(
            rubric_version,
            FailureReason::with_detail(FailureKind::Cancelled, "run cancelled before dispatch"),
            0,
        ),
        score_cache: None,
    }
}
