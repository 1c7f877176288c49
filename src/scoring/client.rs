//! Batching scoring client.
//!
//! Callers submit one presentation at a time. A background batcher groups concurrent
//! requests (same rubric version, distinct ids, at most `batch_size`) into one model call
//! and fans the per-submission results back out. Each submission keeps its own attempt
//! state, so a batch reply that answers only some submissions retries just the rest.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::error::{AttemptError, ModelError, ParseError};
use super::model::{OpenAiCompatibleModel, ScoringModel};
use super::parse::{ParsedScores, parse_batch_reply};
use super::prompt::{Submission, build_prompt};
use super::retry::{AttemptState, NextStep};
use super::types::{FailureKind, FailureReason, ScoreResult};
use crate::config::PipelineConfig;
use crate::constants::{
    BATCH_WINDOW_MS, DEFAULT_BACKOFF_MS, DEFAULT_BATCH_SIZE, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_CONTENT_CHARS, DEFAULT_MODEL_TIMEOUT_SECS,
};
use crate::extraction::ExtractedContent;
use crate::hashing::hash_to_u64;
use crate::rubric::Rubric;

/// Knobs for [`ScoringClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Maximum submissions per model call.
    pub batch_size: usize,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    /// Wall-clock limit for one model call.
    pub timeout: Duration,
    pub max_content_chars: usize,
    /// How long the batcher waits for a batch to fill.
    pub batch_window: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
            timeout: Duration::from_secs(DEFAULT_MODEL_TIMEOUT_SECS),
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
            batch_window: Duration::from_millis(BATCH_WINDOW_MS),
        }
    }
}

impl ClientSettings {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            max_attempts: config.max_attempts.max(1),
            initial_backoff: config.initial_backoff,
            timeout: config.model_timeout,
            max_content_chars: config.max_content_chars,
            batch_window: Duration::from_millis(BATCH_WINDOW_MS),
        }
    }
}

struct Job {
    id: String,
    problem_statement: Option<String>,
    content: String,
    rubric: Arc<Rubric>,
    reply: oneshot::Sender<ScoreResult>,
}

struct Shared {
    model: Arc<dyn ScoringModel>,
    settings: ClientSettings,
    model_calls: AtomicU64,
}

/// Scores extracted presentations against a rubric, batching concurrent requests.
///
/// Never returns an error: failures come back as `failed` [`ScoreResult`]s.
/// Cloning is cheap and clones share one batcher.
#[derive(Clone)]
pub struct ScoringClient {
    tx: mpsc::Sender<Job>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ScoringClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringClient")
            .field("settings", &self.shared.settings)
            .field("model_calls", &self.model_calls())
            .finish()
    }
}

impl ScoringClient {
    /// Starts the batcher task. Must be called inside a Tokio runtime.
    pub fn new(model: Arc<dyn ScoringModel>, settings: ClientSettings) -> Self {
        let capacity = settings.batch_size.max(1) * 4;
        let (tx, rx) = mpsc::channel(capacity);
        let shared = Arc::new(Shared {
            model,
            settings,
            model_calls: AtomicU64::new(0),
        });

        tokio::spawn(run_batcher(Arc::clone(&shared), rx));
        Self { tx, shared }
    }

    /// Client for the configured OpenAI-compatible endpoint.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            Arc::new(OpenAiCompatibleModel::from_config(config)),
            ClientSettings::from_config(config),
        )
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.shared.settings
    }

    /// Model calls issued so far, retries included.
    pub fn model_calls(&self) -> u64 {
        self.shared.model_calls.load(Ordering::Relaxed)
    }

    /// Scores one presentation's content.
    pub async fn score(
        &self,
        presentation_id: &str,
        content: &ExtractedContent,
        rubric: Arc<Rubric>,
    ) -> ScoreResult {
        self.score_with_problem_statement(presentation_id, None, content, rubric)
            .await
    }

    /// Scores one presentation's content against the problem statement the team chose.
    pub async fn score_with_problem_statement(
        &self,
        presentation_id: &str,
        problem_statement: Option<&str>,
        content: &ExtractedContent,
        rubric: Arc<Rubric>,
    ) -> ScoreResult {
        let version = rubric.version.clone();
        let (reply, rx) = oneshot::channel();
        let job = Job {
            id: presentation_id.to_string(),
            problem_statement: problem_statement.map(str::to_string),
            content: content.to_prompt_text(self.shared.settings.max_content_chars),
            rubric,
            reply,
        };

        if self.tx.send(job).await.is_err() {
            return ScoreResult::failed(
                version,
                FailureReason::with_detail(FailureKind::ModelUnavailable, "scoring client stopped"),
                0,
            );
        }

        rx.await.unwrap_or_else(|_| {
            ScoreResult::failed(
                version,
                FailureReason::with_detail(
                    FailureKind::ModelUnavailable,
                    "scoring task ended without a result",
                ),
                0,
            )
        })
    }

    /// Scores many presentations concurrently; results are in input order.
    pub async fn score_batch(
        &self,
        items: &[(String, ExtractedContent)],
        rubric: Arc<Rubric>,
    ) -> Vec<ScoreResult> {
        join_all(
            items
                .iter()
                .map(|(id, content)| self.score(id, content, Arc::clone(&rubric))),
        )
        .await
    }
}

fn can_join(batch: &[Job], job: &Job) -> bool {
    batch
        .first()
        .is_some_and(|first| first.rubric.version == job.rubric.version)
        && batch.iter().all(|queued| queued.id != job.id)
}

async fn run_batcher(shared: Arc<Shared>, mut rx: mpsc::Receiver<Job>) {
    let batch_size = shared.settings.batch_size.max(1);
    let window = shared.settings.batch_window;
    let mut carried: VecDeque<Job> = VecDeque::new();

    loop {
        let first = match carried.pop_front() {
            Some(job) => job,
            None => match rx.recv().await {
                Some(job) => job,
                None => break,
            },
        };

        let deadline = Instant::now() + window;
        let mut batch = vec![first];
        let mut deferred = Vec::new();

        while batch.len() < batch_size {
            let job = match carried.pop_front() {
                Some(job) => job,
                None => match tokio::time::timeout_at(deadline, rx.recv()).await {
                    Ok(Some(job)) => job,
                    _ => break,
                },
            };
            if can_join(&batch, &job) {
                batch.push(job);
            } else {
                deferred.push(job);
            }
        }

        for job in deferred.into_iter().rev() {
            carried.push_front(job);
        }

        debug!(size = batch.len(), carried = carried.len(), "dispatching batch");
        tokio::spawn(process_batch(Arc::clone(&shared), batch));
    }

    debug!("scoring batcher stopped");
}

#[instrument(skip_all, fields(size = jobs.len()))]
async fn process_batch(shared: Arc<Shared>, jobs: Vec<Job>) {
    let Some(rubric) = jobs.first().map(|job| Arc::clone(&job.rubric)) else {
        return;
    };
    let settings = &shared.settings;

    let mut pending: Vec<(Job, AttemptState)> = jobs
        .into_iter()
        .map(|job| {
            let state = AttemptState::new(settings.max_attempts, settings.initial_backoff);
            (job, state)
        })
        .collect();

    while !pending.is_empty() {
        let correction = pending.iter().any(|(_, state)| state.needs_correction());
        let submissions: Vec<Submission<'_>> = pending
            .iter()
            .map(|(job, _)| Submission {
                id: &job.id,
                content: &job.content,
                problem_statement: job.problem_statement.as_deref(),
            })
            .collect();
        let prompt = build_prompt(&rubric, &submissions, correction);

        for (_, state) in pending.iter_mut() {
            state.begin();
        }
        shared.model_calls.fetch_add(1, Ordering::Relaxed);
        debug!(
            submissions = prompt.submission_ids.len(),
            correction,
            prompt_digest = hash_to_u64(prompt.user.as_bytes()),
            "calling model"
        );

        let call = tokio::time::timeout(settings.timeout, shared.model.complete(&prompt));
        let reply = match call.await {
            Ok(reply) => reply,
            Err(_) => Err(ModelError::Timeout {
                elapsed: settings.timeout,
            }),
        };
        let outcomes = settle_outcomes(reply, &rubric, &prompt.submission_ids, &pending);

        let mut retry_delay = Duration::ZERO;
        let mut still_pending = Vec::new();
        for ((job, mut state), outcome) in pending.into_iter().zip(outcomes) {
            match outcome {
                Ok(parsed) => {
                    let result = ScoreResult::scored(
                        rubric.version.clone(),
                        parsed.scores,
                        parsed.rationale,
                        parsed.clamped,
                        state.attempts(),
                    );
                    if !result.clamped.is_empty() {
                        warn!(id = %job.id, clamped = ?result.clamped, "sub-scores clamped into range");
                    }
                    let _ = job.reply.send(result);
                }
                Err(err) => match state.fail(err) {
                    NextStep::Retry(delay) => {
                        debug!(id = %job.id, attempt = state.attempts(), ?delay, "retrying submission");
                        retry_delay = retry_delay.max(delay);
                        still_pending.push((job, state));
                    }
                    NextStep::Exhausted(reason) => {
                        warn!(id = %job.id, attempts = state.attempts(), %reason, "scoring failed");
                        let result =
                            ScoreResult::failed(rubric.version.clone(), reason, state.attempts());
                        let _ = job.reply.send(result);
                    }
                },
            }
        }

        pending = still_pending;
        if !pending.is_empty() {
            tokio::time::sleep(retry_delay).await;
        }
    }

    info!(rubric_version = %rubric.version, "batch settled");
}

/// One outcome per pending job, in the same order.
fn settle_outcomes(
    reply: Result<String, ModelError>,
    rubric: &Rubric,
    submission_ids: &[String],
    pending: &[(Job, AttemptState)],
) -> Vec<Result<ParsedScores, AttemptError>> {
    let text = match reply {
        Ok(text) => text,
        Err(err) => {
            return pending
                .iter()
                .map(|_| Err(AttemptError::Model(err.clone())))
                .collect();
        }
    };

    match parse_batch_reply(&text, rubric, submission_ids) {
        Ok(mut parsed) => pending
            .iter()
            .map(|(job, _)| {
                parsed
                    .remove(&job.id)
                    .unwrap_or_else(|| {
                        Err(ParseError::MissingSubmission { id: job.id.clone() })
                    })
                    .map_err(AttemptError::from)
            })
            .collect(),
        Err(err) => pending
            .iter()
            .map(|_| Err(AttemptError::Parse(err.clone())))
            .collect(),
    }
}
