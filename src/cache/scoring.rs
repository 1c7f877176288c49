use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::instrument;

use super::error::CacheResult;
use super::keyed::{CacheStats, CacheStatus, KeyedCache, Stored};
use super::store::DiskStore;
use crate::config::PipelineConfig;
use crate::extraction::ExtractedContent;
use crate::hashing::{Fingerprint, hash_score_key};
use crate::rubric::Rubric;
use crate::scoring::{ScoreResult, ScoreStatus, ScoringClient};

const SUBDIR: &str = "scores";

/// Score results keyed by `(fingerprint, rubric version, problem statement)`.
///
/// `ok` and `partial` results are reused indefinitely. `failed` results are only reused
/// while younger than `failed_ttl`; with the default of zero they are retried every run.
#[derive(Debug)]
pub struct ScoringCache {
    inner: KeyedCache<ScoreResult>,
    failed_ttl: Duration,
}

impl ScoringCache {
    pub fn in_memory() -> Self {
        Self {
            inner: KeyedCache::in_memory(SUBDIR),
            failed_ttl: Duration::ZERO,
        }
    }

    /// Persists entries under `<cache_dir>/scores`.
    pub fn persistent(cache_dir: &Path) -> CacheResult<Self> {
        let store = DiskStore::new(cache_dir.join(SUBDIR));
        store.ensure_root()?;
        Ok(Self {
            inner: KeyedCache::persistent(SUBDIR, store),
            failed_ttl: Duration::ZERO,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> CacheResult<Self> {
        let cache = if config.enable_cache {
            Self::persistent(&config.cache_dir)?
        } else {
            Self::in_memory()
        };
        Ok(cache.with_failed_ttl(config.failed_score_ttl))
    }

    pub fn with_failed_ttl(mut self, ttl: Duration) -> Self {
        self.failed_ttl = ttl;
        self
    }

    fn is_fresh(&self, stored: &Stored<ScoreResult>) -> bool {
        if stored.value.status != ScoreStatus::Failed {
            return true;
        }
        let age = Utc::now()
            .signed_duration_since(stored.stored_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        age < self.failed_ttl
    }

    /// Returns the cached score for this deck, rubric version and problem statement, or
    /// asks `client`.
    #[instrument(skip(self, problem_statement, content, rubric, client), fields(fingerprint = %fingerprint.short(), rubric_version = %rubric.version))]
    pub async fn get_or_score(
        &self,
        fingerprint: Fingerprint,
        presentation_id: &str,
        problem_statement: Option<&str>,
        content: &ExtractedContent,
        rubric: &Arc<Rubric>,
        client: &ScoringClient,
    ) -> (ScoreResult, CacheStatus) {
        let key = hash_score_key(&fingerprint, &rubric.version, problem_statement);
        let outcome = self
            .inner
            .get_or_try_insert_with(
                key,
                |stored| self.is_fresh(stored),
                || async {
                    Ok::<_, Infallible>(
                        client
                            .score_with_problem_statement(
                                presentation_id,
                                problem_statement,
                                content,
                                Arc::clone(rubric),
                            )
                            .await,
                    )
                },
            )
            .await;

        match outcome {
            Ok(scored) => scored,
            Err(never) => match never {},
        }
    }

    pub fn get(
        &self,
        fingerprint: &Fingerprint,
        rubric_version: &str,
        problem_statement: Option<&str>,
    ) -> Option<ScoreResult> {
        self.inner
            .peek(&hash_score_key(fingerprint, rubric_version, problem_statement))
            .filter(|stored| self.is_fresh(stored))
            .map(|stored| stored.value.clone())
    }

    pub fn invalidate(
        &self,
        fingerprint: &Fingerprint,
        rubric_version: &str,
        problem_statement: Option<&str>,
    ) {
        self.inner
            .invalidate(&hash_score_key(fingerprint, rubric_version, problem_statement));
    }

    pub fn is_persistent(&self) -> bool {
        self.inner.is_persistent()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats()
    }
}
