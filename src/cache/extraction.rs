use std::path::Path;

use tracing::instrument;

use super::error::CacheResult;
use super::keyed::{CacheStats, CacheStatus, KeyedCache};
use super::store::DiskStore;
use crate::config::PipelineConfig;
use crate::extraction::{ContentExtractor, ExtractedContent, ExtractionError};
use crate::hashing::Fingerprint;
use crate::presentation::Presentation;

const SUBDIR: &str = "extraction";

/// Extraction results keyed by file-content fingerprint.
///
/// Entries never expire; use [`ExtractionCache::invalidate`] to drop one. Failed
/// extractions are not cached.
#[derive(Debug)]
pub struct ExtractionCache {
    inner: KeyedCache<ExtractedContent>,
}

impl ExtractionCache {
    pub fn in_memory() -> Self {
        Self {
            inner: KeyedCache::in_memory(SUBDIR),
        }
    }

    /// Persists entries under `<cache_dir>/extraction`.
    pub fn persistent(cache_dir: &Path) -> CacheResult<Self> {
        let store = DiskStore::new(cache_dir.join(SUBDIR));
        store.ensure_root()?;
        Ok(Self {
            inner: KeyedCache::persistent(SUBDIR, store),
        })
    }

    /// Persistent when `ENABLE_CACHE` is on, in-memory otherwise.
    pub fn from_config(config: &PipelineConfig) -> CacheResult<Self> {
        if config.enable_cache {
            Self::persistent(&config.cache_dir)
        } else {
            Ok(Self::in_memory())
        }
    }

    /// Returns cached content for the presentation's fingerprint, extracting on a miss.
    #[instrument(skip(self, presentation, extractor), fields(presentation_id = %presentation.id(), fingerprint = %presentation.fingerprint().short()))]
    pub async fn get_or_extract(
        &self,
        presentation: &Presentation,
        extractor: &dyn ContentExtractor,
    ) -> Result<(ExtractedContent, CacheStatus), ExtractionError> {
        self.inner
            .get_or_try_insert_with(
                *presentation.fingerprint().as_bytes(),
                |_| true,
                || extractor.extract(presentation),
            )
            .await
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<ExtractedContent> {
        self.inner
            .peek(fingerprint.as_bytes())
            .map(|stored| stored.value.clone())
    }

    pub fn invalidate(&self, fingerprint: &Fingerprint) {
        self.inner.invalidate(fingerprint.as_bytes());
    }

    pub fn is_persistent(&self) -> bool {
        self.inner.is_persistent()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats()
    }
}
