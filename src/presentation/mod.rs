//! Presentation identity and ingestion.
//!
//! A [`Presentation`] is created once per input and never mutated afterwards; its
//! [`Fingerprint`] is computed from the file bytes at ingestion.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::extraction::ExtractionError;
use crate::hashing::Fingerprint;

/// Where a presentation's bytes come from.
#[derive(Debug, Clone)]
pub enum PresentationSource {
    /// A file on disk, read at ingestion.
    Path(PathBuf),
    /// Bytes already in memory (e.g. handed over by a downloader).
    Bytes { name: String, bytes: Arc<[u8]> },
}

impl PresentationSource {
    /// Display name used for format detection and reports.
    pub fn name(&self) -> String {
        match self {
            PresentationSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            PresentationSource::Bytes { name, .. } => name.clone(),
        }
    }
}

/// One `(presentation id, source)` pair from the input boundary.
#[derive(Debug, Clone)]
pub struct PresentationInput {
    pub id: String,
    pub source: PresentationSource,
    /// The challenge the team picked; judged alongside the deck.
    pub problem_statement: Option<String>,
}

impl PresentationInput {
    pub fn from_path(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            source: PresentationSource::Path(path.into()),
            problem_statement: None,
        }
    }

    pub fn from_bytes(
        id: impl Into<String>,
        name: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            id: id.into(),
            source: PresentationSource::Bytes {
                name: name.into(),
                bytes: bytes.into(),
            },
            problem_statement: None,
        }
    }

    /// Blank statements are treated as absent.
    pub fn with_problem_statement(mut self, statement: impl Into<String>) -> Self {
        let statement = statement.into();
        let trimmed = statement.trim();
        self.problem_statement = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }
}

/// An ingested, fingerprinted presentation.
#[derive(Clone)]
pub struct Presentation {
    id: String,
    source_name: String,
    fingerprint: Fingerprint,
    bytes: Arc<[u8]>,
    problem_statement: Option<String>,
}

impl Presentation {
    /// Reads the source (if on disk) and fingerprints its bytes.
    pub async fn ingest(input: &PresentationInput) -> Result<Self, ExtractionError> {
        let bytes: Arc<[u8]> = match &input.source {
            PresentationSource::Path(path) => read_source(path).await?.into(),
            PresentationSource::Bytes { bytes, .. } => Arc::clone(bytes),
        };

        let mut presentation = Self::from_parts(input.id.clone(), input.source.name(), bytes);
        presentation.problem_statement = input.problem_statement.clone();
        Ok(presentation)
    }

    pub fn from_parts(id: String, source_name: String, bytes: Arc<[u8]>) -> Self {
        let fingerprint = Fingerprint::of_bytes(&bytes);
        Self {
            id,
            source_name,
            fingerprint,
            bytes,
            problem_statement: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn problem_statement(&self) -> Option<&str> {
        self.problem_statement.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the bytes, for moving into blocking tasks.
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }
}

impl std::fmt::Debug for Presentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Presentation")
            .field("id", &self.id)
            .field("source_name", &self.source_name)
            .field("fingerprint", &self.fingerprint)
            .field("problem_statement", &self.problem_statement)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Identity fields carried into reports for presentations that never got ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationRef {
    pub id: String,
    pub source_name: String,
    pub fingerprint: Option<Fingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_statement: Option<String>,
}

impl From<&Presentation> for PresentationRef {
    fn from(p: &Presentation) -> Self {
        Self {
            id: p.id.clone(),
            source_name: p.source_name.clone(),
            fingerprint: Some(p.fingerprint),
            problem_statement: p.problem_statement.clone(),
        }
    }
}

impl From<&PresentationInput> for PresentationRef {
    fn from(input: &PresentationInput) -> Self {
        Self {
            id: input.id.clone(),
            source_name: input.source.name(),
            fingerprint: None,
            problem_statement: input.problem_statement.clone(),
        }
    }
}

async fn read_source(path: &Path) -> Result<Vec<u8>, ExtractionError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| ExtractionError::Unreadable {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_ingest_from_path_fingerprints_bytes() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"%PDF-1.4 deck").expect("write");

        let input = PresentationInput::from_path("team-a", file.path());
        let presentation = Presentation::ingest(&input).await.expect("ingest");

        assert_eq!(presentation.id(), "team-a");
        assert_eq!(presentation.bytes(), b"%PDF-1.4 deck");
        assert_eq!(presentation.fingerprint(), Fingerprint::of_bytes(b"%PDF-1.4 deck"));
    }

    #[tokio::test]
    async fn test_renamed_file_keeps_fingerprint() {
        let dir = tempfile::tempdir().expect("temp dir");
        let original = dir.path().join("deck.pdf");
        let renamed = dir.path().join("final_FINAL.pdf");
        std::fs::write(&original, b"same bytes").expect("write");
        std::fs::copy(&original, &renamed).expect("copy");

        let a = Presentation::ingest(&PresentationInput::from_path("a", &original))
            .await
            .expect("ingest a");
        let b = Presentation::ingest(&PresentationInput::from_path("b", &renamed))
            .await
            .expect("ingest b");

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(b.source_name(), "final_FINAL.pdf");
    }

    #[tokio::test]
    async fn test_ingest_missing_file_is_unreadable() {
        let input = PresentationInput::from_path("ghost", "/definitely/not/here.pptx");
        let err = Presentation::ingest(&input).await.expect_err("should fail");

        assert!(matches!(err, ExtractionError::Unreadable { .. }));
    }

    #[tokio::test]
    async fn test_problem_statement_carried_through_ingest() {
        let input = PresentationInput::from_bytes("t", "deck.pdf", b"%PDF".to_vec())
            .with_problem_statement("  Clean water for rural schools ");
        let presentation = Presentation::ingest(&input).await.expect("ingest");

        assert_eq!(presentation.problem_statement(), Some("Clean water for rural schools"));
        assert_eq!(
            PresentationRef::from(&input).problem_statement.as_deref(),
            Some("Clean water for rural schools")
        );

        let blank = PresentationInput::from_path("b", "deck.pdf").with_problem_statement("   ");
        assert_eq!(blank.problem_statement, None);
    }

    #[tokio::test]
    async fn test_ingest_from_bytes() {
        let input = PresentationInput::from_bytes("t", "deck.pptx", b"PK\x03\x04".to_vec());
        let presentation = Presentation::ingest(&input).await.expect("ingest");

        assert_eq!(presentation.source_name(), "deck.pptx");
        assert_eq!(
            PresentationRef::from(&presentation).fingerprint,
            Some(presentation.fingerprint())
        );
        assert_eq!(PresentationRef::from(&input).fingerprint, None);
    }
}
