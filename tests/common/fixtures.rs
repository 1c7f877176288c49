//! Shared fixtures: on-disk decks, rubrics and a pipeline wired to mocks.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pitchrank::cache::{ExtractionCache, ScoringCache};
use pitchrank::config::PipelineConfig;
use pitchrank::extraction::fixtures::{FixtureSlide, build_pdf, build_pptx, fake_png};
use pitchrank::extraction::{DocumentExtractor, MockOcrEngine, MockRasterizer};
use pitchrank::orchestrator::ScoringOrchestrator;
use pitchrank::rubric::{Rubric, RubricCriterion};
use pitchrank::scoring::{ClientSettings, MockScoringModel, ScoringClient};
use tempfile::TempDir;

pub const WATER_PITCH: &str = "Our team built a solar-powered water purifier for rural clinics";
pub const DRONE_PITCH: &str = "Crop monitoring drones cut pesticide use by forty percent";
pub const OCR_TEXT: &str = "Revenue grew 3x quarter over quarter after launch";

/// Temp directory holding deck files and the cache directory.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    pub fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, bytes).expect("write deck");
        path
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    pub fn config(&self, batch_size: usize) -> PipelineConfig {
        PipelineConfig {
            batch_size,
            enable_cache: true,
            cache_dir: self.cache_dir(),
            max_attempts: 2,
            initial_backoff: Duration::from_millis(1),
            ..PipelineConfig::default()
        }
    }
}

pub fn pdf_deck(pages: &[&str]) -> Vec<u8> {
    build_pdf(pages)
}

pub fn pptx_deck(paragraphs: &[&str]) -> Vec<u8> {
    build_pptx(&[FixtureSlide::text(paragraphs)], false)
}

/// One text slide followed by one image-only slide.
pub fn pptx_with_chart(paragraph: &str) -> Vec<u8> {
    build_pptx(
        &[
            FixtureSlide::text(&[paragraph]),
            FixtureSlide::image(fake_png(8 * 1024)),
        ],
        false,
    )
}

pub fn rubric(version: &str) -> Arc<Rubric> {
    Arc::new(
        Rubric::new(
            version,
            vec![
                RubricCriterion::new("Innovation", 0.6, "How novel is the idea?"),
                RubricCriterion::new("Execution", 0.4, "How complete is the prototype?"),
            ],
        )
        .expect("valid rubric"),
    )
}

pub fn model(table: &[(&str, f64, f64)]) -> MockScoringModel {
    MockScoringModel::with_scores(table.iter().map(|(id, innovation, execution)| {
        (
            id.to_string(),
            vec![
                ("Innovation".to_string(), *innovation),
                ("Execution".to_string(), *execution),
            ],
        )
    }))
}

/// Real document extractor with mock OCR and rasterizer.
pub fn extractor(ocr: &MockOcrEngine) -> DocumentExtractor {
    DocumentExtractor::new()
        .with_ocr(Arc::new(ocr.clone()))
        .with_rasterizer(Arc::new(MockRasterizer::new()))
}

/// Orchestrator over persistent caches in `config.cache_dir`.
pub fn pipeline(
    config: &PipelineConfig,
    ocr: &MockOcrEngine,
    model: &MockScoringModel,
) -> ScoringOrchestrator {
    let client = ScoringClient::new(
        Arc::new(model.clone()),
        ClientSettings {
            batch_window: Duration::from_millis(5),
            ..ClientSettings::from_config(config)
        },
    );
    ScoringOrchestrator::new(
        Arc::new(extractor(ocr)),
        Arc::new(ExtractionCache::from_config(config).expect("extraction cache")),
        Arc::new(ScoringCache::from_config(config).expect("scoring cache")),
        client,
        config.batch_size,
    )
}
