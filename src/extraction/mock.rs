//! Mock extraction collaborators (scripted OCR, fake rasterizer, text-only extractor).

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::error::{ExtractionError, OcrError};
use super::extractor::ContentExtractor;
use super::fixtures::fake_png;
use super::ocr::OcrEngine;
use super::render::SlideRasterizer;
use super::types::{DocumentFormat, ExtractedContent, ExtractionMethod, SlideText};
use crate::presentation::Presentation;

#[derive(Debug, Clone)]
enum OcrBehavior {
    Text(String),
    Unavailable,
}

/// OCR engine returning a fixed string (or failing), counting calls.
#[derive(Debug, Clone)]
pub struct MockOcrEngine {
    behavior: OcrBehavior,
    calls: Arc<AtomicUsize>,
}

impl MockOcrEngine {
    pub fn returning(text: impl Into<String>) -> Self {
        Self {
            behavior: OcrBehavior::Text(text.into()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            behavior: OcrBehavior::Unavailable,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrEngine for MockOcrEngine {
    async fn recognize(&self, _image: &[u8]) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            OcrBehavior::Text(text) => Ok(text.clone()),
            OcrBehavior::Unavailable => Err(OcrError::Unavailable {
                tool: "mock-ocr".to_string(),
                reason: "not installed".to_string(),
            }),
        }
    }
}

/// Rasterizer that returns a fake PNG for every page.
#[derive(Debug, Clone, Default)]
pub struct MockRasterizer {
    calls: Arc<AtomicUsize>,
}

impl MockRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SlideRasterizer for MockRasterizer {
    async fn render_pdf_page(&self, _pdf: &[u8], _page: u32) -> Result<Vec<u8>, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(fake_png(4096))
    }
}

/// Extractor that treats the file bytes as UTF-8 slide text.
///
/// Slides are separated by `\n---\n`. Bytes starting with `CORRUPT` fail with
/// [`ExtractionError::Corrupt`]. Tracks calls and peak concurrency.
#[derive(Debug, Clone, Default)]
pub struct MockExtractor {
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl MockExtractor {
    pub const SLIDE_SEPARATOR: &'static str = "\n---\n";
    pub const CORRUPT_MARKER: &'static [u8] = b"CORRUPT";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentExtractor for MockExtractor {
    async fn extract(
        &self,
        presentation: &Presentation,
    ) -> Result<ExtractedContent, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = if presentation.bytes().starts_with(Self::CORRUPT_MARKER) {
            Err(ExtractionError::Corrupt {
                format: DocumentFormat::Pdf,
                reason: "mock corrupt file".to_string(),
            })
        } else {
            let text = String::from_utf8_lossy(presentation.bytes());
            let slides = text
                .split(Self::SLIDE_SEPARATOR)
                .enumerate()
                .map(|(index, slide)| {
                    if slide.trim().is_empty() {
                        SlideText::empty(index, ExtractionMethod::Empty)
                    } else {
                        SlideText::new(index, slide.trim(), ExtractionMethod::NativeText)
                    }
                })
                .collect();
            Ok(ExtractedContent::new(DocumentFormat::Pdf, slides))
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
