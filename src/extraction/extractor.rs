use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::error::{ExtractionError, OcrError};
use super::ocr::OcrEngine;
use super::render::SlideRasterizer;
use super::types::{DocumentFormat, ExtractedContent, ExtractionMethod, SlideText};
use super::{pdf, pptx};
use crate::config::PipelineConfig;
use crate::constants::{DEFAULT_MIN_TEXT_CHARS, MIN_OCR_IMAGE_BYTES};
use crate::presentation::Presentation;

#[async_trait]
/// Converts one presentation into ordered per-slide text.
pub trait ContentExtractor: Send + Sync {
    /// Fails only for whole-file problems; per-slide OCR trouble is reported in
    /// [`SlideText::method`].
    async fn extract(
        &self,
        presentation: &Presentation,
    ) -> Result<ExtractedContent, ExtractionError>;
}

/// Counts characters that carry content.
pub fn non_whitespace_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Where OCR input for a slide comes from, if the native text is too thin.
#[derive(Debug)]
enum OcrSource {
    None,
    Image(Vec<u8>),
    PdfPage(u32),
}

#[derive(Debug)]
struct RawSlide {
    text: String,
    ocr_source: OcrSource,
}

/// PDF/PPTX extractor with per-slide OCR fallback.
///
/// Parsing runs on the blocking pool. OCR is optional: without an engine, thin slides keep
/// whatever native text they have or become [`ExtractionMethod::Empty`].
pub struct DocumentExtractor {
    ocr: Option<Arc<dyn OcrEngine>>,
    rasterizer: Option<Arc<dyn SlideRasterizer>>,
    min_text_chars: usize,
    min_image_bytes: usize,
}

impl DocumentExtractor {
    /// Native text only.
    pub fn new() -> Self {
        Self {
            ocr: None,
            rasterizer: None,
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
            min_image_bytes: MIN_OCR_IMAGE_BYTES,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new().with_min_text_chars(config.min_text_chars)
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn SlideRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn with_min_text_chars(mut self, min_text_chars: usize) -> Self {
        self.min_text_chars = min_text_chars;
        self
    }

    pub fn with_min_image_bytes(mut self, min_image_bytes: usize) -> Self {
        self.min_image_bytes = min_image_bytes;
        self
    }

    async fn parse(
        &self,
        format: DocumentFormat,
        presentation: &Presentation,
    ) -> Result<Vec<RawSlide>, ExtractionError> {
        let bytes = presentation.shared_bytes();
        let min_image_bytes = self.min_image_bytes;

        tokio::task::spawn_blocking(move || match format {
            DocumentFormat::Pdf => pdf::read_pages(&bytes).map(|pages| {
                pages
                    .into_iter()
                    .map(|page| RawSlide {
                        text: page.text,
                        ocr_source: OcrSource::PdfPage(page.number),
                    })
                    .collect::<Vec<_>>()
            }),
            DocumentFormat::Pptx => pptx::read_slides(&bytes, min_image_bytes).map(|slides| {
                slides
                    .into_iter()
                    .map(|slide| RawSlide {
                        text: slide.text,
                        ocr_source: slide.image.map_or(OcrSource::None, OcrSource::Image),
                    })
                    .collect()
            }),
        })
        .await
        .map_err(|e| ExtractionError::TaskFailed {
            reason: e.to_string(),
        })?
    }

    async fn ocr_slide(
        &self,
        ocr: &dyn OcrEngine,
        presentation: &Presentation,
        source: OcrSource,
    ) -> Option<Result<String, OcrError>> {
        let image = match source {
            OcrSource::None => return None,
            OcrSource::Image(bytes) => bytes,
            OcrSource::PdfPage(number) => {
                let rasterizer = self.rasterizer.as_ref()?;
                match rasterizer
                    .render_pdf_page(presentation.bytes(), number)
                    .await
                {
                    Ok(png) => png,
                    Err(e) => return Some(Err(e)),
                }
            }
        };
        Some(ocr.recognize(&image).await)
    }

    async fn resolve_slide(
        &self,
        presentation: &Presentation,
        index: usize,
        raw: RawSlide,
    ) -> SlideText {
        let native = raw.text;
        let native_chars = non_whitespace_chars(&native);

        if native_chars >= self.min_text_chars {
            return SlideText::new(index, native, ExtractionMethod::NativeText);
        }

        let fallback = |native: String| {
            if native_chars > 0 {
                SlideText::new(index, native, ExtractionMethod::NativeText)
            } else {
                SlideText::empty(index, ExtractionMethod::Empty)
            }
        };

        let Some(ocr) = self.ocr.as_deref() else {
            return fallback(native);
        };

        match self.ocr_slide(ocr, presentation, raw.ocr_source).await {
            None => fallback(native),
            Some(Ok(recognized)) if non_whitespace_chars(&recognized) > native_chars => {
                debug!(slide = index, chars = recognized.len(), "slide text from OCR");
                SlideText::new(index, recognized, ExtractionMethod::Ocr)
            }
            Some(Ok(_)) => fallback(native),
            Some(Err(e)) => {
                warn!(
                    presentation_id = %presentation.id(),
                    slide = index,
                    error = %e,
                    "OCR failed for slide"
                );
                if native_chars > 0 {
                    SlideText::new(index, native, ExtractionMethod::NativeText).with_ocr_error()
                } else {
                    SlideText::empty(index, ExtractionMethod::OcrFailed).with_ocr_error()
                }
            }
        }
    }
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for DocumentExtractor {
    #[instrument(skip(self, presentation), fields(presentation_id = %presentation.id(), fingerprint = %presentation.fingerprint().short()))]
    async fn extract(
        &self,
        presentation: &Presentation,
    ) -> Result<ExtractedContent, ExtractionError> {
        let format = DocumentFormat::detect(presentation.source_name(), presentation.bytes())
            .ok_or_else(|| ExtractionError::UnsupportedFormat {
                name: presentation.source_name().to_string(),
            })?;

        let raw_slides = self.parse(format, presentation).await?;

        let mut slides = Vec::with_capacity(raw_slides.len());
        for (index, raw) in raw_slides.into_iter().enumerate() {
            slides.push(self.resolve_slide(presentation, index, raw).await);
        }

        let content = ExtractedContent::new(format, slides);
        let summary = content.summary();
        debug!(
            %format,
            slides = summary.slides,
            ocr = summary.ocr,
            ocr_failed = summary.ocr_failed,
            ocr_errors = summary.ocr_errors,
            sections = summary.structure.sections.len(),
            "extraction finished"
        );
        Ok(content)
    }
}
