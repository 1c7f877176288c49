use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::structure::StructureMetrics;

/// Presentation container formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Pptx,
}

impl DocumentFormat {
    /// Detects the format from the file name, then from magic bytes.
    ///
    /// Downloaded files often lack an extension, so the byte check matters.
    pub fn detect(name: &str, bytes: &[u8]) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            return Some(Self::Pdf);
        }
        if lower.ends_with(".pptx") {
            return Some(Self::Pptx);
        }

        if bytes.starts_with(b"%PDF") {
            Some(Self::Pdf)
        } else if bytes.starts_with(b"PK") {
            Some(Self::Pptx)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Pptx => "pptx",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a slide's text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    /// Text layer of the document.
    NativeText,
    /// Optical character recognition of the rendered slide.
    Ocr,
    /// Nothing recoverable; the slide is kept as an explicit empty marker.
    Empty,
    /// Slide needed OCR and the OCR step failed.
    OcrFailed,
}

/// Text of one slide or page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideText {
    /// Zero-based position in the source file.
    pub index: usize,
    pub text: String,
    pub method: ExtractionMethod,
    /// OCR was attempted and errored, even if native text was kept.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ocr_error: bool,
}

impl SlideText {
    pub fn new(index: usize, text: impl Into<String>, method: ExtractionMethod) -> Self {
        Self {
            index,
            text: text.into(),
            method,
            ocr_error: false,
        }
    }

    pub fn with_ocr_error(mut self) -> Self {
        self.ocr_error = true;
        self
    }

    pub fn empty(index: usize, method: ExtractionMethod) -> Self {
        Self::new(index, String::new(), method)
    }
}

/// Ordered per-slide text of one presentation.
///
/// Slide count always equals the source's slide count; unreadable slides are present
/// as [`ExtractionMethod::Empty`] or [`ExtractionMethod::OcrFailed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub format: DocumentFormat,
    pub slides: Vec<SlideText>,
}

impl ExtractedContent {
    pub fn new(format: DocumentFormat, slides: Vec<SlideText>) -> Self {
        Self { format, slides }
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// `true` if no slide produced any text.
    pub fn is_blank(&self) -> bool {
        self.slides.iter().all(|s| s.text.trim().is_empty())
    }

    pub fn summary(&self) -> ExtractionSummary {
        let mut summary = ExtractionSummary {
            format: Some(self.format),
            slides: self.slides.len(),
            structure: StructureMetrics::measure(&self.slides),
            ..ExtractionSummary::default()
        };
        for slide in &self.slides {
            if slide.ocr_error {
                summary.ocr_errors += 1;
            }
            match slide.method {
                ExtractionMethod::NativeText => summary.native_text += 1,
                ExtractionMethod::Ocr => summary.ocr += 1,
                ExtractionMethod::Empty => summary.empty += 1,
                ExtractionMethod::OcrFailed => summary.ocr_failed += 1,
            }
        }
        summary
    }

    /// Renders slides as `--- SLIDE n ---` blocks, truncated to `max_chars` characters.
    pub fn to_prompt_text(&self, max_chars: usize) -> String {
        let mut out = String::new();
        for slide in &self.slides {
            let _ = writeln!(out, "--- SLIDE {} ---", slide.index + 1);
            match slide.method {
                ExtractionMethod::Empty | ExtractionMethod::OcrFailed => {
                    out.push_str("(no readable text)\n");
                }
                ExtractionMethod::Ocr => {
                    out.push_str("IMAGE OCR:\n");
                    out.push_str(slide.text.trim());
                    out.push('\n');
                }
                ExtractionMethod::NativeText => {
                    out.push_str(slide.text.trim());
                    out.push('\n');
                }
            }
        }

        if out.chars().count() > max_chars {
            out = out.chars().take(max_chars).collect();
            out.push_str("\n[truncated]");
        }
        out
    }
}

/// Per-method slide counts and deck structure for reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub format: Option<DocumentFormat>,
    pub slides: usize,
    pub native_text: usize,
    pub ocr: usize,
    pub empty: usize,
    pub ocr_failed: usize,
    /// Slides whose OCR call errored, whatever text they ended up with.
    pub ocr_errors: usize,
    pub structure: StructureMetrics,
}
