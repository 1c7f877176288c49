//! Presentation content extraction.
//!
//! [`DocumentExtractor`] reads the native text layer of PDF and PPTX files and falls back
//! to OCR per slide when that layer is too thin. OCR and page rendering are external
//! collaborators ([`OcrEngine`], [`SlideRasterizer`]); their failures degrade single slides
//! and never the whole file.

pub mod error;
pub mod extractor;
#[cfg(any(test, feature = "mock"))]
pub mod fixtures;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod ocr;
pub mod pdf;
pub mod pptx;
pub mod render;
pub mod structure;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::{ExtractionError, OcrError};
pub use extractor::{ContentExtractor, DocumentExtractor, non_whitespace_chars};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockExtractor, MockOcrEngine, MockRasterizer};
pub use ocr::{OcrEngine, TesseractOcr};
pub use render::{PdftoppmRasterizer, SlideRasterizer};
pub use structure::StructureMetrics;
pub use types::{DocumentFormat, ExtractedContent, ExtractionMethod, ExtractionSummary, SlideText};
