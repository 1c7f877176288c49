use std::sync::Arc;

use super::fixtures::{FixtureSlide, build_pdf, build_pptx, fake_png};
use super::*;
use crate::presentation::Presentation;

const LONG_TEXT_A: &str = "Our team built a solar-powered water purifier";
const LONG_TEXT_B: &str = "Pilot deployment reached three villages in March";

fn presentation(name: &str, bytes: Vec<u8>) -> Presentation {
    Presentation::from_parts("team".to_string(), name.to_string(), bytes.into())
}

#[test]
fn test_detect_format() {
    assert_eq!(DocumentFormat::detect("deck.PDF", b""), Some(DocumentFormat::Pdf));
    assert_eq!(DocumentFormat::detect("deck.pptx", b""), Some(DocumentFormat::Pptx));
    assert_eq!(DocumentFormat::detect("download", b"%PDF-1.7"), Some(DocumentFormat::Pdf));
    assert_eq!(DocumentFormat::detect("download", b"PK\x03\x04"), Some(DocumentFormat::Pptx));
    assert_eq!(DocumentFormat::detect("notes.txt", b"hello"), None);
}

#[test]
fn test_prompt_text_marks_empty_slides_and_truncates() {
    let content = ExtractedContent::new(
        DocumentFormat::Pptx,
        vec![
            SlideText::new(0, "Intro", ExtractionMethod::NativeText),
            SlideText::empty(1, ExtractionMethod::OcrFailed),
            SlideText::new(2, "Chart: revenue", ExtractionMethod::Ocr),
        ],
    );

    let full = content.to_prompt_text(10_000);
    assert!(full.starts_with("--- SLIDE 1 ---\nIntro\n"));
    assert!(full.contains("--- SLIDE 2 ---\n(no readable text)\n"));
    assert!(full.contains("--- SLIDE 3 ---\nIMAGE OCR:\nChart: revenue\n"));

    let short = content.to_prompt_text(10);
    assert!(short.ends_with("[truncated]"));
    assert!(short.starts_with("--- SLIDE "));
}

#[test]
fn test_summary_counts_methods() {
    let content = ExtractedContent::new(
        DocumentFormat::Pdf,
        vec![
            SlideText::new(0, "a", ExtractionMethod::NativeText),
            SlideText::new(1, "b", ExtractionMethod::Ocr),
            SlideText::empty(2, ExtractionMethod::Empty),
            SlideText::empty(3, ExtractionMethod::OcrFailed),
        ],
    );

    let summary = content.summary();
    assert_eq!(summary.slides, 4);
    assert_eq!(summary.native_text, 1);
    assert_eq!(summary.ocr, 1);
    assert_eq!(summary.empty, 1);
    assert_eq!(summary.ocr_failed, 1);
    assert!(!content.is_blank());
}

#[tokio::test]
async fn test_pptx_slides_follow_manifest_order() {
    let bytes = build_pptx(
        &[
            FixtureSlide::text(&[LONG_TEXT_A]),
            FixtureSlide::text(&[LONG_TEXT_B]),
        ],
        true,
    );

    let content = DocumentExtractor::new()
        .extract(&presentation("deck.pptx", bytes))
        .await
        .unwrap();

    assert_eq!(content.format, DocumentFormat::Pptx);
    assert_eq!(content.slide_count(), 2);
    assert_eq!(content.slides[0].text, LONG_TEXT_B);
    assert_eq!(content.slides[1].text, LONG_TEXT_A);
    assert_eq!(content.slides[0].index, 0);
    assert!(
        content
            .slides
            .iter()
            .all(|s| s.method == ExtractionMethod::NativeText)
    );
}

#[tokio::test]
async fn test_image_only_slide_falls_back_to_ocr() {
    let ocr = Arc::new(MockOcrEngine::returning("Market size: 4 billion users"));
    let bytes = build_pptx(
        &[
            FixtureSlide::text(&[LONG_TEXT_A]),
            FixtureSlide::image(fake_png(2048)).with_image(fake_png(8192)),
        ],
        false,
    );

    let content = DocumentExtractor::new()
        .with_ocr(ocr.clone())
        .extract(&presentation("deck.pptx", bytes))
        .await
        .unwrap();

    assert_eq!(ocr.calls(), 1);
    assert_eq!(content.slides[0].method, ExtractionMethod::NativeText);
    assert_eq!(content.slides[1].method, ExtractionMethod::Ocr);
    assert_eq!(content.slides[1].text, "Market size: 4 billion users");
}

#[tokio::test]
async fn test_icon_sized_images_are_not_ocr_candidates() {
    let ocr = Arc::new(MockOcrEngine::returning("logo"));
    let bytes = build_pptx(&[FixtureSlide::image(fake_png(200))], false);

    let content = DocumentExtractor::new()
        .with_ocr(ocr.clone())
        .extract(&presentation("deck.pptx", bytes))
        .await
        .unwrap();

    assert_eq!(ocr.calls(), 0);
    assert_eq!(content.slides[0].method, ExtractionMethod::Empty);
}

#[tokio::test]
async fn test_ocr_failure_degrades_single_slide() {
    let ocr = Arc::new(MockOcrEngine::unavailable());
    let bytes = build_pptx(
        &[
            FixtureSlide::text(&[LONG_TEXT_A]),
            FixtureSlide::image(fake_png(4096)),
            FixtureSlide::text(&[LONG_TEXT_B]),
        ],
        false,
    );

    let content = DocumentExtractor::new()
        .with_ocr(ocr)
        .extract(&presentation("deck.pptx", bytes))
        .await
        .unwrap();

    assert_eq!(content.slide_count(), 3);
    assert_eq!(content.slides[1].method, ExtractionMethod::OcrFailed);
    assert!(content.slides[1].text.is_empty());
    assert_eq!(content.slides[2].text, LONG_TEXT_B);
}

#[tokio::test]
async fn test_ocr_error_counted_when_native_text_kept() {
    let ocr = Arc::new(MockOcrEngine::unavailable());
    let bytes = build_pptx(
        &[
            FixtureSlide::text(&["Team Hydra"]).with_image(fake_png(4096)),
            FixtureSlide::image(fake_png(4096)),
            FixtureSlide::text(&[LONG_TEXT_A]),
        ],
        false,
    );

    let content = DocumentExtractor::new()
        .with_ocr(ocr)
        .extract(&presentation("deck.pptx", bytes))
        .await
        .unwrap();

    assert_eq!(content.slides[0].method, ExtractionMethod::NativeText);
    assert_eq!(content.slides[0].text, "Team Hydra");
    assert!(content.slides[0].ocr_error);
    assert!(!content.slides[2].ocr_error);

    let summary = content.summary();
    assert_eq!(summary.native_text, 2);
    assert_eq!(summary.ocr_failed, 1);
    assert_eq!(summary.ocr_errors, 2);
}

#[tokio::test]
async fn test_short_native_text_kept_when_ocr_adds_nothing() {
    let ocr = Arc::new(MockOcrEngine::returning("Q&A"));
    let bytes = build_pptx(
        &[FixtureSlide::text(&["Thanks! Questions?"]).with_image(fake_png(4096))],
        false,
    );

    let content = DocumentExtractor::new()
        .with_ocr(ocr.clone())
        .extract(&presentation("deck.pptx", bytes))
        .await
        .unwrap();

    assert_eq!(ocr.calls(), 1);
    assert_eq!(content.slides[0].method, ExtractionMethod::NativeText);
    assert_eq!(content.slides[0].text, "Thanks! Questions?");
}

#[tokio::test]
async fn test_without_ocr_engine_blank_slides_are_empty() {
    let bytes = build_pptx(&[FixtureSlide::image(fake_png(4096))], false);

    let content = DocumentExtractor::new()
        .extract(&presentation("deck.pptx", bytes))
        .await
        .unwrap();

    assert_eq!(content.slides[0].method, ExtractionMethod::Empty);
    assert!(content.is_blank());
}

#[tokio::test]
async fn test_pdf_pages_with_rendered_ocr_fallback() {
    let ocr = Arc::new(MockOcrEngine::returning("Scanned architecture diagram labels"));
    let rasterizer = Arc::new(MockRasterizer::new());
    let bytes = build_pdf(&["Innovation in renewable energy storage", ""]);

    let content = DocumentExtractor::new()
        .with_ocr(ocr.clone())
        .with_rasterizer(rasterizer.clone())
        .extract(&presentation("final.pdf", bytes))
        .await
        .unwrap();

    assert_eq!(content.format, DocumentFormat::Pdf);
    assert_eq!(content.slide_count(), 2);
    assert_eq!(content.slides[0].method, ExtractionMethod::NativeText);
    assert!(content.slides[0].text.contains("renewable"));
    assert_eq!(content.slides[1].method, ExtractionMethod::Ocr);
    assert_eq!(rasterizer.calls(), 1);
    assert_eq!(ocr.calls(), 1);
}

#[tokio::test]
async fn test_unsupported_format() {
    let err = DocumentExtractor::new()
        .extract(&presentation("notes.txt", b"plain text".to_vec()))
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractionError::UnsupportedFormat { .. }));
}

#[tokio::test]
async fn test_corrupt_pdf_fails_whole_file() {
    let err = DocumentExtractor::new()
        .extract(&presentation("deck.pdf", b"%PDF-1.4 truncated".to_vec()))
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractionError::Corrupt { .. }));
}

#[tokio::test]
async fn test_pptx_without_slides_is_rejected() {
    let bytes = build_pptx(&[], false);

    let err = DocumentExtractor::new()
        .extract(&presentation("empty.pptx", bytes))
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractionError::NoSlides));
}

#[tokio::test]
async fn test_mock_extractor_splits_slides() {
    let extractor = MockExtractor::new();
    let content = extractor
        .extract(&presentation("a.pdf", b"one\n---\n\n---\nthree".to_vec()))
        .await
        .unwrap();

    assert_eq!(content.slide_count(), 3);
    assert_eq!(content.slides[1].method, ExtractionMethod::Empty);
    assert_eq!(extractor.calls(), 1);
}

#[test]
fn test_structure_metrics_for_short_deck() {
    let content = ExtractedContent::new(
        DocumentFormat::Pdf,
        vec![
            SlideText::new(0, "The Problem: farmers lose crops", ExtractionMethod::NativeText),
            SlideText::new(1, "Our SOLUTION uses drones", ExtractionMethod::NativeText),
            SlideText::new(2, "Tech stack and workflow", ExtractionMethod::Ocr),
            SlideText::empty(3, ExtractionMethod::Empty),
        ],
    );

    let structure = content.summary().structure;
    assert_eq!(structure.words, 13);
    assert_eq!(structure.avg_words_per_slide, 3);
    assert_eq!(structure.sections, vec!["problem", "solution", "architecture"]);
    assert!(!structure.slide_count_in_range);
    assert!(!structure.format_compliant);
}

#[test]
fn test_structure_metrics_for_compliant_deck() {
    let slides: Vec<SlideText> = [
        "Background and pain point",
        "How it works",
        "Demo video",
        "Roadmap",
        "Market impact",
        "Team",
        "Pricing",
        "Summary",
    ]
    .iter()
    .enumerate()
    .map(|(i, text)| SlideText::new(i, *text, ExtractionMethod::NativeText))
    .collect();

    let structure = StructureMetrics::measure(&slides);

    assert!(structure.slide_count_in_range);
    assert!(structure.format_compliant);
    assert_eq!(
        structure.sections,
        vec!["problem", "solution", "result", "future", "conclusion", "impact", "demo"]
    );
}
