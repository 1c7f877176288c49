//! Deck structure metrics: slide count against the ideal range, words per slide and which
//! pitch sections the text covers.

use serde::{Deserialize, Serialize};

use super::types::SlideText;

/// Slide counts inside this range are considered well-sized.
pub const IDEAL_SLIDE_RANGE: (usize, usize) = (8, 20);

/// Decks with fewer slides or fewer sections are not format compliant.
pub const MIN_COMPLIANT_SLIDES: usize = 5;
pub const MIN_COMPLIANT_SECTIONS: usize = 2;

/// Pitch sections and the phrases that signal them, matched case-insensitively.
pub const SECTION_KEYWORDS: &[(&str, &[&str])] = &[
    ("problem", &["problem", "challenge", "background", "pain point", "context"]),
    ("solution", &["solution", "approach", "how it works", "implementation", "concept"]),
    ("architecture", &["architecture", "tech stack", "backend", "frontend", "diagram", "workflow"]),
    ("result", &["result", "outcome", "demo", "output", "testing", "validation"]),
    ("future", &["future", "roadmap", "next steps", "scalability"]),
    ("conclusion", &["conclusion", "summary", "closing"]),
    ("impact", &["impact", "value", "business", "market", "social"]),
    ("demo", &["demo", "prototype", "video", "screenshot"]),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureMetrics {
    pub words: usize,
    /// Rounded mean over all slides, blank ones included.
    pub avg_words_per_slide: usize,
    pub slide_count_in_range: bool,
    /// Covered sections in [`SECTION_KEYWORDS`] order.
    pub sections: Vec<String>,
    pub format_compliant: bool,
}

impl StructureMetrics {
    pub fn measure(slides: &[SlideText]) -> Self {
        let lowered: Vec<String> = slides.iter().map(|s| s.text.to_lowercase()).collect();
        let words: usize = slides.iter().map(|s| s.text.split_whitespace().count()).sum();
        let count = slides.len();

        let sections: Vec<String> = SECTION_KEYWORDS
            .iter()
            .filter(|(_, aliases)| {
                lowered
                    .iter()
                    .any(|text| aliases.iter().any(|alias| text.contains(alias)))
            })
            .map(|(name, _)| (*name).to_string())
            .collect();

        let avg_words_per_slide = if count == 0 {
            0
        } else {
            (words as f64 / count as f64).round() as usize
        };

        Self {
            words,
            avg_words_per_slide,
            slide_count_in_range: (IDEAL_SLIDE_RANGE.0..=IDEAL_SLIDE_RANGE.1).contains(&count),
            format_compliant: count >= MIN_COMPLIANT_SLIDES
                && sections.len() >= MIN_COMPLIANT_SECTIONS,
            sections,
        }
    }
}
