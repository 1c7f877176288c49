//! Final ordering of scored presentations.
//!
//! [`RankAggregator::rank`] is a pure function of its inputs: totals descending, ties and
//! unscored entries ordered by the configured [`TieBreak`] key. Input order never matters.

pub mod types;

#[cfg(test)]
mod tests;

pub use types::{RankedEntry, Ranking, TieBreak};

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::presentation::PresentationRef;
use crate::rubric::Rubric;
use crate::scoring::ScoreResult;

/// Turns score results into a [`Ranking`] under one rubric.
#[derive(Debug, Clone)]
pub struct RankAggregator {
    rubric: Arc<Rubric>,
    tie_break: TieBreak,
}

struct Candidate {
    entry: RankedEntry,
    fingerprint: String,
}

impl RankAggregator {
    pub fn new(rubric: Arc<Rubric>) -> Self {
        Self {
            rubric,
            tie_break: TieBreak::default(),
        }
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Weighted total for a usable result; `None` for failed results and for results
    /// missing a criterion of this rubric.
    pub fn total(&self, result: &ScoreResult) -> Option<f64> {
        if !result.is_scored() {
            return None;
        }
        // Normalizes -0.0 so it sorts equal to 0.0.
        self.rubric.weighted_total(&result.scores).map(|t| t + 0.0)
    }

    pub fn rank<'a, I>(&self, results: I) -> Ranking
    where
        I: IntoIterator<Item = (&'a PresentationRef, &'a ScoreResult)>,
    {
        let max_total = self.rubric.max_total();

        let mut candidates: Vec<Candidate> = results
            .into_iter()
            .map(|(presentation, result)| {
                let total = self.total(result);
                let percent_of_max = total
                    .filter(|_| max_total > 0.0)
                    .map(|t| (t / max_total * 100.0).clamp(0.0, 100.0));
                Candidate {
                    entry: RankedEntry {
                        rank: 0,
                        presentation_id: presentation.id.clone(),
                        total,
                        percent_of_max,
                        category: percent_of_max
                            .and_then(|p| self.rubric.category_for(p))
                            .map(str::to_string),
                        status: result.status,
                        failure: result.failure.clone(),
                        tie_break_key: self
                            .tie_break
                            .key(&presentation.id, presentation.fingerprint.as_ref()),
                    },
                    fingerprint: presentation
                        .fingerprint
                        .map(|fp| fp.to_hex())
                        .unwrap_or_default(),
                }
            })
            .collect();

        candidates.sort_by(compare);

        let entries: Vec<RankedEntry> = candidates
            .into_iter()
            .enumerate()
            .map(|(i, mut candidate)| {
                candidate.entry.rank = i + 1;
                candidate.entry
            })
            .collect();

        debug!(
            entries = entries.len(),
            tie_break = %self.tie_break,
            "ranking computed"
        );

        Ranking {
            rubric_version: self.rubric.version.clone(),
            tie_break: self.tie_break,
            entries,
        }
    }
}

/// Scored before unscored, totals descending, then the tie-break key. Id and
/// fingerprint settle any remaining tie so the order is total.
fn compare(a: &Candidate, b: &Candidate) -> Ordering {
    let by_total = match (a.entry.total, b.entry.total) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    by_total
        .then_with(|| a.entry.tie_break_key.cmp(&b.entry.tie_break_key))
        .then_with(|| a.entry.presentation_id.cmp(&b.entry.presentation_id))
        .then_with(|| a.fingerprint.cmp(&b.fingerprint))
}
