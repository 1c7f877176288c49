use std::collections::BTreeMap;
use std::sync::Arc;

use super::*;
use crate::hashing::Fingerprint;
use crate::presentation::PresentationRef;
use crate::rubric::{Rubric, RubricCriterion};
use crate::scoring::{FailureKind, FailureReason, ScoreResult, ScoreStatus};

fn rubric() -> Arc<Rubric> {
    Arc::new(
        Rubric::new(
            "v1",
            vec![
                RubricCriterion::new("Innovation", 0.6, ""),
                RubricCriterion::new("Execution", 0.4, ""),
            ],
        )
        .unwrap(),
    )
}

fn presentation(id: &str) -> PresentationRef {
    PresentationRef {
        id: id.to_string(),
        source_name: format!("{id}.pdf"),
        fingerprint: Some(Fingerprint::of_bytes(id.as_bytes())),
        problem_statement: None,
    }
}

fn scored(innovation: f64, execution: f64) -> ScoreResult {
    let scores = BTreeMap::from([
        ("Innovation".to_string(), innovation),
        ("Execution".to_string(), execution),
    ]);
    ScoreResult::scored("v1", scores, None, Vec::new(), 1)
}

fn failed(kind: FailureKind) -> ScoreResult {
    ScoreResult::failed("v1", FailureReason::new(kind), 0)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_weighted_totals_and_failed_last() {
    let (a, b, c) = (presentation("A"), presentation("B"), presentation("C"));
    let results = [
        (a.clone(), scored(8.0, 6.0)),
        (b.clone(), scored(7.0, 9.0)),
        (c.clone(), failed(FailureKind::ExtractionError)),
    ];

    let ranking = RankAggregator::new(rubric()).rank(results.iter().map(|(p, r)| (p, r)));

    assert_eq!(ranking.ids().collect::<Vec<_>>(), vec!["B", "A", "C"]);
    assert!(approx(ranking.entries[0].total.unwrap(), 7.8));
    assert!(approx(ranking.entries[1].total.unwrap(), 7.2));
    assert_eq!(ranking.entries[2].total, None);
    assert_eq!(ranking.entries[2].status, ScoreStatus::Failed);
    assert_eq!(
        ranking.entries[2].failure.as_ref().map(|f| f.kind),
        Some(FailureKind::ExtractionError)
    );
    assert_eq!(
        ranking.entries.iter().map(|e| e.rank).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(ranking.scored(), 2);
}

#[test]
fn test_ties_broken_by_id_regardless_of_input_order() {
    let ids = ["delta", "alpha", "charlie", "bravo"];
    let forward: Vec<_> = ids.iter().map(|id| (presentation(id), scored(5.0, 5.0))).collect();
    let mut backward = forward.clone();
    backward.reverse();

    let aggregator = RankAggregator::new(rubric());
    let first = aggregator.rank(forward.iter().map(|(p, r)| (p, r)));
    let second = aggregator.rank(backward.iter().map(|(p, r)| (p, r)));

    assert_eq!(first, second);
    assert_eq!(
        first.ids().collect::<Vec<_>>(),
        vec!["alpha", "bravo", "charlie", "delta"]
    );
}

#[test]
fn test_fingerprint_tie_break() {
    let items: Vec<_> = ["x", "y", "z"]
        .iter()
        .map(|id| (presentation(id), scored(6.0, 6.0)))
        .collect();

    let ranking = RankAggregator::new(rubric())
        .with_tie_break(TieBreak::Fingerprint)
        .rank(items.iter().map(|(p, r)| (p, r)));

    let keys: Vec<_> = ranking.entries.iter().map(|e| e.tie_break_key.clone()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(keys[0].len(), 64);
}

#[test]
fn test_unscored_entries_ordered_by_key() {
    let items = [
        (presentation("zulu"), failed(FailureKind::Timeout)),
        (presentation("mike"), scored(1.0, 1.0)),
        (presentation("alpha"), failed(FailureKind::Cancelled)),
    ];

    let ranking = RankAggregator::new(rubric()).rank(items.iter().map(|(p, r)| (p, r)));

    assert_eq!(ranking.ids().collect::<Vec<_>>(), vec!["mike", "alpha", "zulu"]);
}

#[test]
fn test_partial_results_are_ranked() {
    let mut partial = scored(10.0, 4.0);
    partial.status = ScoreStatus::Partial;
    partial.clamped = vec!["Innovation".to_string()];
    let items = [(presentation("p"), partial), (presentation("q"), scored(2.0, 2.0))];

    let ranking = RankAggregator::new(rubric()).rank(items.iter().map(|(p, r)| (p, r)));

    let top = &ranking.entries[0];
    assert_eq!(top.presentation_id, "p");
    assert_eq!(top.status, ScoreStatus::Partial);
    assert!(approx(top.total.unwrap(), 7.6));
    assert!(approx(top.percent_of_max.unwrap(), 76.0));
    assert_eq!(top.category.as_deref(), Some("Strong Contender"));
    assert_eq!(ranking.entries[1].category.as_deref(), Some("Non-competitive"));
}

#[test]
fn test_unscored_entries_have_no_category() {
    let items = [
        (presentation("ok"), scored(9.0, 9.0)),
        (presentation("bad"), failed(FailureKind::Timeout)),
    ];

    let ranking = RankAggregator::new(rubric()).rank(items.iter().map(|(p, r)| (p, r)));

    assert_eq!(ranking.entries[0].category.as_deref(), Some("Top-tier / Likely Winner"));
    assert_eq!(ranking.entries[1].category, None);
}

#[test]
fn test_result_missing_a_criterion_is_unscored() {
    let mut incomplete = scored(9.0, 9.0);
    incomplete.scores.remove("Execution");
    let items = [(presentation("a"), incomplete), (presentation("b"), scored(1.0, 1.0))];

    let ranking = RankAggregator::new(rubric()).rank(items.iter().map(|(p, r)| (p, r)));

    assert_eq!(ranking.ids().collect::<Vec<_>>(), vec!["b", "a"]);
    assert_eq!(ranking.position("a").unwrap().total, None);
}

#[test]
fn test_ranking_is_idempotent() {
    let items: Vec<_> = (0..20)
        .map(|i| {
            (
                presentation(&format!("team-{i:02}")),
                scored(f64::from(i % 7), f64::from(i % 3)),
            )
        })
        .collect();
    let aggregator = RankAggregator::new(rubric());

    let first = aggregator.rank(items.iter().map(|(p, r)| (p, r)));
    let second = aggregator.rank(items.iter().map(|(p, r)| (p, r)));

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(first.len(), 20);
}

#[test]
fn test_empty_input() {
    let empty = std::iter::empty::<(&PresentationRef, &ScoreResult)>();
    let ranking = RankAggregator::new(rubric()).rank(empty);
    assert!(ranking.is_empty());
    assert_eq!(ranking.rubric_version, "v1");
}
