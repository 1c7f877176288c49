use super::*;

fn innovation_execution() -> Rubric {
    Rubric::new(
        "v1",
        vec![
            RubricCriterion::new("Innovation", 0.6, "Novelty of the idea"),
            RubricCriterion::new("Execution", 0.4, "Quality of the demo"),
        ],
    )
    .unwrap()
}

#[test]
fn test_weighted_total() {
    let rubric = innovation_execution();
    let scores = BTreeMap::from([
        ("Innovation".to_string(), 8.0),
        ("Execution".to_string(), 6.0),
    ]);

    let total = rubric.weighted_total(&scores).unwrap();
    assert!((total - 7.2).abs() < 1e-9);
    assert!((rubric.max_total() - 10.0).abs() < 1e-9);
}

#[test]
fn test_weighted_total_missing_criterion() {
    let rubric = innovation_execution();
    let scores = BTreeMap::from([("Innovation".to_string(), 8.0)]);

    assert_eq!(rubric.weighted_total(&scores), None);
}

#[test]
fn test_weights_need_not_sum_to_one() {
    let rubric = Rubric::new(
        "v2",
        vec![
            RubricCriterion::new("Impact", 3.0, ""),
            RubricCriterion::new("Design", 0.0, ""),
        ],
    )
    .unwrap();

    assert!((rubric.max_total() - 30.0).abs() < 1e-9);
}

#[test]
fn test_negative_weight_rejected() {
    let err = Rubric::new("v1", vec![RubricCriterion::new("Impact", -1.0, "")]).unwrap_err();
    assert!(matches!(err, RubricError::InvalidWeight { .. }));
}

#[test]
fn test_duplicate_criterion_rejected() {
    let err = Rubric::new(
        "v1",
        vec![
            RubricCriterion::new("Impact", 1.0, ""),
            RubricCriterion::new(" Impact ", 1.0, ""),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, RubricError::DuplicateCriterion { .. }));
}

#[test]
fn test_empty_rubric_rejected() {
    assert!(matches!(
        Rubric::new("v1", Vec::new()).unwrap_err(),
        RubricError::NoCriteria
    ));
}

#[test]
fn test_invalid_range_rejected() {
    let err = innovation_execution()
        .with_score_range(ScoreRange::new(5.0, 5.0))
        .unwrap_err();
    assert!(matches!(err, RubricError::InvalidRange { .. }));
}

#[test]
fn test_clamp() {
    let range = ScoreRange::default();
    assert_eq!(range.clamp(11.0), (10.0, true));
    assert_eq!(range.clamp(-2.0), (0.0, true));
    assert_eq!(range.clamp(7.5), (7.5, false));
}

#[test]
fn test_json_with_explicit_version() {
    let rubric = Rubric::from_json_str(
        r#"{"version":"2024-spring","criteria":[{"name":"Innovation","weight":0.6},{"name":"Execution","weight":0.4,"instructions":"Does it work?"}]}"#,
    )
    .unwrap();

    assert_eq!(rubric.version, "2024-spring");
    assert_eq!(rubric.score_range, ScoreRange::default());
    assert_eq!(rubric.criterion("Execution").unwrap().instructions, "Does it work?");
}

#[test]
fn test_json_without_version_derives_one_from_criteria() {
    let a = Rubric::from_json_str(r#"{"criteria":[{"name":"Impact","weight":1.0}]}"#).unwrap();
    let b = Rubric::from_json_str(r#"{"criteria":[{"name":"Impact","weight":1.0}]}"#).unwrap();
    let c = Rubric::from_json_str(r#"{"criteria":[{"name":"Impact","weight":2.0}]}"#).unwrap();

    assert!(a.version.starts_with("auto-"));
    assert_eq!(a.version, b.version);
    assert_ne!(a.version, c.version);
}

#[test]
fn test_load_missing_file() {
    let err = Rubric::load(Path::new("/no/such/rubric.json")).unwrap_err();
    assert!(matches!(err, RubricError::Io { .. }));
}

#[test]
fn test_default_categories_follow_percent_of_max() {
    let rubric = innovation_execution();

    assert_eq!(rubric.category_for(100.0), Some("Top-tier / Likely Winner"));
    assert_eq!(rubric.category_for(78.0), Some("Strong Contender"));
    assert_eq!(rubric.category_for(60.0), Some("Average / Needs Refinement"));
    assert_eq!(rubric.category_for(40.0), Some("Weak / Major Gaps"));
    assert_eq!(rubric.category_for(0.0), Some("Non-competitive"));
}

#[test]
fn test_custom_categories_from_json() {
    let rubric = Rubric::from_json_str(
        r#"{"criteria":[{"name":"Impact","weight":1.0}],"categories":[{"label":"Finalist","min_percent":70},{"label":"Honourable mention","min_percent":50}]}"#,
    )
    .unwrap();

    assert_eq!(rubric.category_for(70.0), Some("Finalist"));
    assert_eq!(rubric.category_for(55.5), Some("Honourable mention"));
    assert_eq!(rubric.category_for(49.9), None);

    let same_criteria =
        Rubric::from_json_str(r#"{"criteria":[{"name":"Impact","weight":1.0}]}"#).unwrap();
    assert_eq!(rubric.version, same_criteria.version);
}

#[test]
fn test_category_bound_out_of_range_rejected() {
    let err = innovation_execution()
        .with_categories(vec![ScoreCategory::new("Legendary", 120.0)])
        .unwrap_err();
    assert!(matches!(err, RubricError::InvalidCategory { .. }));
}
