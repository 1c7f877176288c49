//! Tolerant parsing of model replies.
//!
//! Models wrap JSON in prose or code fences and leave trailing commas. Candidates are
//! tried in order: the whole reply, the first fenced block, the first balanced `{...}`
//! object; each also with trailing commas removed.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

use super::error::ParseError;
use crate::rubric::Rubric;

/// Scores for one submission, clamped into the rubric's range.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedScores {
    pub scores: BTreeMap<String, f64>,
    pub rationale: Option<String>,
    /// Criteria whose raw value was out of range.
    pub clamped: Vec<String>,
}

/// Finds the first JSON object or array in `text`.
pub fn extract_json(text: &str) -> Result<Value, ParseError> {
    let trimmed = text.trim();

    let mut candidates = vec![trimmed];
    if let Some(fenced) = fenced_block(trimmed) {
        candidates.push(fenced);
    }
    if let Some(object) = first_balanced_object(trimmed) {
        candidates.push(object);
    }

    for candidate in candidates {
        for attempt in [candidate.to_string(), strip_trailing_commas(candidate)] {
            if let Ok(value) = serde_json::from_str::<Value>(&attempt)
                && (value.is_object() || value.is_array())
            {
                return Ok(value);
            }
        }
    }
    Err(ParseError::NoJson)
}

/// Parses a batch reply into per-submission results.
///
/// The outer error means nothing usable came back. Submissions absent from the returned
/// map were not answered; ids that were not asked for are ignored.
pub fn parse_batch_reply(
    text: &str,
    rubric: &Rubric,
    expected_ids: &[String],
) -> Result<HashMap<String, Result<ParsedScores, ParseError>>, ParseError> {
    let value = extract_json(text)?;
    let single = match expected_ids {
        [only] => Some(only.as_str()),
        _ => None,
    };

    let items: Vec<&Value> = match &value {
        Value::Object(map) => match map.get("results") {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(_) => {
                return Err(ParseError::UnexpectedShape {
                    reason: "\"results\" is not an array".to_string(),
                });
            }
            None if single.is_some() => vec![&value],
            None => {
                return Err(ParseError::UnexpectedShape {
                    reason: "missing \"results\" array".to_string(),
                });
            }
        },
        Value::Array(items) => items.iter().collect(),
        _ => {
            return Err(ParseError::UnexpectedShape {
                reason: "expected an object or array".to_string(),
            });
        }
    };

    let mut parsed = HashMap::new();
    for item in items {
        let Value::Object(fields) = item else {
            continue;
        };
        let id = match fields.get("id") {
            Some(Value::String(id)) => id.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => match single {
                Some(only) => only.to_string(),
                None => continue,
            },
        };
        if !expected_ids.contains(&id) {
            continue;
        }
        parsed
            .entry(id)
            .or_insert_with(|| parse_item(fields, rubric));
    }
    Ok(parsed)
}

fn parse_item(fields: &Map<String, Value>, rubric: &Rubric) -> Result<ParsedScores, ParseError> {
    let score_fields = match fields.get("scores") {
        Some(Value::Object(scores)) => scores,
        _ => fields,
    };

    let mut scores = BTreeMap::new();
    let mut clamped = Vec::new();
    for criterion in &rubric.criteria {
        let raw = lookup(score_fields, &criterion.name).ok_or_else(|| {
            ParseError::MissingCriterion {
                criterion: criterion.name.clone(),
            }
        })?;
        let value = as_score(raw).ok_or_else(|| ParseError::NotANumber {
            criterion: criterion.name.clone(),
            value: raw.to_string(),
        })?;

        let (value, moved) = rubric.score_range.clamp(value);
        if moved {
            clamped.push(criterion.name.clone());
        }
        scores.insert(criterion.name.clone(), value);
    }

    let rationale = ["rationale", "justification", "reasoning"]
        .iter()
        .find_map(|key| fields.get(*key).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(ParsedScores {
        scores,
        rationale,
        clamped,
    })
}

fn lookup<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    fields.get(name).or_else(|| {
        fields
            .iter()
            .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

fn as_score(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches("/10").trim().parse().ok(),
        Value::Object(inner) => inner.get("score").and_then(as_score),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    // Skip an optional language tag such as `json`.
    let body_start = after_fence.find('\n').map_or(0, |i| i + 1);
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        if c == '"' {
            in_string = true;
        }
        if c == ',' {
            let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rubric::RubricCriterion;

    fn rubric() -> Rubric {
        Rubric::new(
            "v1",
            vec![
                RubricCriterion::new("Innovation", 0.6, ""),
                RubricCriterion::new("Execution", 0.4, ""),
            ],
        )
        .unwrap()
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plain_batch_reply() {
        let reply = r#"{"results":[
            {"id":"a","scores":{"Innovation":8,"Execution":6},"rationale":"Solid"},
            {"id":"b","scores":{"Innovation":7,"Execution":9}}
        ]}"#;

        let parsed = parse_batch_reply(reply, &rubric(), &ids(&["a", "b"])).unwrap();
        let a = parsed["a"].as_ref().unwrap();
        assert_eq!(a.scores["Innovation"], 8.0);
        assert_eq!(a.rationale.as_deref(), Some("Solid"));
        assert!(a.clamped.is_empty());
        assert_eq!(parsed["b"].as_ref().unwrap().scores["Execution"], 9.0);
    }

    #[test]
    fn test_fenced_reply_with_trailing_commas() {
        let reply = "Here you go:\n```json\n{\"results\": [{\"id\": \"a\", \"scores\": {\"Innovation\": 5, \"Execution\": 5,},},]}\n```\nGood luck!";

        let parsed = parse_batch_reply(reply, &rubric(), &ids(&["a"])).unwrap();
        assert!(parsed["a"].is_ok());
    }

    #[test]
    fn test_object_embedded_in_prose() {
        let reply = r#"Sure! {"id": "a", "scores": {"innovation": "7.5", "EXECUTION": {"score": 6}}} Hope this helps."#;

        let parsed = parse_batch_reply(reply, &rubric(), &ids(&["a"])).unwrap();
        let a = parsed["a"].as_ref().unwrap();
        assert_eq!(a.scores["Innovation"], 7.5);
        assert_eq!(a.scores["Execution"], 6.0);
    }

    #[test]
    fn test_single_submission_without_id() {
        let reply = r#"{"Innovation": 4, "Execution": 3, "justification": "Early prototype"}"#;

        let parsed = parse_batch_reply(reply, &rubric(), &ids(&["only"])).unwrap();
        let only = parsed["only"].as_ref().unwrap();
        assert_eq!(only.scores["Execution"], 3.0);
        assert_eq!(only.rationale.as_deref(), Some("Early prototype"));
    }

    #[test]
    fn test_out_of_range_scores_are_clamped() {
        let reply = r#"{"results":[{"id":"a","scores":{"Innovation":12,"Execution":-1}}]}"#;

        let parsed = parse_batch_reply(reply, &rubric(), &ids(&["a"])).unwrap();
        let a = parsed["a"].as_ref().unwrap();
        assert_eq!(a.scores["Innovation"], 10.0);
        assert_eq!(a.scores["Execution"], 0.0);
        assert_eq!(a.clamped, vec!["Innovation", "Execution"]);
    }

    #[test]
    fn test_missing_criterion_is_an_item_error() {
        let reply = r#"{"results":[{"id":"a","scores":{"Innovation":5}}]}"#;

        let parsed = parse_batch_reply(reply, &rubric(), &ids(&["a"])).unwrap();
        assert!(matches!(
            parsed["a"],
            Err(ParseError::MissingCriterion { .. })
        ));
    }

    #[test]
    fn test_non_numeric_score() {
        let reply = r#"{"results":[{"id":"a","scores":{"Innovation":"great","Execution":5}}]}"#;

        let parsed = parse_batch_reply(reply, &rubric(), &ids(&["a"])).unwrap();
        assert!(matches!(parsed["a"], Err(ParseError::NotANumber { .. })));
    }

    #[test]
    fn test_unanswered_and_unknown_ids() {
        let reply = r#"{"results":[{"id":"zzz","scores":{"Innovation":5,"Execution":5}},{"id":"a","scores":{"Innovation":5,"Execution":5}}]}"#;

        let parsed = parse_batch_reply(reply, &rubric(), &ids(&["a", "b"])).unwrap();
        assert!(parsed.contains_key("a"));
        assert!(!parsed.contains_key("b"));
        assert!(!parsed.contains_key("zzz"));
    }

    #[test]
    fn test_no_json_at_all() {
        assert_eq!(
            parse_batch_reply("I cannot score this.", &rubric(), &ids(&["a"])).unwrap_err(),
            ParseError::NoJson
        );
    }

    #[test]
    fn test_balanced_object_ignores_braces_in_strings() {
        let text = r#"noise {"a": "}{", "b": {"c": 1}} tail"#;
        assert_eq!(first_balanced_object(text), Some(r#"{"a": "}{", "b": {"c": 1}}"#));
    }

    #[test]
    fn test_strip_trailing_commas_keeps_string_contents() {
        assert_eq!(strip_trailing_commas(r#"{"a": ",}", }"#), r#"{"a": ",}" }"#);
    }
}
