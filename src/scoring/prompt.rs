//! Prompt construction for batched rubric scoring.

use std::fmt::Write as _;

use crate::rubric::Rubric;

pub const SYSTEM_PROMPT: &str = "You are an experienced hackathon judge. You score presentations \
strictly against the rubric you are given and you always answer with a single JSON object and \
nothing else.";

pub const CORRECTION_PROMPT: &str = "Your previous answer could not be parsed. Respond again with \
ONLY the JSON object described above: no markdown fences, no comments, no trailing commas, one \
entry in \"results\" for every submission id, and a numeric score for every criterion.";

/// A fully rendered request for the scoring model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPrompt {
    pub system: String,
    pub user: String,
    /// Submission ids in the order they appear in `user`.
    pub submission_ids: Vec<String>,
}

/// One presentation's content as it goes into a prompt.
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    pub id: &'a str,
    pub content: &'a str,
    /// Judged for relevance; rendered ahead of the slides.
    pub problem_statement: Option<&'a str>,
}

/// Renders the rubric, the output contract and every submission.
///
/// `correction` appends [`CORRECTION_PROMPT`] after a malformed reply.
pub fn build_prompt(
    rubric: &Rubric,
    submissions: &[Submission<'_>],
    correction: bool,
) -> ModelPrompt {
    let range = rubric.score_range;
    let mut user = String::new();

    let _ = writeln!(
        user,
        "Score each submission below on every criterion, from {} (worst) to {} (best).",
        range.min, range.max
    );
    user.push_str("\nCRITERIA:\n");
    for criterion in &rubric.criteria {
        let _ = write!(user, "- {} (weight {})", criterion.name, criterion.weight);
        if criterion.instructions.trim().is_empty() {
            user.push('\n');
        } else {
            let _ = writeln!(user, ": {}", criterion.instructions.trim());
        }
    }

    let example_scores: Vec<String> = rubric
        .criteria
        .iter()
        .map(|c| format!("\"{}\": <number>", c.name))
        .collect();
    let _ = write!(
        user,
        "\nRespond with exactly this JSON shape:\n\
         {{\"results\": [{{\"id\": \"<submission id>\", \"scores\": {{{}}}, \
         \"rationale\": \"<one or two sentences>\"}}]}}\n",
        example_scores.join(", ")
    );

    for submission in submissions {
        let _ = writeln!(user, "\n=== SUBMISSION id: {} ===", submission.id);
        if let Some(statement) = submission.problem_statement {
            let _ = writeln!(user, "Problem statement: {}", statement.trim());
        }
        let _ = writeln!(
            user,
            "{}\n=== END SUBMISSION {} ===",
            submission.content.trim_end(),
            submission.id
        );
    }

    if correction {
        user.push('\n');
        user.push_str(CORRECTION_PROMPT);
        user.push('\n');
    }

    ModelPrompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
        submission_ids: submissions.iter().map(|s| s.id.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rubric::RubricCriterion;

    fn rubric() -> Rubric {
        Rubric::new(
            "v1",
            vec![
                RubricCriterion::new("Innovation", 0.6, "How new is the idea?"),
                RubricCriterion::new("Execution", 0.4, ""),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_prompt_lists_criteria_and_submissions() {
        let prompt = build_prompt(
            &rubric(),
            &[
                Submission {
                    id: "team-a",
                    content: "--- SLIDE 1 ---\nHello",
                    problem_statement: Some("Clean water access"),
                },
                Submission {
                    id: "team-b",
                    content: "--- SLIDE 1 ---\nWorld",
                    problem_statement: None,
                },
            ],
            false,
        );

        assert!(prompt.user.contains("- Innovation (weight 0.6): How new is the idea?"));
        assert!(prompt.user.contains("- Execution (weight 0.4)\n"));
        assert!(prompt.user.contains("\"Innovation\": <number>, \"Execution\": <number>"));
        assert!(prompt.user.contains(
            "=== SUBMISSION id: team-a ===\nProblem statement: Clean water access\n--- SLIDE 1 ---\nHello\n"
        ));
        assert!(prompt.user.contains("=== SUBMISSION id: team-b ===\n--- SLIDE 1 ---\nWorld\n"));
        assert_eq!(prompt.user.matches("Problem statement:").count(), 1);
        assert!(!prompt.user.contains(CORRECTION_PROMPT));
        assert_eq!(prompt.submission_ids, vec!["team-a", "team-b"]);
    }

    #[test]
    fn test_correction_appended_on_retry() {
        let prompt = build_prompt(
            &rubric(),
            &[Submission {
                id: "x",
                content: "",
                problem_statement: None,
            }],
            true,
        );
        assert!(prompt.user.trim_end().ends_with(CORRECTION_PROMPT));
    }
}
