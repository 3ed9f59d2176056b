//! Structural checklist per output kind.
//!
//! Each kind has a fixed table of named checks; the score is the fraction
//! satisfied. The detail lists the checks that failed.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::{OutputKind, ScoreOutcome, Scorer, ValidationInput};

static EXTERNAL_LINK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"https?://(\S*)").ok());

/// Text views shared by every check.
struct Subject<'a> {
    raw: &'a str,
    lower: String,
    words: usize,
    topic_words: Vec<String>,
}

impl<'a> Subject<'a> {
    fn new(content: &'a str, topic: &str) -> Self {
        Self {
            raw: content,
            lower: content.to_lowercase(),
            words: content.split_whitespace().count(),
            topic_words: topic
                .to_lowercase()
                .split_whitespace()
                .take(3)
                .map(str::to_string)
                .collect(),
        }
    }

    fn mentions_topic(&self) -> bool {
        self.topic_words.iter().any(|w| self.lower.contains(w.as_str()))
    }

    fn contains_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.raw.contains(n))
    }

    fn lower_contains_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.lower.contains(n))
    }
}

struct Check {
    name: &'static str,
    holds: fn(&Subject<'_>) -> bool,
}

fn has_external_link(text: &str) -> bool {
    let Some(re) = EXTERNAL_LINK.as_ref() else {
        return false;
    };
    re.captures_iter(text).any(|caps| {
        let rest = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        !(rest.starts_with("localhost") || rest.starts_with("127.0.0.1"))
    })
}

const THEORY_CHECKS: &[Check] = &[
    Check {
        name: "headings",
        holds: |s| s.contains_any(&["# ", "## ", "### "]),
    },
    Check {
        name: "topic coverage",
        holds: |s| s.mentions_topic(),
    },
    Check {
        name: "length over 300 words",
        holds: |s| s.words > 300,
    },
    Check {
        name: "examples",
        holds: |s| s.lower_contains_any(&["example", "for instance", "such as"]),
    },
    Check {
        name: "no external links",
        holds: |s| !has_external_link(s.raw),
    },
];

const SLIDE_CHECKS: &[Check] = &[
    Check {
        name: "slide separators",
        holds: |s| s.contains_any(&["---", "##"]),
    },
    Check {
        name: "length between 100 and 1500 words",
        holds: |s| s.words > 100 && s.words < 1500,
    },
    Check {
        name: "topic coverage",
        holds: |s| s.mentions_topic(),
    },
    Check {
        name: "bullet structure",
        holds: |s| s.contains_any(&["- ", "* ", "\n"]),
    },
];

const LAB_CHECKS: &[Check] = &[
    Check {
        name: "code block",
        holds: |s| s.raw.contains("```"),
    },
    Check {
        name: "comments",
        holds: |s| s.contains_any(&["#", "//", "/*"]),
    },
    Check {
        name: "explanation",
        holds: |s| s.lower_contains_any(&["explanation", "how it works", "description"]),
    },
    Check {
        name: "topic coverage",
        holds: |s| s.mentions_topic(),
    },
    Check {
        name: "definitions",
        holds: |s| s.contains_any(&["def ", "class ", "function ", "const "]),
    },
];

fn checks_for(kind: OutputKind) -> &'static [Check] {
    match kind {
        OutputKind::TheoryNotes => THEORY_CHECKS,
        OutputKind::Slides => SLIDE_CHECKS,
        OutputKind::LabCode => LAB_CHECKS,
    }
}

/// Names of the checks `content` fails, plus the satisfied fraction.
pub fn evaluate(content: &str, kind: OutputKind, topic: &str) -> (f64, Vec<&'static str>) {
    let subject = Subject::new(content, topic);
    let checks = checks_for(kind);
    let missing: Vec<&'static str> = checks
        .iter()
        .filter(|c| !(c.holds)(&subject))
        .map(|c| c.name)
        .collect();
    let satisfied = checks.len() - missing.len();
    (satisfied as f64 / checks.len() as f64, missing)
}

pub struct RubricScorer;

#[async_trait]
impl Scorer for RubricScorer {
    fn name(&self) -> &'static str {
        "rubric"
    }

    async fn score(&self, input: &ValidationInput<'_>) -> ScoreOutcome {
        let (score, missing) = evaluate(input.content, input.kind, input.topic);
        let outcome = ScoreOutcome::new(score);
        if missing.is_empty() {
            outcome
        } else {
            outcome.with_detail(format!("missing: {}", missing.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn test_theory_full_marks() {
        let content = format!(
            "# Binary Search\n\nFor example, halve the range.\n{}",
            words(310)
        );
        let (score, missing) = evaluate(&content, OutputKind::TheoryNotes, "Binary search trees");
        assert_eq!(score, 1.0);
        assert!(missing.is_empty());
    }

    #[test]
    fn test_theory_external_link_fails_check() {
        let content = "# Heading\nsee https://example.com for an example of search";
        let (score, missing) = evaluate(content, OutputKind::TheoryNotes, "search");
        assert!(missing.contains(&"no external links"));
        assert!(missing.contains(&"length over 300 words"));
        assert!((score - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_localhost_links_are_allowed() {
        assert!(!has_external_link("run http://localhost:8000 and http://127.0.0.1/x"));
        assert!(has_external_link("http://localhost:8000 then https://evil.test"));
    }

    #[test]
    fn test_slides_word_window() {
        let content = format!("## Sorting\n- {}", words(120));
        let (score, _) = evaluate(&content, OutputKind::Slides, "sorting");
        assert_eq!(score, 1.0);

        let (score, missing) = evaluate("## Sorting\n- short", OutputKind::Slides, "sorting");
        assert_eq!(missing, vec!["length between 100 and 1500 words"]);
        assert!((score - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_lab_checks() {
        let content = "## Explanation\n```python\n# add numbers\ndef add(a, b):\n    return a + b\n```";
        let (score, missing) = evaluate(content, OutputKind::LabCode, "Python functions");
        assert_eq!(score, 1.0, "missing: {missing:?}");
    }

    #[test]
    fn test_empty_topic_never_matches() {
        let (_, missing) = evaluate("anything", OutputKind::LabCode, "");
        assert!(missing.contains(&"topic coverage"));
    }

    #[tokio::test]
    async fn test_scorer_reports_missing_checks() {
        let input = ValidationInput {
            content: "plain",
            kind: OutputKind::Slides,
            topic: "graphs",
            grounding: &[],
        };
        let outcome = RubricScorer.score(&input).await;
        assert_eq!(outcome.score, 0.0);
        assert_eq!(
            outcome.detail.as_deref(),
            Some("missing: slide separators, length between 100 and 1500 words, topic coverage, bullet structure")
        );
    }
}
