//! Self-evaluation through the text generator.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use super::{ScoreOutcome, Scorer, ValidationInput};
use crate::generation::TextGenerator;

const NAME: &str = "ai_eval";

/// Score when the response carries no recognizable rating.
pub const UNPARSED_SCORE: f64 = 0.75;
/// Score when the generator cannot be reached.
pub const UNAVAILABLE_SCORE: f64 = 0.7;

const EXPLANATION_CHARS: usize = 500;
const SOURCE_COUNT: usize = 3;
const SOURCE_PREVIEW_CHARS: usize = 200;

static RATING: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(\d+\.?\d*)\s*/\s*10|score[:\s]+(\d+\.?\d*)").ok()
});

const SYSTEM_PROMPT: &str = "You are an academic content evaluator. Rate the generated educational content on three dimensions:\n\
1. Correctness (technically accurate, no errors)\n\
2. Relevance (matches the topic and learning objectives)\n\
3. Academic reliability (grounded in provided sources, not hallucinated)\n\n\
Provide a score from 0.0 to 1.0 and a brief explanation.";

pub struct AiEvalScorer {
    generator: Arc<dyn TextGenerator>,
    content_chars: usize,
}

impl AiEvalScorer {
    pub fn new(generator: Arc<dyn TextGenerator>, content_chars: usize) -> Self {
        Self {
            generator,
            content_chars,
        }
    }

    fn user_prompt(&self, input: &ValidationInput<'_>) -> String {
        let content: String = input.content.chars().take(self.content_chars).collect();
        let sources = input
            .grounding
            .iter()
            .take(SOURCE_COUNT)
            .map(|g| {
                let preview: String = g.text.chars().take(SOURCE_PREVIEW_CHARS).collect();
                format!("- {}: {}...", g.title, preview)
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Topic: {}\nContent Type: {}\n\nGenerated Content:\n{}\n\nSource Materials:\n{}\n\n\
             Rate this content with a score (0.0-1.0) and explain your reasoning in 2-3 sentences.",
            input.topic, input.kind, content, sources
        )
    }
}

/// First `X/10` or `score: X` in `response`, normalized to `[0, 1]`.
pub fn parse_rating(response: &str) -> Option<f64> {
    let re = RATING.as_ref()?;
    let lower = response.to_lowercase();
    let caps = re.captures(&lower)?;
    let raw: f64 = caps.get(1).or_else(|| caps.get(2))?.as_str().parse().ok()?;
    let normalized = if raw > 1.0 { raw / 10.0 } else { raw };
    Some(normalized.min(1.0))
}

#[async_trait]
impl Scorer for AiEvalScorer {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn score(&self, input: &ValidationInput<'_>) -> ScoreOutcome {
        let response = match self
            .generator
            .generate(SYSTEM_PROMPT, &self.user_prompt(input))
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return ScoreOutcome::degraded(
                    UNAVAILABLE_SCORE,
                    NAME,
                    "AI evaluation not available",
                    e.to_string(),
                )
            }
        };

        let score = parse_rating(&response).unwrap_or(UNPARSED_SCORE);
        let explanation: String = response.chars().take(EXPLANATION_CHARS).collect();
        ScoreOutcome::new(score).with_detail(explanation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RagError, Result};
    use crate::generation::DisabledGenerator;
    use crate::validate::{GroundingChunk, OutputKind};
    use parking_lot::Mutex;

    struct Canned {
        reply: String,
        last_prompt: Mutex<Option<String>>,
    }

    impl Canned {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                last_prompt: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for Canned {
        fn model_name(&self) -> &str {
            "canned"
        }
        async fn generate(&self, _system: &str, user: &str) -> Result<String> {
            *self.last_prompt.lock() = Some(user.to_string());
            Ok(self.reply.clone())
        }
    }

    struct Broken;

    #[async_trait]
    impl TextGenerator for Broken {
        fn model_name(&self) -> &str {
            "broken"
        }
        async fn generate(&self, _system: &str, _user: &str) -> Result<String> {
            Err(RagError::Capability("503".into()))
        }
    }

    fn input<'a>(grounding: &'a [GroundingChunk]) -> ValidationInput<'a> {
        ValidationInput {
            content: "Heaps keep the minimum at the root.",
            kind: OutputKind::TheoryNotes,
            topic: "heaps",
            grounding,
        }
    }

    #[test]
    fn test_parse_rating_forms() {
        assert_eq!(parse_rating("I'd give it 8/10."), Some(0.8));
        assert_eq!(parse_rating("Score: 0.9 because..."), Some(0.9));
        assert_eq!(parse_rating("SCORE 7"), Some(0.7));
        assert_eq!(parse_rating("score: 42"), Some(1.0));
        assert_eq!(parse_rating("looks fine overall"), None);
    }

    #[tokio::test]
    async fn test_unparseable_reply_uses_default() {
        let scorer = AiEvalScorer::new(Arc::new(Canned::new("Solid work.")), 1500);
        let outcome = scorer.score(&input(&[])).await;
        assert_eq!(outcome.score, UNPARSED_SCORE);
        assert_eq!(outcome.detail.as_deref(), Some("Solid work."));
    }

    #[tokio::test]
    async fn test_prompt_lists_top_sources() {
        let canned = Arc::new(Canned::new("score: 0.85"));
        let scorer = AiEvalScorer::new(canned.clone(), 1500);
        let sources: Vec<GroundingChunk> = (0..5)
            .map(|i| GroundingChunk {
                chunk_id: format!("d#{i}"),
                title: format!("Lecture {i}"),
                text: "x".repeat(300),
            })
            .collect();

        let outcome = scorer.score(&input(&sources)).await;
        assert!((outcome.score - 0.85).abs() < 1e-12);

        let prompt = canned.last_prompt.lock().clone().unwrap();
        assert!(prompt.starts_with("Topic: heaps\nContent Type: theory_notes"));
        assert!(prompt.contains(&format!("- Lecture 2: {}...", "x".repeat(200))));
        assert!(!prompt.contains("Lecture 3"));
    }

    #[tokio::test]
    async fn test_generator_failure_degrades() {
        let scorer = AiEvalScorer::new(Arc::new(Broken), 1500);
        let outcome = scorer.score(&input(&[])).await;
        assert_eq!(outcome.score, UNAVAILABLE_SCORE);
        assert_eq!(outcome.notes, vec!["AI evaluation not available"]);
        assert!(outcome.degradation.is_some());

        let scorer = AiEvalScorer::new(Arc::new(DisabledGenerator), 1500);
        assert_eq!(scorer.score(&input(&[])).await.score, UNAVAILABLE_SCORE);
    }
}
