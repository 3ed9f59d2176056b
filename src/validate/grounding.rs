//! Grounding: how close generated content is to the retrieved sources.
//!
//! The content prefix and the source texts are embedded concurrently; the
//! score is the best cosine similarity between the prefix and any source,
//! clamped to `[0, 1]`.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ScoreOutcome, Scorer, ValidationInput, NEUTRAL_SCORE};
use crate::embedding::{cosine_similarity, embed_one, TextEmbedder};

const NAME: &str = "grounding";
const UNAVAILABLE_NOTE: &str = "Grounding check unavailable; neutral score used";

pub struct GroundingScorer {
    embedder: Arc<dyn TextEmbedder>,
    prefix_chars: usize,
}

impl GroundingScorer {
    pub fn new(embedder: Arc<dyn TextEmbedder>, prefix_chars: usize) -> Self {
        Self {
            embedder,
            prefix_chars,
        }
    }
}

fn prefix(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[async_trait]
impl Scorer for GroundingScorer {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn score(&self, input: &ValidationInput<'_>) -> ScoreOutcome {
        if input.grounding.is_empty() {
            return ScoreOutcome::new(NEUTRAL_SCORE).with_detail("no grounding sources");
        }

        let content = prefix(input.content, self.prefix_chars);
        let sources: Vec<String> = input.grounding.iter().map(|g| g.text.clone()).collect();

        let (content_vec, source_vecs) = tokio::join!(
            embed_one(self.embedder.as_ref(), &content),
            self.embedder.embed(&sources),
        );

        let (content_vec, source_vecs) = match (content_vec, source_vecs) {
            (Ok(c), Ok(s)) => (c, s),
            (Err(e), _) | (_, Err(e)) => {
                return ScoreOutcome::degraded(NEUTRAL_SCORE, NAME, UNAVAILABLE_NOTE, e.to_string())
            }
        };

        if source_vecs.len() != sources.len()
            || source_vecs.iter().any(|v| v.len() != content_vec.len())
        {
            return ScoreOutcome::degraded(
                NEUTRAL_SCORE,
                NAME,
                UNAVAILABLE_NOTE,
                "embedding count or dimension mismatch",
            );
        }

        let (best_idx, best) = source_vecs
            .iter()
            .map(|v| cosine_similarity(&content_vec, v) as f64)
            .enumerate()
            .fold((0, f64::MIN), |acc, (i, s)| if s > acc.1 { (i, s) } else { acc });

        ScoreOutcome::new(best.min(1.0)).with_detail(format!(
            "closest source: {}",
            input.grounding[best_idx].chunk_id
        ))
    }
}
