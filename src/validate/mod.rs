//! Multi-axis scoring of generated course content.
//!
//! Four independent [`Scorer`]s each produce a bounded score:
//!
//! | Scorer | Weight | Neutral default |
//! |--------|--------|-----------------|
//! | [`syntax`] | 0.25 | 0.5 with no fenced code; 1.0 for non-code kinds |
//! | [`grounding`] | 0.35 | 0.5 with no sources or on embedding failure |
//! | [`rubric`] | 0.20 | none (pure checklist) |
//! | [`ai_eval`] | 0.20 | 0.75 unparseable, 0.7 when the generator fails |
//!
//! The weighted sum gives the final score, and the verdict follows from it
//! alone. A failing sub-scorer never aborts validation: it falls back to its
//! neutral default and records a [`Degradation`] on the report.
//!
//! Weights and verdict thresholds come from
//! [`ValidationConfig`](crate::config::ValidationConfig).

pub mod ai_eval;
pub mod grounding;
pub mod rubric;
pub mod syntax;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ValidationConfig;
use crate::embedding::TextEmbedder;
use crate::generation::TextGenerator;
use crate::models::Hit;

pub use ai_eval::AiEvalScorer;
pub use grounding::GroundingScorer;
pub use rubric::RubricScorer;
pub use syntax::SyntaxScorer;

/// Score used when a sub-scorer has nothing to judge or cannot run.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Kind of generated material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    TheoryNotes,
    Slides,
    LabCode,
}

impl OutputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKind::TheoryNotes => "theory_notes",
            OutputKind::Slides => "slides",
            OutputKind::LabCode => "lab_code",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "theory_notes" | "theory" | "notes" => Some(OutputKind::TheoryNotes),
            "slides" => Some(OutputKind::Slides),
            "lab_code" | "lab" | "code" => Some(OutputKind::LabCode),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retrieved source text used as grounding evidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundingChunk {
    pub chunk_id: String,
    pub title: String,
    pub text: String,
}

impl From<&Hit> for GroundingChunk {
    fn from(hit: &Hit) -> Self {
        Self {
            chunk_id: hit.chunk_id.clone(),
            title: hit.document_title.clone(),
            text: hit.text.clone(),
        }
    }
}

/// Everything a scorer may look at.
#[derive(Debug, Clone, Copy)]
pub struct ValidationInput<'a> {
    pub content: &'a str,
    pub kind: OutputKind,
    pub topic: &'a str,
    pub grounding: &'a [GroundingChunk],
}

/// A sub-scorer that fell back to its default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Degradation {
    pub scorer: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOutcome {
    /// Always within `[0, 1]`.
    pub score: f64,
    pub notes: Vec<String>,
    pub detail: Option<String>,
    pub degradation: Option<Degradation>,
}

impl ScoreOutcome {
    pub fn new(score: f64) -> Self {
        Self {
            score: clamp_unit(score),
            notes: Vec::new(),
            detail: None,
            degradation: None,
        }
    }

    /// Fallback outcome; `note` is shown to the reader.
    pub fn degraded(score: f64, scorer: &str, note: &str, reason: impl Into<String>) -> Self {
        Self {
            score: clamp_unit(score),
            notes: vec![note.to_string()],
            detail: None,
            degradation: Some(Degradation {
                scorer: scorer.to_string(),
                reason: reason.into(),
            }),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

fn clamp_unit(score: f64) -> f64 {
    if score.is_nan() {
        NEUTRAL_SCORE
    } else {
        score.clamp(0.0, 1.0)
    }
}

#[async_trait]
pub trait Scorer: Send + Sync {
    fn name(&self) -> &'static str;
    async fn score(&self, input: &ValidationInput<'_>) -> ScoreOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Review,
    Fail,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Verdict::Pass => "PASS",
            Verdict::Review => "REVIEW",
            Verdict::Fail => "FAIL",
        })
    }
}

/// Verdict for a final score.
pub fn verdict_for(final_score: f64, config: &ValidationConfig) -> Verdict {
    if final_score >= config.pass_threshold {
        Verdict::Pass
    } else if final_score >= config.review_threshold {
        Verdict::Review
    } else {
        Verdict::Fail
    }
}

/// Weighted sum of `(score, weight)` pairs, clamped to `[0, 1]`.
pub fn fuse_scores(parts: &BTreeMap<&str, (f64, f64)>) -> f64 {
    parts
        .values()
        .map(|(score, weight)| score * weight)
        .sum::<f64>()
        .clamp(0.0, 1.0)
}

/// Scores are kept unrounded; round for display only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub syntax_score: f64,
    pub grounding_score: f64,
    pub rubric_score: f64,
    pub ai_eval_score: f64,
    pub final_score: f64,
    pub verdict: Verdict,
    pub ai_explanation: Option<String>,
    pub notes: Vec<String>,
    pub degradations: Vec<Degradation>,
}

/// Informational notes from fixed score thresholds.
pub fn threshold_notes(
    syntax: f64,
    grounding: f64,
    rubric: f64,
    ai_eval: f64,
    kind: OutputKind,
) -> Vec<String> {
    let mut notes = Vec::new();

    if syntax < 0.7 {
        notes.push("Code syntax issues detected".to_string());
    } else if syntax == 1.0 && kind == OutputKind::LabCode {
        notes.push("Code is syntactically correct".to_string());
    }

    if grounding < 0.6 {
        notes.push("Content may not be well-grounded in course materials".to_string());
    } else if grounding > 0.75 {
        notes.push("Well-grounded in course materials".to_string());
    }

    if rubric < 0.6 {
        notes.push("Missing some expected structural elements".to_string());
    } else if rubric > 0.8 {
        notes.push("Follows content structure guidelines".to_string());
    }

    if ai_eval < 0.6 {
        notes.push("Content quality could be improved".to_string());
    } else if ai_eval > 0.8 {
        notes.push("High-quality academic content".to_string());
    }

    if notes.is_empty() {
        notes.push("Content meets quality standards".to_string());
    }
    notes
}

/// Runs the four scorers and fuses their results.
pub struct Validator {
    syntax: SyntaxScorer,
    grounding: GroundingScorer,
    rubric: RubricScorer,
    ai_eval: AiEvalScorer,
    config: ValidationConfig,
}

impl Validator {
    pub fn new(
        embedder: Arc<dyn TextEmbedder>,
        generator: Arc<dyn TextGenerator>,
        config: ValidationConfig,
    ) -> Self {
        Self {
            syntax: SyntaxScorer,
            grounding: GroundingScorer::new(embedder, config.grounding_prefix_chars),
            rubric: RubricScorer,
            ai_eval: AiEvalScorer::new(generator, config.ai_eval_content_chars),
            config,
        }
    }

    /// Score `content`. Never fails.
    pub async fn validate(
        &self,
        content: &str,
        kind: OutputKind,
        topic: &str,
        grounding: &[GroundingChunk],
    ) -> ValidationReport {
        let input = ValidationInput {
            content,
            kind,
            topic,
            grounding,
        };

        let (syntax, grounding, rubric, ai_eval) = tokio::join!(
            self.syntax.score(&input),
            self.grounding.score(&input),
            self.rubric.score(&input),
            self.ai_eval.score(&input),
        );

        let c = &self.config;
        let mut parts = BTreeMap::new();
        parts.insert(self.syntax.name(), (syntax.score, c.syntax_weight));
        parts.insert(self.grounding.name(), (grounding.score, c.grounding_weight));
        parts.insert(self.rubric.name(), (rubric.score, c.rubric_weight));
        parts.insert(self.ai_eval.name(), (ai_eval.score, c.ai_eval_weight));
        let final_score = fuse_scores(&parts);
        let verdict = verdict_for(final_score, c);

        let mut notes = threshold_notes(
            syntax.score,
            grounding.score,
            rubric.score,
            ai_eval.score,
            kind,
        );
        let mut degradations = Vec::new();
        for outcome in [&syntax, &grounding, &rubric, &ai_eval] {
            notes.extend(outcome.notes.iter().cloned());
            if let Some(d) = &outcome.degradation {
                warn!(scorer = %d.scorer, reason = %d.reason, "validation scorer degraded");
                degradations.push(d.clone());
            }
        }

        debug!(final_score, %verdict, kind = %kind, "validated");

        ValidationReport {
            syntax_score: syntax.score,
            grounding_score: grounding.score,
            rubric_score: rubric.score,
            ai_eval_score: ai_eval.score,
            final_score,
            verdict,
            ai_explanation: ai_eval.detail,
            notes,
            degradations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuse_default_weights() {
        let c = ValidationConfig::default();
        let mut parts = BTreeMap::new();
        parts.insert("syntax", (1.0, c.syntax_weight));
        parts.insert("grounding", (0.5, c.grounding_weight));
        parts.insert("rubric", (0.6, c.rubric_weight));
        parts.insert("ai_eval", (0.7, c.ai_eval_weight));
        // 0.25 + 0.175 + 0.12 + 0.14
        assert!((fuse_scores(&parts) - 0.685).abs() < 1e-9);
    }

    #[test]
    fn test_verdict_boundaries() {
        let c = ValidationConfig::default();
        assert_eq!(verdict_for(0.70, &c), Verdict::Pass);
        assert_eq!(verdict_for(0.6999, &c), Verdict::Review);
        assert_eq!(verdict_for(0.50, &c), Verdict::Review);
        assert_eq!(verdict_for(0.4999, &c), Verdict::Fail);
    }

    #[test]
    fn test_threshold_notes() {
        let notes = threshold_notes(1.0, 0.5, 0.7, 0.7, OutputKind::LabCode);
        assert_eq!(
            notes,
            vec![
                "Code is syntactically correct",
                "Content may not be well-grounded in course materials",
            ]
        );
        let notes = threshold_notes(1.0, 0.7, 0.7, 0.7, OutputKind::TheoryNotes);
        assert_eq!(notes, vec!["Content meets quality standards"]);
    }

    #[test]
    fn test_outcome_is_clamped() {
        assert_eq!(ScoreOutcome::new(1.4).score, 1.0);
        assert_eq!(ScoreOutcome::new(-0.2).score, 0.0);
        assert_eq!(ScoreOutcome::new(f64::NAN).score, NEUTRAL_SCORE);
    }

    #[test]
    fn test_output_kind_serde() {
        assert_eq!(
            serde_json::to_string(&OutputKind::LabCode).unwrap(),
            "\"lab_code\""
        );
        assert_eq!(OutputKind::parse("slides"), Some(OutputKind::Slides));
        assert_eq!(serde_json::to_string(&Verdict::Review).unwrap(), "\"REVIEW\"");
    }
}
