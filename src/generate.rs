//! Retrieval-grounded generation of course material.
//!
//! The prompt is used as the retrieval query (hybrid, falling back to
//! vector-only). Retrieved chunks are handed to the generator as a JSON
//! source list, and the output is checked for `[cite:CHUNK_ID]` markers and
//! scored by the [`Validator`](crate::validate::Validator) against the same
//! chunks.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::context::AppContext;
use crate::error::Result;
use crate::generation::TextGenerator;
use crate::models::Hit;
use crate::rank::SearchFilters;
use crate::search::retrieve;
use crate::validate::{GroundingChunk, OutputKind, ValidationReport};

static CITATION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[cite:[^\]]+\]").ok());

fn system_prompt(kind: OutputKind) -> &'static str {
    match kind {
        OutputKind::TheoryNotes => {
            "You are a course assistant. Write clean, structured Markdown notes.\n\
             Rules:\n\
             - Use headings, bullet points, examples.\n\
             - ONLY use information supported by the provided SOURCES.\n\
             - When you state a fact, add a citation marker like [cite:CHUNK_ID].\n"
        }
        OutputKind::Slides => {
            "You are a course assistant. Create slide content in Markdown (Marp-style).\n\
             Rules:\n\
             - Keep each slide concise.\n\
             - ONLY use information supported by the provided SOURCES.\n\
             - Add [cite:CHUNK_ID] in speaker notes or near claims.\n"
        }
        OutputKind::LabCode => {
            "You are a lab assistant. Produce code-centric learning material.\n\
             Rules:\n\
             - Output Markdown.\n\
             - Include a runnable code example.\n\
             - Be syntactically correct.\n\
             - ONLY use patterns from SOURCES.\n\
             - Add [cite:CHUNK_ID] near explanations.\n"
        }
    }
}

#[derive(Serialize)]
struct PromptSource<'a> {
    chunk_id: &'a str,
    title: &'a str,
    category: Option<&'a str>,
    text: &'a str,
}

fn user_prompt(prompt: &str, hits: &[Hit]) -> String {
    let sources: Vec<PromptSource<'_>> = hits
        .iter()
        .map(|h| PromptSource {
            chunk_id: &h.chunk_id,
            title: &h.document_title,
            category: h.category.as_deref(),
            text: &h.text,
        })
        .collect();
    let sources = serde_json::to_string(&sources).unwrap_or_else(|_| "[]".to_string());
    format!(
        "USER PROMPT:\n{}\n\nSOURCES (JSON):\n{}\n\nNow produce the requested output.",
        prompt, sources
    )
}

/// True when `text` contains at least one `[cite:...]` marker.
pub fn has_citation_marker(text: &str) -> bool {
    CITATION.as_ref().is_some_and(|re| re.is_match(text))
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub content: String,
    pub kind: OutputKind,
    /// Retrieved chunk ids, in rank order.
    pub sources: Vec<String>,
    /// `None` when nothing was retrieved.
    pub has_citations: Option<bool>,
    pub retrieval_degraded: bool,
    pub validation: ValidationReport,
}

/// Retrieve, generate and validate.
pub async fn generate(
    ctx: &AppContext,
    prompt: &str,
    kind: OutputKind,
    course_id: Option<String>,
) -> Result<GenerationResult> {
    let filters = SearchFilters {
        course_id,
        ..Default::default()
    };
    let retrieved = retrieve(
        ctx.store.as_ref(),
        ctx.embedder.as_ref(),
        prompt,
        filters,
        ctx.config.retrieval.generation_top_k,
        &ctx.rank_params(),
    )
    .await?;

    let content = ctx
        .generator
        .generate(system_prompt(kind), &user_prompt(prompt, &retrieved.hits))
        .await?;

    let has_citations = if retrieved.hits.is_empty() {
        None
    } else {
        Some(has_citation_marker(&content))
    };
    if has_citations == Some(false) {
        warn!(sources = retrieved.hits.len(), "generated content has no citation markers");
    }

    let grounding: Vec<GroundingChunk> = retrieved.hits.iter().map(GroundingChunk::from).collect();
    let validation = ctx
        .validator()
        .validate(&content, kind, prompt, &grounding)
        .await;

    info!(
        kind = %kind,
        sources = retrieved.hits.len(),
        verdict = %validation.verdict,
        "generated content"
    );

    Ok(GenerationResult {
        content,
        kind,
        sources: retrieved.hits.iter().map(|h| h.chunk_id.clone()).collect(),
        has_citations,
        retrieval_degraded: retrieved.degraded,
        validation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citation_marker() {
        assert!(has_citation_marker("Heaps are trees [cite:doc#2]."));
        assert!(!has_citation_marker("no markers [cite:] here"));
        assert!(!has_citation_marker("plain text"));
    }

    #[test]
    fn test_every_mode_demands_citations() {
        for kind in [OutputKind::TheoryNotes, OutputKind::Slides, OutputKind::LabCode] {
            assert!(system_prompt(kind).contains("[cite:CHUNK_ID]"));
        }
    }

    #[test]
    fn test_user_prompt_embeds_sources_as_json() {
        let prompt = user_prompt("explain heaps", &[]);
        assert!(prompt.starts_with("USER PROMPT:\nexplain heaps\n\nSOURCES (JSON):\n[]"));
    }
}
