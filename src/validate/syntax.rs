//! Syntax check for fenced code in lab material.
//!
//! Each fenced block is parsed with a tree-sitter grammar picked from the
//! fence tag (Python when untagged or unknown). A clean parse earns 1.0; a
//! block that fails but still looks like structured code earns 0.5. The
//! score is the mean over blocks.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tree_sitter::Parser;

use super::{OutputKind, ScoreOutcome, Scorer, ValidationInput, NEUTRAL_SCORE};

static FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```([\w+#-]*)[ \t]*\n(.*?)```").ok());

const STRUCTURE_MARKERS: &[&str] = &["def ", "class ", "if ", "for ", "while ", "import "];

const PARTIAL_CREDIT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grammar {
    Python,
    JavaScript,
    TypeScript,
    Rust,
    Java,
    Go,
    Cpp,
}

impl Grammar {
    fn for_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "js" | "javascript" | "jsx" | "mjs" | "node" => Grammar::JavaScript,
            "ts" | "typescript" => Grammar::TypeScript,
            "rs" | "rust" => Grammar::Rust,
            "java" => Grammar::Java,
            "go" | "golang" => Grammar::Go,
            // C blocks go through the C++ grammar, which accepts C.
            "c" | "h" | "cpp" | "c++" | "cc" | "cxx" | "hpp" => Grammar::Cpp,
            _ => Grammar::Python,
        }
    }

    fn language(&self) -> tree_sitter::Language {
        match self {
            Grammar::Python => tree_sitter_python::LANGUAGE.into(),
            Grammar::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Grammar::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Grammar::Rust => tree_sitter_rust::LANGUAGE.into(),
            Grammar::Java => tree_sitter_java::LANGUAGE.into(),
            Grammar::Go => tree_sitter_go::LANGUAGE.into(),
            Grammar::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        }
    }
}

/// `(tag, body)` for every fenced block.
pub fn code_blocks(content: &str) -> Vec<(String, String)> {
    match FENCE.as_ref() {
        Some(re) => re
            .captures_iter(content)
            .map(|caps| {
                let tag = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                let body = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
                (tag.to_string(), body.to_string())
            })
            .collect(),
        None => Vec::new(),
    }
}

/// True when `code` parses without ERROR or MISSING nodes.
fn parses_cleanly(code: &str, grammar: Grammar) -> bool {
    let mut parser = Parser::new();
    if parser.set_language(&grammar.language()).is_err() {
        return false;
    }
    match parser.parse(code, None) {
        // has_error() also reports MISSING nodes.
        Some(tree) => !tree.root_node().has_error(),
        None => false,
    }
}

/// Credit for one block: 1.0, 0.5 or 0.0.
pub fn block_score(tag: &str, code: &str) -> f64 {
    let code = code.trim();
    if parses_cleanly(code, Grammar::for_tag(tag)) {
        1.0
    } else if STRUCTURE_MARKERS.iter().any(|m| code.contains(m)) {
        PARTIAL_CREDIT
    } else {
        0.0
    }
}

pub struct SyntaxScorer;

#[async_trait]
impl Scorer for SyntaxScorer {
    fn name(&self) -> &'static str {
        "syntax"
    }

    async fn score(&self, input: &ValidationInput<'_>) -> ScoreOutcome {
        if input.kind != OutputKind::LabCode {
            return ScoreOutcome::new(1.0);
        }

        let blocks = code_blocks(input.content);
        if blocks.is_empty() {
            return ScoreOutcome::new(NEUTRAL_SCORE).with_detail("no fenced code blocks");
        }

        let scores: Vec<f64> = blocks
            .iter()
            .map(|(tag, code)| block_score(tag, code))
            .collect();
        let clean = scores.iter().filter(|s| **s == 1.0).count();
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;

        ScoreOutcome::new(mean).with_detail(format!(
            "{} of {} code blocks parse cleanly",
            clean,
            scores.len()
        ))
    }
}
