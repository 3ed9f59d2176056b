//! TOML configuration.
//!
//! Every section carries serde defaults, so an empty file is a valid
//! configuration with embeddings and generation disabled. The empirical
//! constants of the pipeline (chunk sizes, fusion weights, lexical rescale,
//! validator weights and verdict thresholds) all live here so they can be
//! tuned per deployment without touching the algorithms.
//!
//! ```toml
//! [db]
//! path = "./data/crag.sqlite"
//!
//! [chunking]
//! max_chars = 1800
//! overlap = 200
//!
//! [retrieval]
//! hybrid = true
//! vector_weight = 0.7
//! lexical_weight = 0.3
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//! dims = 1536
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// All-default configuration, used when no config file is available.
    pub fn minimal() -> Self {
        Self::default()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/crag.sqlite")
}

/// Size knobs for the three chunking strategies. Lengths are in characters.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ChunkingConfig {
    /// Fixed-width window size for prose and plain text.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Characters shared by consecutive fixed-width windows.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    /// Heading sections are merged forward while the merged text stays under this.
    #[serde(default = "default_heading_merge_chars")]
    pub heading_merge_chars: usize,
    /// Fixed-width window size when code has no usable boundaries.
    #[serde(default = "default_code_max_chars")]
    pub code_max_chars: usize,
    #[serde(default = "default_code_overlap")]
    pub code_overlap: usize,
    /// Unnamed code segments shorter than this are dropped as noise.
    #[serde(default = "default_min_segment_chars")]
    pub min_segment_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap: default_overlap(),
            heading_merge_chars: default_heading_merge_chars(),
            code_max_chars: default_code_max_chars(),
            code_overlap: default_code_overlap(),
            min_segment_chars: default_min_segment_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    1800
}
fn default_overlap() -> usize {
    200
}
fn default_heading_merge_chars() -> usize {
    1200
}
fn default_code_max_chars() -> usize {
    1600
}
fn default_code_overlap() -> usize {
    150
}
fn default_min_segment_chars() -> usize {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Blend in the lexical signal when query text is available.
    #[serde(default = "default_true")]
    pub hybrid: bool,
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f64,
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f64,
    /// Raw phrase-rank values are multiplied by this before clamping to 1.0.
    #[serde(default = "default_lexical_multiplier")]
    pub lexical_multiplier: f64,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Number of sources retrieved for a generation request.
    #[serde(default = "default_generation_top_k")]
    pub generation_top_k: usize,
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            hybrid: true,
            vector_weight: default_vector_weight(),
            lexical_weight: default_lexical_weight(),
            lexical_multiplier: default_lexical_multiplier(),
            top_k: default_top_k(),
            generation_top_k: default_generation_top_k(),
            excerpt_chars: default_excerpt_chars(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_vector_weight() -> f64 {
    0.7
}
fn default_lexical_weight() -> f64 {
    0.3
}
fn default_lexical_multiplier() -> f64 {
    5.0
}
fn default_top_k() -> usize {
    8
}
fn default_generation_top_k() -> usize {
    6
}
fn default_excerpt_chars() -> usize {
    700
}

/// Validator weights and verdict thresholds.
#[derive(Debug, Deserialize, Clone)]
pub struct ValidationConfig {
    #[serde(default = "default_syntax_weight")]
    pub syntax_weight: f64,
    #[serde(default = "default_grounding_weight")]
    pub grounding_weight: f64,
    #[serde(default = "default_rubric_weight")]
    pub rubric_weight: f64,
    #[serde(default = "default_ai_eval_weight")]
    pub ai_eval_weight: f64,
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: f64,
    #[serde(default = "default_review_threshold")]
    pub review_threshold: f64,
    /// Characters of generated content embedded for the grounding check.
    #[serde(default = "default_grounding_prefix_chars")]
    pub grounding_prefix_chars: usize,
    /// Characters of generated content shown to the AI evaluator.
    #[serde(default = "default_ai_eval_content_chars")]
    pub ai_eval_content_chars: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            syntax_weight: default_syntax_weight(),
            grounding_weight: default_grounding_weight(),
            rubric_weight: default_rubric_weight(),
            ai_eval_weight: default_ai_eval_weight(),
            pass_threshold: default_pass_threshold(),
            review_threshold: default_review_threshold(),
            grounding_prefix_chars: default_grounding_prefix_chars(),
            ai_eval_content_chars: default_ai_eval_content_chars(),
        }
    }
}

fn default_syntax_weight() -> f64 {
    0.25
}
fn default_grounding_weight() -> f64 {
    0.35
}
fn default_rubric_weight() -> f64 {
    0.20
}
fn default_ai_eval_weight() -> f64 {
    0.20
}
fn default_pass_threshold() -> f64 {
    0.70
}
fn default_review_threshold() -> f64 {
    0.50
}
fn default_grounding_prefix_chars() -> usize {
    1000
}
fn default_ai_eval_content_chars() -> usize {
    1500
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (Ollama, or an OpenAI-compatible endpoint).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_generation_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate_config(&config)?;
    Ok(config)
}

/// Check cross-field constraints that serde cannot express.
pub fn validate_config(config: &Config) -> Result<()> {
    let c = &config.chunking;
    if c.max_chars == 0 || c.code_max_chars == 0 {
        bail!("chunking.max_chars and chunking.code_max_chars must be > 0");
    }
    if c.heading_merge_chars == 0 {
        bail!("chunking.heading_merge_chars must be > 0");
    }

    let r = &config.retrieval;
    if r.top_k < 1 || r.generation_top_k < 1 {
        bail!("retrieval.top_k and retrieval.generation_top_k must be >= 1");
    }
    for (name, w) in [
        ("vector_weight", r.vector_weight),
        ("lexical_weight", r.lexical_weight),
    ] {
        if !(0.0..=1.0).contains(&w) {
            bail!("retrieval.{} must be in [0.0, 1.0]", name);
        }
    }
    if r.lexical_multiplier < 0.0 {
        bail!("retrieval.lexical_multiplier must be >= 0");
    }

    let v = &config.validation;
    let weights = [
        v.syntax_weight,
        v.grounding_weight,
        v.rubric_weight,
        v.ai_eval_weight,
    ];
    if weights.iter().any(|w| *w < 0.0) {
        bail!("validation weights must be non-negative");
    }
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > 1e-6 {
        bail!("validation weights must sum to 1.0 (got {:.4})", sum);
    }
    if !(0.0..=1.0).contains(&v.review_threshold)
        || !(0.0..=1.0).contains(&v.pass_threshold)
        || v.review_threshold > v.pass_threshold
    {
        bail!("validation thresholds must satisfy 0 <= review_threshold <= pass_threshold <= 1");
    }

    let e = &config.embedding;
    match e.provider.as_str() {
        "disabled" | "openai" | "ollama" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }
    if e.is_enabled() && e.provider != "local" {
        if e.dims.is_none() || e.dims == Some(0) {
            bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                e.provider
            );
        }
        if e.model.is_none() {
            bail!(
                "embedding.model must be specified when provider is '{}'",
                e.provider
            );
        }
    }
    if e.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }

    let g = &config.generation;
    match g.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => bail!(
            "Unknown generation provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }
    if g.is_enabled() && g.model.is_none() {
        bail!(
            "generation.model must be specified when provider is '{}'",
            g.provider
        );
    }

    Ok(())
}
