//! # Course RAG CLI (`crag`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `crag init` | Create the SQLite database and run schema migrations |
//! | `crag ingest <path>` | Extract, chunk, embed and store one document |
//! | `crag search "<query>"` | Hybrid search over ingested chunks |
//! | `crag validate <file>` | Score a piece of generated material |
//! | `crag generate "<prompt>"` | Retrieve, generate and validate |
//! | `crag chunks <document-id>` | List a document's stored chunks |
//!
//! ## Examples
//!
//! ```bash
//! crag init --config ./config/crag.toml
//! crag ingest ./course/lab2.py --course cs101 --category lab
//! crag search "merge sort" --language python --limit 5
//! crag validate ./out/notes.md --kind theory_notes --topic "merge sort" --ground "merge sort"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use course_rag::config::{self, Config};
use course_rag::context::AppContext;
use course_rag::generate::generate;
use course_rag::ingest::{ingest_path, IngestOptions};
use course_rag::logging;
use course_rag::rank::SearchFilters;
use course_rag::search::{print_hits, retrieve};
use course_rag::store::{SqliteStore, Store};
use course_rag::validate::{GroundingChunk, OutputKind, ValidationReport};

const DEFAULT_CONFIG: &str = "./config/crag.toml";

/// Course RAG: chunking, hybrid retrieval and validation for course material.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/crag.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "crag", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// When the default path does not exist, built-in defaults are used.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Ingest one document.
    ///
    /// Passing an existing `--document-id` replaces that document's chunks
    /// atomically; the previous set survives if embedding fails.
    Ingest {
        path: PathBuf,

        #[arg(long)]
        document_id: Option<String>,

        #[arg(long)]
        course: Option<String>,

        /// Document category; `lab` routes non-code files to plain code windows.
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        title: Option<String>,

        /// Show the chunking result without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Search ingested chunks.
    Search {
        query: String,

        #[arg(long)]
        course: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// Exact chunk language, e.g. `python` or `plain`.
        #[arg(long)]
        language: Option<String>,

        /// Substring of the symbol name (case-insensitive).
        #[arg(long)]
        symbol: Option<String>,

        #[arg(long)]
        limit: Option<usize>,

        /// Rank by vector similarity only.
        #[arg(long)]
        no_hybrid: bool,
    },

    /// Score a file of generated material.
    Validate {
        file: PathBuf,

        /// theory_notes, slides or lab_code.
        #[arg(long)]
        kind: String,

        #[arg(long)]
        topic: String,

        /// Retrieve grounding sources with this query.
        #[arg(long)]
        ground: Option<String>,

        #[arg(long)]
        course: Option<String>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate material grounded in retrieved chunks, then validate it.
    Generate {
        prompt: String,

        #[arg(long)]
        kind: String,

        #[arg(long)]
        course: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// List the stored chunks of a document.
    Chunks { document_id: String },
}

fn load(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG) {
        return Ok(Config::minimal());
    }
    config::load_config(path)
}

fn parse_kind(kind: &str) -> anyhow::Result<OutputKind> {
    match OutputKind::parse(kind) {
        Some(k) => Ok(k),
        None => bail!(
            "Unknown kind: '{}'. Use theory_notes, slides or lab_code.",
            kind
        ),
    }
}

fn print_report(report: &ValidationReport) {
    println!("verdict: {}", report.verdict);
    println!("  final:     {:.2}", report.final_score);
    println!("  syntax:    {:.2}", report.syntax_score);
    println!("  grounding: {:.2}", report.grounding_score);
    println!("  rubric:    {:.2}", report.rubric_score);
    println!("  ai_eval:   {:.2}", report.ai_eval_score);
    for note in &report.notes {
        println!("  - {}", note);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = load(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    logging::init(&cfg.logging);

    if let Commands::Init = cli.command {
        let store = SqliteStore::open(&cfg.db.path)
            .await
            .context("initializing database")?;
        println!("Database initialized successfully.");
        if !store.has_lexical() {
            println!("  warning: FTS5 unavailable, search will be vector-only");
        }
        store.close().await;
        return Ok(());
    }

    let ctx = AppContext::from_config(cfg).await?;

    match cli.command {
        Commands::Init => {}
        Commands::Ingest {
            path,
            document_id,
            course,
            category,
            title,
            dry_run,
        } => {
            let opts = IngestOptions {
                document_id,
                course_id: course,
                category,
                title,
                dry_run,
            };
            let report = ingest_path(
                ctx.store.as_ref(),
                ctx.embedder.as_ref(),
                &ctx.config,
                &path,
                &opts,
            )
            .await
            .with_context(|| format!("ingesting {}", path.display()))?;

            if report.dry_run {
                println!("ingest {} (dry-run)", path.display());
            } else {
                println!("ingest {}", path.display());
            }
            println!("  document: {}", report.document_id);
            println!("  title: {}", report.title);
            println!("  kind: {}", report.kind.as_str());
            println!("  strategy: {}", report.strategy);
            println!("  chunks: {}", report.chunks);
            if report.replaced > 0 {
                println!("  replaced: {}", report.replaced);
            }
            println!("ok");
        }
        Commands::Search {
            query,
            course,
            category,
            language,
            symbol,
            limit,
            no_hybrid,
        } => {
            let filters = SearchFilters {
                course_id: course,
                category,
                language,
                symbol,
            };
            let mut params = ctx.rank_params();
            if no_hybrid {
                params = params.vector_only();
            }
            let outcome = retrieve(
                ctx.store.as_ref(),
                ctx.embedder.as_ref(),
                &query,
                filters,
                limit.unwrap_or(ctx.config.retrieval.top_k),
                &params,
            )
            .await
            .context("search failed")?;
            print_hits(&outcome);
        }
        Commands::Validate {
            file,
            kind,
            topic,
            ground,
            course,
            json,
        } => {
            let kind = parse_kind(&kind)?;
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;

            let grounding: Vec<GroundingChunk> = match ground {
                Some(q) => {
                    let filters = SearchFilters {
                        course_id: course,
                        ..Default::default()
                    };
                    retrieve(
                        ctx.store.as_ref(),
                        ctx.embedder.as_ref(),
                        &q,
                        filters,
                        ctx.config.retrieval.generation_top_k,
                        &ctx.rank_params(),
                    )
                    .await
                    .context("retrieving grounding sources")?
                    .hits
                    .iter()
                    .map(GroundingChunk::from)
                    .collect()
                }
                None => Vec::new(),
            };

            let report = ctx
                .validator()
                .validate(&content, kind, &topic, &grounding)
                .await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Generate {
            prompt,
            kind,
            course,
            json,
        } => {
            let kind = parse_kind(&kind)?;
            let result = generate(&ctx, &prompt, kind, course)
                .await
                .context("generation failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.content);
                println!();
                println!("sources: {}", result.sources.join(", "));
                if result.has_citations == Some(false) {
                    println!("warning: no [cite:...] markers in output");
                }
                print_report(&result.validation);
            }
        }
        Commands::Chunks { document_id } => {
            let Some(doc) = ctx.store.get_document(&document_id).await? else {
                bail!("Document not found: {}", document_id);
            };
            let chunks = ctx.store.list_chunks(&document_id).await?;
            println!("{} ({} chunks)", doc.title, chunks.len());
            for chunk in chunks {
                let symbol = chunk
                    .symbol_name
                    .as_deref()
                    .map(|s| format!(" {}", s))
                    .unwrap_or_default();
                let lines = match (chunk.start_line, chunk.end_line) {
                    (Some(s), Some(e)) => format!(" [{}-{}]", s, e),
                    _ => String::new(),
                };
                println!(
                    "#{} {}{}{} {} chars",
                    chunk.chunk_index,
                    chunk.language.as_deref().unwrap_or("prose"),
                    symbol,
                    lines,
                    chunk.text.chars().count()
                );
            }
        }
    }

    Ok(())
}
