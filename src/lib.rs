//! # Course RAG
//!
//! Retrieval-augmented generation core for course material.
//!
//! Course documents (PDF or text) are extracted, split into retrieval units
//! with a structure-aware chunker, embedded, and stored in SQLite. Queries
//! are answered by a hybrid ranker that fuses vector similarity with
//! full-text relevance, and generated material is scored by a four-axis
//! validator before it reaches students.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────┐   ┌──────────┐   ┌───────────┐
//! │ Extractor │──▶│ Chunker  │──▶│ Embedder │──▶│  SQLite   │
//! │ PDF/text  │   │ md/code  │   │ batched  │   │ FTS5+BLOB │
//! └───────────┘   └──────────┘   └──────────┘   └─────┬─────┘
//!                                                     │
//!                      ┌──────────────────────────────┤
//!                      ▼                              ▼
//!                ┌──────────┐   ┌───────────┐   ┌───────────┐
//!                │  Ranker  │──▶│ Generator │──▶│ Validator │
//!                │ 0.7v+0.3l│   │ [cite:..] │   │ 4 scorers │
//!                └──────────┘   └───────────┘   └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! crag init
//! crag ingest ./course/week1.pdf --course cs101 --category theory
//! crag ingest ./course/lab2.py --course cs101 --category lab
//! crag search "binary heap insert" --course cs101
//! crag generate "explain heap sort" --kind theory_notes --course cs101
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | PDF/text extraction |
//! | [`chunk`] | Heading-aware, code-aware and fixed-width chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`generation`] | Text generation provider abstraction |
//! | [`store`] | Persistence trait with SQLite and in-memory backends |
//! | [`rank`] | Hybrid vector + lexical ranking |
//! | [`search`] | Query embedding and vector-only fallback |
//! | [`ingest`] | Ingestion pipeline |
//! | [`generate`] | Retrieval-grounded generation |
//! | [`validate`] | Multi-axis content validation |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generate;
pub mod generation;
pub mod http;
pub mod ingest;
pub mod lexical;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod rank;
pub mod search;
pub mod store;
pub mod validate;

pub use context::AppContext;
pub use error::{ExtractError, RagError, Result};
