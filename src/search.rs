//! Query-side retrieval: embed, rank, and fall back to vector-only ranking
//! when the store has no lexical operator.

use tracing::warn;

use crate::embedding::{embed_one, TextEmbedder};
use crate::error::Result;
use crate::models::Hit;
use crate::rank::{rank, Query, RankParams, SearchFilters};
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub hits: Vec<Hit>,
    /// True when hybrid ranking failed and vector-only results were returned.
    pub degraded: bool,
}

/// Rank, retrying once vector-only on an infrastructure error.
pub async fn rank_with_fallback(
    store: &dyn Store,
    query: &Query,
    params: &RankParams,
) -> Result<SearchOutcome> {
    match rank(store, query, params).await {
        Ok(hits) => Ok(SearchOutcome {
            hits,
            degraded: false,
        }),
        Err(e) if e.is_infrastructure() && params.hybrid => {
            warn!(error = %e, "hybrid ranking unavailable, retrying vector-only");
            let hits = rank(store, query, &params.vector_only()).await?;
            Ok(SearchOutcome {
                hits,
                degraded: true,
            })
        }
        Err(e) => Err(e),
    }
}

/// Embed `text` and rank the corpus against it. A blank query or a corpus
/// with no embedded chunks returns no hits without calling the embedder.
pub async fn retrieve(
    store: &dyn Store,
    embedder: &dyn TextEmbedder,
    text: &str,
    filters: SearchFilters,
    top_k: usize,
    params: &RankParams,
) -> Result<SearchOutcome> {
    if text.trim().is_empty() || store.corpus_dims().await?.is_none() {
        return Ok(SearchOutcome {
            hits: Vec::new(),
            degraded: false,
        });
    }
    let embedding = embed_one(embedder, text).await?;
    let query = Query {
        embedding,
        text: Some(text.to_string()),
        filters,
        top_k,
    };
    rank_with_fallback(store, &query, params).await
}

/// Print hits the way `crag search` shows them.
pub fn print_hits(outcome: &SearchOutcome) {
    if outcome.hits.is_empty() {
        println!("No results.");
        return;
    }
    if outcome.degraded {
        println!("(lexical ranking unavailable; vector-only results)");
    }
    for (i, hit) in outcome.hits.iter().enumerate() {
        let lexical = hit
            .lexical_score
            .map(|l| format!(" lexical={:.2}", l))
            .unwrap_or_default();
        println!(
            "{}. [{:.3}] {} ({}) vector={:.2}{}",
            i + 1,
            hit.score,
            hit.document_title,
            hit.chunk_id,
            hit.vector_score,
            lexical
        );
        if let Some(symbol) = &hit.symbol_name {
            let lines = match (hit.start_line, hit.end_line) {
                (Some(s), Some(e)) => format!(" lines {}-{}", s, e),
                _ => String::new(),
            };
            println!(
                "    {} {}{}",
                hit.language.as_deref().unwrap_or("code"),
                symbol,
                lines
            );
        }
        println!("    {}", hit.excerpt.replace('\n', " "));
    }
}
