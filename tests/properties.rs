use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use course_rag::chunk::code::{boundary_spans, find_boundaries};
use course_rag::chunk::fixed::{chunk_fixed, window_spans};
use course_rag::chunk::heading::chunk_headings;
use course_rag::chunk::Language;
use course_rag::config::{ChunkingConfig, ValidationConfig};
use course_rag::embedding::{cosine_similarity, TextEmbedder};
use course_rag::generation::DisabledGenerator;
use course_rag::models::{Chunk, ContentKind, Document};
use course_rag::rank::{fuse, rank, Query, RankParams, SearchFilters};
use course_rag::store::{InMemoryStore, Store};
use course_rag::validate::{fuse_scores, verdict_for, OutputKind, Validator};
use course_rag::Result;
use proptest::prelude::*;

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(f)
}

struct ConstEmbedder;

#[async_trait]
impl TextEmbedder for ConstEmbedder {
    fn model_name(&self) -> &str {
        "const"
    }
    fn dims(&self) -> usize {
        3
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0, 1.0]).collect())
    }
}

fn python_source() -> impl Strategy<Value = String> {
    let line = prop_oneof![
        Just("def f(x):".to_string()),
        Just("    return x".to_string()),
        Just("class Node:".to_string()),
        Just("    def walk(self):".to_string()),
        Just(String::new()),
        "[a-z =()]{0,24}",
    ];
    prop::collection::vec(line, 0..30).prop_map(|lines| lines.join("\n"))
}

proptest! {
    #[test]
    fn windows_cover_and_progress(len in 0usize..500, max in 0usize..64, overlap in 0usize..96) {
        let spans = window_spans(len, max, overlap);
        if len == 0 {
            prop_assert!(spans.is_empty());
        } else {
            prop_assert_eq!(spans[0].0, 0);
            prop_assert_eq!(spans[spans.len() - 1].1, len);
            for w in spans.windows(2) {
                prop_assert!(w[1].0 > w[0].0, "no forward progress: {:?}", w);
                prop_assert!(w[1].0 <= w[0].1, "gap between windows: {:?}", w);
            }
            prop_assert!(spans.len() <= len);
        }
    }

    #[test]
    fn fixed_chunks_reconstruct_text(text in "[a-z0-9]{1,300}", max in 1usize..50, overlap in 0usize..60) {
        let chars: Vec<char> = text.chars().collect();
        let spans = window_spans(chars.len(), max, overlap);
        let pieces = chunk_fixed(&text, max, overlap);
        prop_assert_eq!(pieces.len(), spans.len());

        let mut rebuilt = String::new();
        let mut covered = 0;
        for ((start, end), piece) in spans.iter().zip(&pieces) {
            let expected: String = chars[*start..*end].iter().collect();
            prop_assert_eq!(piece, &expected);
            rebuilt.extend(&chars[covered.max(*start)..*end]);
            covered = *end;
        }
        prop_assert_eq!(rebuilt, text.clone());
        prop_assert_eq!(chunk_fixed(&text, max, overlap), pieces);
    }

    #[test]
    fn headingless_prose_matches_fixed(text in "[a-zA-Z .,\n]{0,400}", max in 1usize..120, overlap in 0usize..40) {
        let config = ChunkingConfig {
            max_chars: max,
            overlap,
            ..ChunkingConfig::default()
        };
        prop_assert_eq!(chunk_headings(&text, &config), chunk_fixed(&text, max, overlap));
    }

    #[test]
    fn code_spans_are_gap_free(source in python_source()) {
        let boundaries = find_boundaries(&source, Language::Python);
        let spans = boundary_spans(&source, &boundaries);
        prop_assert_eq!(spans[0].0, 0);
        prop_assert_eq!(spans[spans.len() - 1].1, source.len());
        for w in spans.windows(2) {
            prop_assert_eq!(w[0].1, w[1].0);
            prop_assert!(w[0].0 < w[0].1);
        }
    }

    #[test]
    fn fusion_is_monotonic(a in 0.0f64..1.0, b in 0.0f64..1.0, other in 0.0f64..1.0) {
        let params = RankParams::default();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(fuse(lo, Some(other), &params) <= fuse(hi, Some(other), &params));
        prop_assert!(fuse(other, Some(lo), &params) <= fuse(other, Some(hi), &params));
        let s = fuse(hi, Some(hi), &params);
        prop_assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn fused_validation_score_is_bounded(scores in prop::array::uniform4(0.0f64..=1.0)) {
        let c = ValidationConfig::default();
        let mut parts = BTreeMap::new();
        parts.insert("syntax", (scores[0], c.syntax_weight));
        parts.insert("grounding", (scores[1], c.grounding_weight));
        parts.insert("rubric", (scores[2], c.rubric_weight));
        parts.insert("ai_eval", (scores[3], c.ai_eval_weight));
        let final_score = fuse_scores(&parts);
        prop_assert!((0.0..=1.0).contains(&final_score));
        prop_assert_eq!(verdict_for(final_score, &c), verdict_for(final_score, &c));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn vector_only_order_is_cosine_order(
        vectors in prop::collection::vec(prop::array::uniform2(-1.0f32..1.0), 1..20),
        query in prop::array::uniform2(-1.0f32..1.0),
    ) {
        let store = InMemoryStore::new();
        let chunks: Vec<Chunk> = vectors
            .iter()
            .enumerate()
            .map(|(i, v)| Chunk {
                id: Chunk::make_id("d", i as i64),
                document_id: "d".into(),
                chunk_index: i as i64,
                text: format!("chunk {i}"),
                language: None,
                symbol_name: None,
                start_line: None,
                end_line: None,
                hash: String::new(),
                embedding: Some(v.to_vec()),
            })
            .collect();

        let top_k = 10;
        let hits = block_on(async {
            store
                .upsert_document(&Document {
                    id: "d".into(),
                    course_id: None,
                    category: None,
                    title: "D".into(),
                    source_path: "d.md".into(),
                    kind: ContentKind::Text,
                    created_at: 0,
                })
                .await
                .unwrap();
            store.replace_chunks("d", &chunks).await.unwrap();
            let q = Query {
                embedding: query.to_vec(),
                text: Some("chunk".into()),
                filters: SearchFilters::default(),
                top_k,
            };
            rank(&store, &q, &RankParams::default().vector_only()).await.unwrap()
        });

        let mut expected: Vec<f64> = vectors
            .iter()
            .map(|v| cosine_similarity(v, &query) as f64)
            .collect();
        expected.sort_by(|a, b| b.partial_cmp(a).unwrap());
        expected.truncate(top_k);

        let got: Vec<f64> = hits.iter().map(|h| h.vector_score).collect();
        prop_assert_eq!(got, expected);
        for h in &hits {
            prop_assert_eq!(h.score, h.vector_score.clamp(0.0, 1.0));
        }
        prop_assert!(hits.iter().all(|h| h.lexical_score.is_none()));
    }

    #[test]
    fn validator_is_bounded_and_neutral_without_sources(content in ".{0,300}", lab in any::<bool>()) {
        let validator = Validator::new(
            Arc::new(ConstEmbedder),
            Arc::new(DisabledGenerator),
            ValidationConfig::default(),
        );
        let kind = if lab { OutputKind::LabCode } else { OutputKind::TheoryNotes };
        let report = block_on(validator.validate(&content, kind, "topic", &[]));
        prop_assert!((0.0..=1.0).contains(&report.final_score));
        prop_assert_eq!(report.grounding_score, 0.5);
        prop_assert_eq!(report.verdict, verdict_for(report.final_score, &ValidationConfig::default()));
    }
}
