//! Semantic query: pure vector search resolved back to graph nodes.

use crate::error::Result;
use crate::query::{MatchSource, QueryEngine, SearchResult};
use crate::types::{KddKind, Layer};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct SemanticQueryInput {
    pub query_text: String,
    pub include_kinds: Option<Vec<KddKind>>,
    pub include_layers: Option<Vec<Layer>>,
    pub min_score: f64,
    pub limit: usize,
}

impl Default for SemanticQueryInput {
    fn default() -> Self {
        Self {
            query_text: String::new(),
            include_kinds: None,
            include_layers: None,
            min_score: 0.7,
            limit: 10,
        }
    }
}

impl SemanticQueryInput {
    pub fn new(query_text: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SemanticQueryResult {
    pub results: Vec<SearchResult>,
    pub total_results: usize,
    pub warnings: Vec<String>,
}

impl QueryEngine {
    pub fn semantic(&self, input: &SemanticQueryInput) -> Result<SemanticQueryResult> {
        Self::validate_query_text(&input.query_text)?;

        let (Some(vector), Some(encoder)) = (self.vector_store(), self.encoder()) else {
            return Ok(SemanticQueryResult {
                results: Vec::new(),
                total_results: 0,
                warnings: vec!["NO_EMBEDDINGS".to_string()],
            });
        };

        let vectors = encoder.encode(std::slice::from_ref(&input.query_text))?;
        let Some(query_vector) = vectors.first() else {
            return Ok(SemanticQueryResult {
                results: Vec::new(),
                total_results: 0,
                warnings: vec!["NO_EMBEDDINGS".to_string()],
            });
        };

        let hits = vector.search(query_vector, input.limit * 3, input.min_score);

        let mut seen: HashSet<String> = HashSet::new();
        let mut results = Vec::new();
        for (embedding_id, score) in hits {
            if results.len() >= input.limit {
                break;
            }
            // internal lookup misses are dropped silently
            let Some(node) = self.resolve_embedding_node(&embedding_id) else {
                continue;
            };
            if !seen.insert(node.id.clone()) {
                continue;
            }
            if !Self::passes_filters(
                node,
                input.include_kinds.as_deref(),
                input.include_layers.as_deref(),
            ) {
                continue;
            }
            results.push(SearchResult {
                node_id: node.id.clone(),
                score,
                snippet: Self::snippet(node),
                match_source: MatchSource::Semantic,
            });
        }

        Ok(SemanticQueryResult {
            total_results: results.len(),
            results,
            warnings: Vec::new(),
        })
    }
}
