//! Query engine over the loaded stores: hybrid, semantic, graph, impact,
//! coverage and layer-violation queries.
//!
//! Queries are pure functions over the frozen stores plus, on the
//! semantic paths, one call to the encoder. Every result carries a
//! `warnings` array summarizing degraded conditions.

mod coverage;
mod graph;
mod hybrid;
mod impact;
mod semantic;
mod violations;

pub use coverage::{CoverageCategory, CoverageQueryResult};
pub use graph::{GraphQueryInput, GraphQueryResult, RelatedNode};
pub use hybrid::{HybridQueryInput, HybridQueryResult, SearchResult};
pub use impact::{
    AffectedNode, ImpactQueryInput, ImpactQueryResult, ScenarioToRerun, TransitiveImpact,
};
pub use semantic::{SemanticQueryInput, SemanticQueryResult};
pub use violations::{ViolationRecord, ViolationsQueryInput, ViolationsQueryResult};

use crate::error::{KddError, Result};
use crate::graph::GraphStore;
use crate::types::{GraphNode, KddKind, Layer};
use crate::vector::{TextEncoder, VectorStore};
use serde::Serialize;
use std::sync::Arc;

/// Minimum free-text query length, after trimming.
const MIN_QUERY_CHARS: usize = 3;

/// Which phases contributed to a search result.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    Fusion,
    Semantic,
    Graph,
    Lexical,
}

impl std::fmt::Display for MatchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchSource::Fusion => f.write_str("fusion"),
            MatchSource::Semantic => f.write_str("semantic"),
            MatchSource::Graph => f.write_str("graph"),
            MatchSource::Lexical => f.write_str("lexical"),
        }
    }
}

pub struct QueryEngine {
    graph: Arc<GraphStore>,
    vector: Option<Arc<VectorStore>>,
    encoder: Option<Arc<dyn TextEncoder>>,
}

impl QueryEngine {
    pub fn new(
        graph: Arc<GraphStore>,
        vector: Option<Arc<VectorStore>>,
        encoder: Option<Arc<dyn TextEncoder>>,
    ) -> Self {
        Self {
            graph,
            vector,
            encoder,
        }
    }

    pub(crate) fn graph_store(&self) -> &GraphStore {
        &self.graph
    }

    pub(crate) fn vector_store(&self) -> Option<&VectorStore> {
        self.vector.as_deref()
    }

    pub(crate) fn encoder(&self) -> Option<&dyn TextEncoder> {
        self.encoder.as_deref()
    }

    /// Empty or too-short query text is rejected before any other work.
    pub(crate) fn validate_query_text(text: &str) -> Result<()> {
        let got = text.trim().chars().count();
        if got < MIN_QUERY_CHARS {
            return Err(KddError::QueryTooShort {
                min: MIN_QUERY_CHARS,
                got,
            });
        }
        Ok(())
    }

    /// Map an embedding ID back to its node: strip the `:chunk-N` suffix,
    /// then try every known kind prefix until one resolves.
    pub(crate) fn resolve_embedding_node(&self, embedding_id: &str) -> Option<&GraphNode> {
        let document_id = embedding_id
            .split_once(':')
            .map(|(head, _)| head)
            .unwrap_or(embedding_id);
        KddKind::all()
            .iter()
            .find_map(|kind| self.graph.get_node(&kind.node_id(document_id)))
    }

    pub(crate) fn passes_filters(
        node: &GraphNode,
        kinds: Option<&[KddKind]>,
        layers: Option<&[Layer]>,
    ) -> bool {
        if let Some(kinds) = kinds {
            if !kinds.contains(&node.kind) {
                return false;
            }
        }
        if let Some(layers) = layers {
            if !layers.contains(&node.layer) {
                return false;
            }
        }
        true
    }

    /// `[<kind>] <title or id>`
    pub(crate) fn snippet(node: &GraphNode) -> String {
        format!("[{}] {}", node.kind, node.title().unwrap_or(&node.id))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_query_text_is_rejected() {
        assert!(QueryEngine::validate_query_text("").is_err());
        assert!(QueryEngine::validate_query_text("  ab ").is_err());
        assert!(QueryEngine::validate_query_text("abc").is_ok());
    }

    #[test]
    fn embedding_ids_resolve_through_kind_prefixes() {
        let engine = test_support::engine(
            vec![test_support::node("entity:Pedido", KddKind::Entity)],
            vec![],
        );
        let node = engine.resolve_embedding_node("Pedido:chunk-3").unwrap();
        assert_eq!(node.id, "entity:Pedido");
        assert!(engine.resolve_embedding_node("Ghost:chunk-0").is_none());
    }

    #[test]
    fn snippet_prefers_title_over_id() {
        let mut node = test_support::node("entity:Pedido", KddKind::Entity);
        assert_eq!(QueryEngine::snippet(&node), "[entity] entity:Pedido");
        node.indexed_fields
            .insert("title".into(), serde_json::json!("Pedido aggregate"));
        assert_eq!(QueryEngine::snippet(&node), "[entity] Pedido aggregate");
    }
}
