//! Hybrid query: fuses semantic, lexical and graph evidence per node.

use crate::error::Result;
use crate::query::{MatchSource, QueryEngine};
use crate::types::{GraphEdge, KddKind, Layer, NodeId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct HybridQueryInput {
    pub query_text: String,
    pub expand_graph: bool,
    pub depth: usize,
    pub include_kinds: Option<Vec<KddKind>>,
    pub include_layers: Option<Vec<Layer>>,
    pub respect_layers: bool,
    pub min_score: f64,
    pub limit: usize,
    pub max_tokens: usize,
}

impl Default for HybridQueryInput {
    fn default() -> Self {
        Self {
            query_text: String::new(),
            expand_graph: true,
            depth: 2,
            include_kinds: None,
            include_layers: None,
            respect_layers: true,
            min_score: 0.5,
            limit: 10,
            max_tokens: 8000,
        }
    }
}

impl HybridQueryInput {
    pub fn new(query_text: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub node_id: NodeId,
    pub score: f64,
    pub snippet: String,
    pub match_source: MatchSource,
}

#[derive(Debug, Serialize)]
pub struct HybridQueryResult {
    pub results: Vec<SearchResult>,
    pub edges: Vec<GraphEdge>,
    pub total_results: usize,
    pub total_tokens: usize,
    pub warnings: Vec<String>,
}

/// Per-node evidence accumulated across the phases. The flat 0.5 scores
/// for lexical and graph hits are intentional.
#[derive(Debug, Clone, Copy, Default)]
struct Evidence {
    semantic: f64,
    graph: f64,
    lexical: f64,
}

/// Evidence map preserving first-touch insertion order, so ties stay
/// deterministic through the final stable sort.
#[derive(Default)]
struct EvidenceMap {
    order: Vec<NodeId>,
    scores: HashMap<NodeId, Evidence>,
}

impl EvidenceMap {
    fn entry(&mut self, node_id: &str) -> &mut Evidence {
        if !self.scores.contains_key(node_id) {
            self.order.push(node_id.to_string());
        }
        self.scores.entry(node_id.to_string()).or_default()
    }
}

impl QueryEngine {
    pub fn hybrid(&self, input: &HybridQueryInput) -> Result<HybridQueryResult> {
        Self::validate_query_text(&input.query_text)?;

        let mut warnings = Vec::new();
        let mut evidence = EvidenceMap::default();

        // 1. semantic phase
        match (self.vector_store(), self.encoder()) {
            (Some(vector), Some(encoder)) => {
                let vectors = encoder.encode(std::slice::from_ref(&input.query_text))?;
                if let Some(query_vector) = vectors.first() {
                    let hits =
                        vector.search(query_vector, input.limit * 3, input.min_score * 0.8);
                    for (embedding_id, score) in hits {
                        if let Some(node) = self.resolve_embedding_node(&embedding_id) {
                            let id = node.id.clone();
                            let entry = evidence.entry(&id);
                            entry.semantic = entry.semantic.max(score);
                        }
                    }
                }
            }
            _ => warnings.push("NO_EMBEDDINGS".to_string()),
        }

        // 2. lexical phase
        let lexical_ids: Vec<NodeId> = self
            .graph_store()
            .text_search(&input.query_text, None)
            .into_iter()
            .filter(|node| {
                Self::passes_filters(
                    node,
                    input.include_kinds.as_deref(),
                    input.include_layers.as_deref(),
                )
            })
            .map(|node| node.id.clone())
            .collect();
        for id in lexical_ids {
            evidence.entry(&id).lexical = 0.5;
        }

        // 3. graph expansion from every evidenced node
        let mut edges: Vec<GraphEdge> = Vec::new();
        let mut edge_keys: HashSet<String> = HashSet::new();
        if input.expand_graph {
            let seeds: Vec<NodeId> = evidence
                .order
                .iter()
                .filter(|id| self.graph_store().has_node(id))
                .cloned()
                .collect();
            let seed_set: HashSet<&NodeId> = seeds.iter().collect();

            for seed in &seeds {
                let traversal =
                    self.graph_store()
                        .traverse(seed, input.depth, None, input.respect_layers);
                for edge in traversal.edges {
                    if edge_keys.insert(edge.key()) {
                        edges.push(edge);
                    }
                }
                let discovered: Vec<NodeId> = traversal
                    .nodes
                    .iter()
                    .filter(|node| !seed_set.contains(&node.id))
                    .filter(|node| {
                        Self::passes_filters(
                            node,
                            input.include_kinds.as_deref(),
                            input.include_layers.as_deref(),
                        )
                    })
                    .map(|node| node.id.clone())
                    .collect();
                for id in discovered {
                    evidence.entry(&id).graph = 0.5;
                }
            }
        }

        // 4. fusion: 0.6·semantic + 0.6·graph + 0.2·lexical + source bonus,
        //    normalized by the fixed 1.2 divisor
        let mut fused: Vec<SearchResult> = Vec::new();
        for node_id in &evidence.order {
            let Some(node) = self.graph_store().get_node(node_id) else {
                continue;
            };
            if !Self::passes_filters(
                node,
                input.include_kinds.as_deref(),
                input.include_layers.as_deref(),
            ) {
                continue;
            }
            let e = evidence.scores[node_id];
            let sources = [e.semantic, e.graph, e.lexical]
                .iter()
                .filter(|s| **s > 0.0)
                .count();
            let raw = 0.6 * e.semantic
                + 0.6 * e.graph
                + 0.2 * e.lexical
                + 0.1 * sources.saturating_sub(1) as f64;
            let score = (raw / 1.2).min(1.0);
            if score < input.min_score {
                continue;
            }
            let match_source = match (e.semantic > 0.0, e.graph > 0.0) {
                (true, true) => MatchSource::Fusion,
                (true, false) => MatchSource::Semantic,
                (false, true) => MatchSource::Graph,
                (false, false) => MatchSource::Lexical,
            };
            fused.push(SearchResult {
                node_id: node_id.clone(),
                score,
                snippet: Self::snippet(node),
                match_source,
            });
        }

        // 5. ordering and token budget; the first result is always kept
        fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        let mut results = Vec::new();
        let mut total_tokens = 0usize;
        for (index, result) in fused.into_iter().enumerate() {
            if results.len() >= input.limit {
                break;
            }
            let cost = (result.snippet.len() / 4).max(1);
            if index > 0 && total_tokens + cost > input.max_tokens {
                break;
            }
            total_tokens += cost;
            results.push(result);
        }

        debug!(
            results = results.len(),
            tokens = total_tokens,
            warnings = warnings.len(),
            "hybrid query finished"
        );

        Ok(HybridQueryResult {
            total_results: results.len(),
            results,
            edges,
            total_tokens,
            warnings,
        })
    }
}
