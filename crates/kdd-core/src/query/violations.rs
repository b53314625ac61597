//! Layer-violation query: every flagged edge, with endpoint filters and an
//! overall rate.

use crate::error::Result;
use crate::query::QueryEngine;
use crate::types::{EdgeType, GraphNode, KddKind, Layer, NodeId};
use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct ViolationsQueryInput {
    pub include_kinds: Option<Vec<KddKind>>,
    pub include_layers: Option<Vec<Layer>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViolationRecord {
    pub from: NodeId,
    pub to: NodeId,
    pub from_layer: Layer,
    pub to_layer: Layer,
    pub edge_type: EdgeType,
}

#[derive(Debug, Serialize)]
pub struct ViolationsQueryResult {
    pub violations: Vec<ViolationRecord>,
    pub total_violations: usize,
    pub total_edges_analyzed: usize,
    /// Percent, rounded to two decimals; zero when the graph has no edges.
    pub violation_rate: f64,
    pub warnings: Vec<String>,
}

impl QueryEngine {
    pub fn violations(&self, input: &ViolationsQueryInput) -> Result<ViolationsQueryResult> {
        let total_edges = self.graph_store().edge_count();

        let endpoint_passes = |node: Option<&GraphNode>| -> bool {
            let Some(node) = node else { return false };
            Self::passes_filters(
                node,
                input.include_kinds.as_deref(),
                input.include_layers.as_deref(),
            )
        };

        let mut violations = Vec::new();
        for edge in self.graph_store().find_violations() {
            let from_node = self.graph_store().get_node(&edge.from);
            let to_node = self.graph_store().get_node(&edge.to);
            if !endpoint_passes(from_node) && !endpoint_passes(to_node) {
                continue;
            }
            let (Some(from_node), Some(to_node)) = (from_node, to_node) else {
                continue;
            };
            violations.push(ViolationRecord {
                from: edge.from.clone(),
                to: edge.to.clone(),
                from_layer: from_node.layer,
                to_layer: to_node.layer,
                edge_type: edge.edge_type,
            });
        }

        let violation_rate = if total_edges == 0 {
            0.0
        } else {
            (violations.len() as f64 / total_edges as f64 * 10_000.0).round() / 100.0
        };

        Ok(ViolationsQueryResult {
            total_violations: violations.len(),
            violations,
            total_edges_analyzed: total_edges,
            violation_rate,
            warnings: Vec::new(),
        })
    }
}
