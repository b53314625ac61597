//! Graph query: bounded neighborhood around a root node, scored by
//! distance.

use crate::error::{KddError, Result};
use crate::query::QueryEngine;
use crate::types::{EdgeType, GraphEdge, GraphNode, KddKind, NodeId};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone)]
pub struct GraphQueryInput {
    pub root_node: String,
    pub depth: usize,
    pub edge_types: Option<Vec<EdgeType>>,
    pub include_kinds: Option<Vec<KddKind>>,
    pub respect_layers: bool,
}

impl GraphQueryInput {
    pub fn new(root_node: impl Into<String>) -> Self {
        Self {
            root_node: root_node.into(),
            depth: 2,
            edge_types: None,
            include_kinds: None,
            respect_layers: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RelatedNode {
    pub node_id: NodeId,
    pub score: f64,
    pub snippet: String,
}

#[derive(Debug, Serialize)]
pub struct GraphQueryResult {
    pub center_node: GraphNode,
    pub related_nodes: Vec<RelatedNode>,
    pub edges: Vec<GraphEdge>,
    pub total_nodes: usize,
    pub total_edges: usize,
    pub warnings: Vec<String>,
}

impl QueryEngine {
    pub fn graph_query(&self, input: &GraphQueryInput) -> Result<GraphQueryResult> {
        let center = self
            .graph_store()
            .get_node(&input.root_node)
            .ok_or_else(|| KddError::NodeNotFound(input.root_node.clone()))?
            .clone();

        let traversal = self.graph_store().traverse(
            &input.root_node,
            input.depth,
            input.edge_types.as_deref(),
            input.respect_layers,
        );

        // graph distance over the undirected adjacency of the returned edges
        let distances = bfs_distances(&input.root_node, &traversal.edges);

        let mut related_nodes: Vec<RelatedNode> = traversal
            .nodes
            .iter()
            .filter(|node| node.id != input.root_node)
            .filter(|node| match &input.include_kinds {
                Some(kinds) => kinds.contains(&node.kind),
                None => true,
            })
            .map(|node| {
                let distance = distances.get(node.id.as_str()).copied().unwrap_or(input.depth);
                RelatedNode {
                    node_id: node.id.clone(),
                    score: 1.0 / (1.0 + distance as f64),
                    snippet: Self::snippet(node),
                }
            })
            .collect();
        related_nodes
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        Ok(GraphQueryResult {
            center_node: center,
            total_nodes: related_nodes.len(),
            total_edges: traversal.edges.len(),
            related_nodes,
            edges: traversal.edges,
            warnings: Vec::new(),
        })
    }
}

fn bfs_distances<'a>(root: &'a str, edges: &'a [GraphEdge]) -> HashMap<&'a str, usize> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        adjacency.entry(&edge.from).or_default().push(&edge.to);
        adjacency.entry(&edge.to).or_default().push(&edge.from);
    }

    let mut distances = HashMap::new();
    distances.insert(root, 0usize);
    let mut queue = VecDeque::from([root]);
    while let Some(current) = queue.pop_front() {
        let distance = distances[current];
        if let Some(neighbors) = adjacency.get(current) {
            for neighbor in neighbors {
                if !distances.contains_key(neighbor) {
                    distances.insert(neighbor, distance + 1);
                    queue.push_back(neighbor);
                }
            }
        }
    }
    distances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::test_support::{edge, engine, node};
    use crate::types::KddKind;

    fn chain_engine() -> QueryEngine {
        // A → B → C
        engine(
            vec![
                node("entity:A", KddKind::Entity),
                node("entity:B", KddKind::Entity),
                node("event:C", KddKind::Event),
            ],
            vec![
                edge("entity:A", "entity:B", EdgeType::DomainRelation),
                edge("entity:B", "event:C", EdgeType::Emits),
            ],
        )
    }

    #[test]
    fn unknown_root_fails() {
        let engine = chain_engine();
        let result = engine.graph_query(&GraphQueryInput::new("entity:Ghost"));
        assert!(matches!(result, Err(KddError::NodeNotFound(_))));
    }

    #[test]
    fn scores_decay_with_distance() {
        let engine = chain_engine();
        let result = engine.graph_query(&GraphQueryInput::new("entity:A")).unwrap();
        assert_eq!(result.center_node.id, "entity:A");
        assert_eq!(result.total_nodes, 2);
        assert_eq!(result.related_nodes[0].node_id, "entity:B");
        assert!((result.related_nodes[0].score - 0.5).abs() < 1e-9);
        assert_eq!(result.related_nodes[1].node_id, "event:C");
        assert!((result.related_nodes[1].score - (1.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn kind_filter_applies_to_related_nodes() {
        let engine = chain_engine();
        let mut input = GraphQueryInput::new("entity:A");
        input.include_kinds = Some(vec![KddKind::Event]);
        let result = engine.graph_query(&input).unwrap();
        assert_eq!(result.total_nodes, 1);
        assert_eq!(result.related_nodes[0].node_id, "event:C");
        // edges are not filtered by kind
        assert_eq!(result.total_edges, 2);
    }

    #[test]
    fn depth_limits_neighborhood() {
        let engine = chain_engine();
        let mut input = GraphQueryInput::new("entity:A");
        input.depth = 1;
        let result = engine.graph_query(&input).unwrap();
        assert_eq!(result.total_nodes, 1);
        assert_eq!(result.related_nodes[0].node_id, "entity:B");
    }
}
