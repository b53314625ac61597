//! In-memory directed multigraph with typed edges.
//!
//! Edges live in one arena; adjacency indices are kept by node ID so
//! cyclic references never create ownership cycles. The store is loaded
//! once and treated as read-only while serving.

use crate::types::{GraphEdge, GraphNode, NodeId};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: HashMap<NodeId, GraphNode>,
    /// Insertion order, for deterministic iteration and text scans.
    node_order: Vec<NodeId>,
    edges: Vec<GraphEdge>,
    outgoing: HashMap<NodeId, Vec<usize>>,
    incoming: HashMap<NodeId, Vec<usize>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wipe and insert. Edges whose endpoints are not present are silently
    /// dropped, as are duplicates by `(from, to, edge_type)`.
    pub fn load(&mut self, nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) {
        self.nodes.clear();
        self.node_order.clear();
        self.edges.clear();
        self.outgoing.clear();
        self.incoming.clear();

        for node in nodes {
            if !self.nodes.contains_key(&node.id) {
                self.node_order.push(node.id.clone());
            }
            self.nodes.insert(node.id.clone(), node);
        }

        let mut seen = HashSet::new();
        for edge in edges {
            if !self.nodes.contains_key(&edge.from) || !self.nodes.contains_key(&edge.to) {
                continue;
            }
            if !seen.insert(edge.key()) {
                continue;
            }
            let index = self.edges.len();
            self.outgoing.entry(edge.from.clone()).or_default().push(index);
            self.incoming.entry(edge.to.clone()).or_default().push(index);
            self.edges.push(edge);
        }
    }

    pub fn get_node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn all_edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn outgoing_edges(&self, id: &str) -> Vec<&GraphEdge> {
        self.outgoing
            .get(id)
            .map(|indices| indices.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }

    pub fn incoming_edges(&self, id: &str) -> Vec<&GraphEdge> {
        self.incoming
            .get(id)
            .map(|indices| indices.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }

    /// Linear scan, case-insensitive substring match. Per node the search
    /// space is the stringified indexed fields (all of them, or the named
    /// subset), the node ID and every alias.
    pub fn text_search(&self, query: &str, fields: Option<&[String]>) -> Vec<&GraphNode> {
        let needle = query.to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.all_nodes()
            .filter(|node| {
                if node.id.to_lowercase().contains(&needle) {
                    return true;
                }
                if node
                    .aliases
                    .iter()
                    .any(|alias| alias.to_lowercase().contains(&needle))
                {
                    return true;
                }
                node.indexed_fields.iter().any(|(key, value)| {
                    if let Some(fields) = fields {
                        if !fields.iter().any(|f| f == key) {
                            return false;
                        }
                    }
                    stringify(value).to_lowercase().contains(&needle)
                })
            })
            .collect()
    }

    /// Every edge flagged as layer-violating.
    pub fn find_violations(&self) -> Vec<&GraphEdge> {
        self.edges.iter().filter(|e| e.layer_violation).collect()
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
