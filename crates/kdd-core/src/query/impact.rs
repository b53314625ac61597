//! Impact query: who is affected when a node changes, directly and
//! transitively, plus the BDD features to re-run.

use crate::error::{KddError, Result};
use crate::query::QueryEngine;
use crate::types::{EdgeType, NodeId};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct ImpactQueryInput {
    pub node_id: String,
    pub change_type: String,
    pub depth: usize,
}

impl ImpactQueryInput {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            change_type: "modify_attribute".to_string(),
            depth: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AffectedNode {
    pub node_id: NodeId,
    pub edge_type: EdgeType,
    pub impact_description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitiveImpact {
    pub node_id: NodeId,
    /// Node IDs along the reverse path, analyzed node first.
    pub path: Vec<NodeId>,
    /// Edges visited, in traversal order.
    pub edge_types: Vec<EdgeType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioToRerun {
    pub scenario_name: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct ImpactQueryResult {
    pub node_id: NodeId,
    pub change_type: String,
    pub directly_affected: Vec<AffectedNode>,
    pub transitively_affected: Vec<TransitiveImpact>,
    pub scenarios_to_rerun: Vec<ScenarioToRerun>,
    pub total_directly: usize,
    pub total_transitively: usize,
    pub warnings: Vec<String>,
}

/// Fixed edge-type → human phrase table.
fn impact_description(edge_type: EdgeType) -> String {
    match edge_type {
        EdgeType::EntityRule => "Business rule validates this entity".to_string(),
        EdgeType::UcAppliesRule => "Use case applies this rule".to_string(),
        EdgeType::UcExecutesCmd => "Use case executes this command".to_string(),
        EdgeType::Emits => "Emits this event".to_string(),
        EdgeType::Consumes => "Consumes this event".to_string(),
        EdgeType::WikiLink => "References this artifact".to_string(),
        EdgeType::DomainRelation => "Has a domain relationship".to_string(),
        EdgeType::ReqTracesTo => "Requirement traces to this artifact".to_string(),
        EdgeType::Validates => "Validates this artifact via BDD scenarios".to_string(),
        other => format!("Connected via {other}"),
    }
}

impl QueryEngine {
    pub fn impact(&self, input: &ImpactQueryInput) -> Result<ImpactQueryResult> {
        if !self.graph_store().has_node(&input.node_id) {
            return Err(KddError::NodeNotFound(input.node_id.clone()));
        }

        // direct predecessors via incoming edges, one record per node
        let mut direct_seen: HashSet<NodeId> = HashSet::new();
        let mut directly_affected = Vec::new();
        for edge in self.graph_store().incoming_edges(&input.node_id) {
            if !direct_seen.insert(edge.from.clone()) {
                continue;
            }
            directly_affected.push(AffectedNode {
                node_id: edge.from.clone(),
                edge_type: edge.edge_type,
                impact_description: impact_description(edge.edge_type),
            });
        }

        // transitive predecessors, reachable only through deeper reverse BFS
        let mut transitively_affected = Vec::new();
        if input.depth > 1 {
            for (node, edge_path) in self.graph_store().reverse_traverse(&input.node_id, input.depth)
            {
                if direct_seen.contains(&node.id) || node.id == input.node_id {
                    continue;
                }
                let mut path = vec![input.node_id.clone()];
                path.extend(edge_path.iter().map(|edge| edge.from.clone()));
                transitively_affected.push(TransitiveImpact {
                    node_id: node.id.clone(),
                    path,
                    edge_types: edge_path.iter().map(|edge| edge.edge_type).collect(),
                });
            }
        }

        // BDD features validating anything in the affected set
        let affected: HashSet<&str> = direct_seen
            .iter()
            .map(String::as_str)
            .chain(transitively_affected.iter().map(|t| t.node_id.as_str()))
            .chain(std::iter::once(input.node_id.as_str()))
            .collect();
        let mut scenario_seen: HashSet<NodeId> = HashSet::new();
        let mut scenarios_to_rerun = Vec::new();
        for edge in self.graph_store().all_edges() {
            if edge.edge_type != EdgeType::Validates {
                continue;
            }
            if !affected.contains(edge.to.as_str()) {
                continue;
            }
            if !scenario_seen.insert(edge.from.clone()) {
                continue;
            }
            scenarios_to_rerun.push(ScenarioToRerun {
                scenario_name: edge.from.clone(),
                reason: format!("Validates {} which is affected", edge.to),
            });
        }

        Ok(ImpactQueryResult {
            node_id: input.node_id.clone(),
            change_type: input.change_type.clone(),
            total_directly: directly_affected.len(),
            total_transitively: transitively_affected.len(),
            directly_affected,
            transitively_affected,
            scenarios_to_rerun,
            warnings: Vec::new(),
        })
    }
}
