//! Coverage query: per-kind governance categories checked against the
//! node's incident edges.

use crate::error::{KddError, Result};
use crate::query::QueryEngine;
use crate::types::{EdgeType, KddKind, NodeId};
use serde::Serialize;

/// `(category name, description, required edge type)`
type CoverageRule = (&'static str, &'static str, EdgeType);

/// Fixed coverage rules per kind; kinds absent from this table are
/// unsupported.
fn coverage_rules(kind: KddKind) -> Option<&'static [CoverageRule]> {
    match kind {
        KddKind::Entity => Some(&[
            ("events", "Domain events emitted by this entity", EdgeType::Emits),
            (
                "business_rules",
                "Business rules validating this entity",
                EdgeType::EntityRule,
            ),
            (
                "use_cases",
                "Use cases referencing this entity",
                EdgeType::WikiLink,
            ),
        ]),
        KddKind::Command => Some(&[
            ("emitted_events", "Events emitted by this command", EdgeType::Emits),
            (
                "use_cases",
                "Use cases executing this command",
                EdgeType::UcExecutesCmd,
            ),
            (
                "scenarios",
                "BDD scenarios validating this command",
                EdgeType::Validates,
            ),
        ]),
        KddKind::UseCase => Some(&[
            ("applied_rules", "Rules applied by this use case", EdgeType::UcAppliesRule),
            ("commands", "Commands executed by this use case", EdgeType::UcExecutesCmd),
            ("objectives", "Objectives this use case serves", EdgeType::UcStory),
            (
                "scenarios",
                "BDD scenarios validating this use case",
                EdgeType::Validates,
            ),
        ]),
        KddKind::BusinessRule => Some(&[
            ("entities", "Entities this rule constrains", EdgeType::EntityRule),
            ("use_cases", "Use cases applying this rule", EdgeType::UcAppliesRule),
            (
                "scenarios",
                "BDD scenarios validating this rule",
                EdgeType::Validates,
            ),
        ]),
        KddKind::Requirement => Some(&[
            ("traces", "Artifacts this requirement traces to", EdgeType::ReqTracesTo),
            (
                "scenarios",
                "BDD scenarios validating this requirement",
                EdgeType::Validates,
            ),
        ]),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageCategory {
    pub name: String,
    pub description: String,
    /// `"covered"` or `"missing"`.
    pub status: String,
    pub found: Vec<NodeId>,
}

#[derive(Debug, Serialize)]
pub struct CoverageQueryResult {
    pub node_id: NodeId,
    pub kind: KddKind,
    pub categories: Vec<CoverageCategory>,
    pub coverage_percent: f64,
    pub warnings: Vec<String>,
}

impl QueryEngine {
    pub fn coverage(&self, node_id: &str) -> Result<CoverageQueryResult> {
        let node = self
            .graph_store()
            .get_node(node_id)
            .ok_or_else(|| KddError::NodeNotFound(node_id.to_string()))?;

        let rules = coverage_rules(node.kind).ok_or_else(|| KddError::UnknownKind {
            node_id: node_id.to_string(),
            kind: node.kind.to_string(),
        })?;

        let mut incident = self.graph_store().outgoing_edges(node_id);
        incident.extend(self.graph_store().incoming_edges(node_id));

        let mut categories = Vec::with_capacity(rules.len());
        let mut present = 0usize;
        for (name, description, edge_type) in rules {
            let mut found: Vec<NodeId> = Vec::new();
            for edge in &incident {
                if edge.edge_type != *edge_type {
                    continue;
                }
                let other = if edge.from == node_id {
                    edge.to.clone()
                } else {
                    edge.from.clone()
                };
                if !found.contains(&other) {
                    found.push(other);
                }
            }
            let status = if found.is_empty() { "missing" } else { "covered" };
            if !found.is_empty() {
                present += 1;
            }
            categories.push(CoverageCategory {
                name: (*name).to_string(),
                description: (*description).to_string(),
                status: status.to_string(),
                found,
            });
        }

        let coverage_percent = if categories.is_empty() {
            0.0
        } else {
            (present as f64 / categories.len() as f64 * 1000.0).round() / 10.0
        };

        Ok(CoverageQueryResult {
            node_id: node_id.to_string(),
            kind: node.kind,
            categories,
            coverage_percent,
            warnings: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::test_support::{edge, engine, node};

    #[test]
    fn unknown_node_fails() {
        let engine = engine(vec![], vec![]);
        assert!(matches!(
            engine.coverage("entity:Ghost"),
            Err(KddError::NodeNotFound(_))
        ));
    }

    #[test]
    fn kinds_without_rules_are_unsupported() {
        let engine = engine(vec![node("event:EVT-001", KddKind::Event)], vec![]);
        assert!(matches!(
            engine.coverage("event:EVT-001"),
            Err(KddError::UnknownKind { .. })
        ));
    }

    #[test]
    fn entity_with_one_event_covers_one_of_three() {
        let engine = engine(
            vec![
                node("entity:E", KddKind::Entity),
                node("event:EVT-001", KddKind::Event),
            ],
            vec![edge("entity:E", "event:EVT-001", EdgeType::Emits)],
        );
        let result = engine.coverage("entity:E").unwrap();
        assert_eq!(result.categories.len(), 3);

        let events = &result.categories[0];
        assert_eq!(events.name, "events");
        assert_eq!(events.status, "covered");
        assert_eq!(events.found, vec!["event:EVT-001".to_string()]);

        assert_eq!(result.categories[1].name, "business_rules");
        assert_eq!(result.categories[1].status, "missing");
        assert_eq!(result.categories[2].name, "use_cases");
        assert_eq!(result.categories[2].status, "missing");

        assert!((result.coverage_percent - 33.3).abs() < 1e-9);
    }

    #[test]
    fn incoming_edges_also_count() {
        let engine = engine(
            vec![
                node("entity:E", KddKind::Entity),
                node("business-rule:R", KddKind::BusinessRule),
            ],
            vec![edge("business-rule:R", "entity:E", EdgeType::EntityRule)],
        );
        let result = engine.coverage("entity:E").unwrap();
        let rules_category = result
            .categories
            .iter()
            .find(|c| c.name == "business_rules")
            .unwrap();
        assert_eq!(rules_category.status, "covered");
        assert_eq!(rules_category.found, vec!["business-rule:R".to_string()]);
    }

    #[test]
    fn full_coverage_is_one_hundred() {
        let engine = engine(
            vec![
                node("requirement:REQ-001", KddKind::Requirement),
                node("entity:E", KddKind::Entity),
                node("entity:Feature", KddKind::Entity),
            ],
            vec![
                edge("requirement:REQ-001", "entity:E", EdgeType::ReqTracesTo),
                edge("entity:Feature", "requirement:REQ-001", EdgeType::Validates),
            ],
        );
        let result = engine.coverage("requirement:REQ-001").unwrap();
        assert!((result.coverage_percent - 100.0).abs() < 1e-9);
    }
}
