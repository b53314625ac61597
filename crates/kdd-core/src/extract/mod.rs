//! Extractor registry: one extractor per document kind, each producing
//! exactly one node and zero or more edges from a parsed document.
//!
//! Extractors never fail on missing sections; a missing section merely
//! omits the corresponding indexed field. All per-document edge lists are
//! deduplicated by `(from, to, edge_type)`.

mod behavior;
mod common;
mod domain;
mod helpers;

use crate::types::{Document, GraphEdge, GraphNode, KddKind};
use std::collections::HashSet;

pub use helpers::{list_items, parse_table, section_targets};

/// Dispatches a parsed document to the extractor for its kind.
#[derive(Debug, Default)]
pub struct ExtractorRegistry;

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Every kind in the closed set has an extractor.
    pub fn supports(&self, _kind: KddKind) -> bool {
        true
    }

    /// Produce the node and its deduplicated edge list.
    pub fn extract(&self, kind: KddKind, doc: &Document) -> (GraphNode, Vec<GraphEdge>) {
        let node = common::build_node(kind, doc);

        let mut edges = match kind {
            KddKind::Entity => domain::entity_edges(doc, &node.id),
            KddKind::BusinessRule | KddKind::BusinessPolicy | KddKind::CrossPolicy => {
                domain::rule_edges(kind, doc, &node.id)
            }
            KddKind::Command => behavior::command_edges(doc, &node.id),
            KddKind::UseCase => behavior::use_case_edges(doc, &node.id),
            // event, objective, prd, adr, requirement, glossary, query,
            // process, ui-view, ui-component: wiki-link edges only
            _ => Vec::new(),
        };
        edges.extend(common::wiki_link_edges(doc, &node.id));

        (node, dedupe_edges(edges))
    }
}

/// Drop edges sharing `(from, to, edge_type)`, keeping the first. Idempotent.
pub fn dedupe_edges(edges: Vec<GraphEdge>) -> Vec<GraphEdge> {
    let mut seen = HashSet::new();
    edges
        .into_iter()
        .filter(|edge| seen.insert(edge.key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use crate::types::{EdgeType, Layer};

    fn parse_doc(source_path: &str, content: &str) -> Document {
        let parsed = parser::parse(content);
        let document_id = parsed
            .front_matter
            .get("id")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| "doc".to_string());
        Document {
            document_id,
            source_path: source_path.to_string(),
            source_hash: "f".repeat(64),
            layer: Layer::from_path(source_path).unwrap_or(Layer::Domain),
            links: parser::extract_links(&parsed.body),
            front_matter: parsed.front_matter,
            sections: parsed.sections,
        }
    }

    #[test]
    fn entity_extraction_produces_node_and_edges() {
        let content = "---\nkind: entity\nid: Pedido\ntitle: Pedido\nstatus: approved\naliases:\n  - order\n---\n\
## Description\nAn order placed by a customer.\n\n\
## Relations\n| Relation | Entity | Cardinality |\n|---|---|---|\n| has | [[LineaPedido]] | 1..* |\n| belongs to | [[Cliente]] | 1 |\n\n\
## Lifecycle Events\n- [[EVT-001]] created\n- [[EVT-002]] cancelled\n";
        let doc = parse_doc("specs/01-domain/entities/Pedido.md", content);
        let registry = ExtractorRegistry::new();
        let (node, edges) = registry.extract(KddKind::Entity, &doc);

        assert_eq!(node.id, "entity:Pedido");
        assert_eq!(node.status, "approved");
        assert_eq!(node.aliases, vec!["order".to_string()]);
        assert_eq!(node.title(), Some("Pedido"));
        assert!(node.indexed_fields.contains_key("description"));
        assert!(node.indexed_fields.contains_key("relations"));

        let relations: Vec<&GraphEdge> = edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::DomainRelation)
            .collect();
        assert_eq!(relations.len(), 2);
        assert_eq!(relations[0].to, "entity:LineaPedido");
        assert_eq!(relations[0].metadata["relation"], "has");
        assert_eq!(relations[0].metadata["cardinality"], "1..*");

        let emits: Vec<&GraphEdge> = edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::Emits)
            .collect();
        assert_eq!(emits.len(), 2);
        assert_eq!(emits[0].to, "event:EVT-001");
        assert!(!emits[0].bidirectional);

        // every unique target also yields a wiki-link edge
        let wiki: Vec<&GraphEdge> = edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::WikiLink)
            .collect();
        assert_eq!(wiki.len(), 4);
        assert!(wiki.iter().all(|e| e.bidirectional));
    }

    #[test]
    fn wiki_link_to_higher_layer_is_flagged() {
        let content =
            "---\nkind: entity\nid: Pedido\n---\n## Description\nHandled by [[UC-001]].\n";
        let doc = parse_doc("specs/01-domain/entities/Pedido.md", content);
        let (_, edges) = ExtractorRegistry::new().extract(KddKind::Entity, &doc);
        let edge = edges
            .iter()
            .find(|e| e.edge_type == EdgeType::WikiLink)
            .unwrap();
        assert_eq!(edge.to, "use-case:UC-001");
        assert!(edge.layer_violation);
    }

    #[test]
    fn reversed_direction_is_not_a_violation() {
        let content =
            "---\nkind: use-case\nid: UC-001\n---\n## Description\nOperates on [[Pedido]].\n";
        let doc = parse_doc("specs/02-behavior/use-cases/UC-001.md", content);
        let (_, edges) = ExtractorRegistry::new().extract(KddKind::UseCase, &doc);
        let edge = edges
            .iter()
            .find(|e| e.edge_type == EdgeType::WikiLink)
            .unwrap();
        assert_eq!(edge.to, "entity:Pedido");
        assert!(!edge.layer_violation);
    }

    #[test]
    fn command_postconditions_emit_events() {
        let content = "---\nkind: command\nid: CMD-001\n---\n\
## Postconditions\n- [[EVT-010]] is published\n- state saved\n";
        let doc = parse_doc("specs/02-behavior/commands/CMD-001.md", content);
        let (node, edges) = ExtractorRegistry::new().extract(KddKind::Command, &doc);
        assert_eq!(node.id, "command:CMD-001");
        let emits: Vec<&GraphEdge> = edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::Emits)
            .collect();
        assert_eq!(emits.len(), 1);
        assert_eq!(emits[0].to, "event:EVT-010");
        // behavior → domain is downward, never a violation
        assert!(!emits[0].layer_violation);
    }

    #[test]
    fn business_rule_declaration_links_entities() {
        let content = "---\nkind: business-rule\nid: BR-001\n---\n\
## Declaration\nEvery [[Pedido]] must reference a [[Cliente]]; see [[EVT-001]].\n";
        let doc = parse_doc("specs/01-domain/rules/BR-001.md", content);
        let (_, edges) = ExtractorRegistry::new().extract(KddKind::BusinessRule, &doc);
        let rules: Vec<&GraphEdge> = edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::EntityRule)
            .collect();
        // typed EVT- target is not an entity target
        assert_eq!(rules.len(), 2);
        assert!(rules.iter().any(|e| e.to == "entity:Pedido"));
        assert!(rules.iter().any(|e| e.to == "entity:Cliente"));
    }

    #[test]
    fn use_case_edges_cover_rules_commands_and_story() {
        let content = "---\nkind: use-case\nid: UC-003\n---\n\
## Description\nSupports [[OBJ-002]].\n\n\
## Applied Rules\n- [[BR-001]]\n- [[BP-002]]\n- [[XP-001]]\n\n\
## Commands Executed\n- [[CMD-001]]\n";
        let doc = parse_doc("specs/02-behavior/use-cases/UC-003.md", content);
        let (_, edges) = ExtractorRegistry::new().extract(KddKind::UseCase, &doc);

        let applies: Vec<&str> = edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::UcAppliesRule)
            .map(|e| e.to.as_str())
            .collect();
        assert_eq!(
            applies,
            vec!["business-rule:BR-001", "business-policy:BP-002", "cross-policy:XP-001"]
        );

        let commands: Vec<&str> = edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::UcExecutesCmd)
            .map(|e| e.to.as_str())
            .collect();
        assert_eq!(commands, vec!["command:CMD-001"]);

        let stories: Vec<&str> = edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::UcStory)
            .map(|e| e.to.as_str())
            .collect();
        assert_eq!(stories, vec!["objective:OBJ-002"]);
    }

    #[test]
    fn bare_typed_ids_in_list_sections_become_edges() {
        let content = "---\nkind: use-case\nid: UC-007\n---\n\
## Applied Rules\n- BR-002 ordering constraint\n- [[BP-001]]\n\n\
## Commands Executed\n- CMD-009\n";
        let doc = parse_doc("specs/02-behavior/use-cases/UC-007.md", content);
        let (_, edges) = ExtractorRegistry::new().extract(KddKind::UseCase, &doc);

        let applies: Vec<&str> = edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::UcAppliesRule)
            .map(|e| e.to.as_str())
            .collect();
        assert_eq!(applies, vec!["business-policy:BP-001", "business-rule:BR-002"]);

        assert!(edges
            .iter()
            .any(|e| e.edge_type == EdgeType::UcExecutesCmd && e.to == "command:CMD-009"));
    }

    #[test]
    fn missing_sections_only_omit_fields() {
        let content = "---\nkind: entity\nid: Bare\n---\nNo headings here.\n";
        let doc = parse_doc("specs/01-domain/entities/Bare.md", content);
        let (node, edges) = ExtractorRegistry::new().extract(KddKind::Entity, &doc);
        assert_eq!(node.id, "entity:Bare");
        assert!(!node.indexed_fields.contains_key("description"));
        assert!(edges.is_empty());
    }

    #[test]
    fn wrong_typed_front_matter_is_coerced() {
        let content = "---\nkind: entity\nid: Odd\naliases: single\nstatus: 7\n---\n";
        let doc = parse_doc("specs/01-domain/entities/Odd.md", content);
        let (node, _) = ExtractorRegistry::new().extract(KddKind::Entity, &doc);
        assert_eq!(node.aliases, vec!["single".to_string()]);
        // non-string status falls back to the default
        assert_eq!(node.status, "draft");
    }

    #[test]
    fn duplicate_targets_collapse_to_one_edge_per_type() {
        let content = "---\nkind: entity\nid: Dup\n---\n\
## Description\n[[Cliente]] and again [[Cliente]].\n";
        let doc = parse_doc("specs/01-domain/entities/Dup.md", content);
        let (_, edges) = ExtractorRegistry::new().extract(KddKind::Entity, &doc);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].edge_type, EdgeType::WikiLink);
    }

    #[test]
    fn dedupe_is_idempotent() {
        let content = "---\nkind: entity\nid: Dup\n---\n## Description\n[[A]] [[B]] [[A]]\n";
        let doc = parse_doc("specs/01-domain/entities/Dup.md", content);
        let (_, edges) = ExtractorRegistry::new().extract(KddKind::Entity, &doc);
        let once = dedupe_edges(edges);
        let twice = dedupe_edges(once.clone());
        assert_eq!(once, twice);
    }
}
