//! Edge extraction for the behavior-layer kinds: command, use-case.

use crate::extract::domain::section_for;
use crate::extract::{common, helpers};
use crate::types::{Document, EdgeType, GraphEdge, KddKind, NodeId};
use serde_json::Map;

/// Command edges: `EMITS` per `EVT-*` target in the postconditions section.
pub fn command_edges(doc: &Document, from: &NodeId) -> Vec<GraphEdge> {
    let mut edges = Vec::new();
    if let Some(section) = section_for(doc, KddKind::Command, "postconditions") {
        for target in helpers::section_targets(&section.body) {
            if target.starts_with("EVT-") {
                edges.push(common::edge_to_target(
                    doc,
                    from,
                    &target,
                    EdgeType::Emits,
                    "postconditions_section",
                    Map::new(),
                ));
            }
        }
    }
    edges
}

/// Use-case edges: `UC_APPLIES_RULE` to rule-family targets in the
/// applied-rules section, `UC_EXECUTES_CMD` to `CMD-*` targets in the
/// commands-executed section, `UC_STORY` to `OBJ-*` targets anywhere in
/// the document.
pub fn use_case_edges(doc: &Document, from: &NodeId) -> Vec<GraphEdge> {
    let mut edges = Vec::new();

    if let Some(section) = section_for(doc, KddKind::UseCase, "applied_rules") {
        for target in helpers::section_targets(&section.body) {
            let rule_family = target.starts_with("BR-")
                || target.starts_with("BP-")
                || target.starts_with("XP-");
            if rule_family {
                edges.push(common::edge_to_target(
                    doc,
                    from,
                    &target,
                    EdgeType::UcAppliesRule,
                    "applied_rules_section",
                    Map::new(),
                ));
            }
        }
    }

    if let Some(section) = section_for(doc, KddKind::UseCase, "commands_executed") {
        for target in helpers::section_targets(&section.body) {
            if target.starts_with("CMD-") {
                edges.push(common::edge_to_target(
                    doc,
                    from,
                    &target,
                    EdgeType::UcExecutesCmd,
                    "commands_section",
                    Map::new(),
                ));
            }
        }
    }

    for link in &doc.links {
        if link.target.starts_with("OBJ-") {
            edges.push(common::edge_to_target(
                doc,
                from,
                &link.target,
                EdgeType::UcStory,
                "story_reference",
                Map::new(),
            ));
        }
    }

    edges
}
