//! Edge extraction for the domain-layer kinds: entity, business-rule,
//! business-policy, cross-policy.

use crate::extract::{common, helpers};
use crate::parser;
use crate::rules;
use crate::types::{Document, EdgeType, GraphEdge, KddKind, NodeId};
use serde_json::{Map, Value};

/// Entity edges: `DOMAIN_RELATION` per relations-table row, `EMITS` per
/// `EVT-*` target in the lifecycle-events section.
pub fn entity_edges(doc: &Document, from: &NodeId) -> Vec<GraphEdge> {
    let mut edges = Vec::new();

    if let Some(section) = section_for(doc, KddKind::Entity, "relations") {
        if let Some((header, rows)) = helpers::parse_table(&section.body) {
            let target_idx = helpers::column_index(&header, &["entity", "target", "entidad", "destino"])
                .unwrap_or(if header.len() > 1 { 1 } else { 0 });
            let relation_idx =
                helpers::column_index(&header, &["relation", "relación", "relacion", "type", "tipo"])
                    .unwrap_or(0);
            let cardinality_idx =
                helpers::column_index(&header, &["cardinality", "cardinalidad"]);

            for row in rows {
                let Some(target) = row.get(target_idx).map(|cell| target_in_cell(cell)) else {
                    continue;
                };
                if target.is_empty() {
                    continue;
                }

                let mut metadata = Map::new();
                if let Some(relation) = row.get(relation_idx) {
                    metadata.insert("relation".to_string(), Value::String(relation.clone()));
                }
                if let Some(cardinality) = cardinality_idx.and_then(|idx| row.get(idx)) {
                    metadata.insert("cardinality".to_string(), Value::String(cardinality.clone()));
                }

                edges.push(common::edge_to_target(
                    doc,
                    from,
                    &target,
                    EdgeType::DomainRelation,
                    "relations_table",
                    metadata,
                ));
            }
        }
    }

    if let Some(section) = section_for(doc, KddKind::Entity, "lifecycle_events") {
        for target in helpers::section_targets(&section.body) {
            if target.starts_with("EVT-") {
                edges.push(common::edge_to_target(
                    doc,
                    from,
                    &target,
                    EdgeType::Emits,
                    "lifecycle_section",
                    Map::new(),
                ));
            }
        }
    }

    edges
}

/// Rule-family edges: `ENTITY_RULE` to every entity target referenced from
/// the declaration (and, for cross-policies, purpose) section.
pub fn rule_edges(kind: KddKind, doc: &Document, from: &NodeId) -> Vec<GraphEdge> {
    let mut edges = Vec::new();
    for field in ["declaration", "purpose"] {
        let Some(section) = section_for(doc, kind, field) else {
            continue;
        };
        for link in parser::extract_links(&section.body) {
            if !rules::is_typed_reference(&link.target) {
                edges.push(common::edge_to_target(
                    doc,
                    from,
                    &link.target,
                    EdgeType::EntityRule,
                    "declaration_section",
                    Map::new(),
                ));
            }
        }
    }
    edges
}

/// Wiki target inside a table cell, or the raw cell text.
fn target_in_cell(cell: &str) -> String {
    parser::extract_links(cell)
        .into_iter()
        .next()
        .map(|link| link.target)
        .unwrap_or_else(|| cell.trim().to_string())
}

/// Find the section backing one canonical field of a kind.
pub(crate) fn section_for<'a>(
    doc: &'a Document,
    kind: KddKind,
    field: &str,
) -> Option<&'a crate::types::Section> {
    rules::section_fields(kind)
        .iter()
        .find(|(name, _)| *name == field)
        .and_then(|(_, synonyms)| doc.section_by_names(synonyms))
}
