//! Shared extractor machinery: the common node envelope and the wiki-link
//! edge pass every kind performs.

use crate::rules;
use crate::types::{Document, EdgeType, GraphEdge, GraphNode, KddKind, NodeId};
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Build the node envelope: identity, layer, status, aliases, domain and
/// the kind-specific indexed fields taken from recognized sections.
pub fn build_node(kind: KddKind, doc: &Document) -> GraphNode {
    let mut indexed_fields = Map::new();
    for (field, synonyms) in rules::section_fields(kind) {
        if let Some(section) = doc.section_by_names(synonyms) {
            if !section.body.trim().is_empty() {
                indexed_fields.insert((*field).to_string(), Value::String(section.body.clone()));
            }
        }
    }
    if let Some(title) = doc.title() {
        indexed_fields.insert("title".to_string(), Value::String(title.to_string()));
    }

    let status = doc
        .front_matter
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("draft")
        .to_string();

    GraphNode {
        id: kind.node_id(&doc.document_id),
        kind,
        source_path: doc.source_path.clone(),
        source_hash: doc.source_hash.clone(),
        layer: doc.layer,
        status,
        aliases: coerce_aliases(doc.front_matter.get("aliases")),
        domain: doc
            .front_matter
            .get("domain")
            .and_then(Value::as_str)
            .map(str::to_string),
        indexed_fields,
        indexed_at: Utc::now(),
    }
}

/// Front-matter `aliases` of the wrong shape are coerced: a bare string
/// becomes a one-element list, non-string array entries are stringified
/// where sensible, anything else becomes the empty default.
fn coerce_aliases(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// One `WIKI_LINK` edge per unique target found anywhere in the document.
pub fn wiki_link_edges(doc: &Document, from: &NodeId) -> Vec<GraphEdge> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    for link in &doc.links {
        if !seen.insert(link.target.clone()) {
            continue;
        }
        let mut metadata = Map::new();
        if let Some(domain) = &link.domain {
            metadata.insert("domain".to_string(), Value::String(domain.clone()));
        }
        if let Some(alias) = &link.alias {
            metadata.insert("alias".to_string(), Value::String(alias.clone()));
        }
        edges.push(edge_to_target(
            doc,
            from,
            &link.target,
            EdgeType::WikiLink,
            "wikilink",
            metadata,
        ));
    }
    edges
}

/// Build an edge to a wiki target, resolving the destination's kind (and
/// thereby its layer) through the reserved-prefix table.
pub fn edge_to_target(
    doc: &Document,
    from: &NodeId,
    target: &str,
    edge_type: EdgeType,
    method: &str,
    metadata: Map<String, Value>,
) -> GraphEdge {
    let dest_kind = rules::kind_for_target(target);
    GraphEdge {
        from: from.clone(),
        to: dest_kind.node_id(target),
        edge_type,
        source_path: doc.source_path.clone(),
        extraction_method: method.to_string(),
        metadata,
        layer_violation: rules::is_layer_violation(doc.layer, Some(dest_kind.layer())),
        bidirectional: edge_type == EdgeType::WikiLink,
    }
}
