//! Bounded traversals over the graph store: bidirectional BFS and reverse
//! BFS with path recovery.

use crate::graph::GraphStore;
use crate::types::{EdgeType, GraphEdge, GraphNode};
use std::collections::{HashMap, HashSet, VecDeque};

/// Nodes in discovery order plus the matching edges, deduplicated by
/// composite key.
#[derive(Debug, Clone, Default)]
pub struct Traversal {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphStore {
    /// Bidirectional breadth-first exploration from `root` up to `depth`
    /// (inclusive). Edges outside `edge_types` are skipped when the filter
    /// is set; layer-violating edges are skipped when `respect_layers` is
    /// true. An unknown root yields an empty traversal.
    pub fn traverse(
        &self,
        root: &str,
        depth: usize,
        edge_types: Option<&[EdgeType]>,
        respect_layers: bool,
    ) -> Traversal {
        let mut result = Traversal::default();
        let Some(root_node) = self.get_node(root) else {
            return result;
        };

        let mut visited: HashSet<String> = HashSet::new();
        let mut matched: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();

        visited.insert(root.to_string());
        result.nodes.push(root_node.clone());
        queue.push_back((root.to_string(), 0));

        while let Some((current, distance)) = queue.pop_front() {
            if distance >= depth {
                continue;
            }

            let mut incident = self.outgoing_edges(&current);
            incident.extend(self.incoming_edges(&current));

            for edge in incident {
                if let Some(filter) = edge_types {
                    if !filter.contains(&edge.edge_type) {
                        continue;
                    }
                }
                if respect_layers && edge.layer_violation {
                    continue;
                }

                if matched.insert(edge.key()) {
                    result.edges.push(edge.clone());
                }

                let neighbor = if edge.from == current {
                    &edge.to
                } else {
                    &edge.from
                };
                if visited.insert(neighbor.clone()) {
                    if let Some(node) = self.get_node(neighbor) {
                        result.nodes.push(node.clone());
                    }
                    queue.push_back((neighbor.clone(), distance + 1));
                }
            }
        }

        result
    }

    /// Breadth-first over incoming edges only, recording the reversed edge
    /// path taken to reach each predecessor. The root itself is not
    /// returned.
    pub fn reverse_traverse(&self, root: &str, depth: usize) -> Vec<(GraphNode, Vec<GraphEdge>)> {
        let mut result = Vec::new();
        if !self.has_node(root) {
            return result;
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut paths: HashMap<String, Vec<GraphEdge>> = HashMap::new();
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();

        visited.insert(root.to_string());
        paths.insert(root.to_string(), Vec::new());
        queue.push_back((root.to_string(), 0));

        while let Some((current, distance)) = queue.pop_front() {
            if distance >= depth {
                continue;
            }
            let current_path = paths.get(&current).cloned().unwrap_or_default();

            for edge in self.incoming_edges(&current) {
                let predecessor = edge.from.clone();
                if !visited.insert(predecessor.clone()) {
                    continue;
                }
                let mut path = current_path.clone();
                path.push(edge.clone());
                paths.insert(predecessor.clone(), path.clone());
                if let Some(node) = self.get_node(&predecessor) {
                    result.push((node.clone(), path));
                }
                queue.push_back((predecessor, distance + 1));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::store::tests::{edge, node};
    use crate::types::KddKind;

    fn diamond() -> GraphStore {
        // R ← A ← B, R ← C, plus B → C sideways
        let mut store = GraphStore::new();
        store.load(
            vec![
                node("entity:R", KddKind::Entity),
                node("business-rule:A", KddKind::BusinessRule),
                node("use-case:B", KddKind::UseCase),
                node("entity:C", KddKind::Entity),
            ],
            vec![
                edge("business-rule:A", "entity:R", EdgeType::EntityRule),
                edge("use-case:B", "business-rule:A", EdgeType::UcAppliesRule),
                edge("entity:C", "entity:R", EdgeType::DomainRelation),
                edge("use-case:B", "entity:C", EdgeType::WikiLink),
            ],
        );
        store
    }

    #[test]
    fn depth_zero_returns_only_the_root() {
        let store = diamond();
        let t = store.traverse("entity:R", 0, None, true);
        assert_eq!(t.nodes.len(), 1);
        assert_eq!(t.nodes[0].id, "entity:R");
        assert!(t.edges.is_empty());
    }

    #[test]
    fn traverse_follows_both_directions() {
        let store = diamond();
        let t = store.traverse("business-rule:A", 1, None, true);
        let ids: Vec<&str> = t.nodes.iter().map(|n| n.id.as_str()).collect();
        // outgoing to R, incoming from B
        assert_eq!(ids, vec!["business-rule:A", "entity:R", "use-case:B"]);
        assert_eq!(t.edges.len(), 2);
    }

    #[test]
    fn traverse_depth_bounds_discovery() {
        let store = diamond();
        let t = store.traverse("entity:R", 1, None, true);
        let ids: Vec<&str> = t.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["entity:R", "business-rule:A", "entity:C"]);
        let deep = store.traverse("entity:R", 2, None, true);
        assert_eq!(deep.nodes.len(), 4);
    }

    #[test]
    fn edge_type_filter_limits_expansion() {
        let store = diamond();
        let only = [EdgeType::EntityRule];
        let t = store.traverse("entity:R", 2, Some(&only), true);
        let ids: Vec<&str> = t.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["entity:R", "business-rule:A"]);
    }

    #[test]
    fn respect_layers_skips_violations_in_both_directions() {
        let mut store = GraphStore::new();
        let mut violating = edge("entity:A", "use-case:UC-001", EdgeType::WikiLink);
        violating.layer_violation = true;
        store.load(
            vec![
                node("entity:A", KddKind::Entity),
                node("use-case:UC-001", KddKind::UseCase),
            ],
            vec![violating],
        );
        // from the origin side
        assert_eq!(store.traverse("entity:A", 2, None, true).nodes.len(), 1);
        // from the destination side (incoming direction)
        assert_eq!(store.traverse("use-case:UC-001", 2, None, true).nodes.len(), 1);
        // and both are explored when layers are ignored
        assert_eq!(store.traverse("entity:A", 2, None, false).nodes.len(), 2);
    }

    #[test]
    fn reverse_traverse_recovers_paths() {
        let store = diamond();
        let results = store.reverse_traverse("entity:R", 3);
        let by_id: std::collections::HashMap<&str, &Vec<GraphEdge>> = results
            .iter()
            .map(|(n, path)| (n.id.as_str(), path))
            .collect();

        assert_eq!(results.len(), 3);
        assert_eq!(by_id["business-rule:A"].len(), 1);
        let b_path = by_id["use-case:B"];
        assert_eq!(b_path.len(), 2);
        assert_eq!(b_path[0].from, "business-rule:A");
        assert_eq!(b_path[1].from, "use-case:B");
    }

    #[test]
    fn reverse_traverse_respects_depth() {
        let store = diamond();
        let results = store.reverse_traverse("entity:R", 1);
        let ids: Vec<&str> = results.iter().map(|(n, _)| n.id.as_str()).collect();
        assert_eq!(ids, vec!["business-rule:A", "entity:C"]);
    }

    #[test]
    fn unknown_root_is_empty() {
        let store = diamond();
        assert!(store.traverse("entity:Ghost", 2, None, true).nodes.is_empty());
        assert!(store.reverse_traverse("entity:Ghost", 2).is_empty());
    }
}
