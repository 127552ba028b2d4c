use std::collections::{HashMap, HashSet};

use extract::{Node, PartialGraph, Relationship};
use serde::Serialize;
use tracing::debug;

use crate::error::{MergeError, MergeResult};

/// Deduplicated union of a batch of partial graphs.
///
/// Nodes are unique by `id` and kept in first-seen order. Relationships are
/// unique by (source id, type, target id) and kept in first-accepted order.
/// Every record is an owned copy; nothing aliases the input graphs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedGraph {
    nodes: Vec<Node>,
    relationships: Vec<Relationship>,
    #[serde(skip)]
    node_index: HashMap<String, usize>,
}

impl MergedGraph {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }

    /// The merged graph as a single partial graph, e.g. to feed it back into
    /// another merge.
    pub fn as_partial(&self) -> PartialGraph {
        PartialGraph::new(self.nodes.clone(), self.relationships.clone())
    }

    pub fn into_parts(self) -> (Vec<Node>, Vec<Relationship>) {
        (self.nodes, self.relationships)
    }
}

/// Fold `graphs`, in the given order, into one `MergedGraph`.
///
/// The first graph to mention a node id fixes its `type`; metadata from later
/// graphs overwrites earlier values key by key. Repeated relationship triples
/// are dropped. All inputs are validated before anything is merged.
pub fn merge_graphs(graphs: &[PartialGraph]) -> MergeResult<MergedGraph> {
    for (graph_index, graph) in graphs.iter().enumerate() {
        validate_graph(graph_index, graph)?;
    }

    let mut nodes: Vec<Node> = Vec::new();
    let mut node_index: HashMap<String, usize> = HashMap::new();
    let mut seen_triples: HashSet<(String, String, String)> = HashSet::new();
    let mut relationships: Vec<Relationship> = Vec::new();
    let mut dropped_relationships = 0usize;

    for graph in graphs {
        for node in &graph.nodes {
            match node_index.get(&node.id) {
                Some(&idx) => {
                    let existing = &mut nodes[idx];
                    for (key, value) in &node.metadata {
                        existing.metadata.insert(key.clone(), value.clone());
                    }
                }
                None => {
                    node_index.insert(node.id.clone(), nodes.len());
                    nodes.push(node.clone());
                }
            }
        }

        for relationship in &graph.relationships {
            let (source, rel_type, target) = relationship.triple();
            let key = (source.to_string(), rel_type.to_string(), target.to_string());

            if seen_triples.insert(key) {
                relationships.push(relationship.clone());
            } else {
                dropped_relationships += 1;
            }
        }
    }

    // Endpoints point at the merged node records where one exists
    for relationship in &mut relationships {
        if let Some(&idx) = node_index.get(&relationship.source.id) {
            relationship.source = nodes[idx].clone();
        }
        if let Some(&idx) = node_index.get(&relationship.target.id) {
            relationship.target = nodes[idx].clone();
        }
    }

    debug!(
        graphs = graphs.len(),
        nodes = nodes.len(),
        relationships = relationships.len(),
        dropped_relationships,
        "Merged partial graphs"
    );

    Ok(MergedGraph {
        nodes,
        relationships,
        node_index,
    })
}

/// Check that every node and relationship in `graph` carries the fields a
/// merge relies on. `graph_index` only labels the error.
pub fn validate_graph(graph_index: usize, graph: &PartialGraph) -> MergeResult<()> {
    for (node_index, node) in graph.nodes.iter().enumerate() {
        if let Some(reason) = node_problem(node) {
            return Err(MergeError::InvalidNode {
                graph_index,
                node_index,
                reason,
            });
        }
    }

    for (relationship_index, relationship) in graph.relationships.iter().enumerate() {
        if let Some(reason) = relationship_problem(relationship) {
            return Err(MergeError::InvalidRelationship {
                graph_index,
                relationship_index,
                reason,
            });
        }
    }

    Ok(())
}

fn node_problem(node: &Node) -> Option<&'static str> {
    if node.id.trim().is_empty() {
        Some("missing node id")
    } else if node.node_type.trim().is_empty() {
        Some("missing node type")
    } else {
        None
    }
}

// Endpoints that never appear as nodes are kept as-is in the merged graph,
// so they get the same checks as nodes.
fn relationship_problem(relationship: &Relationship) -> Option<&'static str> {
    let source = &relationship.source;
    let target = &relationship.target;

    if relationship.rel_type.trim().is_empty() {
        Some("missing relationship type")
    } else if source.id.trim().is_empty() {
        Some("missing source id")
    } else if source.node_type.trim().is_empty() {
        Some("missing source type")
    } else if target.id.trim().is_empty() {
        Some("missing target id")
    } else if target.node_type.trim().is_empty() {
        Some("missing target type")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(id: &str, node_type: &str) -> Node {
        Node::new(id, node_type)
    }

    fn rel(source: &str, rel_type: &str, target: &str) -> Relationship {
        Relationship::new(node(source, "Entity"), rel_type, node(target, "Entity"))
    }

    fn graph(nodes: Vec<Node>, relationships: Vec<Relationship>) -> PartialGraph {
        PartialGraph::new(nodes, relationships)
    }

    fn assert_unique(merged: &MergedGraph) {
        let ids: HashSet<&str> = merged.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), merged.nodes().len());

        let triples: HashSet<(&str, &str, &str)> =
            merged.relationships().iter().map(|r| r.triple()).collect();
        assert_eq!(triples.len(), merged.relationships().len());
    }

    #[test]
    fn test_empty_input() {
        let merged = merge_graphs(&[]).unwrap();
        assert!(merged.nodes().is_empty());
        assert!(merged.relationships().is_empty());
    }

    #[test]
    fn test_empty_graphs_contribute_nothing() {
        let merged = merge_graphs(&[PartialGraph::default(), PartialGraph::default()]).unwrap();
        assert!(merged.is_empty());
    }

    #[test]
    fn test_first_graph_fixes_type() {
        let p1 = graph(vec![node("X", "A")], vec![]);
        let p2 = graph(vec![node("X", "B")], vec![]);

        let forward = merge_graphs(&[p1.clone(), p2.clone()]).unwrap();
        assert_eq!(forward.node("X").unwrap().node_type, "A");

        let backward = merge_graphs(&[p2, p1]).unwrap();
        assert_eq!(backward.node("X").unwrap().node_type, "B");
    }

    #[test]
    fn test_metadata_last_write_wins() {
        let p1 = graph(vec![node("X", "A").with_metadata("k", 1)], vec![]);
        let p2 = graph(
            vec![node("X", "A").with_metadata("k", 2).with_metadata("m", 3)],
            vec![],
        );

        let merged = merge_graphs(&[p1, p2]).unwrap();

        let metadata = serde_json::Value::Object(merged.node("X").unwrap().metadata.clone());
        assert_eq!(metadata, json!({"k": 2, "m": 3}));
    }

    #[test]
    fn test_metadata_keys_not_repeated_are_kept() {
        let p1 = graph(vec![node("X", "A").with_metadata("origin", "chunk-0")], vec![]);
        let p2 = graph(vec![node("X", "A")], vec![]);

        let merged = merge_graphs(&[p1, p2]).unwrap();
        assert_eq!(merged.node("X").unwrap().metadata["origin"], "chunk-0");
    }

    #[test]
    fn test_relationship_dedup() {
        let p1 = graph(vec![node("A", "Platform"), node("B", "Group")], vec![rel("A", "USED_BY", "B")]);
        let p2 = graph(vec![node("A", "Platform")], vec![rel("A", "USED_BY", "B"), rel("B", "USED_BY", "A")]);

        let merged = merge_graphs(&[p1, p2]).unwrap();

        let used_by: Vec<_> = merged
            .relationships()
            .iter()
            .filter(|r| r.triple() == ("A", "USED_BY", "B"))
            .collect();
        assert_eq!(used_by.len(), 1);
        assert_eq!(merged.relationships().len(), 2);
        assert_unique(&merged);
    }

    #[test]
    fn test_first_seen_order_is_preserved() {
        let p1 = graph(vec![node("LMS", "Platform"), node("Students", "Group")], vec![]);
        let p2 = graph(vec![node("Blackboard", "Platform"), node("LMS", "Platform")], vec![]);

        let merged = merge_graphs(&[p1, p2]).unwrap();

        let ids: Vec<&str> = merged.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["LMS", "Students", "Blackboard"]);
    }

    #[test]
    fn test_endpoints_use_merged_records() {
        let p1 = graph(vec![node("LMS", "Platform")], vec![rel("LMS", "USED_BY", "Professors")]);
        let p2 = graph(vec![node("LMS", "Software").with_metadata("vendor", "Blackboard")], vec![]);

        let merged = merge_graphs(&[p1.clone(), p2]).unwrap();
        let relationship = &merged.relationships()[0];

        assert_eq!(relationship.source.node_type, "Platform");
        assert_eq!(relationship.source.metadata["vendor"], "Blackboard");
        // Endpoint without a node record keeps its own copy
        assert_eq!(relationship.target.node_type, "Entity");
        // Inputs are untouched
        assert!(p1.nodes[0].metadata.is_empty());
    }

    #[test]
    fn test_idempotent_remerge() {
        let p1 = graph(
            vec![node("LMS", "Platform").with_metadata("k", 1), node("Professors", "Faculty")],
            vec![rel("LMS", "USED_BY", "Professors")],
        );
        let p2 = graph(
            vec![node("LMS", "Tool").with_metadata("m", "x"), node("Modern tech", "Technology")],
            vec![rel("LMS", "FALLS_SHORT_OF", "Modern tech"), rel("LMS", "USED_BY", "Professors")],
        );

        let merged = merge_graphs(&[p1, p2]).unwrap();

        let once = merge_graphs(&[merged.as_partial()]).unwrap();
        assert_eq!(once, merged);

        let twice = merge_graphs(&[merged.as_partial(), merged.as_partial()]).unwrap();
        assert_eq!(twice, merged);
        assert_unique(&twice);
    }

    #[test]
    fn test_missing_type_fails_fast() {
        let good = graph(vec![node("X", "A")], vec![]);
        let bad = graph(vec![node("Y", "B"), node("Z", " ")], vec![]);

        let err = merge_graphs(&[good, bad]).unwrap_err();
        assert_eq!(
            err,
            MergeError::InvalidNode {
                graph_index: 1,
                node_index: 1,
                reason: "missing node type",
            }
        );
    }

    #[test]
    fn test_missing_relationship_endpoint_fails_fast() {
        let bad = graph(vec![], vec![rel("", "USED_BY", "B")]);

        let err = merge_graphs(&[bad]).unwrap_err();
        assert!(matches!(err, MergeError::InvalidRelationship { relationship_index: 0, .. }));
        assert!(err.to_string().contains("missing source id"));
    }

    #[test]
    fn test_dangling_endpoint_without_type_fails_fast() {
        let bad = graph(
            vec![],
            vec![Relationship::new(node("A", "Platform"), "USED_BY", node("B", "   "))],
        );

        let err = merge_graphs(&[bad]).unwrap_err();
        assert_eq!(
            err,
            MergeError::InvalidRelationship {
                graph_index: 0,
                relationship_index: 0,
                reason: "missing target type",
            }
        );

        let blank_source = graph(vec![], vec![Relationship::new(node("A", ""), "USED_BY", node("B", "Group"))]);
        let err = merge_graphs(&[blank_source]).unwrap_err();
        assert!(err.to_string().contains("missing source type"));
    }

    #[test]
    fn test_validate_graph_labels_error_with_given_index() {
        let bad = graph(vec![node("X", "")], vec![]);

        let err = validate_graph(4, &bad).unwrap_err();
        assert!(matches!(err, MergeError::InvalidNode { graph_index: 4, node_index: 0, .. }));
        assert!(validate_graph(0, &graph(vec![node("X", "A")], vec![rel("X", "USED_BY", "Y")])).is_ok());
    }
}
