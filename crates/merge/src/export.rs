use std::collections::HashMap;

use extract::Node;
use petgraph::algo::connected_components;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::merger::MergedGraph;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GraphStats {
    pub nodes: usize,
    pub relationships: usize,
    /// Weakly connected components, counting dangling endpoints as nodes
    pub components: usize,
    /// Relationship endpoints with no node record of their own
    pub dangling_endpoints: usize,
}

#[derive(Serialize)]
struct CompactGraph<'a> {
    nodes: Vec<CompactNode<'a>>,
    relations: Vec<CompactRelation<'a>>,
}

#[derive(Serialize)]
struct CompactNode<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    node_type: &'a str,
}

#[derive(Serialize)]
struct CompactRelation<'a> {
    source: &'a str,
    target: &'a str,
    #[serde(rename = "type")]
    rel_type: &'a str,
}

impl MergedGraph {
    /// Full serialization: nodes with metadata, relationships with nested
    /// source and target nodes.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Ids and types only, the shape used when prompting a model with the graph.
    pub fn to_compact_json(&self) -> serde_json::Result<String> {
        let compact = CompactGraph {
            nodes: self
                .nodes()
                .iter()
                .map(|n| CompactNode {
                    id: &n.id,
                    node_type: &n.node_type,
                })
                .collect(),
            relations: self
                .relationships()
                .iter()
                .map(|r| CompactRelation {
                    source: &r.source.id,
                    target: &r.target.id,
                    rel_type: &r.rel_type,
                })
                .collect(),
        };

        serde_json::to_string_pretty(&compact)
    }

    /// Directed graph view for graph algorithms and renderers. Edge weights
    /// are relationship types.
    pub fn to_digraph(&self) -> DiGraph<Node, String> {
        let mut graph = DiGraph::new();
        let mut indices: HashMap<&str, NodeIndex> = HashMap::new();

        for node in self.nodes() {
            let idx = graph.add_node(node.clone());
            indices.insert(&node.id, idx);
        }

        for relationship in self.relationships() {
            let source = *indices
                .entry(&relationship.source.id)
                .or_insert_with(|| graph.add_node(relationship.source.clone()));
            let target = *indices
                .entry(&relationship.target.id)
                .or_insert_with(|| graph.add_node(relationship.target.clone()));
            graph.add_edge(source, target, relationship.rel_type.clone());
        }

        graph
    }

    pub fn stats(&self) -> GraphStats {
        let digraph = self.to_digraph();

        GraphStats {
            nodes: self.nodes().len(),
            relationships: self.relationships().len(),
            components: connected_components(&digraph),
            dangling_endpoints: digraph.node_count() - self.nodes().len(),
        }
    }
}
