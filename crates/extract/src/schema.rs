use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: Node,
    pub target: Node,
    #[serde(rename = "type")]
    pub rel_type: String,
}

impl Relationship {
    pub fn new(source: Node, rel_type: impl Into<String>, target: Node) -> Self {
        Self {
            source,
            target,
            rel_type: rel_type.into(),
        }
    }

    /// (source id, relation type, target id)
    pub fn triple(&self) -> (&str, &str, &str) {
        (&self.source.id, &self.rel_type, &self.target.id)
    }
}

/// Output of one extraction call over one text chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialGraph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl PartialGraph {
    pub fn new(nodes: Vec<Node>, relationships: Vec<Relationship>) -> Self {
        Self {
            nodes,
            relationships,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }
}

/// A partial graph tagged with the position of the chunk it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedChunk {
    pub chunk_index: usize,
    pub graph: PartialGraph,
}

/// Shape the model is asked to emit.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawGraph {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default, alias = "relations")]
    pub relationships: Vec<RawRelationship>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawNode {
    pub id: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default, alias = "metadata")]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawRelationship {
    pub source: String,
    #[serde(default)]
    pub source_type: String,
    pub target: String,
    #[serde(default)]
    pub target_type: String,
    #[serde(rename = "type")]
    pub rel_type: String,
}

impl RawGraph {
    /// Convert into a `PartialGraph`, trimming identifiers and adding endpoint
    /// nodes that the model referenced but left out of `nodes`.
    pub(crate) fn into_partial(self) -> PartialGraph {
        let mut nodes: Vec<Node> = Vec::with_capacity(self.nodes.len());

        for raw in self.nodes {
            let id = raw.id.trim().to_string();
            if id.is_empty() {
                continue;
            }
            nodes.push(Node {
                id,
                node_type: fallback_type(&raw.node_type),
                metadata: raw.properties,
            });
        }

        let mut relationships = Vec::with_capacity(self.relationships.len());

        for raw in self.relationships {
            let source_id = raw.source.trim();
            let target_id = raw.target.trim();
            let rel_type = raw.rel_type.trim();
            if source_id.is_empty() || target_id.is_empty() || rel_type.is_empty() {
                continue;
            }

            let source = endpoint(&mut nodes, source_id, &raw.source_type);
            let target = endpoint(&mut nodes, target_id, &raw.target_type);
            relationships.push(Relationship::new(source, rel_type, target));
        }

        PartialGraph::new(nodes, relationships)
    }
}

fn fallback_type(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        "Unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

fn endpoint(nodes: &mut Vec<Node>, id: &str, raw_type: &str) -> Node {
    if let Some(existing) = nodes.iter().find(|n| n.id == id) {
        return existing.clone();
    }
    let node = Node::new(id, fallback_type(raw_type));
    nodes.push(node.clone());
    node
}
