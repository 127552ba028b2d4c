use thiserror::Error;

/// Rejections raised before any merging starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("graph {graph_index}, node {node_index}: {reason}")]
    InvalidNode {
        graph_index: usize,
        node_index: usize,
        reason: &'static str,
    },

    #[error("graph {graph_index}, relationship {relationship_index}: {reason}")]
    InvalidRelationship {
        graph_index: usize,
        relationship_index: usize,
        reason: &'static str,
    },
}

pub type MergeResult<T> = Result<T, MergeError>;
