pub mod error;
pub mod export;
pub mod merger;

pub use error::{MergeError, MergeResult};
pub use export::GraphStats;
pub use merger::{merge_graphs, validate_graph, MergedGraph};

use extract::ExtractedChunk;

/// Merge extracted chunks in chunk order, whatever order they arrive in.
pub fn merge_extracted(mut chunks: Vec<ExtractedChunk>) -> MergeResult<MergedGraph> {
    chunks.sort_by_key(|c| c.chunk_index);
    let graphs: Vec<_> = chunks.into_iter().map(|c| c.graph).collect();
    merge_graphs(&graphs)
}
