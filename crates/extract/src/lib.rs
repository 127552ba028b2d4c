pub mod dispatch;
pub mod llm;
pub mod prompt;
pub mod schema;

pub use dispatch::{dispatch_ordered, BatchOutcome, TaskFailure};
pub use llm::OllamaClient;
pub use schema::{ExtractedChunk, Node, PartialGraph, Relationship};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, instrument};

use schema::RawGraph;

/// Turns one text chunk into a partial knowledge graph.
#[async_trait]
pub trait GraphExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<PartialGraph>;
}

/// Graph extraction backed by an Ollama model.
pub struct LlmGraphExtractor {
    llm_client: OllamaClient,
    json_attempts: usize,
}

impl LlmGraphExtractor {
    pub fn new(llm_client: OllamaClient) -> Self {
        Self {
            llm_client,
            json_attempts: 3,
        }
    }

    pub fn with_json_attempts(mut self, attempts: usize) -> Self {
        self.json_attempts = attempts;
        self
    }
}

#[async_trait]
impl GraphExtractor for LlmGraphExtractor {
    #[instrument(skip_all, fields(chunk_len = text.len()))]
    async fn extract(&self, text: &str) -> Result<PartialGraph> {
        let prompt = prompt::build_extraction_prompt(text);

        let json_str = self.llm_client
            .generate_json_with_retry(&prompt, self.json_attempts)
            .await
            .context("Failed to extract graph from chunk")?;

        parse_graph(&json_str)
    }
}

/// Parse a model reply into a `PartialGraph`.
pub fn parse_graph(json_str: &str) -> Result<PartialGraph> {
    let raw: RawGraph = serde_json::from_str(json_str)
        .context("Failed to parse extraction result")?;
    Ok(raw.into_partial())
}

/// Extract one partial graph per chunk, concurrently.
///
/// Successes come back tagged with and sorted by their chunk index; failed
/// chunks are reported in `failures` and left out.
pub async fn extract_graphs<E>(
    extractor: &E,
    chunks: Vec<String>,
    max_concurrency: usize,
) -> BatchOutcome<PartialGraph>
where
    E: GraphExtractor + ?Sized,
{
    let total = chunks.len();
    let outcome = dispatch_ordered(chunks, max_concurrency, |chunk: String| async move {
        extractor.extract(&chunk).await
    })
    .await;

    info!(
        chunks = total,
        extracted = outcome.successes.len(),
        failed = outcome.failures.len(),
        "Graph extraction batch finished"
    );

    outcome
}

impl BatchOutcome<PartialGraph> {
    pub fn into_extracted_chunks(self) -> Vec<ExtractedChunk> {
        self.successes
            .into_iter()
            .map(|(chunk_index, graph)| ExtractedChunk { chunk_index, graph })
            .collect()
    }
}
