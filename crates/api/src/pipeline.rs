//! The report-to-graph pipeline with its collaborators wired in explicitly.
//!
//! Every model handle is built once from [`AppConfig`] and owned by the
//! [`Pipeline`]; callers decide its lifetime and share it through an `Arc`.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::metrics::{Metrics, TimedOperation};
use crate::retry::{RetryPolicy, RetryingExtractor};
use extract::{
    extract_graphs, BatchOutcome, GraphExtractor, LlmGraphExtractor, OllamaClient, PartialGraph,
    TaskFailure,
};
use ingest::Paragraph;
use merge::{merge_graphs, validate_graph, GraphStats, MergedGraph};
use query::{ChatLLM, QuestionGenerator};
use summarize::{summarize_paragraphs, DocumentSummary, OllamaSummarizer, Summarizer};

/// Result of extracting and merging one batch of chunks.
#[derive(Debug, Serialize)]
pub struct GraphBuild {
    pub graph: MergedGraph,
    pub stats: GraphStats,
    pub chunks: usize,
    /// Chunks whose extraction failed; they are not part of `graph`
    pub failures: Vec<TaskFailure>,
}

pub struct Pipeline {
    config: AppConfig,
    extractor: Arc<dyn GraphExtractor>,
    summarizer: Arc<dyn Summarizer>,
    questions: QuestionGenerator,
    metrics: Arc<Metrics>,
}

impl Pipeline {
    pub fn new(
        config: AppConfig,
        extractor: Arc<dyn GraphExtractor>,
        summarizer: Arc<dyn Summarizer>,
        questions: QuestionGenerator,
    ) -> Self {
        Self {
            config,
            extractor,
            summarizer,
            questions,
            metrics: Metrics::new(),
        }
    }

    /// Build every collaborator against the Ollama server named in `config`.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let ollama = OllamaClient::with_timeout(
            config.ollama.base_url.clone(),
            config.ollama.model.clone(),
            Duration::from_secs(config.concurrency.request_timeout_secs),
        )?;

        let policy = RetryPolicy::from_config(&config.retry);
        let extractor: Arc<dyn GraphExtractor> = if policy.is_enabled() {
            Arc::new(RetryingExtractor::new(LlmGraphExtractor::new(ollama.clone()), policy))
        } else {
            Arc::new(LlmGraphExtractor::new(ollama.clone()))
        };

        let summarizer = Arc::new(OllamaSummarizer::new(ollama.clone(), config.summary.clone()));
        let questions = QuestionGenerator::new(ChatLLM::new(ollama), config.questions.clone());

        info!(
            base_url = %config.ollama.base_url,
            model = %config.ollama.model,
            mode = ?config.mode,
            "Pipeline configured"
        );

        Ok(Self::new(config, extractor, summarizer, questions))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Paragraphs of a report, or of every report in a directory.
    pub async fn paragraphs(&self, path: &Path) -> Result<Vec<Paragraph>> {
        let min_length = self.config.ingest.min_paragraph_len;

        if path.is_dir() {
            ingest::extract_directory(path, min_length).await
        } else {
            ingest::extract_paragraphs(path, min_length).await
        }
    }

    pub async fn summarize_document(&self, path: &Path) -> Result<DocumentSummary> {
        let paragraphs = self.paragraphs(path).await?;
        Ok(self.summarize_texts(paragraphs.into_iter().map(|p| p.text).collect()).await)
    }

    pub async fn summarize_texts(&self, texts: Vec<String>) -> DocumentSummary {
        let timer = TimedOperation::start();
        let summary = summarize_paragraphs(
            self.summarizer.as_ref(),
            texts,
            self.config.concurrency.max_concurrent_llm_calls,
        )
        .await;

        self.metrics.record_summaries(timer.elapsed(), summary.paragraph_summaries.len());
        summary
    }

    /// Extract a partial graph from every chunk concurrently and merge the
    /// successes in chunk order.
    ///
    /// A chunk whose extraction fails, or whose graph would not survive the
    /// merge validation, is reported in `failures` and left out of the graph.
    pub async fn build_graph(&self, chunks: Vec<String>) -> Result<GraphBuild> {
        let total = chunks.len();
        let chunk_lens: Vec<usize> = chunks.iter().map(String::len).collect();

        let timer = TimedOperation::start();
        let outcome = extract_graphs(
            self.extractor.as_ref(),
            chunks,
            self.config.concurrency.max_concurrent_extractions,
        )
        .await;
        let (graphs, failures) = reject_invalid_graphs(outcome, &chunk_lens);
        self.metrics.record_extraction(timer.elapsed(), graphs.len(), failures.len());

        let graph = self.merge(&graphs)?;
        let stats = graph.stats();

        info!(
            chunks = total,
            failed = failures.len(),
            nodes = stats.nodes,
            relationships = stats.relationships,
            "Knowledge graph built"
        );

        Ok(GraphBuild {
            graph,
            stats,
            chunks: total,
            failures,
        })
    }

    pub fn merge(&self, graphs: &[PartialGraph]) -> Result<MergedGraph> {
        let timer = TimedOperation::start();
        let merged = merge_graphs(graphs).context("Failed to merge partial graphs")?;
        self.metrics.record_merge(timer.elapsed());
        Ok(merged)
    }

    pub async fn questions_for(&self, summary: &str) -> Result<Vec<String>> {
        let questions = self.questions.generate(summary).await?;
        self.metrics.record_questions(questions.len());
        Ok(questions)
    }

    pub async fn questions_for_graph(&self, graph: &MergedGraph) -> Result<Vec<String>> {
        let questions = self.questions.generate_from_graph(graph).await?;
        self.metrics.record_questions(questions.len());
        Ok(questions)
    }
}

/// Split extracted graphs into the ones a merge accepts and per-chunk
/// failures, both in chunk order.
fn reject_invalid_graphs(
    outcome: BatchOutcome<PartialGraph>,
    chunk_lens: &[usize],
) -> (Vec<PartialGraph>, Vec<TaskFailure>) {
    let mut failures = outcome.failures;
    let mut graphs = Vec::with_capacity(outcome.successes.len());

    for (index, graph) in outcome.successes {
        match validate_graph(index, &graph) {
            Ok(()) => graphs.push(graph),
            Err(e) => {
                warn!(chunk_index = index, error = %e, "Extracted graph rejected, excluding it from the batch");
                failures.push(TaskFailure {
                    index,
                    input_len: chunk_lens.get(index).copied().unwrap_or_default(),
                    error: e.to_string(),
                });
            }
        }
    }

    failures.sort_by_key(|f| f.index);
    (graphs, failures)
}
