use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use extract::OllamaClient;

/// Produces a shorter text from a longer one.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    pub min_words: usize,
    pub max_words: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            min_words: 50,
            max_words: 128,
        }
    }
}

/// Abstractive summaries from a local Ollama model.
#[derive(Clone)]
pub struct OllamaSummarizer {
    llm: OllamaClient,
    config: SummaryConfig,
}

impl OllamaSummarizer {
    pub fn new(llm: OllamaClient, config: SummaryConfig) -> Self {
        Self { llm, config }
    }

    fn build_summary_prompt(&self, text: &str) -> String {
        let mut prompt = String::from(
            "You are summarizing a passage from a research-based design report.\n\n",
        );

        prompt.push_str("PASSAGE:\n");
        prompt.push_str(text.trim());
        prompt.push_str("\n\n");

        prompt.push_str(&format!(
            "TASK: Write a summary of the passage between {} and {} words.\n\
            Keep the key entities, users and problems it mentions.\n\
            Do not repeat phrases. Do NOT use markdown formatting or bullet points.\n\n\
            SUMMARY:",
            self.config.min_words, self.config.max_words
        ));

        prompt
    }
}

#[async_trait]
impl Summarizer for OllamaSummarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            anyhow::bail!("Nothing to summarize");
        }

        let prompt = self.build_summary_prompt(text);

        let summary = self.llm.generate(&prompt).await
            .context("Failed to generate summary")?;

        let summary = summary.trim();
        if summary.is_empty() {
            anyhow::bail!("Model returned an empty summary");
        }

        Ok(summary.to_string())
    }
}
