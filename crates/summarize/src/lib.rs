pub mod summarizer;

pub use summarizer::{OllamaSummarizer, Summarizer, SummaryConfig};

use extract::{dispatch_ordered, TaskFailure};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    /// One summary per paragraph that succeeded, in paragraph order
    pub paragraph_summaries: Vec<IndexedSummary>,
    /// Summary of all paragraphs joined together
    pub overall: Option<String>,
    pub failures: Vec<TaskFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexedSummary {
    pub paragraph_index: usize,
    pub summary: String,
}

impl DocumentSummary {
    /// Paragraph summaries followed by the overall summary.
    pub fn all_summaries(&self) -> Vec<String> {
        self.paragraph_summaries
            .iter()
            .map(|s| s.summary.clone())
            .chain(self.overall.clone())
            .collect()
    }
}

/// Summarize every paragraph concurrently, then the whole text at once.
///
/// A paragraph whose summary fails is reported in `failures`; the overall
/// summary is attempted regardless.
pub async fn summarize_paragraphs<S>(
    summarizer: &S,
    paragraphs: Vec<String>,
    max_concurrency: usize,
) -> DocumentSummary
where
    S: Summarizer + ?Sized,
{
    let all_text = paragraphs.join(" ");

    let outcome = dispatch_ordered(paragraphs, max_concurrency, |paragraph: String| async move {
        summarizer.summarize(&paragraph).await
    })
    .await;

    let overall = if all_text.trim().is_empty() {
        None
    } else {
        match summarizer.summarize(&all_text).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(chars = all_text.len(), error = %format!("{:#}", e), "Overall summary failed");
                None
            }
        }
    };

    let paragraph_summaries: Vec<IndexedSummary> = outcome
        .successes
        .into_iter()
        .map(|(paragraph_index, summary)| IndexedSummary {
            paragraph_index,
            summary,
        })
        .collect();

    info!(
        summarized = paragraph_summaries.len(),
        failed = outcome.failures.len(),
        overall = overall.is_some(),
        "Document summarized"
    );

    DocumentSummary {
        paragraph_summaries,
        overall,
        failures: outcome.failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Keeps the first three words; slower for shorter inputs.
    struct FirstWords;

    #[async_trait]
    impl Summarizer for FirstWords {
        async fn summarize(&self, text: &str) -> Result<String> {
            if text.contains("corrupt") {
                anyhow::bail!("tokenizer rejected input");
            }
            tokio::time::sleep(Duration::from_millis(200 / (text.len() as u64 + 1))).await;
            Ok(text.split_whitespace().take(3).collect::<Vec<_>>().join(" "))
        }
    }

    #[tokio::test]
    async fn test_summaries_keep_paragraph_order() {
        let paragraphs = vec![
            "a b c d".to_string(),
            "students need intuitive navigation and feedback".to_string(),
            "professors grade work".to_string(),
        ];

        let summary = summarize_paragraphs(&FirstWords, paragraphs, 3).await;

        let indices: Vec<usize> = summary.paragraph_summaries.iter().map(|s| s.paragraph_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(summary.overall.as_deref(), Some("a b c"));
        assert_eq!(summary.all_summaries().len(), 4);
    }

    #[tokio::test]
    async fn test_failed_paragraph_is_reported_not_fatal() {
        let paragraphs = vec!["fine text here".to_string(), "corrupt bytes".to_string()];

        let summary = summarize_paragraphs(&FirstWords, paragraphs, 2).await;

        assert_eq!(summary.paragraph_summaries.len(), 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].index, 1);
        // Joined text contains the corrupt paragraph too
        assert!(summary.overall.is_none());
    }

    #[tokio::test]
    async fn test_no_paragraphs() {
        let summary = summarize_paragraphs(&FirstWords, Vec::new(), 2).await;
        assert!(summary.all_summaries().is_empty());
    }
}
