use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing::debug;

const SUPPORTED: [&str; 3] = ["pdf", "txt", "md"];

pub struct FileReader;

impl FileReader {
    pub async fn read_file(path: &Path) -> Result<String> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match extension.as_str() {
            "txt" | "md" => {
                let content = fs::read_to_string(path)
                    .await
                    .context(format!("Failed to read file: {:?}", path))?;
                Ok(content)
            }
            "pdf" => Self::read_pdf(path).await,
            _ => anyhow::bail!("Unsupported file format: {}", extension),
        }
    }

    async fn read_pdf(path: &Path) -> Result<String> {
        let bytes = fs::read(path)
            .await
            .context(format!("Failed to read file: {:?}", path))?;

        // pdf-extract is synchronous and CPU bound
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .context("PDF extraction task failed")?
            .map_err(|e| anyhow::anyhow!("Failed to extract text from {:?}: {}", path, e))?;

        debug!(path = ?path, chars = text.len(), "Extracted PDF text");
        Ok(text)
    }

    pub fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| SUPPORTED.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    pub async fn read_directory(dir: &Path) -> Result<Vec<(String, String)>> {
        let mut files = Vec::new();

        let mut entries = fs::read_dir(dir)
            .await
            .context(format!("Failed to read directory: {:?}", dir))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if path.is_file() && Self::is_supported(&path) {
                let content = Self::read_file(&path).await?;
                let path_str = path.to_string_lossy().to_string();
                files.push((path_str, content));
            }
        }

        // read_dir order is platform dependent
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert!(FileReader::is_supported(Path::new("report.PDF")));
        assert!(FileReader::is_supported(Path::new("notes.md")));
        assert!(!FileReader::is_supported(Path::new("slides.pptx")));
        assert!(!FileReader::is_supported(Path::new("README")));
    }

    #[tokio::test]
    async fn test_unsupported_format_is_an_error() {
        let err = FileReader::read_file(Path::new("deck.pptx")).await.unwrap_err();
        assert!(err.to_string().contains("Unsupported file format"));
    }

    #[tokio::test]
    async fn test_reads_text_files_in_name_order() {
        let dir = std::env::temp_dir().join(format!("ingest-reader-{}", std::process::id()));
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join("b.txt"), "second").await.unwrap();
        fs::write(dir.join("a.md"), "first").await.unwrap();
        fs::write(dir.join("skip.csv"), "ignored").await.unwrap();

        let files = FileReader::read_directory(&dir).await.unwrap();
        fs::remove_dir_all(&dir).await.unwrap();

        let contents: Vec<&str> = files.iter().map(|(_, c)| c.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }
}
