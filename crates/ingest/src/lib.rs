pub mod paragraph;
pub mod reader;
pub mod splitter;

pub use paragraph::Paragraph;
pub use reader::FileReader;
pub use splitter::{ParagraphSplitter, SplitterConfig};

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

/// Generate a stable document ID from file path
pub fn generate_doc_id(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Read a report and return its body paragraphs in document order
pub async fn extract_paragraphs(file_path: &Path, min_length: usize) -> Result<Vec<Paragraph>> {
    let content = FileReader::read_file(file_path).await?;
    let path_str = file_path.to_string_lossy().to_string();
    let doc_id = generate_doc_id(&path_str);

    let splitter = ParagraphSplitter::new(SplitterConfig { min_length });
    let paragraphs = splitter.split(&doc_id, &content, &path_str);

    info!(path = %path_str, paragraphs = paragraphs.len(), "Extracted paragraphs");
    Ok(paragraphs)
}

/// Extract paragraphs from every supported file in a directory
pub async fn extract_directory(dir_path: &Path, min_length: usize) -> Result<Vec<Paragraph>> {
    let files = FileReader::read_directory(dir_path).await?;
    let splitter = ParagraphSplitter::new(SplitterConfig { min_length });

    let mut all_paragraphs = Vec::new();

    for (path, content) in files {
        let doc_id = generate_doc_id(&path);
        all_paragraphs.extend(splitter.split(&doc_id, &content, &path));
    }

    info!(dir = ?dir_path, paragraphs = all_paragraphs.len(), "Extracted paragraphs from directory");
    Ok(all_paragraphs)
}
