use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paragraph {
    pub doc_id: String,
    pub paragraph_id: String,
    /// Position among the kept paragraphs of the document
    pub index: usize,
    pub text: String,
    pub source: String,
}

impl Paragraph {
    pub fn new(doc_id: String, index: usize, text: String, source: String) -> Self {
        // Generate stable paragraph_id from content
        let paragraph_id = Self::generate_paragraph_id(&doc_id, index, &text);

        Self {
            doc_id,
            paragraph_id,
            index,
            text,
            source,
        }
    }

    fn generate_paragraph_id(doc_id: &str, index: usize, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(doc_id.as_bytes());
        hasher.update(index.to_string().as_bytes());
        hasher.update(text.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16]) // Use first 16 bytes (32 hex chars)
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}
