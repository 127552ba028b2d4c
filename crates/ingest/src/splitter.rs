use crate::paragraph::Paragraph;

pub struct SplitterConfig {
    /// Paragraphs shorter than this many characters are dropped
    pub min_length: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self { min_length: 300 }
    }
}

/// Splits extracted document text into body paragraphs.
pub struct ParagraphSplitter {
    config: SplitterConfig,
}

impl ParagraphSplitter {
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    pub fn split(&self, doc_id: &str, text: &str, source: &str) -> Vec<Paragraph> {
        self.split_blocks(text)
            .into_iter()
            .filter(|block| block.chars().count() >= self.config.min_length)
            .filter(|block| !is_all_caps(block))
            .enumerate()
            .map(|(index, block)| {
                Paragraph::new(doc_id.to_string(), index, block, source.to_string())
            })
            .collect()
    }

    /// Group consecutive non-blank lines into blocks, joining wrapped lines.
    fn split_blocks(&self, text: &str) -> Vec<String> {
        let mut blocks = Vec::new();
        let mut current = String::new();

        for line in text.lines() {
            let line = line.trim();

            if line.is_empty() {
                if !current.is_empty() {
                    blocks.push(std::mem::take(&mut current));
                }
                continue;
            }

            // "AI-\npowered" is one word broken across lines
            if !current.is_empty() && !current.ends_with('-') {
                current.push(' ');
            }
            current.push_str(line);
        }

        if !current.is_empty() {
            blocks.push(current);
        }

        blocks
    }
}

/// True for headings and banners: at least one cased letter and no lowercase.
fn is_all_caps(text: &str) -> bool {
    let has_cased = text.chars().any(|c| c.is_uppercase() || c.is_lowercase());
    has_cased && !text.chars().any(char::is_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long(sentence: &str) -> String {
        sentence.repeat(20)
    }

    #[test]
    fn test_blank_lines_separate_paragraphs() {
        let splitter = ParagraphSplitter::new(SplitterConfig { min_length: 10 });
        let text = "First paragraph line one\nline two.\n\n\nSecond paragraph.\n";

        let paragraphs = splitter.split("doc", text, "report.pdf");

        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].text, "First paragraph line one line two.");
        assert_eq!(paragraphs[1].index, 1);
        assert_eq!(paragraphs[1].source, "report.pdf");
    }

    #[test]
    fn test_short_paragraphs_and_headings_are_dropped() {
        let splitter = ParagraphSplitter::new(SplitterConfig::default());
        let body = long("Students use LMS platforms to access course materials. ");
        let heading = long("USER RESEARCH AND FINDINGS ");
        let text = format!("Introduction\n\n{}\n\n{}\n\nPage 3", heading, body);

        let paragraphs = splitter.split("doc", &text, "report.pdf");

        assert_eq!(paragraphs.len(), 1);
        assert_eq!(paragraphs[0].index, 0);
        assert!(paragraphs[0].text.starts_with("Students use LMS"));
    }

    #[test]
    fn test_hyphenated_line_breaks_are_joined() {
        let splitter = ParagraphSplitter::new(SplitterConfig { min_length: 1 });
        let paragraphs = splitter.split("doc", "AI-\npowered LMS platforms", "x.txt");
        assert_eq!(paragraphs[0].text, "AI-powered LMS platforms");
    }

    #[test]
    fn test_all_caps_detection() {
        assert!(is_all_caps("KEY FINDINGS 2024"));
        assert!(!is_all_caps("Key findings"));
        assert!(!is_all_caps("2024 - 2025"));
    }
}
