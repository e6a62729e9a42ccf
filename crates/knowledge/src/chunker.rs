//! Markdown-aware chunking of page texts.

use crate::types::{DocumentChunk, PageText};
use chrono::{DateTime, Utc};
use docchat_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use text_splitter::{ChunkConfig, MarkdownSplitter};

/// Splits page texts into overlapping chunks of at most `chunk_size`
/// characters.
pub struct Chunker {
    splitter: MarkdownSplitter<text_splitter::Characters>,
    chunk_size: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> AppResult<Self> {
        if chunk_size == 0 {
            return Err(AppError::Knowledge("chunk_size must be positive".to_string()));
        }

        let config = ChunkConfig::new(chunk_size)
            .with_overlap(chunk_overlap)
            .map_err(|e| AppError::Knowledge(format!("Invalid chunk configuration: {}", e)))?;

        Ok(Self {
            splitter: MarkdownSplitter::new(config),
            chunk_size,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Chunk the pages of one document.
    ///
    /// Positions count up across pages so they stay unique per source.
    pub fn split_document(&self, pages: &[PageText], indexed_at: DateTime<Utc>) -> Vec<DocumentChunk> {
        let mut chunks = Vec::new();
        let mut position = 0u32;

        for page in pages {
            let source = page.source.display().to_string();

            for text in self.splitter.chunks(&page.text) {
                if text.trim().is_empty() {
                    continue;
                }

                chunks.push(DocumentChunk {
                    id: uuid::Uuid::new_v4().to_string(),
                    text: text.to_string(),
                    source: source.clone(),
                    page: page.page,
                    position,
                    metadata: serde_json::json!({
                        "source": source,
                        "page": page.page,
                        "position": position,
                        "content_hash": content_hash(text),
                        "char_count": text.chars().count(),
                        "indexed_at": indexed_at.to_rfc3339(),
                    }),
                    embedding: None,
                });
                position += 1;
            }
        }

        chunks
    }
}

/// SHA-256 of the chunk text, hex encoded.
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn page(page: u32, text: &str) -> PageText {
        PageText {
            source: PathBuf::from("docs/notice.pdf"),
            page,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(Chunker::new(0, 0).is_err());
        assert!(Chunker::new(100, 150).is_err());
    }

    #[test]
    fn test_short_page_is_single_chunk() {
        let chunker = Chunker::new(1200, 150).unwrap();
        let chunks = chunker.split_document(&[page(1, "Applications open on March 3.")], Utc::now());

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Applications open on March 3.");
        assert_eq!(chunks[0].page, 1);
        assert_eq!(chunks[0].source, "docs/notice.pdf");
        assert_eq!(chunks[0].metadata["content_hash"], content_hash("Applications open on March 3."));
    }

    #[test]
    fn test_chunks_respect_size_limit() {
        let paragraph = "Eligible applicants must be adult residents without a house. ".repeat(12);
        let text = format!("# Eligibility\n\n{}\n\n## Documents\n\n{}", paragraph, paragraph);

        let chunker = Chunker::new(200, 40).unwrap();
        let chunks = chunker.split_document(&[page(1, &text)], Utc::now());

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 200));
    }

    #[test]
    fn test_positions_continue_across_pages() {
        let chunker = Chunker::new(1200, 150).unwrap();
        let chunks = chunker.split_document(
            &[page(1, "First page."), page(2, "Second page."), page(3, "Third page.")],
            Utc::now(),
        );

        let positions: Vec<u32> = chunks.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        let pages: Vec<u32> = chunks.iter().map(|c| c.page).collect();
        assert_eq!(pages, vec![1, 2, 3]);
    }

    #[test]
    fn test_non_ascii_measured_in_characters() {
        let text = "주택청약 신청 자격은 무주택 세대구성원입니다. ".repeat(30);
        let chunker = Chunker::new(100, 10).unwrap();
        let chunks = chunker.split_document(&[page(1, &text)], Utc::now());

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 100));
    }

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
        assert_eq!(content_hash("").len(), 64);
    }
}
