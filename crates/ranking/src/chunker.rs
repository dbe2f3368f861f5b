//! Text chunking module
//!
//! Splits documents into overlapping windows small enough to score
//! meaningfully. Boundaries follow the coarsest semantic level that fits
//! (paragraphs, then lines, sentences, words, graphemes) and only fall back
//! to hard character cuts when nothing else fits inside the window.

use contextforge_common::config::ChunkingConfig;
use contextforge_common::errors::{AppError, Result};
use contextforge_common::models::Chunk;
use std::sync::Arc;
use text_splitter::{Characters, ChunkConfig, TextSplitter};
use tracing::debug;

/// Splits text into bounded, overlapping chunks
#[derive(Debug, Clone)]
pub struct Chunker {
    max_chunk_chars: usize,
    overlap_chars: usize,
    splitter: Arc<TextSplitter<Characters>>,
}

impl Chunker {
    /// Create a chunker; `overlap_chars` must be smaller than `max_chunk_chars`
    pub fn new(max_chunk_chars: usize, overlap_chars: usize) -> Result<Self> {
        if max_chunk_chars == 0 {
            return Err(AppError::Configuration {
                message: "max_chunk_chars must be positive".to_string(),
            });
        }

        let config = ChunkConfig::new(max_chunk_chars)
            .with_overlap(overlap_chars)
            .map_err(|e| AppError::Configuration {
                message: format!("invalid chunk overlap: {}", e),
            })?
            // Untrimmed chunks keep offsets aligned with the source text
            .with_trim(false);

        Ok(Self {
            max_chunk_chars,
            overlap_chars,
            splitter: Arc::new(TextSplitter::new(config)),
        })
    }

    /// Create a chunker from configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.max_chunk_chars, config.overlap_chars)
    }

    pub fn max_chunk_chars(&self) -> usize {
        self.max_chunk_chars
    }

    pub fn overlap_chars(&self) -> usize {
        self.overlap_chars
    }

    /// Split a document's text into chunks ordered by offset.
    ///
    /// Empty or whitespace-only text yields no chunks. Whitespace-only
    /// windows between paragraphs are dropped since they carry nothing to score.
    pub fn chunk(&self, document_id: &str, text: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chunks: Vec<Chunk> = self
            .splitter
            .chunk_indices(text)
            .filter(|(_, chunk_text)| !chunk_text.trim().is_empty())
            .enumerate()
            .map(|(index, (offset, chunk_text))| Chunk {
                source_document_id: document_id.to_string(),
                index,
                offset,
                text: chunk_text.to_string(),
            })
            .collect();

        debug!(
            document_id,
            input_len = text.len(),
            chunk_count = chunks.len(),
            max_chunk_chars = self.max_chunk_chars,
            "Text chunked"
        );

        chunks
    }
}
