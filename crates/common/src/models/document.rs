//! Documents, chunks, and ranked results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, RecordKind};
use crate::normalize::{description_snippets, truncate_description};

/// Document as delivered by a search or transcript provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Option<String>,
    pub title: Option<String>,
    pub full_text: Option<String>,
    pub url: Option<String>,
    /// Channel or site the document came from
    pub source: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Validated document, immutable for the duration of one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub full_text: String,
    pub url: String,
    pub source: String,
    pub description: Option<String>,
    /// Description cut to a display-sized preview
    #[serde(default)]
    pub description_preview: Option<String>,
    /// First non-empty description lines
    #[serde(default)]
    pub snippets: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Whether `full_text` was filled from a transcript lookup
    #[serde(default)]
    pub has_transcript: bool,
}

impl Document {
    /// Create a document with the required fields and empty metadata
    pub fn new(id: impl Into<String>, title: impl Into<String>, full_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            full_text: full_text.into(),
            url: String::new(),
            source: "Unknown".to_string(),
            description: None,
            description_preview: None,
            snippets: description_snippets(""),
            published_at: None,
            has_transcript: false,
        }
    }
}

impl TryFrom<DocumentRecord> for Document {
    type Error = AppError;

    fn try_from(record: DocumentRecord) -> Result<Self, Self::Error> {
        let id = record
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AppError::malformed(RecordKind::Document, "missing id"))?;

        Ok(Self {
            id,
            title: record.title.unwrap_or_else(|| "No Title".to_string()),
            full_text: record.full_text.unwrap_or_default(),
            url: record.url.unwrap_or_default(),
            source: record.source.unwrap_or_else(|| "Unknown".to_string()),
            description_preview: record.description.as_deref().map(truncate_description),
            snippets: description_snippets(record.description.as_deref().unwrap_or_default()),
            description: record.description,
            published_at: record.published_at,
            has_transcript: false,
        })
    }
}

/// Bounded text window of a document, the unit of similarity scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub source_document_id: String,
    /// Position of this chunk within its document
    pub index: usize,
    /// Byte offset into the document's `full_text`
    pub offset: usize,
    pub text: String,
}

/// Chunk with its similarity score against the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Document with its aggregated relevance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDocument {
    #[serde(flatten)]
    pub document: Document,
    /// Aggregated score; negative infinity (serialized as null) when the
    /// document had no scorable text
    pub relevance_score: f32,
    /// Text of the best-matching chunk
    pub excerpt: String,
    pub excerpt_offset: Option<usize>,
    pub chunk_count: usize,
}

impl RankedDocument {
    /// True when the document carried no scorable text
    pub fn is_unscored(&self) -> bool {
        self.relevance_score == f32::NEG_INFINITY
    }
}
