//! External collaborator contracts
//!
//! Search, transcript, and forum providers supply raw records to the engines.
//! They own their own retry and backoff policy and only report terminal
//! failures upward.

use crate::errors::Result;
use crate::models::{DocumentRecord, RawThread};
use async_trait::async_trait;

/// Transcript lookup result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcript {
    Available(String),
    NotAvailable,
}

/// Finds candidate documents for a query
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn fetch_documents(&self, query: &str, limit: usize) -> Result<Vec<DocumentRecord>>;
}

/// Fetches the full text of a document by id
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    async fn fetch_transcript(&self, document_id: &str) -> Result<Transcript>;
}

/// Finds forum posts and fetches their flat comment lists
#[async_trait]
pub trait ForumProvider: Send + Sync {
    /// Candidate post URLs for a query, unfiltered and possibly with tracking parameters
    async fn search_post_urls(&self, query: &str, limit: usize) -> Result<Vec<String>>;

    /// Post and comments for a post id or URL
    async fn fetch_post_and_comments(&self, query: &str) -> Result<RawThread>;
}
