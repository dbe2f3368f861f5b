//! JSON fixture provider
//!
//! Serves previously captured search results, transcripts, and forum threads
//! from a single file:
//!
//! ```json
//! {
//!   "documents": [{ "id": "v1", "title": "...", "description": "..." }],
//!   "transcripts": { "v1": "full transcript text" },
//!   "threads": [{ "post": { "id": "abc", "url": "..." }, "comments": [] }],
//!   "search_results": ["https://www.reddit.com/r/x/comments/abc/title/?utm_source=share"]
//! }
//! ```

use async_trait::async_trait;
use contextforge_common::errors::{AppError, Result};
use contextforge_common::models::{DocumentRecord, RawThread};
use contextforge_common::normalize::clean_url;
use contextforge_common::providers::{ForumProvider, SearchProvider, Transcript, TranscriptProvider};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FixtureProvider {
    documents: Vec<DocumentRecord>,
    transcripts: HashMap<String, String>,
    threads: Vec<RawThread>,
    /// Raw forum search hits; the thread URLs are used when absent
    search_results: Vec<String>,
}

impl FixtureProvider {
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let fixture: Self = serde_json::from_str(&raw)?;
        debug!(
            path = %path.display(),
            documents = fixture.documents.len(),
            transcripts = fixture.transcripts.len(),
            threads = fixture.threads.len(),
            "Fixture loaded"
        );
        Ok(fixture)
    }

    /// Ids of every post in the fixture, in file order
    pub fn post_ids(&self) -> Vec<String> {
        self.threads.iter().map(|t| t.post.id.clone()).collect()
    }
}

#[async_trait]
impl SearchProvider for FixtureProvider {
    /// Fixtures hold results of an earlier search, so the query is not re-applied
    async fn fetch_documents(&self, _query: &str, limit: usize) -> Result<Vec<DocumentRecord>> {
        Ok(self.documents.iter().take(limit).cloned().collect())
    }
}

#[async_trait]
impl TranscriptProvider for FixtureProvider {
    async fn fetch_transcript(&self, document_id: &str) -> Result<Transcript> {
        Ok(match self.transcripts.get(document_id) {
            Some(text) if !text.trim().is_empty() => Transcript::Available(text.clone()),
            _ => Transcript::NotAvailable,
        })
    }
}

#[async_trait]
impl ForumProvider for FixtureProvider {
    async fn search_post_urls(&self, _query: &str, limit: usize) -> Result<Vec<String>> {
        let urls = if self.search_results.is_empty() {
            self.threads.iter().map(|t| t.post.url.clone()).collect()
        } else {
            self.search_results.clone()
        };
        Ok(urls.into_iter().take(limit).collect())
    }

    /// Looks the post up by id or by URL
    async fn fetch_post_and_comments(&self, query: &str) -> Result<RawThread> {
        let wanted = clean_url(query);
        let wanted = wanted.trim_end_matches('/');
        let matches_url = |url: &str| !url.is_empty() && clean_url(url).trim_end_matches('/') == wanted;

        self.threads
            .iter()
            .find(|t| t.post.id == query || matches_url(&t.post.url))
            .cloned()
            .ok_or_else(|| AppError::Provider {
                message: format!("No thread found for {}", query),
            })
    }
}
