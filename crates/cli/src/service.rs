//! Context service
//!
//! Glue between the providers and the engines: fetch candidate documents,
//! fill in transcripts, rank; search or fetch forum posts, tidy them up,
//! rebuild their comment trees on the blocking pool.

use contextforge_common::config::ThreadConfig;
use contextforge_common::errors::{AppError, Result};
use contextforge_common::models::{DocumentRecord, Post, RawThread};
use contextforge_common::normalize::{clean_url, is_forum_post_url, title_from_url};
use contextforge_common::providers::{ForumProvider, SearchProvider, Transcript, TranscriptProvider};
use contextforge_ranking::{RankingEngine, RankingOutcome};
use contextforge_threads::{ThreadBuilder, ThreadOutcome};
use futures::stream::{self, StreamExt};
use futures::future;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Transcript lookups in flight
const TRANSCRIPT_CONCURRENCY: usize = 8;

pub struct ContextService {
    search: Arc<dyn SearchProvider>,
    transcripts: Arc<dyn TranscriptProvider>,
    forum: Arc<dyn ForumProvider>,
    engine: RankingEngine,
    threads: ThreadBuilder,
    forum_domain: String,
}

impl ContextService {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        transcripts: Arc<dyn TranscriptProvider>,
        forum: Arc<dyn ForumProvider>,
        engine: RankingEngine,
        threads: ThreadBuilder,
    ) -> Self {
        Self {
            search,
            transcripts,
            forum,
            engine,
            threads,
            forum_domain: ThreadConfig::default().forum_domain,
        }
    }

    /// Forum search hits outside `domain` are discarded
    pub fn with_forum_domain(mut self, domain: impl Into<String>) -> Self {
        self.forum_domain = domain.into();
        self
    }

    /// Search, fill in transcripts, and rank the candidates against `query`
    #[instrument(skip(self))]
    pub async fn rank_documents(
        &self,
        query: &str,
        search_limit: usize,
        top_n: usize,
    ) -> Result<RankingOutcome> {
        let records = self.search.fetch_documents(query, search_limit).await?;
        info!(candidates = records.len(), "Candidates fetched");

        let filled: Vec<(DocumentRecord, bool)> = stream::iter(records)
            .map(|record| self.fill_transcript(record))
            .buffered(TRANSCRIPT_CONCURRENCY)
            .collect()
            .await;

        let mut transcript_ids = HashSet::new();
        let records: Vec<DocumentRecord> = filled
            .into_iter()
            .map(|(record, from_transcript)| {
                if from_transcript {
                    if let Some(id) = &record.id {
                        transcript_ids.insert(id.clone());
                    }
                }
                record
            })
            .collect();

        let mut outcome = self.engine.rank_records(query, records, top_n).await?;
        for ranked in &mut outcome.ranked {
            ranked.document.has_transcript = transcript_ids.contains(&ranked.document.id);
        }
        Ok(outcome)
    }

    /// Returns the record and whether its text came from a transcript lookup
    async fn fill_transcript(&self, mut record: DocumentRecord) -> (DocumentRecord, bool) {
        if let Some(url) = record.url.as_mut() {
            *url = clean_url(url);
        }

        let has_text = record
            .full_text
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty());
        if has_text {
            return (record, false);
        }

        // Records without an id are skipped by validation later
        let Some(id) = record.id.clone().filter(|id| !id.trim().is_empty()) else {
            return (record, false);
        };

        let transcript = match self.transcripts.fetch_transcript(&id).await {
            Ok(transcript) => transcript,
            Err(e) => {
                warn!(document_id = %id, error = %e, "Transcript lookup failed, using description");
                Transcript::NotAvailable
            }
        };

        match transcript {
            Transcript::Available(text) => {
                record.full_text = Some(text);
                (record, true)
            }
            Transcript::NotAvailable => {
                debug!(document_id = %id, "No transcript, using description");
                record.full_text = record.description.clone();
                (record, false)
            }
        }
    }

    /// Search the forum and rebuild the first `limit` distinct posts.
    ///
    /// Hits off the forum domain, ads and settings pages are dropped; the rest
    /// are cleaned of tracking parameters before deduplication.
    #[instrument(skip(self))]
    pub async fn search_threads(&self, query: &str, limit: usize) -> Result<Vec<ThreadOutcome>> {
        let hits = self.forum.search_post_urls(query, limit.saturating_mul(2)).await?;

        let mut seen = HashSet::new();
        let urls: Vec<String> = hits
            .iter()
            .filter(|url| is_forum_post_url(url, &self.forum_domain))
            .map(|url| clean_url(url))
            .filter(|url| seen.insert(url.clone()))
            .take(limit)
            .collect();
        debug!(hits = hits.len(), kept = urls.len(), "Forum search filtered");

        self.fetch_threads(&urls).await
    }

    /// Fetch and rebuild one thread
    pub async fn fetch_thread(&self, query: &str) -> Result<ThreadOutcome> {
        let raw = self.forum.fetch_post_and_comments(query).await?;
        self.build_threads(vec![raw])
            .await?
            .pop()
            .ok_or_else(|| AppError::Other(anyhow::anyhow!("thread build returned no outcome")))
    }

    /// Fetch every post in `queries` and rebuild them, preserving query order
    #[instrument(skip(self, queries), fields(posts = queries.len()))]
    pub async fn fetch_threads(&self, queries: &[String]) -> Result<Vec<ThreadOutcome>> {
        let raw = future::try_join_all(
            queries
                .iter()
                .map(|query| self.forum.fetch_post_and_comments(query)),
        )
        .await?;
        self.build_threads(raw).await
    }

    /// Build threads concurrently on the blocking pool.
    ///
    /// Each build owns its post and comments; nothing is shared between them.
    pub async fn build_threads(&self, raw_threads: Vec<RawThread>) -> Result<Vec<ThreadOutcome>> {
        let builder = self.threads;
        let handles = raw_threads.into_iter().map(|RawThread { mut post, comments }| {
            tidy_post(&mut post);
            tokio::task::spawn_blocking(move || builder.build(post, comments))
        });

        let outcomes = future::try_join_all(handles)
            .await
            .map_err(|e| AppError::Other(anyhow::Error::new(e).context("thread build task failed")))?;

        let dropped: usize = outcomes.iter().map(|o| o.dropped_comments).sum();
        let orphaned: usize = outcomes.iter().map(|o| o.orphaned_comments).sum();
        info!(threads = outcomes.len(), dropped, orphaned, "Threads built");

        Ok(outcomes)
    }
}

/// Canonical URL, and a title recovered from it when the provider sent none
fn tidy_post(post: &mut Post) {
    post.url = clean_url(&post.url);
    if post.title.trim().is_empty() {
        post.title = title_from_url(&post.url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FixtureProvider;
    use async_trait::async_trait;
    use contextforge_common::config::AppConfig;
    use contextforge_common::embeddings::HashingEmbedder;
    use contextforge_common::models::CommentRecord;
    use contextforge_common::similarity::{EmbeddingSimilarity, Similarity};

    struct BrokenTranscripts;

    #[async_trait]
    impl TranscriptProvider for BrokenTranscripts {
        async fn fetch_transcript(&self, _document_id: &str) -> Result<Transcript> {
            Err(AppError::Provider {
                message: "quota exceeded".into(),
            })
        }
    }

    struct DownSimilarity;

    #[async_trait]
    impl Similarity for DownSimilarity {
        async fn similarity(&self, _a: &str, _b: &str) -> Result<f32> {
            Err(AppError::Embedding {
                message: "connection refused".into(),
            })
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    const FIXTURE: &str = r#"{
        "documents": [
            { "id": "bake", "title": "Baking", "description": "Sourdough bread with a starter" },
            { "id": "monitor", "title": "Monitors", "url": "https://youtu.be/monitor?t=30" },
            { "id": "inline", "title": "Inline", "full_text": "Gardening tips for tomatoes" },
            { "title": "No id", "full_text": "best 1440p monitor" }
        ],
        "transcripts": {
            "monitor": "Reviewing the best 1440p gaming monitor of the year",
            "inline": "best 1440p monitor best 1440p monitor"
        },
        "threads": [
            {
                "post": { "id": "p1", "title": "", "url": "https://www.reddit.com/r/monitors/comments/p1/best_budget_monitor/?utm=x", "selftext": "Which one?" },
                "comments": [
                    { "id": "c1", "parent_id": "t3_p1", "body": "The cheap one", "score": 3 },
                    { "id": "c2", "parent_id": "t1_c1", "body": "Agreed", "score": 1 }
                ]
            },
            {
                "post": { "id": "p2", "title": "Second", "url": "https://www.reddit.com/r/baking/comments/p2/second/", "selftext": "" },
                "comments": [{ "parent_id": "p2", "body": "no id" }]
            }
        ],
        "search_results": [
            "https://www.reddit.com/r/monitors/comments/p1/best_budget_monitor/?utm_source=share",
            "https://www.reddit.com/ads/promoted/",
            "https://example.com/r/monitors/comments/p9/elsewhere/",
            "https://www.reddit.com/settings/profile",
            "https://www.reddit.com/r/monitors/comments/p1/best_budget_monitor/#top",
            "https://www.reddit.com/r/baking/comments/p2/second/"
        ]
    }"#;

    fn similarity() -> Arc<dyn Similarity> {
        Arc::new(EmbeddingSimilarity::new(Arc::new(HashingEmbedder::new(512))))
    }

    fn service_with(
        transcripts: Arc<dyn TranscriptProvider>,
        similarity: Arc<dyn Similarity>,
    ) -> ContextService {
        let fixture: Arc<FixtureProvider> = Arc::new(serde_json::from_str(FIXTURE).unwrap());
        let config = AppConfig::default();
        ContextService::new(
            fixture.clone(),
            transcripts,
            fixture,
            RankingEngine::from_config(&config, similarity).unwrap(),
            ThreadBuilder::from_config(&config.threads),
        )
    }

    fn service() -> ContextService {
        let fixture: Arc<FixtureProvider> = Arc::new(serde_json::from_str(FIXTURE).unwrap());
        service_with(fixture, similarity())
    }

    #[tokio::test]
    async fn test_rank_fills_transcripts_and_falls_back() {
        let outcome = service().rank_documents("best 1440p monitor", 10, 10).await.unwrap();
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.ranked.len(), 3);

        let monitor = outcome.ranked.iter().find(|r| r.document.id == "monitor").unwrap();
        assert!(monitor.document.has_transcript);
        assert_eq!(monitor.document.url, "https://youtu.be/monitor");

        let bake = outcome.ranked.iter().find(|r| r.document.id == "bake").unwrap();
        assert!(!bake.document.has_transcript);
        assert_eq!(bake.excerpt, "Sourdough bread with a starter");

        // Text already present is not replaced by the transcript
        let inline = outcome.ranked.iter().find(|r| r.document.id == "inline").unwrap();
        assert_eq!(inline.document.full_text, "Gardening tips for tomatoes");
        assert!(!inline.document.has_transcript);

        assert_eq!(outcome.ranked[0].document.id, "monitor");
    }

    #[tokio::test]
    async fn test_transcript_failure_uses_description() {
        let outcome = service_with(Arc::new(BrokenTranscripts), similarity())
            .rank_documents("bread", 10, 10)
            .await
            .unwrap();

        let monitor = outcome.ranked.iter().find(|r| r.document.id == "monitor").unwrap();
        assert!(monitor.is_unscored());
        assert_eq!(outcome.ranked[0].document.id, "bake");
    }

    #[tokio::test]
    async fn test_scoring_failure_propagates() {
        let fixture: Arc<FixtureProvider> = Arc::new(serde_json::from_str(FIXTURE).unwrap());
        let err = service_with(fixture, Arc::new(DownSimilarity))
            .rank_documents("anything", 10, 3)
            .await
            .unwrap_err();
        assert!(err.is_pipeline_failure());
    }

    #[tokio::test]
    async fn test_fetch_threads_tidies_posts() {
        let outcomes = service()
            .fetch_threads(&["p1".to_string(), "p2".to_string()])
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        let first = &outcomes[0].post;
        assert_eq!(first.title, "Best Budget Monitor");
        assert_eq!(first.url, "https://www.reddit.com/r/monitors/comments/p1/best_budget_monitor/");
        assert_eq!(first.top_comments[0].rendered_body, "> Which one?\n\nThe cheap one");
        assert_eq!(first.top_comments[0].children[0].rendered_body, "> The cheap one\n\nAgreed");

        assert_eq!(outcomes[1].post.title, "Second");
        assert_eq!(outcomes[1].dropped_comments, 1);
    }

    #[tokio::test]
    async fn test_search_threads_keeps_distinct_forum_posts() {
        let outcomes = service().search_threads("budget monitor", 5).await.unwrap();
        let ids: Vec<&str> = outcomes.iter().map(|o| o.post.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
        assert_eq!(
            outcomes[0].post.url,
            "https://www.reddit.com/r/monitors/comments/p1/best_budget_monitor/"
        );

        let first_only = service().search_threads("budget monitor", 1).await.unwrap();
        assert_eq!(first_only.len(), 1);
        assert_eq!(first_only[0].post.id, "p1");
    }

    #[tokio::test]
    async fn test_search_threads_on_other_domain_finds_nothing() {
        let outcomes = service()
            .with_forum_domain("news.ycombinator.com")
            .search_threads("budget monitor", 5)
            .await
            .unwrap();
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_thread_is_provider_error() {
        let err = service().fetch_thread("nope").await.unwrap_err();
        assert!(matches!(err, AppError::Provider { .. }));
    }

    #[tokio::test]
    async fn test_build_threads_in_input_order() {
        let raw: Vec<RawThread> = (0..6)
            .map(|i| RawThread {
                post: Post {
                    id: format!("p{}", i),
                    title: format!("Post {}", i),
                    ..Default::default()
                },
                comments: vec![CommentRecord {
                    id: Some(format!("c{}", i)),
                    parent_id: Some(format!("p{}", i)),
                    body: Some("reply".into()),
                    ..Default::default()
                }],
            })
            .collect();

        let outcomes = service().build_threads(raw).await.unwrap();
        let ids: Vec<&str> = outcomes.iter().map(|o| o.post.id.as_str()).collect();
        assert_eq!(ids, vec!["p0", "p1", "p2", "p3", "p4", "p5"]);
        assert!(outcomes.iter().all(|o| o.post.top_comments.len() == 1));
    }
}
