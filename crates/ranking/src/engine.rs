//! Ranking pipeline
//!
//! documents → chunker → scorer → aggregator → ranker
//!
//! Chunks of every document are scored as one ordered stream so batching and
//! concurrency apply across documents, then regrouped by document before
//! aggregation.

use crate::aggregator::{AggregationPolicy, Aggregator};
use crate::chunker::Chunker;
use crate::ranker::rank;
use crate::scorer::Scorer;
use contextforge_common::config::AppConfig;
use contextforge_common::errors::Result;
use contextforge_common::metrics::{record_ranking, record_skipped};
use contextforge_common::models::{Chunk, Document, DocumentRecord, RankedDocument, ScoredChunk};
use contextforge_common::similarity::Similarity;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Scoring throughput knobs
#[derive(Debug, Clone, Copy)]
pub struct ScoringOptions {
    /// Chunks per similarity request
    pub batch_size: usize,
    /// Similarity requests in flight
    pub concurrency: usize,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            batch_size: 16,
            concurrency: 4,
        }
    }
}

/// Result of ranking raw records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingOutcome {
    pub ranked: Vec<RankedDocument>,
    /// Records skipped because a required field was missing
    pub skipped: usize,
}

/// Ranks documents against a free-text query
#[derive(Clone)]
pub struct RankingEngine {
    chunker: Chunker,
    scorer: Scorer,
    aggregator: Aggregator,
    options: ScoringOptions,
}

impl RankingEngine {
    pub fn new(chunker: Chunker, scorer: Scorer, aggregator: Aggregator, options: ScoringOptions) -> Self {
        Self {
            chunker,
            scorer,
            aggregator,
            options,
        }
    }

    /// Build the engine from configuration and a similarity primitive
    pub fn from_config(config: &AppConfig, similarity: Arc<dyn Similarity>) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            Chunker::from_config(&config.chunking)?,
            Scorer::new(similarity),
            Aggregator::new(AggregationPolicy::from_config(&config.ranking)?),
            ScoringOptions {
                batch_size: config.similarity.batch_size,
                concurrency: config.ranking.concurrency,
            },
        ))
    }

    /// Rank validated documents and keep the best `top_n`.
    ///
    /// Fails only when scoring fails; documents without text rank last.
    #[instrument(skip(self, documents), fields(document_count = documents.len()))]
    pub async fn rank_documents(
        &self,
        query: &str,
        documents: Vec<Document>,
        top_n: usize,
    ) -> Result<Vec<RankedDocument>> {
        let started = Instant::now();

        let per_document: Vec<Vec<Chunk>> = documents
            .iter()
            .map(|doc| self.chunker.chunk(&doc.id, &doc.full_text))
            .collect();
        let chunk_counts: Vec<usize> = per_document.iter().map(Vec::len).collect();
        let all_chunks: Vec<Chunk> = per_document.into_iter().flatten().collect();
        let total_chunks = all_chunks.len();

        let scored = match self
            .scorer
            .score_chunks(query, all_chunks, self.options.batch_size, self.options.concurrency)
            .await
        {
            Ok(scored) => scored,
            Err(e) => {
                record_ranking(started.elapsed().as_secs_f64(), documents.len(), 0, false);
                return Err(e);
            }
        };

        let document_count = documents.len();
        let mut scored = scored.into_iter();
        let aggregated: Vec<RankedDocument> = documents
            .into_iter()
            .zip(chunk_counts)
            .map(|(document, count)| {
                let chunks: Vec<ScoredChunk> = scored.by_ref().take(count).collect();
                let aggregate = self.aggregator.aggregate(&chunks);
                RankedDocument {
                    document,
                    relevance_score: aggregate.relevance_score,
                    excerpt: aggregate.excerpt,
                    excerpt_offset: aggregate.excerpt_offset,
                    chunk_count: count,
                }
            })
            .collect();

        let ranked = rank(aggregated, top_n);

        record_ranking(started.elapsed().as_secs_f64(), document_count, total_chunks, true);
        info!(
            documents = document_count,
            chunks = total_chunks,
            returned = ranked.len(),
            primitive = self.scorer.primitive_name(),
            aggregation = ?self.aggregator.policy(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Documents ranked"
        );

        Ok(ranked)
    }

    /// Validate raw records, skipping malformed ones, then rank the rest
    pub async fn rank_records(
        &self,
        query: &str,
        records: Vec<DocumentRecord>,
        top_n: usize,
    ) -> Result<RankingOutcome> {
        let mut skipped = 0;
        let documents: Vec<Document> = records
            .into_iter()
            .filter_map(|record| match Document::try_from(record) {
                Ok(document) => Some(document),
                Err(e) => {
                    warn!(error = %e, "Skipping document record");
                    skipped += 1;
                    None
                }
            })
            .collect();

        record_skipped("document", skipped);

        let ranked = self.rank_documents(query, documents, top_n).await?;
        Ok(RankingOutcome { ranked, skipped })
    }
}
