//! Query/chunk scoring
//!
//! Wraps the similarity primitive with consistent normalization so scores
//! are comparable across chunks and documents. Primitive failures surface as
//! `ScoringUnavailable`; a failed score is never replaced by a default.

use contextforge_common::errors::{AppError, Result};
use contextforge_common::models::{Chunk, ScoredChunk};
use contextforge_common::similarity::Similarity;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::debug;

/// Lowercase and collapse whitespace runs to single spaces
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Scores text against a query through the similarity primitive
#[derive(Clone)]
pub struct Scorer {
    similarity: Arc<dyn Similarity>,
}

impl Scorer {
    pub fn new(similarity: Arc<dyn Similarity>) -> Self {
        Self { similarity }
    }

    /// Name of the underlying similarity primitive
    pub fn primitive_name(&self) -> &str {
        self.similarity.name()
    }

    /// Score a single chunk text against the query
    pub async fn score(&self, query: &str, chunk_text: &str) -> Result<f32> {
        let query = normalized_query(query)?;
        let score = self
            .similarity
            .similarity(&query, &normalize(chunk_text))
            .await
            .map_err(into_scoring_error)?;
        check_finite(score)
    }

    /// Score chunks in batches, keeping at most `concurrency` batches in
    /// flight. Scores come back in the original chunk order.
    pub async fn score_chunks(
        &self,
        query: &str,
        chunks: Vec<Chunk>,
        batch_size: usize,
        concurrency: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let query = normalized_query(query)?;
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = chunks.iter().map(|c| normalize(&c.text)).collect();
        let batch_size = batch_size.max(1);

        let batches: Vec<Vec<f32>> = stream::iter(texts.chunks(batch_size))
            .map(|batch| self.score_batch(&query, batch))
            // `buffered` yields in submission order regardless of completion order
            .buffered(concurrency.max(1))
            .try_collect()
            .await?;

        let scores: Vec<f32> = batches.into_iter().flatten().collect();

        debug!(
            chunk_count = chunks.len(),
            batch_size,
            primitive = self.similarity.name(),
            "Chunks scored"
        );

        Ok(chunks
            .into_iter()
            .zip(scores)
            .map(|(chunk, score)| ScoredChunk { chunk, score })
            .collect())
    }

    async fn score_batch(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        let scores = self
            .similarity
            .similarity_batch(query, texts)
            .await
            .map_err(into_scoring_error)?;

        if scores.len() != texts.len() {
            return Err(AppError::scoring(format!(
                "similarity primitive returned {} scores for {} texts",
                scores.len(),
                texts.len()
            )));
        }

        scores.into_iter().map(check_finite).collect()
    }
}

fn normalized_query(query: &str) -> Result<String> {
    let query = normalize(query);
    if query.is_empty() {
        return Err(AppError::Validation {
            message: "query must not be empty".to_string(),
        });
    }
    Ok(query)
}

fn check_finite(score: f32) -> Result<f32> {
    if score.is_finite() {
        Ok(score)
    } else {
        Err(AppError::scoring(format!(
            "similarity primitive returned non-finite score {}",
            score
        )))
    }
}

fn into_scoring_error(err: AppError) -> AppError {
    match err {
        AppError::ScoringUnavailable { .. } => err,
        other => AppError::scoring(other.to_string()),
    }
}
