//! Semantic similarity primitive
//!
//! The ranking engine only needs "how similar are these two spans"; this
//! module provides that contract and an embedding-backed implementation
//! using cosine similarity.

use crate::config::SimilarityConfig;
use crate::embeddings::{create_embedder, Embedder};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Maps two text spans to a similarity score
#[async_trait]
pub trait Similarity: Send + Sync {
    /// Similarity of `a` and `b`
    async fn similarity(&self, a: &str, b: &str) -> Result<f32>;

    /// Similarity of `query` against each text, in input order
    async fn similarity_batch(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(texts.len());
        for text in texts {
            scores.push(self.similarity(query, text).await?);
        }
        Ok(scores)
    }

    /// Name used in logs and metrics
    fn name(&self) -> &str;
}

/// Cosine similarity over embeddings
pub struct EmbeddingSimilarity {
    embedder: Arc<dyn Embedder>,
}

impl EmbeddingSimilarity {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }
}

#[async_trait]
impl Similarity for EmbeddingSimilarity {
    async fn similarity(&self, a: &str, b: &str) -> Result<f32> {
        let embeddings = self
            .embedder
            .embed_batch(&[a.to_string(), b.to_string()])
            .await?;
        match embeddings.as_slice() {
            [left, right] => cosine_similarity(left, right),
            other => Err(AppError::Embedding {
                message: format!("Expected 2 embeddings, received {}", other.len()),
            }),
        }
    }

    async fn similarity_batch(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        let query_embedding = self.embedder.embed(query).await?;
        let embeddings = self.embedder.embed_batch(texts).await?;

        if embeddings.len() != texts.len() {
            return Err(AppError::Embedding {
                message: format!(
                    "Expected {} embeddings, received {}",
                    texts.len(),
                    embeddings.len()
                ),
            });
        }

        embeddings
            .iter()
            .map(|embedding| cosine_similarity(&query_embedding, embedding))
            .collect()
    }

    fn name(&self) -> &str {
        self.embedder.model_name()
    }
}

/// Cosine similarity in [-1, 1]; a zero vector has similarity 0 with anything
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(AppError::Embedding {
            message: format!("Dimension mismatch: {} vs {}", a.len(), b.len()),
        });
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

/// Create the similarity primitive described by configuration
pub fn create_similarity(config: &SimilarityConfig) -> Result<Arc<dyn Similarity>> {
    let embedder = create_embedder(config)?;
    tracing::info!(
        provider = %config.provider,
        model = embedder.model_name(),
        dimension = embedder.dimension(),
        "Similarity primitive ready"
    );
    Ok(Arc::new(EmbeddingSimilarity::new(embedder)))
}
