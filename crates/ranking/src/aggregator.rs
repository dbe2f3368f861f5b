//! Chunk score aggregation
//!
//! Reduces per-chunk scores to one document score and picks the excerpt.
//! The default policy is best-passage: a single strongly matching chunk makes
//! a document relevant no matter how much unrelated text surrounds it.

use contextforge_common::config::RankingConfig;
use contextforge_common::errors::{AppError, Result};
use contextforge_common::models::ScoredChunk;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Score reported for documents without any scorable chunk
pub const UNSCORED: f32 = f32::NEG_INFINITY;

/// How chunk scores combine into a document score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    /// Score of the best chunk
    #[default]
    Max,
    /// Mean of the `k` best chunk scores
    MeanOfTop { k: usize },
}

impl AggregationPolicy {
    /// Parse the policy named in ranking configuration
    pub fn from_config(config: &RankingConfig) -> Result<Self> {
        match config.aggregation.as_str() {
            "max" => Ok(AggregationPolicy::Max),
            "mean_of_top" if config.top_chunks > 0 => Ok(AggregationPolicy::MeanOfTop {
                k: config.top_chunks,
            }),
            "mean_of_top" => Err(AppError::Configuration {
                message: "ranking.top_chunks must be positive for mean_of_top".to_string(),
            }),
            other => Err(AppError::Configuration {
                message: format!("Unknown aggregation policy: {}", other),
            }),
        }
    }
}

/// Document-level result of aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub relevance_score: f32,
    /// Text of the best chunk, empty when there were no chunks
    pub excerpt: String,
    pub excerpt_offset: Option<usize>,
}

/// Combines scored chunks into a document score
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    policy: AggregationPolicy,
}

impl Aggregator {
    pub fn new(policy: AggregationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> AggregationPolicy {
        self.policy
    }

    /// Aggregate chunk scores. Ties for the best chunk go to the earliest offset.
    pub fn aggregate(&self, scored_chunks: &[ScoredChunk]) -> Aggregate {
        let Some(best) = best_chunk(scored_chunks) else {
            return Aggregate {
                relevance_score: UNSCORED,
                excerpt: String::new(),
                excerpt_offset: None,
            };
        };

        let relevance_score = match self.policy {
            AggregationPolicy::Max => best.score,
            AggregationPolicy::MeanOfTop { k } => {
                let mut scores: Vec<f32> = scored_chunks.iter().map(|c| c.score).collect();
                scores.sort_by(|a, b| b.total_cmp(a));
                let top = &scores[..k.max(1).min(scores.len())];
                top.iter().sum::<f32>() / top.len() as f32
            }
        };

        Aggregate {
            relevance_score,
            excerpt: best.chunk.text.clone(),
            excerpt_offset: Some(best.chunk.offset),
        }
    }
}

fn best_chunk(scored_chunks: &[ScoredChunk]) -> Option<&ScoredChunk> {
    scored_chunks.iter().reduce(|best, candidate| {
        match candidate.score.partial_cmp(&best.score) {
            Some(Ordering::Greater) => candidate,
            Some(Ordering::Equal) if candidate.chunk.offset < best.chunk.offset => candidate,
            _ => best,
        }
    })
}
