//! Configuration management for ContextForge
//!
//! Supports loading configuration from:
//! - A `.env` file in the working directory
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Environment variables (prefixed with APP__)
//! - Default values
//!
//! Components never read configuration from globals; each one is built from
//! the section it needs via its `from_config` constructor.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{AppError, Result};

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Similarity primitive configuration
    #[serde(default)]
    pub similarity: SimilarityConfig,

    /// Document chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Ranking configuration
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Comment threading configuration
    #[serde(default)]
    pub threads: ThreadConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimilarityConfig {
    /// Similarity provider: openai, hashing
    #[serde(default = "default_similarity_provider")]
    pub provider: String,

    /// API key for the embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension for the local hashing embedder
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Upper bound on time spent retrying a failed request
    #[serde(default = "default_max_retry_elapsed")]
    pub max_retry_elapsed_secs: u64,

    /// Batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RankingConfig {
    /// Number of documents returned by default
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Maximum number of scoring batches in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Aggregation policy: max, mean_of_top
    #[serde(default = "default_aggregation")]
    pub aggregation: String,

    /// Chunk count used by the mean_of_top policy
    #[serde(default = "default_top_chunks")]
    pub top_chunks: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThreadConfig {
    /// Number of root-level comment branches retained per post
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Site whose post URLs are accepted from forum search results
    #[serde(default = "default_forum_domain")]
    pub forum_domain: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,
}

// Default value functions
fn default_similarity_provider() -> String { "hashing".to_string() }
fn default_embedding_model() -> String { "text-embedding-3-small".to_string() }
fn default_embedding_dimension() -> usize { 256 }
fn default_embedding_timeout() -> u64 { 30 }
fn default_max_retry_elapsed() -> u64 { 10 }
fn default_batch_size() -> usize { 16 }
fn default_max_chunk_chars() -> usize { 1000 }
fn default_overlap_chars() -> usize { 200 }
fn default_top_n() -> usize { 3 }
fn default_concurrency() -> usize { 4 }
fn default_aggregation() -> String { "max".to_string() }
fn default_top_chunks() -> usize { 3 }
fn default_top_k() -> usize { 5 }
fn default_forum_domain() -> String { "reddit.com".to_string() }
fn default_log_level() -> String { "info".to_string() }

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            provider: default_similarity_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
            max_retry_elapsed_secs: default_max_retry_elapsed(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            concurrency: default_concurrency(),
            aggregation: default_aggregation(),
            top_chunks: default_top_chunks(),
        }
    }
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            forum_domain: default_forum_domain(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
        }
    }
}

impl SimilarityConfig {
    /// Request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Retry budget as Duration
    pub fn max_retry_elapsed(&self) -> Duration {
        Duration::from_secs(self.max_retry_elapsed_secs)
    }
}

impl AppConfig {
    /// Load configuration from `.env`, files, and environment
    pub fn load() -> std::result::Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__RANKING__TOP_N=5
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific file, still honoring APP__ overrides
    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Check cross-field invariants that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_chunk_chars == 0 {
            return Err(AppError::Configuration {
                message: "chunking.max_chunk_chars must be positive".to_string(),
            });
        }
        if self.chunking.overlap_chars >= self.chunking.max_chunk_chars {
            return Err(AppError::Configuration {
                message: format!(
                    "chunking.overlap_chars ({}) must be smaller than chunking.max_chunk_chars ({})",
                    self.chunking.overlap_chars, self.chunking.max_chunk_chars
                ),
            });
        }
        if self.similarity.batch_size == 0 || self.ranking.concurrency == 0 {
            return Err(AppError::Configuration {
                message: "similarity.batch_size and ranking.concurrency must be positive".to_string(),
            });
        }
        Ok(())
    }
}
