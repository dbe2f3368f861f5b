//! ContextForge Common Library
//!
//! Shared code for the ranking and threading engines including:
//! - Document, chunk, comment, and post models
//! - Similarity primitive and embedding providers
//! - Error types and handling
//! - Configuration management
//! - Provider contracts for search, transcript, and forum sources
//! - Output serializers (raw, slim JSON, slim XML)
//! - Metrics and source normalization helpers

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod output;
pub mod providers;
pub mod similarity;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use similarity::Similarity;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
