//! Error types for ContextForge
//!
//! Provides the error taxonomy shared by the ranking and threading engines:
//! - Pipeline-wide failures (similarity primitive down) that abort a request
//! - Per-record failures (malformed document or comment) that are counted and skipped
//! - Configuration and I/O failures from the surrounding shell
//!
//! "No input" is deliberately not an error: empty inputs produce empty outcomes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MalformedRecord,

    // External service errors (8xxx)
    ScoringUnavailable,
    EmbeddingError,
    ProviderError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
    IoError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MalformedRecord => 1002,

            // External (8xxx)
            ErrorCode::ScoringUnavailable => 8001,
            ErrorCode::EmbeddingError => 8002,
            ErrorCode::ProviderError => 8003,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
            ErrorCode::IoError => 9004,
        }
    }
}

/// Kind of record that failed validation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Document,
    Comment,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RecordKind::Document => "document",
            RecordKind::Comment => "comment",
        };
        f.write_str(name)
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Malformed {kind} record: {reason}")]
    MalformedRecord { kind: RecordKind, reason: String },

    // External service errors
    #[error("Scoring unavailable: {message}")]
    ScoringUnavailable { message: String },

    #[error("Embedding service error: {message}")]
    Embedding { message: String },

    #[error("Provider error: {message}")]
    Provider { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a malformed record error
    pub fn malformed(kind: RecordKind, reason: impl Into<String>) -> Self {
        AppError::MalformedRecord {
            kind,
            reason: reason.into(),
        }
    }

    /// Shorthand for a scoring failure
    pub fn scoring(message: impl Into<String>) -> Self {
        AppError::ScoringUnavailable {
            message: message.into(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MalformedRecord { .. } => ErrorCode::MalformedRecord,
            AppError::ScoringUnavailable { .. } => ErrorCode::ScoringUnavailable,
            AppError::Embedding { .. } => ErrorCode::EmbeddingError,
            AppError::Provider { .. } => ErrorCode::ProviderError,
            AppError::HttpClient(_) => ErrorCode::ProviderError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Io(_) => ErrorCode::IoError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// True when the error aborts a whole request rather than one record.
    ///
    /// Callers use this to tell "ranking failed" apart from "no results".
    pub fn is_pipeline_failure(&self) -> bool {
        !self.is_record_error()
    }

    /// True for errors scoped to a single input record
    pub fn is_record_error(&self) -> bool {
        matches!(self, AppError::MalformedRecord { .. })
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}
