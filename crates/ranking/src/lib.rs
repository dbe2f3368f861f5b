//! ContextForge Ranking Engine
//!
//! Ranks long-form documents (video transcripts, forum threads) against a
//! free-text query:
//! - Chunker: overlapping, boundary-aware text windows
//! - Scorer: normalized query/chunk similarity through the similarity primitive
//! - Aggregator: best-passage document score and excerpt
//! - Ranker: stable top-N ordering

pub mod aggregator;
pub mod chunker;
pub mod engine;
pub mod ranker;
pub mod scorer;

pub use aggregator::{Aggregate, AggregationPolicy, Aggregator};
pub use chunker::Chunker;
pub use engine::{RankingEngine, RankingOutcome, ScoringOptions};
pub use ranker::rank;
pub use scorer::Scorer;
