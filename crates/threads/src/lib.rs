//! ContextForge Thread Builder
//!
//! Rebuilds forum comment trees from flat reply lists. Each reply is rendered
//! with the text it answers quoted in front of it, and only the strongest
//! root-level branches of a post are kept.

pub mod builder;
pub mod quote;

pub use builder::{build_thread, ThreadBuilder, ThreadOutcome};
pub use quote::render_quoted;
