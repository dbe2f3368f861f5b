//! Data model for ranking and threading
//!
//! Records (`*Record`) are the loosely-typed shapes providers hand us; every
//! field is optional. Validated entities are built from them with `TryFrom`,
//! which fails with `AppError::MalformedRecord` when a required field is absent.

mod document;
mod thread;

pub use document::{Chunk, Document, DocumentRecord, RankedDocument, ScoredChunk};
pub use thread::{Comment, CommentNode, CommentRecord, Post, RawThread};
