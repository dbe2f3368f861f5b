//! Forum posts and comment threads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, RecordKind};

/// Comment as delivered by a forum provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: Option<String>,
    pub parent_id: Option<String>,
    pub author: Option<String>,
    pub body: Option<String>,
    pub score: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Validated comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    /// Post id, another comment's id (optionally as a fullname), or none
    pub parent_id: Option<String>,
    pub author: String,
    /// Raw text, possibly already carrying a quoted block from upstream
    pub body: String,
    pub score: i64,
    pub created_at: Option<DateTime<Utc>>,
}

impl Comment {
    /// Create a comment with default author and no timestamp
    pub fn new(
        id: impl Into<String>,
        parent_id: Option<&str>,
        body: impl Into<String>,
        score: i64,
    ) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.map(str::to_string),
            author: "[deleted]".to_string(),
            body: body.into(),
            score,
            created_at: None,
        }
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = AppError;

    fn try_from(record: CommentRecord) -> Result<Self, Self::Error> {
        let id = record
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AppError::malformed(RecordKind::Comment, "missing id"))?;

        Ok(Self {
            id,
            parent_id: record.parent_id.filter(|p| !p.trim().is_empty()),
            author: record.author.unwrap_or_else(|| "[deleted]".to_string()),
            body: record.body.unwrap_or_default(),
            score: record.score.unwrap_or(0),
            created_at: record.created_at,
        })
    }
}

/// Comment placed in a reconstructed thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    /// Body with the parent's text quoted in front of it, when a parent exists
    pub rendered_body: String,
    /// Whether a quoted reference was added by the builder
    pub quoted: bool,
    /// Replies ordered by score descending, then by earlier creation time
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    /// Number of nodes in this subtree, including this one
    pub fn subtree_len(&self) -> usize {
        let mut len = 0;
        self.walk(&mut |_| len += 1);
        len
    }

    /// Depth-first pre-order walk over the subtree.
    ///
    /// Uses an explicit stack, so reply chains of any depth are safe to visit.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a CommentNode)) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            visit(node);
            stack.extend(node.children.iter().rev());
        }
    }
}

impl Drop for CommentNode {
    // Unlinks descendants one level at a time instead of recursing per level
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Forum post with its selected comment branches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub subreddit: String,
    pub url: String,
    pub selftext: String,
    pub author: String,
    pub score: i64,
    pub num_comments: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub top_comments: Vec<CommentNode>,
}

impl Post {
    /// Rendered bodies of every retained comment, flattened in pre-order
    pub fn flattened_comment_bodies(&self) -> Vec<&str> {
        let mut bodies = Vec::new();
        for root in &self.top_comments {
            root.walk(&mut |node| bodies.push(node.rendered_body.as_str()));
        }
        bodies
    }

    /// Whether a parent reference names this post, directly or as a `t3_` fullname
    pub fn is_referenced_by(&self, parent_id: &str) -> bool {
        !self.id.is_empty()
            && (parent_id == self.id || parent_id.strip_prefix("t3_") == Some(self.id.as_str()))
    }
}

/// Post and its flat comment list, as fetched from a forum provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawThread {
    pub post: Post,
    #[serde(default)]
    pub comments: Vec<CommentRecord>,
}
