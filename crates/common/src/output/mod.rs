//! Output shapes for ranked documents and threaded posts
//!
//! - Raw: the full internal entity as pretty JSON
//! - Slim JSON: title, source, url, text, and flattened comment bodies
//! - Slim XML: the same fields as slim JSON in a tagged envelope

use crate::errors::{AppError, Result};
use crate::models::{Post, RankedDocument};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::str::FromStr;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Raw,
    SlimJson,
    SlimXml,
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "raw" => Ok(OutputFormat::Raw),
            "slim_json" | "json" => Ok(OutputFormat::SlimJson),
            "slim_xml" | "xml" => Ok(OutputFormat::SlimXml),
            other => Err(AppError::Validation {
                message: format!("Unknown output format: {}", other),
            }),
        }
    }
}

/// Reduced view shared by every slim rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlimRecord {
    pub title: String,
    /// Channel for documents, subreddit for posts
    pub source: String,
    pub url: String,
    /// Excerpt for documents, selftext for posts
    pub text: String,
    /// Rendered comment bodies in thread pre-order
    pub comments: Vec<String>,
}

/// Field names of a slim record, in rendering order
pub const SLIM_FIELDS: [&str; 5] = ["title", "source", "url", "text", "comments"];

impl From<&RankedDocument> for SlimRecord {
    fn from(ranked: &RankedDocument) -> Self {
        Self {
            title: ranked.document.title.clone(),
            source: ranked.document.source.clone(),
            url: ranked.document.url.clone(),
            text: ranked.excerpt.clone(),
            comments: Vec::new(),
        }
    }
}

impl From<&Post> for SlimRecord {
    fn from(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            source: post.subreddit.clone(),
            url: post.url.clone(),
            text: post.selftext.clone(),
            comments: post
                .flattened_comment_bodies()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Full entities as pretty-printed JSON
pub fn render_raw<T: Serialize>(items: &[T]) -> Result<String> {
    Ok(serde_json::to_string_pretty(items)?)
}

/// Slim records as pretty-printed JSON
pub fn render_slim_json(records: &[SlimRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Slim records as XML under `<root>`, one `<item>` element per record
pub fn render_slim_xml(records: &[SlimRecord], root: &str, item: &str) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(out, "<{}>", root);
    for record in records {
        let _ = writeln!(out, "  <{}>", item);
        let _ = writeln!(out, "    <title>{}</title>", xml_escape(&record.title));
        let _ = writeln!(out, "    <source>{}</source>", xml_escape(&record.source));
        let _ = writeln!(out, "    <url>{}</url>", xml_escape(&record.url));
        let _ = writeln!(out, "    <text>{}</text>", xml_escape(&record.text));
        let _ = writeln!(out, "    <comments>");
        for comment in &record.comments {
            let _ = writeln!(out, "      <comment>{}</comment>", xml_escape(comment));
        }
        let _ = writeln!(out, "    </comments>");
        let _ = writeln!(out, "  </{}>", item);
    }
    let _ = write!(out, "</{}>", root);
    out
}

/// Escape the five XML special characters
pub fn xml_escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comment, CommentNode, Document};

    fn sample_post() -> Post {
        let reply = CommentNode {
            comment: Comment::new("c2", Some("c1"), "Agreed", 3),
            rendered_body: "> Use an IPS panel\n\nAgreed".into(),
            quoted: true,
            children: vec![],
        };
        Post {
            id: "p1".into(),
            title: "Best 1440p monitors".into(),
            subreddit: "monitors".into(),
            url: "https://www.reddit.com/r/monitors/comments/p1/best/".into(),
            selftext: "Looking for advice".into(),
            top_comments: vec![CommentNode {
                comment: Comment::new("c1", Some("p1"), "Use an IPS panel", 10),
                rendered_body: "> Looking for advice\n\nUse an IPS panel".into(),
                quoted: true,
                children: vec![reply],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("raw".parse::<OutputFormat>().unwrap(), OutputFormat::Raw);
        assert_eq!("slim-json".parse::<OutputFormat>().unwrap(), OutputFormat::SlimJson);
        assert_eq!("SLIM_XML".parse::<OutputFormat>().unwrap(), OutputFormat::SlimXml);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_slim_from_post_flattens_comments() {
        let slim = SlimRecord::from(&sample_post());
        assert_eq!(slim.source, "monitors");
        assert_eq!(slim.text, "Looking for advice");
        assert_eq!(slim.comments.len(), 2);
        assert!(slim.comments[1].ends_with("Agreed"));
    }

    #[test]
    fn test_slim_from_ranked_document() {
        let ranked = RankedDocument {
            document: Document::new("v1", "Rust in 100 seconds", "full transcript"),
            relevance_score: 0.8,
            excerpt: "full transcript".into(),
            excerpt_offset: Some(0),
            chunk_count: 1,
        };
        let slim = SlimRecord::from(&ranked);
        assert_eq!(slim.text, "full transcript");
        assert!(slim.comments.is_empty());
    }

    #[test]
    fn test_slim_variants_share_fields() {
        let records = vec![SlimRecord::from(&sample_post())];

        let json: serde_json::Value = serde_json::from_str(&render_slim_json(&records).unwrap()).unwrap();
        let keys: Vec<&str> = json[0].as_object().unwrap().keys().map(String::as_str).collect();
        for field in SLIM_FIELDS {
            assert!(keys.contains(&field), "json missing {}", field);
        }
        assert_eq!(keys.len(), SLIM_FIELDS.len());

        let xml = render_slim_xml(&records, "reddit_results", "post");
        for field in SLIM_FIELDS {
            assert!(xml.contains(&format!("<{}>", field)), "xml missing {}", field);
        }
        assert!(xml.starts_with("<?xml"));
        assert!(xml.ends_with("</reddit_results>"));
    }

    #[test]
    fn test_xml_escaping() {
        assert_eq!(xml_escape(r#"a < b & "c" > 'd'"#), "a &lt; b &amp; &quot;c&quot; &gt; &apos;d&apos;");
        let xml = render_slim_xml(&[SlimRecord::from(&sample_post())], "r", "i");
        assert!(xml.contains("&gt; Looking for advice"));
    }

    #[test]
    fn test_raw_keeps_full_entity() {
        let raw = render_raw(&[sample_post()]).unwrap();
        assert!(raw.contains("\"top_comments\""));
        assert!(raw.contains("\"rendered_body\""));
    }
}
