//! Quoted-reference rendering
//!
//! A reply is rendered with its parent's text in front of it as a markdown
//! block quote:
//!
//! ```text
//! > parent line one
//! > parent line two
//!
//! reply body
//! ```

/// Prefix every line of `reference` with `"> "`
pub fn quote_block(reference: &str) -> String {
    reference
        .lines()
        .map(|line| format!("> {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether `body` already opens with the quoted first line of `reference`.
///
/// Upstream data sometimes carries the quote already; re-quoting it would
/// add a second layer.
pub fn is_already_quoted(reference: &str, body: &str) -> bool {
    let Some(first_reference_line) = reference.lines().find(|l| !l.trim().is_empty()) else {
        return false;
    };
    let expected = format!("> {}", first_reference_line.trim_end());

    body.lines()
        .find(|l| !l.trim().is_empty())
        .map(|first_body_line| first_body_line.trim_end() == expected)
        .unwrap_or(false)
}

/// Render `body` with the quoted reference in front of it.
///
/// Returns the body unchanged, with `false`, when there is no reference,
/// the reference is blank, or the body already carries the same quote.
pub fn render_quoted(reference: Option<&str>, body: &str) -> (String, bool) {
    match reference {
        Some(reference) if !reference.trim().is_empty() && !is_already_quoted(reference, body) => {
            (format!("{}\n\n{}", quote_block(reference), body), true)
        }
        _ => (body.to_string(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_quote() {
        let (rendered, quoted) = render_quoted(Some("Hello"), "World");
        assert_eq!(rendered, "> Hello\n\nWorld");
        assert!(quoted);
    }

    #[test]
    fn test_multiline_reference() {
        let (rendered, _) = render_quoted(Some("line one\nline two\n\nline four"), "reply");
        assert_eq!(rendered, "> line one\n> line two\n> \n> line four\n\nreply");
    }

    #[test]
    fn test_body_kept_verbatim() {
        let body = "**bold** and `code`\n- item <b>";
        let (rendered, _) = render_quoted(Some("parent"), body);
        assert!(rendered.ends_with(body));
    }

    #[test]
    fn test_no_reference() {
        assert_eq!(render_quoted(None, "orphan"), ("orphan".to_string(), false));
    }

    #[test]
    fn test_blank_reference() {
        assert_eq!(render_quoted(Some("  \n "), "reply"), ("reply".to_string(), false));
    }

    #[test]
    fn test_already_quoted_body_is_untouched() {
        let body = "> Hello there\n\nI agree";
        let (rendered, quoted) = render_quoted(Some("Hello there\nsecond line"), body);
        assert_eq!(rendered, body);
        assert!(!quoted);
    }

    #[test]
    fn test_partial_overlap_is_requoted() {
        // Body quotes only a fragment of the parent's first line
        let body = "> Hello\n\nI agree";
        let (rendered, quoted) = render_quoted(Some("Hello there"), body);
        assert!(quoted);
        assert_eq!(rendered, "> Hello there\n\n> Hello\n\nI agree");
    }

    #[test]
    fn test_quote_of_unrelated_text_is_requoted() {
        let body = "> someone else said this\n\nreply";
        let (_, quoted) = render_quoted(Some("parent text"), body);
        assert!(quoted);
    }
}
