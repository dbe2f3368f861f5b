//! Source normalization helpers
//!
//! Small, provider-agnostic cleanups applied to search results before they
//! reach the engines: canonical URLs, titles recovered from URL slugs, and
//! short description snippets for documents without a transcript.

use url::Url;

/// Fallback title when a URL carries no usable slug
pub const TITLE_NOT_FOUND: &str = "[Title not found]";

/// Fallback snippet for documents without a description
pub const NO_DESCRIPTION: &str = "No description available";

const MAX_SNIPPETS: usize = 5;
const DESCRIPTION_PREVIEW_CHARS: usize = 200;
const EXCLUDED_PATH_MARKERS: [&str; 3] = ["/ads/", "/advertising/", "/settings/"];

/// Drop query string and fragment, keeping scheme, host, and path.
///
/// Input that does not parse as an absolute URL is cut at the first `?` or `#`.
pub fn clean_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.into()
        }
        Err(_) => strip_query(raw).to_string(),
    }
}

fn strip_query(raw: &str) -> &str {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    &raw[..end]
}

/// Whether `url` points at a post on `domain` (or a subdomain of it) rather
/// than an ad or settings page
pub fn is_forum_post_url(url: &str, domain: &str) -> bool {
    let Ok(url) = Url::parse(url) else {
        return false;
    };
    let on_domain = url
        .host_str()
        .is_some_and(|host| host == domain || host.ends_with(&format!(".{}", domain)));

    on_domain && !EXCLUDED_PATH_MARKERS.iter().any(|m| url.path().contains(m))
}

/// Recover a human title from the last path segment of a URL.
///
/// `https://www.reddit.com/r/rust/comments/abc/why_is_rust_fast/` becomes
/// `Why Is Rust Fast`.
pub fn title_from_url(raw: &str) -> String {
    let slug = match Url::parse(raw) {
        Ok(url) => url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string),
        // Relative input is treated as a bare path
        Err(_) => strip_query(raw)
            .split('/')
            .filter(|s| !s.is_empty())
            .last()
            .map(str::to_string),
    };

    match slug {
        Some(slug) => slug
            .split('_')
            .filter(|w| !w.is_empty())
            .map(title_case)
            .collect::<Vec<_>>()
            .join(" "),
        None => TITLE_NOT_FOUND.to_string(),
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// First few non-empty, trimmed lines of a description
pub fn description_snippets(description: &str) -> Vec<String> {
    let snippets: Vec<String> = description
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(MAX_SNIPPETS)
        .map(str::to_string)
        .collect();

    if snippets.is_empty() {
        vec![NO_DESCRIPTION.to_string()]
    } else {
        snippets
    }
}

/// Shorten a description for display, marking the cut with `...`
pub fn truncate_description(description: &str) -> String {
    match description.char_indices().nth(DESCRIPTION_PREVIEW_CHARS) {
        Some((byte_idx, _)) => format!("{}...", &description[..byte_idx]),
        None => description.to_string(),
    }
}
