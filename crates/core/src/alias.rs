//! URL canonicalization and alias derivation.

use scraper::Html;

/// Longest alias kept before truncation
pub const MAX_ALIAS_LENGTH: usize = 220;

/// Strip the query string, collapse doubled slashes after the scheme and
/// drop a trailing slash. A `#fragment` survives.
pub fn canonicalize_url(url: &str) -> String {
    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };
    let base = base.split_once('?').map_or(base, |(before, _)| before);

    let (scheme, rest) = match base.split_once("://") {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, base),
    };

    let mut path = String::with_capacity(rest.len());
    for c in rest.chars() {
        if c == '/' && path.ends_with('/') {
            continue;
        }
        path.push(c);
    }
    if path.ends_with('/') {
        path.pop();
    }

    let mut out = match scheme {
        Some(scheme) => format!("{}://{}", scheme, path),
        None => path,
    };
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// The path of a URL, without query or fragment, truncated to
/// [`MAX_ALIAS_LENGTH`] characters.
pub fn alias_from_url(url: &str) -> String {
    let url = url.split('#').next().unwrap_or_default();
    let url = url.split('?').next().unwrap_or_default();
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = rest.find('/').map_or("/", |i| &rest[i..]);
    truncate_alias(path)
}

/// Alias of the `index`-th record a sub-selector produced on a page
pub fn sub_alias(page_alias: &str, index: usize) -> String {
    truncate_alias(&format!("{}/{}", page_alias.trim_end_matches('/'), index))
}

fn truncate_alias(alias: &str) -> String {
    if alias.chars().count() <= MAX_ALIAS_LENGTH {
        return alias.to_string();
    }
    let mut truncated: String = alias.chars().take(MAX_ALIAS_LENGTH).collect();
    truncated.push_str("...");
    truncated
}

/// Drop the last path segment: `/a/b/` and `/a/b` both give `/a`, `/a` gives `""`.
pub fn parent_alias(alias: &str) -> String {
    let trimmed = alias.strip_suffix('/').unwrap_or(alias);
    let mut segments: Vec<&str> = trimmed.split('/').collect();
    segments.pop();
    segments.join("/")
}

/// Underscores and slashes become spaces and every word is capitalized
pub fn humanize(text: &str) -> String {
    text.replace(['_', '/'], " ")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Decode HTML character references in plain text
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let fragment = Html::parse_fragment(&text.replace('<', "&lt;"));
    fragment.root_element().text().collect()
}
