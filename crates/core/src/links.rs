//! Link filtering for the crawl frontier.
//!
//! The crawler asks the filter about every discovered link. Pages are
//! followed; images and documents on the crawl's own domain are not
//! fetched but remembered as skipped links, which the page graph builder
//! merges into the export.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Result, SiftError};

pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".svg", ".bmp", ".gif"];

pub const DOCUMENT_EXTENSIONS: &[&str] =
    &[".doc", ".docx", ".dot", ".pdf", ".xls", ".xlsx", ".ps", ".eps", ".rtf", ".ppt", ".pptx", ".odt"];

/// A link the crawler did not fetch, with the page it was found on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedLink {
    pub url: String,
    pub context_url: String,
}

/// What the crawler should do with a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDecision {
    /// Queue the resolved URL
    Follow(String),
    /// Same-domain image, recorded instead of fetched
    SkipImage(SkippedLink),
    /// Same-domain document, recorded instead of fetched
    SkipDocument(SkippedLink),
    /// Filtered out or off-domain media
    Reject,
}

/// Include/exclude substring filters over absolute URLs, with an optional
/// cap on the number of links followed
#[derive(Debug, Clone)]
pub struct LinkFilter {
    start_url: Url,
    include: Vec<String>,
    exclude: Vec<String>,
    /// Maximum links followed per crawl; 0 means no limit
    url_limit: usize,
}

impl LinkFilter {
    /// `include` is `|`-separated, `exclude` is `,`-separated; an empty
    /// include list accepts every URL.
    pub fn new(start_url: Url, include: &str, exclude: &str) -> Self {
        Self {
            start_url,
            include: split_filter(include, '|'),
            exclude: split_filter(exclude, ','),
            url_limit: 0,
        }
    }

    /// Cap the number of followed links; 0 removes the cap.
    pub fn with_url_limit(mut self, url_limit: usize) -> Self {
        self.url_limit = url_limit;
        self
    }

    pub fn url_limit(&self) -> usize {
        self.url_limit
    }

    /// Whether `followed` links already use up the limit
    pub fn is_exhausted(&self, followed: usize) -> bool {
        self.url_limit > 0 && followed >= self.url_limit
    }

    /// Decide on `url`, resolving it against `context_url` (or the start URL).
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::InvalidUrl`] if the link cannot be resolved.
    pub fn decide(&self, url: &str, context_url: Option<&str>) -> Result<LinkDecision> {
        self.decide_counted(url, context_url, 0)
    }

    /// Like [`decide`](Self::decide), rejecting pages once `followed` links
    /// reach the limit. Same-domain media is still remembered.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::InvalidUrl`] if the link cannot be resolved.
    pub fn decide_counted(&self, url: &str, context_url: Option<&str>, followed: usize) -> Result<LinkDecision> {
        let context = match context_url {
            Some(context) => Url::parse(context).map_err(|e| SiftError::InvalidUrl(format!("{}: {}", context, e)))?,
            None => self.start_url.clone(),
        };
        let resolved = context.join(url.trim()).map_err(|e| SiftError::InvalidUrl(format!("{}: {}", url, e)))?;
        let href = resolved.to_string();
        let context = context.to_string();

        let included = self.include.is_empty() || self.include.iter().any(|f| href.contains(f.as_str()));
        let excluded = self.exclude.iter().any(|f| href.contains(f.as_str()));
        let same_domain = resolved.host_str() == self.start_url.host_str();

        if has_extension(&resolved, IMAGE_EXTENSIONS) {
            return Ok(if same_domain {
                LinkDecision::SkipImage(SkippedLink { url: href, context_url: context })
            } else {
                LinkDecision::Reject
            });
        }

        if !included || excluded || self.is_exhausted(followed) {
            return Ok(LinkDecision::Reject);
        }

        if has_extension(&resolved, DOCUMENT_EXTENSIONS) {
            return Ok(if same_domain {
                LinkDecision::SkipDocument(SkippedLink { url: href, context_url: context })
            } else {
                LinkDecision::Reject
            });
        }

        Ok(LinkDecision::Follow(href))
    }
}

fn split_filter(filter: &str, separator: char) -> Vec<String> {
    filter.split(separator).map(str::trim).filter(|f| !f.is_empty()).map(str::to_string).collect()
}

/// Whether the URL path ends with one of `extensions`, ignoring case
pub fn has_extension(url: &Url, extensions: &[&str]) -> bool {
    let path = url.path().to_ascii_lowercase();
    extensions.iter().any(|ext| path.ends_with(ext))
}
