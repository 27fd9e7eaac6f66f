//! Records handed from the classifier through the graph builder to the
//! persistence layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::graph::BuildStats;

/// Prefix of redirect targets that point at another page of the same export
pub const INTERNAL_PREFIX: &str = "internal:";

/// One logical content item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    /// Canonical URL, with a `#index` suffix for sub-records
    pub url: String,
    pub alias: String,
    /// Alias of the parent page, empty at the top level
    pub parent: String,
    pub title: String,
    pub media_type: String,
    /// Content-type label assigned by the classifier
    pub content_type: String,
    /// Cleaned HTML fragment
    pub body: String,
    /// Readability score, 0 to 100
    pub score: u32,
    /// Size of the fetched response in kilobytes
    pub size_kb: usize,
    pub images: Vec<ImageRef>,
    pub documents: Vec<DocumentRef>,
    pub forms: Vec<FormRef>,
    pub fields: BTreeMap<String, String>,
    /// Position among the records a rule sub-selector produced on one URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_index: Option<usize>,
}

impl PageRecord {
    pub fn new(url: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self { url: url.into(), media_type: media_type.into(), ..Default::default() }
    }

    /// Whether this record came from a classifier sub-selector
    pub fn is_sub_record(&self) -> bool {
        self.sub_index.is_some()
    }
}

/// An image referenced by a page or fetched directly
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub url: String,
    pub alt: String,
    /// Inline payload of a `data:` image, without the `data:` scheme
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl ImageRef {
    pub fn new(url: impl Into<String>, alt: impl Into<String>) -> Self {
        Self { url: url.into(), alt: alt.into(), data: None }
    }
}

/// A non-HTML document and the page that linked to it
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    pub url: String,
    /// URL of the page the link was found on, empty when unknown
    pub context_url: String,
}

/// A form found on a page
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRef {
    pub action: String,
    pub method: String,
    /// Inner markup, which also identifies the form across pages
    pub markup: String,
}

/// A page dropped as a full duplicate of another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectRecord {
    pub from: String,
    pub to: String,
}

impl RedirectRecord {
    /// Redirect `from` to the page at alias `to`
    pub fn internal(from: impl Into<String>, to: &str) -> Self {
        Self { from: from.into(), to: format!("{}{}", INTERNAL_PREFIX, to) }
    }
}

/// The normalized site handed to persistence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteExport {
    pub domain: String,
    pub pages: Vec<PageRecord>,
    pub images: Vec<ImageRef>,
    pub documents: Vec<DocumentRef>,
    pub forms: Vec<FormRef>,
    pub redirects: Vec<RedirectRecord>,
    #[serde(skip)]
    pub stats: BuildStats,
}

impl SiteExport {
    /// An export for a crawl that produced nothing
    pub fn empty(domain: impl Into<String>) -> Self {
        Self { domain: domain.into(), ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Look a page up by alias
    pub fn page(&self, alias: &str) -> Option<&PageRecord> {
        self.pages.iter().find(|p| p.alias == alias)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
