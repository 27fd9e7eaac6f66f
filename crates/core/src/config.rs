//! Crawl configuration.
//!
//! [`CrawlConfigBuilder`] collects the raw settings and [`CrawlConfigBuilder::build`]
//! compiles them: rule tables, regular expressions and selectors are all
//! validated there, so configuration errors surface before the first page is
//! processed.
//!
//! # Example
//!
//! ```rust
//! use sitesift_core::CrawlConfig;
//!
//! let config = CrawlConfig::builder("https://example.com/")
//!     .content_mapping("https://example.com/news/*|news")
//!     .score_content(false)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.domain, "example.com");
//! assert_eq!(config.rules.len(), 2);
//! ```

use regex::Regex;
use serde::Deserialize;
use url::Url;

use crate::clean::CleanConfig;
use crate::dedupe::DedupConfig;
use crate::links::LinkFilter;
use crate::rules::{RuleSelector, RuleTable};
use crate::scoring::ScoreConfig;
use crate::{Result, SiftError};

/// Elements dropped from a page before cleaning when structure simplification is on
pub const DEFAULT_REMOVE_ELEMENTS: &str =
    "nav, [role=navigation], aside, .navbar, .Breadcrumbs, header, head, footer, script, oembed, noscript, style, iframe, object";

/// Compiled configuration for one crawl
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub start_url: Url,
    /// Host name of the start URL
    pub domain: String,
    /// Tree cleaner options, with the crawl origin set
    pub clean: CleanConfig,
    /// Whether to run boilerplate removal and title affix stripping
    pub remove_duplicates: bool,
    /// Whether to replace bodies with their scored, filtered content
    pub score_content: bool,
    pub rules: RuleTable,
    /// Literal `(find, replace)` pairs applied to URLs and bodies
    pub replacements: Vec<(String, String)>,
    /// Pages whose URL matches are dropped; matches in bodies are replaced
    /// by the first capture group
    pub redirect_script: Option<Regex>,
    /// Extensions stripped from URLs and links, each with a leading dot
    pub bogus_extensions: Vec<String>,
    /// Removed from every title
    pub exclude_title: Option<Regex>,
    pub remove_elements: Option<RuleSelector>,
    pub link_filter: LinkFilter,
    pub dedup: DedupConfig,
    pub score: ScoreConfig,
}

impl CrawlConfig {
    /// Creates a new builder for a crawl starting at `start_url`.
    pub fn builder(start_url: impl Into<String>) -> CrawlConfigBuilder {
        CrawlConfigBuilder::new(start_url)
    }

    /// Compile externally stored settings.
    pub fn from_settings(settings: CrawlSettings) -> Result<Self> {
        let mut builder = CrawlConfigBuilder::new(settings.start_url);
        if let Some(v) = settings.remove_empty_nodes {
            builder = builder.remove_empty_nodes(v);
        }
        if let Some(v) = settings.remove_attributes {
            builder = builder.remove_attributes(v);
        }
        if let Some(v) = settings.trim_whitespace {
            builder = builder.trim_whitespace(v);
        }
        if let Some(v) = settings.simplify_structure {
            builder = builder.simplify_structure(v);
        }
        if let Some(v) = settings.remove_duplicates {
            builder = builder.remove_duplicates(v);
        }
        if let Some(v) = settings.score_content {
            builder = builder.score_content(v);
        }
        if let Some(v) = settings.remove_elements {
            builder = builder.remove_elements(v);
        }
        if let Some(v) = settings.url_limit {
            builder = builder.url_limit(v);
        }

        builder
            .content_mapping(settings.content_mapping)
            .search_replace(settings.search_replace)
            .redirect_script(settings.redirect_script)
            .script_extensions(settings.script_extensions)
            .exclude_title(settings.exclude_title_string)
            .url_filter(settings.url_filter)
            .exclude_filter(settings.exclude_filter)
            .build()
    }

    /// Parse and compile a JSON settings object.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::Serialization`] for malformed JSON or unknown
    /// keys, and any error [`CrawlConfigBuilder::build`] reports.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: CrawlSettings = serde_json::from_str(json)?;
        Self::from_settings(settings)
    }
}

/// Settings as stored by the external settings collaborator
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CrawlSettings {
    pub start_url: String,
    #[serde(default)]
    pub remove_empty_nodes: Option<bool>,
    #[serde(default)]
    pub remove_attributes: Option<bool>,
    #[serde(default)]
    pub trim_whitespace: Option<bool>,
    #[serde(default)]
    pub simplify_structure: Option<bool>,
    #[serde(default)]
    pub remove_duplicates: Option<bool>,
    #[serde(default)]
    pub score_content: Option<bool>,
    #[serde(default)]
    pub content_mapping: String,
    #[serde(default)]
    pub search_replace: String,
    #[serde(default)]
    pub redirect_script: String,
    #[serde(default)]
    pub script_extensions: String,
    #[serde(default)]
    pub exclude_title_string: String,
    #[serde(default)]
    pub remove_elements: Option<String>,
    #[serde(default)]
    pub url_filter: String,
    #[serde(default)]
    pub exclude_filter: String,
    /// Maximum links followed; 0 means no limit
    #[serde(default)]
    pub url_limit: Option<usize>,
}

/// Builder for [`CrawlConfig`].
///
/// Every string option uses the external settings format; nothing is
/// validated until [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct CrawlConfigBuilder {
    start_url: String,
    clean: CleanConfig,
    remove_duplicates: bool,
    score_content: bool,
    content_mapping: String,
    search_replace: String,
    redirect_script: String,
    script_extensions: String,
    exclude_title: String,
    remove_elements: String,
    url_filter: String,
    exclude_filter: String,
    url_limit: usize,
    dedup: DedupConfig,
    score: ScoreConfig,
}

impl CrawlConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            clean: CleanConfig::default(),
            remove_duplicates: true,
            score_content: true,
            content_mapping: String::new(),
            search_replace: String::new(),
            redirect_script: String::new(),
            script_extensions: String::new(),
            exclude_title: String::new(),
            remove_elements: DEFAULT_REMOVE_ELEMENTS.to_string(),
            url_filter: String::new(),
            exclude_filter: String::new(),
            url_limit: 0,
            dedup: DedupConfig::default(),
            score: ScoreConfig::default(),
        }
    }

    pub fn remove_empty_nodes(mut self, value: bool) -> Self {
        self.clean.remove_empty_nodes = value;
        self
    }

    pub fn remove_attributes(mut self, value: bool) -> Self {
        self.clean.remove_attributes = value;
        self
    }

    pub fn trim_whitespace(mut self, value: bool) -> Self {
        self.clean.trim_whitespace = value;
        self
    }

    /// Sets whether wrappers are unwrapped and chrome elements removed.
    pub fn simplify_structure(mut self, value: bool) -> Self {
        self.clean.simplify_structure = value;
        self
    }

    /// Sets the attribute allow-list used by attribute stripping.
    pub fn allowed_attributes(mut self, attributes: Vec<String>) -> Self {
        self.clean.allowed_attributes = attributes;
        self
    }

    pub fn remove_duplicates(mut self, value: bool) -> Self {
        self.remove_duplicates = value;
        self
    }

    pub fn score_content(mut self, value: bool) -> Self {
        self.score_content = value;
        self
    }

    /// Sets the content-type rule table, one rule per line.
    pub fn content_mapping(mut self, table: impl Into<String>) -> Self {
        self.content_mapping = table.into();
        self
    }

    /// Sets newline-delimited `find|replace` pairs.
    pub fn search_replace(mut self, pairs: impl Into<String>) -> Self {
        self.search_replace = pairs.into();
        self
    }

    /// Sets the redirect-script regular expression.
    pub fn redirect_script(mut self, pattern: impl Into<String>) -> Self {
        self.redirect_script = pattern.into();
        self
    }

    /// Sets the bogus extensions, comma or whitespace separated.
    pub fn script_extensions(mut self, extensions: impl Into<String>) -> Self {
        self.script_extensions = extensions.into();
        self
    }

    /// Sets a regular expression removed from every title.
    pub fn exclude_title(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_title = pattern.into();
        self
    }

    /// Sets the selector list of elements dropped before cleaning.
    pub fn remove_elements(mut self, selectors: impl Into<String>) -> Self {
        self.remove_elements = selectors.into();
        self
    }

    /// Sets `|`-separated substrings a followed URL must contain one of.
    pub fn url_filter(mut self, filter: impl Into<String>) -> Self {
        self.url_filter = filter.into();
        self
    }

    /// Sets `,`-separated substrings a followed URL must not contain.
    pub fn exclude_filter(mut self, filter: impl Into<String>) -> Self {
        self.exclude_filter = filter.into();
        self
    }

    /// Sets the maximum number of links followed; 0 means no limit.
    pub fn url_limit(mut self, limit: usize) -> Self {
        self.url_limit = limit;
        self
    }

    pub fn dedup(mut self, config: DedupConfig) -> Self {
        self.dedup = config;
        self
    }

    pub fn score(mut self, config: ScoreConfig) -> Self {
        self.score = config;
        self
    }

    /// Validate and compile the configuration.
    ///
    /// # Errors
    ///
    /// - [`SiftError::InvalidUrl`] for a bad start URL
    /// - [`SiftError::RuleTable`] for a malformed content mapping
    /// - [`SiftError::InvalidPattern`] for a bad redirect-script or exclude-title expression
    /// - [`SiftError::InvalidSelector`] for a bad remove-elements list
    /// - [`SiftError::ConfigError`] for a search/replace line without `|`
    pub fn build(self) -> Result<CrawlConfig> {
        let start_url = Url::parse(self.start_url.trim())
            .map_err(|e| SiftError::InvalidUrl(format!("{}: {}", self.start_url, e)))?;
        let domain = start_url
            .host_str()
            .ok_or_else(|| SiftError::InvalidUrl(format!("{}: no host", self.start_url)))?
            .to_string();

        let mut clean = self.clean;
        clean.origin = Some(start_url.clone());

        let remove_elements = match self.remove_elements.trim() {
            "" => None,
            selectors => Some(RuleSelector::parse(selectors)?),
        };

        Ok(CrawlConfig {
            link_filter: LinkFilter::new(start_url.clone(), &self.url_filter, &self.exclude_filter)
                .with_url_limit(self.url_limit),
            start_url,
            domain,
            clean,
            remove_duplicates: self.remove_duplicates,
            score_content: self.score_content,
            rules: RuleTable::parse(&self.content_mapping)?,
            replacements: parse_replacements(&self.search_replace)?,
            redirect_script: compile_optional(&self.redirect_script)?,
            bogus_extensions: parse_extensions(&self.script_extensions),
            exclude_title: compile_optional(&self.exclude_title)?,
            remove_elements,
            dedup: self.dedup,
            score: self.score,
        })
    }
}

fn compile_optional(pattern: &str) -> Result<Option<Regex>> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Ok(None);
    }
    Regex::new(pattern)
        .map(Some)
        .map_err(|source| SiftError::InvalidPattern { pattern: pattern.to_string(), source })
}

fn parse_replacements(content: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (find, replace) = line.split_once('|').ok_or_else(|| {
            SiftError::ConfigError(format!("search/replace line {} has no `|`: {}", index + 1, line))
        })?;
        if find.is_empty() {
            return Err(SiftError::ConfigError(format!("search/replace line {} has an empty search", index + 1)));
        }
        pairs.push((find.to_string(), replace.to_string()));
    }
    Ok(pairs)
}

fn parse_extensions(content: &str) -> Vec<String> {
    content
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|e| !e.is_empty())
        .map(|e| if e.starts_with('.') { e.to_string() } else { format!(".{}", e) })
        .collect()
}
