//! Error types for sitesift operations.
//!
//! Only configuration problems and collaborator failures are errors. Pages
//! that get excluded from a crawl (empty title, duplicate body, "not found"
//! pages) are counted in [`BuildStats`](crate::graph::BuildStats) instead,
//! and field extraction failures degrade to empty values.
//!
//! # Example
//!
//! ```rust
//! use sitesift_core::{RuleTable, SiftError};
//!
//! match RuleTable::parse("http://example.com/*||article") {
//!     Err(SiftError::RuleTable { line, .. }) => assert_eq!(line, 1),
//!     other => panic!("unexpected: {:?}", other.map(|t| t.len())),
//! }
//! ```

use thiserror::Error;

/// Main error type for the content pipeline.
#[derive(Error, Debug)]
pub enum SiftError {
    /// HTTP request errors from reqwest.
    ///
    /// Only produced by the bundled [`HttpFetcher`](crate::fetch::HttpFetcher).
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[cfg(feature = "fetch")]
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    ///
    /// Returned when the crawl's start URL or a fetched URL cannot be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A CSS selector from configuration could not be parsed.
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// A configured regular expression could not be compiled.
    ///
    /// Covers the redirect-script and exclude-title patterns as well as the
    /// compiled URL wildcards of the content-type rule table.
    #[error("Invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A line of the content-type rule table is malformed.
    ///
    /// Rule table problems are fatal: a bad rule could silently misclassify
    /// every page of a crawl.
    #[error("Rule table error at line {line}: {message}")]
    RuleTable { line: usize, message: String },

    /// Any other invalid crawl setting.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serializing or deserializing settings and exports.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for SiftError.
pub type Result<T> = std::result::Result<T, SiftError>;
