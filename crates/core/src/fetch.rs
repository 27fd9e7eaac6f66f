//! The fetch strategy the crawler drives.
//!
//! Fetching belongs to the crawl layer; this module only defines the
//! [`Fetcher`] seam it implements and, with the `fetch` feature, a plain
//! reqwest-backed [`HttpFetcher`]. Retries, robots handling and script
//! execution stay outside.

use async_trait::async_trait;

use crate::Result;
use crate::collect::FetchedDocument;

/// A response as the crawl layer received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    /// `Content-Type` header value, parameters included
    pub content_type: String,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The media type without parameters, lowercased
    pub fn media_type(&self) -> String {
        self.content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
    }

    pub fn into_document(self) -> FetchedDocument {
        FetchedDocument { media_type: self.media_type(), url: self.url, body: self.body }
    }
}

/// Strategy for retrieving a URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RawResponse>;
}

#[cfg(feature = "fetch")]
pub use http::{FetchConfig, HttpFetcher};

#[cfg(feature = "fetch")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::Client;
    use reqwest::header::CONTENT_TYPE;
    use url::Url;

    use super::{Fetcher, RawResponse};
    use crate::{Result, SiftError};

    /// HTTP client configuration for fetching pages.
    #[derive(Debug, Clone)]
    pub struct FetchConfig {
        /// Request timeout in seconds.
        pub timeout: u64,
        /// Custom User-Agent string.
        pub user_agent: String,
    }

    impl Default for FetchConfig {
        fn default() -> Self {
            Self { timeout: 30, user_agent: "Mozilla/5.0 (compatible; sitesift/0.1)".to_string() }
        }
    }

    /// Single-request fetcher over reqwest
    #[derive(Debug, Clone)]
    pub struct HttpFetcher {
        client: Client,
        config: FetchConfig,
    }

    impl HttpFetcher {
        pub fn new(config: FetchConfig) -> Result<Self> {
            let client = Client::builder()
                .timeout(Duration::from_secs(config.timeout))
                .build()
                .map_err(SiftError::HttpError)?;
            Ok(Self { client, config })
        }
    }

    #[async_trait]
    impl Fetcher for HttpFetcher {
        async fn fetch(&self, url: &str) -> Result<RawResponse> {
            let parsed_url = Url::parse(url).map_err(|e| SiftError::InvalidUrl(format!("{}: {}", url, e)))?;

            let response = self
                .client
                .get(parsed_url)
                .header("User-Agent", &self.config.user_agent)
                .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        SiftError::Timeout { timeout: self.config.timeout }
                    } else {
                        SiftError::HttpError(e)
                    }
                })?;

            let url = response.url().to_string();
            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let body = response.text().await?;

            Ok(RawResponse { url, status, content_type, body })
        }
    }
}
