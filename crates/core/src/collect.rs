//! Accumulates a crawl's fetched documents until the crawl completes.
//!
//! # Example
//!
//! ```rust
//! use sitesift_core::{CrawlConfig, FetchedDocument, SiteCollector};
//!
//! let config = CrawlConfig::builder("https://example.com/").score_content(false).build().unwrap();
//! let mut collector = SiteCollector::new(&config).unwrap();
//! collector.ingest(FetchedDocument::html(
//!     "https://example.com/",
//!     "<html><head><title>Home</title></head><body><main><p>Hello</p></main></body></html>",
//! ));
//!
//! let export = collector.finish();
//! assert_eq!(export.pages.len(), 1);
//! assert_eq!(export.pages[0].alias, "/");
//! ```

use tracing::debug;

use crate::Result;
use crate::classify::Classifier;
use crate::config::CrawlConfig;
use crate::graph::{CrawlState, PageGraphBuilder};
use crate::links::{LinkDecision, SkippedLink};
use crate::record::{DocumentRef, ImageRef, SiteExport};

/// A completed fetch as the crawl layer hands it over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    pub url: String,
    /// Media type without parameters, e.g. `text/html`
    pub media_type: String,
    pub body: String,
}

impl FetchedDocument {
    pub fn html(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self { url: url.into(), media_type: "text/html".to_string(), body: body.into() }
    }

    fn is_html(&self) -> bool {
        self.media_type.starts_with("text/html") || self.media_type == "application/xhtml+xml"
    }
}

/// Collects one crawl's results and builds the site model when it ends
pub struct SiteCollector<'a> {
    config: &'a CrawlConfig,
    classifier: Classifier<'a>,
    state: CrawlState,
    followed: usize,
}

impl<'a> SiteCollector<'a> {
    pub fn new(config: &'a CrawlConfig) -> Result<Self> {
        Ok(Self { config, classifier: Classifier::new(config)?, state: CrawlState::default(), followed: 0 })
    }

    /// Route a fetched document by media type: HTML pages are classified,
    /// images and other application types are recorded.
    pub fn ingest(&mut self, document: FetchedDocument) {
        if document.is_html() {
            let records = self.classifier.classify_document(&document);
            debug!(url = %document.url, records = records.len(), "page ingested");
            self.state.pages.extend(records);
        } else if document.media_type.starts_with("image/") {
            self.state.images.push(ImageRef::new(document.url, ""));
        } else if document.media_type.starts_with("application/") {
            self.state.documents.push(DocumentRef { url: document.url, context_url: String::new() });
        } else {
            debug!(url = %document.url, media_type = %document.media_type, "ignored document");
        }
    }

    /// Ask the link filter about a discovered link. Returns the URL to queue,
    /// if any; same-domain media links are remembered for the export. Every
    /// returned URL counts against the crawl's URL limit.
    pub fn offer_link(&mut self, url: &str, context_url: Option<&str>) -> Option<String> {
        match self.config.link_filter.decide_counted(url, context_url, self.followed) {
            Ok(LinkDecision::Follow(url)) => {
                self.followed += 1;
                Some(url)
            }
            Ok(LinkDecision::SkipImage(link)) => {
                self.remember(link, true);
                None
            }
            Ok(LinkDecision::SkipDocument(link)) => {
                self.remember(link, false);
                None
            }
            Ok(LinkDecision::Reject) => None,
            Err(e) => {
                debug!(url, error = %e, "unresolvable link");
                None
            }
        }
    }

    fn remember(&mut self, link: SkippedLink, image: bool) {
        let list = if image { &mut self.state.skipped_images } else { &mut self.state.skipped_documents };
        if list.iter().all(|l| l.url != link.url) {
            list.push(link);
        }
    }

    /// Links handed out for fetching so far
    pub fn followed_count(&self) -> usize {
        self.followed
    }

    /// Records extracted so far
    pub fn page_count(&self) -> usize {
        self.state.pages.len()
    }

    /// Run the page graph builder over everything collected
    pub fn finish(self) -> SiteExport {
        PageGraphBuilder::new(self.config).build(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CrawlConfig {
        CrawlConfig::builder("https://example.com/").score_content(false).build().unwrap()
    }

    #[test]
    fn test_ingest_routes_by_media_type() {
        let config = config();
        let mut collector = SiteCollector::new(&config).unwrap();

        collector.ingest(FetchedDocument::html(
            "https://example.com/about",
            "<html><head><title>About</title></head><body><p>About us</p></body></html>",
        ));
        collector.ingest(FetchedDocument {
            url: "https://example.com/logo.png".to_string(),
            media_type: "image/png".to_string(),
            body: String::new(),
        });
        collector.ingest(FetchedDocument {
            url: "https://example.com/feed".to_string(),
            media_type: "application/rss+xml".to_string(),
            body: String::new(),
        });
        collector.ingest(FetchedDocument {
            url: "https://example.com/robots.txt".to_string(),
            media_type: "text/plain".to_string(),
            body: String::new(),
        });

        assert_eq!(collector.page_count(), 1);
        let export = collector.finish();
        assert_eq!(export.pages[0].alias, "/about");
        assert_eq!(export.images.len(), 1);
        assert_eq!(export.documents.len(), 1);
    }

    #[test]
    fn test_offer_link_remembers_media() {
        let config = config();
        let mut collector = SiteCollector::new(&config).unwrap();

        assert_eq!(collector.offer_link("/next", None), Some("https://example.com/next".to_string()));
        assert_eq!(collector.offer_link("/a.png", Some("https://example.com/x")), None);
        assert_eq!(collector.offer_link("/a.png", Some("https://example.com/y")), None);
        assert_eq!(collector.offer_link("/r.pdf", Some("https://example.com/x")), None);

        assert_eq!(collector.state.skipped_images.len(), 1);
        assert_eq!(collector.state.skipped_documents.len(), 1);
    }

    #[test]
    fn test_offer_link_stops_at_url_limit() {
        let config = CrawlConfig::builder("https://example.com/").url_limit(2).build().unwrap();
        let mut collector = SiteCollector::new(&config).unwrap();

        assert!(collector.offer_link("/one", None).is_some());
        assert_eq!(collector.offer_link("/x/", Some("not a url")), None);
        assert!(collector.offer_link("/two", None).is_some());
        assert_eq!(collector.offer_link("/three", None), None);
        assert_eq!(collector.offer_link("/pic.jpg", None), None);

        assert_eq!(collector.followed_count(), 2);
        assert_eq!(collector.state.skipped_images.len(), 1);
    }

    #[test]
    fn test_finish_without_pages() {
        let config = config();
        let collector = SiteCollector::new(&config).unwrap();
        assert!(collector.finish().is_empty());
    }
}
