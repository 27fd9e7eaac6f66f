//! Content classification and record extraction.
//!
//! A fetched page is matched against the rule table by URL. The first
//! matching rule whose sub-selector is empty or finds something in the DOM
//! becomes the active rule, and decides whether the page yields a single
//! record for its main region or one record per sub-selector match.

use ego_tree::NodeId;
use scraper::Selector;
use tracing::debug;
use url::Url;

use crate::alias::{alias_from_url, sub_alias};
use crate::clean::{clean_attributes, clean_tree};
use crate::collect::FetchedDocument;
use crate::config::CrawlConfig;
use crate::dom_tree::DomTree;
use crate::links::{DOCUMENT_EXTENSIONS, has_extension};
use crate::parse::{Document, Element, compile_selector};
use crate::record::{DocumentRef, FormRef, ImageRef, PageRecord};
use crate::rules::ContentTypeRule;
use crate::Result;

/// Maps fetched pages to typed records
pub struct Classifier<'a> {
    config: &'a CrawlConfig,
    main: Selector,
    heading: Selector,
    image: Selector,
    form: Selector,
    link: Selector,
}

impl<'a> Classifier<'a> {
    pub fn new(config: &'a CrawlConfig) -> Result<Self> {
        Ok(Self {
            config,
            main: compile_selector("[role=main], main")?,
            heading: compile_selector("h1, h2, h3, h4, h5, h6")?,
            image: compile_selector("img[src]")?,
            form: compile_selector("form")?,
            link: compile_selector("a[href]")?,
        })
    }

    /// Every rule matching `url` in declaration order, fallback last
    pub fn classify(&self, url: &str) -> Vec<&'a ContentTypeRule> {
        self.config.rules.matching(url)
    }

    /// The first matching rule that has no sub-selector or whose
    /// sub-selector matches at least one node. The fallback always qualifies.
    pub fn active_rule(&self, url: &str, document: &Document) -> &'a ContentTypeRule {
        self.classify(url)
            .into_iter()
            .find(|rule| match &rule.selector {
                None => true,
                Some(selector) => !document.select_compiled(selector.selector()).is_empty(),
            })
            .unwrap_or_else(|| self.config.rules.fallback())
    }

    /// Parse a fetched page and extract its records with the active rule
    pub fn classify_document(&self, fetched: &FetchedDocument) -> Vec<PageRecord> {
        let document = Document::parse(&fetched.body);
        let rule = self.active_rule(&fetched.url, &document);
        debug!(url = %fetched.url, label = %rule.label, "classified");

        let size_kb = (fetched.body.len() as f64 / 1024.0).round() as usize;
        let mut records = self.extract(rule, &document, &fetched.url);
        for record in &mut records {
            record.media_type = fetched.media_type.clone();
            record.size_kb = size_kb;
        }
        records
    }

    /// Produce the records `rule` yields for the page at `url`
    pub fn extract(&self, rule: &ContentTypeRule, document: &Document, url: &str) -> Vec<PageRecord> {
        let base = Url::parse(url).ok();
        let title = document.title().map(|t| t.trim().to_string()).unwrap_or_default();
        let inline = self.inline_images(document);

        let Some(selector) = &rule.selector else {
            return vec![self.extract_page(rule, document, url, title, base.as_ref(), &inline)];
        };

        let page_alias = alias_from_url(url);
        document
            .select_compiled(selector.selector())
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let mut record = PageRecord::new(format!("{}#{}", url, index), "");
                record.content_type = rule.label.clone();
                record.sub_index = Some(index);
                record.title = self
                    .first_heading(node)
                    .unwrap_or_else(|| format!("{} - {} {}", title, rule.label, index));
                record.body = self.clean_region(node, false);

                let alias = sub_alias(&page_alias, index);
                for field in &rule.fields {
                    record.fields.insert(field.name.clone(), field.extract(node, &alias));
                }
                self.collect_references(&mut record, node, url, base.as_ref(), &inline);
                record
            })
            .collect()
    }

    fn extract_page(
        &self, rule: &ContentTypeRule, document: &Document, url: &str, title: String, base: Option<&Url>,
        inline: &[NodeId],
    ) -> PageRecord {
        let mut record = PageRecord::new(url, "");
        record.content_type = rule.label.clone();
        record.title = title;

        let root = document.root();
        record.body = match document.select_compiled(&self.main).into_iter().next() {
            Some(main) => self.clean_region(&main, false),
            None => match document.body() {
                Some(body) => self.clean_region(&body, true),
                None => self.clean_region(&root, true),
            },
        };

        let alias = alias_from_url(url);
        for field in &rule.fields {
            record.fields.insert(field.name.clone(), field.extract(&root, &alias));
        }
        self.collect_references(&mut record, &root, url, base, inline);
        record
    }

    /// Every `data:` image of the page in document order; an image's index
    /// here numbers its `#data<N>` URL.
    fn inline_images(&self, document: &Document) -> Vec<NodeId> {
        document
            .select_compiled(&self.image)
            .into_iter()
            .filter(|img| img.attr("src").is_some_and(|src| src.trim().starts_with("data:")))
            .map(|img| img.element_ref().id())
            .collect()
    }

    fn first_heading(&self, node: &Element<'_>) -> Option<String> {
        node.select_compiled(&self.heading)
            .into_iter()
            .map(|h| h.text().trim().to_string())
            .find(|text| !text.is_empty())
    }

    /// Copy a region without removed elements, clean it and serialize it.
    /// `inner` drops the region's own tag, for `<body>` and `<html>`.
    fn clean_region(&self, region: &Element<'_>, inner: bool) -> String {
        let mut tree = DomTree::from_element(region.element_ref());
        if self.config.clean.simplify_structure
            && let Some(remove) = &self.config.remove_elements
        {
            tree.remove_matching(remove.selector());
        }

        let root = tree.root();
        clean_tree(&mut tree, root, &self.config.clean);

        let markup = if inner { tree.inner_html(root) } else { tree.outer_html(root) };
        clean_attributes(&markup, &self.config.clean)
    }

    fn collect_references(
        &self, record: &mut PageRecord, scope: &Element<'_>, url: &str, base: Option<&Url>, inline: &[NodeId],
    ) {
        for img in scope.select_compiled(&self.image) {
            let Some(src) = img.attr("src").map(str::trim) else {
                continue;
            };
            let alt = img.attr("alt").unwrap_or_default();

            if let Some(payload) = src.strip_prefix("data:") {
                let Some(index) = inline.iter().position(|&id| id == img.element_ref().id()) else {
                    continue;
                };
                record.images.push(ImageRef {
                    url: format!("{}#data{}", url, index),
                    alt: alt.to_string(),
                    data: Some(payload.to_string()),
                });
                continue;
            }

            let Some(absolute) = resolve(base, src) else {
                continue;
            };
            if record.images.iter().all(|i| i.url != absolute) {
                record.images.push(ImageRef::new(absolute, alt));
            }
        }

        for form in scope.select_compiled(&self.form) {
            record.forms.push(FormRef {
                action: form.attr("action").unwrap_or_default().to_string(),
                method: form.attr("method").unwrap_or("get").to_ascii_lowercase(),
                markup: form.inner_html(),
            });
        }

        for link in scope.select_compiled(&self.link) {
            let Some(href) = link.attr("href") else {
                continue;
            };
            let Some(absolute) = base.and_then(|b| b.join(href.trim()).ok()) else {
                continue;
            };
            if has_extension(&absolute, DOCUMENT_EXTENSIONS) && record.documents.iter().all(|d| d.url != absolute.as_str())
            {
                record.documents.push(DocumentRef { url: absolute.to_string(), context_url: url.to_string() });
            }
        }
    }
}

fn resolve(base: Option<&Url>, link: &str) -> Option<String> {
    match base {
        Some(base) => base.join(link).ok().map(|u| u.to_string()),
        None => Url::parse(link).ok().map(|u| u.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mapping: &str) -> CrawlConfig {
        CrawlConfig::builder("http://example.com/").content_mapping(mapping).build().unwrap()
    }

    fn fetched(url: &str, body: &str) -> FetchedDocument {
        FetchedDocument { url: url.to_string(), media_type: "text/html".to_string(), body: body.to_string() }
    }

    const MAPPING: &str = "http://example.com/2/*|other2\nhttp://example.com|example|article\nhttp://other.co*|other";

    #[test]
    fn test_classify_labels() {
        let config = config(MAPPING);
        let classifier = Classifier::new(&config).unwrap();

        assert_eq!(classifier.classify("http://other.com/")[0].label, "other");
        assert_eq!(classifier.classify("http://example.com/2/x")[0].label, "other2");
        assert_eq!(classifier.classify("http://another.com/")[0].label, "page");

        let example = classifier.classify("http://example.com/");
        assert_eq!(example[0].label, "example");
        assert_eq!(example[0].selector.as_ref().map(|s| s.as_str()), Some("article"));
        assert!(example.last().is_some_and(|r| r.is_fallback()));
    }

    #[test]
    fn test_active_rule_needs_dom_match() {
        let config = config(MAPPING);
        let classifier = Classifier::new(&config).unwrap();

        let with_article = Document::parse("<body><article>One</article></body>");
        assert_eq!(classifier.active_rule("http://example.com/", &with_article).label, "example");

        let without = Document::parse("<body><p>No articles</p></body>");
        assert!(classifier.active_rule("http://example.com/", &without).is_fallback());
    }

    #[test]
    fn test_single_record_uses_main_region() {
        let config = config("");
        let classifier = Classifier::new(&config).unwrap();
        let html = r#"<html><head><title>Home</title></head><body>
            <nav><a href="/a">Menu</a></nav>
            <main><h1>Welcome</h1><p>Real content.</p><img src="/img/a.png" alt="A"></main>
            <footer>Footer</footer></body></html>"#;

        let records = classifier.classify_document(&fetched("http://example.com/", html));

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.title, "Home");
        assert_eq!(record.content_type, "page");
        assert_eq!(record.media_type, "text/html");
        assert!(record.body.starts_with("<main>"));
        assert!(record.body.contains("Real content."));
        assert!(!record.body.contains("Menu"));
        assert!(!record.body.contains("Footer"));
        assert_eq!(record.images, vec![ImageRef::new("http://example.com/img/a.png", "A")]);
        assert!(record.sub_index.is_none());
    }

    #[test]
    fn test_body_fallback_drops_chrome() {
        let config = config("");
        let classifier = Classifier::new(&config).unwrap();
        let html = "<html><body><header>Site</header><div><p>Text</p></div><script>x()</script></body></html>";

        let records = classifier.classify_document(&fetched("http://example.com/a", html));

        assert_eq!(records[0].body, "<div><p>Text</p></div>");
    }

    #[test]
    fn test_fan_out_records() {
        let config = config("http://example.com/news|news|.item|[parent]||section|.date||date|%Y/%m/%d");
        let classifier = Classifier::new(&config).unwrap();
        let html = r#"<html><head><title>News</title></head><body>
            <div class="item"><h2>First</h2><span class="date">2020/01/02</span></div>
            <div class="item"><p>Untitled</p><span class="date">bad</span></div>
            </body></html>"#;

        let records = classifier.classify_document(&fetched("http://example.com/news", html));

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].url, "http://example.com/news#0");
        assert_eq!(records[0].title, "First");
        assert_eq!(records[0].sub_index, Some(0));
        assert_eq!(records[0].fields.get("date").map(String::as_str), Some("2020-01-02"));
        assert_eq!(records[0].fields.get("section").map(String::as_str), Some("News"));
        assert_eq!(records[1].url, "http://example.com/news#1");
        assert_eq!(records[1].title, "News - news 1");
        assert_eq!(records[1].fields.get("date").map(String::as_str), Some(""));
    }

    #[test]
    fn test_inline_images_keep_payload() {
        let config = config("http://example.com/gallery|gallery|figure");
        let classifier = Classifier::new(&config).unwrap();
        let html = r#"<html><body>
            <figure><img src="data:image/png;base64,AAAA" alt="dot"><img src="/big.png"></figure>
            <figure><img src="data:image/gif;base64,BBBB"></figure>
            </body></html>"#;

        let records = classifier.classify_document(&fetched("http://example.com/gallery", html));

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].images,
            vec![
                ImageRef {
                    url: "http://example.com/gallery#data0".to_string(),
                    alt: "dot".to_string(),
                    data: Some("image/png;base64,AAAA".to_string()),
                },
                ImageRef::new("http://example.com/big.png", ""),
            ]
        );
        assert_eq!(records[1].images[0].url, "http://example.com/gallery#data1");
        assert_eq!(records[1].images[0].data.as_deref(), Some("image/gif;base64,BBBB"));
    }

    #[test]
    fn test_forms_and_documents() {
        let config = config("");
        let classifier = Classifier::new(&config).unwrap();
        let html = r#"<html><body><main>
            <form action="/search" method="POST"><input name="q"></form>
            <a href="/files/report.pdf">Report</a><a href="/about">About</a>
            </main></body></html>"#;

        let records = classifier.classify_document(&fetched("http://example.com/", html));
        let record = &records[0];

        assert_eq!(record.forms.len(), 1);
        assert_eq!(record.forms[0].action, "/search");
        assert_eq!(record.forms[0].method, "post");
        assert_eq!(
            record.documents,
            vec![DocumentRef {
                url: "http://example.com/files/report.pdf".to_string(),
                context_url: "http://example.com/".to_string(),
            }]
        );
    }
}
