//! Page graph builder.
//!
//! Runs once per crawl over the full list of extracted records, in crawl
//! order, and produces the [`SiteExport`]. The stages are:
//!
//! 1. merge skipped image and document links, linking documents back to
//!    the page that referenced them
//! 2. flatten the image, document and form collections
//! 3. remove boilerplate and shared title affixes (when enabled)
//! 4. normalize every page, derive its alias and parent and drop the pages
//!    that do not belong in the export
//! 5. synthesize placeholder pages for missing ancestors
//! 6. score bodies (when enabled)

use std::collections::{HashMap, HashSet};

use regex::{Captures, Regex};
use tracing::{debug, info, warn};

use crate::alias::{alias_from_url, canonicalize_url, decode_entities, humanize, parent_alias, sub_alias};
use crate::config::CrawlConfig;
use crate::dedupe::{dedupe_boilerplate, strip_title_affixes};
use crate::links::SkippedLink;
use crate::parse::Document;
use crate::record::{DocumentRef, FormRef, ImageRef, PageRecord, RedirectRecord, SiteExport};
use crate::rewrite::{strip_extension, strip_headings, strip_link_extensions};
use crate::scoring::score_content;

/// Content-type label of synthesized ancestor pages
pub const PLACEHOLDER_CONTENT_TYPE: &str = "index";

/// Bodies at or below this many bytes are never treated as duplicates
pub const DUPLICATE_MIN_LENGTH: usize = 256;

const NOT_FOUND_PATTERN: &str = r"(?i)page (not found|missing)";

/// Everything the crawl collected, handed to the builder once
#[derive(Debug, Clone, Default)]
pub struct CrawlState {
    /// Classifier output in crawl order
    pub pages: Vec<PageRecord>,
    /// Images fetched directly
    pub images: Vec<ImageRef>,
    /// Non-HTML documents fetched directly
    pub documents: Vec<DocumentRef>,
    pub skipped_images: Vec<SkippedLink>,
    pub skipped_documents: Vec<SkippedLink>,
}

/// Counters for the pages a build dropped or added
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub pages_in: usize,
    pub pages_out: usize,
    pub boilerplate_blocks: usize,
    pub redirect_scripts: usize,
    pub not_found: usize,
    pub empty_titles: usize,
    pub duplicate_aliases: usize,
    /// Pages replaced by a redirect to an identical page
    pub duplicates: usize,
    pub placeholders: usize,
}

/// Accepted pages keyed by alias, in acceptance order
#[derive(Debug, Default)]
struct AliasMap {
    pages: Vec<PageRecord>,
    index: HashMap<String, usize>,
}

impl AliasMap {
    fn contains(&self, alias: &str) -> bool {
        self.index.contains_key(alias)
    }

    fn get_mut(&mut self, alias: &str) -> Option<&mut PageRecord> {
        let position = *self.index.get(alias)?;
        self.pages.get_mut(position)
    }

    fn insert(&mut self, page: PageRecord) {
        self.index.insert(page.alias.clone(), self.pages.len());
        self.pages.push(page);
    }
}

/// Turns a crawl's records into the final site model
pub struct PageGraphBuilder<'a> {
    config: &'a CrawlConfig,
    not_found: Regex,
}

impl<'a> PageGraphBuilder<'a> {
    pub fn new(config: &'a CrawlConfig) -> Self {
        Self { config, not_found: Regex::new(NOT_FOUND_PATTERN).unwrap() }
    }

    pub fn build(&self, state: CrawlState) -> SiteExport {
        let mut stats = BuildStats { pages_in: state.pages.len(), ..Default::default() };

        if state.pages.is_empty() {
            warn!(domain = %self.config.domain, "crawl produced no pages");
            return SiteExport::empty(&self.config.domain);
        }

        let CrawlState { mut pages, images, documents, skipped_images, skipped_documents } = state;

        let documents = merge_documents(&mut pages, documents, skipped_documents);
        let images = flatten_images(&pages, images, skipped_images);
        let forms = flatten_forms(&pages);

        if self.config.remove_duplicates {
            stats.boilerplate_blocks = dedupe_boilerplate(&mut pages, &self.config.dedup);
            strip_title_affixes(&mut pages);
        }

        let (map, redirects) = self.normalize_pages(pages, &mut stats);
        let mut pages = self.synthesize_parents(map, &mut stats).pages;

        if self.config.score_content {
            for page in &mut pages {
                let result = score_content(&page.body, &self.config.score);
                page.body = result.content;
                page.score = result.score;
            }
        }

        stats.pages_out = pages.len();
        info!(
            domain = %self.config.domain,
            pages_in = stats.pages_in,
            pages_out = stats.pages_out,
            redirects = redirects.len(),
            placeholders = stats.placeholders,
            not_found = stats.not_found,
            empty_titles = stats.empty_titles,
            duplicate_aliases = stats.duplicate_aliases,
            boilerplate_blocks = stats.boilerplate_blocks,
            "page graph built"
        );

        SiteExport { domain: self.config.domain.clone(), pages, images, documents, forms, redirects, stats }
    }

    fn normalize_pages(&self, pages: Vec<PageRecord>, stats: &mut BuildStats) -> (AliasMap, Vec<RedirectRecord>) {
        let mut map = AliasMap::default();
        let mut bodies: HashMap<String, String> = HashMap::new();
        let mut redirects = Vec::new();
        let generic_title = pages.first().map(|p| p.title.clone()).unwrap_or_default();

        for (position, mut page) in pages.into_iter().enumerate() {
            for (find, replace) in &self.config.replacements {
                page.url = page.url.replace(find.as_str(), replace);
                page.body = page.body.replace(find.as_str(), replace);
            }
            page.url = canonicalize_url(&page.url);

            if let Some(redirect) = &self.config.redirect_script {
                page.body = unwrap_redirects(redirect, &page.body);
                if redirect.is_match(&page.url) {
                    debug!(url = %page.url, "dropped redirect script");
                    stats.redirect_scripts += 1;
                    continue;
                }
            }

            if self.not_found.is_match(&page.title) {
                debug!(url = %page.url, title = %page.title, "dropped not-found page");
                stats.not_found += 1;
                continue;
            }

            if !self.config.bogus_extensions.is_empty() {
                page.url = strip_extension(&page.url, &self.config.bogus_extensions);
                page.body = strip_link_extensions(&page.body, &self.config.bogus_extensions);
            }

            let alias = alias_from_url(&page.url);
            let alias = match page.sub_index {
                Some(index) => sub_alias(&alias, index),
                None => alias,
            };

            if let Some(heading) = last_heading(&page.body) {
                page.title = heading;
            }

            page.alias = decode_entities(&alias);
            page.parent = parent_alias(&page.alias);

            if position > 0 && page.title == generic_title {
                page.title = humanize(&page.alias);
            }

            if let Some(exclude) = &self.config.exclude_title {
                page.title = exclude.replace_all(&page.title, "").into_owned();
            }

            if let Some(earlier) = map.get_mut(&page.alias) {
                debug!(url = %page.url, alias = %page.alias, "dropped duplicate alias");
                earlier.body.push_str(&format!("<!-- duplicate alias: {} -->", page.url));
                stats.duplicate_aliases += 1;
                continue;
            }

            page.title = decode_entities(&page.title).trim().to_string();
            page.body = strip_headings(&page.body);

            if page.title.is_empty() {
                debug!(url = %page.url, "dropped page without title");
                stats.empty_titles += 1;
                continue;
            }

            let body = page.body.trim();
            if body.len() > DUPLICATE_MIN_LENGTH {
                if let Some(original) = bodies.get(body) {
                    debug!(alias = %page.alias, original = %original, "redirected duplicate page");
                    redirects.push(RedirectRecord::internal(page.alias.clone(), original));
                    stats.duplicates += 1;
                    continue;
                }
                bodies.insert(body.to_string(), page.alias.clone());
            }

            map.insert(page);
        }

        (map, redirects)
    }

    /// Add a placeholder for every missing ancestor until each page's
    /// parent chain is complete.
    fn synthesize_parents(&self, mut map: AliasMap, stats: &mut BuildStats) -> AliasMap {
        loop {
            let mut missing: Vec<String> = Vec::new();
            let mut seen = HashSet::new();
            for page in &map.pages {
                if !page.parent.is_empty() && !map.contains(&page.parent) && seen.insert(page.parent.clone()) {
                    missing.push(page.parent.clone());
                }
            }

            if missing.is_empty() {
                return map;
            }

            for alias in missing {
                debug!(alias = %alias, "synthesized parent page");
                map.insert(self.placeholder(&alias));
                stats.placeholders += 1;
            }
        }
    }

    fn placeholder(&self, alias: &str) -> PageRecord {
        let last = alias.rsplit('/').next().unwrap_or_default();
        let title = match humanize(last) {
            t if t.is_empty() => alias.to_string(),
            t => t,
        };
        let url = match self.config.start_url.join(alias) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}://{}{}", self.config.start_url.scheme(), self.config.domain, alias),
        };

        PageRecord {
            url,
            alias: alias.to_string(),
            parent: parent_alias(alias),
            title,
            media_type: "text/html".to_string(),
            content_type: PLACEHOLDER_CONTENT_TYPE.to_string(),
            ..Default::default()
        }
    }
}

/// Replace redirect-script links with their decoded first capture
fn unwrap_redirects(redirect: &Regex, body: &str) -> String {
    redirect
        .replace_all(body, |caps: &Captures| decode_entities(caps.get(1).map_or("", |m| m.as_str())))
        .into_owned()
}

/// Text of the last non-empty `<h1>` in a body
fn last_heading(body: &str) -> Option<String> {
    if !body.contains("<h1") {
        return None;
    }
    let fragment = Document::parse_fragment(body);
    fragment
        .select("h1")
        .ok()?
        .into_iter()
        .map(|h| h.text().trim().to_string())
        .filter(|text| !text.is_empty())
        .last()
}

fn merge_documents(
    pages: &mut [PageRecord], fetched: Vec<DocumentRef>, skipped: Vec<SkippedLink>,
) -> Vec<DocumentRef> {
    let skipped = skipped.into_iter().map(|link| DocumentRef { url: link.url, context_url: link.context_url });
    let mut documents: Vec<DocumentRef> = Vec::new();
    let mut seen = HashSet::new();
    let referenced: Vec<DocumentRef> = pages.iter().flat_map(|p| p.documents.iter().cloned()).collect();

    for document in fetched.into_iter().chain(skipped).chain(referenced) {
        if seen.insert(document.url.clone()) {
            documents.push(document);
        }
    }

    for document in documents.iter().filter(|d| !d.context_url.is_empty()) {
        let context = canonicalize_url(&document.context_url);
        for page in pages.iter_mut().filter(|p| canonicalize_url(&p.url) == context) {
            if page.documents.iter().all(|d| d.url != document.url) {
                page.documents.push(document.clone());
            }
        }
    }

    documents
}

fn flatten_images(pages: &[PageRecord], fetched: Vec<ImageRef>, skipped: Vec<SkippedLink>) -> Vec<ImageRef> {
    let skipped = skipped.into_iter().map(|link| ImageRef::new(link.url, ""));
    let referenced = pages.iter().flat_map(|p| p.images.iter().cloned());
    let mut seen = HashSet::new();
    fetched.into_iter().chain(skipped).chain(referenced).filter(|image| seen.insert(image.url.clone())).collect()
}

fn flatten_forms(pages: &[PageRecord]) -> Vec<FormRef> {
    let mut seen = HashSet::new();
    pages.iter().flat_map(|p| p.forms.iter()).filter(|form| seen.insert(form.markup.clone())).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CrawlConfig {
        CrawlConfig::builder("http://example.com/").score_content(false).remove_duplicates(false).build().unwrap()
    }

    fn page(url: &str, title: &str, body: &str) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            media_type: "text/html".to_string(),
            content_type: "page".to_string(),
            ..Default::default()
        }
    }

    fn build(config: &CrawlConfig, pages: Vec<PageRecord>) -> SiteExport {
        PageGraphBuilder::new(config).build(CrawlState { pages, ..Default::default() })
    }

    #[test]
    fn test_empty_crawl() {
        let export = build(&config(), Vec::new());
        assert!(export.is_empty());
        assert!(export.redirects.is_empty());
        assert_eq!(export.domain, "example.com");
    }

    #[test]
    fn test_alias_and_parent() {
        let export = build(
            &config(),
            vec![page("http://example.com/", "Home", "<p>home</p>"), page("http://example.com/about/?x=1", "About", "<p>a</p>")],
        );
        let about = export.page("/about").unwrap();
        assert_eq!(about.url, "http://example.com/about");
        assert_eq!(about.parent, "");
        assert_eq!(export.page("/").map(|p| p.title.as_str()), Some("Home"));
    }

    #[test]
    fn test_parent_synthesis() {
        let export = build(&config(), vec![page("http://example.com/a/b/c", "Leaf", "<p>leaf</p>")]);

        assert_eq!(export.pages.len(), 3);
        assert_eq!(export.stats.placeholders, 2);
        let b = export.page("/a/b").unwrap();
        assert_eq!(b.title, "B");
        assert_eq!(b.parent, "/a");
        assert_eq!(b.content_type, PLACEHOLDER_CONTENT_TYPE);
        assert_eq!(b.url, "http://example.com/a/b");
        let a = export.page("/a").unwrap();
        assert_eq!(a.title, "A");
        assert_eq!(a.parent, "");
    }

    #[test]
    fn test_placeholder_keeps_start_port() {
        let config = CrawlConfig::builder("http://localhost:8080/")
            .score_content(false)
            .remove_duplicates(false)
            .build()
            .unwrap();
        let export = build(&config, vec![page("http://localhost:8080/docs/intro", "Intro", "<p>intro</p>")]);

        assert_eq!(export.page("/docs").map(|p| p.url.as_str()), Some("http://localhost:8080/docs"));
    }

    #[test]
    fn test_last_heading_overrides_title_and_is_removed() {
        let export =
            build(&config(), vec![page("http://example.com/x", "Site", "<h1>First</h1><p>text</p><h1>Second</h1>")]);
        let x = export.page("/x").unwrap();
        assert_eq!(x.title, "Second");
        assert_eq!(x.body, "<p>text</p>");
    }

    #[test]
    fn test_generic_title_replaced() {
        let export = build(
            &config(),
            vec![
                page("http://example.com/", "Example Site", "<p>home</p>"),
                page("http://example.com/our_team", "Example Site", "<p>team</p>"),
            ],
        );
        assert_eq!(export.page("/").unwrap().title, "Example Site");
        assert_eq!(export.page("/our_team").unwrap().title, "Our Team");
    }

    #[test]
    fn test_soft_exclusions() {
        let export = build(
            &config(),
            vec![
                page("http://example.com/", "Home", "<p>home</p>"),
                page("http://example.com/gone", "Page Not Found", "<p>404</p>"),
                page("http://example.com/blank", "   ", "<p>nothing</p>"),
            ],
        );
        assert_eq!(export.pages.len(), 1);
        assert_eq!(export.stats.not_found, 1);
        assert_eq!(export.stats.empty_titles, 1);
    }

    #[test]
    fn test_duplicate_alias_marks_first() {
        let export = build(
            &config(),
            vec![page("http://example.com/a", "A", "<p>one</p>"), page("http://example.com/a/", "Other", "<p>two</p>")],
        );
        assert_eq!(export.pages.len(), 1);
        assert_eq!(export.stats.duplicate_aliases, 1);
        assert!(export.pages[0].body.contains("<!-- duplicate alias: http://example.com/a -->"));
    }

    #[test]
    fn test_full_duplicate_redirects() {
        let body = format!("<p>{}</p>", "Long repeated paragraph text. ".repeat(12));
        let export = build(
            &config(),
            vec![page("http://example.com/one", "One", &body), page("http://example.com/two", "Two", &body)],
        );
        assert_eq!(export.pages.len(), 1);
        assert_eq!(export.redirects, vec![RedirectRecord::internal("/two", "/one")]);
    }

    #[test]
    fn test_short_identical_bodies_kept() {
        let export = build(
            &config(),
            vec![page("http://example.com/one", "One", "<p>same</p>"), page("http://example.com/two", "Two", "<p>same</p>")],
        );
        assert_eq!(export.pages.len(), 2);
        assert!(export.redirects.is_empty());
    }

    #[test]
    fn test_search_replace_and_extensions() {
        let config = CrawlConfig::builder("http://example.com/")
            .score_content(false)
            .remove_duplicates(false)
            .search_replace("/legacy/|/")
            .script_extensions("php")
            .exclude_title(r"\s*\|\s*Example$")
            .build()
            .unwrap();
        let export = build(
            &config,
            vec![page("http://example.com/legacy/about.php", "About | Example", r#"<a href="/contact.php">Contact</a>"#)],
        );
        let about = export.page("/about").unwrap();
        assert_eq!(about.url, "http://example.com/about");
        assert_eq!(about.title, "About");
        assert_eq!(about.body, r#"<a href="/contact">Contact</a>"#);
    }

    #[test]
    fn test_redirect_script() {
        let config = CrawlConfig::builder("http://example.com/")
            .score_content(false)
            .remove_duplicates(false)
            .redirect_script(r#"/out(/[^"]*)"#)
            .build()
            .unwrap();
        let export = build(
            &config,
            vec![
                page("http://example.com/page", "Page", r#"<a href="/out/target">Go</a>"#),
                page("http://example.com/out/target", "Redirect", "<p>r</p>"),
            ],
        );
        assert_eq!(export.pages.len(), 1);
        assert_eq!(export.stats.redirect_scripts, 1);
        assert_eq!(export.pages[0].body, r#"<a href="/target">Go</a>"#);
    }

    #[test]
    fn test_redirect_script_decodes_captured_entities() {
        let config = CrawlConfig::builder("http://example.com/")
            .score_content(false)
            .remove_duplicates(false)
            .redirect_script(r#"/out(/[^"]*)"#)
            .build()
            .unwrap();
        let export =
            build(&config, vec![page("http://example.com/page", "Page", r#"<a href="/out/find?q=a&amp;n=2">Go</a>"#)]);

        assert_eq!(export.pages[0].body, r#"<a href="/find?q=a&n=2">Go</a>"#);
    }

    #[test]
    fn test_sub_records_become_children() {
        let mut first = page("http://example.com/news#0", "First", "<p>1</p>");
        first.sub_index = Some(0);
        let mut second = page("http://example.com/news#1", "Second", "<p>2</p>");
        second.sub_index = Some(1);

        let export = build(&config(), vec![first, second]);

        assert_eq!(export.page("/news/0").map(|p| p.parent.as_str()), Some("/news"));
        assert_eq!(export.page("/news/1").map(|p| p.title.as_str()), Some("Second"));
        assert_eq!(export.page("/news").map(|p| p.title.as_str()), Some("News"));
    }

    #[test]
    fn test_scores_bodies() {
        let config = CrawlConfig::builder("http://example.com/").remove_duplicates(false).build().unwrap();
        let export = build(&config, vec![page("http://example.com/a", "A", "<p>Plain readable text in a paragraph.</p>")]);
        assert!(export.pages[0].score > 0);
    }

    #[test]
    fn test_documents_linked_to_context_page() {
        let state = CrawlState {
            pages: vec![page("http://example.com/reports/", "Reports", "<p>r</p>")],
            skipped_documents: vec![SkippedLink {
                url: "http://example.com/files/q1.pdf".to_string(),
                context_url: "http://example.com/reports".to_string(),
            }],
            skipped_images: vec![SkippedLink {
                url: "http://example.com/logo.png".to_string(),
                context_url: "http://example.com/".to_string(),
            }],
            ..Default::default()
        };

        let export = PageGraphBuilder::new(&config()).build(state);

        assert_eq!(export.documents.len(), 1);
        assert_eq!(export.images.len(), 1);
        assert_eq!(export.page("/reports").map(|p| p.documents.len()), Some(1));
    }
}
