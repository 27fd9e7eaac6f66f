//! Cross-page deduplication.
//!
//! Boilerplate removal runs in two passes over the whole page set. The first
//! hashes every candidate block and counts how many times each hash occurs;
//! the second removes blocks whose hash occurs in at least
//! `max(pages / 2, 4)` places. Title affix stripping removes a prefix or
//! suffix shared by every title, such as a trailing site name.

use std::collections::HashMap;

use ego_tree::NodeId;
use tracing::debug;

use crate::dom_tree::DomTree;
use crate::record::PageRecord;

/// Tags considered as boilerplate candidates
pub const CANDIDATE_TAGS: &[&str] = &["div", "header", "footer", "section", "article"];

/// Thresholds for boilerplate detection
#[derive(Debug, Clone)]
pub struct DedupConfig {
    /// Minimum stripped markup length for a block to be counted
    pub count_floor: usize,
    /// Minimum stripped markup length for a block to be removed
    pub remove_floor: usize,
    /// Lower bound of the removal tolerance
    pub min_tolerance: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { count_floor: 20, remove_floor: 10, min_tolerance: 4 }
    }
}

/// Occurrence counts of block hashes across one page set
#[derive(Debug, Clone, Default)]
pub struct HashFrequencyTable {
    counts: HashMap<i32, usize>,
    page_count: usize,
}

impl HashFrequencyTable {
    /// Count every candidate block of every page body
    pub fn count(pages: &[PageRecord], config: &DedupConfig) -> Self {
        let mut table = Self { counts: HashMap::new(), page_count: pages.len() };

        for page in pages {
            let tree = DomTree::parse_fragment(&page.body);
            for id in candidates(&tree) {
                let markup = strip_whitespace(&tree.inner_html(id));
                if markup.chars().count() < config.count_floor {
                    continue;
                }
                *table.counts.entry(fragment_hash(&markup)).or_insert(0) += 1;
            }
        }

        table
    }

    pub fn frequency(&self, hash: i32) -> usize {
        self.counts.get(&hash).copied().unwrap_or(0)
    }

    /// Occurrences at which a block counts as boilerplate
    pub fn tolerance(&self, config: &DedupConfig) -> f64 {
        (self.page_count as f64 / 2.0).max(config.min_tolerance as f64)
    }

    /// Number of distinct hashes counted
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Remove blocks the table marks as boilerplate from every page body.
/// Returns the number of blocks removed.
pub fn remove_boilerplate(pages: &mut [PageRecord], table: &HashFrequencyTable, config: &DedupConfig) -> usize {
    let tolerance = table.tolerance(config);
    let mut removed = 0;

    for page in pages.iter_mut() {
        let mut tree = DomTree::parse_fragment(&page.body);

        for id in candidates(&tree) {
            if !tree.is_attached(id) {
                continue;
            }
            let markup = strip_whitespace(&tree.inner_html(id));
            if markup.chars().count() < config.remove_floor {
                continue;
            }
            if table.frequency(fragment_hash(&markup)) as f64 >= tolerance {
                tree.detach(id);
                removed += 1;
            }
        }

        page.body = narrowed_markup(&tree);
    }

    debug!(removed, tolerance, "boilerplate blocks removed");
    removed
}

/// Count and remove boilerplate in one call
pub fn dedupe_boilerplate(pages: &mut [PageRecord], config: &DedupConfig) -> usize {
    let table = HashFrequencyTable::count(pages, config);
    remove_boilerplate(pages, &table, config)
}

fn candidates(tree: &DomTree) -> Vec<NodeId> {
    tree.descendants(tree.root())
        .into_iter()
        .filter(|&id| tree.tag_name(id).is_some_and(|name| CANDIDATE_TAGS.contains(&name)))
        .collect()
}

fn narrowed_markup(tree: &DomTree) -> String {
    let main =
        tree.find_first(tree.root(), |t, id| t.tag_name(id) == Some("main") || t.attr(id, "role") == Some("main"));
    match main {
        Some(id) => tree.outer_html(id),
        None => tree.inner_html(tree.root()),
    }
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// 32-bit polynomial hash over UTF-16 code units: `h = (h << 5) - h + c`
pub fn fragment_hash(text: &str) -> i32 {
    text.encode_utf16()
        .fold(0i32, |hash, unit| (hash << 5).wrapping_sub(hash).wrapping_add(unit as i32))
}

/// Longest prefix shared by every title
pub fn find_prefix(titles: &[String]) -> String {
    if titles.len() < 2 {
        return String::new();
    }
    let mut sorted: Vec<&str> = titles.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    let (first, last) = (sorted[0], sorted[sorted.len() - 1]);

    first
        .char_indices()
        .zip(last.chars())
        .find(|((_, a), b)| a != b)
        .map_or(first.to_string(), |((index, _), _)| first[..index].to_string())
}

/// Longest suffix shared by every title
pub fn find_suffix(titles: &[String]) -> String {
    let reversed: Vec<String> = titles.iter().map(|t| t.chars().rev().collect()).collect();
    find_prefix(&reversed).chars().rev().collect()
}

/// Strip the prefix and suffix shared by every one-record-per-URL page
/// title. Titles that would become empty are left alone.
pub fn strip_title_affixes(pages: &mut [PageRecord]) {
    let titles: Vec<String> = pages.iter().filter(|p| !p.is_sub_record()).map(|p| p.title.clone()).collect();
    if titles.len() < 2 {
        return;
    }

    let prefix = find_prefix(&titles);
    let suffix = find_suffix(&titles);
    debug!(prefix = %prefix, suffix = %suffix, "title affixes");

    for page in pages.iter_mut().filter(|p| !p.is_sub_record()) {
        let mut title = page.title.as_str();
        if !prefix.is_empty() {
            title = title.strip_prefix(prefix.as_str()).unwrap_or(title);
        }
        if !suffix.is_empty() {
            title = title.strip_suffix(suffix.as_str()).unwrap_or(title);
        }
        if !title.is_empty() {
            page.title = title.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(title: &str, body: &str) -> PageRecord {
        PageRecord { title: title.to_string(), body: body.to_string(), ..Default::default() }
    }

    fn titles(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fragment_hash() {
        assert_eq!(fragment_hash(""), 0);
        assert_eq!(fragment_hash("a"), 97);
        assert_eq!(fragment_hash("ab"), 97 * 31 + 98);
        // wraps instead of overflowing
        let long = "x".repeat(1000);
        assert_eq!(fragment_hash(&long), fragment_hash(&long));
    }

    #[test]
    fn test_prefix_and_suffix() {
        let items = titles(&["Prefix 1 Suffix", "Prefix 2 Suffix", "Prefix 3 Suffix", "Prefix 4 Suffix"]);
        assert_eq!(find_prefix(&items), "Prefix ");
        assert_eq!(find_suffix(&items), " Suffix");
    }

    #[test]
    fn test_prefix_without_common_start() {
        let items = titles(&["Happy", "Sunny", "Rainy", "y"]);
        assert_eq!(find_prefix(&items), "");
        assert_eq!(find_suffix(&items), "y");
    }

    #[test]
    fn test_single_title_has_no_affixes() {
        assert_eq!(find_prefix(&titles(&["Only"])), "");
        assert_eq!(find_suffix(&titles(&["Only"])), "");
    }

    #[test]
    fn test_strip_title_affixes() {
        let mut pages: Vec<PageRecord> = ["Prefix 1 Suffix", "Prefix 2 Suffix", "Prefix 3 Suffix", "Prefix 4 Suffix"]
            .iter()
            .map(|t| page(t, ""))
            .collect();
        strip_title_affixes(&mut pages);
        let stripped: Vec<&str> = pages.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(stripped, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_sub_records_keep_titles() {
        let mut pages = vec![page("Site - A", ""), page("Site - B", ""), page("Site - Item", "")];
        pages[2].sub_index = Some(0);
        pages.push(page("Site - Other", ""));
        pages[3].sub_index = Some(1);
        strip_title_affixes(&mut pages);
        assert_eq!(pages[0].title, "A");
        assert_eq!(pages[1].title, "B");
        assert_eq!(pages[2].title, "Site - Item");
    }

    #[test]
    fn test_identical_titles_stay() {
        let mut pages = vec![page("Same", ""), page("Same", "")];
        strip_title_affixes(&mut pages);
        assert_eq!(pages[0].title, "Same");
    }

    #[test]
    fn test_boilerplate_removed_from_every_page() {
        let banner = "<div>Subscribe to our newsletter for weekly updates</div>";
        let mut pages: Vec<PageRecord> = (0..6)
            .map(|i| page("", &format!("{}<p>Unique content number {}</p>", banner, i)))
            .collect();

        let removed = dedupe_boilerplate(&mut pages, &DedupConfig::default());

        assert_eq!(removed, 6);
        for (i, p) in pages.iter().enumerate() {
            assert!(!p.body.contains("newsletter"));
            assert!(p.body.contains(&format!("Unique content number {}", i)));
        }
    }

    #[test]
    fn test_rare_fragments_preserved() {
        let shared = "<section>Seasonal announcement about opening hours</section>";
        let mut pages: Vec<PageRecord> = (0..10)
            .map(|i| {
                let extra = if i < 3 { shared } else { "" };
                page("", &format!("<p>Body {}</p>{}", i, extra))
            })
            .collect();

        let table = HashFrequencyTable::count(&pages, &DedupConfig::default());
        assert_eq!(table.tolerance(&DedupConfig::default()), 5.0);
        remove_boilerplate(&mut pages, &table, &DedupConfig::default());

        for p in &pages[..3] {
            assert!(p.body.contains(shared));
        }
    }

    #[test]
    fn test_short_blocks_not_counted() {
        let pages: Vec<PageRecord> = (0..5).map(|_| page("", "<div>tiny</div>")).collect();
        let table = HashFrequencyTable::count(&pages, &DedupConfig::default());
        assert!(table.is_empty());
    }

    #[test]
    fn test_narrows_to_main() {
        let mut pages = vec![page("", r#"<div>outside</div><main role="main"><p>inside</p></main>"#)];
        dedupe_boilerplate(&mut pages, &DedupConfig::default());
        assert_eq!(pages[0].body, r#"<main role="main"><p>inside</p></main>"#);
    }
}
