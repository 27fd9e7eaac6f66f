//! Tree cleaner: prunes and normalizes a single page's DOM in place.
//!
//! The walk is depth-first. Pruning happens pre-order; the div/span
//! unwrapping runs post-order so chains of meaningless wrappers collapse
//! from the bottom up as the recursion unwinds. Attribute rules are applied
//! afterwards by a streaming rewrite of the serialized markup.

use ego_tree::NodeId;
use url::Url;

use crate::dom_tree::DomTree;
use crate::rewrite::rewrite_attributes;

/// Attributes kept when attribute stripping is on
pub const DEFAULT_ALLOWED_ATTRIBUTES: &[&str] = &[
    "href", "src", "alt", "role", "name", "value", "type", "title", "width", "height", "rows", "cols", "size", "for",
    "method", "action", "placeholder", "colspan", "rowspan", "id",
];

/// Tags that carry meaning even without text or children
pub const DEFAULT_MEANINGFUL_TAGS: &[&str] = &[
    "img", "input", "select", "textarea", "button", "canvas", "map", "svg", "picture", "source", "time", "video",
    "object", "audio", "a",
];

/// Configuration for the tree cleaner
#[derive(Debug, Clone)]
pub struct CleanConfig {
    /// Whether to remove elements with no text and no children
    pub remove_empty_nodes: bool,
    /// Whether to strip attributes outside the allow-list
    pub remove_attributes: bool,
    /// Whether to collapse whitespace runs in text
    pub trim_whitespace: bool,
    /// Whether to unwrap nested div/span wrappers
    pub simplify_structure: bool,
    /// Whether to drop in-page `#fragment` links
    pub remove_fragment_links: bool,
    /// Attributes kept by attribute stripping
    pub allowed_attributes: Vec<String>,
    /// Tags never pruned for being empty
    pub meaningful_tags: Vec<String>,
    /// The crawl's own origin; same-origin links are made relative
    pub origin: Option<Url>,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            remove_empty_nodes: true,
            remove_attributes: true,
            trim_whitespace: true,
            simplify_structure: true,
            remove_fragment_links: true,
            allowed_attributes: DEFAULT_ALLOWED_ATTRIBUTES.iter().map(|s| s.to_string()).collect(),
            meaningful_tags: DEFAULT_MEANINGFUL_TAGS.iter().map(|s| s.to_string()).collect(),
            origin: None,
        }
    }
}

impl CleanConfig {
    fn is_meaningful(&self, tag: &str) -> bool {
        self.meaningful_tags.iter().any(|t| t == tag)
    }
}

/// Prune and simplify the subtree rooted at `node`, returning the same id.
///
/// The node itself may end up detached (an empty root) or unwrapped; callers
/// that need the surviving markup should serialize the node's former parent.
/// Attribute rules are not part of the tree walk, see [`clean_attributes`].
pub fn clean_tree(tree: &mut DomTree, node: NodeId, config: &CleanConfig) -> NodeId {
    clean_node(tree, node, config);
    node
}

/// Apply the attribute allow-list and same-origin relativization to
/// serialized markup
pub fn clean_attributes(html: &str, config: &CleanConfig) -> String {
    let allowed = config.remove_attributes.then_some(config.allowed_attributes.as_slice());
    rewrite_attributes(html, allowed, config.origin.as_ref())
}

/// Parse an HTML fragment, clean it and serialize the result
pub fn clean_html(html: &str, config: &CleanConfig) -> String {
    let mut tree = DomTree::parse_fragment(html);
    let root = tree.root();
    clean_tree(&mut tree, root, config);
    clean_attributes(&tree.inner_html(root), config)
}

fn clean_node(tree: &mut DomTree, node: NodeId, config: &CleanConfig) {
    if !tree.is_attached(node) {
        return;
    }

    if is_prunable(tree, node, config) {
        if let Some(parent) = tree.detach(node) {
            prune_upwards(tree, parent, config);
        }
        return;
    }

    if config.trim_whitespace {
        for child in tree.children(node) {
            if let Some(collapsed) = tree.text_data(child).map(collapse_whitespace) {
                tree.set_text(child, collapsed);
            }
        }
    }

    if config.remove_fragment_links
        && tree.tag_name(node) == Some("a")
        && tree.attr(node, "href").is_some_and(|href| href.starts_with('#'))
    {
        if let Some(parent) = tree.detach(node) {
            prune_upwards(tree, parent, config);
        }
        return;
    }

    for child in tree.element_children(node) {
        clean_node(tree, child, config);
    }

    if config.simplify_structure && tree.is_attached(node) && is_wrapper(tree, node) {
        let parent_is_wrapper = tree.parent(node).is_some_and(|p| is_wrapper(tree, p));
        if parent_is_wrapper {
            tree.unwrap(node);
        }
    }
}

fn is_wrapper(tree: &DomTree, node: NodeId) -> bool {
    matches!(tree.tag_name(node), Some("div") | Some("span"))
}

fn is_prunable(tree: &DomTree, node: NodeId, config: &CleanConfig) -> bool {
    let Some(tag) = tree.tag_name(node) else {
        return false;
    };
    config.remove_empty_nodes
        && !config.is_meaningful(tag)
        && tree.element_children(node).is_empty()
        && tree.text(node).trim().is_empty()
}

/// Removing a leaf can leave its ancestors empty; keep pruning upwards
/// until the scope node.
fn prune_upwards(tree: &mut DomTree, mut node: NodeId, config: &CleanConfig) {
    while is_prunable(tree, node, config) {
        match tree.detach(node) {
            Some(parent) => node = parent,
            None => break,
        }
    }
}

/// Collapse every whitespace run to a single space
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_whitespace = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_whitespace {
                out.push(' ');
            }
            last_whitespace = true;
        } else {
            out.push(c);
            last_whitespace = false;
        }
    }
    out
}
