//! In-place edits on scraper's own tree.
//!
//! scraper exposes its parsed tree as an `ego_tree::Tree<Node>`. The cleaner
//! and the deduplicator detach and unwrap nodes directly in that tree, and
//! serialization always goes back through scraper's `ElementRef`, so
//! markup that was not touched comes out exactly as scraper would print it.
//!
//! A [`DomTree`] is scoped to one node. Edits never reach above that node,
//! and detaching the scope node itself leaves an empty tree.

use ego_tree::{NodeId, NodeRef, Tree};
use scraper::{ElementRef, Html, Node, Selector};

/// A mutable scraper tree scoped to one node
#[derive(Debug, Clone)]
pub struct DomTree {
    tree: Tree<Node>,
    root: NodeId,
}

impl DomTree {
    /// Parse an HTML fragment (parsed in `<body>` context). The scope is the
    /// `<html>` element scraper wraps every fragment in.
    pub fn parse_fragment(html: &str) -> Self {
        let parsed = Html::parse_fragment(html);
        let root = parsed.root_element().id();
        Self { tree: parsed.tree, root }
    }

    /// Take a copy of `tree` scoped to the node `root`
    pub fn scoped(tree: &Tree<Node>, root: NodeId) -> Self {
        Self { tree: tree.clone(), root }
    }

    /// Copy of the tree `element` lives in, scoped to `element`
    pub fn from_element(element: ElementRef<'_>) -> Self {
        Self::scoped(element.tree(), element.id())
    }

    /// The scope node
    pub fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> Option<NodeRef<'_, Node>> {
        self.tree.get(id)
    }

    /// Lowercase tag name, `None` for anything but elements
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.node(id)?.value().as_element().map(|el| el.name())
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.tag_name(id).is_some()
    }

    /// Attribute value of an element
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)?.value().as_element()?.attr(name)
    }

    /// Decoded data of a text node
    pub fn text_data(&self, id: NodeId) -> Option<&str> {
        self.node(id)?.value().as_text().map(|text| &**text)
    }

    /// Parent of a node, `None` for the scope node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        if id == self.root {
            return None;
        }
        self.node(id)?.parent().map(|p| p.id())
    }

    /// Child ids of a node (all node kinds)
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).map(|n| n.children().map(|c| c.id()).collect()).unwrap_or_default()
    }

    /// Child ids of a node that are elements
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|n| n.children().filter(|c| c.value().is_element()).map(|c| c.id()).collect())
            .unwrap_or_default()
    }

    /// All descendants in document order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).map(|n| n.descendants().skip(1).map(|d| d.id()).collect()).unwrap_or_default()
    }

    /// First descendant element (document order) satisfying `predicate`
    pub fn find_first<F>(&self, id: NodeId, predicate: F) -> Option<NodeId>
    where
        F: Fn(&Self, NodeId) -> bool,
    {
        self.descendants(id).into_iter().find(|&d| self.is_element(d) && predicate(self, d))
    }

    /// Whether the node is still reachable from the scope node, and the
    /// scope node has not been detached itself
    pub fn is_attached(&self, id: NodeId) -> bool {
        let Some(scope) = self.node(self.root) else {
            return false;
        };
        if scope.parent().is_none() {
            return false;
        }
        self.node(id).is_some_and(|n| n.id() == self.root || n.ancestors().any(|a| a.id() == self.root))
    }

    /// Concatenated decoded text of the node and its descendants
    pub fn text(&self, id: NodeId) -> String {
        self.node(id)
            .map(|n| n.descendants().filter_map(|d| d.value().as_text().map(|t| &**t)).collect())
            .unwrap_or_default()
    }

    /// Unlink a node from its parent. Returns the former parent, or `None`
    /// when the node was the scope node.
    pub fn detach(&mut self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id);
        if let Some(mut node) = self.tree.get_mut(id) {
            node.detach();
        }
        parent
    }

    /// Replace a node with its own children, keeping their position.
    /// The scope node is never unwrapped.
    pub fn unwrap(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        let children = self.children(id);
        let Some(mut node) = self.tree.get_mut(id) else {
            return;
        };
        for child in children {
            node.insert_id_before(child);
        }
        node.detach();
    }

    /// Replace the data of a text node
    pub fn set_text(&mut self, id: NodeId, value: String) {
        if let Some(mut node) = self.tree.get_mut(id)
            && let Node::Text(text) = node.value()
        {
            text.text = value.into();
        }
    }

    /// Detach every descendant element of the scope node matching `selector`
    pub fn remove_matching(&mut self, selector: &Selector) -> usize {
        let matched: Vec<NodeId> = self
            .descendants(self.root)
            .into_iter()
            .filter(|&id| self.node(id).and_then(ElementRef::wrap).is_some_and(|el| selector.matches(&el)))
            .collect();
        for &id in &matched {
            self.detach(id);
        }
        matched.len()
    }

    /// Serialized markup of the node's children
    pub fn inner_html(&self, id: NodeId) -> String {
        if !self.is_attached(id) {
            return String::new();
        }
        self.node(id).and_then(ElementRef::wrap).map(|el| el.inner_html()).unwrap_or_default()
    }

    /// Serialized markup of the node itself
    pub fn outer_html(&self, id: NodeId) -> String {
        if !self.is_attached(id) {
            return String::new();
        }
        self.node(id).and_then(ElementRef::wrap).map(|el| el.html()).unwrap_or_default()
    }

    /// Check if the scope holds nothing
    pub fn is_empty(&self) -> bool {
        !self.is_attached(self.root) || self.children(self.root).is_empty()
    }
}
