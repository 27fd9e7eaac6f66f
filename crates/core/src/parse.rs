//! HTML parsing and selector queries.
//!
//! [`Document`] is the parsed-DOM handle a fetched page travels with: the
//! classifier queries it with the rule table's selectors, and the page
//! graph builder uses it to read headings back out of cleaned bodies.
//!
//! # Example
//!
//! ```rust
//! use sitesift_core::parse::Document;
//!
//! let doc = Document::parse("<html><head><title>Test</title></head><body><p>Hi</p></body></html>");
//! assert_eq!(doc.title(), Some("Test".to_string()));
//! assert_eq!(doc.select("p").unwrap().len(), 1);
//! ```

use scraper::{ElementRef, Html, Selector};

use crate::dom_tree::DomTree;
use crate::{Result, SiftError};

/// Compile a CSS selector, mapping failures to [`SiftError::InvalidSelector`].
pub fn compile_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| SiftError::InvalidSelector(format!("{}: {}", selector, e)))
}

/// Represents a parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses a complete HTML document.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// Parses an HTML fragment such as a stored page body.
    pub fn parse_fragment(html: &str) -> Self {
        Self { html: Html::parse_fragment(html) }
    }

    /// Gets the underlying `scraper::Html` instance.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Selects elements using a CSS selector string.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::InvalidSelector`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = compile_selector(selector)?;
        Ok(self.select_compiled(&sel))
    }

    /// Selects elements using an already compiled selector.
    pub fn select_compiled(&'_ self, selector: &Selector) -> Vec<Element<'_>> {
        self.html.select(selector).map(|el| Element { element: el }).collect()
    }

    /// The `<body>` element, if the parser produced one.
    pub fn body(&'_ self) -> Option<Element<'_>> {
        let selector = Selector::parse("body").ok()?;
        self.html.select(&selector).next().map(|el| Element { element: el })
    }

    /// The root element (`<html>`), which also wraps parsed fragments.
    pub fn root(&'_ self) -> Element<'_> {
        Element { element: self.html.root_element() }
    }

    /// Gets the title of the document.
    ///
    /// Returns the text of the `<title>` element if present.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>())
    }

    /// Gets all text content from the document.
    pub fn text_content(&self) -> String {
        self.html.root_element().text().collect()
    }
}

/// A wrapper around scraper's ElementRef.
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// The wrapped scraper element.
    pub fn element_ref(&self) -> ElementRef<'a> {
        self.element
    }

    /// Gets the inner HTML of this element.
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// Gets the outer HTML of this element.
    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Gets the text content of this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.element.value().attr(name)
    }

    /// Gets the lowercase tag name of this element.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Whether the element matches a compiled selector.
    pub fn matches(&self, selector: &Selector) -> bool {
        selector.matches(&self.element)
    }

    /// Selects descendant elements using a compiled selector.
    pub fn select_compiled(&self, selector: &Selector) -> Vec<Element<'a>> {
        self.element.select(selector).map(|el| Element { element: el }).collect()
    }

    /// Selects descendant elements using a CSS selector string.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::InvalidSelector`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = compile_selector(selector)?;
        Ok(self.select_compiled(&sel))
    }

    /// Serialized markup of every sibling after this element, stopping before
    /// `end` when it is one of those siblings.
    pub fn following_markup_until(&self, end: Option<&Element<'_>>) -> String {
        let Some(parent) = self.element.parent().filter(|p| p.value().is_element()) else {
            return String::new();
        };

        let mut tree = DomTree::scoped(self.element.tree(), parent.id());
        let stop = end.map(|e| e.element.id());
        let mut in_range = false;
        for sibling in tree.children(parent.id()) {
            if sibling == self.element.id() {
                in_range = true;
                tree.detach(sibling);
            } else if !in_range || Some(sibling) == stop {
                tree.detach(sibling);
            }
            if Some(sibling) == stop {
                in_range = false;
            }
        }
        tree.inner_html(parent.id())
    }
}
