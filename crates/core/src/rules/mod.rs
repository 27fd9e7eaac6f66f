//! Content-type rule table.
//!
//! Rules map URL wildcards to a content-type label, optionally scope
//! sub-records with a CSS selector and name the fields extracted from each
//! record. See [`RuleParser`] for the text format.

pub mod field;
pub mod parser;
pub mod pattern;

pub use field::{FieldSource, FieldSpec, PARENT_MARKER};
pub use parser::RuleParser;
pub use pattern::UrlPattern;

use scraper::Selector;

use crate::Result;
use crate::parse::compile_selector;

/// Label of the rule appended after every configured rule
pub const FALLBACK_LABEL: &str = "page";

/// A compiled CSS selector that remembers its source text
#[derive(Debug, Clone)]
pub struct RuleSelector {
    source: String,
    selector: Selector,
}

impl RuleSelector {
    pub fn parse(source: &str) -> Result<Self> {
        Ok(Self { source: source.to_string(), selector: compile_selector(source)? })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

impl PartialEq for RuleSelector {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// One entry of the rule table
#[derive(Debug, Clone, PartialEq)]
pub struct ContentTypeRule {
    pub pattern: UrlPattern,
    pub label: String,
    /// Sub-selector; every match becomes its own record
    pub selector: Option<RuleSelector>,
    pub fields: Vec<FieldSpec>,
}

impl ContentTypeRule {
    /// The always-matching rule that closes every table
    pub fn fallback() -> Self {
        Self { pattern: UrlPattern::any(), label: FALLBACK_LABEL.to_string(), selector: None, fields: Vec::new() }
    }

    pub fn is_fallback(&self) -> bool {
        self.pattern.as_str().is_empty() && self.selector.is_none() && self.label == FALLBACK_LABEL
    }
}

/// Ordered content-type rules, always ending with the fallback rule
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTable {
    rules: Vec<ContentTypeRule>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self { rules: vec![ContentTypeRule::fallback()] }
    }
}

impl RuleTable {
    /// Parse a pipe-delimited rule table.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::RuleTable`](crate::SiftError::RuleTable) naming
    /// the first malformed line.
    pub fn parse(content: &str) -> Result<Self> {
        RuleParser::parse_string(content)
    }

    /// Build a table from configured rules, appending the fallback.
    pub fn from_rules(mut rules: Vec<ContentTypeRule>) -> Self {
        rules.push(ContentTypeRule::fallback());
        Self { rules }
    }

    /// Every rule whose pattern matches `url`, in declaration order.
    /// The fallback rule is always last.
    pub fn matching(&self, url: &str) -> Vec<&ContentTypeRule> {
        self.rules.iter().filter(|r| r.pattern.is_match(url)).collect()
    }

    /// The closing fallback rule
    pub fn fallback(&self) -> &ContentTypeRule {
        &self.rules[self.rules.len() - 1]
    }

    pub fn rules(&self) -> &[ContentTypeRule] {
        &self.rules
    }

    /// Number of rules, fallback included
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when only the fallback rule is present
    pub fn is_empty(&self) -> bool {
        self.rules.len() <= 1
    }
}
