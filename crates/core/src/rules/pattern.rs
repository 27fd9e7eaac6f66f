use regex::Regex;

use crate::{Result, SiftError};

/// A URL wildcard compiled to an anchored regular expression.
///
/// `*` matches any run of characters, every other character is literal and
/// a single trailing slash on the URL is optional. The empty pattern
/// matches every URL.
#[derive(Debug, Clone)]
pub struct UrlPattern {
    source: String,
    regex: Option<Regex>,
}

impl UrlPattern {
    /// Compile a wildcard pattern.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::InvalidPattern`] if the resulting expression is
    /// rejected by the regex engine (for example when it exceeds the size
    /// limit).
    pub fn compile(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Ok(Self::any());
        }

        let escaped: Vec<String> = pattern.split('*').map(regex::escape).collect();
        let expression = format!("^{}/?$", escaped.join(".*"));
        let regex = Regex::new(&expression)
            .map_err(|source| SiftError::InvalidPattern { pattern: pattern.to_string(), source })?;

        Ok(Self { source: pattern.to_string(), regex: Some(regex) })
    }

    /// The pattern that matches everything
    pub fn any() -> Self {
        Self { source: String::new(), regex: None }
    }

    pub fn is_match(&self, url: &str) -> bool {
        self.regex.as_ref().is_none_or(|r| r.is_match(url))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for UrlPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}
