//! Named field extraction for content-type rules.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use super::RuleSelector;
use crate::alias::humanize;
use crate::parse::Element;

/// Start selector that derives a field from the page alias instead of the DOM
pub const PARENT_MARKER: &str = "[parent]";

/// Where a field's value comes from
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSource {
    /// Trimmed text of the first node matching `start`
    Text { start: RuleSelector },
    /// Markup of every sibling strictly between the `start` and `end` nodes
    RangeConcat { start: RuleSelector, end: RuleSelector },
    /// Title-cased second-to-last segment of the page alias
    ParentDerived,
}

/// A named field extracted from every record a rule produces
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub source: FieldSource,
    /// chrono format string the raw text is parsed with
    pub date_format: Option<String>,
}

impl FieldSpec {
    /// Extract the field from `scope`. Failures yield an empty string.
    pub fn extract(&self, scope: &Element<'_>, alias: &str) -> String {
        match &self.source {
            FieldSource::ParentDerived => parent_label(alias),
            FieldSource::Text { start } => {
                let Some(node) = first_match(scope, start) else {
                    debug!(field = %self.name, selector = start.as_str(), "field start not found");
                    return String::new();
                };
                match &self.date_format {
                    Some(format) => reformat_date(&node.text(), format),
                    None => node.text().trim().to_string(),
                }
            }
            FieldSource::RangeConcat { start, end } => {
                let (Some(start_node), Some(end_node)) = (first_match(scope, start), first_match(scope, end)) else {
                    debug!(field = %self.name, "field range not found");
                    return String::new();
                };
                match &self.date_format {
                    Some(format) if self.name.contains("end") => reformat_date(&end_node.text(), format),
                    Some(format) => reformat_date(&start_node.text(), format),
                    None => start_node.following_markup_until(Some(&end_node)),
                }
            }
        }
    }
}

fn first_match<'a>(scope: &Element<'a>, selector: &RuleSelector) -> Option<Element<'a>> {
    if scope.matches(selector.selector()) {
        return Some(scope.clone());
    }
    scope.select_compiled(selector.selector()).into_iter().next()
}

/// The humanized second-to-last segment of an alias
pub fn parent_label(alias: &str) -> String {
    let segments: Vec<&str> = alias.trim_end_matches('/').split('/').collect();
    if segments.len() < 2 {
        return String::new();
    }
    humanize(segments[segments.len() - 2])
}

/// Parse `raw` with `format` and render it as an ISO 8601 date or date-time
pub fn reformat_date(raw: &str, format: &str) -> String {
    let raw = raw.trim();
    if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
        return datetime.format("%Y-%m-%dT%H:%M:%S").to_string();
    }
    match NaiveDate::parse_from_str(raw, format) {
        Ok(date) => date.format("%Y-%m-%d").to_string(),
        Err(e) => {
            debug!(raw, format, error = %e, "date did not match format");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Document;

    fn spec(name: &str, source: FieldSource, date_format: Option<&str>) -> FieldSpec {
        FieldSpec { name: name.to_string(), source, date_format: date_format.map(str::to_string) }
    }

    fn selector(s: &str) -> RuleSelector {
        RuleSelector::parse(s).unwrap()
    }

    const EVENT: &str = r#"
        <div class="event">
            <h2>  Launch party </h2>
            <span class="start">12/03/2021</span>
            <span class="finish">14/03/2021 18:30</span>
            <h3>Details</h3>
            <p>Bring snacks.</p>
            <p>Bring friends.</p>
            <hr>
        </div>
    "#;

    #[test]
    fn test_text_field_is_trimmed() {
        let doc = Document::parse_fragment(EVENT);
        let field = spec("name", FieldSource::Text { start: selector("h2") }, None);
        assert_eq!(field.extract(&doc.root(), "/events/launch"), "Launch party");
    }

    #[test]
    fn test_range_concat_is_exclusive() {
        let doc = Document::parse_fragment(EVENT);
        let field = spec("details", FieldSource::RangeConcat { start: selector("h3"), end: selector("hr") }, None);
        let value = field.extract(&doc.root(), "/events/launch");
        assert!(value.contains("<p>Bring snacks.</p>"));
        assert!(value.contains("<p>Bring friends.</p>"));
        assert!(!value.contains("Details"));
        assert!(!value.contains("<hr>"));
    }

    #[test]
    fn test_parent_derived() {
        let doc = Document::parse_fragment(EVENT);
        let field = spec("category", FieldSource::ParentDerived, None);
        assert_eq!(field.extract(&doc.root(), "/community_events/launch"), "Community Events");
        assert_eq!(field.extract(&doc.root(), "/launch"), "");
    }

    #[test]
    fn test_date_field_reformatted() {
        let doc = Document::parse_fragment(EVENT);
        let field = spec("date", FieldSource::Text { start: selector(".start") }, Some("%d/%m/%Y"));
        assert_eq!(field.extract(&doc.root(), "/"), "2021-03-12");
    }

    #[test]
    fn test_end_date_reads_end_node() {
        let doc = Document::parse_fragment(EVENT);
        let field = spec(
            "end_date",
            FieldSource::RangeConcat { start: selector(".start"), end: selector(".finish") },
            Some("%d/%m/%Y %H:%M"),
        );
        assert_eq!(field.extract(&doc.root(), "/"), "2021-03-14T18:30:00");
    }

    #[test]
    fn test_bad_date_is_empty() {
        let doc = Document::parse_fragment(EVENT);
        let field = spec("date", FieldSource::Text { start: selector("h2") }, Some("%d/%m/%Y"));
        assert_eq!(field.extract(&doc.root(), "/"), "");
    }

    #[test]
    fn test_missing_start_is_empty() {
        let doc = Document::parse_fragment(EVENT);
        let field = spec("missing", FieldSource::Text { start: selector(".nope") }, None);
        assert_eq!(field.extract(&doc.root(), "/"), "");
    }
}
