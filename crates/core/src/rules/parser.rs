use super::{ContentTypeRule, FieldSource, FieldSpec, PARENT_MARKER, RuleSelector, RuleTable, UrlPattern};
use crate::{Result, SiftError};

/// Parser for the pipe-delimited rule table.
///
/// One rule per line:
///
/// ```text
/// urlPattern|label|selector|startSel|endSel|fieldName|dateFormat|...
/// ```
///
/// The selector and every field group are optional; each field group has
/// exactly four parts. Blank lines, `#` comments and lines with fewer than
/// two parts are skipped.
#[derive(Debug)]
pub struct RuleParser;

impl RuleParser {
    /// Parse a rule table from a string
    pub fn parse_string(content: &str) -> Result<RuleTable> {
        let mut rules = Vec::new();

        for (index, line) in content.lines().enumerate() {
            let line_number = index + 1;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(rule) = Self::parse_rule(line).map_err(|message| SiftError::RuleTable {
                line: line_number,
                message,
            })? {
                rules.push(rule);
            }
        }

        Ok(RuleTable::from_rules(rules))
    }

    fn parse_rule(line: &str) -> std::result::Result<Option<ContentTypeRule>, String> {
        let parts: Vec<&str> = line.split('|').map(str::trim).collect();
        if parts.len() < 2 {
            return Ok(None);
        }

        let (pattern, label) = (parts[0], parts[1]);
        if pattern.is_empty() {
            return Err("empty url pattern".to_string());
        }
        if label.is_empty() {
            return Err("empty label".to_string());
        }

        let pattern = UrlPattern::compile(pattern).map_err(|e| e.to_string())?;
        let selector = match parts.get(2) {
            Some(s) if !s.is_empty() => Some(RuleSelector::parse(s).map_err(|e| e.to_string())?),
            _ => None,
        };

        let groups = parts.get(3..).unwrap_or_default();
        if groups.len() % 4 != 0 {
            return Err(format!("field groups need four parts, found {} trailing parts", groups.len()));
        }

        let fields = groups.chunks(4).map(parse_field).collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Some(ContentTypeRule { pattern, label: label.to_string(), selector, fields }))
    }
}

fn parse_field(group: &[&str]) -> std::result::Result<FieldSpec, String> {
    let (start, end, name, date_format) = (group[0], group[1], group[2], group[3]);
    if name.is_empty() {
        return Err("empty field name".to_string());
    }

    let source = if start == PARENT_MARKER {
        FieldSource::ParentDerived
    } else if start.is_empty() {
        return Err(format!("field `{}` has no start selector", name));
    } else if end.is_empty() {
        FieldSource::Text { start: RuleSelector::parse(start).map_err(|e| e.to_string())? }
    } else {
        FieldSource::RangeConcat {
            start: RuleSelector::parse(start).map_err(|e| e.to_string())?,
            end: RuleSelector::parse(end).map_err(|e| e.to_string())?,
        }
    };

    let date_format = (!date_format.is_empty()).then(|| date_format.to_string());

    Ok(FieldSpec { name: name.to_string(), source, date_format })
}
