//! Readability scoring by text-to-tag ratio.
//!
//! A fragment is cut into lines of roughly `max_line_length` characters
//! (never inside a tag), each line is scored as non-tag characters per tag,
//! scores are smoothed over neighbouring lines, and low-scoring lines lose
//! every tag outside a whitelist of content tags. The filtered markup is
//! reparsed to balance it and scored again; that second score, clamped to
//! 0..=100, is the page's readability score.

use scraper::Html;

/// Tags a low-scoring line keeps
const CONTENT_TAGS: &[&str] = &[
    // sectioning
    "article", "section", "h1", "h2", "h3", "h4", "h5", "h6", "main", "address", "hgroup",
    // block text
    "p", "li", "ol", "ul", "dl", "dt", "dd", "blockquote", "figure", "figcaption", "pre", "hr",
    // inline semantics
    "a", "abbr", "b", "strong", "em", "i", "cite", "code", "mark", "time", "sub", "sup", "q", "s", "var", "data",
    "kbd", "bdi", "bdo",
    // media
    "img", "video", "audio", "picture", "source", "track", "map",
    // tables
    "table", "caption", "col", "colgroup", "tbody", "thead", "tfoot", "tr", "td", "th",
];

/// Configuration for readability scoring
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Minimum line length before a break is taken at the next whitespace
    pub max_line_length: usize,
    /// Number of neighbours on each side averaged into a line's score
    pub smoothing_radius: usize,
    /// Lines whose smoothed score is below this lose their non-content tags
    pub cutoff: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self { max_line_length: 180, smoothing_radius: 5, cutoff: 15.0 }
    }
}

/// A scored slice of the fragment
#[derive(Debug, Clone, PartialEq)]
pub struct LineSegment {
    pub text: String,
    /// Characters outside tags
    pub char_count: usize,
    /// Tags opened in this line
    pub tag_count: usize,
    pub score: f64,
    pub smoothed_score: f64,
}

impl LineSegment {
    fn new(text: String, char_count: usize, tag_count: usize) -> Self {
        let score = if tag_count == 0 { char_count as f64 } else { char_count as f64 / tag_count as f64 };
        Self { text, char_count, tag_count, score, smoothed_score: score }
    }
}

/// Result of scoring a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreResult {
    /// Readability score, 0 to 100
    pub score: u32,
    /// The filtered, balanced markup
    pub content: String,
}

/// Score a fragment with the default configuration
pub fn score(html: &str) -> ScoreResult {
    score_content(html, &ScoreConfig::default())
}

/// Score and filter an HTML fragment
pub fn score_content(html: &str, config: &ScoreConfig) -> ScoreResult {
    if html.trim().is_empty() {
        return ScoreResult { score: 0, content: String::new() };
    }

    let mut lines = split_and_score_lines(html, config.max_line_length);
    smooth_scores(&mut lines, config.smoothing_radius);
    let content = filter_content(&lines, config.cutoff);

    let rescored = split_and_score_lines(&content, config.max_line_length);
    let score = mean_score(&rescored);

    ScoreResult { score, content }
}

/// Cut content into lines, breaking at the first whitespace outside a tag
/// once a line holds at least `max_len` characters.
pub fn split_and_score_lines(content: &str, max_len: usize) -> Vec<LineSegment> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut len = 0;
    let mut chars = 0;
    let mut tags = 0;
    let mut in_tag = false;

    for c in content.chars() {
        line.push(c);
        len += 1;

        if !in_tag && c == '<' {
            in_tag = true;
            tags += 1;
        }

        if !in_tag {
            chars += 1;
        }

        if in_tag && c == '>' {
            in_tag = false;
        }

        if len >= max_len && !in_tag && c.is_whitespace() {
            lines.push(LineSegment::new(std::mem::take(&mut line), chars, tags));
            len = 0;
            chars = 0;
            tags = 0;
        }
    }

    if !line.is_empty() {
        lines.push(LineSegment::new(line, chars, tags));
    }

    lines
}

/// Moving average of line scores over `radius` neighbours on each side
pub fn smooth_scores(lines: &mut [LineSegment], radius: usize) {
    let scores: Vec<f64> = lines.iter().map(|l| l.score).collect();
    for (index, line) in lines.iter_mut().enumerate() {
        let start = index.saturating_sub(radius);
        let end = (index + radius).min(scores.len() - 1);
        let window = &scores[start..=end];
        line.smoothed_score = window.iter().sum::<f64>() / window.len() as f64;
    }
}

/// Strip non-content tags from low-scoring lines, then rebalance the markup
pub fn filter_content(lines: &[LineSegment], cutoff: f64) -> String {
    let mut joined = String::new();
    let mut last_whitespace = false;

    for line in lines {
        if line.smoothed_score < cutoff {
            joined.push_str(&strip_line(&line.text, &mut last_whitespace));
        } else {
            joined.push_str(&line.text);
        }
    }

    Html::parse_fragment(&joined).root_element().inner_html()
}

fn strip_line(line: &str, last_whitespace: &mut bool) -> String {
    let mut out = String::new();
    let mut tag = String::new();
    let mut in_tag = false;

    for c in line.chars() {
        if !in_tag && c == '<' {
            in_tag = true;
        }

        if in_tag {
            tag.push(c);
            if c == '>' {
                in_tag = false;
                if is_content_tag(&tag) {
                    out.push_str(&tag);
                }
                tag.clear();
            }
            continue;
        }

        let is_whitespace = c.is_whitespace();
        if !is_whitespace || !*last_whitespace {
            out.push(if is_whitespace { ' ' } else { c });
        }
        *last_whitespace = is_whitespace;
    }

    out
}

fn is_content_tag(tag: &str) -> bool {
    let name: String = tag
        .trim_start_matches('<')
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    CONTENT_TAGS.contains(&name.as_str())
}

fn mean_score(lines: &[LineSegment]) -> u32 {
    if lines.is_empty() {
        return 0;
    }
    let mean = lines.iter().map(|l| l.score).sum::<f64>() / lines.len() as f64;
    mean.min(100.0).floor() as u32
}
