//! Streaming markup rewrites run by the cleaner and the page graph builder.

use url::Url;

const LINK_ATTRIBUTES: &[&str] = &["href", "src", "action"];

/// Remove every `<h1>` element, content included
pub fn strip_headings(html: &str) -> String {
    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!("h1", |el| {
                el.remove();
                Ok(())
            })],
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() {
        return html.to_string();
    }
    if rewriter.end().is_err() {
        return html.to_string();
    }

    output
}

/// Strip bogus extensions from `href`, `src` and `action` attribute values
pub fn strip_link_extensions(html: &str, extensions: &[String]) -> String {
    if extensions.is_empty() {
        return html.to_string();
    }

    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!("[href], [src], [action]", |el| {
                for name in LINK_ATTRIBUTES {
                    if let Some(value) = el.get_attribute(name) {
                        let stripped = strip_extension(&value, extensions);
                        if stripped != value {
                            el.set_attribute(name, &stripped)?;
                        }
                    }
                }
                Ok(())
            })],
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() {
        return html.to_string();
    }
    if rewriter.end().is_err() {
        return html.to_string();
    }

    output
}

/// Drop attributes outside `allowed` and make same-origin links relative.
///
/// A relativized link keeps its absolute form in a `data-absolute-<name>`
/// attribute. Either rule is skipped when its argument is `None`.
pub fn rewrite_attributes(html: &str, allowed: Option<&[String]>, origin: Option<&Url>) -> String {
    if allowed.is_none() && origin.is_none() {
        return html.to_string();
    }

    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!("*", |el| {
                if let Some(allowed) = allowed {
                    let names: Vec<String> = el.attributes().iter().map(|a| a.name()).collect();
                    for name in names.iter().filter(|name| !allowed.contains(name)) {
                        el.remove_attribute(name);
                    }
                }

                if let Some(origin) = origin {
                    for name in LINK_ATTRIBUTES {
                        let Some(value) = el.get_attribute(name) else {
                            continue;
                        };
                        if let Some(relative) = relative_link(&value, origin) {
                            el.set_attribute(name, &relative)?;
                            el.set_attribute(&format!("data-absolute-{}", name), &value)?;
                        }
                    }
                }
                Ok(())
            })],
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() {
        return html.to_string();
    }
    if rewriter.end().is_err() {
        return html.to_string();
    }

    output
}

/// Path, query and fragment of `link` when it shares `origin`
fn relative_link(link: &str, origin: &Url) -> Option<String> {
    let absolute = Url::parse(link.trim()).ok()?;
    if absolute.origin() != origin.origin() {
        return None;
    }

    let mut relative = absolute.path().to_string();
    if let Some(query) = absolute.query() {
        relative.push('?');
        relative.push_str(query);
    }
    if let Some(fragment) = absolute.fragment() {
        relative.push('#');
        relative.push_str(fragment);
    }
    Some(relative)
}

/// Strip the first matching extension from the path part of a link,
/// keeping any query string or fragment.
pub fn strip_extension(link: &str, extensions: &[String]) -> String {
    let split = link.find(['?', '#']).unwrap_or(link.len());
    let (path, tail) = link.split_at(split);
    for extension in extensions {
        if let Some(stripped) = path.strip_suffix(extension.as_str()) {
            return format!("{}{}", stripped, tail);
        }
    }
    link.to_string()
}
