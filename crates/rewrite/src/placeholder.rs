//! Placeholder elements left behind by the rewrite, and how to fill them.

use derive_more::Display;

use crate::consts::{self, URL_ATTRIBUTE};

/// Element kinds that can carry a placeholder.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    #[display("img")]
    Image,
    #[display("script")]
    Script,
    #[display("link")]
    Link,
}

impl Tag {
    fn matches(self, name: &str) -> bool {
        name.eq_ignore_ascii_case(&self.to_string())
    }
}

/// One placeholder element found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub tag: Tag,
    /// The element's opening tag, exactly as it appears in the document.
    pub element: String,
    /// Original reference, still percent-encoded and possibly carrying a
    /// query or fragment. See [`lookup_title`](crate::lookup_title).
    pub url: String,
}

/// Every `tag` element carrying a placeholder attribute, in document order.
pub fn placeholders(html: &str, tag: Tag) -> Vec<Placeholder> {
    consts::PLACEHOLDER
        .captures_iter(html)
        .filter(|captures| tag.matches(&captures[1]))
        .map(|captures| Placeholder {
            tag,
            element: captures[0].to_string(),
            url: captures.get(2).or_else(|| captures.get(3)).map_or_else(String::new, |m| m.as_str().to_string()),
        })
        .collect()
}

/// Attributes of an opening tag, in order. Valueless attributes map to `None`.
pub fn attributes(element: &str) -> Vec<(String, Option<String>)> {
    let end = element.len() - element.strip_suffix('>').map_or(0, |_| 1);
    let Some(name) = consts::TAG_NAME.find(element) else {
        return Vec::new();
    };
    let inner = element[name.end()..end].trim_end_matches('/');
    consts::ATTRIBUTE
        .captures_iter(inner)
        .map(|captures| {
            let value = captures.get(2).or_else(|| captures.get(3)).or_else(|| captures.get(4));
            (captures[1].to_ascii_lowercase(), value.map(|m| m.as_str().to_string()))
        })
        .collect()
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

/// A `<style>` element to stand in for a stylesheet `<link>` placeholder.
///
/// The placeholder attribute is kept so the element can still be traced back
/// to its archive entry, as are `media` and `disabled`; every other link
/// attribute is meaningless on a `<style>`.
pub fn inline_stylesheet(placeholder: &Placeholder, css: &str) -> String {
    let mut element = format!("<style {URL_ATTRIBUTE}=\"{}\"", escape_attribute(&placeholder.url));
    for (name, value) in attributes(&placeholder.element) {
        match (name.as_str(), value) {
            ("media", Some(value)) if !value.is_empty() => {
                element.push_str(&format!(" media=\"{}\"", escape_attribute(&value)));
            },
            ("disabled", _) => element.push_str(" disabled"),
            _ => {},
        }
    }
    element.push('>');
    element.push_str(css);
    element.push_str("</style>");
    element
}

/// The placeholder's opening tag with `src` pointing at `uri`.
pub fn with_source(placeholder: &Placeholder, uri: &str) -> String {
    let element = placeholder.element.as_str();
    let body = element.strip_suffix('>').unwrap_or(element);
    let (body, close) = match body.strip_suffix('/') {
        Some(body) => (body.trim_end(), " />"),
        None => (body, ">"),
    };
    format!("{body} src=\"{}\"{close}", escape_attribute(uri))
}
