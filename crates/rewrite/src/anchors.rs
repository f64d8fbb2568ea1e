//! Article links.
//!
//! With a `<base>` pointing into the archive, a surface would resolve every
//! relative link against it and try to fetch the result. Links elsewhere on
//! the web open outside the surface instead; links on the page and into the
//! archive have to be handled by the host.

use derive_more::Display;
use regex::Captures;

use crate::consts;
use crate::placeholder::attributes;
use crate::reference::lookup_title;

/// Where following a link should take the reader.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// An empty `href`. Following it does nothing.
    #[display("current page")]
    CurrentPage,
    /// `#fragment` on the current page.
    #[display("#{_0}")]
    Fragment(String),
    /// Anywhere outside the archive.
    #[display("{_0}")]
    External(String),
    /// Another entry of the archive, by title.
    #[display("{_0}")]
    Article(String),
}

/// One `<a href>` element of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Position among all `<a>` elements, with or without `href`.
    pub ordinal: usize,
    /// The element's opening tag as it appears in the document.
    pub element: String,
    pub target: LinkTarget,
}

/// Opening tags of every `<a>` element, in document order.
pub fn anchor_tags(html: &str) -> impl Iterator<Item = &str> {
    consts::ANCHOR_TAG.find_iter(html).map(|m| m.as_str())
}

fn href(element: &str) -> Option<String> {
    attributes(element).into_iter().find(|(name, _)| name == "href").map(|(_, value)| value.unwrap_or_default())
}

fn is_external(href: &str) -> bool {
    href.starts_with("//") || consts::URL_SCHEME.is_match(href)
}

/// Join `href` onto the document directory `base` (`A/dir/`), folding away
/// `.` and `..` segments.
fn join(base: &str, href: &str) -> String {
    let mut segments: Vec<&str> = match href.starts_with('/') {
        true => Vec::new(),
        false => base.split('/').filter(|s| !s.is_empty()).collect(),
    };
    for segment in href.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                segments.pop();
            },
            segment => segments.push(segment),
        }
    }
    segments.join("/")
}

/// What following `href` from a document in directory `base` leads to.
///
/// `None` for in-archive links that do not end up at a namespaced entry, or
/// whose escapes are broken.
///
/// ```
/// use zimview_rewrite::{LinkTarget, link_target};
///
/// assert_eq!(link_target("../A/Caf%C3%A9.html#x", "A/dir/"), Some(LinkTarget::Article("A/Café.html".into())));
/// assert_eq!(link_target("#history", "A/"), Some(LinkTarget::Fragment("history".into())));
/// ```
pub fn link_target(href: &str, base: &str) -> Option<LinkTarget> {
    let href = href.trim();
    if href.is_empty() {
        return Some(LinkTarget::CurrentPage);
    }
    if let Some(fragment) = href.strip_prefix('#') {
        return Some(LinkTarget::Fragment(fragment.to_string()));
    }
    if is_external(href) {
        return Some(LinkTarget::External(href.to_string()));
    }
    let joined = join(base, href);
    let entry = consts::NAMESPACED_ENTRY.captures(&joined)?.get(1)?.as_str();
    lookup_title(entry).ok().map(LinkTarget::Article)
}

/// Every `<a>` element carrying an `href`, with where it leads.
pub fn anchors(html: &str, base: &str) -> Vec<Anchor> {
    anchor_tags(html)
        .enumerate()
        .filter_map(|(ordinal, element)| {
            let target = link_target(&href(element)?, base)?;
            Some(Anchor { ordinal, element: element.to_string(), target })
        })
        .collect()
}

/// Make external links open outside the surface. Links that already pick a
/// target keep it.
pub fn mark_external_links(html: &str) -> String {
    consts::ANCHOR_TAG
        .replace_all(html, |captures: &Captures| {
            let element = &captures[0];
            let attributes = attributes(element);
            let external = attributes.iter().any(|(name, value)| name == "href" && value.as_deref().is_some_and(is_external));
            if !external || attributes.iter().any(|(name, _)| name == "target") {
                return element.to_string();
            }
            let body = element.strip_suffix('>').unwrap_or(element);
            match body.strip_suffix('/') {
                Some(body) => format!("{} target=\"_blank\" />", body.trim_end()),
                None => format!("{body} target=\"_blank\">"),
            }
        })
        .into_owned()
}
