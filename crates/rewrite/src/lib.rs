//! Document rewriting for sandboxed rendering.
//!
//! A document read out of an archive cannot be shown as-is: a sandboxed
//! surface refuses inline scripts and `on*` handlers, and same-archive
//! addresses like `../I/cat.png` would be fetched over the network and fail.
//! [`rewrite`] turns the raw document into one that is safe to inject, with
//! every archive resource left as a placeholder for the extraction stages to
//! fill in.
//!
//! The scans are text-level: a scan that finds nothing changes nothing.

mod anchors;
mod consts;
mod document;
pub mod error;
mod events;
mod placeholder;
mod reference;

use tracing::{debug, instrument};
use zimview_archive::Locator;

pub use crate::anchors::{Anchor, LinkTarget, anchor_tags, anchors, link_target, mark_external_links};
pub use crate::consts::{EVENTS_ATTRIBUTE, URL_ATTRIBUTE};
pub use crate::document::{base_path, root_classes};
pub use crate::events::{EventHandlers, event_functions, event_name};
pub use crate::placeholder::{Placeholder, Tag, attributes, inline_stylesheet, placeholders, with_source};
pub use crate::reference::{lookup_title, remove_parameters};

/// A rewritten document plus what was lifted out of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rewritten {
    /// Annotated document, ready to inject.
    pub document: String,
    /// Bodies of the removed inline scripts, in source order.
    pub inline_scripts: Vec<String>,
    /// Generated script defining one function per inline event handler.
    pub event_sheet: String,
}

/// Rewrite `raw`, the document stored at `locator`.
///
/// The steps run in a fixed order:
///
/// 1. strip the byte-order mark and anything before the first tag,
/// 2. lift inline `<script>` bodies out of the document,
/// 3. lift inline event handlers into the event sheet,
/// 4. turn same-archive `img`/`script`/`link` references into placeholders,
/// 5. send external links to a new window,
/// 6. inject a `<base>` for the document's own directory,
/// 7. open sections that would otherwise stay collapsed without scripts.
///
/// ```
/// use zimview_archive::Locator;
/// use zimview_rewrite::rewrite;
///
/// let raw = r#"<html><head></head><body><img src="../I/cat.png"></body></html>"#;
/// let rewritten = rewrite(raw, &Locator::new('A', "dir/page.html"));
/// assert!(rewritten.document.contains(r#"<base href="A/dir/">"#));
/// assert!(rewritten.document.contains(r#"<img data-kiwixurl="I/cat.png">"#));
/// ```
#[instrument(skip(raw), fields(html_size = raw.len(), locator = %locator))]
pub fn rewrite(raw: &str, locator: &Locator) -> Rewritten {
    let html = document::strip_preamble(raw);
    let (html, inline_scripts) = document::extract_inline_scripts(html);
    let (html, event_sheet) = events::replace_inline_events(&html);
    let html = document::rewrite_references(&html);
    let html = anchors::mark_external_links(&html);
    let html = document::inject_base(&html, &document::base_path(locator));
    let document = document::open_collapsed_sections(&html);
    debug!(inline_scripts = inline_scripts.len(), events = !event_sheet.is_empty(), "document rewritten");
    Rewritten { document, inline_scripts, event_sheet }
}
