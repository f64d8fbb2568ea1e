//! The display surface a document is rendered into.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use zimview_rewrite::LinkTarget;

use crate::error::Result;

/// An inline handler to attach to an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBinding {
    /// Ordinal of the element among those carrying handlers.
    pub element: usize,
    /// DOM event name, without the `on` prefix.
    pub event: String,
    /// Function defined by the event sheet.
    pub function: String,
}

/// What clicking an `<a>` element does instead of following its `href`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBinding {
    /// Ordinal of the element among all `<a>` elements.
    pub element: usize,
    pub target: LinkTarget,
}

pub type SurfaceHandle = Arc<dyn RenderSurface + Send + Sync>;

/// A sandboxed document context.
///
/// Anything that can hold a document, swap elements in it, and be shown or
/// hidden can serve as a surface. Element operations work on the exact
/// opening-tag text produced by the rewrite. An operation on an element that
/// is no longer there (because another document has replaced the content)
/// reports `false` and changes nothing.
#[async_trait]
pub trait RenderSurface: Send + Sync {
    fn name(&self) -> &str;

    /// Drop the current content and everything bound to it, and hide the
    /// surface.
    async fn teardown(&self);

    /// Load the blank placeholder document, resolving once the surface
    /// signals it is ready.
    async fn load_blank(&self) -> Result<()>;

    /// Replace the content of the root element.
    async fn replace_root(&self, html: &str);

    /// Add classes to `<body>`.
    async fn add_body_classes(&self, classes: &str);

    /// Record a navigation so back/forward work.
    async fn push_history(&self, title: &str);

    /// Current serialised content.
    async fn content(&self) -> String;

    /// Swap the first occurrence of `original` for `replacement`.
    async fn replace_element(&self, original: &str, replacement: &str) -> bool;

    /// Append markup to `<head>`.
    async fn append_to_head(&self, html: &str);

    /// Attach a handler function to an element.
    async fn bind_event(&self, binding: &EventBinding) -> bool;

    /// Take over clicks on a link. The host is told about
    /// [`LinkTarget::Article`] targets and navigates itself.
    async fn bind_link(&self, binding: &LinkBinding) -> bool;

    /// Show or hide the progress indicator.
    async fn set_progress(&self, visible: bool);

    /// Make the surface visible.
    async fn reveal(&self);
}

/// Everything a [`HeadlessSurface`] has been told to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub content: String,
    pub visible: bool,
    pub progress: bool,
    /// Number of [`reveal`](RenderSurface::reveal) calls since creation.
    pub reveals: u32,
    pub history: Vec<String>,
    pub bindings: Vec<EventBinding>,
    pub links: Vec<LinkBinding>,
}

/// In-memory surface.
///
/// Used by the command line to render without a display, and by tests to
/// observe exactly what the pipeline did.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    state: RwLock<Snapshot>,
}

const BLANK: &str = "<html><head></head><body></body></html>";

/// Position of `needle` in `haystack`, ignoring ASCII case.
fn find_ignore_case(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    haystack.get(from..)?.to_ascii_lowercase().find(needle).map(|i| i + from)
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.clone()
    }

    /// Inner markup of the `<html>` element, or the whole input if there is
    /// none.
    fn root_inner(html: &str) -> &str {
        let Some(open) = find_ignore_case(html, "<html", 0) else {
            return html;
        };
        let Some(start) = html[open..].find('>').map(|i| open + i + 1) else {
            return html;
        };
        let end = html.to_ascii_lowercase().rfind("</html").filter(|end| *end >= start).unwrap_or(html.len());
        &html[start..end]
    }
}

#[async_trait]
impl RenderSurface for HeadlessSurface {
    fn name(&self) -> &str {
        "headless"
    }

    async fn teardown(&self) {
        let mut state = self.state.write().await;
        state.content.clear();
        state.bindings.clear();
        state.links.clear();
        state.visible = false;
    }

    async fn load_blank(&self) -> Result<()> {
        self.state.write().await.content = BLANK.to_string();
        trace!("blank document ready");
        Ok(())
    }

    async fn replace_root(&self, html: &str) {
        self.state.write().await.content = format!("<html>{}</html>", Self::root_inner(html));
    }

    async fn add_body_classes(&self, classes: &str) {
        let mut state = self.state.write().await;
        let Some(open) = find_ignore_case(&state.content, "<body", 0) else {
            return;
        };
        let Some(close) = state.content[open..].find('>').map(|i| open + i) else {
            return;
        };
        let tag = &state.content[open..close];
        let updated = match find_ignore_case(tag, "class=\"", 0) {
            Some(class) => {
                let at = open + class + "class=\"".len();
                let mut content = state.content.clone();
                content.insert_str(at, &format!("{classes} "));
                content
            },
            None => {
                let at = close - usize::from(tag.ends_with('/'));
                let mut content = state.content.clone();
                content.insert_str(at, &format!(" class=\"{classes}\""));
                content
            },
        };
        state.content = updated;
    }

    async fn push_history(&self, title: &str) {
        self.state.write().await.history.push(title.to_string());
    }

    async fn content(&self) -> String {
        self.state.read().await.content.clone()
    }

    async fn replace_element(&self, original: &str, replacement: &str) -> bool {
        let mut state = self.state.write().await;
        if !state.content.contains(original) {
            return false;
        }
        // First textual match wins. Two identical placeholders resolve to the
        // same resource anyway, so it doesn't matter which one goes first.
        state.content = state.content.replacen(original, replacement, 1);
        true
    }

    async fn append_to_head(&self, html: &str) {
        let mut state = self.state.write().await;
        match find_ignore_case(&state.content, "</head", 0) {
            Some(at) => state.content.insert_str(at, html),
            None => state.content.push_str(html),
        }
    }

    async fn bind_event(&self, binding: &EventBinding) -> bool {
        let mut state = self.state.write().await;
        let present = zimview_rewrite::event_functions(&state.content)
            .get(binding.element)
            .is_some_and(|handlers| handlers.functions.contains(&binding.function));
        if present {
            debug!(function = %binding.function, event = %binding.event, "event bound");
            state.bindings.push(binding.clone());
        }
        present
    }

    async fn bind_link(&self, binding: &LinkBinding) -> bool {
        let mut state = self.state.write().await;
        let present = zimview_rewrite::anchor_tags(&state.content).nth(binding.element).is_some();
        if present {
            trace!(element = binding.element, link = %binding.target, "link bound");
            state.links.push(binding.clone());
        }
        present
    }

    async fn set_progress(&self, visible: bool) {
        self.state.write().await.progress = visible;
    }

    async fn reveal(&self) {
        let mut state = self.state.write().await;
        state.visible = true;
        state.reveals += 1;
    }
}
