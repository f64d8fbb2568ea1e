//! Inline event handlers.
//!
//! Sandboxed surfaces refuse to run `on*="…"` attributes, so every handler is
//! lifted into a named function inside a generated script (the event sheet)
//! and the element is tagged with the names it has to be bound to.

use regex::Captures;
use tracing::instrument;

use crate::consts::{self, EVENTS_ATTRIBUTE};

/// Handlers to bind on one element, recovered from its events attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventHandlers {
    /// Position among the elements carrying handlers.
    pub ordinal: usize,
    /// The element's opening tag as it appears in the document.
    pub element: String,
    /// Synthesised function names, in attribute order.
    pub functions: Vec<String>,
}

/// Lift every inline handler into the event sheet.
///
/// Function names are `<event>_<element ordinal>_<offset>`, where the offset
/// is the byte position of the handler within the element's attribute text.
/// Returns the rewritten document and the sheet, one
/// `function <name>(){ <body> }` per line.
#[instrument(level = "trace", skip_all)]
pub fn replace_inline_events(html: &str) -> (String, String) {
    let mut ordinal = 0usize;
    let mut sheet = String::new();
    let document = consts::ELEMENT_TAG.replace_all(html, |captures: &Captures| {
        let tag = &captures[0];
        let Some(name) = consts::TAG_NAME.find(tag) else {
            return tag.to_string();
        };
        let (prefix, attributes) = tag.split_at(name.end());
        let mut names = String::new();
        for handler in consts::EVENT_HANDLER.captures_iter(attributes) {
            let offset = handler.get(0).map_or(0, |m| m.start());
            let body = handler.get(2).or_else(|| handler.get(3)).map_or("", |m| m.as_str()).trim();
            let function = format!("{}_{ordinal}_{offset}", &handler[1]);
            sheet.push_str(&format!("function {function}(){{ {body} }}\n"));
            names.push_str(&function);
            names.push(';');
        }
        if names.is_empty() {
            return tag.to_string();
        }
        ordinal += 1;
        let stripped = consts::EVENT_HANDLER.replace_all(attributes, "");
        let inner = stripped.strip_suffix('>').unwrap_or(&stripped);
        let (inner, close) = match inner.strip_suffix('/') {
            Some(inner) => (inner.trim_end(), " />"),
            None => (inner.trim_end(), ">"),
        };
        format!("{prefix}{inner} {EVENTS_ATTRIBUTE}=\"{names}\"{close}")
    });
    (document.into_owned(), sheet)
}

/// Every element tagged by [`replace_inline_events`], in document order.
pub fn event_functions(html: &str) -> Vec<EventHandlers> {
    consts::ELEMENT_TAG
        .find_iter(html)
        .filter_map(|tag| {
            let captures = consts::EVENTS_LIST.captures(tag.as_str())?;
            let list = captures.get(1).or_else(|| captures.get(2))?.as_str();
            Some((tag.as_str(), list))
        })
        .enumerate()
        .map(|(ordinal, (element, list))| EventHandlers {
            ordinal,
            element: element.to_string(),
            functions: list.split(';').filter(|f| !f.is_empty()).map(str::to_string).collect(),
        })
        .collect()
}

/// DOM event a synthesised function handles: `click` for `onclick_0_0`.
pub fn event_name(function: &str) -> Option<&str> {
    let rest = function.strip_prefix("on")?;
    let end = rest.find('_')?;
    (end > 0).then(|| &rest[..end])
}
