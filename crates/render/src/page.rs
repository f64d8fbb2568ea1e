//! Per-render state.

use derive_more::Display;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use zimview_asyncutils::Gate;
use zimview_rewrite::{Placeholder, Rewritten, Tag, placeholders};

/// Where a render currently is.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    #[display("idle")]
    Idle,
    #[display("css")]
    Css,
    #[display("scripts")]
    Scripts,
    #[display("inline scripts")]
    InlineScripts,
    #[display("event bindings")]
    EventBindings,
    #[display("complete")]
    Complete,
}

/// One entry of the stage queue.
///
/// A stage may only start once the gate of the stage before it has settled,
/// since it relies on the document structure that stage produced.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    #[display("css")]
    Css,
    #[display("scripts")]
    Scripts,
    #[display("inline scripts")]
    InlineScripts,
    #[display("event bindings")]
    EventBindings,
}

impl Stage {
    pub const ORDER: [Stage; 4] = [Stage::Css, Stage::Scripts, Stage::InlineScripts, Stage::EventBindings];

    pub fn phase(self) -> Phase {
        match self {
            Self::Css => Phase::Css,
            Self::Scripts => Phase::Scripts,
            Self::InlineScripts => Phase::InlineScripts,
            Self::EventBindings => Phase::EventBindings,
        }
    }
}

/// Counters, placeholders and stage queue of one render.
///
/// Every expected count is registered by [`discover`](Self::discover), before
/// any resolution starts, so a gate can never look settled while its stage
/// still has work to schedule. A superseded page is simply dropped once its
/// last task finishes.
#[derive(Debug)]
pub struct PageState {
    generation: u64,
    pub css: Arc<Gate>,
    pub images: Arc<Gate>,
    pub scripts: Arc<Gate>,
    stylesheets: Vec<Placeholder>,
    image_placeholders: Vec<Placeholder>,
    script_placeholders: Vec<Placeholder>,
    inline_scripts: Vec<String>,
    event_sheet: String,
    phase: Mutex<Phase>,
    queue: Mutex<VecDeque<Stage>>,
}

fn count(placeholders: &[Placeholder]) -> u32 {
    u32::try_from(placeholders.len()).unwrap_or(u32::MAX)
}

impl PageState {
    /// Scan a rewritten document and register what has to be resolved.
    pub fn discover(rewritten: &Rewritten) -> Self {
        let stylesheets = placeholders(&rewritten.document, Tag::Link);
        let image_placeholders = placeholders(&rewritten.document, Tag::Image);
        let script_placeholders = placeholders(&rewritten.document, Tag::Script);
        let css = Arc::new(Gate::new("css"));
        let images = Arc::new(Gate::new("images"));
        let scripts = Arc::new(Gate::new("scripts"));
        css.expect(count(&stylesheets));
        images.expect(count(&image_placeholders));
        scripts.expect(count(&script_placeholders));
        Self {
            generation: 0,
            css,
            images,
            scripts,
            stylesheets,
            image_placeholders,
            script_placeholders,
            inline_scripts: rewritten.inline_scripts.clone(),
            event_sheet: rewritten.event_sheet.clone(),
            phase: Mutex::new(Phase::Idle),
            queue: Mutex::new(VecDeque::from(Stage::ORDER)),
        }
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    /// Take the next stage off the queue.
    pub(crate) fn next_stage(&self) -> Option<Stage> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front()
    }

    /// Gate that has to settle before `stage` may start.
    pub fn prerequisite(&self, stage: Stage) -> Option<&Arc<Gate>> {
        match stage {
            Stage::Css => None,
            Stage::Scripts => Some(&self.css),
            Stage::InlineScripts | Stage::EventBindings => Some(&self.scripts),
        }
    }

    pub fn stylesheets(&self) -> &[Placeholder] {
        &self.stylesheets
    }

    pub fn images(&self) -> &[Placeholder] {
        &self.image_placeholders
    }

    pub fn scripts(&self) -> &[Placeholder] {
        &self.script_placeholders
    }

    pub fn inline_scripts(&self) -> &[String] {
        &self.inline_scripts
    }

    pub fn event_sheet(&self) -> &str {
        &self.event_sheet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zimview_archive::Locator;
    use zimview_rewrite::rewrite;

    #[test]
    fn test_discover_registers_counts() {
        let raw = r#"<html><head><link rel="stylesheet" href="../-/a.css"><link href="../-/b.css">
            <script src="../-/j.js"></script><script>inline()</script></head>
            <body><img src="../I/1.png"><img src="../I/2.png"><img src="../I/3.png" onclick="x()"></body></html>"#;
        let page = PageState::discover(&rewrite(raw, &Locator::new('A', "page.html")));
        assert_eq!(page.css.counts(), (2, 0));
        assert_eq!(page.images.counts(), (3, 0));
        assert_eq!(page.scripts.counts(), (1, 0));
        assert_eq!(page.inline_scripts(), ["inline()".to_string()]);
        assert!(page.event_sheet().contains("onclick_0_"));
        assert_eq!(page.phase(), Phase::Idle);
        assert!(!page.css.is_settled());
    }

    #[test]
    fn test_empty_document_is_settled() {
        let page = PageState::discover(&Rewritten::default());
        assert!(page.css.is_settled());
        assert!(page.images.is_settled());
        assert!(page.scripts.is_settled());
    }

    #[test]
    fn test_stage_queue_is_fifo() {
        let page = PageState::discover(&Rewritten::default()).with_generation(7);
        assert_eq!(page.generation(), 7);
        let stages: Vec<_> = std::iter::from_fn(|| page.next_stage()).collect();
        assert_eq!(stages, Stage::ORDER);
        assert!(page.prerequisite(Stage::Css).is_none());
        assert_eq!(page.prerequisite(Stage::Scripts).map(|g| g.name()), Some("css"));
        assert_eq!(page.prerequisite(Stage::EventBindings).map(|g| g.name()), Some("scripts"));
    }
}
