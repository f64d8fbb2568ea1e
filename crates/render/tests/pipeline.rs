//! Whole-pipeline scenarios: rewrite, render, extract.

use async_trait::async_trait;
use rstest::rstest;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use zimview_archive::archive::MemoryArchive;
use zimview_archive::error::Result as ArchiveResult;
use zimview_archive::{Archive, Locator};
use zimview_cache::{Asset, CacheService, Capability, Detector, DetectorOptions, Preferences};
use zimview_render::error::Result;
use zimview_render::{Controller, EventBinding, HeadlessSurface, LinkBinding, RenderSurface, data_uri};
use zimview_rewrite::rewrite;

fn cache() -> Arc<CacheService> {
    let detector = Detector::new(DetectorOptions { force: Capability::Memory, ..Default::default() });
    Arc::new(CacheService::new(detector, Preferences::in_memory()))
}

/// Archive answering each lookup after a per-title delay.
struct SlowArchive {
    inner: MemoryArchive,
    delays: HashMap<String, u64>,
}

#[async_trait]
impl Archive for SlowArchive {
    fn identifier(&self) -> &str {
        self.inner.identifier()
    }

    async fn entry_by_title(&self, title: &str) -> ArchiveResult<Option<Locator>> {
        let delay = self.delays.get(title).copied().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.inner.entry_by_title(title).await
    }

    async fn read_utf8(&self, locator: &Locator) -> ArchiveResult<String> {
        self.inner.read_utf8(locator).await
    }

    async fn read_binary(&self, locator: &Locator) -> ArchiveResult<Vec<u8>> {
        self.inner.read_binary(locator).await
    }

    async fn resolve_redirect(&self, locator: &Locator) -> ArchiveResult<Locator> {
        self.inner.resolve_redirect(locator).await
    }
}

/// Surface that remembers what the document looked like each time it was
/// revealed, and every element it swapped in.
#[derive(Default)]
struct WatchedSurface {
    inner: HeadlessSurface,
    revealed: Mutex<Vec<String>>,
    replaced: Mutex<Vec<String>>,
}

#[async_trait]
impl RenderSurface for WatchedSurface {
    fn name(&self) -> &str {
        "watched"
    }

    async fn teardown(&self) {
        self.inner.teardown().await;
    }

    async fn load_blank(&self) -> Result<()> {
        self.inner.load_blank().await
    }

    async fn replace_root(&self, html: &str) {
        self.inner.replace_root(html).await;
    }

    async fn add_body_classes(&self, classes: &str) {
        self.inner.add_body_classes(classes).await;
    }

    async fn push_history(&self, title: &str) {
        self.inner.push_history(title).await;
    }

    async fn content(&self) -> String {
        self.inner.content().await
    }

    async fn replace_element(&self, original: &str, replacement: &str) -> bool {
        let replaced = self.inner.replace_element(original, replacement).await;
        if replaced {
            self.replaced.lock().unwrap().push(replacement.to_string());
        }
        replaced
    }

    async fn append_to_head(&self, html: &str) {
        self.inner.append_to_head(html).await;
    }

    async fn bind_event(&self, binding: &EventBinding) -> bool {
        self.inner.bind_event(binding).await
    }

    async fn bind_link(&self, binding: &LinkBinding) -> bool {
        self.inner.bind_link(binding).await
    }

    async fn set_progress(&self, visible: bool) {
        self.inner.set_progress(visible).await;
    }

    async fn reveal(&self) {
        let content = self.inner.content().await;
        self.revealed.lock().unwrap().push(content);
        self.inner.reveal().await;
    }
}

#[tokio::test]
async fn test_article_renders_end_to_end() {
    let raw = r#"<html><head></head><body><img src="../I/cat.png"><link href="../-/s.css"></body></html>"#;
    let locator = Locator::new('A', "dir/page.html");
    let rewritten = rewrite(raw, &locator);
    assert!(rewritten.document.contains(r#"<base href="A/dir/">"#));
    assert!(rewritten.document.contains(r#"<img data-kiwixurl="I/cat.png">"#));
    assert!(rewritten.document.contains(r#"<link data-kiwixurl="-/s.css">"#));

    let archive = Arc::new(MemoryArchive::with_entries([("-/s.css", "body{color:red}")]));
    let cache = cache();
    let surface = Arc::new(HeadlessSurface::new());
    let controller = Controller::new(archive, Arc::clone(&cache), surface.clone());
    let page = controller.render(&rewritten, &locator).await.unwrap().finished().await.unwrap();

    assert_eq!(page.css.counts(), (1, 1));
    let snapshot = surface.snapshot().await;
    assert!(snapshot.visible);
    assert_eq!(snapshot.reveals, 1);
    assert!(snapshot.content.contains(r#"<style data-kiwixurl="-/s.css">body{color:red}</style>"#));
    assert_eq!(cache.get("archive@-/s.css").await, Some(Asset::Text("body{color:red}".to_string())));
}

#[rstest]
#[case::all_resolve(4, 4)]
#[case::some_fail(5, 2)]
#[case::all_fail(3, 0)]
#[tokio::test]
async fn test_reveal_waits_for_every_stylesheet(#[case] total: usize, #[case] present: usize) {
    let mut entries = Vec::new();
    let mut delays = HashMap::new();
    let mut links = String::new();
    for i in 0..total {
        let title = format!("-/s{i}.css");
        if i < present {
            entries.push((title.clone(), format!(".c{i}{{}}")));
        }
        // Later stylesheets answer first.
        delays.insert(title, ((total - i) * 5) as u64);
        links.push_str(&format!(r#"<link rel="stylesheet" href="../-/s{i}.css">"#));
    }
    let raw = format!("<html><head>{links}</head><body></body></html>");
    let locator = Locator::new('A', "page.html");
    let archive = Arc::new(SlowArchive { inner: MemoryArchive::with_entries(entries), delays });
    let surface = Arc::new(WatchedSurface::default());
    let controller = Controller::new(archive, cache(), surface.clone());

    let page = controller.render(&rewrite(&raw, &locator), &locator).await.unwrap().finished().await.unwrap();

    assert_eq!(page.css.counts(), (present as u32, present as u32));
    let revealed = surface.revealed.lock().unwrap().clone();
    assert_eq!(revealed.len(), 1);
    assert_eq!(revealed[0].matches("<style ").count(), present);
    assert_eq!(revealed[0].matches("<link ").count(), total - present);
}

#[tokio::test]
async fn test_inline_handler_is_bound() {
    let locator = Locator::new('A', "page.html");
    let rewritten = rewrite(r#"<html><head></head><body><div onclick="doThing();">x</div></body></html>"#, &locator);
    assert!(rewritten.event_sheet.contains("function onclick_0_0(){ doThing(); }"));

    let surface = Arc::new(HeadlessSurface::new());
    let controller = Controller::new(Arc::new(MemoryArchive::default()), cache(), surface.clone());
    controller.render(&rewritten, &locator).await.unwrap().finished().await.unwrap();

    let snapshot = surface.snapshot().await;
    assert!(snapshot.content.contains(r#"<div data-kiwixevents="onclick_0_0;">x</div>"#));
    assert_eq!(
        snapshot.bindings,
        [EventBinding { element: 0, event: "click".to_string(), function: "onclick_0_0".to_string() }]
    );
}

#[tokio::test]
async fn test_scripts_wait_for_stylesheets() {
    let archive = SlowArchive {
        inner: MemoryArchive::with_entries([("-/s.css", "p{}"), ("-/j.js", "f()")]),
        delays: HashMap::from([("-/s.css".to_string(), 20)]),
    };
    let raw = r#"<html><head><script src="../-/j.js"></script><link href="../-/s.css"></head><body></body></html>"#;
    let locator = Locator::new('A', "page.html");
    let surface = Arc::new(WatchedSurface::default());
    let controller = Controller::new(Arc::new(archive), cache(), surface.clone());
    let page = controller.render(&rewrite(raw, &locator), &locator).await.unwrap().finished().await.unwrap();

    // The script answers first but is only looked up once the stylesheet is in.
    let replaced = surface.replaced.lock().unwrap().clone();
    assert_eq!(replaced.len(), 2);
    assert!(replaced[0].starts_with("<style "));
    assert!(replaced[1].starts_with("<script "));
    assert_eq!(page.scripts.counts(), (1, 1));
}

#[tokio::test]
async fn test_superseded_render_keeps_off_the_new_page() {
    let archive = SlowArchive {
        inner: MemoryArchive::with_entries([("-/old.css", "o{}"), ("-/new.css", "n{}")]),
        delays: HashMap::from([("-/old.css".to_string(), 30), ("-/new.css".to_string(), 300)]),
    };
    let surface = Arc::new(WatchedSurface::default());
    let controller = Controller::new(Arc::new(archive), cache(), surface.clone());

    let one = Locator::new('A', "one.html");
    let old = r#"<html><head><link href="../-/old.css"><script>oldInline()</script></head><body><p onclick="old()">1</p></body></html>"#;
    let old = controller.render(&rewrite(old, &one), &one).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let two = Locator::new('A', "two.html");
    let new = r#"<html><head><link href="../-/new.css"></head><body><p>2</p></body></html>"#;
    let new = controller.render(&rewrite(new, &two), &two).await.unwrap();

    old.finished().await.unwrap();
    assert_eq!(new.page().css.counts(), (1, 0));
    let snapshot = surface.inner.snapshot().await;
    assert!(!snapshot.visible);
    assert!(snapshot.progress);
    assert_eq!(snapshot.reveals, 0);
    assert!(snapshot.bindings.is_empty());
    assert!(!snapshot.content.contains(&data_uri("text/javascript;charset=utf-8", b"oldInline()")));

    let page = new.finished().await.unwrap();
    assert_eq!(page.css.counts(), (1, 1));
    let snapshot = surface.inner.snapshot().await;
    assert!(snapshot.visible);
    assert_eq!(snapshot.reveals, 1);
    assert!(snapshot.content.contains("n{}"));
    assert!(!snapshot.content.contains("o{}"));
}
