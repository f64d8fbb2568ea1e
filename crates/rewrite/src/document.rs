//! Whole-document transformations.

use memchr::memchr;
use regex::Captures;
use tracing::instrument;
use zimview_archive::Locator;

use crate::consts;

/// Drop a byte-order mark and anything else before the first tag.
///
/// Text without any tag only loses its byte-order mark.
pub fn strip_preamble(html: &str) -> &str {
    match memchr(b'<', html.as_bytes()) {
        Some(start) => &html[start..],
        None => html.trim_start_matches('\u{feff}'),
    }
}

/// Remove inline `<script>` elements, returning their bodies in source order.
///
/// Scripts with a `src` attribute are external and stay in place; script
/// elements with a whitespace-only body are dropped without being collected.
#[instrument(level = "trace", skip_all)]
pub fn extract_inline_scripts(html: &str) -> (String, Vec<String>) {
    let mut scripts = Vec::new();
    let document = consts::INLINE_SCRIPT.replace_all(html, |captures: &Captures| {
        if consts::SRC_ATTRIBUTE.is_match(&captures[1]) {
            return captures[0].to_string();
        }
        let body = captures[2].trim();
        if !body.is_empty() {
            scripts.push(body.to_string());
        }
        String::new()
    });
    (document.into_owned(), scripts)
}

/// Point same-archive `img`/`script`/`link` references at the placeholder
/// attribute, dropping any leading `../` or `/` from the address.
pub fn rewrite_references(html: &str) -> String {
    let replacement = format!("${{1}}{}=${{2}}${{3}}", consts::URL_ATTRIBUTE);
    consts::RESOURCE_REFERENCE.replace_all(html, replacement.as_str()).into_owned()
}

/// Directory of a document, relative to the archive root: `A/dir/` for
/// `A/dir/page.html`, `A/` for `A/page.html`.
pub fn base_path(locator: &Locator) -> String {
    let directory = consts::DIRECTORY.captures(&locator.url).map_or("", |c| c.get(1).map_or("", |m| m.as_str()));
    format!("{}/{directory}", locator.namespace)
}

/// Insert `<base href="…">` right after the opening `<head>` tag. Documents
/// without a `<head>` are left untouched.
pub fn inject_base(html: &str, base: &str) -> String {
    let href = base.replace('"', "&quot;");
    consts::HEAD_OPEN
        .replacen(html, 1, |captures: &Captures| format!("{}<base href=\"{href}\">\n", &captures[0]))
        .into_owned()
}

/// Classes set on the `<html>` element.
///
/// Replacing the root content of a surface discards the root element's own
/// attributes, so these have to be re-applied to `<body>`.
pub fn root_classes(html: &str) -> Option<String> {
    let classes = consts::ROOT_CLASSES.captures(html)?.get(1)?.as_str().trim();
    (!classes.is_empty()).then(|| classes.to_string())
}

/// Mark collapsed sections as open.
///
/// Some archives ship sections that are collapsed by default and are only
/// opened by their own scripts.
pub fn open_collapsed_sections(html: &str) -> String {
    consts::COLLAPSED_SECTION
        .replace_all(html, |captures: &Captures| {
            let classes = &captures[2];
            match classes.split_ascii_whitespace().any(|class| class == "open-block") {
                true => captures[0].to_string(),
                false => format!("{}{classes} open-block{}", &captures[1], &captures[3]),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("\u{feff}<html></html>", "<html></html>")]
    #[case("garbage\n<html></html>", "<html></html>")]
    #[case("<html></html>", "<html></html>")]
    #[case("\u{feff}no tags", "no tags")]
    fn test_strip_preamble(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_preamble(input), expected);
    }

    #[test]
    fn test_extract_inline_scripts() {
        let html = r#"<head><script>var a = 1;</script><script src="../-/j.js"></script></head><body><SCRIPT type="text/javascript">
            go();
        </SCRIPT><script> </script></body>"#;
        let (document, scripts) = extract_inline_scripts(html);
        assert_eq!(scripts, vec!["var a = 1;".to_string(), "go();".to_string()]);
        assert_eq!(document, r#"<head><script src="../-/j.js"></script></head><body></body>"#);
    }

    #[test]
    fn test_data_src_is_still_inline() {
        let (document, scripts) = extract_inline_scripts(r#"<script data-src="x">inline()</script><script src='y'></script>"#);
        assert_eq!(scripts, vec!["inline()".to_string()]);
        assert_eq!(document, "<script src='y'></script>");
    }

    #[test]
    fn test_extract_inline_scripts_no_match() {
        let (document, scripts) = extract_inline_scripts("<p>plain</p>");
        assert_eq!(document, "<p>plain</p>");
        assert!(scripts.is_empty());
    }

    #[rstest]
    #[case(r#"<img src="../I/cat.png">"#, r#"<img data-kiwixurl="I/cat.png">"#)]
    #[case(r#"<img src="../../I/a/b.png" alt="x">"#, r#"<img data-kiwixurl="I/a/b.png" alt="x">"#)]
    #[case(r#"<link rel="stylesheet" href='/-/s.css'>"#, r#"<link rel="stylesheet" data-kiwixurl='-/s.css'>"#)]
    #[case(r#"<script src="../-/j.js"></script>"#, r#"<script data-kiwixurl="-/j.js"></script>"#)]
    #[case(r#"<IMG SRC = " ../I/cat.png">"#, r#"<IMG data-kiwixurl="I/cat.png">"#)]
    // Not archive addresses
    #[case(r#"<img src="cat.png">"#, r#"<img src="cat.png">"#)]
    #[case(r#"<img src="../A/page.html">"#, r#"<img src="../A/page.html">"#)]
    #[case(r#"<a href="../I/cat.png">"#, r#"<a href="../I/cat.png">"#)]
    #[case(r#"<img src="https://example.com/I/cat.png">"#, r#"<img src="https://example.com/I/cat.png">"#)]
    fn test_rewrite_references(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(rewrite_references(input), expected);
    }

    #[rstest]
    #[case('A', "dir/page.html", "A/dir/")]
    #[case('A', "a/b/page.html", "A/a/b/")]
    #[case('A', "page.html", "A/")]
    #[case('-', "s.css", "-/")]
    fn test_base_path(#[case] namespace: char, #[case] url: &str, #[case] expected: &str) {
        assert_eq!(base_path(&Locator::new(namespace, url)), expected);
    }

    #[rstest]
    #[case("<html><head></head></html>", "<html><head><base href=\"A/\">\n</head></html>")]
    #[case("<html><HEAD lang=\"en\">\n  <title>", "<html><HEAD lang=\"en\">\n  <base href=\"A/\">\n<title>")]
    #[case("<html><header></header></html>", "<html><header></header></html>")]
    #[case("<html><body></body></html>", "<html><body></body></html>")]
    fn test_inject_base(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(inject_base(input, "A/"), expected);
    }

    #[rstest]
    #[case(r#"<html class="client-js ltr"><body>"#, Some("client-js ltr"))]
    #[case(r#"<html lang="en" class='mw'>"#, Some("mw"))]
    #[case(r#"<html><body class="x">"#, None)]
    #[case(r#"<html class="  ">"#, None)]
    fn test_root_classes(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(root_classes(input).as_deref(), expected);
    }

    #[test]
    fn test_open_collapsed_sections() {
        let html = r#"<div class="collapsible-block">a</div><h2 class="x collapsible-heading open-block">b</h2><p class="collapsible">c</p>"#;
        assert_eq!(
            open_collapsed_sections(html),
            r#"<div class="collapsible-block open-block">a</div><h2 class="x collapsible-heading open-block">b</h2><p class="collapsible">c</p>"#
        );
    }
}
