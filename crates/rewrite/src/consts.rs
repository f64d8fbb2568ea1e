use regex::Regex;
use std::sync::LazyLock;

/// Attribute holding the original address of a resource the surface must not
/// fetch by itself.
pub const URL_ATTRIBUTE: &str = "data-kiwixurl";
/// Attribute listing the functions synthesised from inline event handlers.
pub const EVENTS_ATTRIBUTE: &str = "data-kiwixevents";

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// `<img`, `<script` or `<link`, then on a word boundary `src=` or `href=`
// whose value is an archive address in the `-` (metadata) or `I` (image)
// namespace, preceded by any run of `../` or `/`. More namespaces go at the
// END of the character class.
regex!(
    RESOURCE_REFERENCE,
    r#"(?i)(<(?:img|script|link)\s+[^>]*?\b)(?:src|href)\s*=\s*(["'])\s*(?:\.\./|/)+([-I]/[^"']*)"#
);
// Not `<head[^>]*>`, which also matches `<header>`.
regex!(HEAD_OPEN, r"(?i)<head(?:\s[^>]*)?>\s*");
regex!(ROOT_CLASSES, r#"(?i)<html[^>]*class\s*=\s*["']\s*([^"']+)"#);
regex!(INLINE_SCRIPT, r"(?is)<script\b([^>]*)>(.*?)</script\s*>");
// Anchored on whitespace, so `data-src=` is not a source.
regex!(SRC_ATTRIBUTE, r"(?i)(?:^|\s)src\s*=");
// A `>` inside a quoted attribute value does not close the tag.
regex!(ELEMENT_TAG, r#"<[a-zA-Z](?:[^>"']|"[^"]*"|'[^']*')*>"#);
regex!(ANCHOR_TAG, r#"(?i)<a(?:\s(?:[^>"']|"[^"]*"|'[^']*')*)?>"#);
regex!(TAG_NAME, r"^<[a-zA-Z][-a-zA-Z0-9]*");
// Case-sensitive on purpose: handlers are lowercase in practice.
regex!(EVENT_HANDLER, r#"\s(on\w+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#);
regex!(
    EVENTS_LIST,
    r#"\sdata-kiwixevents\s*=\s*(?:"([^"]*)"|'([^']*)')"#
);
regex!(
    ATTRIBUTE,
    r#"\s([a-zA-Z_:][-a-zA-Z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#
);
regex!(
    PLACEHOLDER,
    r#"(?i)<(img|script|link)\b[^>]*?\sdata-kiwixurl\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*>"#
);
regex!(URL_SCHEME, r"^[a-zA-Z][a-zA-Z0-9+.-]*:");
// Last path segment pair that looks like `<namespace>/<url>`.
regex!(NAMESPACED_ENTRY, r"(?:^|/)([-ABIJMUVWX]/.+)$");
regex!(URL_PARAMETERS, r"(?s)^([^?#]+)[?#].*$");
regex!(DIRECTORY, r"^(.*/)[^/]+$");
regex!(
    COLLAPSED_SECTION,
    r#"(?i)(<[a-zA-Z][^>]*\sclass\s*=\s*")([^"]*\bcollapsible-(?:block|heading)\b[^"]*)(")"#
);
