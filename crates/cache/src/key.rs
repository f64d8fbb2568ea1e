use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::error::{ErrorKind, Result};

// Document keys are told apart from asset keys by their suffix alone. An
// archive that stores a non-document resource ending in `.htm(l)` gets it
// treated as a document; other readers of the same cache rely on this rule.
static DOCUMENT_KEY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^([^@]+)@(.+\.html?)$").unwrap());
static DOCUMENT_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.html?$").unwrap());

/// Returns `true` if `path` names a document (`.htm` / `.html`, any case).
pub fn is_document_path(path: &str) -> bool {
    DOCUMENT_PATH.is_match(path)
}

/// A cache key, classified by shape.
///
/// Both shapes share the single `<archive>@<namespace>/<path>` string
/// namespace:
///
/// ```
/// use zimview_cache::CacheKey;
///
/// let doc = CacheKey::parse("wiki.zim@A/dir/page.html");
/// assert!(matches!(doc, CacheKey::Document { .. }));
///
/// let css = CacheKey::parse("wiki.zim@-/s/style.css");
/// assert!(matches!(css, CacheKey::Asset(_)));
/// assert_eq!(css.to_string(), "wiki.zim@-/s/style.css");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// `archive@namespace/path.html`: a whole rendered document.
    Document { archive: String, path: String },
    /// Anything else: a sub-resource.
    Asset(String),
}

impl CacheKey {
    pub fn parse(key: &str) -> Self {
        match DOCUMENT_KEY.captures(key) {
            Some(captures) => Self::Document { archive: captures[1].to_string(), path: captures[2].to_string() },
            None => Self::Asset(key.to_string()),
        }
    }

    /// Build a key from an archive identifier and a full entry URL.
    pub fn new(archive: &str, full_url: &str) -> Self {
        Self::parse(&format!("{archive}@{full_url}"))
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Self::Document { .. })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document { archive, path } => write!(f, "{archive}@{path}"),
            Self::Asset(key) => f.write_str(key),
        }
    }
}

/// A cached value: textual content (stylesheets, documents) or a binary
/// payload (images, scripts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    Text(String),
    Binary(Vec<u8>),
}

impl Asset {
    const TEXT: i64 = 0;
    const BINARY: i64 = 1;

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Storage tag used by the persistent tiers.
    pub(crate) fn kind(&self) -> i64 {
        match self {
            Self::Text(_) => Self::TEXT,
            Self::Binary(_) => Self::BINARY,
        }
    }

    /// Rebuild an asset from its storage tag and raw bytes.
    pub(crate) fn from_parts(kind: i64, bytes: Vec<u8>) -> Result<Self> {
        match kind {
            Self::TEXT => String::from_utf8(bytes)
                .map(Self::Text)
                .map_err(|_| exn::Exn::from(ErrorKind::InvalidData("text asset is not UTF-8"))),
            Self::BINARY => Ok(Self::Binary(bytes)),
            _ => exn::bail!(ErrorKind::InvalidData("unknown asset kind")),
        }
    }
}

impl From<String> for Asset {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}
impl From<&str> for Asset {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}
impl From<Vec<u8>> for Asset {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}
