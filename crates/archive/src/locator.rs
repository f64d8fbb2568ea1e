use crate::error::{Error, ErrorKind};
use std::fmt;
use std::str::FromStr;

/// Identifies one entry inside an archive: a single-character namespace and
/// a path within it.
///
/// The pipeline treats locators as opaque apart from composing cache keys
/// (`<archive>@<namespace>/<url>`) and base paths.
///
/// ```
/// use zimview_archive::Locator;
///
/// let locator: Locator = "A/dir/page.html".parse().unwrap();
/// assert_eq!(locator.namespace, 'A');
/// assert_eq!(locator.url, "dir/page.html");
/// assert_eq!(locator.full_url(), "A/dir/page.html");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    pub namespace: char,
    pub url: String,
    /// Full URL (`<namespace>/<path>`) this entry redirects to, if it is a
    /// redirect entry.
    pub redirect: Option<String>,
}

impl Locator {
    pub fn new(namespace: char, url: impl Into<String>) -> Self {
        Self { namespace, url: url.into(), redirect: None }
    }

    pub fn with_redirect(mut self, target: impl Into<String>) -> Self {
        self.redirect = Some(target.into());
        self
    }

    pub fn is_redirect(&self) -> bool {
        self.redirect.is_some()
    }

    /// `<namespace>/<url>`, the form used in cache keys and history.
    pub fn full_url(&self) -> String {
        format!("{}/{}", self.namespace, self.url)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.url)
    }
}

impl FromStr for Locator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_start_matches('/');
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(namespace), Some('/')) if namespace != '/' && !chars.as_str().is_empty() => {
                Ok(Self::new(namespace, chars.as_str()))
            },
            _ => exn::bail!(ErrorKind::InvalidLocator(s.to_string())),
        }
    }
}
