//! Title validation.
//!
//! Titles coming out of documents are attacker-controlled as far as a
//! directory-backed archive is concerned; they must never escape the root.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates an archive title (`<namespace>/<path>`) and normalizes it into a
/// relative path that never leaves the archive root.
///
/// Null bytes and drive prefixes are rejected, as are titles that resolve to
/// nothing.
///
/// > **Note:** On Unix a backslash is just another character, so
/// >           `A\page.html` stays one (odd-looking) file name.
///
/// ```
/// use std::path::Path;
/// use zimview_archive::validate_title;
///
/// assert_eq!(validate_title("A/dir/../page.html").unwrap(), Path::new("A/page.html"));
/// assert!(validate_title("../etc/passwd").is_err());
/// assert!(validate_title("A/\0").is_err());
/// ```
pub fn validate(title: impl AsRef<Path>) -> Result<PathBuf> {
    let title = title.as_ref();
    let mut components = Vec::new();
    for component in title.components() {
        match component {
            Component::Normal(s) => {
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(title.to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(title.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(title.to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(title.to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("A/page.html", "A/page.html")]
    #[case("/-/s/style.css", "-/s/style.css")]
    #[case("I//./cat.png", "I/cat.png")]
    #[case("A/dir/../other.html", "A/other.html")]
    fn test_valid(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate(input).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("../etc/passwd")]
    #[case("A/../../escape")]
    #[case("..")]
    #[case("")]
    #[case("./")]
    #[case("A/\0b")]
    fn test_invalid(#[case] input: &str) {
        let err = validate(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }
}
