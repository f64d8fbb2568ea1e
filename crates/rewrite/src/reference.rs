//! Turning placeholder references back into archive titles.

use crate::consts;
use crate::error::{ErrorKind, Result};

/// Archive title for a placeholder reference: percent-decoded, without any
/// `?query` or `#fragment`.
///
/// ```
/// use zimview_rewrite::lookup_title;
///
/// assert_eq!(lookup_title("-/s/style.css?v=3").unwrap(), "-/s/style.css");
/// assert_eq!(lookup_title("I/Caf%C3%A9.png").unwrap(), "I/Café.png");
/// assert!(lookup_title("I/%zz.png").is_err());
/// ```
pub fn lookup_title(reference: &str) -> Result<String> {
    let decoded = percent_decode(reference)?;
    Ok(remove_parameters(&decoded).to_string())
}

/// Strip a trailing `?query` and/or `#fragment`.
pub fn remove_parameters(url: &str) -> &str {
    match consts::URL_PARAMETERS.captures(url).and_then(|c| c.get(1)) {
        Some(path) => path.as_str(),
        None => url,
    }
}

fn hex(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Decode `%XX` escapes. Incomplete escapes and escapes that decode to
/// invalid UTF-8 are errors, like `decodeURIComponent`.
fn percent_decode(input: &str) -> Result<String> {
    if !input.contains('%') {
        return Ok(input.to_string());
    }
    let malformed = || exn::Exn::from(ErrorKind::MalformedReference(input.to_string()));
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            decoded.push(bytes[i]);
            i += 1;
            continue;
        }
        let high = bytes.get(i + 1).copied().and_then(hex).ok_or_else(malformed)?;
        let low = bytes.get(i + 2).copied().and_then(hex).ok_or_else(malformed)?;
        decoded.push((high << 4) | low);
        i += 3;
    }
    String::from_utf8(decoded).map_err(|_| malformed())
}
