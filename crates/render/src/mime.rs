use base64::Engine;
use base64::engine::general_purpose::STANDARD;

pub(crate) const JAVASCRIPT: &str = "text/javascript";

/// Image MIME type guessed from a file name.
///
/// Archive entries carry their own MIME type, but the lookup contract does not
/// expose it; the extension is close enough for images.
pub fn image_mime(url: &str) -> String {
    let extension = url
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| (2..=4).contains(&ext.len()) && ext.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_'))
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("jpg") => "image/jpeg".to_string(),
        Some("tif") => "image/tiff".to_string(),
        Some("ico") => "image/x-icon".to_string(),
        Some("svg") => "image/svg+xml".to_string(),
        Some(ext) => format!("image/{ext}"),
        None => "image".to_string(),
    }
}

/// Self-contained `data:` URI for `content`.
pub fn data_uri(mime: &str, content: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(content))
}
