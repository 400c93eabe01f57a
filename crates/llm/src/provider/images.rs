//! Image payload loading for vision-capable requests.
//!
//! Callers reference images either as absolute filesystem paths or as
//! `data:` URLs; providers need a MIME type plus base64 payload either way.

use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::LlmError;

/// One image ready for inline transmission.
#[derive(Debug, Clone)]
pub(crate) struct ImagePayload {
    pub mime_type: String,
    pub base64_data: String,
}

impl ImagePayload {
    /// Render as a `data:` URL for OpenAI-compatible wire formats.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_data)
    }
}

/// Load an image reference into an inline payload.
pub(crate) fn load_image(reference: &str) -> crate::Result<ImagePayload> {
    if let Some(rest) = reference.strip_prefix("data:") {
        let Some((mime_type, data)) = rest.split_once(";base64,") else {
            return Err(LlmError::InvalidRequest(format!(
                "Image data URL is not base64-encoded: {}",
                &reference[..reference.len().min(64)]
            )));
        };

        return Ok(ImagePayload {
            mime_type: mime_type.to_string(),
            base64_data: data.to_string(),
        });
    }

    let path = Path::new(reference);
    let bytes = std::fs::read(path)
        .map_err(|e| LlmError::InvalidRequest(format!("Cannot read image '{reference}': {e}")))?;

    Ok(ImagePayload {
        mime_type: mime_type_for(path),
        base64_data: BASE64.encode(bytes),
    })
}

fn mime_type_for(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn data_url_parses_in_place() {
        let payload = load_image("data:image/jpeg;base64,AAAA").unwrap();

        assert_eq!(payload.mime_type, "image/jpeg");
        assert_eq!(payload.base64_data, "AAAA");
        assert_eq!(payload.to_data_url(), "data:image/jpeg;base64,AAAA");
    }

    #[test]
    fn malformed_data_url_is_rejected() {
        assert!(load_image("data:image/png,raw-bytes").is_err());
    }

    #[test]
    fn file_is_read_and_encoded() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"not-really-a-png").unwrap();

        let payload = load_image(file.path().to_str().unwrap()).unwrap();

        assert_eq!(payload.mime_type, "image/png");
        assert_eq!(payload.base64_data, BASE64.encode(b"not-really-a-png"));
    }

    #[test]
    fn missing_file_reports_the_path() {
        let error = load_image("/nonexistent/image.png").unwrap_err();
        assert!(error.to_string().contains("/nonexistent/image.png"));
    }
}
