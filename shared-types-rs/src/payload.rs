//! The uploaded image as it travels down the chain.

use bytes::Bytes;

/// Extensions accepted for uploads, matched case-insensitively on the
/// filename suffix only.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Lower-cased text after the last `.` of `filename`, if any.
pub fn file_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

pub fn is_allowed_image(filename: &str) -> bool {
    file_extension(filename)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Raw image bytes plus declared filename and content type.
///
/// Cloning shares the underlying buffer; there is no way to mutate it.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    bytes: Bytes,
    filename: String,
    content_type: String,
}

impl ImagePayload {
    pub fn new(bytes: impl Into<Bytes>, filename: impl Into<String>, content_type: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
            content_type: content_type
                .filter(|ct| !ct.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
