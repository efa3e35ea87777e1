//! Reading `multipart/form-data` uploads into an [`ImagePayload`].

use std::collections::HashMap;

use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::http::StatusCode;
use shared_types_rs::wire::IMAGE_FIELD;
use shared_types_rs::{is_allowed_image, ImagePayload};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Malformed multipart request: {0}")]
    Malformed(String),

    #[error("No image provided")]
    MissingImage,

    #[error("No selected file")]
    EmptyFilename,

    #[error("Invalid file type")]
    UnsupportedType,

    #[error("Upload exceeds the size limit")]
    TooLarge,
}

impl UploadError {
    /// Read failures caused by the body limit carry 413; anything else is
    /// a malformed request.
    fn from_read_failure(status: StatusCode, body_text: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            UploadError::TooLarge
        } else {
            UploadError::Malformed(body_text)
        }
    }
}

impl From<MultipartError> for UploadError {
    fn from(err: MultipartError) -> Self {
        UploadError::from_read_failure(err.status(), err.body_text())
    }
}

impl From<MultipartRejection> for UploadError {
    fn from(rejection: MultipartRejection) -> Self {
        UploadError::from_read_failure(rejection.status(), rejection.body_text())
    }
}

/// The parts of one upload: the image (if any) and the text fields.
#[derive(Debug, Default)]
pub struct ImageForm {
    image: Option<ImagePayload>,
    fields: HashMap<String, String>,
}

impl ImageForm {
    /// Drain `multipart`. The first `image` part wins; later ones are ignored.
    pub async fn read(mut multipart: Multipart) -> Result<Self, UploadError> {
        let mut form = ImageForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if name == IMAGE_FIELD {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                if form.image.is_none() {
                    form.image = Some(ImagePayload::new(bytes, filename, content_type));
                }
            } else {
                let value = field.text().await?;
                form.fields.entry(name).or_insert(value);
            }
        }

        Ok(form)
    }

    /// The uploaded image; it must be present and carry a filename.
    pub fn take_image(&mut self) -> Result<ImagePayload, UploadError> {
        let image = self.image.take().ok_or(UploadError::MissingImage)?;
        if image.filename().trim().is_empty() {
            return Err(UploadError::EmptyFilename);
        }
        Ok(image)
    }

    /// A text field, if present and not blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Filename suffix check against the allow-list.
pub fn ensure_allowed_type(image: &ImagePayload) -> Result<(), UploadError> {
    if is_allowed_image(image.filename()) {
        Ok(())
    } else {
        Err(UploadError::UnsupportedType)
    }
}
