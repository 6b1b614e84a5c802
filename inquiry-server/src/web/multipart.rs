//! Multipart form reading shared by the submission endpoints.

use std::collections::HashMap;

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use tracing::debug;

use crate::inquiry::{fields, ImageAttachment, RawContact, RawInquiry, ValidationError};

/// Every part of a submitted form, before validation.
#[derive(Debug, Default)]
pub struct SubmittedForm {
    text: HashMap<String, String>,
    pub image: Option<ImageAttachment>,
}

impl SubmittedForm {
    pub fn text(&self, name: &str) -> Option<String> {
        self.text.get(name).cloned()
    }

    pub fn token(&self) -> Option<&str> {
        self.text.get(fields::RECAPTCHA_TOKEN).map(String::as_str)
    }

    pub fn inquiry(&self) -> RawInquiry {
        RawInquiry {
            full_name: self.text(fields::FULL_NAME),
            email: self.text(fields::EMAIL),
            date_needed: self.text(fields::DATE_NEEDED),
            occasion: self.text(fields::OCCASION),
            size: self.text(fields::SIZE),
            quantity: self.text(fields::QUANTITY),
            description: self.text(fields::DESCRIPTION),
        }
    }

    pub fn contact(&self) -> RawContact {
        RawContact {
            full_name: self.text(fields::FULL_NAME),
            email: self.text(fields::EMAIL),
            subject: self.text(fields::SUBJECT),
            message: self.text(fields::MESSAGE),
        }
    }
}

/// Drain a multipart body.
///
/// Text parts are kept by name (first occurrence wins). The `image` part
/// becomes the attachment; an empty file part (no file chosen) is ignored,
/// and more than one non-empty image is rejected.
pub async fn read_form(mut multipart: Multipart) -> Result<SubmittedForm, ValidationError> {
    let mut form = SubmittedForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(body_error)?
    {
        let name = field.name().map(|s| s.to_string()).unwrap_or_default();

        if name == fields::IMAGE {
            let filename = field.file_name().map(|s| s.to_string()).unwrap_or_default();
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let data = field
                .bytes()
                .await
                .map_err(body_error)?;

            if data.is_empty() {
                debug!(filename = %filename, "empty_image_part_skipped");
                continue;
            }
            if form.image.is_some() {
                return Err(ValidationError::MultipleImages);
            }

            let filename = if filename.is_empty() {
                "reference-image".to_string()
            } else {
                filename
            };
            form.image = Some(ImageAttachment::new(filename, content_type, data));
        } else {
            let value = field
                .text()
                .await
                .map_err(body_error)?;
            form.text.entry(name).or_insert(value);
        }
    }

    Ok(form)
}

/// A body over the configured limit keeps its own error so it can answer 413.
fn body_error(e: MultipartError) -> ValidationError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationError::BodyTooLarge(e.body_text())
    } else {
        ValidationError::MalformedBody(e.body_text())
    }
}
