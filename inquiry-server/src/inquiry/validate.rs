//! Field and attachment validation.
//!
//! The same rules run in the submission client before anything is sent and
//! in the server handler, which never trusts the client's checks.

use chrono::NaiveDate;
use lettre::Address;

use super::types::{
    fields, ContactMessage, ImageAttachment, InquirySubmission, Quantity, SizeOption,
};

/// Accepted reference image MIME types.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/jpg"];

/// Smallest accepted reference image (500 KB).
pub const MIN_IMAGE_BYTES: usize = 500 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("All fields are required")]
    MissingField(&'static str),

    #[error("Valid email is required")]
    InvalidEmail,

    #[error("Date needed must be a valid date")]
    InvalidDate,

    #[error("Please select a size")]
    UnknownSize,

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Quantity must be a whole number")]
    QuantityNotWhole,

    #[error("Quantity is too large")]
    QuantityTooLarge,

    #[error("Only one image may be attached")]
    MultipleImages,

    #[error("Malformed request body")]
    MalformedBody(String),

    #[error("Request body is too large")]
    BodyTooLarge(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttachmentError {
    #[error("Image must be PNG or JPG")]
    UnsupportedType(String),

    #[error("Image must be at least 500KB")]
    TooSmall(usize),
}

/// Inquiry fields exactly as submitted, before any validation.
#[derive(Debug, Clone, Default)]
pub struct RawInquiry {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub date_needed: Option<String>,
    pub occasion: Option<String>,
    pub size: Option<String>,
    pub quantity: Option<String>,
    pub description: Option<String>,
}

impl RawInquiry {
    /// Validate every required field, reporting the first failure.
    ///
    /// Presence of all fields is checked before any format check. The image
    /// is handled separately by [`InquirySubmission::attach`].
    pub fn validate(self) -> Result<InquirySubmission, ValidationError> {
        let full_name = required(self.full_name, fields::FULL_NAME)?;
        let email = required(self.email, fields::EMAIL)?;
        let date_needed = required(self.date_needed, fields::DATE_NEEDED)?;
        let occasion = required(self.occasion, fields::OCCASION)?;
        let size = required(self.size, fields::SIZE)?;
        let quantity = required(self.quantity, fields::QUANTITY)?;
        let description = required(self.description, fields::DESCRIPTION)?;

        let email = validate_email(email)?;
        let date_needed = parse_date(&date_needed)?;
        let size: SizeOption = size.parse()?;

        // Dozen-only sizes override whatever quantity was typed.
        let quantity = if size.forces_dozen() {
            Quantity::Dozen
        } else {
            quantity.parse()?
        };

        Ok(InquirySubmission {
            full_name,
            email,
            date_needed,
            occasion,
            size,
            quantity,
            description,
            image: None,
        })
    }
}

impl InquirySubmission {
    /// Validate and attach the optional reference image.
    pub fn attach(&mut self, image: ImageAttachment) -> Result<(), AttachmentError> {
        validate_attachment(&image)?;
        self.image = Some(image);
        Ok(())
    }
}

/// Contact message fields exactly as submitted.
#[derive(Debug, Clone, Default)]
pub struct RawContact {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

impl RawContact {
    pub fn validate(self) -> Result<ContactMessage, ValidationError> {
        let full_name = required(self.full_name, fields::FULL_NAME)?;
        let email = required(self.email, fields::EMAIL)?;
        let subject = required(self.subject, fields::SUBJECT)?;
        let message = required(self.message, fields::MESSAGE)?;

        Ok(ContactMessage {
            full_name,
            email: validate_email(email)?,
            subject,
            message,
        })
    }
}

/// Check an image's MIME type and size.
pub fn validate_attachment(image: &ImageAttachment) -> Result<(), AttachmentError> {
    let mime = normalize_mime_type(&image.content_type);
    if !ALLOWED_IMAGE_TYPES.contains(&mime.as_str()) {
        return Err(AttachmentError::UnsupportedType(mime));
    }

    if image.len() < MIN_IMAGE_BYTES {
        return Err(AttachmentError::TooSmall(image.len()));
    }

    Ok(())
}

/// Lowercase a MIME type and strip its parameters ("image/PNG; x=y" -> "image/png").
fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_lowercase()
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingField(field))
}

fn validate_email(email: String) -> Result<String, ValidationError> {
    email
        .parse::<Address>()
        .map(|_| email)
        .map_err(|_| ValidationError::InvalidEmail)
}

fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate)
}
