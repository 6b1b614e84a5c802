//! Submission types shared by the server handler and the submission client.

use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

use bytes::Bytes;
use chrono::NaiveDate;

use super::validate::ValidationError;

/// Multipart field names, as the site's forms submit them.
pub mod fields {
    pub const FULL_NAME: &str = "fullName";
    pub const EMAIL: &str = "email";
    pub const DATE_NEEDED: &str = "dateNeeded";
    pub const OCCASION: &str = "occasion";
    pub const SIZE: &str = "size";
    pub const QUANTITY: &str = "quantity";
    pub const DESCRIPTION: &str = "description";
    pub const IMAGE: &str = "image";
    pub const SUBJECT: &str = "subject";
    pub const MESSAGE: &str = "message";
    pub const RECAPTCHA_TOKEN: &str = "g-recaptcha-response";
}

/// Quantity literal forced by the fixed-dozen sizes.
pub const SWEET_DOZEN: &str = "Sweet Dozen";

/// Cookie size selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeOption {
    Bubba,
    Peanut,
    SmallerSizes,
    ChunkRoyale,
}

impl SizeOption {
    pub const ALL: [SizeOption; 4] = [
        SizeOption::Bubba,
        SizeOption::Peanut,
        SizeOption::SmallerSizes,
        SizeOption::ChunkRoyale,
    ];

    /// The exact label the order form submits.
    pub fn label(self) -> &'static str {
        match self {
            SizeOption::Bubba => r#"8"x8" square (The Bubba) $25 min Qty. 1"#,
            SizeOption::Peanut => r#"4"x4" square (The Peanut) $8 min Qty. 2"#,
            SizeOption::SmallerSizes => "Smaller sizes (must be a dozen)",
            SizeOption::ChunkRoyale => "Chunk Royale",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            SizeOption::Bubba => "bubba",
            SizeOption::Peanut => "peanut",
            SizeOption::SmallerSizes => "smaller",
            SizeOption::ChunkRoyale => "chunk-royale",
        }
    }

    /// Sizes that are only sold by the dozen.
    pub fn forces_dozen(self) -> bool {
        matches!(self, SizeOption::SmallerSizes | SizeOption::ChunkRoyale)
    }
}

impl FromStr for SizeOption {
    type Err = ValidationError;

    /// Accepts the form label or a short slug (`bubba`, `chunk-royale`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        SizeOption::ALL
            .into_iter()
            .find(|size| size.label() == s || size.slug().eq_ignore_ascii_case(s))
            .ok_or(ValidationError::UnknownSize)
    }
}

impl fmt::Display for SizeOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Requested quantity: a count, or the fixed dozen literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Count(u32),
    Dozen,
}

impl FromStr for Quantity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(SWEET_DOZEN) {
            return Ok(Quantity::Dozen);
        }
        match s.parse::<i64>() {
            Ok(n) if n < 1 => Err(ValidationError::InvalidQuantity),
            Ok(n) => u32::try_from(n)
                .map(Quantity::Count)
                .map_err(|_| ValidationError::QuantityTooLarge),
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow => Err(ValidationError::QuantityTooLarge),
                IntErrorKind::NegOverflow => Err(ValidationError::InvalidQuantity),
                _ => Err(ValidationError::QuantityNotWhole),
            },
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Count(n) => write!(f, "{}", n),
            Quantity::Dozen => f.write_str(SWEET_DOZEN),
        }
    }
}

/// Optional reference image uploaded with an inquiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

impl ImageAttachment {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A validated custom-order inquiry.
#[derive(Debug, Clone, PartialEq)]
pub struct InquirySubmission {
    pub full_name: String,
    pub email: String,
    pub date_needed: NaiveDate,
    pub occasion: String,
    pub size: SizeOption,
    pub quantity: Quantity,
    pub description: String,
    pub image: Option<ImageAttachment>,
}

/// A validated general "Contact Us" message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub full_name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}
