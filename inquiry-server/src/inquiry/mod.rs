//! Inquiry data model, validation and email rendering.
//!
//! ## Submission Flow
//!
//! ```text
//! RawInquiry → validate() → InquirySubmission → attach(image) → render → OutgoingEmail
//! ```

pub mod template;
pub mod types;
pub mod validate;

pub use template::{EmailTemplates, RenderedEmail};
pub use types::{
    fields, ContactMessage, ImageAttachment, InquirySubmission, Quantity, SizeOption, SWEET_DOZEN,
};
pub use validate::{
    validate_attachment, AttachmentError, RawContact, RawInquiry, ValidationError,
    ALLOWED_IMAGE_TYPES, MIN_IMAGE_BYTES,
};
