//! Client-side inquiry form state.

use crate::inquiry::{
    validate_attachment, AttachmentError, ImageAttachment, InquirySubmission, RawInquiry,
    SizeOption, ValidationError, SWEET_DOZEN,
};

/// Editable inquiry form, mirroring the site's order form.
///
/// Selecting a fixed-dozen size forces the quantity to [`SWEET_DOZEN`] and
/// makes it read-only until another size is chosen.
#[derive(Debug, Clone, Default)]
pub struct InquiryForm {
    pub full_name: String,
    pub email: String,
    /// `YYYY-MM-DD`
    pub date_needed: String,
    pub occasion: String,
    pub description: String,
    size: Option<SizeOption>,
    quantity: String,
    image: Option<ImageAttachment>,
}

impl InquiryForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> Option<SizeOption> {
        self.size
    }

    pub fn set_size(&mut self, size: SizeOption) {
        self.size = Some(size);
        if size.forces_dozen() {
            self.quantity = SWEET_DOZEN.to_string();
        }
    }

    pub fn quantity(&self) -> &str {
        &self.quantity
    }

    pub fn quantity_read_only(&self) -> bool {
        self.size.map(SizeOption::forces_dozen).unwrap_or(false)
    }

    /// Returns false (and changes nothing) while the quantity is read-only.
    pub fn set_quantity(&mut self, quantity: impl Into<String>) -> bool {
        if self.quantity_read_only() {
            return false;
        }
        self.quantity = quantity.into();
        true
    }

    pub fn image(&self) -> Option<&ImageAttachment> {
        self.image.as_ref()
    }

    /// Attach a reference image; rejected images leave the form unchanged.
    pub fn attach_image(&mut self, image: ImageAttachment) -> Result<(), AttachmentError> {
        validate_attachment(&image)?;
        self.image = Some(image);
        Ok(())
    }

    pub fn clear_image(&mut self) {
        self.image = None;
    }

    /// Run the same field rules the server applies.
    pub fn validate(&self) -> Result<InquirySubmission, ValidationError> {
        let mut submission = RawInquiry {
            full_name: Some(self.full_name.clone()),
            email: Some(self.email.clone()),
            date_needed: Some(self.date_needed.clone()),
            occasion: Some(self.occasion.clone()),
            size: self.size.map(|s| s.label().to_string()),
            quantity: Some(self.quantity.clone()),
            description: Some(self.description.clone()),
        }
        .validate()?;

        submission.image = self.image.clone();
        Ok(submission)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
