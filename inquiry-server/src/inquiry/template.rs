//! HTML email rendering.
//!
//! Templates are compiled once at startup. Every submitted value is HTML
//! escaped; line breaks in free-text fields become `<br>`.

use tera::{Context, Tera};

use super::types::{ContactMessage, InquirySubmission};

const INQUIRY_TEMPLATE_NAME: &str = "inquiry.html";
const CONTACT_TEMPLATE_NAME: &str = "contact.html";

const INQUIRY_TEMPLATE: &str = r#"<h2>New Cookie Order Request</h2>
<p><strong>Full Name:</strong> {{ full_name }}</p>
<p><strong>Email:</strong> {{ email }}</p>
<p><strong>Date Needed:</strong> {{ date_needed }}</p>
<p><strong>Occasion:</strong> {{ occasion | escape | linebreaksbr | safe }}</p>
<p><strong>Size:</strong> {{ size }}</p>
<p><strong>Quantity:</strong> {{ quantity }}</p>
<p><strong>Description:</strong></p>
<p>{{ description | escape | linebreaksbr | safe }}</p>
{% if image_name %}<p><strong>Reference image:</strong> {{ image_name }} (attached)</p>
{% endif %}"#;

const CONTACT_TEMPLATE: &str = r#"<h2>New Contact Form Submission</h2>
<p><strong>From:</strong> {{ full_name }} &lt;{{ email }}&gt;</p>
<p><strong>Subject:</strong> {{ subject }}</p>
<p><strong>Message:</strong></p>
<p>{{ message | escape | linebreaksbr | safe }}</p>
"#;

/// A rendered email, ready to hand to a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Compiled email templates.
pub struct EmailTemplates {
    tera: Tera,
}

impl EmailTemplates {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (INQUIRY_TEMPLATE_NAME, INQUIRY_TEMPLATE),
            (CONTACT_TEMPLATE_NAME, CONTACT_TEMPLATE),
        ])?;
        Ok(Self { tera })
    }

    pub fn render_inquiry(&self, inquiry: &InquirySubmission) -> Result<RenderedEmail, tera::Error> {
        let mut context = Context::new();
        context.insert("full_name", &inquiry.full_name);
        context.insert("email", &inquiry.email);
        context.insert("date_needed", &inquiry.date_needed.format("%Y-%m-%d").to_string());
        context.insert("occasion", &inquiry.occasion);
        context.insert("size", inquiry.size.label());
        context.insert("quantity", &inquiry.quantity.to_string());
        context.insert("description", &inquiry.description);
        context.insert(
            "image_name",
            &inquiry.image.as_ref().map(|image| image.filename.as_str()),
        );

        Ok(RenderedEmail {
            subject: header_safe(&format!("New Cookie Order Request from {}", inquiry.full_name)),
            html: self.tera.render(INQUIRY_TEMPLATE_NAME, &context)?,
        })
    }

    pub fn render_contact(&self, contact: &ContactMessage) -> Result<RenderedEmail, tera::Error> {
        let mut context = Context::new();
        context.insert("full_name", &contact.full_name);
        context.insert("email", &contact.email);
        context.insert("subject", &contact.subject);
        context.insert("message", &contact.message);

        Ok(RenderedEmail {
            subject: header_safe(&format!("Contact Us: {}", contact.subject)),
            html: self.tera.render(CONTACT_TEMPLATE_NAME, &context)?,
        })
    }
}

/// Collapse line breaks so user text cannot spill into other headers.
fn header_safe(subject: &str) -> String {
    subject
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inquiry::{ImageAttachment, Quantity, SizeOption};
    use bytes::Bytes;
    use chrono::NaiveDate;

    fn inquiry() -> InquirySubmission {
        InquirySubmission {
            full_name: "Ada Baker".to_string(),
            email: "ada@example.com".to_string(),
            date_needed: NaiveDate::from_ymd_opt(2026, 12, 24).unwrap(),
            occasion: "Holiday party".to_string(),
            size: SizeOption::ChunkRoyale,
            quantity: Quantity::Dozen,
            description: "Snowflakes\nand <b>stars</b>".to_string(),
            image: None,
        }
    }

    #[test]
    fn test_inquiry_embeds_every_field() {
        let templates = EmailTemplates::new().unwrap();
        let email = templates.render_inquiry(&inquiry()).unwrap();

        assert_eq!(email.subject, "New Cookie Order Request from Ada Baker");
        assert!(email.html.contains("<h2>New Cookie Order Request</h2>"));
        assert!(email.html.contains("Ada Baker"));
        assert!(email.html.contains("ada@example.com"));
        assert!(email.html.contains("2026-12-24"));
        assert!(email.html.contains("Holiday party"));
        assert!(email.html.contains("Chunk Royale"));
        assert!(email.html.contains("Sweet Dozen"));
        assert!(!email.html.contains("Reference image"));
    }

    #[test]
    fn test_description_is_escaped_with_line_breaks() {
        let templates = EmailTemplates::new().unwrap();
        let email = templates.render_inquiry(&inquiry()).unwrap();

        assert!(email.html.contains("Snowflakes<br>and &lt;b&gt;stars&lt;"));
        assert!(!email.html.contains("<b>stars</b>"));
    }

    #[test]
    fn test_inquiry_mentions_attached_image() {
        let templates = EmailTemplates::new().unwrap();
        let mut inquiry = inquiry();
        inquiry.image = Some(ImageAttachment::new(
            "design.png",
            "image/png",
            Bytes::from_static(b"png"),
        ));

        let email = templates.render_inquiry(&inquiry).unwrap();
        assert!(email.html.contains("Reference image:</strong> design.png (attached)"));
    }

    #[test]
    fn test_contact_template() {
        let templates = EmailTemplates::new().unwrap();
        let email = templates
            .render_contact(&ContactMessage {
                full_name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                subject: "Wholesale\r\nBcc: someone@example.com".to_string(),
                message: "Line one\nLine two".to_string(),
            })
            .unwrap();

        assert_eq!(email.subject, "Contact Us: Wholesale Bcc: someone@example.com");
        assert!(email.html.contains("<h2>New Contact Form Submission</h2>"));
        assert!(email.html.contains("Ada &lt;ada@example.com&gt;"));
        assert!(email.html.contains("Line one<br>Line two"));
    }
}
