//! Resend transactional email API binding.
//!
//! ```text
//! POST {api_url}/emails
//! Authorization: Bearer {api_key}
//! { from, to, subject, html, reply_to?, attachments?[{ filename, content(base64), content_type }] }
//! -> 200 { "id": "..." }
//! ```

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{DispatchError, DispatchReceipt, EmailDispatcher, OutgoingEmail};

#[derive(Clone)]
pub struct ResendDispatcher {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<AttachmentPayload<'a>>,
}

#[derive(Debug, Serialize)]
struct AttachmentPayload<'a> {
    filename: &'a str,
    content: String,
    content_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}

impl ResendDispatcher {
    pub fn new(client: Client, api_url: &str, api_key: String) -> Self {
        Self {
            client,
            endpoint: format!("{}/emails", api_url.trim_end_matches('/')),
            api_key,
        }
    }
}

fn request_body(email: &OutgoingEmail) -> SendEmailRequest<'_> {
    SendEmailRequest {
        from: &email.from,
        to: &email.to,
        subject: &email.subject,
        html: &email.html,
        reply_to: email.reply_to.as_deref(),
        attachments: email
            .attachments
            .iter()
            .map(|a| AttachmentPayload {
                filename: &a.filename,
                content: STANDARD.encode(&a.content),
                content_type: &a.content_type,
            })
            .collect(),
    }
}

#[async_trait]
impl EmailDispatcher for ResendDispatcher {
    fn provider(&self) -> &'static str {
        "resend"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<DispatchReceipt, DispatchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body(email))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, is_timeout = e.is_timeout(), "resend_request_failed");
                DispatchError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "resend_send_rejected");
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SendEmailResponse = response
            .json()
            .await
            .map_err(|e| DispatchError::Transport(format!("invalid Resend response: {}", e)))?;

        info!(
            message_id = %parsed.id,
            attachments = email.attachments.len(),
            "resend_send_complete"
        );

        Ok(DispatchReceipt { id: parsed.id })
    }
}
