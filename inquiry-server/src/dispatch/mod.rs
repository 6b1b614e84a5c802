//! Email dispatch adapter.
//!
//! The handler sends "one HTML email, optionally with attachments" through
//! [`EmailDispatcher`] and never knows which provider is wired in. Bindings:
//! - [`SmtpDispatcher`]: authenticated SMTP relay via lettre
//! - [`ResendDispatcher`]: Resend transactional HTTP API
//!
//! Every binding makes a single attempt per email. No queueing, no retry.

pub mod resend;
pub mod smtp;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::info;

use crate::config::DispatchConfig;
use crate::inquiry::ImageAttachment;

pub use resend::ResendDispatcher;
pub use smtp::SmtpDispatcher;

/// A binary attachment forwarded with an email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Bytes,
}

impl From<ImageAttachment> for EmailAttachment {
    fn from(image: ImageAttachment) -> Self {
        Self {
            filename: image.filename,
            content_type: image.content_type,
            content: image.data,
        }
    }
}

/// One outbound email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub reply_to: Option<String>,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<EmailAttachment>,
}

/// Provider acknowledgement of a sent email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    /// Provider message id (or generated Message-ID for SMTP)
    pub id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Sends a single email through some provider.
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    /// Short provider name used in logs.
    fn provider(&self) -> &'static str;

    async fn send(&self, email: &OutgoingEmail) -> Result<DispatchReceipt, DispatchError>;
}

/// Build the configured provider binding.
///
/// `client` is shared with the rest of the process and already carries the
/// outbound timeout; SMTP applies `timeout` itself.
pub fn from_config(
    config: &DispatchConfig,
    client: Client,
    timeout: Duration,
) -> Result<Arc<dyn EmailDispatcher>, DispatchError> {
    let dispatcher: Arc<dyn EmailDispatcher> = match config {
        DispatchConfig::Smtp {
            host,
            port,
            username,
            password,
        } => Arc::new(SmtpDispatcher::new(
            host,
            *port,
            username.clone(),
            password.clone(),
            timeout,
        )?),
        DispatchConfig::Resend { api_url, api_key } => {
            Arc::new(ResendDispatcher::new(client, api_url, api_key.clone()))
        }
    };

    info!(provider = dispatcher.provider(), "email_dispatcher_created");

    Ok(dispatcher)
}
