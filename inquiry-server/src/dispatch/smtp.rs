//! SMTP binding (authenticated STARTTLS relay, e.g. Gmail with an app password).
//!
//! SMTP returns no provider id, so the dispatch id is the Message-ID we
//! generate: a SHA-256 over the message content, the send time and a nonce.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::{error, info};

use super::{DispatchError, DispatchReceipt, EmailDispatcher, OutgoingEmail};

pub struct SmtpDispatcher {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpDispatcher {
    pub fn new(
        host: &str,
        port: u16,
        username: String,
        password: String,
        timeout: Duration,
    ) -> Result<Self, DispatchError> {
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| DispatchError::Transport(format!("SMTP relay error: {}", e)))?
            .port(port)
            .credentials(Credentials::new(username, password))
            .timeout(Some(timeout))
            .build();

        info!(host = %host, port = port, "smtp_dispatcher_initialized");

        Ok(Self {
            mailer,
            host: host.to_string(),
        })
    }
}

#[async_trait]
impl EmailDispatcher for SmtpDispatcher {
    fn provider(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<DispatchReceipt, DispatchError> {
        let id = generate_message_id(email);
        let message = build_message(email, &format!("<{}@{}>", id, sender_domain(&email.from)))?;

        let response = self.mailer.send(message).await.map_err(|e| {
            error!(host = %self.host, error = %e, "smtp_send_failed");
            DispatchError::Transport(e.to_string())
        })?;

        info!(
            host = %self.host,
            message_id = %id,
            smtp_code = %response.code(),
            attachments = email.attachments.len(),
            "smtp_send_complete"
        );

        Ok(DispatchReceipt { id })
    }
}

/// Build the MIME message: a lone HTML part, or multipart/mixed with the
/// HTML first and each attachment as a base64 part.
pub fn build_message(email: &OutgoingEmail, message_id: &str) -> Result<Message, DispatchError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&email.from)?)
        .subject(email.subject.as_str())
        .message_id(Some(message_id.to_string()));

    for to in &email.to {
        builder = builder.to(parse_mailbox(to)?);
    }

    if let Some(reply_to) = &email.reply_to {
        builder = builder.reply_to(parse_mailbox(reply_to)?);
    }

    let html = SinglePart::html(email.html.clone());

    let message = if email.attachments.is_empty() {
        builder.singlepart(html)
    } else {
        let mut parts = MultiPart::mixed().singlepart(html);
        for attachment in &email.attachments {
            let content_type = ContentType::parse(&attachment.content_type)
                .map_err(|e| DispatchError::Build(format!("attachment content type: {}", e)))?;
            parts = parts.singlepart(
                Attachment::new(attachment.filename.clone())
                    .body(attachment.content.to_vec(), content_type),
            );
        }
        builder.multipart(parts)
    };

    message.map_err(|e| DispatchError::Build(e.to_string()))
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DispatchError> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| DispatchError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Domain part of the sender, used on the right side of the Message-ID.
fn sender_domain(from: &str) -> String {
    from.rsplit('@')
        .next()
        .filter(|_| from.contains('@'))
        .map(|domain| domain.trim_end_matches('>').trim().to_string())
        .filter(|domain| !domain.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

fn generate_message_id(email: &OutgoingEmail) -> String {
    let nonce: u64 = rand::thread_rng().gen();
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    let mut hasher = Sha256::new();
    hasher.update(format!("{}-{}-{}-{}", email.subject, email.to.join(","), now, nonce).as_bytes());
    hasher.update(email.html.as_bytes());
    hex::encode(hasher.finalize())
}
