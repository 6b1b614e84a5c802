//! HTTP endpoint handlers.
//!
//! Submission handlers run strictly in order and stop at the first failure:
//! 1. Read the multipart body
//! 2. Validate fields, then the optional image
//! 3. Verify the bot token (one outbound call)
//! 4. Render and dispatch the email (one outbound call)
//!
//! A rejected submission never reaches the dispatcher.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Multipart, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::dispatch::{DispatchReceipt, EmailAttachment, EmailDispatcher, OutgoingEmail};
use crate::error::{ApiError, ConfigError};
use crate::inquiry::{EmailTemplates, RenderedEmail, ValidationError};
use crate::revalidate::{ContentType, PageCache};
use crate::verify::{verify_token, BotVerifier};
use crate::web::multipart::{read_form, SubmittedForm};
use crate::web::secret::verify_shared_secret;
use crate::Config;

/// Shared application state. Every dependency is built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub verifier: Arc<dyn BotVerifier>,
    pub dispatcher: Arc<dyn EmailDispatcher>,
    pub templates: Arc<EmailTemplates>,
    pub cache: PageCache,
}

impl AppState {
    pub fn new(
        config: Config,
        verifier: Arc<dyn BotVerifier>,
        dispatcher: Arc<dyn EmailDispatcher>,
        templates: EmailTemplates,
    ) -> Self {
        Self {
            config: Arc::new(config),
            verifier,
            dispatcher,
            templates: Arc::new(templates),
            cache: PageCache::new(),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Form Submissions
// =============================================================================

/// Successful submission response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub message: &'static str,
    pub dispatch_id: String,
}

impl From<DispatchReceipt> for SubmissionResponse {
    fn from(receipt: DispatchReceipt) -> Self {
        Self {
            message: "Form submitted successfully",
            dispatch_id: receipt.id,
        }
    }
}

/// Custom cookie order inquiry endpoint.
pub async fn submit_inquiry(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let form = read_form(multipart).await?;

    info!(
        has_image = form.image.is_some(),
        image_bytes = form.image.as_ref().map(|i| i.len()).unwrap_or(0),
        has_token = form.token().is_some(),
        "inquiry_received"
    );

    let mut inquiry = form.inquiry().validate()?;
    if let Some(image) = form.image.clone() {
        inquiry.attach(image)?;
    }

    verify_submission(&state, &form).await?;

    let rendered = state.templates.render_inquiry(&inquiry)?;
    let attachments: Vec<EmailAttachment> = inquiry.image.take().map(Into::into).into_iter().collect();
    let email = outgoing(&state.config, rendered, &inquiry.email, attachments)?;

    let receipt = dispatch(&state, &email).await?;

    info!(
        dispatch_id = %receipt.id,
        size = inquiry.size.label(),
        quantity = %inquiry.quantity,
        "inquiry_dispatched"
    );

    Ok(Json(receipt.into()))
}

/// General "Contact Us" message endpoint.
pub async fn submit_contact(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let form = read_form(multipart).await?;

    info!(has_token = form.token().is_some(), "contact_received");

    if form.image.is_some() {
        return Err(ValidationError::MalformedBody("unexpected image part".to_string()).into());
    }

    let contact = form.contact().validate()?;

    verify_submission(&state, &form).await?;

    let rendered = state.templates.render_contact(&contact)?;
    let email = outgoing(&state.config, rendered, &contact.email, Vec::new())?;

    let receipt = dispatch(&state, &email).await?;

    info!(dispatch_id = %receipt.id, "contact_dispatched");

    Ok(Json(receipt.into()))
}

async fn verify_submission(state: &AppState, form: &SubmittedForm) -> Result<(), ApiError> {
    verify_token(
        state.verifier.as_ref(),
        &state.config.verification_policy(),
        form.token(),
    )
    .await?;
    Ok(())
}

fn outgoing(
    config: &Config,
    rendered: RenderedEmail,
    reply_to: &str,
    attachments: Vec<EmailAttachment>,
) -> Result<OutgoingEmail, ConfigError> {
    Ok(OutgoingEmail {
        from: config.sender()?.to_string(),
        to: vec![config.recipient()?.to_string()],
        reply_to: Some(reply_to.to_string()),
        subject: rendered.subject,
        html: rendered.html,
        attachments,
    })
}

async fn dispatch(state: &AppState, email: &OutgoingEmail) -> Result<DispatchReceipt, ApiError> {
    state.dispatcher.send(email).await.map_err(|e| {
        error!(
            provider = state.dispatcher.provider(),
            error = %e,
            "email_dispatch_failed"
        );
        ApiError::Dispatch(e)
    })
}

// =============================================================================
// CMS Revalidation Webhook
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RevalidateQuery {
    #[serde(default)]
    pub secret: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    pub message: String,
    /// Milliseconds since the Unix epoch
    pub now: i64,
}

/// CMS publish webhook.
///
/// The configured secret is checked before the credential, and the body is
/// only parsed once the credential matches.
pub async fn revalidate(
    State(state): State<AppState>,
    Query(query): Query<RevalidateQuery>,
    body: Bytes,
) -> Result<Json<RevalidateResponse>, ApiError> {
    let expected = state
        .config
        .revalidation_secret
        .as_deref()
        .ok_or(ConfigError::RevalidationSecretMissing)?;

    if !verify_shared_secret(expected, query.secret.as_deref()) {
        return Err(ApiError::Auth);
    }

    // Any JSON value is accepted; only bytes that are not JSON are rejected.
    let payload: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|e| ValidationError::MalformedBody(e.to_string()))?
    };

    let content = ContentType::from_payload(&payload);
    let paths = state.cache.invalidate(content.scope()).await;

    info!(content_type = %content, paths = ?paths, "revalidation_complete");

    Ok(Json(RevalidateResponse {
        revalidated: true,
        message: format!("Revalidated for {}", content),
        now: Utc::now().timestamp_millis(),
    }))
}
