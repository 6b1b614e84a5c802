//! Submission client for the inquiry endpoint.
//!
//! ```text
//! InquiryForm ─validate()─► token(action) ─► multipart POST ─► SubmitStatus
//!                                                              ├─ Success { dispatch_id } (form reset)
//!                                                              └─ Error(message)
//! ```
//!
//! Only one submission may be in flight per client.

pub mod form;
pub mod token;

use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::inquiry::{fields, InquirySubmission, ValidationError};

pub use form::InquiryForm;
pub use token::{
    ChallengeLoader, CommandChallenge, LazyTokenSource, StaticToken, TokenError, TokenSource,
};

/// Action name sent with every challenge execution.
pub const SUBMIT_ACTION: &str = "submit";

/// Outcome shown to the submitter. Exactly one per submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStatus {
    Success { dispatch_id: String },
    Error(String),
}

/// Reasons a submission never left the client.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("a submission is already in progress")]
    InFlight,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuccessBody {
    #[serde(default)]
    dispatch_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Posts inquiry forms to the server.
pub struct InquiryClient<T: TokenSource> {
    http: Client,
    endpoint: String,
    tokens: T,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however the submission ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<T: TokenSource> InquiryClient<T> {
    pub fn new(http: Client, endpoint: impl Into<String>, tokens: T) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            tokens,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Validate and submit `form`. The form is reset only on success.
    pub async fn submit(&self, form: &mut InquiryForm) -> Result<SubmitStatus, SubmitError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SubmitError::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let submission = form.validate()?;

        let token = match self.tokens.token(SUBMIT_ACTION).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "challenge_token_unavailable");
                return Ok(SubmitStatus::Error(
                    "reCAPTCHA verification failed. Please try again.".to_string(),
                ));
            }
        };

        let status = match multipart_form(&submission, token) {
            Ok(body) => self.post(body).await,
            Err(e) => SubmitStatus::Error(e.to_string()),
        };

        if let SubmitStatus::Success { dispatch_id } = &status {
            info!(dispatch_id = %dispatch_id, "inquiry_submitted");
            form.reset();
        }

        Ok(status)
    }

    async fn post(&self, body: Form) -> SubmitStatus {
        let response = match self.http.post(&self.endpoint).multipart(body).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, is_timeout = e.is_timeout(), "inquiry_request_failed");
                return SubmitStatus::Error(e.to_string());
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| "Failed to submit form".to_string());
            warn!(status = status.as_u16(), message = %message, "inquiry_rejected");
            return SubmitStatus::Error(message);
        }

        let dispatch_id = response
            .json::<SuccessBody>()
            .await
            .ok()
            .and_then(|body| body.dispatch_id)
            .unwrap_or_default();

        SubmitStatus::Success { dispatch_id }
    }
}

/// Build the multipart body exactly as the site's form submits it.
fn multipart_form(submission: &InquirySubmission, token: String) -> Result<Form, reqwest::Error> {
    let mut form = Form::new()
        .text(fields::FULL_NAME, submission.full_name.clone())
        .text(fields::EMAIL, submission.email.clone())
        .text(fields::DATE_NEEDED, submission.date_needed.format("%Y-%m-%d").to_string())
        .text(fields::OCCASION, submission.occasion.clone())
        .text(fields::SIZE, submission.size.label())
        .text(fields::QUANTITY, submission.quantity.to_string())
        .text(fields::DESCRIPTION, submission.description.clone());

    if let Some(image) = &submission.image {
        let part = Part::bytes(image.data.to_vec())
            .file_name(image.filename.clone())
            .mime_str(&image.content_type)?;
        form = form.part(fields::IMAGE, part);
    }

    Ok(form.text(fields::RECAPTCHA_TOKEN, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockito::Matcher;
    use std::sync::Arc;
    use tokio::sync::Notify;

    use crate::inquiry::SizeOption;

    fn filled() -> InquiryForm {
        let mut form = InquiryForm::new();
        form.full_name = "Ada Baker".to_string();
        form.email = "ada@example.com".to_string();
        form.date_needed = "2026-12-24".to_string();
        form.occasion = "Holiday party".to_string();
        form.description = "Snowflakes".to_string();
        form.set_size(SizeOption::ChunkRoyale);
        form
    }

    fn client(server: &mockito::ServerGuard) -> InquiryClient<StaticToken> {
        InquiryClient::new(
            Client::new(),
            format!("{}/api/contact", server.url()),
            StaticToken::new("tok"),
        )
    }

    #[tokio::test]
    async fn test_success_resets_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/contact")
            .match_header("content-type", Matcher::Regex("^multipart/form-data".to_string()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="fullName"\r\n\r\nAda Baker"#.to_string()),
                Matcher::Regex(r#"name="quantity"\r\n\r\nSweet Dozen"#.to_string()),
                Matcher::Regex(r#"name="g-recaptcha-response"\r\n\r\ntok"#.to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"Form submitted successfully","dispatchId":"msg-42"}"#)
            .create_async()
            .await;

        let client = client(&server);
        let mut form = filled();
        let status = client.submit(&mut form).await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            status,
            SubmitStatus::Success {
                dispatch_id: "msg-42".to_string()
            }
        );
        assert!(form.full_name.is_empty());
        assert!(!client.is_submitting());
    }

    #[tokio::test]
    async fn test_server_error_message_surfaces() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/contact")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"reCAPTCHA verification failed"}"#)
            .create_async()
            .await;

        let client = client(&server);
        let mut form = filled();
        let status = client.submit(&mut form).await.unwrap();

        assert_eq!(
            status,
            SubmitStatus::Error("reCAPTCHA verification failed".to_string())
        );
        assert_eq!(form.full_name, "Ada Baker");
        assert!(!client.is_submitting());
    }

    #[tokio::test]
    async fn test_invalid_form_never_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/contact")
            .expect(0)
            .create_async()
            .await;

        let client = client(&server);
        let mut form = filled();
        form.email = "nope".to_string();

        let result = client.submit(&mut form).await;

        assert!(matches!(
            result,
            Err(SubmitError::Validation(ValidationError::InvalidEmail))
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_token_reports_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/contact")
            .expect(0)
            .create_async()
            .await;

        let client = InquiryClient::new(
            Client::new(),
            format!("{}/api/contact", server.url()),
            StaticToken::new(""),
        );
        let status = client.submit(&mut filled()).await.unwrap();

        assert_eq!(
            status,
            SubmitStatus::Error("reCAPTCHA verification failed. Please try again.".to_string())
        );
        mock.assert_async().await;
    }

    struct GatedToken {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl TokenSource for GatedToken {
        async fn token(&self, _action: &str) -> Result<String, TokenError> {
            self.gate.notified().await;
            Ok("tok".to_string())
        }
    }

    #[tokio::test]
    async fn test_second_submission_while_in_flight() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/contact")
            .with_status(200)
            .with_body(r#"{"dispatchId":"msg-1"}"#)
            .expect(1)
            .create_async()
            .await;

        let gate = Arc::new(Notify::new());
        let client = InquiryClient::new(
            Client::new(),
            format!("{}/api/contact", server.url()),
            GatedToken { gate: gate.clone() },
        );

        let mut first = filled();
        let mut second = filled();
        let (first, second) = tokio::join!(client.submit(&mut first), async {
            let result = client.submit(&mut second).await;
            gate.notify_one();
            result
        });

        assert!(matches!(second, Err(SubmitError::InFlight)));
        assert!(matches!(first, Ok(SubmitStatus::Success { .. })));
        mock.assert_async().await;
    }
}
