//! Error taxonomy and its HTTP mapping.
//!
//! Every failure in a request resolves to a single JSON response of the
//! form `{"message": "..."}`. Client-facing messages never carry provider
//! diagnostics; those are logged server-side only.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::dispatch::DispatchError;
use crate::inquiry::{AttachmentError, ValidationError};
use crate::verify::VerificationError;

/// Server misconfiguration. Messages name variables, never their values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error("Revalidation secret not configured")]
    RevalidationSecretMissing,
}

/// Request-level error returned by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Attachment(#[from] AttachmentError),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Invalid secret")]
    Auth,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to render email: {0}")]
    Template(#[from] tera::Error),
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(ValidationError::BodyTooLarge(_)) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Validation(_) | ApiError::Attachment(_) | ApiError::Verification(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Auth => StatusCode::UNAUTHORIZED,
            ApiError::Dispatch(_) | ApiError::Config(_) | ApiError::Template(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to the submitter.
    pub fn client_message(&self) -> String {
        match self {
            ApiError::Validation(e) => e.to_string(),
            ApiError::Attachment(e) => e.to_string(),
            ApiError::Verification(_) => "reCAPTCHA verification failed".to_string(),
            ApiError::Dispatch(_) => "Failed to send email".to_string(),
            ApiError::Auth => "Invalid secret".to_string(),
            ApiError::Config(e) => e.to_string(),
            ApiError::Template(_) => {
                "An error occurred while processing your request".to_string()
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Attachment(_) => "attachment",
            ApiError::Verification(_) => "verification",
            ApiError::Dispatch(_) => "dispatch",
            ApiError::Auth => "auth",
            ApiError::Config(_) => "config",
            ApiError::Template(_) => "template",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(
                error_kind = self.kind(),
                status = status.as_u16(),
                error = %self,
                detail = ?self,
                "request_failed"
            );
        } else {
            warn!(
                error_kind = self.kind(),
                status = status.as_u16(),
                error = %self,
                "request_rejected"
            );
        }

        (
            status,
            Json(ErrorBody {
                message: self.client_message(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(ValidationError::MissingField("fullName")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AttachmentError::TooSmall(10)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(VerificationError::MissingToken).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ValidationError::BodyTooLarge("length limit exceeded".to_string()))
                .status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::from(ValidationError::QuantityTooLarge).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Auth.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(ConfigError::RevalidationSecretMissing).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(DispatchError::Transport("connection refused".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_dispatch_detail_stays_server_side() {
        let err = ApiError::from(DispatchError::Rejected {
            status: 422,
            body: r#"{"message":"api key re_live_abc is invalid"}"#.to_string(),
        });

        assert_eq!(err.client_message(), "Failed to send email");
        assert!(err.to_string().contains("re_live_abc"));
    }

    #[test]
    fn test_verification_message_is_uniform() {
        let low = ApiError::from(VerificationError::LowScore {
            score: 0.1,
            threshold: 0.5,
        });
        let missing = ApiError::from(VerificationError::MissingToken);
        assert_eq!(low.client_message(), missing.client_message());
    }
}
