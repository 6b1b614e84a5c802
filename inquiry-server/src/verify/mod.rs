//! Bot verification.
//!
//! Every submission carries a single-use challenge token. It is verified
//! with one synchronous call before any email is sent, and the reported
//! confidence score is gated by a [`VerificationPolicy`].

pub mod recaptcha;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

pub use recaptcha::RecaptchaVerifier;

/// Response of a siteverify-style verification service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SiteVerifyResponse {
    pub success: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("verification token is missing")]
    MissingToken,

    #[error("verification service rejected the token (error codes: {0:?})")]
    Rejected(Vec<String>),

    #[error("score {score} is below threshold {threshold}")]
    LowScore { score: f64, threshold: f64 },

    #[error("verification response carried no score")]
    MissingScore,

    #[error("verification request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A third-party challenge verification service.
#[async_trait]
pub trait BotVerifier: Send + Sync {
    /// Verify a client token. One outbound call, no retry.
    async fn verify(&self, token: &str) -> Result<SiteVerifyResponse, VerificationError>;
}

/// Acceptance rules applied to a verification response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerificationPolicy {
    /// Scores strictly below this are rejected.
    pub min_score: f64,
    /// Reject responses without a score (v2 checkbox tokens carry none).
    pub require_score: bool,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            min_score: 0.5,
            require_score: false,
        }
    }
}

impl VerificationPolicy {
    pub fn evaluate(&self, response: &SiteVerifyResponse) -> Result<(), VerificationError> {
        if !response.success {
            return Err(VerificationError::Rejected(response.error_codes.clone()));
        }

        match response.score {
            Some(score) if score < self.min_score => Err(VerificationError::LowScore {
                score,
                threshold: self.min_score,
            }),
            None if self.require_score => Err(VerificationError::MissingScore),
            _ => Ok(()),
        }
    }
}

/// Check token presence, verify it, and apply the policy.
pub async fn verify_token(
    verifier: &dyn BotVerifier,
    policy: &VerificationPolicy,
    token: Option<&str>,
) -> Result<(), VerificationError> {
    let token = match token.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => t,
        None => {
            warn!("recaptcha_token_missing");
            return Err(VerificationError::MissingToken);
        }
    };

    let response = verifier.verify(token).await?;

    info!(
        success = response.success,
        score = ?response.score,
        action = ?response.action,
        threshold = policy.min_score,
        "recaptcha_verify_complete"
    );

    policy.evaluate(&response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedVerifier {
        response: SiteVerifyResponse,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl BotVerifier for FixedVerifier {
        async fn verify(&self, _token: &str) -> Result<SiteVerifyResponse, VerificationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    fn verdict(success: bool, score: Option<f64>) -> SiteVerifyResponse {
        SiteVerifyResponse {
            success,
            score,
            ..Default::default()
        }
    }

    #[test]
    fn test_policy_threshold() {
        let policy = VerificationPolicy::default();
        assert!(policy.evaluate(&verdict(true, Some(0.9))).is_ok());
        assert!(policy.evaluate(&verdict(true, Some(0.5))).is_ok());
        assert!(matches!(
            policy.evaluate(&verdict(true, Some(0.49))),
            Err(VerificationError::LowScore { .. })
        ));
        assert!(matches!(
            policy.evaluate(&verdict(false, Some(0.9))),
            Err(VerificationError::Rejected(_))
        ));
    }

    #[test]
    fn test_policy_missing_score() {
        let lenient = VerificationPolicy::default();
        assert!(lenient.evaluate(&verdict(true, None)).is_ok());

        let strict = VerificationPolicy {
            require_score: true,
            ..Default::default()
        };
        assert!(matches!(
            strict.evaluate(&verdict(true, None)),
            Err(VerificationError::MissingScore)
        ));
    }

    #[tokio::test]
    async fn test_missing_token_skips_service() {
        let verifier = FixedVerifier {
            response: verdict(true, Some(0.9)),
            calls: AtomicUsize::new(0),
        };
        let policy = VerificationPolicy::default();

        for token in [None, Some(""), Some("   ")] {
            let result = verify_token(&verifier, &policy, token).await;
            assert!(matches!(result, Err(VerificationError::MissingToken)));
        }
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);

        assert!(verify_token(&verifier, &policy, Some("tok")).await.is_ok());
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    }
}
