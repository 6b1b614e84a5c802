//! Google reCAPTCHA siteverify client.
//!
//! Reference: https://developers.google.com/recaptcha/docs/verify

use async_trait::async_trait;
use reqwest::Client;
use tracing::error;

use super::{BotVerifier, SiteVerifyResponse, VerificationError};

/// Verifies tokens against the siteverify endpoint.
///
/// The request timeout comes from the shared [`Client`]; a timeout is a
/// verification failure like any other transport error.
#[derive(Clone)]
pub struct RecaptchaVerifier {
    client: Client,
    verify_url: String,
    secret: String,
}

impl RecaptchaVerifier {
    pub fn new(client: Client, verify_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            client,
            verify_url: verify_url.into(),
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl BotVerifier for RecaptchaVerifier {
    async fn verify(&self, token: &str) -> Result<SiteVerifyResponse, VerificationError> {
        let result: Result<SiteVerifyResponse, reqwest::Error> = async {
            self.client
                .post(&self.verify_url)
                .form(&[("secret", self.secret.as_str()), ("response", token)])
                .send()
                .await?
                .error_for_status()?
                .json::<SiteVerifyResponse>()
                .await
        }
        .await;

        result.map_err(|e| {
            error!(
                error = %e,
                is_timeout = e.is_timeout(),
                status = ?e.status().map(|s| s.as_u16()),
                "recaptcha_verify_request_failed"
            );
            VerificationError::Transport(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::time::Duration;

    fn verifier(server: &mockito::ServerGuard) -> RecaptchaVerifier {
        let client = Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        RecaptchaVerifier::new(client, format!("{}/recaptcha/api/siteverify", server.url()), "server-secret")
    }

    #[tokio::test]
    async fn test_verify_posts_secret_and_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/recaptcha/api/siteverify")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("secret".into(), "server-secret".into()),
                Matcher::UrlEncoded("response".into(), "client-token".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true, "score": 0.9, "action": "submit", "hostname": "sweetno13.com"}"#)
            .create_async()
            .await;

        let response = verifier(&server).verify("client-token").await.unwrap();

        mock.assert_async().await;
        assert!(response.success);
        assert_eq!(response.score, Some(0.9));
        assert_eq!(response.action.as_deref(), Some("submit"));
    }

    #[tokio::test]
    async fn test_verify_parses_error_codes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/recaptcha/api/siteverify")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": false, "error-codes": ["timeout-or-duplicate"]}"#)
            .create_async()
            .await;

        let response = verifier(&server).verify("reused-token").await.unwrap();

        assert!(!response.success);
        assert_eq!(response.score, None);
        assert_eq!(response.error_codes, vec!["timeout-or-duplicate".to_string()]);
    }

    #[tokio::test]
    async fn test_verify_service_error_is_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/recaptcha/api/siteverify")
            .with_status(503)
            .create_async()
            .await;

        let result = verifier(&server).verify("client-token").await;
        assert!(matches!(result, Err(VerificationError::Transport(_))));
    }

    /// Accepts connections and never answers them.
    async fn silent_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                open.push(stream);
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_verify_timeout_is_failure() {
        let url = silent_server().await;
        let client = Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let verifier =
            RecaptchaVerifier::new(client, format!("{}/recaptcha/api/siteverify", url), "server-secret");

        let result = verifier.verify("client-token").await;

        match result {
            Err(VerificationError::Transport(e)) => assert!(e.is_timeout(), "{}", e),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
