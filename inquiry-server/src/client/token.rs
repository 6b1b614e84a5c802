//! Bot-verification token sources for the submission client.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("reCAPTCHA site key is not configured")]
    NotConfigured,

    #[error("challenge could not be loaded: {0}")]
    Load(String),

    #[error("challenge returned an empty token")]
    Empty,

    #[error("challenge execution failed: {0}")]
    Execute(String),
}

/// Produces a fresh single-use token per submission.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self, action: &str) -> Result<String, TokenError>;
}

/// A token obtained out of band (CLI flag, environment).
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self, _action: &str) -> Result<String, TokenError> {
        if self.0.trim().is_empty() {
            return Err(TokenError::Empty);
        }
        Ok(self.0.clone())
    }
}

/// An expensive challenge runtime: loaded once, then executed per action.
#[async_trait]
pub trait ChallengeLoader: Send + Sync {
    type Handle: Send + Sync;

    async fn load(&self) -> Result<Self::Handle, TokenError>;

    async fn execute(&self, handle: &Self::Handle, action: &str) -> Result<String, TokenError>;
}

/// Defers loading the challenge until the first submission, then reuses it.
///
/// A failed load is not cached; the next submission tries again.
pub struct LazyTokenSource<L: ChallengeLoader> {
    loader: L,
    handle: OnceCell<L::Handle>,
}

impl<L: ChallengeLoader> LazyTokenSource<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            handle: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.initialized()
    }
}

#[async_trait]
impl<L: ChallengeLoader> TokenSource for LazyTokenSource<L> {
    async fn token(&self, action: &str) -> Result<String, TokenError> {
        let handle = self
            .handle
            .get_or_try_init(|| async {
                info!("challenge_loading");
                self.loader.load().await
            })
            .await?;

        let token = self.loader.execute(handle, action).await?;
        if token.is_empty() {
            return Err(TokenError::Empty);
        }

        debug!(action = %action, "challenge_token_issued");
        Ok(token)
    }
}

/// Obtains tokens by running a shell command for each submission.
///
/// The command sees `RECAPTCHA_SITE_KEY` and `RECAPTCHA_ACTION` in its
/// environment and must print the token on stdout. The site key is resolved
/// once, on load.
#[derive(Debug, Clone)]
pub struct CommandChallenge {
    site_key: Option<String>,
    command: String,
    timeout: Duration,
}

impl CommandChallenge {
    pub fn new(site_key: Option<String>, command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            site_key,
            command: command.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ChallengeLoader for CommandChallenge {
    /// The resolved site key.
    type Handle = String;

    async fn load(&self) -> Result<String, TokenError> {
        let site_key = self
            .site_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(TokenError::NotConfigured)?;

        info!(command = %self.command, "challenge_command_ready");
        Ok(site_key.to_string())
    }

    async fn execute(&self, site_key: &String, action: &str) -> Result<String, TokenError> {
        let mut command = Command::new("sh");
        command
            .args(["-c", &self.command])
            .env("RECAPTCHA_SITE_KEY", site_key)
            .env("RECAPTCHA_ACTION", action)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(error = %e, "challenge_command_spawn_failed");
                return Err(TokenError::Execute(format!("failed to run command: {}", e)));
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "challenge_command_timeout");
                return Err(TokenError::Execute(format!(
                    "command timed out after {}ms",
                    self.timeout.as_millis()
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, stderr = %stderr.trim(), "challenge_command_failed");
            return Err(TokenError::Execute(format!("command exited with {}", output.status)));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
