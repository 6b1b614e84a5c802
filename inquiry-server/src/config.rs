//! Configuration module for environment variable parsing.
//!
//! All deployment parameters (bot-verification keys, mail provider
//! credentials, the revalidation secret, CMS identifiers) are read once at
//! process start. Secrets are kept out of `Debug` output.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::error::ConfigError;
use crate::verify::VerificationPolicy;

/// Google reCAPTCHA verification endpoint.
pub const DEFAULT_RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Resend transactional API base URL.
pub const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com";

/// Which email provider binding to wire in at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailProvider {
    /// Authenticated SMTP relay (e.g. Gmail with an app password)
    Smtp,
    /// Resend transactional email API
    Resend,
}

impl FromStr for EmailProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "smtp" | "gmail" => Ok(EmailProvider::Smtp),
            "resend" => Ok(EmailProvider::Resend),
            other => Err(ConfigError::InvalidValue {
                key: "EMAIL_PROVIDER",
                message: format!("unknown provider '{}'", other),
            }),
        }
    }
}

/// Fully resolved provider settings, ready to build a dispatcher from.
#[derive(Clone, PartialEq, Eq)]
pub enum DispatchConfig {
    Smtp {
        host: String,
        port: u16,
        username: String,
        password: String,
    },
    Resend {
        api_url: String,
        api_key: String,
    },
}

impl fmt::Debug for DispatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchConfig::Smtp { host, port, username, .. } => f
                .debug_struct("Smtp")
                .field("host", host)
                .field("port", port)
                .field("username", username)
                .finish_non_exhaustive(),
            DispatchConfig::Resend { api_url, .. } => f
                .debug_struct("Resend")
                .field("api_url", api_url)
                .finish_non_exhaustive(),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Server-held reCAPTCHA secret
    pub recaptcha_secret_key: Option<String>,

    /// Public reCAPTCHA site key (handed to clients)
    pub recaptcha_site_key: Option<String>,

    /// reCAPTCHA siteverify endpoint
    pub recaptcha_verify_url: String,

    /// Minimum acceptable confidence score (0.0 - 1.0)
    pub recaptcha_min_score: f64,

    /// Reject verification responses that carry no score
    pub recaptcha_require_score: bool,

    /// Recipient of inquiry emails
    pub contact_email: Option<String>,

    /// Sender address; falls back to the recipient
    pub from_email: Option<String>,

    pub email_provider: EmailProvider,

    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,

    pub resend_api_key: Option<String>,
    pub resend_api_url: String,

    /// Shared secret expected on CMS revalidation webhooks
    pub revalidation_secret: Option<String>,

    /// Timeout applied to every outbound call (verification, dispatch)
    pub request_timeout_ms: u64,

    /// Maximum accepted request body, multipart uploads included
    pub max_upload_bytes: usize,

    // =========================================================================
    // CMS / site identifiers (informational, logged at startup)
    // =========================================================================
    pub sanity_project_id: Option<String>,
    pub sanity_dataset: String,
    pub site_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let contact_email = non_empty(&lookup, "CONTACT_EMAIL");

        Config {
            port: parse_or(&lookup, "PORT", 8080),

            recaptcha_secret_key: non_empty(&lookup, "RECAPTCHA_SECRET_KEY"),

            recaptcha_site_key: non_empty(&lookup, "RECAPTCHA_SITE_KEY")
                .or_else(|| non_empty(&lookup, "NEXT_PUBLIC_RECAPTCHA_SITE_KEY")),

            recaptcha_verify_url: non_empty(&lookup, "RECAPTCHA_VERIFY_URL")
                .unwrap_or_else(|| DEFAULT_RECAPTCHA_VERIFY_URL.to_string()),

            recaptcha_min_score: parse_score(&lookup, "RECAPTCHA_MIN_SCORE", 0.5),

            recaptcha_require_score: parse_or(&lookup, "RECAPTCHA_REQUIRE_SCORE", false),

            from_email: non_empty(&lookup, "FROM_EMAIL").or_else(|| contact_email.clone()),

            contact_email,

            email_provider: non_empty(&lookup, "EMAIL_PROVIDER")
                .and_then(|raw| match raw.parse() {
                    Ok(provider) => Some(provider),
                    Err(e) => {
                        warn!(env_var = "EMAIL_PROVIDER", error = %e, "Invalid provider, using default");
                        None
                    }
                })
                .unwrap_or(EmailProvider::Smtp),

            smtp_host: non_empty(&lookup, "SMTP_HOST")
                .unwrap_or_else(|| "smtp.gmail.com".to_string()),

            smtp_port: parse_or(&lookup, "SMTP_PORT", 587),

            smtp_user: non_empty(&lookup, "SMTP_USER"),

            smtp_password: non_empty(&lookup, "SMTP_PASSWORD"),

            resend_api_key: non_empty(&lookup, "RESEND_API_KEY"),

            resend_api_url: non_empty(&lookup, "RESEND_API_URL")
                .unwrap_or_else(|| DEFAULT_RESEND_API_URL.to_string()),

            revalidation_secret: non_empty(&lookup, "REVALIDATION_SECRET"),

            request_timeout_ms: parse_or(&lookup, "REQUEST_TIMEOUT_MS", 5000),

            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024),

            sanity_project_id: non_empty(&lookup, "SANITY_PROJECT_ID")
                .or_else(|| non_empty(&lookup, "NEXT_PUBLIC_SANITY_PROJECT_ID")),

            sanity_dataset: non_empty(&lookup, "SANITY_DATASET")
                .or_else(|| non_empty(&lookup, "NEXT_PUBLIC_SANITY_DATASET"))
                .unwrap_or_else(|| "production".to_string()),

            site_url: non_empty(&lookup, "SITE_URL")
                .or_else(|| non_empty(&lookup, "NEXT_PUBLIC_SITE_URL")),
        }
    }

    /// Check everything the inquiry pipeline cannot run without.
    ///
    /// The revalidation secret is not checked; the revalidation endpoint
    /// reports its absence per request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.recaptcha_secret()?;
        self.recipient()?;
        self.sender()?;
        self.dispatch()?;

        for (key, value) in [
            ("RECAPTCHA_VERIFY_URL", Some(self.recaptcha_verify_url.as_str())),
            ("RESEND_API_URL", Some(self.resend_api_url.as_str())),
            ("SITE_URL", self.site_url.as_deref()),
        ] {
            if let Some(raw) = value {
                Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
                    key,
                    message: e.to_string(),
                })?;
            }
        }

        Ok(())
    }

    pub fn recaptcha_secret(&self) -> Result<&str, ConfigError> {
        self.recaptcha_secret_key
            .as_deref()
            .ok_or(ConfigError::MissingEnvVar("RECAPTCHA_SECRET_KEY"))
    }

    pub fn recipient(&self) -> Result<&str, ConfigError> {
        self.contact_email
            .as_deref()
            .ok_or(ConfigError::MissingEnvVar("CONTACT_EMAIL"))
    }

    pub fn sender(&self) -> Result<&str, ConfigError> {
        self.from_email
            .as_deref()
            .ok_or(ConfigError::MissingEnvVar("FROM_EMAIL"))
    }

    /// Resolve the configured provider into concrete dispatch settings.
    pub fn dispatch(&self) -> Result<DispatchConfig, ConfigError> {
        match self.email_provider {
            EmailProvider::Smtp => Ok(DispatchConfig::Smtp {
                host: self.smtp_host.clone(),
                port: self.smtp_port,
                username: self
                    .smtp_user
                    .clone()
                    .ok_or(ConfigError::MissingEnvVar("SMTP_USER"))?,
                password: self
                    .smtp_password
                    .clone()
                    .ok_or(ConfigError::MissingEnvVar("SMTP_PASSWORD"))?,
            }),
            EmailProvider::Resend => Ok(DispatchConfig::Resend {
                api_url: self.resend_api_url.clone(),
                api_key: self
                    .resend_api_key
                    .clone()
                    .ok_or(ConfigError::MissingEnvVar("RESEND_API_KEY"))?,
            }),
        }
    }

    pub fn verification_policy(&self) -> VerificationPolicy {
        VerificationPolicy {
            min_score: self.recaptcha_min_score,
            require_score: self.recaptcha_require_score,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("recaptcha_secret_key_set", &self.recaptcha_secret_key.is_some())
            .field("recaptcha_site_key", &self.recaptcha_site_key)
            .field("recaptcha_verify_url", &self.recaptcha_verify_url)
            .field("recaptcha_min_score", &self.recaptcha_min_score)
            .field("recaptcha_require_score", &self.recaptcha_require_score)
            .field("contact_email", &self.contact_email)
            .field("from_email", &self.from_email)
            .field("email_provider", &self.email_provider)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_user", &self.smtp_user)
            .field("resend_api_url", &self.resend_api_url)
            .field("revalidation_secret_set", &self.revalidation_secret.is_some())
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("sanity_project_id", &self.sanity_project_id)
            .field("sanity_dataset", &self.sanity_dataset)
            .field("site_url", &self.site_url)
            .finish_non_exhaustive()
    }
}

/// Read a variable, treating blank values as unset.
fn non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a variable, falling back to `default` when unset or invalid.
fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = match non_empty(lookup, name) {
        Some(v) => v,
        None => return default,
    };

    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Parse a score threshold, which must lie in 0.0 - 1.0.
fn parse_score<F>(lookup: &F, name: &str, default: f64) -> f64
where
    F: Fn(&str) -> Option<String>,
{
    let score: f64 = parse_or(lookup, name, default);
    if (0.0..=1.0).contains(&score) {
        score
    } else {
        warn!(env_var = name, value = score, "Score out of range, using default");
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.recaptcha_min_score, 0.5);
        assert!(!config.recaptcha_require_score);
        assert_eq!(config.recaptcha_verify_url, DEFAULT_RECAPTCHA_VERIFY_URL);
        assert_eq!(config.email_provider, EmailProvider::Smtp);
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.sanity_dataset, "production");
        assert!(config.revalidation_secret.is_none());
    }

    #[test]
    fn test_from_email_falls_back_to_recipient() {
        let config = config_from(&[("CONTACT_EMAIL", "orders@example.com")]);
        assert_eq!(config.sender().unwrap(), "orders@example.com");

        let config = config_from(&[
            ("CONTACT_EMAIL", "orders@example.com"),
            ("FROM_EMAIL", "Sweet No. 13 <noreply@example.com>"),
        ]);
        assert_eq!(config.sender().unwrap(), "Sweet No. 13 <noreply@example.com>");
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = config_from(&[("REVALIDATION_SECRET", "   "), ("PORT", "")]);
        assert!(config.revalidation_secret.is_none());
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_invalid_values_use_defaults() {
        let config = config_from(&[
            ("PORT", "not-a-port"),
            ("RECAPTCHA_MIN_SCORE", "1.7"),
            ("EMAIL_PROVIDER", "carrier-pigeon"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.recaptcha_min_score, 0.5);
        assert_eq!(config.email_provider, EmailProvider::Smtp);
    }

    #[test]
    fn test_dispatch_smtp_requires_credentials() {
        let config = config_from(&[("SMTP_USER", "baker@gmail.com")]);
        assert!(matches!(
            config.dispatch(),
            Err(ConfigError::MissingEnvVar("SMTP_PASSWORD"))
        ));

        let config = config_from(&[
            ("SMTP_USER", "baker@gmail.com"),
            ("SMTP_PASSWORD", "app-password"),
        ]);
        assert_eq!(
            config.dispatch().unwrap(),
            DispatchConfig::Smtp {
                host: "smtp.gmail.com".to_string(),
                port: 587,
                username: "baker@gmail.com".to_string(),
                password: "app-password".to_string(),
            }
        );
    }

    #[test]
    fn test_dispatch_resend() {
        let config = config_from(&[("EMAIL_PROVIDER", "Resend")]);
        assert!(matches!(
            config.dispatch(),
            Err(ConfigError::MissingEnvVar("RESEND_API_KEY"))
        ));

        let config = config_from(&[("EMAIL_PROVIDER", "resend"), ("RESEND_API_KEY", "re_123")]);
        assert_eq!(
            config.dispatch().unwrap(),
            DispatchConfig::Resend {
                api_url: DEFAULT_RESEND_API_URL.to_string(),
                api_key: "re_123".to_string(),
            }
        );
    }

    #[test]
    fn test_validate() {
        let complete = [
            ("RECAPTCHA_SECRET_KEY", "secret"),
            ("CONTACT_EMAIL", "orders@example.com"),
            ("SMTP_USER", "baker@gmail.com"),
            ("SMTP_PASSWORD", "app-password"),
        ];
        assert!(config_from(&complete).validate().is_ok());

        let missing_secret = &complete[1..];
        assert!(matches!(
            config_from(missing_secret).validate(),
            Err(ConfigError::MissingEnvVar("RECAPTCHA_SECRET_KEY"))
        ));

        let mut bad_url = complete.to_vec();
        bad_url.push(("SITE_URL", "not a url"));
        assert!(matches!(
            config_from(&bad_url).validate(),
            Err(ConfigError::InvalidValue { key: "SITE_URL", .. })
        ));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = config_from(&[
            ("RECAPTCHA_SECRET_KEY", "super-secret"),
            ("SMTP_PASSWORD", "hunter2"),
            ("REVALIDATION_SECRET", "webhook-secret"),
        ]);
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("webhook-secret"));
    }
}
