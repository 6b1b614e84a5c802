//! Order inquiry relay for the Sweet No. 13 bakery site.
//!
//! This library backs two binaries:
//! - `inquiry-server`: HTTP server for form submissions and CMS webhooks
//! - `inquiry-submit`: command-line submission client
//!
//! ## Architecture
//!
//! ```text
//! Form → POST /api/contact → validate → verify token → render → dispatch → recipient inbox
//! CMS  → POST /api/revalidate?secret= → content type → cache scope → stale pages
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod inquiry;
pub mod revalidate;
pub mod verify;
pub mod web;

// Re-export commonly used types
pub use client::{InquiryClient, InquiryForm, SubmitStatus};
pub use config::{Config, DispatchConfig, EmailProvider};
pub use dispatch::{EmailDispatcher, OutgoingEmail};
pub use error::{ApiError, ConfigError};
pub use revalidate::{CacheScope, ContentType, PageCache};
pub use verify::{BotVerifier, RecaptchaVerifier, VerificationPolicy};
pub use web::{router, AppState};
