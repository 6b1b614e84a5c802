//! HTTP surface.
//!
//! | Method | Path                  | Purpose                              |
//! |--------|-----------------------|--------------------------------------|
//! | GET    | `/health`             | liveness                             |
//! | POST   | `/api/contact`        | custom cookie order inquiry          |
//! | POST   | `/api/contact-us`     | general contact message              |
//! | POST   | `/api/revalidate`     | CMS publish webhook (`?secret=`)     |

pub mod handlers;
pub mod multipart;
pub mod secret;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    health, revalidate, submit_contact, submit_inquiry, AppState, HealthResponse,
    RevalidateResponse, SubmissionResponse,
};
pub use multipart::{read_form, SubmittedForm};
pub use secret::verify_shared_secret;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/api/contact", post(submit_inquiry))
        .route("/api/contact-us", post(submit_contact))
        .route("/api/revalidate", post(revalidate))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
