//! Inquiry server.
//!
//! Serves the order inquiry and contact form endpoints plus the CMS
//! revalidation webhook. Every outbound dependency (verification service,
//! email provider) is constructed here once and injected into the router.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use inquiry::dispatch;
use inquiry::inquiry::EmailTemplates;
use inquiry::{router, AppState, Config, RecaptchaVerifier};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("inquiry_server_starting");

    let config = Config::from_env();
    config.validate().context("Invalid configuration")?;
    info!(
        port = config.port,
        email_provider = ?config.email_provider,
        recaptcha_configured = config.recaptcha_secret_key.is_some(),
        recaptcha_site_key = ?config.recaptcha_site_key,
        recaptcha_min_score = config.recaptcha_min_score,
        recaptcha_require_score = config.recaptcha_require_score,
        revalidation_configured = config.revalidation_secret.is_some(),
        sanity_project_id = ?config.sanity_project_id,
        sanity_dataset = %config.sanity_dataset,
        site_url = ?config.site_url,
        "config_loaded"
    );

    let http = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .context("Failed to build HTTP client")?;

    let verifier = RecaptchaVerifier::new(
        http.clone(),
        config.recaptcha_verify_url.clone(),
        config.recaptcha_secret()?.to_string(),
    );

    let dispatch_config = config.dispatch()?;
    let dispatcher = dispatch::from_config(&dispatch_config, http, config.request_timeout())
        .context("Failed to create email dispatcher")?;

    let templates = EmailTemplates::new().context("Failed to compile email templates")?;

    let port = config.port;
    let state = AppState::new(config, Arc::new(verifier), dispatcher, templates);
    let app = router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "inquiry_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("inquiry_server_shutdown_complete");

    Ok(())
}

/// Completes when SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("inquiry_server_shutting_down");
}
