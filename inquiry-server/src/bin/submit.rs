//! Command-line inquiry submission.
//!
//! Fills an inquiry form from arguments and posts it the same way the site's
//! order form does. The bot-verification token is either passed with
//! `--token`, or produced by `--token-command`, which runs once per
//! submission with the site key in `RECAPTCHA_SITE_KEY`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use inquiry::client::{
    CommandChallenge, InquiryClient, InquiryForm, LazyTokenSource, StaticToken, SubmitStatus,
    TokenSource,
};
use inquiry::inquiry::{ImageAttachment, SizeOption};
use inquiry::Config;

/// Submit a custom cookie order inquiry
#[derive(Parser, Debug)]
#[command(name = "inquiry-submit")]
#[command(about = "Submit a custom cookie order inquiry to the inquiry server")]
struct Args {
    /// Inquiry endpoint
    #[arg(long, env = "INQUIRY_ENDPOINT", default_value = "http://localhost:8080/api/contact")]
    endpoint: String,

    /// Full name of the customer
    #[arg(long)]
    name: String,

    /// Reply-to email address
    #[arg(long)]
    email: String,

    /// Date the cookies are needed (YYYY-MM-DD)
    #[arg(long)]
    date: String,

    #[arg(long)]
    occasion: String,

    /// Size label or short name (bubba, peanut, smaller, chunk-royale)
    #[arg(long)]
    size: String,

    /// Quantity; ignored for sizes sold only by the dozen
    #[arg(long, default_value = "1")]
    quantity: String,

    #[arg(long)]
    description: String,

    /// Optional PNG or JPEG reference image (at least 500KB)
    #[arg(long)]
    image: Option<PathBuf>,

    /// reCAPTCHA token for this submission; takes precedence over --token-command
    #[arg(long, env = "RECAPTCHA_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Shell command that prints a reCAPTCHA token
    #[arg(long, env = "RECAPTCHA_TOKEN_COMMAND")]
    token_command: Option<String>,

    /// reCAPTCHA site key handed to the token command
    /// (defaults to RECAPTCHA_SITE_KEY or NEXT_PUBLIC_RECAPTCHA_SITE_KEY)
    #[arg(long)]
    site_key: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long, default_value = "10000")]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    let args = Args::parse();

    let mut form = InquiryForm::new();
    form.full_name = args.name;
    form.email = args.email;
    form.date_needed = args.date;
    form.occasion = args.occasion;
    form.description = args.description;

    let size: SizeOption = args.size.parse().context("Unknown size")?;
    form.set_size(size);
    if !form.set_quantity(args.quantity) {
        info!(size = size.label(), "quantity_fixed_to_dozen");
    }

    if let Some(path) = &args.image {
        let image = read_image(path).await?;
        form.attach_image(image)
            .with_context(|| format!("Rejected image {}", path.display()))?;
    }

    let timeout = Duration::from_millis(args.timeout_ms);
    let http = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")?;

    match (args.token, args.token_command) {
        (Some(token), _) => {
            let client = InquiryClient::new(http, args.endpoint, StaticToken::new(token));
            submit(&client, &mut form).await
        }
        (None, Some(command)) => {
            let site_key = args
                .site_key
                .or_else(|| Config::from_env().recaptcha_site_key);
            let challenge = CommandChallenge::new(site_key, command, timeout);
            let client = InquiryClient::new(http, args.endpoint, LazyTokenSource::new(challenge));
            submit(&client, &mut form).await
        }
        (None, None) => bail!("Provide --token or --token-command"),
    }
}

async fn submit<T: TokenSource>(
    client: &InquiryClient<T>,
    form: &mut InquiryForm,
) -> Result<ExitCode> {
    match client.submit(form).await? {
        SubmitStatus::Success { dispatch_id } => {
            println!("Inquiry sent (dispatch id: {})", dispatch_id);
            Ok(ExitCode::SUCCESS)
        }
        SubmitStatus::Error(message) => {
            eprintln!("Inquiry failed: {}", message);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn read_image(path: &Path) -> Result<ImageAttachment> {
    let content_type = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => bail!("Image must be PNG or JPG: {}", path.display()),
    };

    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("reference-image")
        .to_string();

    Ok(ImageAttachment::new(filename, content_type, Bytes::from(data)))
}
