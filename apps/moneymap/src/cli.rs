//! # CLI
//!
//! Command definitions and their implementations.
//!
//! - `serve`: run the HTTP server until ctrl-c
//! - `init`: create or verify the database tables
//! - `keygen`: print a fresh field-encryption key
//! - `test-email`: check the SMTP settings by sending a message

use crate::api::{AppState, router};
use crate::config::{Config, DatabaseArgs, MailArgs, ServeArgs};
use crate::mail::{MailError, Mailer, test_email};
use chrono::Utc;
use clap::{Parser, Subcommand};
use moneymap_core::cipher::generate_key;
use moneymap_core::{Store, Vault};
use std::error::Error;
use std::path::Path;

pub type CliResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[derive(Debug, Parser)]
#[command(name = "moneymap", version, about = "MoneyMap personal finance server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),

    /// Create or verify the database tables
    Init {
        #[command(flatten)]
        database: DatabaseArgs,
    },

    /// Print a fresh encryption key for ENCRYPTION_KEY
    Keygen,

    /// Send a test email with the configured SMTP settings
    TestEmail {
        #[command(flatten)]
        mail: MailArgs,

        /// Recipient; defaults to the sender address
        #[arg(long)]
        to: Option<String>,
    },
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Open (creating if needed) the database and report its state.
pub fn cmd_init(path: &Path) -> CliResult<()> {
    let store = Store::open(path)?;
    let version = store.schema_version()?;
    let users = store.user_count()?;
    tracing::info!(path = %path.display(), version, users, "database initialized");
    println!(
        "Database ready at {} (schema v{}, {} users)",
        path.display(),
        version,
        users
    );
    Ok(())
}

/// Print a new base64 key and return it.
pub fn cmd_keygen() -> CliResult<String> {
    let key = generate_key()?;
    println!("{key}");
    Ok(key)
}

/// Send the test message through the configured relay.
pub async fn cmd_test_email(mail: &MailArgs, to: Option<&str>) -> CliResult<()> {
    let settings = mail.settings();
    let mailer = Mailer::smtp(&settings)?;
    let recipient = to
        .map(str::to_string)
        .or_else(|| settings.credentials.as_ref().map(|(user, _)| user.clone()))
        .ok_or(MailError::NotConfigured)?;

    println!(
        "Sending test email to {} via {}:{}",
        recipient, settings.smtp_host, settings.smtp_port
    );
    mailer.send(test_email(&recipient)).await?;
    println!("Email sent successfully. Check the inbox of {recipient}.");
    Ok(())
}

/// Run the server until ctrl-c.
pub async fn cmd_serve(args: ServeArgs) -> CliResult<()> {
    let config = Config::from_args(args)?;
    let store = Store::open(&config.database)?;
    let vault = Vault::new(store, config.cipher);
    let purged = vault.purge_revoked(Utc::now())?;
    tracing::info!(path = %config.database.display(), purged, "database opened");

    let mailer = Mailer::from_settings(&config.mail)?;
    if matches!(mailer, Mailer::Log) {
        tracing::warn!("EMAIL_USER/EMAIL_PASSWORD not set; reset links will be logged instead of mailed");
    }

    let app = router(AppState::new(vault, &config.api, mailer));
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "MoneyMap listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
