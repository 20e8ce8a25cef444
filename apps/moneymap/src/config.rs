//! # Configuration
//!
//! Command-line flags with environment fallbacks, and the validated
//! [`Config`] the server is started from.

use crate::api::ApiSettings;
use crate::mail::MailSettings;
use clap::Args;
use moneymap_core::{CipherError, FieldCipher};
use std::num::NonZeroU32;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_DATABASE: &str = "moneymap.redb";
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid encryption key: {0}")]
    EncryptionKey(#[from] CipherError),

    #[error("JWT secret must not be empty")]
    EmptyJwtSecret,

    #[error("token lifetime must be positive")]
    TokenTtl,

    #[error("auth rate limit must be positive")]
    AuthRate,
}

/// Location of the redb file.
#[derive(Debug, Clone, Args)]
pub struct DatabaseArgs {
    /// Path to the database file
    #[arg(long = "database", env = "MONEYMAP_DB", default_value = DEFAULT_DATABASE)]
    pub path: PathBuf,
}

/// Outgoing mail settings.
#[derive(Debug, Clone, Args)]
pub struct MailArgs {
    /// SMTP relay host (STARTTLS)
    #[arg(long, env = "SMTP_HOST", default_value = "smtp.gmail.com")]
    pub smtp_host: String,

    /// SMTP relay port
    #[arg(long, env = "SMTP_PORT", default_value_t = 587)]
    pub smtp_port: u16,

    /// SMTP login and sender address; mail is only logged when unset
    #[arg(long, env = "EMAIL_USER")]
    pub email_user: Option<String>,

    /// SMTP password
    #[arg(long, env = "EMAIL_PASSWORD", hide_env_values = true)]
    pub email_password: Option<String>,
}

impl MailArgs {
    #[must_use]
    pub fn settings(&self) -> MailSettings {
        let credentials = match (&self.email_user, &self.email_password) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                Some((user.clone(), password.clone()))
            }
            _ => None,
        };
        MailSettings {
            smtp_host: self.smtp_host.clone(),
            smtp_port: self.smtp_port,
            credentials,
        }
    }
}

/// Flags for `moneymap serve`.
#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "MONEYMAP_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 5001)]
    pub port: u16,

    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Base64 key for field encryption (see `moneymap keygen`)
    #[arg(long, env = "ENCRYPTION_KEY", hide_env_values = true)]
    pub encryption_key: String,

    /// Secret for signing access tokens
    #[arg(long, env = "JWT_SECRET_KEY", hide_env_values = true)]
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    #[arg(long, env = "MONEYMAP_TOKEN_TTL", default_value_t = 3600)]
    pub token_ttl_secs: i64,

    /// Base URL used in password reset links
    #[arg(long, env = "MONEYMAP_FRONTEND_URL", default_value = DEFAULT_FRONTEND_URL)]
    pub frontend_url: String,

    /// Login and reset attempts allowed per account per minute
    #[arg(long, env = "MONEYMAP_AUTH_RATE", default_value_t = 30)]
    pub auth_rate_per_minute: u32,

    #[command(flatten)]
    pub mail: MailArgs,
}

/// Validated server configuration.
#[derive(Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: PathBuf,
    pub cipher: FieldCipher,
    pub api: ApiSettings,
    pub mail: MailSettings,
}

impl Config {
    /// Validate serve flags. The key must decode to 32 bytes.
    pub fn from_args(args: ServeArgs) -> Result<Self, ConfigError> {
        let cipher = FieldCipher::from_base64(&args.encryption_key)?;
        if args.jwt_secret.trim().is_empty() {
            return Err(ConfigError::EmptyJwtSecret);
        }
        if args.token_ttl_secs <= 0 {
            return Err(ConfigError::TokenTtl);
        }
        let auth_rate_per_minute =
            NonZeroU32::new(args.auth_rate_per_minute).ok_or(ConfigError::AuthRate)?;

        Ok(Self {
            host: args.host,
            port: args.port,
            database: args.database.path,
            cipher,
            api: ApiSettings {
                jwt_secret: args.jwt_secret,
                token_ttl_secs: args.token_ttl_secs,
                frontend_url: args.frontend_url,
                auth_rate_per_minute,
            },
            mail: args.mail.settings(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
