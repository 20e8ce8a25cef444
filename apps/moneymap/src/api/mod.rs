//! # HTTP API
//!
//! The axum router and shared state.
//!
//! Handlers are grouped by concern:
//! - [`auth`]: signup, login, logout, the bearer-token extractor, rate limits
//! - [`reset`]: the password reset flow
//! - [`profile`]: profile, preferences, risk tolerance
//! - [`ledger`]: income/expense/saving entries and exports
//! - [`market`]: recommendations, stock details, prices, watchlist
//!
//! Every JSON error body is `{"msg": ...}`.

pub mod auth;
mod body;
mod error;
pub mod ledger;
pub mod market;
mod path;
pub mod profile;
pub mod reset;

pub use auth::{AuthUser, Claims, TokenKeys};
pub use body::JsonBody;
pub use error::ApiError;
pub use path::PathParams;

use crate::mail::Mailer;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use moneymap_core::Vault;
use serde_json::{Value, json};
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Login and reset attempts per account per minute.
pub const DEFAULT_AUTH_RATE: NonZeroU32 = match NonZeroU32::new(30) {
    Some(n) => n,
    None => NonZeroU32::MIN,
};

/// Settings the HTTP layer needs beyond the vault.
#[derive(Clone)]
pub struct ApiSettings {
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    /// Base URL of the web client, used in reset links.
    pub frontend_url: String,
    pub auth_rate_per_minute: NonZeroU32,
}

impl fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiSettings")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("frontend_url", &self.frontend_url)
            .field("auth_rate_per_minute", &self.auth_rate_per_minute)
            .finish_non_exhaustive()
    }
}

impl ApiSettings {
    /// Defaults around a signing secret.
    #[must_use]
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl_secs: 3600,
            frontend_url: crate::config::DEFAULT_FRONTEND_URL.to_string(),
            auth_rate_per_minute: DEFAULT_AUTH_RATE,
        }
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub vault: Arc<Vault>,
    pub tokens: Arc<TokenKeys>,
    pub mailer: Arc<Mailer>,
    pub limits: Arc<auth::AuthLimits>,
    pub frontend_url: Arc<str>,
}

impl AppState {
    #[must_use]
    pub fn new(vault: Vault, settings: &ApiSettings, mailer: Mailer) -> Self {
        Self {
            vault: Arc::new(vault),
            tokens: Arc::new(TokenKeys::new(
                settings.jwt_secret.as_bytes(),
                settings.token_ttl_secs,
            )),
            mailer: Arc::new(mailer),
            limits: Arc::new(auth::AuthLimits::new(settings.auth_rate_per_minute)),
            frontend_url: Arc::from(settings.frontend_url.as_str()),
        }
    }
}

/// Build the full router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        // accounts
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/forgot-password", post(reset::forgot_password))
        .route("/verify-reset-token", post(reset::verify_reset_token))
        .route("/reset-password", post(reset::reset_password))
        // profile
        .route(
            "/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route(
            "/user-preferences",
            get(profile::get_preferences).put(profile::update_preferences),
        )
        .route("/update-risk-tolerance", post(profile::update_risk_tolerance))
        // market
        .route("/stock-recommendations", get(market::stock_recommendations))
        .route("/stocks/{ticker}", get(market::stock))
        .route("/update-stock-prices", get(market::update_stock_prices))
        .route(
            "/watchlist",
            get(market::list_watchlist).post(market::add_to_watchlist),
        )
        .route(
            "/watchlist/{id}",
            delete(market::remove_from_watchlist),
        )
        // ledger
        .route(
            "/entries/{kind}",
            get(ledger::list_entries).post(ledger::add_entry),
        )
        .route(
            "/entries/{kind}/{id}",
            put(ledger::update_entry).delete(ledger::delete_entry),
        )
        .route("/export/csv", get(ledger::export_csv))
        .route("/export/pdf/summary", get(ledger::export_pdf_summary))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Run blocking vault work (password hashing) off the async workers.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
}
