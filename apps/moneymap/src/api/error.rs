//! API errors and their HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use moneymap_core::{
    LedgerError, MarketError, PreferencesError, ProfileError, StoreError, VaultError,
    WatchlistError,
};
use serde_json::json;
use thiserror::Error;

const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many requests, try again later")]
    RateLimited,

    /// Logged with its cause; the client only sees a generic message.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = match &self {
            Self::Internal(cause) => {
                tracing::error!(%cause, "request failed");
                INTERNAL_MESSAGE.to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "msg": msg }))).into_response()
    }
}

impl From<ProfileError> for ApiError {
    fn from(e: ProfileError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<PreferencesError> for ApiError {
    fn from(e: PreferencesError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<WatchlistError> for ApiError {
    fn from(e: WatchlistError) -> Self {
        match e {
            WatchlistError::Duplicate => Self::Conflict(e.to_string()),
            WatchlistError::NotFound => Self::NotFound(e.to_string()),
            _ => Self::BadRequest(e.to_string()),
        }
    }
}

impl From<MarketError> for ApiError {
    fn from(e: MarketError) -> Self {
        Self::NotFound(e.to_string())
    }
}

impl From<VaultError> for ApiError {
    fn from(e: VaultError) -> Self {
        match e {
            VaultError::Profile(e) => e.into(),
            VaultError::Preferences(e) => e.into(),
            VaultError::Ledger(e) => e.into(),
            VaultError::Watchlist(e) => e.into(),
            VaultError::Password(moneymap_core::password::PasswordError::TooShort) => {
                Self::BadRequest(e.to_string())
            }
            VaultError::EmailTaken => Self::Conflict(e.to_string()),
            VaultError::BadCredentials => Self::Unauthorized(e.to_string()),
            VaultError::InvalidResetToken => Self::BadRequest(e.to_string()),
            VaultError::UnknownUser | VaultError::UnknownEntry => Self::NotFound(e.to_string()),
            VaultError::Store(StoreError::NotFound) => Self::NotFound("Not found".to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
