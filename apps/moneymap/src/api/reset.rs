//! Password reset endpoints.
//!
//! `forgot-password` answers the same way whether or not the address is
//! registered; only a registered address gets mail.

use super::{ApiError, AppState, JsonBody, blocking};
use crate::mail::{reset_email, reset_link};
use axum::Json;
use axum::extract::State;
use chrono::Utc;
use serde_json::{Value, json};

pub const FORGOT_PASSWORD_REPLY: &str =
    "If an account with that email exists, a password reset link has been sent.";

/// `POST /forgot-password`
pub async fn forgot_password(
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<Json<Value>, ApiError> {
    let email = body
        .text("email")
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty())
        .ok_or_else(|| ApiError::bad_request("Email is required"))?;
    state.limits.check_reset(&email)?;

    if let Some((token, account)) = state.vault.issue_reset_token(&email, Utc::now())? {
        let link = reset_link(&state.frontend_url, token.as_str());
        let mail = reset_email(&account.email, &account.username, &link);
        match state.mailer.send(mail).await {
            Ok(()) => tracing::info!(user_id = %account.id, "password reset mail sent"),
            Err(e) => tracing::error!(user_id = %account.id, error = %e, "password reset mail failed"),
        }
    }

    Ok(Json(json!({ "msg": FORGOT_PASSWORD_REPLY })))
}

fn token(body: &JsonBody) -> Result<String, ApiError> {
    body.text("token")
        .ok_or_else(|| ApiError::bad_request("Token is required"))
}

/// `POST /verify-reset-token`
pub async fn verify_reset_token(
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<Json<Value>, ApiError> {
    let token = token(&body)?;
    let account = state.vault.verify_reset_token(&token, Utc::now())?;
    Ok(Json(json!({ "valid": true, "email": account.email })))
}

/// `POST /reset-password`
pub async fn reset_password(
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<Json<Value>, ApiError> {
    let token = token(&body)?;
    let password = body
        .first_text(&["password", "new_password"])
        .ok_or_else(|| ApiError::bad_request("Password is required"))?;

    let vault = state.vault.clone();
    let account =
        blocking(move || Ok(vault.reset_password(&token, &password, Utc::now())?)).await?;

    tracing::info!(user_id = %account.id, "password reset");
    Ok(Json(json!({ "msg": "Password has been reset successfully" })))
}
