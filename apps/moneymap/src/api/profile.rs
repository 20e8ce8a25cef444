//! Profile, preferences and risk tolerance endpoints.

use super::{ApiError, AppState, AuthUser, JsonBody};
use axum::Json;
use axum::extract::State;
use chrono::Utc;
use moneymap_core::preferences::{BUDGET_FIELDS, MONEY_FIELDS, TEXT_FIELDS};
use moneymap_core::profile::{parse_age, parse_annual_income};
use moneymap_core::{Preferences, PreferencesUpdate, ProfileUpdate, RiskTolerance, UserProfile};
use serde_json::{Value, json};

/// `GET /profile`
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state.vault.profile(user.id)?;
    if profile.income_unreadable {
        tracing::warn!(user_id = %user.id, "annual income could not be decrypted");
    }
    Ok(Json(profile))
}

/// `PUT /profile`
///
/// Null or missing fields are left unchanged. `current_savings` and
/// `monthly_expenses`, which the settings page sends alongside the profile,
/// go to the preferences.
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    body: JsonBody,
) -> Result<Json<Value>, ApiError> {
    let update = ProfileUpdate {
        full_name: body.first_text(&["full_name", "name"]),
        phone: body.text("phone"),
        age: body.text("age").map(|age| parse_age(&age)).transpose()?,
        occupation: body.text("occupation"),
        annual_income: body
            .first_text(&["annual_income", "annualIncome"])
            .map(|income| parse_annual_income(&income))
            .transpose()?,
        financial_goal: body.first_text(&["financial_goal", "financialGoal"]),
        risk_tolerance: body
            .first_text(&["risk_tolerance", "riskTolerance"])
            .map(RiskTolerance::new),
    };

    let mut foundation = PreferencesUpdate::default();
    for field in ["current_savings", "monthly_expenses"] {
        if let Some(value) = body.text(field) {
            foundation.set(field, &value)?;
        }
    }

    if update.is_empty() && foundation.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let now = Utc::now();
    state.vault.update_profile(user.id, update, now)?;
    if !foundation.is_empty() {
        state.vault.update_preferences(user.id, foundation, now)?;
    }

    tracing::info!(user_id = %user.id, "profile updated");
    Ok(Json(json!({ "msg": "Profile updated successfully" })))
}

/// `GET /user-preferences`
///
/// A user without a preferences row gets every field as `null`.
pub async fn get_preferences(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Preferences>, ApiError> {
    let prefs = state.vault.preferences(user.id)?.unwrap_or_default();
    Ok(Json(prefs))
}

/// `PUT /user-preferences`
///
/// Unknown keys are ignored so the client can send back what it fetched.
pub async fn update_preferences(
    State(state): State<AppState>,
    user: AuthUser,
    body: JsonBody,
) -> Result<Json<Value>, ApiError> {
    let mut update = PreferencesUpdate::default();
    for field in MONEY_FIELDS.iter().chain(&BUDGET_FIELDS).chain(&TEXT_FIELDS) {
        if let Some(value) = body.text(field) {
            update.set(field, &value)?;
        }
    }

    let prefs = state.vault.update_preferences(user.id, update, Utc::now())?;
    tracing::info!(user_id = %user.id, "preferences updated");
    Ok(Json(json!({
        "msg": "Preferences updated successfully",
        "preferences": prefs,
    })))
}

/// `POST /update-risk-tolerance`
pub async fn update_risk_tolerance(
    State(state): State<AppState>,
    user: AuthUser,
    body: JsonBody,
) -> Result<Json<Value>, ApiError> {
    let text = body
        .first_text(&["risk_tolerance", "riskTolerance"])
        .ok_or_else(|| ApiError::bad_request("Risk tolerance is required"))?;
    let level = parse_level(&text)?;

    state
        .vault
        .set_risk_tolerance(user.id, RiskTolerance::from_level(level), Utc::now())?;
    tracing::info!(user_id = %user.id, level, "risk tolerance updated");
    Ok(Json(json!({
        "msg": "Risk tolerance updated successfully",
        "risk_tolerance": level,
    })))
}

fn parse_level(text: &str) -> Result<i64, ApiError> {
    let level: i64 = text
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid risk tolerance format"))?;
    let range = i64::from(RiskTolerance::MIN_LEVEL)..=i64::from(RiskTolerance::MAX_LEVEL);
    if !range.contains(&level) {
        return Err(ApiError::bad_request(
            "Risk tolerance must be between 1 and 10",
        ));
    }
    Ok(level)
}

// =============================================================================
// TESTS
// =============================================================================
