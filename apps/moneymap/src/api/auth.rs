//! # Authentication
//!
//! Signup, login and logout, plus the [`AuthUser`] extractor that guards every
//! protected route.
//!
//! Access tokens are HS256 JWTs carrying the user id in `sub` and a random
//! `jti`. Logout records the `jti` in the store's revocation table, so a
//! revoked token stays revoked across restarts until it would have expired.
//!
//! Login and forgot-password attempts are rate limited per account with a
//! keyed governor limiter.

use super::{ApiError, AppState, JsonBody, blocking};
use axum::Json;
use axum::extract::{FromRequestParts, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use moneymap_core::profile::{parse_age, parse_annual_income};
use moneymap_core::vault::Account;
use moneymap_core::{NewUser, PreferencesUpdate, ProfileError, RiskTolerance, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::num::NonZeroU32;

// =============================================================================
// TOKENS
// =============================================================================

/// Access token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub username: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys for access tokens.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenKeys {
    #[must_use]
    pub fn new(secret: &[u8], ttl_secs: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl_secs,
        }
    }

    /// Sign a fresh token for an account.
    pub fn issue(&self, account: &Account, now: DateTime<Utc>) -> Result<String, ApiError> {
        let iat = now.timestamp();
        let claims = Claims {
            sub: account.id.to_string(),
            username: account.username.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat,
            exp: iat.saturating_add(self.ttl_secs),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
    }

    /// Check signature and expiry.
    pub fn decode(&self, token: &str) -> Result<Claims, ApiError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::unauthorized("Token has expired")
                }
                _ => ApiError::unauthorized("Invalid token"),
            })
    }
}

/// The authenticated caller of a protected route.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: UserId,
    pub username: String,
    pub jti: String,
    /// Token expiry, unix seconds.
    pub expires: i64,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization Header"))?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization Header"))?;

        let claims = state.tokens.decode(token)?;
        let id = claims
            .sub
            .parse::<u64>()
            .map(UserId)
            .map_err(|_| ApiError::unauthorized("Invalid token"))?;
        if state.vault.is_token_revoked(&claims.jti)? {
            return Err(ApiError::unauthorized("Token has been revoked"));
        }

        Ok(Self {
            id,
            username: claims.username,
            jti: claims.jti,
            expires: claims.exp,
        })
    }
}

// =============================================================================
// RATE LIMITS
// =============================================================================

/// Per-account limiters for credential endpoints.
pub struct AuthLimits {
    login: DefaultKeyedRateLimiter<String>,
    reset: DefaultKeyedRateLimiter<String>,
}

impl AuthLimits {
    #[must_use]
    pub fn new(per_minute: NonZeroU32) -> Self {
        let quota = Quota::per_minute(per_minute);
        Self {
            login: RateLimiter::keyed(quota),
            reset: RateLimiter::keyed(quota),
        }
    }

    pub fn check_login(&self, login: &str) -> Result<(), ApiError> {
        check(&self.login, login)
    }

    pub fn check_reset(&self, email: &str) -> Result<(), ApiError> {
        check(&self.reset, email)
    }
}

fn check(limiter: &DefaultKeyedRateLimiter<String>, key: &str) -> Result<(), ApiError> {
    limiter
        .check_key(&key.trim().to_lowercase())
        .map_err(|_| ApiError::RateLimited)
}

// =============================================================================
// HANDLERS
// =============================================================================

fn credentials(body: &JsonBody) -> Result<(String, String), ApiError> {
    match (body.first_text(&["email", "username"]), body.text("password")) {
        (Some(login), Some(password)) if !login.trim().is_empty() => Ok((login, password)),
        _ => Err(ProfileError::MissingCredentials.into()),
    }
}

/// `POST /signup`
pub async fn signup(
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (login, password) = credentials(&body)?;
    let mut user = NewUser::with_credentials(&login, &password)?;
    if state.vault.login_taken(&user.username)? {
        return Err(ApiError::Conflict("Email already exists".to_string()));
    }

    user.age = body.text("age").map(|age| parse_age(&age)).transpose()?;
    user.annual_income = body
        .first_text(&["annualIncome", "annual_income"])
        .map(|income| parse_annual_income(&income))
        .transpose()?;
    user.full_name = body.first_text(&["name", "full_name"]);
    user.phone = body.text("phone");
    user.occupation = body.text("occupation");
    user.financial_goal = body.first_text(&["financialGoal", "financial_goal"]);
    user.risk_tolerance = body
        .first_text(&["riskTolerance", "risk_tolerance"])
        .map(RiskTolerance::new);

    let mut initial = PreferencesUpdate::default();
    for (field, aliases) in [
        ("current_savings", ["currentSavings", "current_savings"]),
        ("monthly_expenses", ["monthlyExpenses", "monthly_expenses"]),
    ] {
        if let Some(value) = body.first_text(&aliases) {
            initial.set(field, &value)?;
        }
    }

    let now = Utc::now();
    let vault = state.vault.clone();
    let id = blocking(move || Ok(vault.register_with_preferences(user, initial, now)?)).await?;

    tracing::info!(user_id = %id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "msg": "User created successfully", "user_id": id })),
    ))
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<Json<Value>, ApiError> {
    let (login, password) = credentials(&body)?;
    state.limits.check_login(&login)?;

    let vault = state.vault.clone();
    let attempt = login.clone();
    let account = match blocking(move || Ok(vault.authenticate(&attempt, &password)?)).await {
        Ok(account) => account,
        Err(e @ ApiError::Unauthorized(_)) => {
            tracing::warn!("failed login attempt");
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    let token = state.tokens.issue(&account, Utc::now())?;
    tracing::info!(user_id = %account.id, "user logged in");
    Ok(Json(json!({ "access_token": token })))
}

/// `POST /logout`
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, ApiError> {
    state.vault.revoke_token(&user.jti, user.expires)?;
    let purged = state.vault.purge_revoked(Utc::now())?;
    tracing::info!(user_id = %user.id, purged, "user logged out");
    Ok(Json(json!({ "msg": "Successfully logged out" })))
}

// =============================================================================
// TESTS
// =============================================================================
