//! # Profile Module
//!
//! Account and profile data: signup input, the decrypted profile view,
//! partial profile updates and the risk tolerance scale.

use crate::UserId;
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Youngest accepted age.
pub const MIN_AGE: u8 = 18;
/// Oldest accepted age.
pub const MAX_AGE: u8 = 100;

/// Signup and profile validation failures. Messages are shown to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("Missing email/username or password")]
    MissingCredentials,

    #[error("Age must be between 18 and 100")]
    AgeOutOfRange,

    #[error("Invalid age format")]
    InvalidAge,

    #[error("Annual income cannot be negative")]
    NegativeIncome,

    #[error("Invalid annual income format")]
    InvalidIncome,
}

/// Parse an age given as text.
pub fn parse_age(text: &str) -> Result<u8, ProfileError> {
    let age: i64 = text.trim().parse().map_err(|_| ProfileError::InvalidAge)?;
    u8::try_from(age)
        .ok()
        .filter(|age| (MIN_AGE..=MAX_AGE).contains(age))
        .ok_or(ProfileError::AgeOutOfRange)
}

/// Parse an annual income given as text.
pub fn parse_annual_income(text: &str) -> Result<Money, ProfileError> {
    let income = Money::parse(text).map_err(|_| ProfileError::InvalidIncome)?;
    if income.is_negative() {
        return Err(ProfileError::NegativeIncome);
    }
    Ok(income)
}

// =============================================================================
// RISK TOLERANCE
// =============================================================================

/// Risk tolerance as entered by the user.
///
/// The stored text is kept verbatim; [`RiskTolerance::level`] maps it onto
/// the 1..=10 scale used for recommendations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskTolerance(String);

impl RiskTolerance {
    /// Lowest level.
    pub const MIN_LEVEL: u8 = 1;
    /// Highest level.
    pub const MAX_LEVEL: u8 = 10;
    /// Level used when the text means nothing.
    pub const DEFAULT_LEVEL: u8 = 5;

    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// A tolerance at an explicit level, clamped into range.
    #[must_use]
    pub fn from_level(level: i64) -> Self {
        let clamped = level.clamp(i64::from(Self::MIN_LEVEL), i64::from(Self::MAX_LEVEL));
        Self(clamped.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Normalised level in 1..=10.
    ///
    /// Numbers are rounded half-up and clamped; the words `conservative`,
    /// `moderate` and `aggressive` map to 3, 6 and 9.
    #[must_use]
    pub fn level(&self) -> u8 {
        level_of(&self.0)
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn level_of(text: &str) -> u8 {
    let text = text.trim();
    match text.to_ascii_lowercase().as_str() {
        "conservative" => return 3,
        "moderate" => return 6,
        "aggressive" => return 9,
        _ => {}
    }

    let Ok(hundredths) = Money::parse(text).map(Money::cents) else {
        return RiskTolerance::DEFAULT_LEVEL;
    };
    // Round half away from zero to a whole level.
    let whole = if hundredths >= 0 {
        hundredths.saturating_add(50) / 100
    } else {
        hundredths.saturating_sub(50) / 100
    };
    let clamped = whole.clamp(
        i64::from(RiskTolerance::MIN_LEVEL),
        i64::from(RiskTolerance::MAX_LEVEL),
    );
    u8::try_from(clamped).unwrap_or(RiskTolerance::DEFAULT_LEVEL)
}

/// Level for an optional stored tolerance.
#[must_use]
pub fn risk_level(tolerance: Option<&RiskTolerance>) -> u8 {
    tolerance.map_or(RiskTolerance::DEFAULT_LEVEL, RiskTolerance::level)
}

// =============================================================================
// SIGNUP AND PROFILE
// =============================================================================

/// Validated signup data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub age: Option<u8>,
    pub occupation: Option<String>,
    pub annual_income: Option<Money>,
    pub financial_goal: Option<String>,
    pub risk_tolerance: Option<RiskTolerance>,
}

impl NewUser {
    /// Start a signup where the login name is also the email address.
    pub fn with_credentials(login: &str, password: &str) -> Result<Self, ProfileError> {
        let login = login.trim();
        if login.is_empty() || password.is_empty() {
            return Err(ProfileError::MissingCredentials);
        }
        Ok(Self {
            username: login.to_string(),
            email: login.to_string(),
            password: password.to_string(),
            ..Self::default()
        })
    }
}

/// The decrypted profile returned to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub age: Option<u8>,
    pub occupation: Option<String>,
    /// `None` when unset or when the sealed value cannot be opened.
    pub annual_income: Option<Money>,
    /// A stored income exists but could not be opened.
    #[serde(skip)]
    pub income_unreadable: bool,
    pub financial_goal: Option<String>,
    pub risk_tolerance: Option<RiskTolerance>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A partial profile update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub age: Option<u8>,
    pub occupation: Option<String>,
    pub annual_income: Option<Money>,
    pub financial_goal: Option<String>,
    pub risk_tolerance: Option<RiskTolerance>,
}

impl ProfileUpdate {
    /// True when no field is supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.phone.is_none()
            && self.age.is_none()
            && self.occupation.is_none()
            && self.annual_income.is_none()
            && self.financial_goal.is_none()
            && self.risk_tolerance.is_none()
    }
}

// =============================================================================
// TESTS
// =============================================================================
