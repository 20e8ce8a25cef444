//! # Preferences Module
//!
//! Emergency fund settings and the monthly budget breakdown.

use crate::money::{Money, Percent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreferencesError {
    #[error("{0} must be between 0 and 100")]
    BudgetOutOfRange(&'static str),

    #[error("Invalid value for {0}")]
    InvalidValue(&'static str),

    #[error("Unknown preference: {0}")]
    UnknownField(String),
}

/// Money-valued preference fields, by wire name.
pub const MONEY_FIELDS: [&str; 4] = [
    "current_savings",
    "monthly_expenses",
    "emergency_fund_target",
    "monthly_contribution",
];

/// Budget share fields, by wire name.
pub const BUDGET_FIELDS: [&str; 6] = [
    "budget_housing_percent",
    "budget_food_percent",
    "budget_transportation_percent",
    "budget_utilities_percent",
    "budget_entertainment_percent",
    "budget_other_percent",
];

/// Free-text preference fields, by wire name.
pub const TEXT_FIELDS: [&str; 1] = ["emergency_goal"];

/// A user's stored preferences. Every field may be unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub current_savings: Option<Money>,
    pub monthly_expenses: Option<Money>,
    pub emergency_fund_target: Option<Money>,
    pub monthly_contribution: Option<Money>,
    pub emergency_goal: Option<String>,
    pub budget_housing_percent: Option<Percent>,
    pub budget_food_percent: Option<Percent>,
    pub budget_transportation_percent: Option<Percent>,
    pub budget_utilities_percent: Option<Percent>,
    pub budget_entertainment_percent: Option<Percent>,
    pub budget_other_percent: Option<Percent>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A partial preferences update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencesUpdate {
    pub current_savings: Option<Money>,
    pub monthly_expenses: Option<Money>,
    pub emergency_fund_target: Option<Money>,
    pub monthly_contribution: Option<Money>,
    pub emergency_goal: Option<String>,
    pub budget_housing_percent: Option<Percent>,
    pub budget_food_percent: Option<Percent>,
    pub budget_transportation_percent: Option<Percent>,
    pub budget_utilities_percent: Option<Percent>,
    pub budget_entertainment_percent: Option<Percent>,
    pub budget_other_percent: Option<Percent>,
}

impl PreferencesUpdate {
    /// Set one field from its wire name and text value.
    ///
    /// Budget shares are range-checked here.
    pub fn set(&mut self, field: &str, text: &str) -> Result<(), PreferencesError> {
        if let Some(slot) = self.money_slot(field) {
            let name = static_name(&MONEY_FIELDS, field);
            *slot = Some(Money::parse(text).map_err(|_| PreferencesError::InvalidValue(name))?);
            return Ok(());
        }
        if let Some(slot) = self.budget_slot(field) {
            let name = static_name(&BUDGET_FIELDS, field);
            let share = Percent::parse(text).map_err(|_| PreferencesError::InvalidValue(name))?;
            if !share.is_valid_share() {
                return Err(PreferencesError::BudgetOutOfRange(name));
            }
            *slot = Some(share);
            return Ok(());
        }
        if field == "emergency_goal" {
            self.emergency_goal = Some(text.to_string());
            return Ok(());
        }
        Err(PreferencesError::UnknownField(field.to_string()))
    }

    fn money_slot(&mut self, field: &str) -> Option<&mut Option<Money>> {
        match field {
            "current_savings" => Some(&mut self.current_savings),
            "monthly_expenses" => Some(&mut self.monthly_expenses),
            "emergency_fund_target" => Some(&mut self.emergency_fund_target),
            "monthly_contribution" => Some(&mut self.monthly_contribution),
            _ => None,
        }
    }

    fn budget_slot(&mut self, field: &str) -> Option<&mut Option<Percent>> {
        match field {
            "budget_housing_percent" => Some(&mut self.budget_housing_percent),
            "budget_food_percent" => Some(&mut self.budget_food_percent),
            "budget_transportation_percent" => Some(&mut self.budget_transportation_percent),
            "budget_utilities_percent" => Some(&mut self.budget_utilities_percent),
            "budget_entertainment_percent" => Some(&mut self.budget_entertainment_percent),
            "budget_other_percent" => Some(&mut self.budget_other_percent),
            _ => None,
        }
    }

    /// True when no field is supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay the supplied fields onto `prefs`.
    pub fn apply(self, prefs: &mut Preferences, now: DateTime<Utc>) {
        fn overlay<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }
        overlay(&mut prefs.current_savings, self.current_savings);
        overlay(&mut prefs.monthly_expenses, self.monthly_expenses);
        overlay(&mut prefs.emergency_fund_target, self.emergency_fund_target);
        overlay(&mut prefs.monthly_contribution, self.monthly_contribution);
        overlay(&mut prefs.emergency_goal, self.emergency_goal);
        overlay(&mut prefs.budget_housing_percent, self.budget_housing_percent);
        overlay(&mut prefs.budget_food_percent, self.budget_food_percent);
        overlay(
            &mut prefs.budget_transportation_percent,
            self.budget_transportation_percent,
        );
        overlay(&mut prefs.budget_utilities_percent, self.budget_utilities_percent);
        overlay(
            &mut prefs.budget_entertainment_percent,
            self.budget_entertainment_percent,
        );
        overlay(&mut prefs.budget_other_percent, self.budget_other_percent);
        prefs.updated_at = Some(now);
    }
}

fn static_name(names: &[&'static str], field: &str) -> &'static str {
    names.iter().copied().find(|n| *n == field).unwrap_or("value")
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn set_by_wire_name() {
        let mut update = PreferencesUpdate::default();
        update.set("current_savings", "1500.25").unwrap();
        update.set("budget_food_percent", "12.5").unwrap();
        update.set("emergency_goal", "six months").unwrap();
        assert_eq!(update.current_savings, Some(Money::from_cents(150_025)));
        assert_eq!(
            update.budget_food_percent,
            Some(Percent::from_hundredths(1250))
        );
        assert_eq!(update.emergency_goal.as_deref(), Some("six months"));
    }

    #[test]
    fn budget_shares_are_bounded() {
        let mut update = PreferencesUpdate::default();
        assert_eq!(
            update.set("budget_housing_percent", "100.01"),
            Err(PreferencesError::BudgetOutOfRange("budget_housing_percent"))
        );
        assert_eq!(
            update.set("budget_other_percent", "-1"),
            Err(PreferencesError::BudgetOutOfRange("budget_other_percent"))
        );
        assert!(update.set("budget_other_percent", "100").is_ok());
        assert!(update.set("budget_other_percent", "0").is_ok());
        assert_eq!(
            PreferencesError::BudgetOutOfRange("budget_food_percent").to_string(),
            "budget_food_percent must be between 0 and 100"
        );
    }

    #[test]
    fn bad_values_and_fields() {
        let mut update = PreferencesUpdate::default();
        assert_eq!(
            update.set("monthly_expenses", "a lot"),
            Err(PreferencesError::InvalidValue("monthly_expenses"))
        );
        assert!(matches!(
            update.set("favourite_colour", "blue"),
            Err(PreferencesError::UnknownField(_))
        ));
        assert!(update.is_empty());
    }

    #[test]
    fn apply_only_touches_supplied_fields() {
        let mut prefs = Preferences {
            current_savings: Some(Money::from_cents(100)),
            monthly_expenses: Some(Money::from_cents(200)),
            ..Preferences::default()
        };
        let update = PreferencesUpdate {
            monthly_expenses: Some(Money::from_cents(300)),
            budget_housing_percent: Some(Percent::from_hundredths(3000)),
            ..PreferencesUpdate::default()
        };
        update.apply(&mut prefs, now());
        assert_eq!(prefs.current_savings, Some(Money::from_cents(100)));
        assert_eq!(prefs.monthly_expenses, Some(Money::from_cents(300)));
        assert_eq!(
            prefs.budget_housing_percent,
            Some(Percent::from_hundredths(3000))
        );
        assert_eq!(prefs.updated_at, Some(now()));
    }

    #[test]
    fn absent_preferences_serialize_as_nulls() {
        let json = serde_json::to_value(Preferences::default()).unwrap();
        for field in MONEY_FIELDS.iter().chain(&BUDGET_FIELDS).chain(&TEXT_FIELDS) {
            assert!(json[*field].is_null(), "{field}");
        }
    }
}
