//! # Ledger Module
//!
//! Income, expense and savings entries, and the summaries built from them.
//!
//! Amounts are stored sealed (see [`crate::cipher`]); the types here are the
//! decrypted view. Rows that fail to decrypt are never surfaced: listings
//! count them in [`EntryListing::unreadable`] so the caller can report them.

use crate::EntryId;
use crate::money::Money;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("type must be one of incomes|expenses|savings|all")]
    UnknownSelector(String),

    #[error("unknown entry kind: {0}")]
    UnknownKind(String),

    #[error("Missing amount")]
    MissingAmount,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

// =============================================================================
// ENTRY KIND
// =============================================================================

/// The three ledgers a user keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Income,
    Expense,
    Saving,
}

impl EntryKind {
    /// All kinds, in export order.
    pub const ALL: [EntryKind; 3] = [EntryKind::Income, EntryKind::Expense, EntryKind::Saving];

    /// Singular name, as used in exports (`income`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Income => "income",
            EntryKind::Expense => "expense",
            EntryKind::Saving => "saving",
        }
    }

    /// Plural collection name (`incomes`).
    #[must_use]
    pub fn plural(self) -> &'static str {
        match self {
            EntryKind::Income => "incomes",
            EntryKind::Expense => "expenses",
            EntryKind::Saving => "savings",
        }
    }

    /// Parse a singular or plural name, case-insensitively.
    pub fn parse(input: &str) -> Result<Self, LedgerError> {
        let lowered = input.trim().to_ascii_lowercase();
        EntryKind::ALL
            .into_iter()
            .find(|kind| lowered == kind.as_str() || lowered == kind.plural())
            .ok_or_else(|| LedgerError::UnknownKind(input.to_string()))
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which ledgers an export or query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    All,
    Only(EntryKind),
}

impl Selector {
    /// Parse `all` or any entry kind name.
    pub fn parse(input: &str) -> Result<Self, LedgerError> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Selector::All);
        }
        EntryKind::parse(trimmed)
            .map(Selector::Only)
            .map_err(|_| LedgerError::UnknownSelector(input.to_string()))
    }

    /// Kinds covered, in export order.
    #[must_use]
    pub fn kinds(self) -> Vec<EntryKind> {
        match self {
            Selector::All => EntryKind::ALL.to_vec(),
            Selector::Only(kind) => vec![kind],
        }
    }
}

// =============================================================================
// ENTRIES
// =============================================================================

/// A decrypted ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub id: EntryId,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
}

/// Decrypted entries plus the number of rows that could not be opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryListing {
    pub entries: Vec<Entry>,
    pub unreadable: usize,
}

/// Parse an amount given as text, rejecting empty input.
pub fn parse_amount(text: Option<&str>) -> Result<Money, LedgerError> {
    let text = text
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(LedgerError::MissingAmount)?;
    Money::parse(text).map_err(|e| LedgerError::InvalidAmount(e.to_string()))
}

// =============================================================================
// DATE WINDOWS
// =============================================================================

/// Half-open time window `[start, end)`; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateWindow {
    /// Build a window from optional bounds.
    #[must_use]
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Whether `at` falls inside the window.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| at >= start) && self.end.is_none_or(|end| at < end)
    }

    /// True when neither bound is set.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Human label: `All time` or `YYYY-MM-DD to YYYY-MM-DD`, `...` for an open side.
    #[must_use]
    pub fn label(&self) -> String {
        if self.is_unbounded() {
            return String::from("All time");
        }
        let side = |bound: Option<DateTime<Utc>>| {
            bound
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| String::from("..."))
        };
        format!("{} to {}", side(self.start), side(self.end))
    }
}

/// Parse a query-string date: `YYYY-MM-DD` (midnight UTC), RFC 3339, or a
/// naive `YYYY-MM-DDTHH:MM:SS` taken as UTC. Anything else is `None`.
#[must_use]
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if s.len() == 10 {
        return NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}

// =============================================================================
// SUMMARY
// =============================================================================

/// Totals and counts per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_income: Money,
    pub total_expense: Money,
    pub total_saving: Money,
    pub net: Money,
    pub count_income: usize,
    pub count_expense: usize,
    pub count_saving: usize,
}

impl Summary {
    /// Summarize a set of entries. `net` is income minus expenses.
    #[must_use]
    pub fn from_entries(entries: &[Entry]) -> Self {
        let mut summary = Self::default();
        for entry in entries {
            match entry.kind {
                EntryKind::Income => {
                    summary.total_income = summary.total_income.saturating_add(entry.amount);
                    summary.count_income += 1;
                }
                EntryKind::Expense => {
                    summary.total_expense = summary.total_expense.saturating_add(entry.amount);
                    summary.count_expense += 1;
                }
                EntryKind::Saving => {
                    summary.total_saving = summary.total_saving.saturating_add(entry.amount);
                    summary.count_saving += 1;
                }
            }
        }
        summary.net = summary.total_income.saturating_sub(summary.total_expense);
        summary
    }
}

// =============================================================================
// TESTS
// =============================================================================
