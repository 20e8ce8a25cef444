//! Per-user stock watchlist.

use crate::WatchlistId;
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest accepted ticker.
pub const MAX_TICKER_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchlistError {
    #[error("Ticker is required")]
    MissingTicker,

    #[error("Ticker must be at most {MAX_TICKER_LEN} characters")]
    TickerTooLong,

    #[error("Ticker may only contain letters, digits, '.' and '-'")]
    InvalidTicker,

    #[error("Stock already in watchlist")]
    Duplicate,

    #[error("Watchlist item not found")]
    NotFound,
}

/// A stored watchlist row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistItem {
    pub id: WatchlistId,
    #[serde(rename = "stock_ticker")]
    pub ticker: String,
    pub stock_name: Option<String>,
    pub current_price: Option<Money>,
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// Input for adding a watchlist row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWatchlistItem {
    pub ticker: String,
    pub stock_name: Option<String>,
    pub current_price: Option<Money>,
    pub notes: Option<String>,
}

impl NewWatchlistItem {
    /// Validate and upper-case a ticker.
    pub fn new(ticker: &str) -> Result<Self, WatchlistError> {
        Ok(Self {
            ticker: normalize_ticker(ticker)?,
            stock_name: None,
            current_price: None,
            notes: None,
        })
    }
}

/// Upper-case and validate a ticker symbol.
pub fn normalize_ticker(ticker: &str) -> Result<String, WatchlistError> {
    let ticker = ticker.trim();
    if ticker.is_empty() {
        return Err(WatchlistError::MissingTicker);
    }
    if ticker.chars().count() > MAX_TICKER_LEN {
        return Err(WatchlistError::TickerTooLong);
    }
    if !ticker
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(WatchlistError::InvalidTicker);
    }
    Ok(ticker.to_ascii_uppercase())
}
