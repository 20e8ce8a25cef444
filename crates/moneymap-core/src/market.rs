//! # Market Module
//!
//! A fixed catalog of fifteen stocks in three risk tiers, and the arithmetic
//! used to score them. There is no market data feed: prices only move through
//! [`simulate_prices`], and nothing here is persisted.
//!
//! All figures are fixed-point. Beta and volatility are [`Factor`]s
//! (hundredths), dividend yield and predicted return are [`Percent`]s, and
//! the risk score is a [`Factor`] on a 0..=10 scale with one significant
//! decimal.

use crate::money::{Factor, Money, Percent};
use rand::Rng;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketError {
    #[error("Stock not found: {0}")]
    UnknownTicker(String),
}

// =============================================================================
// TIERS AND CATEGORIES
// =============================================================================

/// Risk tier of a catalog stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Conservative,
    Moderate,
    Aggressive,
}

impl Tier {
    /// Tier for a risk level: 1..=3 conservative, 4..=7 moderate, else aggressive.
    #[must_use]
    pub fn for_level(level: u8) -> Self {
        match level {
            0..=3 => Tier::Conservative,
            4..=7 => Tier::Moderate,
            _ => Tier::Aggressive,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Conservative => "conservative",
            Tier::Moderate => "moderate",
            Tier::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad asset class shown next to a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Stocks,
    Bonds,
    Etf,
    Crypto,
}

impl AssetCategory {
    /// Classify by ticker, name and sector.
    #[must_use]
    pub fn classify(ticker: &str, name: &str, sector: &str) -> Self {
        let ticker = ticker.to_ascii_uppercase();
        if matches!(ticker.as_str(), "BTC" | "ETH")
            || name.contains("Bitcoin")
            || name.contains("Ethereum")
        {
            AssetCategory::Crypto
        } else if name.contains("ETF") || matches!(ticker.as_str(), "SPY" | "VTI" | "VXUS" | "BND") {
            AssetCategory::Etf
        } else if sector == "Bonds" || name.contains("Bond") {
            AssetCategory::Bonds
        } else {
            AssetCategory::Stocks
        }
    }
}

/// Tier implied by beta and volatility alone.
#[must_use]
pub fn categorize(beta: Factor, volatility: Factor) -> Tier {
    let (b, v) = (beta.hundredths(), volatility.hundredths());
    if b < 80 && v < 25 {
        Tier::Conservative
    } else if b > 120 && v > 50 {
        Tier::Aggressive
    } else {
        Tier::Moderate
    }
}

// =============================================================================
// CATALOG
// =============================================================================

struct Listing {
    tier: Tier,
    ticker: &'static str,
    name: &'static str,
    /// cents
    price: i64,
    /// hundredths
    beta: i64,
    /// hundredths
    volatility: i64,
    /// hundredths of a percent
    dividend_yield: i64,
    sector: &'static str,
}

const fn listing(
    tier: Tier,
    ticker: &'static str,
    name: &'static str,
    price: i64,
    beta: i64,
    volatility: i64,
    dividend_yield: i64,
    sector: &'static str,
) -> Listing {
    Listing {
        tier,
        ticker,
        name,
        price,
        beta,
        volatility,
        dividend_yield,
        sector,
    }
}

use Tier::{Aggressive as A, Conservative as C, Moderate as M};

static CATALOG: [Listing; 15] = [
    listing(C, "AAPL", "Apple Inc.", 17_850, 115, 22, 52, "Technology"),
    listing(C, "MSFT", "Microsoft Corporation", 37_885, 90, 25, 75, "Technology"),
    listing(C, "JNJ", "Johnson & Johnson", 15_530, 60, 18, 312, "Healthcare"),
    listing(C, "VZ", "Verizon Communications", 4_120, 45, 15, 680, "Telecommunications"),
    listing(C, "KO", "The Coca-Cola Company", 5_985, 55, 16, 315, "Consumer Staples"),
    listing(M, "GOOGL", "Alphabet Inc.", 14_230, 105, 30, 0, "Technology"),
    listing(M, "AMZN", "Amazon.com Inc.", 14_680, 118, 35, 0, "Consumer Discretionary"),
    listing(M, "META", "Meta Platforms Inc.", 38_350, 125, 40, 50, "Technology"),
    listing(M, "DIS", "The Walt Disney Company", 9_620, 130, 32, 45, "Entertainment"),
    listing(M, "NFLX", "Netflix Inc.", 48_540, 145, 45, 0, "Entertainment"),
    listing(A, "TSLA", "Tesla Inc.", 24_860, 185, 65, 0, "Automotive"),
    listing(A, "NVDA", "NVIDIA Corporation", 87_840, 165, 55, 3, "Technology"),
    listing(A, "AMD", "Advanced Micro Devices", 15_120, 170, 60, 0, "Technology"),
    listing(A, "RIVN", "Rivian Automotive", 1_485, 210, 75, 0, "Automotive"),
    listing(A, "SNOW", "Snowflake Inc.", 17_890, 155, 58, 0, "Technology"),
];

// =============================================================================
// SCORING
// =============================================================================

/// Integer division rounding to nearest, ties to even. `denominator > 0`.
fn div_round(numerator: i64, denominator: i64) -> i64 {
    let quotient = numerator.div_euclid(denominator);
    let twice_rem = 2 * numerator.rem_euclid(denominator);
    if twice_rem > denominator || (twice_rem == denominator && quotient % 2 != 0) {
        quotient + 1
    } else {
        quotient
    }
}

/// Risk score on 0..=10, one decimal.
///
/// `(min(beta, 3) / 3 * 0.6 + min(vol, 1) * 0.4) * 10`
#[must_use]
pub fn risk_score(beta: Factor, volatility: Factor) -> Factor {
    let b = beta.hundredths().min(300);
    let v = volatility.hundredths().min(100);
    // 2*b + 4*v is the score in hundredths; keep one decimal.
    let tenths = div_round(2 * b + 4 * v, 10);
    Factor::from_hundredths(tenths * 10)
}

/// Predicted one-year return in percent, one decimal.
///
/// `vol * 30 + (beta - 1) * 5 + dividend_yield * 2`, capped at 12% for
/// beta below 0.8, 40% for beta above 1.5 and 20% otherwise.
#[must_use]
pub fn predicted_return(beta: Factor, volatility: Factor, dividend_yield: Percent) -> Percent {
    let b = beta.hundredths();
    let raw = 30 * volatility.hundredths() + 5 * (b - 100) + 2 * dividend_yield.hundredths();
    let cap = if b < 80 {
        1_200
    } else if b > 150 {
        4_000
    } else {
        2_000
    };
    let tenths = div_round(raw.min(cap), 10);
    Percent::from_hundredths(tenths * 10)
}

// =============================================================================
// STOCKS
// =============================================================================

/// A catalog stock with its computed figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stock {
    pub ticker: &'static str,
    pub name: &'static str,
    pub current_price: Money,
    pub beta: Factor,
    pub volatility: Factor,
    pub dividend_yield: Percent,
    pub sector: &'static str,
    pub tier: Tier,
    pub category: AssetCategory,
    pub predicted_return_1yr: Percent,
    pub risk_score: Factor,
}

impl Stock {
    fn from_listing(listing: &Listing) -> Self {
        let beta = Factor::from_hundredths(listing.beta);
        let volatility = Factor::from_hundredths(listing.volatility);
        let dividend_yield = Percent::from_hundredths(listing.dividend_yield);
        Self {
            ticker: listing.ticker,
            name: listing.name,
            current_price: Money::from_cents(listing.price),
            beta,
            volatility,
            dividend_yield,
            sector: listing.sector,
            tier: listing.tier,
            category: AssetCategory::classify(listing.ticker, listing.name, listing.sector),
            predicted_return_1yr: predicted_return(beta, volatility, dividend_yield),
            risk_score: risk_score(beta, volatility),
        }
    }
}

/// Every catalog stock, in catalog order.
#[must_use]
pub fn catalog() -> Vec<Stock> {
    CATALOG.iter().map(Stock::from_listing).collect()
}

/// Recommendations for a risk level, best predicted return first.
///
/// Ties keep catalog order.
#[must_use]
pub fn recommendations(level: u8) -> Vec<Stock> {
    let tier = Tier::for_level(level);
    let mut stocks: Vec<Stock> = CATALOG
        .iter()
        .filter(|l| l.tier == tier)
        .map(Stock::from_listing)
        .collect();
    stocks.sort_by(|a, b| b.predicted_return_1yr.cmp(&a.predicted_return_1yr));
    stocks
}

/// Look up one stock by ticker, ignoring case.
pub fn stock_details(ticker: &str) -> Result<Stock, MarketError> {
    let wanted = ticker.trim();
    CATALOG
        .iter()
        .find(|l| l.ticker.eq_ignore_ascii_case(wanted))
        .map(Stock::from_listing)
        .ok_or_else(|| MarketError::UnknownTicker(wanted.to_string()))
}

/// A simulated price tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    pub ticker: &'static str,
    pub current_price: Money,
}

/// Largest simulated move, in basis points.
const MAX_MOVE_BP: i64 = 200;

/// Move every catalog price by up to ±2%, never below one cent.
pub fn simulate_prices<R: Rng + ?Sized>(rng: &mut R) -> Vec<PriceQuote> {
    CATALOG
        .iter()
        .map(|l| {
            let bp = rng.gen_range(-MAX_MOVE_BP..=MAX_MOVE_BP);
            let moved = l.price + l.price * bp / 10_000;
            PriceQuote {
                ticker: l.ticker,
                current_price: Money::from_cents(moved.max(1)),
            }
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
