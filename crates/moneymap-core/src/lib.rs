//! # MoneyMap Core
//!
//! The encrypted personal-finance ledger behind the MoneyMap server.
//!
//! This crate is synchronous and network-free. The HTTP surface lives in
//! `apps/moneymap`; everything it persists or computes goes through here.
//!
//! ## Layout
//!
//! - [`money`]: fixed-point amounts (cents) and percentages (hundredths)
//! - [`cipher`]: field-level AES-256-GCM sealing of financial figures
//! - [`password`]: PBKDF2 password hashing
//! - [`reset`]: password reset tokens
//! - [`storage`]: redb tables with postcard-encoded records
//! - [`vault`]: the facade the server talks to
//! - [`ledger`], [`profile`], [`preferences`], [`watchlist`]: domain types and validation
//! - [`market`]: mock stock catalog and scoring
//! - [`formats`]: CSV and PDF export

pub mod cipher;
pub mod formats;
pub mod ledger;
pub mod market;
pub mod money;
pub mod password;
pub mod preferences;
pub mod profile;
pub mod reset;
pub mod storage;
pub mod vault;
pub mod watchlist;

pub use cipher::{CipherError, FieldCipher};
pub use ledger::{DateWindow, Entry, EntryKind, EntryListing, LedgerError, Selector, Summary};
pub use market::{AssetCategory, MarketError, PriceQuote, Stock, Tier};
pub use money::{Factor, Money, MoneyError, Percent};
pub use preferences::{Preferences, PreferencesError, PreferencesUpdate};
pub use profile::{NewUser, ProfileError, ProfileUpdate, RiskTolerance, UserProfile};
pub use reset::ResetToken;
pub use storage::{Store, StoreError};
pub use vault::{Vault, VaultError};
pub use watchlist::{NewWatchlistItem, WatchlistError, WatchlistItem};

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Identifier of a ledger entry (unique across all kinds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

/// Identifier of a watchlist row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WatchlistId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for WatchlistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
