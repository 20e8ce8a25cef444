//! # Vault
//!
//! The facade the server talks to.
//!
//! A [`Vault`] owns the [`Store`] and the [`FieldCipher`]. Amounts are sealed
//! on the way in and opened on the way out, so callers only ever handle
//! plaintext [`Money`] and the store only ever handles sealed bytes.
//!
//! Every operation takes the owning [`UserId`]; there is no way to address
//! another user's rows. Time is always passed in.

use crate::cipher::{CipherError, FieldCipher};
use crate::ledger::{DateWindow, Entry, EntryKind, EntryListing, LedgerError, Selector, Summary};
use crate::money::Money;
use crate::password::{self, PasswordError};
use crate::preferences::{Preferences, PreferencesError, PreferencesUpdate};
use crate::profile::{NewUser, ProfileError, ProfileUpdate, RiskTolerance, UserProfile};
use crate::reset::{self, ResetToken};
use crate::storage::{EntryRecord, Store, StoreError, UserRecord};
use crate::watchlist::{NewWatchlistItem, WatchlistError, WatchlistItem};
use crate::{EntryId, UserId, WatchlistId};
use chrono::{DateTime, Utc};
use std::fmt;
use std::num::NonZeroU32;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Preferences(#[from] PreferencesError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Watchlist(#[from] WatchlistError),

    #[error("Email already exists")]
    EmailTaken,

    #[error("Bad credentials")]
    BadCredentials,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("User not found")]
    UnknownUser,

    #[error("Entry not found")]
    UnknownEntry,

    #[error("system random source failed")]
    Random,
}

/// Who a credential or token belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

impl From<&UserRecord> for Account {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: UserId(record.id),
            username: record.username.clone(),
            email: record.email.clone(),
        }
    }
}

/// Encrypted personal-finance storage.
pub struct Vault {
    store: Store,
    cipher: FieldCipher,
    hash_iterations: NonZeroU32,
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault")
            .field("store", &self.store)
            .field("hash_iterations", &self.hash_iterations)
            .finish_non_exhaustive()
    }
}

impl Vault {
    #[must_use]
    pub fn new(store: Store, cipher: FieldCipher) -> Self {
        Self {
            store,
            cipher,
            hash_iterations: password::DEFAULT_ITERATIONS,
        }
    }

    /// Override the PBKDF2 work factor for new hashes.
    #[must_use]
    pub fn with_hash_iterations(mut self, iterations: NonZeroU32) -> Self {
        self.hash_iterations = iterations;
        self
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    fn hash(&self, password: &str) -> Result<String, VaultError> {
        Ok(password::hash_password_with(password, self.hash_iterations)?)
    }

    fn record(&self, id: UserId) -> Result<UserRecord, VaultError> {
        self.store.user(id)?.ok_or(VaultError::UnknownUser)
    }

    // =========================================================================
    // ACCOUNTS
    // =========================================================================

    /// Whether a login name or email is already registered.
    pub fn login_taken(&self, login: &str) -> Result<bool, VaultError> {
        Ok(self.store.user_by_login(login)?.is_some())
    }

    /// Create an account. The password is hashed and the income sealed.
    pub fn register(&self, user: NewUser, now: DateTime<Utc>) -> Result<UserId, VaultError> {
        self.create_account(user, None, now)
    }

    /// Create an account together with its first preferences row, in one commit.
    pub fn register_with_preferences(
        &self,
        user: NewUser,
        initial: PreferencesUpdate,
        now: DateTime<Utc>,
    ) -> Result<UserId, VaultError> {
        let mut prefs = Preferences::default();
        initial.apply(&mut prefs, now);
        self.create_account(user, Some(prefs), now)
    }

    fn create_account(
        &self,
        user: NewUser,
        preferences: Option<Preferences>,
        now: DateTime<Utc>,
    ) -> Result<UserId, VaultError> {
        if user.username.trim().is_empty() || user.password.is_empty() {
            return Err(ProfileError::MissingCredentials.into());
        }
        password::validate_new_password(&user.password)?;
        let password_hash = self.hash(&user.password)?;
        let annual_income = user
            .annual_income
            .map(|income| self.cipher.seal_money(income))
            .transpose()?;
        let stamp = now.timestamp();

        let record = self
            .store
            .insert_user(
                |id| UserRecord {
                    id: id.0,
                    username: user.username,
                    password_hash,
                    email: user.email,
                    full_name: user.full_name,
                    phone: user.phone,
                    age: user.age,
                    occupation: user.occupation,
                    annual_income,
                    financial_goal: user.financial_goal,
                    risk_tolerance: user.risk_tolerance.map(|r| r.as_str().to_string()),
                    reset_digest: None,
                    reset_expires: None,
                    created_at: stamp,
                    updated_at: stamp,
                },
                preferences.as_ref(),
            )
            .map_err(|e| match e {
                StoreError::Conflict(_) => VaultError::EmailTaken,
                other => other.into(),
            })?;
        Ok(UserId(record.id))
    }

    /// Check a login name (or email) and password.
    ///
    /// Unknown users and wrong passwords fail the same way.
    pub fn authenticate(&self, login: &str, password: &str) -> Result<Account, VaultError> {
        let record = self
            .store
            .user_by_login(login)?
            .ok_or(VaultError::BadCredentials)?;
        if !password::verify_password(password, &record.password_hash) {
            return Err(VaultError::BadCredentials);
        }
        Ok(Account::from(&record))
    }

    /// The account behind an id.
    pub fn account(&self, id: UserId) -> Result<Account, VaultError> {
        Ok(Account::from(&self.record(id)?))
    }

    // =========================================================================
    // PROFILE
    // =========================================================================

    /// The decrypted profile. An income that fails to open reads as unset
    /// and sets [`UserProfile::income_unreadable`].
    pub fn profile(&self, id: UserId) -> Result<UserProfile, VaultError> {
        let record = self.record(id)?;
        let (annual_income, income_unreadable) = match &record.annual_income {
            Some(sealed) => match self.cipher.open_money(sealed) {
                Ok(income) => (Some(income), false),
                Err(_) => (None, true),
            },
            None => (None, false),
        };
        Ok(UserProfile {
            id,
            username: record.username,
            email: record.email,
            full_name: record.full_name,
            phone: record.phone,
            age: record.age,
            occupation: record.occupation,
            annual_income,
            income_unreadable,
            financial_goal: record.financial_goal,
            risk_tolerance: record.risk_tolerance.map(RiskTolerance::new),
            created_at: timestamp(record.created_at),
            updated_at: timestamp(record.updated_at),
        })
    }

    /// Apply a partial profile update. Returns `false` when nothing was supplied.
    pub fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<bool, VaultError> {
        if update.is_empty() {
            return Ok(false);
        }
        let sealed_income = update
            .annual_income
            .map(|income| self.cipher.seal_money(income))
            .transpose()?;
        self.store
            .update_user(id, |record| {
                if let Some(v) = update.full_name {
                    record.full_name = Some(v);
                }
                if let Some(v) = update.phone {
                    record.phone = Some(v);
                }
                if let Some(v) = update.age {
                    record.age = Some(v);
                }
                if let Some(v) = update.occupation {
                    record.occupation = Some(v);
                }
                if let Some(v) = sealed_income {
                    record.annual_income = Some(v);
                }
                if let Some(v) = update.financial_goal {
                    record.financial_goal = Some(v);
                }
                if let Some(v) = update.risk_tolerance {
                    record.risk_tolerance = Some(v.as_str().to_string());
                }
                record.updated_at = now.timestamp();
            })
            .map_err(not_found_as(VaultError::UnknownUser))?;
        Ok(true)
    }

    /// Set the risk tolerance alone.
    pub fn set_risk_tolerance(
        &self,
        id: UserId,
        tolerance: RiskTolerance,
        now: DateTime<Utc>,
    ) -> Result<(), VaultError> {
        let update = ProfileUpdate {
            risk_tolerance: Some(tolerance),
            ..ProfileUpdate::default()
        };
        self.update_profile(id, update, now).map(|_| ())
    }

    // =========================================================================
    // PREFERENCES
    // =========================================================================

    /// Stored preferences, if any.
    pub fn preferences(&self, id: UserId) -> Result<Option<Preferences>, VaultError> {
        Ok(self.store.preferences(id)?)
    }

    /// Overlay an update onto the stored preferences, creating the row if needed.
    pub fn update_preferences(
        &self,
        id: UserId,
        update: PreferencesUpdate,
        now: DateTime<Utc>,
    ) -> Result<Preferences, VaultError> {
        Ok(self
            .store
            .upsert_preferences(id, |prefs| update.apply(prefs, now))?)
    }

    // =========================================================================
    // LEDGER
    // =========================================================================

    /// Record an amount in one of the user's ledgers.
    pub fn add_entry(
        &self,
        user: UserId,
        kind: EntryKind,
        amount: Money,
        now: DateTime<Utc>,
    ) -> Result<Entry, VaultError> {
        let sealed = self.cipher.seal_money(amount)?;
        let record = self
            .store
            .insert_entry(user, kind, sealed, now.timestamp())?;
        Ok(Entry {
            id: EntryId(record.id),
            kind,
            amount,
            created_at: timestamp(record.created_at),
        })
    }

    /// One ledger, in id order, with unreadable rows counted and skipped.
    pub fn list_entries(&self, user: UserId, kind: EntryKind) -> Result<EntryListing, VaultError> {
        let records = self.store.entries(user)?;
        Ok(self.open_records(records.into_iter().filter(|r| r.kind == kind)))
    }

    /// Replace the amount of an entry.
    pub fn update_entry(
        &self,
        user: UserId,
        kind: EntryKind,
        id: EntryId,
        amount: Money,
    ) -> Result<(), VaultError> {
        let sealed = self.cipher.seal_money(amount)?;
        self.store
            .update_entry(user, kind, id, sealed)
            .map_err(not_found_as(VaultError::UnknownEntry))
    }

    /// Delete an entry.
    pub fn delete_entry(&self, user: UserId, kind: EntryKind, id: EntryId) -> Result<(), VaultError> {
        self.store
            .delete_entry(user, kind, id)
            .map_err(not_found_as(VaultError::UnknownEntry))
    }

    /// Rows for export: the selected kinds in order income, expense, saving,
    /// each sorted by creation time, restricted to the window.
    pub fn fetch_rows(
        &self,
        user: UserId,
        selector: Selector,
        window: &DateWindow,
    ) -> Result<EntryListing, VaultError> {
        let kinds = selector.kinds();
        let records = self.store.entries(user)?;
        let mut listing = self.open_records(records.into_iter().filter(|r| kinds.contains(&r.kind)));
        listing.entries.retain(|e| window.contains(e.created_at));
        listing
            .entries
            .sort_by_key(|e| (e.kind, e.created_at, e.id));
        Ok(listing)
    }

    /// Totals over every kind in the window, plus the unreadable row count.
    pub fn summary(&self, user: UserId, window: &DateWindow) -> Result<(Summary, usize), VaultError> {
        let listing = self.fetch_rows(user, Selector::All, window)?;
        Ok((Summary::from_entries(&listing.entries), listing.unreadable))
    }

    fn open_records(&self, records: impl Iterator<Item = EntryRecord>) -> EntryListing {
        let mut listing = EntryListing::default();
        for record in records {
            let opened = self.cipher.open_money(&record.amount).ok();
            let created_at = DateTime::from_timestamp(record.created_at, 0);
            match (opened, created_at) {
                (Some(amount), Some(created_at)) => listing.entries.push(Entry {
                    id: EntryId(record.id),
                    kind: record.kind,
                    amount,
                    created_at,
                }),
                _ => listing.unreadable += 1,
            }
        }
        listing
    }

    // =========================================================================
    // WATCHLIST
    // =========================================================================

    pub fn watchlist(&self, user: UserId) -> Result<Vec<WatchlistItem>, VaultError> {
        Ok(self.store.watchlist(user)?)
    }

    pub fn add_watch(
        &self,
        user: UserId,
        item: NewWatchlistItem,
        now: DateTime<Utc>,
    ) -> Result<WatchlistItem, VaultError> {
        self.store
            .insert_watch(user, |id| WatchlistItem {
                id,
                ticker: item.ticker,
                stock_name: item.stock_name,
                current_price: item.current_price,
                notes: item.notes,
                added_at: now,
            })
            .map_err(|e| match e {
                StoreError::Conflict(_) => WatchlistError::Duplicate.into(),
                other => other.into(),
            })
    }

    pub fn remove_watch(&self, user: UserId, id: WatchlistId) -> Result<(), VaultError> {
        self.store.remove_watch(user, id).map_err(|e| match e {
            StoreError::NotFound => WatchlistError::NotFound.into(),
            other => other.into(),
        })
    }

    // =========================================================================
    // PASSWORD RESET
    // =========================================================================

    /// Issue a reset token for the account with this email.
    ///
    /// `None` when no account matches; callers must not reveal which.
    pub fn issue_reset_token(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<(ResetToken, Account)>, VaultError> {
        let Some(record) = self.store.user_by_email(email)? else {
            return Ok(None);
        };
        let token = ResetToken::generate().ok_or(VaultError::Random)?;
        let expires = reset::expiry_for(now).timestamp();
        self.store
            .set_reset_token(UserId(record.id), &token.digest(), expires)?;
        Ok(Some((token, Account::from(&record))))
    }

    /// The account a live reset token belongs to.
    pub fn verify_reset_token(&self, token: &str, now: DateTime<Utc>) -> Result<Account, VaultError> {
        let digest = reset::token_digest(token);
        let record = self
            .store
            .user_by_reset_digest(&digest)?
            .ok_or(VaultError::InvalidResetToken)?;
        let stored_matches = record
            .reset_digest
            .as_deref()
            .is_some_and(|stored| reset::digests_match(stored, &digest));
        let live = record
            .reset_expires
            .is_some_and(|expires| now.timestamp() < expires);
        if !stored_matches || !live {
            return Err(VaultError::InvalidResetToken);
        }
        Ok(Account::from(&record))
    }

    /// Set a new password with a live token, consuming the token.
    pub fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> Result<Account, VaultError> {
        password::validate_new_password(new_password)?;
        let account = self.verify_reset_token(token, now)?;
        let hash = self.hash(new_password)?;
        // Hashing ran outside any transaction; the token is re-checked and
        // consumed atomically here.
        self.store
            .complete_reset(&reset::token_digest(token), hash, now.timestamp())?
            .ok_or(VaultError::InvalidResetToken)?;
        Ok(account)
    }

    // =========================================================================
    // SESSION REVOCATION
    // =========================================================================

    /// Revoke a session token id until it would have expired anyway.
    pub fn revoke_token(&self, jti: &str, expires: i64) -> Result<(), VaultError> {
        Ok(self.store.revoke(jti, expires)?)
    }

    pub fn is_token_revoked(&self, jti: &str) -> Result<bool, VaultError> {
        Ok(self.store.is_revoked(jti)?)
    }

    /// Forget revocations for tokens that have expired.
    pub fn purge_revoked(&self, now: DateTime<Utc>) -> Result<usize, VaultError> {
        Ok(self.store.purge_revoked(now.timestamp())?)
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

fn not_found_as(replacement: VaultError) -> impl FnOnce(StoreError) -> VaultError {
    move |e| match e {
        StoreError::NotFound => replacement,
        other => other.into(),
    }
}

// =============================================================================
// TESTS
// =============================================================================
