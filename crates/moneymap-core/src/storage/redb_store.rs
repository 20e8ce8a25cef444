//! # redb Store
//!
//! Table layout:
//!
//! | Table | Key | Value |
//! |-------|-----|-------|
//! | `meta` | name | `u64` (sequences, schema version) |
//! | `users` | user id | [`UserRecord`] |
//! | `users_by_email` | lower-cased email | user id |
//! | `users_by_username` | lower-cased username | user id |
//! | `reset_tokens` | token digest | user id |
//! | `entries` | (user id, entry id) | [`EntryRecord`] |
//! | `preferences` | user id | [`Preferences`] |
//! | `watchlist` | (user id, item id) | [`WatchlistItem`] |
//! | `revoked_tokens` | jti | expiry, unix seconds |
//!
//! Everything a user owns is keyed by user id first, so per-user scans are
//! range reads and another user's rows are unreachable by construction.

use super::{EntryRecord, SCHEMA_VERSION, StoreError, UserRecord};
use crate::ledger::EntryKind;
use crate::preferences::Preferences;
use crate::reset::digests_match;
use crate::watchlist::WatchlistItem;
use crate::{EntryId, UserId, WatchlistId};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::Path;

// =============================================================================
// TABLE DEFINITIONS
// =============================================================================

const META: TableDefinition<&str, u64> = TableDefinition::new("meta");
const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");
const USERS_BY_EMAIL: TableDefinition<&str, u64> = TableDefinition::new("users_by_email");
const USERS_BY_USERNAME: TableDefinition<&str, u64> = TableDefinition::new("users_by_username");
const RESET_TOKENS: TableDefinition<&str, u64> = TableDefinition::new("reset_tokens");
const ENTRIES: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("entries");
const PREFERENCES: TableDefinition<u64, &[u8]> = TableDefinition::new("preferences");
const WATCHLIST: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("watchlist");
const REVOKED_TOKENS: TableDefinition<&str, i64> = TableDefinition::new("revoked_tokens");

const KEY_SCHEMA: &str = "schema_version";
const SEQ_USERS: &str = "seq:users";
const SEQ_ENTRIES: &str = "seq:entries";
const SEQ_WATCHLIST: &str = "seq:watchlist";

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    Ok(postcard::to_allocvec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    Ok(postcard::from_bytes(bytes)?)
}

fn index_key(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Bump a named sequence and return the new value. Ids start at 1.
fn next_id(txn: &WriteTransaction, sequence: &str) -> Result<u64, StoreError> {
    let mut meta = txn.open_table(META)?;
    let current = meta.get(sequence)?.map(|g| g.value()).unwrap_or(0);
    let next = current
        .checked_add(1)
        .ok_or_else(|| StoreError::Invalid(format!("sequence {sequence} exhausted")))?;
    meta.insert(sequence, next)?;
    Ok(next)
}

// =============================================================================
// STORE
// =============================================================================

/// The MoneyMap database.
pub struct Store {
    db: Database,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    /// Open or create a database file, creating any missing tables.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref())?;
        Self::init(db)
    }

    /// A throwaway in-memory database.
    pub fn in_memory() -> Result<Self, StoreError> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> Result<Self, StoreError> {
        let txn = db.begin_write()?;
        {
            let mut meta = txn.open_table(META)?;
            let version = meta.get(KEY_SCHEMA)?.map(|g| g.value());
            match version {
                None => {
                    meta.insert(KEY_SCHEMA, SCHEMA_VERSION)?;
                }
                Some(v) if v == SCHEMA_VERSION => {}
                Some(v) => {
                    return Err(StoreError::Invalid(format!(
                        "unsupported schema version {v} (expected {SCHEMA_VERSION})"
                    )));
                }
            }
            txn.open_table(USERS)?;
            txn.open_table(USERS_BY_EMAIL)?;
            txn.open_table(USERS_BY_USERNAME)?;
            txn.open_table(RESET_TOKENS)?;
            txn.open_table(ENTRIES)?;
            txn.open_table(PREFERENCES)?;
            txn.open_table(WATCHLIST)?;
            txn.open_table(REVOKED_TOKENS)?;
        }
        txn.commit()?;
        Ok(Self { db })
    }

    /// Stored schema version.
    pub fn schema_version(&self) -> Result<u64, StoreError> {
        let txn = self.db.begin_read()?;
        let meta = txn.open_table(META)?;
        let version = meta.get(KEY_SCHEMA)?.map(|g| g.value());
        version.ok_or(StoreError::NotFound)
    }

    /// Number of registered users.
    pub fn user_count(&self) -> Result<u64, StoreError> {
        let txn = self.db.begin_read()?;
        let users = txn.open_table(USERS)?;
        Ok(users.len()?)
    }

    // =========================================================================
    // USERS
    // =========================================================================

    /// Insert a user built from its new id, along with its first preferences
    /// row when one is given. Both land in the same commit.
    ///
    /// Fails with [`StoreError::Conflict`] when the email or username is taken.
    pub fn insert_user(
        &self,
        build: impl FnOnce(UserId) -> UserRecord,
        preferences: Option<&Preferences>,
    ) -> Result<UserRecord, StoreError> {
        let txn = self.db.begin_write()?;
        let id = next_id(&txn, SEQ_USERS)?;
        let record = build(UserId(id));
        {
            let email_key = index_key(&record.email);
            let username_key = index_key(&record.username);

            let mut by_email = txn.open_table(USERS_BY_EMAIL)?;
            let mut by_username = txn.open_table(USERS_BY_USERNAME)?;
            if by_email.get(email_key.as_str())?.is_some()
                || by_username.get(username_key.as_str())?.is_some()
                || by_username.get(email_key.as_str())?.is_some()
            {
                return Err(StoreError::Conflict("Email already exists"));
            }
            by_email.insert(email_key.as_str(), id)?;
            by_username.insert(username_key.as_str(), id)?;

            let mut users = txn.open_table(USERS)?;
            users.insert(id, encode(&record)?.as_slice())?;

            if let Some(initial) = preferences {
                let mut prefs = txn.open_table(PREFERENCES)?;
                prefs.insert(id, encode(initial)?.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(record)
    }

    /// Fetch a user by id.
    pub fn user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let txn = self.db.begin_read()?;
        let users = txn.open_table(USERS)?;
        let found = match users.get(id.0)? {
            Some(guard) => Some(decode(guard.value())?),
            None => None,
        };
        Ok(found)
    }

    /// Fetch a user by username, falling back to email.
    pub fn user_by_login(&self, login: &str) -> Result<Option<UserRecord>, StoreError> {
        let key = index_key(login);
        let id = {
            let txn = self.db.begin_read()?;
            let by_username = txn.open_table(USERS_BY_USERNAME)?;
            let by_email = txn.open_table(USERS_BY_EMAIL)?;
            let by_name = by_username.get(key.as_str())?.map(|g| g.value());
            let by_mail = by_email.get(key.as_str())?.map(|g| g.value());
            by_name.or(by_mail)
        };
        match id {
            Some(id) => self.user(UserId(id)),
            None => Ok(None),
        }
    }

    /// Fetch a user by email.
    pub fn user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let key = index_key(email);
        let id = {
            let txn = self.db.begin_read()?;
            let by_email = txn.open_table(USERS_BY_EMAIL)?;
            let id = by_email.get(key.as_str())?.map(|g| g.value());
            id
        };
        match id {
            Some(id) => self.user(UserId(id)),
            None => Ok(None),
        }
    }

    /// Modify a user record in place.
    pub fn update_user(
        &self,
        id: UserId,
        change: impl FnOnce(&mut UserRecord),
    ) -> Result<UserRecord, StoreError> {
        let txn = self.db.begin_write()?;
        let record = {
            let mut users = txn.open_table(USERS)?;
            let mut record: UserRecord = match users.get(id.0)? {
                Some(guard) => decode(guard.value())?,
                None => return Err(StoreError::NotFound),
            };
            change(&mut record);
            users.insert(id.0, encode(&record)?.as_slice())?;
            record
        };
        txn.commit()?;
        Ok(record)
    }

    // =========================================================================
    // RESET TOKENS
    // =========================================================================

    /// Record a reset token digest for a user, replacing any earlier one.
    pub fn set_reset_token(&self, id: UserId, digest: &str, expires: i64) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut users = txn.open_table(USERS)?;
            let mut record: UserRecord = match users.get(id.0)? {
                Some(guard) => decode(guard.value())?,
                None => return Err(StoreError::NotFound),
            };
            let mut tokens = txn.open_table(RESET_TOKENS)?;
            if let Some(old) = record.reset_digest.take() {
                tokens.remove(old.as_str())?;
            }
            tokens.insert(digest, id.0)?;
            record.reset_digest = Some(digest.to_string());
            record.reset_expires = Some(expires);
            users.insert(id.0, encode(&record)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// The user a reset digest was issued to.
    pub fn user_by_reset_digest(&self, digest: &str) -> Result<Option<UserRecord>, StoreError> {
        let id = {
            let txn = self.db.begin_read()?;
            let tokens = txn.open_table(RESET_TOKENS)?;
            let id = tokens.get(digest)?.map(|g| g.value());
            id
        };
        match id {
            Some(id) => self.user(UserId(id)),
            None => Ok(None),
        }
    }

    /// Consume a live reset token: set the new password hash and clear the
    /// token in one write transaction.
    ///
    /// Returns `None`, changing nothing, when the digest is unknown, was
    /// superseded, or expired at or before `now`. Write transactions are
    /// serialized, so of two racing calls with the same digest at most one
    /// sees it live.
    pub fn complete_reset(
        &self,
        digest: &str,
        password_hash: String,
        now: i64,
    ) -> Result<Option<UserId>, StoreError> {
        let txn = self.db.begin_write()?;
        let id = {
            let mut tokens = txn.open_table(RESET_TOKENS)?;
            let holder = tokens.get(digest)?.map(|g| g.value());
            let Some(id) = holder else {
                return Ok(None);
            };
            let mut users = txn.open_table(USERS)?;
            let mut record: UserRecord = match users.get(id)? {
                Some(guard) => decode(guard.value())?,
                None => return Ok(None),
            };
            let live = record
                .reset_digest
                .as_deref()
                .is_some_and(|stored| digests_match(stored, digest))
                && record.reset_expires.is_some_and(|expires| now < expires);
            if !live {
                return Ok(None);
            }
            tokens.remove(digest)?;
            record.reset_digest = None;
            record.reset_expires = None;
            record.password_hash = password_hash;
            record.updated_at = now;
            users.insert(id, encode(&record)?.as_slice())?;
            UserId(id)
        };
        txn.commit()?;
        Ok(Some(id))
    }

    // =========================================================================
    // ENTRIES
    // =========================================================================

    /// Append a sealed entry for a user.
    pub fn insert_entry(
        &self,
        user: UserId,
        kind: EntryKind,
        sealed: Vec<u8>,
        created_at: i64,
    ) -> Result<EntryRecord, StoreError> {
        let txn = self.db.begin_write()?;
        let id = next_id(&txn, SEQ_ENTRIES)?;
        let record = EntryRecord {
            id,
            kind,
            amount: sealed,
            created_at,
        };
        {
            let mut entries = txn.open_table(ENTRIES)?;
            entries.insert((user.0, id), encode(&record)?.as_slice())?;
        }
        txn.commit()?;
        Ok(record)
    }

    /// Every entry a user owns, in id order.
    pub fn entries(&self, user: UserId) -> Result<Vec<EntryRecord>, StoreError> {
        let txn = self.db.begin_read()?;
        let entries = txn.open_table(ENTRIES)?;
        let mut out = Vec::new();
        for item in entries.range((user.0, 0)..=(user.0, u64::MAX))? {
            let (_, value) = item?;
            out.push(decode(value.value())?);
        }
        Ok(out)
    }

    /// Replace the sealed amount of one of the user's entries of `kind`.
    pub fn update_entry(
        &self,
        user: UserId,
        kind: EntryKind,
        id: EntryId,
        sealed: Vec<u8>,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut entries = txn.open_table(ENTRIES)?;
            let mut record: EntryRecord = match entries.get((user.0, id.0))? {
                Some(guard) => decode(guard.value())?,
                None => return Err(StoreError::NotFound),
            };
            if record.kind != kind {
                return Err(StoreError::NotFound);
            }
            record.amount = sealed;
            entries.insert((user.0, id.0), encode(&record)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Delete one of the user's entries of `kind`.
    pub fn delete_entry(&self, user: UserId, kind: EntryKind, id: EntryId) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut entries = txn.open_table(ENTRIES)?;
            let record: EntryRecord = match entries.get((user.0, id.0))? {
                Some(guard) => decode(guard.value())?,
                None => return Err(StoreError::NotFound),
            };
            if record.kind != kind {
                return Err(StoreError::NotFound);
            }
            entries.remove((user.0, id.0))?;
        }
        txn.commit()?;
        Ok(())
    }

    // =========================================================================
    // PREFERENCES
    // =========================================================================

    /// A user's preferences, if a row exists.
    pub fn preferences(&self, user: UserId) -> Result<Option<Preferences>, StoreError> {
        let txn = self.db.begin_read()?;
        let prefs = txn.open_table(PREFERENCES)?;
        let found = match prefs.get(user.0)? {
            Some(guard) => Some(decode(guard.value())?),
            None => None,
        };
        Ok(found)
    }

    /// Modify preferences, starting from an empty row when none exists.
    pub fn upsert_preferences(
        &self,
        user: UserId,
        change: impl FnOnce(&mut Preferences),
    ) -> Result<Preferences, StoreError> {
        let txn = self.db.begin_write()?;
        let updated = {
            let mut prefs = txn.open_table(PREFERENCES)?;
            let mut current: Preferences = match prefs.get(user.0)? {
                Some(guard) => decode(guard.value())?,
                None => Preferences::default(),
            };
            change(&mut current);
            prefs.insert(user.0, encode(&current)?.as_slice())?;
            current
        };
        txn.commit()?;
        Ok(updated)
    }

    // =========================================================================
    // WATCHLIST
    // =========================================================================

    /// Add a watchlist row. Tickers are unique per user.
    pub fn insert_watch(
        &self,
        user: UserId,
        build: impl FnOnce(WatchlistId) -> WatchlistItem,
    ) -> Result<WatchlistItem, StoreError> {
        let txn = self.db.begin_write()?;
        let id = next_id(&txn, SEQ_WATCHLIST)?;
        let item = build(WatchlistId(id));
        {
            let mut watchlist = txn.open_table(WATCHLIST)?;
            for existing in watchlist.range((user.0, 0)..=(user.0, u64::MAX))? {
                let (_, value) = existing?;
                let existing: WatchlistItem = decode(value.value())?;
                if existing.ticker == item.ticker {
                    return Err(StoreError::Conflict("Stock already in watchlist"));
                }
            }
            watchlist.insert((user.0, id), encode(&item)?.as_slice())?;
        }
        txn.commit()?;
        Ok(item)
    }

    /// A user's watchlist, in id order.
    pub fn watchlist(&self, user: UserId) -> Result<Vec<WatchlistItem>, StoreError> {
        let txn = self.db.begin_read()?;
        let watchlist = txn.open_table(WATCHLIST)?;
        let mut out = Vec::new();
        for item in watchlist.range((user.0, 0)..=(user.0, u64::MAX))? {
            let (_, value) = item?;
            out.push(decode(value.value())?);
        }
        Ok(out)
    }

    /// Remove one of the user's watchlist rows.
    pub fn remove_watch(&self, user: UserId, id: WatchlistId) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut watchlist = txn.open_table(WATCHLIST)?;
            if watchlist.remove((user.0, id.0))?.is_none() {
                return Err(StoreError::NotFound);
            }
        }
        txn.commit()?;
        Ok(())
    }

    // =========================================================================
    // REVOKED TOKENS
    // =========================================================================

    /// Revoke a session token id until `expires` (unix seconds).
    pub fn revoke(&self, jti: &str, expires: i64) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut revoked = txn.open_table(REVOKED_TOKENS)?;
            revoked.insert(jti, expires)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Whether a session token id was revoked.
    pub fn is_revoked(&self, jti: &str) -> Result<bool, StoreError> {
        let txn = self.db.begin_read()?;
        let revoked = txn.open_table(REVOKED_TOKENS)?;
        Ok(revoked.get(jti)?.is_some())
    }

    /// Drop revocations whose token has expired anyway. Returns how many.
    ///
    /// A token is still accepted in its `exp` second, so that row is kept.
    pub fn purge_revoked(&self, now: i64) -> Result<usize, StoreError> {
        let txn = self.db.begin_write()?;
        let purged = {
            let mut revoked = txn.open_table(REVOKED_TOKENS)?;
            let mut stale = Vec::new();
            for item in revoked.iter()? {
                let (jti, expires) = item?;
                if expires.value() < now {
                    stale.push(jti.value().to_string());
                }
            }
            for jti in &stale {
                revoked.remove(jti.as_str())?;
            }
            stale.len()
        };
        txn.commit()?;
        Ok(purged)
    }
}

// =============================================================================
// TESTS
// =============================================================================
