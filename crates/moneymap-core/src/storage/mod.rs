//! # Storage Module
//!
//! Durable storage for MoneyMap using redb.
//!
//! Uses redb embedded database for:
//! - ACID transactions (one write transaction per mutation)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Records are encoded with postcard. Financial figures arrive here already
//! sealed; this layer never sees a plaintext amount.

mod redb_store;

pub use redb_store::Store;

use crate::ledger::EntryKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current on-disk layout.
pub const SCHEMA_VERSION: u64 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("record encoding error: {0}")]
    Codec(#[from] postcard::Error),

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Conflict(&'static str),

    #[error("invalid: {0}")]
    Invalid(String),
}

/// A stored account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub age: Option<u8>,
    pub occupation: Option<String>,
    /// Sealed decimal string.
    pub annual_income: Option<Vec<u8>>,
    pub financial_goal: Option<String>,
    pub risk_tolerance: Option<String>,
    /// Hex SHA-256 of the outstanding reset token.
    pub reset_digest: Option<String>,
    /// Unix seconds.
    pub reset_expires: Option<i64>,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds.
    pub updated_at: i64,
}

/// A stored ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub id: u64,
    pub kind: EntryKind,
    /// Sealed decimal string.
    pub amount: Vec<u8>,
    /// Unix seconds.
    pub created_at: i64,
}
