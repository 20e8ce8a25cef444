//! # Formats Module
//!
//! Export formats for ledger data.
//!
//! This module contains:
//! - CSV export of ledger rows (RFC 4180)
//! - A single-page PDF financial summary
//!
//! Both writers are pure: they take decrypted rows and return bytes. File
//! names, headers and delivery stay in the app layer.

mod csv;
mod pdf;

pub use csv::{CSV_COLUMNS, rows_to_csv};
pub use pdf::{SUMMARY_TITLE, summary_pdf};
