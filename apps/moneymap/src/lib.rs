//! # MoneyMap Library
//!
//! This library exposes the MoneyMap server modules for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;
pub mod config;
pub mod mail;

// Re-export moneymap_core for convenience
pub use moneymap_core;
