//! Core domain + application logic for the Group Info Bot.
//!
//! This crate is intentionally framework-agnostic. Telegram / SQLite live
//! behind ports (traits) implemented in adapter crates: the directory
//! service and membership gate in `gib-telegram`, the ledger store in
//! `gib-store` (with an in-process `MemoryStore` here for tests).

pub mod config;
pub mod domain;
pub mod enrich;
pub mod errors;
pub mod formatting;
pub mod ledger;
pub mod logging;
pub mod lookup;
pub mod normalize;
pub mod ports;
pub mod resolver;
pub mod store;

pub use errors::{Error, Result};
