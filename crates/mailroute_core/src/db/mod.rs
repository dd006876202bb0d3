//! SQLite bootstrap for the key-value store.
//!
//! # Responsibility
//! - Open and configure the connection handed to `SqliteKeyValueStore`.
//! - Bring the `kv_entries` schema up to date before first use.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - Failures surface as `StoreError`, the same vocabulary the store uses.

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};
