//! Persistence capability and account-state storage.
//!
//! # Responsibility
//! - Define the key-value persistence contract consumed by the orchestrator.
//! - Provide SQLite and in-memory implementations.
//! - Encode/decode account state under stable keys.
//!
//! # Invariants
//! - Each call is atomic for the keys it touches; there are no cross-call
//!   transactions.
//! - Read paths reject invalid persisted state instead of masking it.

pub mod account_state;
pub mod kv;
pub mod sqlite;
