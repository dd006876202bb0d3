//! Domain model for detected webmail identities.
//!
//! # Responsibility
//! - Define canonical data structures used by detection, reconciliation and
//!   routing logic.
//! - Keep email normalization in one place so every layer agrees on keys.
//!
//! # Invariants
//! - Every identity is keyed by its normalized (trimmed, lowercase) email.
//! - Slot index `0` denotes the primary inbox.

pub mod candidate;
pub mod identity;
