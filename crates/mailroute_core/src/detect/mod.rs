//! Identity detection over rendered webmail content.
//!
//! # Responsibility
//! - Infer candidate identities from a queryable document snapshot.
//! - Suppress repeated emissions within one observation session.
//! - Bound periodic fallback scanning.
//!
//! # Invariants
//! - Detection is read-only against the snapshot.
//! - Session state is never shared between sessions.

pub mod change;
pub mod document;
pub mod extractor;
pub mod session;
