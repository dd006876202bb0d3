//! Default selection and redirect-rule management.
//!
//! # Responsibility
//! - Model the default-slot state machine.
//! - Keep exactly zero or one managed rule installed in the rule engine.
//!
//! # Invariants
//! - After any recompute, the engine holds no rule for the managed id when the
//!   default is absent or slot `0`, and exactly one rule for the default slot
//!   otherwise.
//! - Rules only match the bare webmail root, never sub-paths.

pub mod engine;
pub mod rule;
pub mod state;
