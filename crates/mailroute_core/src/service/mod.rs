//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate reconciliation, routing and persistence into use-case APIs.
//! - Keep collaborator-facing command decoding out of the domain layers.

pub mod command;
pub mod notify;
pub mod orchestrator;
