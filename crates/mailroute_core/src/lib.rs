//! Identity detection and default-inbox routing core.
//!
//! This crate owns every invariant of detected webmail identities: how they
//! are extracted from rendered content, merged into persisted state, and how
//! the single managed redirect rule follows the user's default slot.

pub mod config;
pub mod db;
pub mod detect;
pub mod logging;
pub mod model;
pub mod reconcile;
pub mod routing;
pub mod service;
pub mod store;

pub use config::{ConfigError, EngineConfig};
pub use detect::change::{fingerprint, ChangeDetector};
pub use detect::document::{DocumentSnapshot, Element, StaticDocument};
pub use detect::extractor::{find_email, slot_from_location, IdentityExtractor};
pub use detect::session::{ObservationEvent, ObservationSession, ScanOutcome, ScanTrigger};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::candidate::Candidate;
pub use model::identity::{
    normalize_email, Identity, IdentityMap, IdentityOrigin, IdentityValidationError,
};
pub use reconcile::{merge, MergeOutcome};
pub use routing::engine::{InMemoryRuleEngine, RuleEngine, RuleEngineError, RuleUpdate};
pub use routing::rule::{RedirectRule, ResourceType, RuleAction, RuleCondition};
pub use routing::state::{DefaultSelection, RoutingStateMachine};
pub use service::command::{dispatch, dispatch_json, parse_command, Command, CommandResponse};
pub use service::notify::{LogNotifier, Notification, Notifier};
pub use service::orchestrator::{
    AccountOrchestrator, AccountsSnapshot, ObservationReport, OrchestratorError,
    OrchestratorResult,
};
pub use store::kv::{KeyValueStore, MemoryKeyValueStore, StoreError, StoreResult, StoreValues};
pub use store::sqlite::SqliteKeyValueStore;

/// Minimal health-check API for host integration probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
