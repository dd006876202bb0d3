//! Account orchestrator.
//!
//! # Responsibility
//! - Serialize every mutating operation over persisted account state.
//! - Wire reconciliation, routing and notification together.
//! - Expose query/command entry points to collaborators.
//!
//! # Invariants
//! - Mutating operations hold one lock across read-modify-write, so merges,
//!   default changes and deletions never interleave.
//! - Persisted state is re-read at the start of every operation.
//! - After every successful operation the rule engine reflects the persisted
//!   default selection.
//! - Capability failures are returned, never retried here.
//! - Writes that touch both identities and the default go through one store
//!   call, so a failed command can be retried as a whole.

use crate::config::EngineConfig;
use crate::model::candidate::Candidate;
use crate::model::identity::{normalize_email, Identity, IdentityMap, IdentityValidationError};
use crate::reconcile::merge;
use crate::routing::engine::{RuleEngine, RuleEngineError};
use crate::routing::rule::RedirectRule;
use crate::routing::state::{DefaultSelection, RoutingStateMachine};
use crate::service::notify::{Notification, Notifier};
use crate::store::account_state;
use crate::store::kv::{KeyValueStore, StoreError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Errors surfaced by orchestrator operations.
#[derive(Debug)]
pub enum OrchestratorError {
    /// Persistence capability failed or returned invalid state.
    Store(StoreError),
    /// Rule engine capability failed.
    RuleEngine(RuleEngineError),
    /// Email input is unusable as an identity key.
    InvalidEmail(IdentityValidationError),
    /// No identity is stored under the email.
    IdentityNotFound(String),
}

impl Display for OrchestratorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::RuleEngine(err) => write!(f, "{err}"),
            Self::InvalidEmail(err) => write!(f, "{err}"),
            Self::IdentityNotFound(email) => write!(f, "identity not found: {email}"),
        }
    }
}

impl OrchestratorError {
    /// Stable log code. Unlike `Display`, it never carries an email.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Store(err) => err.error_code(),
            Self::RuleEngine(_) => "rule_engine_failed",
            Self::InvalidEmail(_) => "invalid_email",
            Self::IdentityNotFound(_) => "identity_not_found",
        }
    }
}

impl Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::RuleEngine(err) => Some(err),
            Self::InvalidEmail(err) => Some(err),
            Self::IdentityNotFound(_) => None,
        }
    }
}

impl From<StoreError> for OrchestratorError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<RuleEngineError> for OrchestratorError {
    fn from(value: RuleEngineError) -> Self {
        Self::RuleEngine(value)
    }
}

impl From<IdentityValidationError> for OrchestratorError {
    fn from(value: IdentityValidationError) -> Self {
        Self::InvalidEmail(value)
    }
}

/// Current persisted accounts view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountsSnapshot {
    pub identities: IdentityMap,
    pub default_selection: DefaultSelection,
}

/// Summary of one observation merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationReport {
    pub changed: bool,
    pub inserted: usize,
    pub updated: usize,
}

type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

/// Single logical owner of identity and default-selection state.
pub struct AccountOrchestrator<S, E, N>
where
    S: KeyValueStore,
    E: RuleEngine,
    N: Notifier,
{
    store: S,
    engine: E,
    notifier: N,
    // Doubles as the mutual-exclusion boundary for mutating operations.
    routing: Mutex<RoutingStateMachine>,
    clock: Clock,
}

impl<S, E, N> AccountOrchestrator<S, E, N>
where
    S: KeyValueStore,
    E: RuleEngine,
    N: Notifier,
{
    pub fn new(config: EngineConfig, store: S, engine: E, notifier: N) -> Self {
        Self {
            store,
            engine,
            notifier,
            routing: Mutex::new(RoutingStateMachine::new(config)),
            clock: Box::new(system_now_ms),
        }
    }

    /// Replaces the wall clock, e.g. with a fixed clock in tests.
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Startup: drops any leftover managed rule and restores the persisted
    /// default's rule.
    pub fn initialize(&self) -> OrchestratorResult<Option<RedirectRule>> {
        let mut routing = self.lock();
        let persisted = account_state::load_default(&self.store)?;
        let installed = routing.initialize(&self.engine, persisted)?;
        info!(
            "event=orchestrator_init module=service status=ok has_default={} rule_installed={}",
            persisted.slot().is_some(),
            installed.is_some()
        );
        Ok(installed)
    }

    /// Merges reported candidates, persists on change and notifies once.
    pub fn on_observation(&self, candidates: &[Candidate]) -> OrchestratorResult<ObservationReport> {
        let _routing = self.lock();
        let existing = account_state::load_identities(&self.store)?;
        let outcome = merge(&existing, candidates, (self.clock)());

        if outcome.changed {
            if let Err(err) = account_state::save_identities(&self.store, &outcome.map) {
                warn!(
                    "event=observation module=service status=error error_code={}",
                    err.error_code()
                );
                return Err(err.into());
            }
            self.notifier
                .notify(&Notification::identity_detected(outcome.last_affected.as_deref()));
        }

        info!(
            "event=observation module=service status=ok candidates={} inserted={} updated={}",
            candidates.len(),
            outcome.inserted,
            outcome.updated
        );
        Ok(ObservationReport {
            changed: outcome.changed,
            inserted: outcome.inserted,
            updated: outcome.updated,
        })
    }

    /// Returns the persisted identity map and default selection.
    pub fn get_accounts(&self) -> OrchestratorResult<AccountsSnapshot> {
        let _routing = self.lock();
        Ok(AccountsSnapshot {
            identities: account_state::load_identities(&self.store)?,
            default_selection: account_state::load_default(&self.store)?,
        })
    }

    /// Identities ordered most-recently-observed first.
    pub fn list_identities(&self) -> OrchestratorResult<Vec<Identity>> {
        let snapshot = self.get_accounts()?;
        Ok(snapshot
            .identities
            .sorted_by_recency()
            .into_iter()
            .cloned()
            .collect())
    }

    /// Sets (`Some`) or clears (`None`) the default slot.
    ///
    /// The slot need not belong to a known identity. The rule is recomputed
    /// even when the selection is unchanged. Returns whether the persisted
    /// selection changed.
    pub fn set_default(&self, slot_index: Option<u32>) -> OrchestratorResult<bool> {
        let mut routing = self.lock();
        let selection = DefaultSelection::from(slot_index);
        let changed = account_state::load_default(&self.store)? != selection;
        if changed {
            account_state::save_default(&self.store, selection)?;
        }
        let installed = routing.transition(&self.engine, selection)?;
        info!(
            "event=set_default module=service status=ok has_default={} changed={} rule_installed={}",
            slot_index.is_some(),
            changed,
            installed.is_some()
        );
        Ok(changed)
    }

    /// Removes one identity; clears the default when it owned the default slot.
    ///
    /// The map and the cleared default are persisted together; on a store
    /// failure nothing changes and the command can be retried.
    pub fn delete_identity(&self, email: &str) -> OrchestratorResult<Identity> {
        let mut routing = self.lock();
        let key = normalize_email(email)?;
        let mut identities = account_state::load_identities(&self.store)?;
        let current = account_state::load_default(&self.store)?;
        let removed = identities
            .remove(key.as_str())
            .ok_or_else(|| OrchestratorError::IdentityNotFound(key.clone()))?;

        let owned_default = removed.slot_index.is_some() && removed.slot_index == current.slot();
        if owned_default {
            account_state::save_account_state(
                &self.store,
                &identities,
                DefaultSelection::NoDefault,
            )?;
            routing.clear_default(&self.engine)?;
        } else {
            account_state::save_identities(&self.store, &identities)?;
        }

        info!(
            "event=delete_identity module=service status=ok remaining={} default_cleared={}",
            identities.len(),
            owned_default
        );
        Ok(removed)
    }

    /// Inserts or replaces a manually entered identity.
    pub fn add_identity(&self, email: &str, slot_index: Option<u32>) -> OrchestratorResult<Identity> {
        let _routing = self.lock();
        let key = normalize_email(email)?;
        let mut identities = account_state::load_identities(&self.store)?;

        let mut identity = Identity::manual(key.clone(), slot_index, (self.clock)());
        if let Some(previous) = identities.get(key.as_str()) {
            identity.touch(previous.last_observed_at);
            identity.href = previous.href.clone();
        }
        identities.upsert(identity.clone())?;
        account_state::save_identities(&self.store, &identities)?;

        info!(
            "event=add_identity module=service status=ok has_slot={} total={}",
            slot_index.is_some(),
            identities.len()
        );
        Ok(identity)
    }

    /// Removes every identity and clears any default.
    ///
    /// Returns whether anything was stored before.
    pub fn clear_identities(&self) -> OrchestratorResult<bool> {
        let mut routing = self.lock();
        let had_identities = !account_state::load_identities(&self.store)?.is_empty();
        let had_default = account_state::load_default(&self.store)?.slot().is_some();

        if had_default {
            account_state::save_account_state(
                &self.store,
                &IdentityMap::new(),
                DefaultSelection::NoDefault,
            )?;
            routing.clear_default(&self.engine)?;
        } else {
            account_state::clear_identities(&self.store)?;
        }

        info!(
            "event=clear_identities module=service status=ok had_identities={had_identities} default_cleared={had_default}"
        );
        Ok(had_identities || had_default)
    }

    fn lock(&self) -> MutexGuard<'_, RoutingStateMachine> {
        self.routing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Current Unix time in epoch milliseconds.
pub fn system_now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
}
