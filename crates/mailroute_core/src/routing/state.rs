//! Default selection state machine.
//!
//! # Responsibility
//! - Track the user's default slot.
//! - Drive the rule engine so its managed rule always reflects that slot.
//!
//! # Invariants
//! - Recompute always removes the managed rule before installing one.
//! - A missing managed rule during removal is success, not failure.
//! - Slot `0` never installs a rule.
//! - State is updated before engine calls; on engine failure the state holds
//!   the attempted selection and the error is returned to the caller.

use crate::config::EngineConfig;
use crate::routing::engine::{RuleEngine, RuleEngineError, RuleUpdate};
use crate::routing::rule::RedirectRule;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// The user's default slot, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<u32>", into = "Option<u32>")]
pub enum DefaultSelection {
    #[default]
    NoDefault,
    DefaultSet(u32),
}

impl DefaultSelection {
    pub fn slot(self) -> Option<u32> {
        match self {
            Self::NoDefault => None,
            Self::DefaultSet(slot) => Some(slot),
        }
    }

    /// Slot whose inbox needs a redirect; `None` for no default or primary.
    pub fn redirect_slot(self) -> Option<u32> {
        self.slot().filter(|slot| *slot != 0)
    }
}

impl From<Option<u32>> for DefaultSelection {
    fn from(value: Option<u32>) -> Self {
        value.map_or(Self::NoDefault, Self::DefaultSet)
    }
}

impl From<DefaultSelection> for Option<u32> {
    fn from(value: DefaultSelection) -> Self {
        value.slot()
    }
}

/// Keeps one managed redirect rule consistent with the default selection.
#[derive(Debug, Clone)]
pub struct RoutingStateMachine {
    config: EngineConfig,
    state: DefaultSelection,
}

impl RoutingStateMachine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: DefaultSelection::NoDefault,
        }
    }

    pub fn state(&self) -> DefaultSelection {
        self.state
    }

    pub fn rule_id(&self) -> u32 {
        self.config.rule_id
    }

    /// Rule that should be installed for the current state.
    pub fn desired_rule(&self) -> Option<RedirectRule> {
        self.state
            .redirect_slot()
            .map(|slot| RedirectRule::root_redirect(&self.config, slot))
    }

    /// Moves to `DefaultSet(slot_index)` and recomputes the rule.
    pub fn set_default(
        &mut self,
        engine: &dyn RuleEngine,
        slot_index: u32,
    ) -> Result<Option<RedirectRule>, RuleEngineError> {
        self.transition(engine, DefaultSelection::DefaultSet(slot_index))
    }

    /// Moves to `NoDefault` and removes the rule.
    pub fn clear_default(
        &mut self,
        engine: &dyn RuleEngine,
    ) -> Result<Option<RedirectRule>, RuleEngineError> {
        self.transition(engine, DefaultSelection::NoDefault)
    }

    pub fn transition(
        &mut self,
        engine: &dyn RuleEngine,
        selection: DefaultSelection,
    ) -> Result<Option<RedirectRule>, RuleEngineError> {
        self.state = selection;
        self.recompute(engine)
    }

    /// Startup path: clears any leftover managed rule, then restores the
    /// persisted selection.
    pub fn initialize(
        &mut self,
        engine: &dyn RuleEngine,
        persisted: DefaultSelection,
    ) -> Result<Option<RedirectRule>, RuleEngineError> {
        self.remove_managed_rule(engine)?;
        self.state = persisted;
        if persisted == DefaultSelection::NoDefault {
            return Ok(None);
        }
        self.recompute(engine)
    }

    /// Idempotent rule recomputation for the current state.
    ///
    /// Returns the installed rule, or `None` when no rule is needed.
    pub fn recompute(
        &self,
        engine: &dyn RuleEngine,
    ) -> Result<Option<RedirectRule>, RuleEngineError> {
        self.remove_managed_rule(engine)?;

        let Some(rule) = self.desired_rule() else {
            info!(
                "event=rule_recompute module=routing status=ok rule_id={} installed=false",
                self.config.rule_id
            );
            return Ok(None);
        };

        if let Err(err) = engine.update_rules(RuleUpdate::add(rule.clone())) {
            warn!(
                "event=rule_recompute module=routing status=error rule_id={} error={}",
                self.config.rule_id, err
            );
            return Err(err);
        }
        info!(
            "event=rule_recompute module=routing status=ok rule_id={} installed=true slot={}",
            self.config.rule_id,
            self.state.slot().unwrap_or_default()
        );
        Ok(Some(rule))
    }

    fn remove_managed_rule(&self, engine: &dyn RuleEngine) -> Result<(), RuleEngineError> {
        match engine.update_rules(RuleUpdate::remove(self.config.rule_id)) {
            Ok(()) | Err(RuleEngineError::RuleNotFound(_)) => Ok(()),
            Err(err) => {
                warn!(
                    "event=rule_remove module=routing status=error rule_id={} error={}",
                    self.config.rule_id, err
                );
                Err(err)
            }
        }
    }
}
