//! Rule engine capability and an in-process implementation.
//!
//! # Responsibility
//! - Define the `update_rules` contract the routing state machine drives.
//! - Provide an in-memory engine for hosts that evaluate rules themselves.
//!
//! # Invariants
//! - One update is applied atomically: on error nothing changes.
//! - At most one rule exists per rule id.
//! - Filters are compiled once, when a rule is installed.

use crate::routing::rule::{RedirectRule, ResourceType};
use regex::Regex;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;

/// One batched rule-engine mutation. Removals apply before additions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleUpdate {
    pub remove_ids: Vec<u32>,
    pub add_rules: Vec<RedirectRule>,
}

impl RuleUpdate {
    pub fn remove(rule_id: u32) -> Self {
        Self {
            remove_ids: vec![rule_id],
            add_rules: Vec::new(),
        }
    }

    pub fn add(rule: RedirectRule) -> Self {
        Self {
            remove_ids: Vec::new(),
            add_rules: vec![rule],
        }
    }
}

/// Rule engine errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleEngineError {
    /// A removal targeted an id with no installed rule.
    RuleNotFound(u32),
    /// An addition reused an id that is still installed.
    DuplicateRuleId(u32),
    InvalidRule { rule_id: u32, message: String },
    /// Engine rejected the call for host-specific reasons.
    Unavailable(String),
}

impl Display for RuleEngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RuleNotFound(id) => write!(f, "rule not found: {id}"),
            Self::DuplicateRuleId(id) => write!(f, "rule id already installed: {id}"),
            Self::InvalidRule { rule_id, message } => {
                write!(f, "rule {rule_id} is invalid: {message}")
            }
            Self::Unavailable(message) => write!(f, "rule engine unavailable: {message}"),
        }
    }
}

impl Error for RuleEngineError {}

/// Declarative rule engine capability.
pub trait RuleEngine {
    fn update_rules(&self, update: RuleUpdate) -> Result<(), RuleEngineError>;
}

#[derive(Debug, Clone)]
struct InstalledRule {
    rule: RedirectRule,
    // `None` only for seeded rules whose filter does not compile.
    filter: Option<Regex>,
}

impl InstalledRule {
    fn new(rule: RedirectRule) -> Self {
        let filter = rule.compile_filter().ok();
        Self { rule, filter }
    }

    fn matches(&self, url: &str) -> bool {
        self.filter
            .as_ref()
            .is_some_and(|filter| self.rule.matches_with(filter, url, ResourceType::MainFrame))
    }
}

/// In-memory rule engine.
///
/// Removing an unknown id is ignored unless built with
/// [`InMemoryRuleEngine::reject_missing_removals`].
#[derive(Debug, Default)]
pub struct InMemoryRuleEngine {
    rules: Mutex<BTreeMap<u32, InstalledRule>>,
    reject_missing_removals: bool,
}

impl InMemoryRuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with pre-existing rules, e.g. left over from a previous run.
    pub fn with_rules(rules: Vec<RedirectRule>) -> Self {
        Self {
            rules: Mutex::new(
                rules
                    .into_iter()
                    .map(|rule| (rule.id, InstalledRule::new(rule)))
                    .collect(),
            ),
            reject_missing_removals: false,
        }
    }

    /// Makes removals of unknown ids fail with `RuleNotFound`.
    pub fn reject_missing_removals(mut self) -> Self {
        self.reject_missing_removals = true;
        self
    }

    /// Snapshot of installed rules ordered by id.
    pub fn rules(&self) -> Vec<RedirectRule> {
        self.lock()
            .values()
            .map(|installed| installed.rule.clone())
            .collect()
    }

    pub fn rule(&self, rule_id: u32) -> Option<RedirectRule> {
        self.lock()
            .get(&rule_id)
            .map(|installed| installed.rule.clone())
    }

    /// Resolves a top-level navigation to its redirect target, if any.
    ///
    /// Highest priority wins; lower id breaks ties.
    pub fn resolve(&self, url: &str) -> Option<String> {
        self.lock()
            .values()
            .filter(|installed| installed.matches(url))
            .map(|installed| &installed.rule)
            .max_by(|left, right| {
                left.priority
                    .cmp(&right.priority)
                    .then_with(|| right.id.cmp(&left.id))
            })
            .map(|rule| rule.redirect_url().to_string())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<u32, InstalledRule>> {
        self.rules
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RuleEngine for InMemoryRuleEngine {
    fn update_rules(&self, update: RuleUpdate) -> Result<(), RuleEngineError> {
        let mut rules = self.lock();
        let mut next = rules.clone();

        for id in &update.remove_ids {
            if next.remove(id).is_none() && self.reject_missing_removals {
                return Err(RuleEngineError::RuleNotFound(*id));
            }
        }
        for rule in update.add_rules {
            let filter = rule
                .compile_filter()
                .map_err(|err| RuleEngineError::InvalidRule {
                    rule_id: rule.id,
                    message: err.to_string(),
                })?;
            if next.contains_key(&rule.id) {
                return Err(RuleEngineError::DuplicateRuleId(rule.id));
            }
            next.insert(
                rule.id,
                InstalledRule {
                    rule,
                    filter: Some(filter),
                },
            );
        }

        *rules = next;
        Ok(())
    }
}
