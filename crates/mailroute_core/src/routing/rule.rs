//! Declarative redirect rule shape.

use crate::config::EngineConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Request kind a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    MainFrame,
    SubFrame,
}

/// What happens when a rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    Redirect { url: String },
}

/// When a rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    /// Anchored regular expression over the full request URL.
    pub regex_filter: String,
    pub resource_types: Vec<ResourceType>,
}

/// One engine-managed redirect rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectRule {
    pub id: u32,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

impl RedirectRule {
    /// Builds the bare-root redirect toward `slot_index`'s inbox.
    pub fn root_redirect(config: &EngineConfig, slot_index: u32) -> Self {
        Self {
            id: config.rule_id,
            priority: config.rule_priority,
            action: RuleAction::Redirect {
                url: config.inbox_url(slot_index),
            },
            condition: RuleCondition {
                regex_filter: root_filter(&config.redirect_hosts),
                resource_types: vec![ResourceType::MainFrame],
            },
        }
    }

    /// Redirect target URL.
    pub fn redirect_url(&self) -> &str {
        match &self.action {
            RuleAction::Redirect { url } => url.as_str(),
        }
    }

    /// Compiles the URL filter.
    pub fn compile_filter(&self) -> Result<Regex, regex::Error> {
        Regex::new(self.condition.regex_filter.as_str())
    }

    /// Returns whether a top-level navigation to `url` triggers this rule.
    ///
    /// Compiles the filter per call; an unparseable filter matches nothing.
    /// Repeated evaluation should compile once and use [`Self::matches_with`].
    pub fn matches(&self, url: &str, resource_type: ResourceType) -> bool {
        self.compile_filter()
            .map(|filter| self.matches_with(&filter, url, resource_type))
            .unwrap_or(false)
    }

    /// Like [`Self::matches`] with an already compiled filter.
    pub fn matches_with(&self, filter: &Regex, url: &str, resource_type: ResourceType) -> bool {
        self.condition.resource_types.contains(&resource_type) && filter.is_match(url)
    }
}

/// Anchored filter for `http(s)://<host>` with an empty or `/` path.
pub fn root_filter(hosts: &[String]) -> String {
    let alternatives = hosts
        .iter()
        .map(|host| regex::escape(host.to_ascii_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join("|");
    format!("^https?://({alternatives})/?$")
}
