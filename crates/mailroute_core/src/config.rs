//! Engine configuration.
//!
//! # Responsibility
//! - Hold the tunables of detection, retry and routing in one serde model.
//! - Validate configuration before any component is built from it.
//!
//! # Invariants
//! - Every field has a default, so an empty JSON object is a valid config.
//! - `inbox_url_template` always contains the `{slot}` placeholder.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Placeholder replaced by the slot index in `inbox_url_template`.
pub const SLOT_PLACEHOLDER: &str = "{slot}";

const DEFAULT_RULE_ID: u32 = 1001;
const DEFAULT_RULE_PRIORITY: u32 = 1;
const DEFAULT_INBOX_URL_TEMPLATE: &str = "https://mail.google.com/mail/u/{slot}/#inbox";
const DEFAULT_BADGE_ATTRIBUTE: &str = "aria-label";
const DEFAULT_TEXT_SCAN_LIMIT: usize = 200;
const DEFAULT_RETRY_INTERVAL_MS: u64 = 1000;
const DEFAULT_RETRY_CEILING: u32 = 10;

/// Tunables for detection and routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed id of the single managed redirect rule.
    pub rule_id: u32,
    pub rule_priority: u32,
    /// Equivalent hostnames whose bare root is redirected.
    pub redirect_hosts: Vec<String>,
    /// Redirect target; `{slot}` is replaced by the default slot index.
    pub inbox_url_template: String,
    /// Attribute read by the account-badge heuristic.
    pub badge_attribute: String,
    /// Upper bound of text-bearing elements inspected per scan.
    pub text_scan_limit: usize,
    pub retry_interval_ms: u64,
    /// Number of fallback ticks before periodic scanning stops.
    pub retry_ceiling: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rule_id: DEFAULT_RULE_ID,
            rule_priority: DEFAULT_RULE_PRIORITY,
            redirect_hosts: vec!["www.gmail.com".to_string(), "mail.google.com".to_string()],
            inbox_url_template: DEFAULT_INBOX_URL_TEMPLATE.to_string(),
            badge_attribute: DEFAULT_BADGE_ATTRIBUTE.to_string(),
            text_scan_limit: DEFAULT_TEXT_SCAN_LIMIT,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            retry_ceiling: DEFAULT_RETRY_CEILING,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.redirect_hosts.is_empty() {
            return Err(ConfigError::MissingRedirectHosts);
        }
        if let Some(host) = self
            .redirect_hosts
            .iter()
            .find(|host| !is_valid_hostname(host.as_str()))
        {
            return Err(ConfigError::InvalidRedirectHost(host.clone()));
        }
        if !self.inbox_url_template.contains(SLOT_PLACEHOLDER) {
            return Err(ConfigError::MissingSlotPlaceholder(
                self.inbox_url_template.clone(),
            ));
        }
        if self.badge_attribute.trim().is_empty() {
            return Err(ConfigError::EmptyBadgeAttribute);
        }
        if self.text_scan_limit == 0 {
            return Err(ConfigError::ZeroValue("text_scan_limit"));
        }
        if self.retry_interval_ms == 0 {
            return Err(ConfigError::ZeroValue("retry_interval_ms"));
        }
        Ok(())
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Renders the inbox URL for one slot.
    pub fn inbox_url(&self, slot_index: u32) -> String {
        self.inbox_url_template
            .replace(SLOT_PLACEHOLDER, slot_index.to_string().as_str())
    }
}

fn is_valid_hostname(value: &str) -> bool {
    !value.is_empty()
        && value.split('.').all(|label| {
            !label.is_empty()
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

/// Configuration parse/validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    MissingRedirectHosts,
    InvalidRedirectHost(String),
    MissingSlotPlaceholder(String),
    EmptyBadgeAttribute,
    ZeroValue(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "invalid config document: {message}"),
            Self::MissingRedirectHosts => write!(f, "redirect_hosts must not be empty"),
            Self::InvalidRedirectHost(value) => write!(f, "redirect host is invalid: `{value}`"),
            Self::MissingSlotPlaceholder(value) => write!(
                f,
                "inbox_url_template must contain `{SLOT_PLACEHOLDER}`, got `{value}`"
            ),
            Self::EmptyBadgeAttribute => write!(f, "badge_attribute must not be empty"),
            Self::ZeroValue(field) => write!(f, "{field} must be greater than zero"),
        }
    }
}

impl Error for ConfigError {}
