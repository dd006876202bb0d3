//! Identity domain model.
//!
//! # Responsibility
//! - Define the persisted identity record and the identity map keyed by email.
//! - Validate and normalize emails before they become map keys.
//!
//! # Invariants
//! - `email` is never empty and always normalized.
//! - `last_observed_at` never moves backwards for one identity.
//! - The map holds at most one entry per normalized email.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// How an identity entered the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityOrigin {
    /// Inferred from rendered webmail content.
    Observed,
    /// Entered directly by the user.
    Manual,
}

/// One authenticated identity known to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Normalized email, unique key of the map.
    pub email: String,
    /// Numbered inbox slot. `None` means unknown.
    pub slot_index: Option<u32>,
    /// Unix epoch milliseconds of the last material observation.
    pub last_observed_at: i64,
    /// Recorded for display and future policy; merges do not consult it.
    pub origin: IdentityOrigin,
    /// Account-switcher link the identity was last seen on.
    #[serde(default)]
    pub href: Option<String>,
}

impl Identity {
    /// Creates an observed identity.
    ///
    /// Callers must pass an already-normalized email.
    pub fn observed(email: impl Into<String>, slot_index: Option<u32>, now_ms: i64) -> Self {
        Self {
            email: email.into(),
            slot_index,
            last_observed_at: now_ms,
            origin: IdentityOrigin::Observed,
            href: None,
        }
    }

    /// Creates a manually entered identity.
    pub fn manual(email: impl Into<String>, slot_index: Option<u32>, now_ms: i64) -> Self {
        Self {
            email: email.into(),
            slot_index,
            last_observed_at: now_ms,
            origin: IdentityOrigin::Manual,
            href: None,
        }
    }

    pub fn with_href(mut self, href: Option<String>) -> Self {
        self.href = href;
        self
    }

    /// Advances `last_observed_at` without ever moving it backwards.
    pub fn touch(&mut self, now_ms: i64) {
        self.last_observed_at = self.last_observed_at.max(now_ms);
    }

    /// Validates record-level invariants.
    pub fn validate(&self) -> Result<(), IdentityValidationError> {
        let normalized = normalize_email(self.email.as_str())?;
        if normalized != self.email {
            return Err(IdentityValidationError::NotNormalized(self.email.clone()));
        }
        Ok(())
    }
}

/// Validation errors for identity records and raw email input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityValidationError {
    EmptyEmail,
    NotNormalized(String),
}

impl Display for IdentityValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyEmail => write!(f, "identity email must not be empty"),
            Self::NotNormalized(value) => {
                write!(f, "identity email is not normalized: `{value}`")
            }
        }
    }
}

impl Error for IdentityValidationError {}

/// Trims and lowercases one email.
///
/// # Errors
/// - Returns `EmptyEmail` when nothing remains after trimming.
pub fn normalize_email(raw: &str) -> Result<String, IdentityValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IdentityValidationError::EmptyEmail);
    }
    Ok(trimmed.to_lowercase())
}

/// Identity map keyed by normalized email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityMap {
    entries: BTreeMap<String, Identity>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up one identity by raw email; the lookup normalizes first.
    pub fn get(&self, email: &str) -> Option<&Identity> {
        let key = normalize_email(email).ok()?;
        self.entries.get(key.as_str())
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut Identity> {
        self.entries.get_mut(key)
    }

    /// Inserts or replaces the record stored under its email.
    ///
    /// Returns the replaced record, if any.
    pub fn upsert(&mut self, identity: Identity) -> Result<Option<Identity>, IdentityValidationError> {
        identity.validate()?;
        Ok(self.entries.insert(identity.email.clone(), identity))
    }

    /// Inserts a record whose email came out of [`normalize_email`].
    pub(crate) fn insert_normalized(&mut self, identity: Identity) {
        self.entries.insert(identity.email.clone(), identity);
    }

    /// Removes one identity by raw email.
    pub fn remove(&mut self, email: &str) -> Option<Identity> {
        let key = normalize_email(email).ok()?;
        self.entries.remove(key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.entries.values()
    }

    /// Returns identities most-recently-observed first, email ascending on ties.
    pub fn sorted_by_recency(&self) -> Vec<&Identity> {
        let mut items = self.entries.values().collect::<Vec<_>>();
        items.sort_by(|left, right| {
            right
                .last_observed_at
                .cmp(&left.last_observed_at)
                .then_with(|| left.email.cmp(&right.email))
        });
        items
    }

    /// Returns whether any identity currently occupies `slot_index`.
    pub fn owns_slot(&self, slot_index: u32) -> bool {
        self.entries
            .values()
            .any(|identity| identity.slot_index == Some(slot_index))
    }

    /// Validates every persisted record, including key/email agreement.
    pub fn validate(&self) -> Result<(), IdentityValidationError> {
        for (key, identity) in &self.entries {
            identity.validate()?;
            if key != &identity.email {
                return Err(IdentityValidationError::NotNormalized(key.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_email, Identity, IdentityMap, IdentityValidationError};

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(
            normalize_email("  Alice@Example.COM ").expect("valid email"),
            "alice@example.com"
        );
        assert_eq!(
            normalize_email("   ").expect_err("blank must fail"),
            IdentityValidationError::EmptyEmail
        );
    }

    #[test]
    fn upsert_rejects_unnormalized_email() {
        let mut map = IdentityMap::new();
        let err = map
            .upsert(Identity::observed("Bob@x.com", None, 1))
            .expect_err("mixed case key must be rejected");
        assert!(matches!(err, IdentityValidationError::NotNormalized(_)));
        assert!(map.is_empty());
    }

    #[test]
    fn lookup_and_remove_normalize_input() {
        let mut map = IdentityMap::new();
        map.upsert(Identity::observed("bob@x.com", Some(2), 1))
            .expect("valid identity");
        assert!(map.get("BOB@X.COM").is_some());
        assert!(map.owns_slot(2));
        assert!(map.remove(" Bob@x.com ").is_some());
        assert!(map.is_empty());
    }

    #[test]
    fn touch_never_moves_backwards() {
        let mut identity = Identity::observed("a@x.com", None, 500);
        identity.touch(100);
        assert_eq!(identity.last_observed_at, 500);
        identity.touch(900);
        assert_eq!(identity.last_observed_at, 900);
    }

    #[test]
    fn sorted_by_recency_breaks_ties_by_email() {
        let mut map = IdentityMap::new();
        map.upsert(Identity::observed("b@x.com", None, 10)).unwrap();
        map.upsert(Identity::observed("a@x.com", None, 10)).unwrap();
        map.upsert(Identity::manual("c@x.com", Some(1), 20)).unwrap();

        let emails = map
            .sorted_by_recency()
            .into_iter()
            .map(|identity| identity.email.as_str())
            .collect::<Vec<_>>();
        assert_eq!(emails, vec!["c@x.com", "a@x.com", "b@x.com"]);
    }
}
