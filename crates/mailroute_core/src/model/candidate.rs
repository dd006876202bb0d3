//! Candidate identity produced by detection heuristics.

use serde::{Deserialize, Serialize};

/// An `(email, slot_index)` pair proposed before reconciliation.
///
/// Candidates arriving from collaborators may use the legacy wire name
/// `index` for the slot field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub email: String,
    #[serde(default, alias = "index")]
    pub slot_index: Option<u32>,
    /// Link target the candidate was read from, when it came from a switcher link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl Candidate {
    pub fn new(email: impl Into<String>, slot_index: Option<u32>) -> Self {
        Self {
            email: email.into(),
            slot_index,
            href: None,
        }
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }
}
