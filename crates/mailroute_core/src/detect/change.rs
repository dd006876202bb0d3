//! Session-scoped change detection over candidate sets.

use crate::model::candidate::Candidate;

/// Remembers the last emitted fingerprint of one observation session.
///
/// A new session starts from a fresh instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeDetector {
    last_emitted: Option<String>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when `candidates` should be sent downstream.
    ///
    /// Empty sets are never emitted. A non-empty set is emitted only when its
    /// fingerprint differs from the last emitted one; emitting records it.
    pub fn should_emit(&mut self, candidates: &[Candidate]) -> bool {
        if candidates.is_empty() {
            return false;
        }
        let current = fingerprint(candidates);
        if self.last_emitted.as_deref() == Some(current.as_str()) {
            return false;
        }
        self.last_emitted = Some(current);
        true
    }

    pub fn last_fingerprint(&self) -> Option<&str> {
        self.last_emitted.as_deref()
    }
}

/// Order-insensitive fingerprint over `(email, slot_index)` pairs.
pub fn fingerprint(candidates: &[Candidate]) -> String {
    let mut pairs = candidates
        .iter()
        .map(|candidate| {
            let slot = candidate
                .slot_index
                .map_or_else(|| "-".to_string(), |slot| slot.to_string());
            format!("{}|{slot}", candidate.email.to_lowercase())
        })
        .collect::<Vec<_>>();
    pairs.sort();
    pairs.join(";")
}
