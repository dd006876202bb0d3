//! Identity store reconciliation.
//!
//! # Responsibility
//! - Merge observed candidates into an identity map.
//! - Decide per field whether an observation is a material change.
//!
//! # Invariants
//! - Merging never produces two entries for one normalized email.
//! - A candidate without a slot index never clears a known slot index.
//! - A known switcher link is only replaced by another link, never cleared.
//! - Origin does not gate merges: observed slots overwrite manual slots.
//! - Merging the same candidates twice reports no change the second time.

use crate::model::candidate::Candidate;
use crate::model::identity::{normalize_email, Identity, IdentityMap};
use log::debug;

/// Result of one merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub map: IdentityMap,
    /// Whether any entry was inserted or updated.
    pub changed: bool,
    /// Email of the last entry inserted or updated, in candidate order.
    pub last_affected: Option<String>,
    pub inserted: usize,
    pub updated: usize,
}

/// Merges `candidates` into a copy of `existing`.
///
/// Candidates with blank emails are skipped.
pub fn merge(existing: &IdentityMap, candidates: &[Candidate], now_ms: i64) -> MergeOutcome {
    let mut map = existing.clone();
    let mut last_affected = None;
    let mut inserted = 0;
    let mut updated = 0;

    for candidate in candidates {
        let Ok(email) = normalize_email(candidate.email.as_str()) else {
            continue;
        };

        match map.get_mut(email.as_str()) {
            None => {
                map.insert_normalized(
                    Identity::observed(email.clone(), candidate.slot_index, now_ms)
                        .with_href(candidate.href.clone()),
                );
                inserted += 1;
                last_affected = Some(email);
            }
            Some(identity) => {
                let Some(slot) = candidate.slot_index else {
                    continue;
                };
                if identity.slot_index == Some(slot) {
                    continue;
                }
                identity.slot_index = Some(slot);
                if candidate.href.is_some() {
                    identity.href = candidate.href.clone();
                }
                identity.touch(now_ms);
                updated += 1;
                last_affected = Some(email);
            }
        }
    }

    let changed = inserted + updated > 0;
    debug!(
        "event=merge module=reconcile status=ok candidates={} inserted={} updated={} changed={}",
        candidates.len(),
        inserted,
        updated,
        changed
    );

    MergeOutcome {
        map,
        changed,
        last_affected,
        inserted,
        updated,
    }
}
