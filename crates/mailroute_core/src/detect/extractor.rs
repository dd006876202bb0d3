//! Multi-heuristic identity extractor.
//!
//! # Responsibility
//! - Derive the active slot index from the current location.
//! - Run badge, switcher-link and free-text heuristics over a snapshot.
//! - Deduplicate raw candidates by normalized email.
//!
//! # Invariants
//! - Output emails are lowercase and unique.
//! - A candidate with a slot index wins over one without for the same email.
//! - The free-text heuristic never inspects more than `text_scan_limit` elements.

use crate::config::EngineConfig;
use crate::detect::document::DocumentSnapshot;
use crate::model::candidate::Candidate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use url::Url;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}").expect("valid email regex")
});
static MAIL_SLOT_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/mail/u/(\d+)/").expect("valid mail slot regex"));
static SLOT_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/u/(\d+)/").expect("valid slot regex"));

const SWITCHER_TAGS: &[&str] = &["a"];
const SWITCHER_HREF_NEEDLE: &str = "/u/";
const TEXT_TAGS: &[&str] = &["div", "span"];

/// Stateless extractor configured with heuristic bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityExtractor {
    badge_attribute: String,
    text_scan_limit: usize,
}

impl Default for IdentityExtractor {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl IdentityExtractor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            badge_attribute: config.badge_attribute.clone(),
            text_scan_limit: config.text_scan_limit,
        }
    }

    /// Extracts deduplicated candidates from one snapshot.
    ///
    /// Returns an empty list when no heuristic finds an email; that is a
    /// heuristic miss, not an error.
    pub fn extract(&self, snapshot: &dyn DocumentSnapshot, location: &str) -> Vec<Candidate> {
        let location_slot = slot_from_location(location);
        let mut raw = Vec::new();

        raw.extend(self.badge_candidate(snapshot, location_slot));
        raw.extend(switcher_candidates(snapshot));
        raw.extend(self.text_candidates(snapshot, location_slot));

        dedup_candidates(raw)
    }

    fn badge_candidate(
        &self,
        snapshot: &dyn DocumentSnapshot,
        location_slot: Option<u32>,
    ) -> Option<Candidate> {
        let badge =
            snapshot.first_with_attribute_containing(self.badge_attribute.as_str(), "@")?;
        let label = badge
            .attribute(self.badge_attribute.as_str())
            .filter(|value| !value.is_empty())
            .unwrap_or(badge.text.as_str());
        let email = find_email(label)?;
        Some(Candidate::new(email, location_slot))
    }

    fn text_candidates(
        &self,
        snapshot: &dyn DocumentSnapshot,
        location_slot: Option<u32>,
    ) -> Vec<Candidate> {
        snapshot
            .elements_by_tag(TEXT_TAGS, self.text_scan_limit)
            .into_iter()
            .filter_map(|element| find_email(element.text.trim()))
            .map(|email| Candidate::new(email, location_slot))
            .collect()
    }
}

/// Derives a slot index from a location URL or bare path.
///
/// `/mail/u/<N>/` takes priority over `/u/<N>/`. Returns `None` when neither
/// shape is present or the number does not fit a slot index.
pub fn slot_from_location(location: &str) -> Option<u32> {
    let path = location_path(location)?;
    [&*MAIL_SLOT_PATH_RE, &*SLOT_PATH_RE]
        .into_iter()
        .find_map(|pattern| capture_slot(pattern, path.as_str()))
}

/// Returns the first email-shaped substring of `text`.
pub fn find_email(text: &str) -> Option<&str> {
    EMAIL_RE.find(text).map(|found| found.as_str())
}

fn location_path(location: &str) -> Option<String> {
    let trimmed = location.trim();
    if let Ok(parsed) = Url::parse(trimmed) {
        return Some(parsed.path().to_string());
    }
    if trimmed.starts_with('/') {
        let end = trimmed.find(['?', '#']).unwrap_or(trimmed.len());
        return Some(trimmed[..end].to_string());
    }
    None
}

fn capture_slot(pattern: &Regex, haystack: &str) -> Option<u32> {
    pattern
        .captures(haystack)
        .and_then(|captures| captures.get(1))
        .and_then(|digits| digits.as_str().parse::<u32>().ok())
}

fn switcher_candidates(snapshot: &dyn DocumentSnapshot) -> Vec<Candidate> {
    snapshot
        .elements_by_tag(SWITCHER_TAGS, usize::MAX)
        .into_iter()
        .filter_map(|link| {
            let href = link.attribute("href")?;
            if !href.contains(SWITCHER_HREF_NEEDLE) {
                return None;
            }
            let slot = capture_slot(&SLOT_PATH_RE, href)?;
            // Links without visible email text carry no identity.
            let email = find_email(link.text.as_str())?;
            Some(Candidate::new(email, Some(slot)).with_href(href))
        })
        .collect()
}

fn dedup_candidates(raw: Vec<Candidate>) -> Vec<Candidate> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Candidate> = Vec::new();

    for mut candidate in raw {
        let key = candidate.email.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        candidate.email = key.clone();

        match positions.get(key.as_str()).copied() {
            None => {
                positions.insert(key, unique.len());
                unique.push(candidate);
            }
            Some(index) => {
                if unique[index].slot_index.is_none() && candidate.slot_index.is_some() {
                    unique[index] = candidate;
                }
            }
        }
    }

    unique
}
