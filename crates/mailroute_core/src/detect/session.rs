//! Observation session: extraction, change detection and bounded retries.
//!
//! # Responsibility
//! - Turn host scan triggers into at most one candidate emission each.
//! - Own session-scoped state (last fingerprint, retry budget).
//!
//! # Invariants
//! - Fallback ticks stop after `retry_ceiling` attempts.
//! - Any non-empty scan result cancels remaining fallback ticks.
//! - Ticks arriving after polling stopped never scan.

use crate::config::EngineConfig;
use crate::detect::change::ChangeDetector;
use crate::detect::document::DocumentSnapshot;
use crate::detect::extractor::IdentityExtractor;
use crate::model::candidate::Candidate;
use log::debug;
use std::time::Duration;
use uuid::Uuid;

/// Why the host asked for a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanTrigger {
    InitialLoad,
    ContentMutation,
    RetryTick,
}

impl ScanTrigger {
    fn as_str(self) -> &'static str {
        match self {
            Self::InitialLoad => "initial_load",
            Self::ContentMutation => "content_mutation",
            Self::RetryTick => "retry_tick",
        }
    }
}

/// One scan request delivered by the observation source.
pub struct ObservationEvent<'a> {
    pub trigger: ScanTrigger,
    pub snapshot: &'a dyn DocumentSnapshot,
    /// Current navigation location (full URL or path).
    pub location: &'a str,
}

/// Result of handling one [`ObservationEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// New candidate set to report downstream.
    Emit(Vec<Candidate>),
    /// Candidates found but identical to the last emission.
    Unchanged,
    /// No heuristic produced a candidate.
    NothingFound,
    /// Fallback tick ignored because polling already stopped.
    PollingStopped,
}

/// Session-scoped detection state.
#[derive(Debug)]
pub struct ObservationSession {
    session_id: Uuid,
    extractor: IdentityExtractor,
    detector: ChangeDetector,
    retry_interval: Duration,
    retry_ceiling: u32,
    retry_attempts: u32,
    polling: bool,
}

impl ObservationSession {
    /// Starts a fresh session with empty change-detection state.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            extractor: IdentityExtractor::new(config),
            detector: ChangeDetector::new(),
            retry_interval: config.retry_interval(),
            retry_ceiling: config.retry_ceiling,
            retry_attempts: 0,
            polling: config.retry_ceiling > 0,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Interval the host should wait between fallback ticks.
    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    /// Whether the host should keep delivering fallback ticks.
    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    /// Scans the snapshot and decides whether to emit.
    pub fn observe(&mut self, event: ObservationEvent<'_>) -> ScanOutcome {
        if event.trigger == ScanTrigger::RetryTick {
            if !self.polling {
                return ScanOutcome::PollingStopped;
            }
            self.retry_attempts += 1;
        }

        let candidates = self.extractor.extract(event.snapshot, event.location);

        if !candidates.is_empty() || self.retry_attempts >= self.retry_ceiling {
            self.polling = false;
        }

        let outcome = if candidates.is_empty() {
            ScanOutcome::NothingFound
        } else if self.detector.should_emit(&candidates) {
            ScanOutcome::Emit(candidates)
        } else {
            ScanOutcome::Unchanged
        };

        debug!(
            "event=scan module=detect status=ok session={} trigger={} outcome={} retry_attempts={} polling={}",
            self.session_id,
            event.trigger.as_str(),
            outcome_label(&outcome),
            self.retry_attempts,
            self.polling
        );
        outcome
    }
}

fn outcome_label(outcome: &ScanOutcome) -> String {
    match outcome {
        ScanOutcome::Emit(candidates) => format!("emit:{}", candidates.len()),
        ScanOutcome::Unchanged => "unchanged".to_string(),
        ScanOutcome::NothingFound => "nothing_found".to_string(),
        ScanOutcome::PollingStopped => "polling_stopped".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{ObservationEvent, ObservationSession, ScanOutcome, ScanTrigger};
    use crate::config::EngineConfig;
    use crate::detect::document::{Element, StaticDocument};

    fn tick(doc: &StaticDocument) -> ObservationEvent<'_> {
        ObservationEvent {
            trigger: ScanTrigger::RetryTick,
            snapshot: doc,
            location: "https://mail.google.com/mail/u/0/",
        }
    }

    fn mutation(doc: &StaticDocument) -> ObservationEvent<'_> {
        ObservationEvent {
            trigger: ScanTrigger::ContentMutation,
            snapshot: doc,
            location: "/mail/u/1/",
        }
    }

    #[test]
    fn retries_stop_at_ceiling() {
        let config = EngineConfig {
            retry_ceiling: 3,
            ..EngineConfig::default()
        };
        let mut session = ObservationSession::new(&config);
        let empty = StaticDocument::default();

        for _ in 0..3 {
            assert!(session.is_polling());
            assert_eq!(session.observe(tick(&empty)), ScanOutcome::NothingFound);
        }
        assert!(!session.is_polling());
        assert_eq!(session.observe(tick(&empty)), ScanOutcome::PollingStopped);
        assert_eq!(session.retry_attempts(), 3);
    }

    #[test]
    fn non_empty_result_cancels_remaining_retries() {
        let mut session = ObservationSession::new(&EngineConfig::default());
        let doc = StaticDocument::new(vec![Element::new("span").with_text("me@x.com")]);

        let outcome = session.observe(ObservationEvent {
            trigger: ScanTrigger::InitialLoad,
            snapshot: &doc,
            location: "/mail/u/1/",
        });
        assert!(matches!(outcome, ScanOutcome::Emit(ref found) if found.len() == 1));
        assert!(!session.is_polling());
        assert_eq!(session.observe(tick(&doc)), ScanOutcome::PollingStopped);
    }

    #[test]
    fn mutation_rescans_are_deduplicated_within_session() {
        let mut session = ObservationSession::new(&EngineConfig::default());
        let doc = StaticDocument::new(vec![Element::new("div").with_text("me@x.com")]);

        assert!(matches!(session.observe(mutation(&doc)), ScanOutcome::Emit(_)));
        assert_eq!(session.observe(mutation(&doc)), ScanOutcome::Unchanged);

        let mut fresh = ObservationSession::new(&EngineConfig::default());
        assert!(matches!(fresh.observe(mutation(&doc)), ScanOutcome::Emit(_)));
        assert_ne!(fresh.session_id(), session.session_id());
    }

    #[test]
    fn zero_ceiling_never_polls() {
        let config = EngineConfig {
            retry_ceiling: 0,
            ..EngineConfig::default()
        };
        let mut session = ObservationSession::new(&config);
        assert!(!session.is_polling());
        let empty = StaticDocument::default();
        assert_eq!(session.observe(tick(&empty)), ScanOutcome::PollingStopped);
    }
}
