use mailroute_core::{
    Candidate, Element, EngineConfig, IdentityExtractor, ObservationEvent, ObservationSession,
    ScanOutcome, ScanTrigger, StaticDocument,
};
use std::collections::BTreeMap;

fn by_email(candidates: Vec<Candidate>) -> BTreeMap<String, Option<u32>> {
    candidates
        .into_iter()
        .map(|candidate| (candidate.email, candidate.slot_index))
        .collect()
}

#[test]
fn badge_inherits_location_slot_and_link_carries_its_own() {
    let doc = StaticDocument::new(vec![
        Element::new("div").with_attribute("aria-label", "Signed in as a@x.com"),
        Element::new("a")
            .with_attribute("href", "/u/5/")
            .with_text("b@y.com"),
    ]);

    let found = IdentityExtractor::default().extract(&doc, "/mail/u/5/");

    assert_eq!(
        by_email(found),
        BTreeMap::from([
            ("a@x.com".to_string(), Some(5)),
            ("b@y.com".to_string(), Some(5)),
        ])
    );
}

#[test]
fn switcher_links_keep_their_own_slot_and_href() {
    let doc = StaticDocument::new(vec![
        Element::new("a")
            .with_attribute("href", "https://mail.google.com/mail/u/2/")
            .with_text("Work <Work@Corp.com>"),
        Element::new("a")
            .with_attribute("href", "/u/3/")
            .with_text("Add another account"),
        Element::new("a")
            .with_attribute("href", "/settings")
            .with_text("c@x.com"),
    ]);

    let found = IdentityExtractor::default().extract(&doc, "https://mail.google.com/mail/u/0/");

    assert_eq!(
        found,
        vec![Candidate::new("work@corp.com", Some(2)).with_href("https://mail.google.com/mail/u/2/")]
    );
}

#[test]
fn badge_label_without_address_yields_nothing() {
    let doc = StaticDocument::new(vec![Element::new("button")
        .with_attribute("aria-label", "@mentions")
        .with_text("owner@x.com")]);

    // Button text is outside the free-text window as well.
    assert!(IdentityExtractor::default().extract(&doc, "/mail/u/0/").is_empty());
}

#[test]
fn free_text_window_is_bounded() {
    let mut doc = StaticDocument::default();
    for index in 0..5 {
        doc.push(Element::new("span").with_text(format!("filler {index}")));
    }
    doc.push(Element::new("div").with_text("late@x.com"));

    let narrow = IdentityExtractor::new(&EngineConfig {
        text_scan_limit: 5,
        ..EngineConfig::default()
    });
    assert!(narrow.extract(&doc, "/mail/u/1/").is_empty());

    let wide = IdentityExtractor::new(&EngineConfig {
        text_scan_limit: 6,
        ..EngineConfig::default()
    });
    assert_eq!(
        wide.extract(&doc, "/mail/u/1/"),
        vec![Candidate::new("late@x.com", Some(1))]
    );
}

#[test]
fn location_without_slot_yields_unknown_slot() {
    let doc = StaticDocument::new(vec![Element::new("span").with_text("  solo@x.com  ")]);
    assert_eq!(
        IdentityExtractor::default().extract(&doc, "https://mail.google.com/"),
        vec![Candidate::new("solo@x.com", None)]
    );
}

#[test]
fn link_slot_wins_over_unknown_free_text_slot() {
    let doc = StaticDocument::new(vec![
        Element::new("span").with_text("dup@x.com"),
        Element::new("a")
            .with_attribute("href", "/u/4/")
            .with_text("DUP@x.com"),
    ]);
    let found = IdentityExtractor::default().extract(&doc, "https://mail.google.com/");
    assert_eq!(by_email(found), BTreeMap::from([("dup@x.com".to_string(), Some(4))]));
}

#[test]
fn session_emits_only_changes_across_triggers() {
    let mut session = ObservationSession::new(&EngineConfig::default());
    let empty = StaticDocument::default();
    let loaded = StaticDocument::new(vec![Element::new("div").with_text("me@x.com")]);

    let outcome = session.observe(ObservationEvent {
        trigger: ScanTrigger::InitialLoad,
        snapshot: &empty,
        location: "/mail/u/0/",
    });
    assert_eq!(outcome, ScanOutcome::NothingFound);
    assert!(session.is_polling());

    let outcome = session.observe(ObservationEvent {
        trigger: ScanTrigger::RetryTick,
        snapshot: &loaded,
        location: "/mail/u/0/",
    });
    assert_eq!(
        outcome,
        ScanOutcome::Emit(vec![Candidate::new("me@x.com", Some(0))])
    );
    assert!(!session.is_polling());

    let outcome = session.observe(ObservationEvent {
        trigger: ScanTrigger::ContentMutation,
        snapshot: &loaded,
        location: "/mail/u/0/",
    });
    assert_eq!(outcome, ScanOutcome::Unchanged);
}
