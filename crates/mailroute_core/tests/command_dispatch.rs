use mailroute_core::{
    dispatch_json, AccountOrchestrator, CommandResponse, DefaultSelection, EngineConfig,
    InMemoryRuleEngine, LogNotifier, MemoryKeyValueStore,
};
use serde_json::{json, Value};

type TestOrchestrator = AccountOrchestrator<MemoryKeyValueStore, InMemoryRuleEngine, LogNotifier>;

fn orchestrator() -> TestOrchestrator {
    AccountOrchestrator::new(
        EngineConfig::default(),
        MemoryKeyValueStore::new(),
        InMemoryRuleEngine::new(),
        LogNotifier,
    )
    .with_clock(|| 1_000)
}

fn to_json(response: &CommandResponse) -> Value {
    serde_json::to_value(response).expect("response serializes")
}

#[test]
fn found_emails_then_get_accounts() {
    let orchestrator = orchestrator();

    let response = dispatch_json(
        &orchestrator,
        r#"{"type":"FOUND_EMAILS","payload":[{"email":"A@x.com","index":2,"href":"https://mail.google.com/mail/u/2/"},{"email":"b@x.com","index":null}]}"#,
    );
    assert_eq!(response, CommandResponse::Ok { changed: true });

    let response = dispatch_json(&orchestrator, r#"{"type":"SET_DEFAULT","payload":2}"#);
    assert_eq!(response, CommandResponse::Ok { changed: true });

    let response = dispatch_json(&orchestrator, r#"{"type":"GET_ACCOUNTS"}"#);
    assert_eq!(
        to_json(&response),
        json!({
            "status": "accounts",
            "accounts": {
                "a@x.com": {
                    "email": "a@x.com",
                    "slot_index": 2,
                    "last_observed_at": 1000,
                    "origin": "observed",
                    "href": "https://mail.google.com/mail/u/2/"
                },
                "b@x.com": {
                    "email": "b@x.com",
                    "slot_index": null,
                    "last_observed_at": 1000,
                    "origin": "observed",
                    "href": null
                }
            },
            "defaultAccount": 2
        })
    );
    assert_eq!(orchestrator.engine().rules().len(), 1);
}

#[test]
fn repeated_report_is_acknowledged_as_unchanged() {
    let orchestrator = orchestrator();
    let raw = r#"{"type":"FOUND_EMAILS","payload":[{"email":"a@x.com","slot_index":1}]}"#;

    assert_eq!(dispatch_json(&orchestrator, raw), CommandResponse::Ok { changed: true });
    assert_eq!(dispatch_json(&orchestrator, raw), CommandResponse::Ok { changed: false });
}

#[test]
fn malformed_payload_is_ignored_without_mutation() {
    let orchestrator = orchestrator();
    dispatch_json(&orchestrator, r#"{"type":"SET_DEFAULT","payload":1}"#);

    for raw in [
        "{",
        r#"{"type":"SET_DEFAULT","payload":"two"}"#,
        r#"{"type":"DELETE_IDENTITY","payload":{}}"#,
        r#"{"type":"DROP_EVERYTHING"}"#,
    ] {
        let response = dispatch_json(&orchestrator, raw);
        assert!(matches!(response, CommandResponse::Ignored { .. }), "{raw:?}");
    }

    let accounts = orchestrator.get_accounts().unwrap();
    assert!(accounts.identities.is_empty());
    assert_eq!(accounts.default_selection, DefaultSelection::DefaultSet(1));
    assert_eq!(orchestrator.engine().rules().len(), 1);
}

#[test]
fn delete_unknown_identity_reports_failure() {
    let orchestrator = orchestrator();
    let response = dispatch_json(
        &orchestrator,
        r#"{"type":"DELETE_IDENTITY","payload":{"email":"ghost@x.com"}}"#,
    );
    assert_eq!(
        response,
        CommandResponse::Failed {
            message: "identity not found: ghost@x.com".to_string()
        }
    );
}

#[test]
fn manual_add_and_clear_round_through_commands() {
    let orchestrator = orchestrator();

    let response = dispatch_json(
        &orchestrator,
        r#"{"type":"ADD_IDENTITY","payload":{"email":"m@x.com","index":3}}"#,
    );
    assert_eq!(response, CommandResponse::Ok { changed: true });
    dispatch_json(&orchestrator, r#"{"type":"SET_DEFAULT","payload":3}"#);

    let response = dispatch_json(&orchestrator, r#"{"type":"CLEAR_IDENTITIES"}"#);
    assert_eq!(response, CommandResponse::Ok { changed: true });

    let response = dispatch_json(&orchestrator, r#"{"type":"GET_ACCOUNTS"}"#);
    assert_eq!(
        to_json(&response),
        json!({ "status": "accounts", "accounts": {}, "defaultAccount": null })
    );
    assert!(orchestrator.engine().rules().is_empty());
}

#[test]
fn no_op_commands_report_unchanged() {
    let orchestrator = orchestrator();

    assert_eq!(
        dispatch_json(&orchestrator, r#"{"type":"SET_DEFAULT","payload":4}"#),
        CommandResponse::Ok { changed: true }
    );
    assert_eq!(
        dispatch_json(&orchestrator, r#"{"type":"SET_DEFAULT","payload":4}"#),
        CommandResponse::Ok { changed: false }
    );
    assert_eq!(orchestrator.engine().rules().len(), 1);

    assert_eq!(
        dispatch_json(&orchestrator, r#"{"type":"CLEAR_IDENTITIES"}"#),
        CommandResponse::Ok { changed: true }
    );
    assert_eq!(
        dispatch_json(&orchestrator, r#"{"type":"CLEAR_IDENTITIES"}"#),
        CommandResponse::Ok { changed: false }
    );
}
