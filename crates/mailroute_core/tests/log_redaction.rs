use log::{LevelFilter, Log, Metadata, Record};
use mailroute_core::{
    dispatch_json, AccountOrchestrator, CommandResponse, EngineConfig, InMemoryRuleEngine,
    LogNotifier, MemoryKeyValueStore, StoreValues,
};
use serde_json::json;
use std::sync::{Mutex, Once};

/// Captures every formatted record emitted by this test binary.
struct CapturingLogger {
    lines: Mutex<Vec<String>>,
}

impl Log for CapturingLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        self.lines
            .lock()
            .unwrap()
            .push(format!("{}", record.args()));
    }

    fn flush(&self) {}
}

static LOGGER: CapturingLogger = CapturingLogger {
    lines: Mutex::new(Vec::new()),
};
static INSTALL: Once = Once::new();

fn install_logger() {
    INSTALL.call_once(|| {
        log::set_logger(&LOGGER).expect("no other logger in this binary");
        log::set_max_level(LevelFilter::Trace);
    });
}

fn lines_mentioning(needle: &str) -> Vec<String> {
    LOGGER
        .lines
        .lock()
        .unwrap()
        .iter()
        .filter(|line| line.contains(needle))
        .cloned()
        .collect()
}

fn orchestrator(
    store: MemoryKeyValueStore,
) -> AccountOrchestrator<MemoryKeyValueStore, InMemoryRuleEngine, LogNotifier> {
    AccountOrchestrator::new(
        EngineConfig::default(),
        store,
        InMemoryRuleEngine::new(),
        LogNotifier,
    )
}

#[test]
fn command_failures_log_codes_not_addresses() {
    install_logger();
    let orchestrator = orchestrator(MemoryKeyValueStore::new());

    let response = dispatch_json(
        &orchestrator,
        r#"{"type":"DELETE_IDENTITY","payload":{"email":"secret.person@corp.com"}}"#,
    );

    assert_eq!(
        response,
        CommandResponse::Failed {
            message: "identity not found: secret.person@corp.com".to_string()
        }
    );
    assert!(lines_mentioning("secret.person@corp.com").is_empty());
    assert!(!lines_mentioning("error_code=identity_not_found").is_empty());
}

#[test]
fn invalid_persisted_state_is_logged_without_its_content() {
    install_logger();
    let store = MemoryKeyValueStore::with_values(StoreValues::from([(
        "accounts".to_string(),
        json!({
            "Hidden.User@Corp.com": {
                "email": "Hidden.User@Corp.com",
                "slot_index": 1,
                "last_observed_at": 1,
                "origin": "observed"
            }
        }),
    )]));
    let orchestrator = orchestrator(store);

    let response = dispatch_json(
        &orchestrator,
        r#"{"type":"FOUND_EMAILS","payload":[{"email":"other.user@corp.com","index":2}]}"#,
    );

    assert!(matches!(response, CommandResponse::Failed { .. }));
    assert!(lines_mentioning("Hidden.User@Corp.com").is_empty());
    assert!(lines_mentioning("other.user@corp.com").is_empty());
    assert!(!lines_mentioning("error_code=invalid_persisted_data").is_empty());
}
