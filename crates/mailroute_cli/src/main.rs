//! CLI entry point.
//!
//! # Responsibility
//! - Without arguments, print a deterministic linkage probe.
//! - With `<db-path> <command-json>`, run one command envelope against a
//!   SQLite-backed store and print the response plus the resulting rules.
//!
//! # Environment
//! - `MAILROUTE_LOG_DIR`: absolute directory for rolling log files.
//! - `MAILROUTE_LOG_LEVEL`: overrides the build-profile default level.

use mailroute_core::db::open_db;
use mailroute_core::{
    core_version, default_log_level, dispatch_json, init_logging, ping, AccountOrchestrator,
    EngineConfig, InMemoryRuleEngine, LogNotifier, SqliteKeyValueStore,
};
use std::process::ExitCode;

const LOG_DIR_ENV: &str = "MAILROUTE_LOG_DIR";
const LOG_LEVEL_ENV: &str = "MAILROUTE_LOG_LEVEL";

fn main() -> ExitCode {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    match args.as_slice() {
        [] => {
            println!("mailroute_core ping={}", ping());
            println!("mailroute_core version={}", core_version());
            ExitCode::SUCCESS
        }
        [db_path, command] => match run_command(db_path, command) {
            Ok(()) => ExitCode::SUCCESS,
            Err(message) => {
                eprintln!("error: {message}");
                ExitCode::FAILURE
            }
        },
        _ => {
            eprintln!("usage: mailroute_cli [<db-path> <command-json>]");
            ExitCode::from(2)
        }
    }
}

fn run_command(db_path: &str, raw_command: &str) -> Result<(), String> {
    configure_logging()?;

    let conn = open_db(db_path).map_err(|err| err.to_string())?;
    let orchestrator = AccountOrchestrator::new(
        EngineConfig::default(),
        SqliteKeyValueStore::new(conn),
        InMemoryRuleEngine::new(),
        LogNotifier,
    );
    // Rules live in process memory, so each run rebuilds them from the
    // persisted default first.
    orchestrator.initialize().map_err(|err| err.to_string())?;

    let response = dispatch_json(&orchestrator, raw_command);
    let rules = orchestrator.engine().rules();
    let output = serde_json::json!({
        "response": response,
        "rules": rules,
    });
    let rendered = serde_json::to_string_pretty(&output).map_err(|err| err.to_string())?;
    println!("{rendered}");
    log::info!(
        "event=cli_command module=cli status=ok active_rules={}",
        rules.len()
    );
    Ok(())
}

fn configure_logging() -> Result<(), String> {
    let Ok(log_dir) = std::env::var(LOG_DIR_ENV) else {
        return Ok(());
    };
    let level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| default_log_level().to_string());
    init_logging(level.as_str(), log_dir.as_str()).map_err(|err| err.to_string())
}
