//! Inbound command boundary for popup and dashboard collaborators.
//!
//! # Responsibility
//! - Decode JSON request envelopes into typed commands.
//! - Run commands against the orchestrator and shape JSON-ready responses.
//!
//! # Invariants
//! - Malformed payloads are ignored without touching state.
//! - Mutating commands acknowledge only after persistence completed.
//! - Failures are reported in the response; nothing here panics.

use crate::model::candidate::Candidate;
use crate::model::identity::IdentityMap;
use crate::routing::engine::RuleEngine;
use crate::service::notify::Notifier;
use crate::service::orchestrator::AccountOrchestrator;
use crate::store::kv::KeyValueStore;
use log::warn;
use serde::{Deserialize, Serialize};

/// One request from a collaborator, as `{ "type": ..., "payload": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Report newly found identities.
    FoundEmails(Vec<Candidate>),
    GetAccounts,
    /// Set the default slot, or clear it with `null`.
    SetDefault(Option<u32>),
    DeleteIdentity {
        email: String,
    },
    AddIdentity {
        email: String,
        #[serde(default, alias = "index")]
        slot_index: Option<u32>,
    },
    ClearIdentities,
}

/// Response returned for every command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandResponse {
    /// Command completed; `changed` reports whether persisted state moved.
    Ok { changed: bool },
    Accounts {
        accounts: IdentityMap,
        #[serde(rename = "defaultAccount")]
        default_account: Option<u32>,
    },
    /// The command was valid but the operation failed.
    Failed { message: String },
    /// The payload could not be decoded; nothing was done.
    Ignored { reason: String },
}

/// Decodes one JSON command envelope.
pub fn parse_command(raw: &str) -> Result<Command, String> {
    serde_json::from_str(raw).map_err(|err| err.to_string())
}

/// Decodes and executes one JSON command envelope.
pub fn dispatch_json<S, E, N>(orchestrator: &AccountOrchestrator<S, E, N>, raw: &str) -> CommandResponse
where
    S: KeyValueStore,
    E: RuleEngine,
    N: Notifier,
{
    match parse_command(raw) {
        Ok(command) => dispatch(orchestrator, command),
        Err(reason) => {
            warn!("event=command module=service status=ignored error_code=malformed_payload");
            CommandResponse::Ignored { reason }
        }
    }
}

/// Executes one typed command.
pub fn dispatch<S, E, N>(orchestrator: &AccountOrchestrator<S, E, N>, command: Command) -> CommandResponse
where
    S: KeyValueStore,
    E: RuleEngine,
    N: Notifier,
{
    let result = match command {
        Command::FoundEmails(candidates) => orchestrator
            .on_observation(&candidates)
            .map(|report| CommandResponse::Ok {
                changed: report.changed,
            }),
        Command::GetAccounts => {
            orchestrator
                .get_accounts()
                .map(|snapshot| CommandResponse::Accounts {
                    accounts: snapshot.identities,
                    default_account: snapshot.default_selection.slot(),
                })
        }
        Command::SetDefault(slot_index) => orchestrator
            .set_default(slot_index)
            .map(|changed| CommandResponse::Ok { changed }),
        Command::DeleteIdentity { email } => orchestrator
            .delete_identity(email.as_str())
            .map(|_| CommandResponse::Ok { changed: true }),
        Command::AddIdentity { email, slot_index } => orchestrator
            .add_identity(email.as_str(), slot_index)
            .map(|_| CommandResponse::Ok { changed: true }),
        Command::ClearIdentities => orchestrator
            .clear_identities()
            .map(|changed| CommandResponse::Ok { changed }),
    };

    result.unwrap_or_else(|err| {
        warn!(
            "event=command module=service status=error error_code={}",
            err.error_code()
        );
        CommandResponse::Failed {
            message: err.to_string(),
        }
    })
}
