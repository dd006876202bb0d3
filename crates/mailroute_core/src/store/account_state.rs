//! Typed account-state access over the key-value capability.
//!
//! # Invariants
//! - Identities live under `accounts`, the default slot under `defaultAccount`.
//! - A missing key decodes to the empty value (empty map, no default).
//! - Decoded identity maps are validated before use.

use crate::model::identity::IdentityMap;
use crate::routing::state::DefaultSelection;
use crate::store::kv::{KeyValueStore, StoreError, StoreResult, StoreValues};
use serde_json::Value;

/// Storage key of the identity map.
pub const ACCOUNTS_KEY: &str = "accounts";
/// Storage key of the default slot.
pub const DEFAULT_ACCOUNT_KEY: &str = "defaultAccount";

/// Reads the identity map.
pub fn load_identities(store: &dyn KeyValueStore) -> StoreResult<IdentityMap> {
    let mut values = store.get(&[ACCOUNTS_KEY])?;
    let Some(raw) = values.remove(ACCOUNTS_KEY) else {
        return Ok(IdentityMap::new());
    };
    if raw.is_null() {
        return Ok(IdentityMap::new());
    }

    let map: IdentityMap = serde_json::from_value(raw)
        .map_err(|err| StoreError::InvalidData(format!("`{ACCOUNTS_KEY}`: {err}")))?;
    map.validate()
        .map_err(|err| StoreError::InvalidData(format!("`{ACCOUNTS_KEY}`: {err}")))?;
    Ok(map)
}

/// Replaces the identity map.
pub fn save_identities(store: &dyn KeyValueStore, map: &IdentityMap) -> StoreResult<()> {
    let value = identities_value(map)?;
    store.set(StoreValues::from([(ACCOUNTS_KEY.to_string(), value)]))
}

/// Replaces the identity map and the default selection in one store call.
pub fn save_account_state(
    store: &dyn KeyValueStore,
    map: &IdentityMap,
    selection: DefaultSelection,
) -> StoreResult<()> {
    store.set(StoreValues::from([
        (ACCOUNTS_KEY.to_string(), identities_value(map)?),
        (DEFAULT_ACCOUNT_KEY.to_string(), default_value(selection)),
    ]))
}

/// Drops the identity map entirely.
pub fn clear_identities(store: &dyn KeyValueStore) -> StoreResult<()> {
    store.remove(&[ACCOUNTS_KEY])
}

/// Reads the default selection.
pub fn load_default(store: &dyn KeyValueStore) -> StoreResult<DefaultSelection> {
    let mut values = store.get(&[DEFAULT_ACCOUNT_KEY])?;
    match values.remove(DEFAULT_ACCOUNT_KEY) {
        None | Some(Value::Null) => Ok(DefaultSelection::NoDefault),
        Some(raw) => serde_json::from_value(raw)
            .map_err(|err| StoreError::InvalidData(format!("`{DEFAULT_ACCOUNT_KEY}`: {err}"))),
    }
}

/// Persists the default selection; `NoDefault` is stored as `null`.
pub fn save_default(store: &dyn KeyValueStore, selection: DefaultSelection) -> StoreResult<()> {
    store.set(StoreValues::from([(
        DEFAULT_ACCOUNT_KEY.to_string(),
        default_value(selection),
    )]))
}

fn identities_value(map: &IdentityMap) -> StoreResult<Value> {
    serde_json::to_value(map)
        .map_err(|err| StoreError::InvalidData(format!("`{ACCOUNTS_KEY}`: {err}")))
}

fn default_value(selection: DefaultSelection) -> Value {
    selection.slot().map_or(Value::Null, Value::from)
}
