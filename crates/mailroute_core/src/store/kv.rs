//! Key-value persistence contract.

use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;

pub type StoreResult<T> = Result<T, StoreError>;

/// Values keyed by storage key.
pub type StoreValues = BTreeMap<String, Value>;

/// Persistence error for key-value operations, database bootstrap and
/// account-state decoding.
#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    /// The database was written by a newer schema than this build knows.
    SchemaTooNew { found: u32, supported: u32 },
    /// Persisted value cannot be decoded into the expected shape.
    InvalidData(String),
    /// Host storage rejected the call.
    Unavailable(String),
}

impl StoreError {
    /// Stable log code; never carries stored values.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite_failed",
            Self::SchemaTooNew { .. } => "schema_too_new",
            Self::InvalidData(_) => "invalid_persisted_data",
            Self::Unavailable(_) => "storage_unavailable",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "database schema version {found} is newer than supported {supported}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Unavailable(message) => write!(f, "storage unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Asynchronous-storage capability modeled as synchronous calls.
///
/// Missing keys are simply absent from `get` results.
pub trait KeyValueStore {
    fn get(&self, keys: &[&str]) -> StoreResult<StoreValues>;
    fn set(&self, values: StoreValues) -> StoreResult<()>;
    fn remove(&self, keys: &[&str]) -> StoreResult<()>;
}

/// Process-local store for hosts without durable storage.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<StoreValues>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: StoreValues) -> Self {
        Self {
            entries: Mutex::new(values),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreValues> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, keys: &[&str]) -> StoreResult<StoreValues> {
        let entries = self.lock();
        Ok(keys
            .iter()
            .filter_map(|key| {
                entries
                    .get(*key)
                    .map(|value| ((*key).to_string(), value.clone()))
            })
            .collect())
    }

    fn set(&self, values: StoreValues) -> StoreResult<()> {
        self.lock().extend(values);
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> StoreResult<()> {
        let mut entries = self.lock();
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}
