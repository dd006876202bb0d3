//! SQLite-backed key-value store.

use crate::store::kv::{KeyValueStore, StoreError, StoreResult, StoreValues};
use log::error;
use rusqlite::{params, Connection};
use std::sync::{Mutex, MutexGuard};

/// Key-value store over the `kv_entries` table.
///
/// Takes ownership of a migrated connection from [`crate::db::open_db`].
pub struct SqliteKeyValueStore {
    conn: Mutex<Connection>,
}

impl SqliteKeyValueStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, keys: &[&str]) -> StoreResult<StoreValues> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached("SELECT value FROM kv_entries WHERE key = ?1;")?;
        let mut values = StoreValues::new();

        for key in keys {
            let mut rows = stmt.query([*key])?;
            let Some(row) = rows.next()? else {
                continue;
            };
            let raw: String = row.get(0)?;
            let value = serde_json::from_str(raw.as_str()).map_err(|err| {
                StoreError::InvalidData(format!("kv_entries.value for `{key}` is not JSON: {err}"))
            })?;
            values.insert((*key).to_string(), value);
        }

        Ok(values)
    }

    fn set(&self, values: StoreValues) -> StoreResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO kv_entries (key, value, updated_at)
                 VALUES (?1, ?2, CAST(strftime('%s', 'now') AS INTEGER) * 1000)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at;",
            )?;
            for (key, value) in &values {
                stmt.execute(params![key, value.to_string()])?;
            }
        }
        tx.commit().map_err(|err| {
            error!("event=kv_set module=store status=error keys={} error={err}", values.len());
            StoreError::from(err)
        })
    }

    fn remove(&self, keys: &[&str]) -> StoreResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached("DELETE FROM kv_entries WHERE key = ?1;")?;
            for key in keys {
                stmt.execute([*key])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
