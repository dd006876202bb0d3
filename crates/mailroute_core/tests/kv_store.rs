use mailroute_core::db::{open_db, open_db_in_memory};
use mailroute_core::{KeyValueStore, SqliteKeyValueStore, StoreError, StoreValues};
use serde_json::json;

fn values(pairs: &[(&str, serde_json::Value)]) -> StoreValues {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

#[test]
fn set_get_remove_roundtrip() {
    let store = SqliteKeyValueStore::new(open_db_in_memory().unwrap());

    store
        .set(values(&[("accounts", json!({})), ("defaultAccount", json!(3))]))
        .unwrap();
    let loaded = store.get(&["accounts", "defaultAccount", "missing"]).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded["defaultAccount"], json!(3));

    store.set(values(&[("defaultAccount", json!(null))])).unwrap();
    assert_eq!(
        store.get(&["defaultAccount"]).unwrap()["defaultAccount"],
        json!(null)
    );

    store.remove(&["accounts", "missing"]).unwrap();
    assert!(store.get(&["accounts"]).unwrap().is_empty());
}

#[test]
fn values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.db");

    {
        let store = SqliteKeyValueStore::new(open_db(&path).unwrap());
        store.set(values(&[("defaultAccount", json!(2))])).unwrap();
    }

    let store = SqliteKeyValueStore::new(open_db(&path).unwrap());
    assert_eq!(
        store.get(&["defaultAccount"]).unwrap()["defaultAccount"],
        json!(2)
    );
}

#[test]
fn corrupted_rows_surface_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    // Recreate the table without the JSON check to plant a broken value.
    conn.execute_batch(
        "DROP TABLE kv_entries;
         CREATE TABLE kv_entries (key TEXT PRIMARY KEY, value TEXT NOT NULL, updated_at INTEGER);
         INSERT INTO kv_entries (key, value, updated_at) VALUES ('accounts', '{broken', 0);",
    )
    .unwrap();
    let store = SqliteKeyValueStore::new(conn);

    let err = store.get(&["accounts"]).unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
}
