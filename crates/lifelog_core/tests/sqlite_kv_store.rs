use lifelog_core::storage::sqlite::SCHEMA_VERSION;
use lifelog_core::{
    AchievementStore, KeyValueStore, LoadOutcome, SqliteKvStore, StorageError, StoreOptions,
};
use rusqlite::Connection;
use std::sync::Arc;

#[test]
fn open_creates_table_and_tags_schema_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lifelog.db");

    drop(SqliteKvStore::open(&path).unwrap());

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn), SCHEMA_VERSION);
    assert_table_exists(&conn, "kv_entries");
}

#[test]
fn reopening_keeps_stored_values_and_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lifelog.db");

    SqliteKvStore::open(&path).unwrap().set("k", b"v").unwrap();
    let store = SqliteKvStore::open(&path).unwrap();
    assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
    drop(store);

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn), SCHEMA_VERSION);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match SqliteKvStore::open(&path) {
        Err(StorageError::UnsupportedSchemaVersion { found, supported }) => {
            assert_eq!(found, 999);
            assert_eq!(supported, SCHEMA_VERSION);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("newer schema should be rejected"),
    }

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn), 999);
}

#[test]
fn set_upserts_and_get_reads_back() {
    let store = SqliteKvStore::open_in_memory().unwrap();
    assert_eq!(store.get("k").unwrap(), None);

    store.set("k", b"one").unwrap();
    store.set("k", b"two").unwrap();
    assert_eq!(store.get("k").unwrap(), Some(b"two".to_vec()));
}

#[test]
fn blank_key_is_rejected() {
    let store = SqliteKvStore::open_in_memory().unwrap();
    assert!(matches!(store.get(" "), Err(StorageError::InvalidKey)));
}

#[test]
fn achievements_survive_reopening_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("achievements.db");

    let saved = {
        let kv = Arc::new(SqliteKvStore::open(&path).unwrap());
        let (mut store, outcome) = AchievementStore::open(kv, StoreOptions::default()).unwrap();
        assert!(matches!(outcome, LoadOutcome::Absent));
        store
            .add("Graduation", Some("finished degree"), Some("2019-02-20"))
            .unwrap();
        store.add("Marathon", Some("ran 42km"), Some("2022-10-09")).unwrap();
        store.shutdown();
        store.records().to_vec()
    };

    let kv = Arc::new(SqliteKvStore::open(&path).unwrap());
    let (store, outcome) = AchievementStore::open(kv, StoreOptions::default()).unwrap();
    assert!(matches!(outcome, LoadOutcome::Loaded { count: 2 }));
    assert_eq!(store.records(), saved.as_slice());
    assert_eq!(store.query("42").len(), 1);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
