use lexicon_core::db::migrations::latest_version;
use lexicon_core::db::{open_db, open_db_in_memory, DbError, DEFAULT_BUSY_TIMEOUT};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_creates_dictionary_tables() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "words");
    assert_table_exists(&conn, "translations");
    assert_table_exists(&conn, "sentences");
}

#[test]
fn reopening_a_database_file_keeps_schema_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lexicon.db");

    let first = open_db(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
    first
        .execute("INSERT INTO words (polish) VALUES ('dom');", [])
        .unwrap();
    drop(first);

    let second = open_db(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
    assert_eq!(schema_version(&second), latest_version());
    let words: i64 = second
        .query_row("SELECT COUNT(*) FROM words;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(words, 1);
}

#[test]
fn file_databases_run_in_wal_mode_with_foreign_keys() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("wal.db"), DEFAULT_BUSY_TIMEOUT).unwrap();

    let journal: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal.to_ascii_lowercase(), "wal");

    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn schema_rejects_duplicate_natural_keys() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO words (id, polish) VALUES (1, 'kot');
         INSERT INTO translations (id, word_id, english) VALUES (10, 1, 'cat');
         INSERT INTO sentences (translation_id, sentence) VALUES (10, 'The cat sleeps');",
    )
    .unwrap();

    assert!(conn
        .execute("INSERT INTO words (polish) VALUES ('kot');", [])
        .is_err());
    assert!(conn
        .execute(
            "INSERT INTO translations (word_id, english) VALUES (1, 'cat');",
            []
        )
        .is_err());
    assert!(conn
        .execute(
            "INSERT INTO sentences (translation_id, sentence) VALUES (10, 'The cat sleeps');",
            []
        )
        .is_err());
}

#[test]
fn deleting_a_word_cascades_to_its_subtree() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO words (id, polish) VALUES (1, 'kot');
         INSERT INTO translations (id, word_id, english) VALUES (10, 1, 'cat');
         INSERT INTO sentences (translation_id, sentence) VALUES (10, 'The cat sleeps');
         DELETE FROM words WHERE id = 1;",
    )
    .unwrap();

    for table in ["translations", "sentences"] {
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 0, "{table} should be empty after cascade");
    }
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path, DEFAULT_BUSY_TIMEOUT).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
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
