//! Unit tests for the SimpleBrowser database layer (connection + migrations).

use rusqlite::Connection;
use simplebrowser::database::migrations::{get_schema_version, run_all, CURRENT_SCHEMA_VERSION};
use simplebrowser::database::Database;
use tempfile::TempDir;

#[test]
fn test_open_in_memory_succeeds() {
    let db = Database::open_in_memory();
    assert!(db.is_ok(), "open_in_memory should succeed");
}

#[test]
fn test_migrations_create_all_tables() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let conn = db.connection();

    for table in &["favorites", "favorites_meta", "schema_version"] {
        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name=?1",
                [table],
                |row| row.get(0),
            )
            .unwrap_or(false);
        assert!(exists, "Table '{}' should exist after migrations", table);
    }
}

#[test]
fn test_migrations_create_indexes() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let conn = db.connection();

    for index in &["idx_favorites_parent_id", "idx_favorites_url"] {
        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='index' AND name=?1",
                [index],
                |row| row.get(0),
            )
            .unwrap_or(false);
        assert!(exists, "Index '{}' should exist after migrations", index);
    }
}

#[test]
fn test_schema_version_is_current() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    assert_eq!(get_schema_version(db.connection()), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_migrations_are_idempotent() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    // Running migrations a second time should not fail
    let result = run_all(db.connection());
    assert!(result.is_ok(), "Running migrations twice should succeed (idempotent)");
    assert_eq!(get_schema_version(db.connection()), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_open_file_database_creates_parent_dirs() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("favorites.db");

    let db = Database::open(&db_path);
    assert!(db.is_ok(), "open with file path should succeed");
    assert!(db_path.exists(), "Database file should exist on disk");
}

#[test]
fn test_favorites_table_schema() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let conn = db.connection();

    conn.execute(
        "INSERT INTO favorites (title, url, is_folder, parent_id, position, created_at)
         VALUES (?1, ?2, 0, 0, 0, 1700000000)",
        ["Qt", "https://qt.io"],
    )
    .expect("Should be able to insert into favorites");

    let (id, title, icon): (i64, String, Option<String>) = conn
        .query_row(
            "SELECT id, title, icon_path FROM favorites WHERE url = ?1",
            ["https://qt.io"],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .expect("Should be able to query favorites");

    assert!(id > 0, "ids are assigned by AUTOINCREMENT");
    assert_eq!(title, "Qt");
    assert_eq!(icon, None);
}

#[test]
fn test_favorites_defaults() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let conn = db.connection();

    conn.execute("INSERT INTO favorites (title) VALUES ('Folder')", [])
        .expect("Should insert with defaults");

    let (url, parent_id, created_at): (String, i64, i64) = conn
        .query_row(
            "SELECT url, parent_id, created_at FROM favorites WHERE title = 'Folder'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(url, "");
    assert_eq!(parent_id, 0);
    assert!(created_at > 0);
}

#[test]
fn test_v1_database_is_upgraded() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE schema_version (
             version INTEGER PRIMARY KEY,
             applied_at INTEGER NOT NULL,
             description TEXT NOT NULL
         );
         INSERT INTO schema_version VALUES (1, 1700000000, 'v1');
         CREATE TABLE favorites (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             title TEXT NOT NULL,
             url TEXT NOT NULL DEFAULT '',
             icon_path TEXT,
             parent_id INTEGER NOT NULL DEFAULT 0,
             created_at INTEGER NOT NULL DEFAULT 0
         );
         INSERT INTO favorites (id, title, url, parent_id) VALUES (1, 'Docs', '', 0);
         INSERT INTO favorites (id, title, url, parent_id) VALUES (2, 'Qt', 'https://qt.io', 1);",
    )
    .unwrap();

    run_all(&conn).expect("upgrade should succeed");
    assert_eq!(get_schema_version(&conn), CURRENT_SCHEMA_VERSION);

    let rows: Vec<(i64, bool, i64)> = conn
        .prepare("SELECT id, is_folder, position FROM favorites ORDER BY id")
        .unwrap()
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows, vec![(1, true, 1), (2, false, 2)]);
}

/// Files from the first releases: `DATETIME DEFAULT CURRENT_TIMESTAMP`, a nullable
/// `parent_id`, no folder flag and no `schema_version` table.
#[test]
fn test_datetime_table_is_upgraded_to_unix_seconds() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE favorites (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             title TEXT NOT NULL,
             url TEXT NOT NULL,
             icon_path TEXT,
             parent_id INTEGER DEFAULT 0,
             created_at DATETIME DEFAULT CURRENT_TIMESTAMP
         );
         INSERT INTO favorites (title, url) VALUES ('Docs', '');
         INSERT INTO favorites (title, url, parent_id, created_at)
             VALUES ('Qt', 'https://qt.io', 1, '2024-01-01 12:00:00');
         INSERT INTO favorites (title, url, parent_id) VALUES ('Loose', 'https://loose.example', NULL);",
    )
    .unwrap();

    run_all(&conn).expect("upgrade should succeed");
    assert_eq!(get_schema_version(&conn), CURRENT_SCHEMA_VERSION);

    let rows: Vec<(i64, String, i64, i64, bool)> = conn
        .prepare("SELECT id, typeof(created_at), created_at, parent_id, is_folder FROM favorites ORDER BY id")
        .unwrap()
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert!(rows.iter().all(|(_, kind, _, _, _)| kind == "integer"), "{:?}", rows);
    assert!(rows[0].2 > 1_700_000_000);
    assert_eq!(rows[1].2, 1_704_110_400);
    assert_eq!((rows[1].3, rows[2].3), (1, 0));
    assert_eq!((rows[0].4, rows[1].4, rows[2].4), (true, false, false));
}

#[test]
fn test_tags_column_defaults_to_empty() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    db.connection()
        .execute("INSERT INTO favorites (title, url) VALUES ('Qt', 'https://qt.io')", [])
        .unwrap();
    let tags: String = db
        .connection()
        .query_row("SELECT tags FROM favorites", [], |row| row.get(0))
        .unwrap();
    assert_eq!(tags, "");
}
