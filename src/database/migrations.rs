//! Schema migrations for the SimpleBrowser favorites database.
//!
//! Uses a `schema_version` table to track which migrations have been applied.
//! Each migration runs exactly once and is recorded with a timestamp.

use rusqlite::Connection;

/// Current schema version. Bump this when adding a new migration.
pub const CURRENT_SCHEMA_VERSION: i32 = 3;

/// Returns the current schema version from the database (0 if table doesn't exist).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .unwrap_or(0)
}

/// Runs all pending schema migrations against the provided connection.
///
/// Safe to call on every startup.
///
/// # Errors
/// Returns `rusqlite::Error` if any SQL statement fails.
pub fn run_all(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY,
             applied_at INTEGER NOT NULL,
             description TEXT NOT NULL
         );",
    )?;

    let current = get_schema_version(conn);

    if current < 1 {
        migration_v1(conn)?;
        record_version(conn, 1, "Initial schema: favorites table")?;
    }

    if current < 2 {
        migration_v2(conn)?;
        record_version(conn, 2, "Add favorites_meta, position and is_folder columns")?;
    }

    if current < 3 {
        migration_v3(conn)?;
        record_version(conn, 3, "Add tags column")?;
    }

    Ok(())
}

fn record_version(conn: &Connection, version: i32, description: &str) -> Result<(), rusqlite::Error> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
        rusqlite::params![version, now, description],
    )?;
    Ok(())
}

/// V1: the favorites table as first shipped (no ordering, folders by empty url).
fn migration_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS favorites (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            url TEXT NOT NULL DEFAULT '',
            icon_path TEXT,
            parent_id INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_favorites_parent_id ON favorites(parent_id);
        CREATE INDEX IF NOT EXISTS idx_favorites_url ON favorites(url);
        ",
    )
}

/// V2: explicit folder flag, sibling order and the one-row-per-key meta table.
///
/// Tables created by older builds declare `created_at DATETIME DEFAULT
/// CURRENT_TIMESTAMP` and a nullable `parent_id`; their rows are brought to
/// UNIX seconds and to `0` for the root here.
fn migration_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "UPDATE favorites
             SET created_at = COALESCE(CAST(strftime('%s', created_at) AS INTEGER), 0)
             WHERE typeof(created_at) = 'text';
         UPDATE favorites SET created_at = 0 WHERE created_at IS NULL;
         UPDATE favorites SET parent_id = 0 WHERE parent_id IS NULL;",
    )?;
    if conn.prepare("SELECT is_folder FROM favorites LIMIT 0").is_err() {
        conn.execute_batch(
            "ALTER TABLE favorites ADD COLUMN is_folder INTEGER NOT NULL DEFAULT 0;
             UPDATE favorites SET is_folder = 1 WHERE url = '';",
        )?;
    }
    if conn.prepare("SELECT position FROM favorites LIMIT 0").is_err() {
        conn.execute_batch(
            "ALTER TABLE favorites ADD COLUMN position INTEGER NOT NULL DEFAULT 0;
             UPDATE favorites SET position = id;",
        )?;
    }
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS favorites_meta (
             key TEXT PRIMARY KEY,
             value TEXT NOT NULL
         );",
    )
}

/// V3: per-favorite tags, stored comma-joined.
fn migration_v3(conn: &Connection) -> Result<(), rusqlite::Error> {
    if conn.prepare("SELECT tags FROM favorites LIMIT 0").is_err() {
        conn.execute_batch("ALTER TABLE favorites ADD COLUMN tags TEXT NOT NULL DEFAULT '';")?;
    }
    Ok(())
}
