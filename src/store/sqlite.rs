//! SQLite favorites store, the canonical backend.
//!
//! One row per node in the `favorites` table; `parent_id = 0` means the row
//! hangs off the root and `position` orders siblings.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension};

use super::{json_file, now, FavoritesStore};
use crate::database::Database;
use crate::types::bookmark::{join_tags, parse_tags, NodeKind, PersistedRecord, ROOT_ID, TRANSIENT_ID};
use crate::types::config::StoreBackend;
use crate::types::errors::FavoritesError;

const SELECT_COLUMNS: &str =
    "SELECT id, title, url, is_folder, icon_path, parent_id, position, created_at, tags FROM favorites";

/// Key in `favorites_meta` recording that the legacy JSON file was imported.
pub const LEGACY_IMPORT_KEY: &str = "legacy_json_import";

/// Favorites stored in the `favorites` table of a [`Database`].
pub struct SqliteFavoritesStore {
    db: Database,
    legacy_path: Option<PathBuf>,
}

impl SqliteFavoritesStore {
    /// Opens (or creates) the database file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FavoritesError> {
        let db = Database::open(path.as_ref()).map_err(|e| {
            FavoritesError::StoreUnavailable(format!("cannot open {}: {}", path.as_ref().display(), e))
        })?;
        Ok(Self::from_database(db))
    }

    /// A store that lives only as long as the process.
    pub fn open_in_memory() -> Result<Self, FavoritesError> {
        let db = Database::open_in_memory()
            .map_err(|e| FavoritesError::StoreUnavailable(format!("cannot open in-memory store: {}", e)))?;
        Ok(Self::from_database(db))
    }

    pub fn from_database(db: Database) -> Self {
        Self { db, legacy_path: None }
    }

    /// Sets the legacy JSON file that [`FavoritesStore::migrate`] imports from.
    pub fn with_legacy_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.legacy_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Direct children of `parent_id`, in display order.
    pub fn load_children(&self, parent_id: i64) -> Result<Vec<PersistedRecord>, FavoritesError> {
        let sql = format!("{} WHERE parent_id = ?1 ORDER BY position, id", SELECT_COLUMNS);
        let mut stmt = self.db.connection().prepare(&sql)?;
        let rows = stmt.query_map(params![parent_id], row_to_record)?;

        let mut results = Vec::new();
        for row in rows {
            if let Some(record) = row? {
                results.push(record);
            }
        }
        Ok(results)
    }

    /// Whether the legacy JSON file has already been imported.
    pub fn legacy_imported(&self) -> Result<bool, FavoritesError> {
        let value: Option<String> = self
            .db
            .connection()
            .query_row(
                "SELECT value FROM favorites_meta WHERE key = ?1",
                params![LEGACY_IMPORT_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.is_some())
    }
}

/// Integer view of a loosely typed column. Numeric text is accepted, anything
/// else reads as `None`.
fn int_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<i64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Integer(v) => Some(v),
        ValueRef::Real(v) => Some(v as i64),
        ValueRef::Text(t) => std::str::from_utf8(t).ok().and_then(|t| t.trim().parse().ok()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}

fn text_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Integer(v) => Some(v.to_string()),
        ValueRef::Real(v) => Some(v.to_string()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}

/// Reads one row. Rows that cannot form a node are logged and yield `None`,
/// so one bad row never fails the whole load.
fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<Option<PersistedRecord>> {
    let Some(id) = int_column(row, 0)? else {
        warn!("favorites: skipping row without an integer id");
        return Ok(None);
    };
    let Some(title) = text_column(row, 1)? else {
        warn!("favorites: skipping row {} without a title", id);
        return Ok(None);
    };
    let url = text_column(row, 2)?.unwrap_or_default();
    let is_folder = int_column(row, 3)?.unwrap_or(0) != 0;
    let Some(kind) = NodeKind::from_parts(is_folder, &url) else {
        warn!("favorites: skipping row {} with is_folder={} and url '{}'", id, is_folder, url);
        return Ok(None);
    };
    let created_at = int_column(row, 7)?.unwrap_or_else(|| {
        warn!("favorites: row {} has an unreadable created_at, using 0", id);
        0
    });
    Ok(Some(PersistedRecord {
        id,
        title,
        kind,
        icon_path: text_column(row, 4)?.filter(|p| !p.is_empty()),
        tags: parse_tags(&text_column(row, 8)?.unwrap_or_default()),
        parent_id: int_column(row, 5)?.unwrap_or(ROOT_ID),
        position: int_column(row, 6)?.unwrap_or(0),
        created_at,
    }))
}

/// Next free position among the children of `parent_id`.
fn next_position(conn: &Connection, parent_id: i64) -> Result<i64, FavoritesError> {
    let pos: i64 = conn.query_row(
        "SELECT COALESCE(MAX(position), -1) + 1 FROM favorites WHERE parent_id = ?1",
        params![parent_id],
        |row| row.get(0),
    )?;
    Ok(pos)
}

/// The parent must be the root or an existing folder.
fn check_parent(conn: &Connection, parent_id: i64) -> Result<(), FavoritesError> {
    if parent_id == ROOT_ID {
        return Ok(());
    }
    let is_folder: Option<bool> = conn
        .query_row(
            "SELECT is_folder FROM favorites WHERE id = ?1",
            params![parent_id],
            |row| row.get(0),
        )
        .optional()?;
    match is_folder {
        None => Err(FavoritesError::NotFound(parent_id)),
        Some(false) => Err(FavoritesError::InvalidParent(parent_id)),
        Some(true) => Ok(()),
    }
}

fn check_url_free(conn: &Connection, kind: &NodeKind, except_id: i64) -> Result<(), FavoritesError> {
    let Some(url) = kind.url() else {
        return Ok(());
    };
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM favorites WHERE url = ?1 AND is_folder = 0 AND id != ?2",
        params![url, except_id],
        |row| row.get(0),
    )?;
    if count > 0 {
        return Err(FavoritesError::DuplicateEntry(url.to_string()));
    }
    Ok(())
}

/// Ids of every row strictly below `id`.
fn descendant_ids(conn: &Connection, id: i64) -> Result<HashSet<i64>, FavoritesError> {
    let mut stmt = conn.prepare(
        "WITH RECURSIVE subtree(id) AS (
             SELECT id FROM favorites WHERE parent_id = ?1
             UNION
             SELECT f.id FROM favorites f JOIN subtree s ON f.parent_id = s.id
         )
         SELECT id FROM subtree",
    )?;
    let rows = stmt.query_map(params![id], |row| row.get::<_, i64>(0))?;
    let mut ids = HashSet::new();
    for row in rows {
        ids.insert(row?);
    }
    Ok(ids)
}

fn insert_row(conn: &Connection, id: Option<i64>, record: &PersistedRecord, parent_id: i64, position: i64) -> Result<i64, FavoritesError> {
    let created_at = if record.created_at == 0 { now() } else { record.created_at };
    conn.execute(
        "INSERT INTO favorites (id, title, url, is_folder, icon_path, parent_id, position, created_at, tags) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            record.title,
            record.url().unwrap_or_default(),
            record.kind.is_folder(),
            record.icon_path,
            parent_id,
            position,
            created_at,
            join_tags(&record.tags)
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Rewrites an existing row after checking kind, parent, cycles and URL.
fn update_row(conn: &Connection, record: &PersistedRecord) -> Result<(), FavoritesError> {
    let current: Option<bool> = conn
        .query_row(
            "SELECT is_folder FROM favorites WHERE id = ?1",
            params![record.id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(is_folder) = current else {
        return Err(FavoritesError::NotFound(record.id));
    };
    if is_folder != record.kind.is_folder() {
        return Err(FavoritesError::MalformedRecord(format!(
            "favorite {} cannot change between folder and bookmark",
            record.id
        )));
    }
    check_parent(conn, record.parent_id)?;
    if record.parent_id == record.id || descendant_ids(conn, record.id)?.contains(&record.parent_id) {
        return Err(FavoritesError::CycleDetected(record.id, record.parent_id));
    }
    check_url_free(conn, &record.kind, record.id)?;

    conn.execute(
        "UPDATE favorites SET title = ?1, url = ?2, icon_path = ?3, parent_id = ?4, position = ?5, tags = ?6 \
         WHERE id = ?7",
        params![
            record.title,
            record.url().unwrap_or_default(),
            record.icon_path,
            record.parent_id,
            record.position,
            join_tags(&record.tags),
            record.id
        ],
    )?;
    Ok(())
}

impl FavoritesStore for SqliteFavoritesStore {
    /// Full scan, so rows with a dangling or cyclic parent still reach the tree builder.
    fn load(&self) -> Result<Vec<PersistedRecord>, FavoritesError> {
        let sql = format!("{} ORDER BY parent_id, position, id", SELECT_COLUMNS);
        let mut stmt = self.db.connection().prepare(&sql)?;
        let rows = stmt.query_map([], row_to_record)?;

        let mut results = Vec::new();
        for row in rows {
            if let Some(record) = row? {
                results.push(record);
            }
        }
        Ok(results)
    }

    fn save(&mut self, records: &[PersistedRecord]) -> Result<(), FavoritesError> {
        let tx = self.db.connection_mut().transaction()?;
        tx.execute("DELETE FROM favorites", [])?;
        for record in records {
            insert_row(&tx, Some(record.id), record, record.parent_id, record.position)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn add_one(&mut self, record: &PersistedRecord) -> Result<i64, FavoritesError> {
        let conn = self.db.connection();
        check_parent(conn, record.parent_id)?;
        check_url_free(conn, &record.kind, record.id)?;
        let position = next_position(conn, record.parent_id)?;
        insert_row(conn, None, record, record.parent_id, position)
    }

    fn update_one(&mut self, record: &PersistedRecord) -> Result<(), FavoritesError> {
        update_row(self.db.connection(), record)
    }

    /// Applies every update in one transaction. Rows not named are left alone.
    fn update_many(&mut self, records: &[PersistedRecord]) -> Result<(), FavoritesError> {
        let tx = self.db.connection_mut().transaction()?;
        for record in records {
            update_row(&tx, record)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_one(&mut self, id: i64) -> Result<(), FavoritesError> {
        let affected = self.db.connection().execute(
            "WITH RECURSIVE subtree(id) AS (
                 SELECT id FROM favorites WHERE id = ?1
                 UNION
                 SELECT f.id FROM favorites f JOIN subtree s ON f.parent_id = s.id
             )
             DELETE FROM favorites WHERE id IN (SELECT id FROM subtree)",
            params![id],
        )?;
        if affected == 0 {
            return Err(FavoritesError::NotFound(id));
        }
        Ok(())
    }

    /// Imports the legacy JSON file inside one transaction.
    ///
    /// The file is parsed strictly, accepting the older entry shapes (see
    /// [`json_file::decode_legacy`]), and no URL may repeat, within the file or
    /// against existing rows. Legacy top-level entries are appended after the
    /// current root children. The import marker is written in the same
    /// transaction, so a later call is a no-op.
    fn migrate(&mut self) -> Result<usize, FavoritesError> {
        let Some(path) = self.legacy_path.clone() else {
            return Ok(0);
        };
        if !path.exists() || self.legacy_imported()? {
            return Ok(0);
        }

        let fail = |msg: String| FavoritesError::MigrationFailure(format!("{}: {}", path.display(), msg));
        let text = fs::read_to_string(&path).map_err(|e| fail(e.to_string()))?;
        let records = if text.trim().is_empty() {
            Vec::new()
        } else {
            json_file::decode_legacy(&text).map_err(|e| fail(e.to_string()))?
        };

        let tx = self
            .db
            .connection_mut()
            .transaction()
            .map_err(|e| fail(e.to_string()))?;
        let root_base = next_position(&tx, ROOT_ID).map_err(|e| fail(e.to_string()))?;
        let mut new_ids: HashMap<i64, i64> = HashMap::with_capacity(records.len());
        let mut seen_urls: HashSet<&str> = HashSet::new();

        for record in &records {
            if let Some(url) = record.url() {
                if !seen_urls.insert(url) {
                    return Err(fail(format!("url {} appears twice", url)));
                }
                check_url_free(&tx, &record.kind, TRANSIENT_ID).map_err(|e| fail(e.to_string()))?;
            }
            let (parent_id, position) = if record.parent_id == ROOT_ID {
                (ROOT_ID, root_base + record.position)
            } else {
                let parent = new_ids
                    .get(&record.parent_id)
                    .copied()
                    .ok_or_else(|| fail(format!("record {} has no imported parent", record.id)))?;
                (parent, record.position)
            };
            let id = insert_row(&tx, None, record, parent_id, position).map_err(|e| fail(e.to_string()))?;
            new_ids.insert(record.id, id);
        }

        tx.execute(
            "INSERT OR REPLACE INTO favorites_meta (key, value) VALUES (?1, ?2)",
            params![LEGACY_IMPORT_KEY, path.to_string_lossy()],
        )
        .map_err(|e| fail(e.to_string()))?;
        tx.commit().map_err(|e| fail(e.to_string()))?;

        info!("favorites: imported {} legacy entries from {}", records.len(), path.display());
        Ok(records.len())
    }

    fn count(&self) -> Result<usize, FavoritesError> {
        let count: i64 = self
            .db
            .connection()
            .query_row("SELECT COUNT(*) FROM favorites", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Sqlite
    }
}
