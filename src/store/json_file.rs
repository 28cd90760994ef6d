//! Flat-file favorites store.
//!
//! The file holds one nested JSON array:
//!
//! ```json
//! [
//!   { "id": 1, "title": "Qt", "folder": true, "children": [
//!       { "id": 2, "title": "Docs", "url": "https://doc.qt.io", "folder": false,
//!         "favicon": "/home/me/.cache/simplebrowser/favicons/doc.qt.io.ico" }
//!   ] }
//! ]
//! ```
//!
//! `folder` is the only folder/bookmark discriminant. Array order is sibling
//! order. Entries written by older builds have no `id`; they get fresh ids
//! above the highest one present when the file is read.
//!
//! Files from the first releases used other shapes: `name` for the title, an
//! empty `url` for folders, `iconPath` for the icon and `tags` as one
//! comma-separated string. Only [`decode_legacy`] accepts those.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{now, FavoritesStore};
use crate::managers::tree_store::TreeStore;
use crate::types::bookmark::{normalize_tags, parse_tags, BookmarkNode, NodeKind, PersistedRecord, ROOT_ID};
use crate::types::config::StoreBackend;
use crate::types::errors::FavoritesError;

/// One element of the favorites array as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRecord {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub folder: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FlatRecord>,
}

impl FlatRecord {
    fn from_node(node: &BookmarkNode) -> Self {
        Self {
            id: node.id,
            title: node.title.clone(),
            url: node.url().unwrap_or_default().to_string(),
            folder: node.is_folder(),
            favicon: node.icon_path.clone(),
            tags: node.tags.clone(),
            created_at: node.created_at,
            children: node.children.iter().map(FlatRecord::from_node).collect(),
        }
    }
}

/// One element as read from disk. Children stay raw so a bad child only
/// costs itself.
#[derive(Debug, Deserialize)]
struct FlatEntry {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    folder: Option<bool>,
    #[serde(default)]
    favicon: Option<String>,
    #[serde(default, rename = "iconPath")]
    icon_path: Option<String>,
    #[serde(default)]
    tags: Value,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    children: Option<Vec<Value>>,
}

/// Tags as a JSON array of strings or, in old files, one comma-separated string.
fn tags_of(value: &Value) -> Vec<String> {
    match value {
        Value::String(text) => parse_tags(text),
        Value::Array(items) => normalize_tags(items.iter().filter_map(Value::as_str)),
        _ => Vec::new(),
    }
}

/// Serializes the children of `root` as a pretty-printed favorites array.
pub fn encode(root: &BookmarkNode) -> Result<String, FavoritesError> {
    let items: Vec<FlatRecord> = root.children.iter().map(FlatRecord::from_node).collect();
    serde_json::to_string_pretty(&items)
        .map_err(|e| FavoritesError::MalformedRecord(format!("failed to serialize favorites: {}", e)))
}

/// Parses a favorites array into records, parents before children.
///
/// In lenient mode a malformed element is logged and skipped (a bookmark's
/// stray children are dropped, a repeated id is replaced by a fresh one).
/// In strict mode the first problem is returned as `MalformedRecord`.
pub fn decode(text: &str, strict: bool) -> Result<Vec<PersistedRecord>, FavoritesError> {
    decode_with(text, strict, false)
}

/// Strict parse that also accepts the shapes written by older releases.
///
/// Without an explicit `folder` flag an entry with an empty `url` is a
/// folder. `name` stands in for a missing `title` and `iconPath` for a
/// missing `favicon`.
pub fn decode_legacy(text: &str) -> Result<Vec<PersistedRecord>, FavoritesError> {
    decode_with(text, true, true)
}

fn decode_with(text: &str, strict: bool, legacy: bool) -> Result<Vec<PersistedRecord>, FavoritesError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| FavoritesError::MalformedRecord(format!("favorites file is not valid JSON: {}", e)))?;
    let Value::Array(items) = value else {
        return Err(FavoritesError::MalformedRecord(
            "favorites file must hold a JSON array".to_string(),
        ));
    };

    let mut decoder = Decoder {
        strict,
        legacy,
        next_id: max_explicit_id(&items).max(ROOT_ID) + 1,
        used_ids: HashSet::new(),
        records: Vec::new(),
    };
    decoder.walk(&items, ROOT_ID)?;
    Ok(decoder.records)
}

fn max_explicit_id(items: &[Value]) -> i64 {
    items
        .iter()
        .map(|item| {
            let own = item.get("id").and_then(Value::as_i64).unwrap_or(ROOT_ID);
            let nested = item
                .get("children")
                .and_then(Value::as_array)
                .map(|children| max_explicit_id(children))
                .unwrap_or(ROOT_ID);
            own.max(nested)
        })
        .max()
        .unwrap_or(ROOT_ID)
}

struct Decoder {
    strict: bool,
    legacy: bool,
    next_id: i64,
    used_ids: HashSet<i64>,
    records: Vec<PersistedRecord>,
}

impl Decoder {
    /// Fails in strict mode, logs otherwise.
    fn reject(&self, msg: String) -> Result<(), FavoritesError> {
        if self.strict {
            return Err(FavoritesError::MalformedRecord(msg));
        }
        warn!("favorites: {}", msg);
        Ok(())
    }

    fn fresh_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        self.used_ids.insert(id);
        id
    }

    fn walk(&mut self, items: &[Value], parent_id: i64) -> Result<(), FavoritesError> {
        let mut position = 0;
        for (index, item) in items.iter().enumerate() {
            let entry: FlatEntry = match serde_json::from_value(item.clone()) {
                Ok(entry) => entry,
                Err(e) => {
                    self.reject(format!("entry {} under {} is unreadable: {}", index, parent_id, e))?;
                    continue;
                }
            };
            let fallback = if self.legacy { entry.name } else { None };
            let title = match entry.title.or(fallback) {
                Some(title) => title,
                None => {
                    self.reject(format!("entry {} under {} has no title", index, parent_id))?;
                    continue;
                }
            };
            let folder = match entry.folder {
                Some(folder) => folder,
                None => self.legacy && entry.url.is_empty(),
            };
            let Some(kind) = NodeKind::from_parts(folder, &entry.url) else {
                self.reject(format!(
                    "entry '{}' under {} has folder={} with url '{}'",
                    title, parent_id, folder, entry.url
                ))?;
                continue;
            };

            let id = match entry.id {
                Some(id) if id > ROOT_ID && self.used_ids.insert(id) => id,
                Some(id) => {
                    self.reject(format!("entry '{}' reuses id {}", title, id))?;
                    self.fresh_id()
                }
                None => self.fresh_id(),
            };

            let is_folder = kind.is_folder();
            let favicon = entry.favicon.filter(|p| !p.is_empty());
            let icon_path = if self.legacy {
                favicon.or(entry.icon_path.filter(|p| !p.is_empty()))
            } else {
                favicon
            };
            self.records.push(PersistedRecord {
                id,
                title,
                kind,
                icon_path,
                tags: tags_of(&entry.tags),
                parent_id,
                position,
                created_at: entry.created_at,
            });
            position += 1;

            let children = entry.children.unwrap_or_default();
            if !children.is_empty() {
                if is_folder {
                    self.walk(&children, id)?;
                } else {
                    self.reject(format!("bookmark {} carries children, dropping them", id))?;
                }
            }
        }
        Ok(())
    }
}

/// Favorites kept in a single JSON file, rewritten whole on every change.
pub struct JsonFavoritesStore {
    path: PathBuf,
    /// Highest id handed out by this store, so a deleted id is never reused.
    last_assigned: i64,
}

impl JsonFavoritesStore {
    /// Uses the file at `path`, creating its directory if needed. The file
    /// itself is created on the first write.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FavoritesError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    FavoritesError::StoreUnavailable(format!(
                        "cannot create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        if path.is_dir() {
            return Err(FavoritesError::StoreUnavailable(format!(
                "{} is a directory",
                path.display()
            )));
        }
        Ok(Self {
            path,
            last_assigned: ROOT_ID,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file strictly. Used by imports, which must not silently drop entries.
    pub fn load_strict(&self) -> Result<Vec<PersistedRecord>, FavoritesError> {
        self.read(true)
    }

    fn read(&self, strict: bool) -> Result<Vec<PersistedRecord>, FavoritesError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.path).map_err(|e| {
            FavoritesError::StoreUnavailable(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        decode(&text, strict)
    }

    fn read_tree(&self) -> Result<TreeStore, FavoritesError> {
        Ok(TreeStore::build(&self.read(false)?))
    }

    /// Writes the tree to a sibling temp file, then renames it over the store.
    fn write_tree(&self, tree: &TreeStore) -> Result<(), FavoritesError> {
        let json = encode(tree.root())?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, json).map_err(|e| {
            FavoritesError::StoreUnavailable(format!("cannot write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            FavoritesError::StoreUnavailable(format!(
                "cannot replace {}: {}",
                self.path.display(),
                e
            ))
        })?;
        debug!("favorites: wrote {} entries to {}", tree.len(), self.path.display());
        Ok(())
    }
}

fn ensure_url_free(tree: &TreeStore, kind: &NodeKind, except_id: i64) -> Result<(), FavoritesError> {
    if let Some(url) = kind.url() {
        if tree.iter().any(|node| node.id != except_id && node.url() == Some(url)) {
            return Err(FavoritesError::DuplicateEntry(url.to_string()));
        }
    }
    Ok(())
}

fn apply_update(tree: &mut TreeStore, record: &PersistedRecord) -> Result<(), FavoritesError> {
    let (is_folder, parent, index) = {
        let node = tree
            .find(record.id)
            .filter(|node| node.id != ROOT_ID)
            .ok_or(FavoritesError::NotFound(record.id))?;
        let parent = node.parent.unwrap_or(ROOT_ID);
        let index = tree
            .find(parent)
            .and_then(|p| p.children.iter().position(|c| c.id == record.id))
            .unwrap_or(0);
        (node.is_folder(), parent, index)
    };
    if is_folder != record.kind.is_folder() {
        return Err(FavoritesError::MalformedRecord(format!(
            "favorite {} cannot change between folder and bookmark",
            record.id
        )));
    }
    ensure_url_free(tree, &record.kind, record.id)?;

    tree.rename_node(record.id, &record.title, record.url().unwrap_or_default())?;
    tree.set_icon(record.id, record.icon_path.clone())?;
    tree.set_tags(record.id, record.tags.clone())?;
    if record.parent_id != parent || record.position != index as i64 {
        tree.move_node(record.id, record.parent_id, record.position.max(0) as usize)?;
    }
    Ok(())
}

impl FavoritesStore for JsonFavoritesStore {
    fn load(&self) -> Result<Vec<PersistedRecord>, FavoritesError> {
        self.read(false)
    }

    fn save(&mut self, records: &[PersistedRecord]) -> Result<(), FavoritesError> {
        self.write_tree(&TreeStore::build(records))
    }

    fn add_one(&mut self, record: &PersistedRecord) -> Result<i64, FavoritesError> {
        let mut tree = self.read_tree()?;
        ensure_url_free(&tree, &record.kind, record.id)?;

        let id = tree
            .iter()
            .map(|node| node.id)
            .max()
            .unwrap_or(ROOT_ID)
            .max(self.last_assigned)
            + 1;
        let mut node = record.to_node();
        node.id = id;
        if node.created_at == 0 {
            node.created_at = now();
        }
        tree.add_child(record.parent_id, node)?;
        self.write_tree(&tree)?;
        self.last_assigned = id;
        Ok(id)
    }

    fn update_one(&mut self, record: &PersistedRecord) -> Result<(), FavoritesError> {
        let mut tree = self.read_tree()?;
        apply_update(&mut tree, record)?;
        self.write_tree(&tree)
    }

    /// Applies every update to one read of the file and writes it once.
    fn update_many(&mut self, records: &[PersistedRecord]) -> Result<(), FavoritesError> {
        let mut tree = self.read_tree()?;
        for record in records {
            apply_update(&mut tree, record)?;
        }
        self.write_tree(&tree)
    }

    fn delete_one(&mut self, id: i64) -> Result<(), FavoritesError> {
        let mut tree = self.read_tree()?;
        tree.remove_node(id)?;
        self.write_tree(&tree)
    }

    /// The flat file is the legacy format itself; there is nothing to import.
    fn migrate(&mut self) -> Result<usize, FavoritesError> {
        Ok(0)
    }

    fn count(&self) -> Result<usize, FavoritesError> {
        Ok(self.load()?.len())
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Json
    }
}
