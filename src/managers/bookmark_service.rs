//! Bookmark service for SimpleBrowser.
//!
//! Implements `BookmarkServiceTrait`, the favorites façade used by the UI.
//! Every mutation is validated against a copy of the current tree, written
//! to the injected [`FavoritesStore`], and followed by a full reload so the
//! in-memory tree always mirrors what is on disk. Subscribers are told after
//! each successful reload.

use log::{debug, error, info, warn};

use crate::managers::tree_store::TreeStore;
use crate::services::favicon_fetcher::FaviconOutcome;
use crate::store::{now, FavoritesStore, JsonFavoritesStore};
use crate::types::bookmark::{BookmarkNode, PersistedRecord, ROOT_ID};
use crate::types::errors::FavoritesError;

/// Trait defining the favorites operations exposed to the UI.
pub trait BookmarkServiceTrait {
    fn is_favorite(&self, url: &str) -> bool;
    fn add(&mut self, title: &str, url: &str, parent_folder: i64) -> Result<i64, FavoritesError>;
    fn add_folder(&mut self, title: &str, parent_folder: i64) -> Result<i64, FavoritesError>;
    fn delete(&mut self, id: i64) -> Result<(), FavoritesError>;
    fn move_node(&mut self, id: i64, new_parent_id: i64) -> Result<(), FavoritesError>;
    fn rename(&mut self, id: i64, new_title: &str, new_url: &str, new_parent_id: i64) -> Result<(), FavoritesError>;
    fn root(&self) -> &BookmarkNode;
}

/// Callback run with the new root after the tree changed.
pub type TreeListener = Box<dyn FnMut(&BookmarkNode)>;

/// Favorites façade over a store and its in-memory tree.
pub struct BookmarkService {
    store: Box<dyn FavoritesStore>,
    tree: TreeStore,
    listeners: Vec<TreeListener>,
}

impl BookmarkService {
    /// Wraps `store` and loads the tree. A failed load starts from an empty root.
    pub fn new(store: Box<dyn FavoritesStore>) -> Self {
        let tree = match store.load() {
            Ok(records) => TreeStore::build(&records),
            Err(e) => {
                error!("favorites: initial load failed, starting empty: {}", e);
                TreeStore::new()
            }
        };
        Self {
            store,
            tree,
            listeners: Vec::new(),
        }
    }

    pub fn tree(&self) -> &TreeStore {
        &self.tree
    }

    pub fn store(&self) -> &dyn FavoritesStore {
        self.store.as_ref()
    }

    /// Registers a "tree changed" callback.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&BookmarkNode) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Rebuilds the tree from the store. The current tree is kept on error.
    pub fn reload(&mut self) -> Result<(), FavoritesError> {
        let records = self.store.load()?;
        self.tree = TreeStore::build(&records);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), FavoritesError> {
        self.reload()?;
        let root = self.tree.root();
        for listener in self.listeners.iter_mut() {
            listener(root);
        }
        Ok(())
    }

    fn check_parent(&self, parent_id: i64) -> Result<(), FavoritesError> {
        match self.tree.find(parent_id) {
            None => Err(FavoritesError::NotFound(parent_id)),
            Some(parent) if !parent.is_folder() => Err(FavoritesError::InvalidParent(parent_id)),
            Some(_) => Ok(()),
        }
    }

    /// Current record of a node: its parent and its index among the siblings.
    fn record_of(tree: &TreeStore, id: i64) -> Option<PersistedRecord> {
        let node = tree.find(id).filter(|n| n.id != ROOT_ID)?;
        let parent_id = node.parent.unwrap_or(ROOT_ID);
        let position = tree
            .find(parent_id)
            .and_then(|p| p.children.iter().position(|c| c.id == id))
            .unwrap_or(0);
        Some(node.to_record(parent_id, position as i64))
    }

    /// Records rewritten by a move: the moved node first, then every sibling
    /// it left or joined, with their positions in `staged`.
    fn placement_records(staged: &TreeStore, id: i64, old_parent: i64) -> Vec<PersistedRecord> {
        let mut records: Vec<PersistedRecord> = Self::record_of(staged, id).into_iter().collect();
        let new_parent = staged.parent_of(id).unwrap_or(ROOT_ID);
        let mut parents = vec![old_parent];
        if new_parent != old_parent {
            parents.push(new_parent);
        }
        for parent in parents {
            let Some(folder) = staged.find(parent) else {
                continue;
            };
            records.extend(
                folder
                    .children
                    .iter()
                    .filter(|child| child.id != id)
                    .filter_map(|child| Self::record_of(staged, child.id)),
            );
        }
        records
    }

    /// Moves `id` under `new_parent_id` at `index` (clamped).
    ///
    /// Only the moved node and its old and new siblings are written; records
    /// the tree could not load stay in the store untouched.
    pub fn move_to(&mut self, id: i64, new_parent_id: i64, index: usize) -> Result<(), FavoritesError> {
        let old_parent = self.tree.parent_of(id).unwrap_or(ROOT_ID);
        let mut staged = self.tree.clone();
        staged.move_node(id, new_parent_id, index)?;
        self.store
            .update_many(&Self::placement_records(&staged, id, old_parent))?;
        debug!("favorites: moved {} under {} at {}", id, new_parent_id, index);
        self.commit()
    }

    /// Replaces the tags of a favorite.
    pub fn set_tags(&mut self, id: i64, tags: &[String]) -> Result<(), FavoritesError> {
        let mut staged = self.tree.clone();
        staged.set_tags(id, tags.to_vec())?;
        let record = Self::record_of(&staged, id).ok_or(FavoritesError::NotFound(id))?;
        self.store.update_one(&record)?;
        debug!("favorites: tagged {} with {:?}", id, record.tags);
        self.commit()
    }

    pub fn find_by_url(&self, url: &str) -> Option<&BookmarkNode> {
        self.tree.find_by_url(url)
    }

    pub fn search(&self, query: &str) -> Vec<&BookmarkNode> {
        self.tree.search(query)
    }

    /// Bookmark URLs for the address-bar completer.
    pub fn urls(&self) -> Vec<&str> {
        self.tree.urls()
    }

    /// Star button: removes the favorite for `url` if present, otherwise adds it at the root.
    ///
    /// Returns whether `url` is a favorite afterwards.
    pub fn toggle_favorite(&mut self, url: &str, title: &str) -> Result<bool, FavoritesError> {
        match self.tree.find_by_url(url).map(|node| node.id) {
            Some(id) => {
                self.delete(id)?;
                Ok(false)
            }
            None => {
                self.add(title, url, ROOT_ID)?;
                Ok(true)
            }
        }
    }

    /// Stores `icon_path` on the bookmark whose URL is `url`.
    ///
    /// The bookmark is looked up again at call time; if it was deleted since
    /// the fetch started this is a silent no-op returning `Ok(None)`.
    pub fn attach_favicon(&mut self, url: &str, icon_path: &str) -> Result<Option<i64>, FavoritesError> {
        let Some(id) = self.tree.find_by_url(url).map(|node| node.id) else {
            debug!("favicon: no favorite for {}, icon stays cached only", url);
            return Ok(None);
        };
        let Some(mut record) = Self::record_of(&self.tree, id) else {
            return Ok(None);
        };
        if record.icon_path.as_deref() == Some(icon_path) {
            return Ok(Some(id));
        }
        record.icon_path = Some(icon_path.to_string());
        self.store.update_one(&record)?;
        self.commit()?;
        Ok(Some(id))
    }

    /// Applies a completed favicon fetch. Errors are logged, never returned.
    pub fn apply_favicon(&mut self, outcome: FaviconOutcome) -> Option<i64> {
        match outcome.result {
            Ok(path) => match self.attach_favicon(&outcome.page_url, &path.to_string_lossy()) {
                Ok(id) => id,
                Err(e) => {
                    warn!("favicon: could not attach icon for {}: {}", outcome.page_url, e);
                    None
                }
            },
            Err(e) => {
                warn!("favicon: fetch for {} failed: {}", outcome.page_url, e);
                None
            }
        }
    }

    /// Runs the store's legacy import and reloads when anything was imported.
    pub fn migrate(&mut self) -> Result<usize, FavoritesError> {
        let imported = self.store.migrate()?;
        if imported > 0 {
            info!("favorites: migration imported {} entries", imported);
            self.commit()?;
        }
        Ok(imported)
    }

    /// Writes the current tree to `path` in the flat-file format.
    pub fn export_json(&self, path: &std::path::Path) -> Result<(), FavoritesError> {
        let mut backup = JsonFavoritesStore::open(path)?;
        backup.save(&self.tree.to_records())
    }
}

impl BookmarkServiceTrait for BookmarkService {
    fn is_favorite(&self, url: &str) -> bool {
        self.tree.find_by_url(url).is_some()
    }

    /// Adds a bookmark at the end of `parent_folder` and returns its id.
    fn add(&mut self, title: &str, url: &str, parent_folder: i64) -> Result<i64, FavoritesError> {
        if url.is_empty() {
            return Err(FavoritesError::MalformedRecord(
                "bookmark url must not be empty".to_string(),
            ));
        }
        self.check_parent(parent_folder)?;
        if self.is_favorite(url) {
            return Err(FavoritesError::DuplicateEntry(url.to_string()));
        }

        let node = BookmarkNode::transient_bookmark(title, url, now());
        let id = self.store.add_one(&node.to_record(parent_folder, 0))?;
        debug!("favorites: added bookmark {} ({}) under {}", id, url, parent_folder);
        self.commit()?;
        Ok(id)
    }

    /// Adds an empty folder at the end of `parent_folder` and returns its id.
    fn add_folder(&mut self, title: &str, parent_folder: i64) -> Result<i64, FavoritesError> {
        self.check_parent(parent_folder)?;
        let node = BookmarkNode::transient_folder(title, now());
        let id = self.store.add_one(&node.to_record(parent_folder, 0))?;
        debug!("favorites: added folder {} under {}", id, parent_folder);
        self.commit()?;
        Ok(id)
    }

    /// Deletes a node and everything below it.
    fn delete(&mut self, id: i64) -> Result<(), FavoritesError> {
        if id == ROOT_ID || !self.tree.contains(id) {
            return Err(FavoritesError::NotFound(id));
        }
        self.store.delete_one(id)?;
        debug!("favorites: deleted {}", id);
        self.commit()
    }

    /// Moves a node to the end of `new_parent_id`.
    fn move_node(&mut self, id: i64, new_parent_id: i64) -> Result<(), FavoritesError> {
        self.move_to(id, new_parent_id, usize::MAX)
    }

    /// Edits title and URL and, if `new_parent_id` differs, moves the node there.
    ///
    /// Folders take an empty `new_url`.
    fn rename(&mut self, id: i64, new_title: &str, new_url: &str, new_parent_id: i64) -> Result<(), FavoritesError> {
        let current_parent = self
            .tree
            .find(id)
            .filter(|n| n.id != ROOT_ID)
            .map(|n| n.parent.unwrap_or(ROOT_ID))
            .ok_or(FavoritesError::NotFound(id))?;

        let mut staged = self.tree.clone();
        staged.rename_node(id, new_title, new_url)?;
        if !new_url.is_empty() && self.tree.iter().any(|n| n.id != id && n.url() == Some(new_url)) {
            return Err(FavoritesError::DuplicateEntry(new_url.to_string()));
        }

        if new_parent_id != current_parent {
            staged.move_node(id, new_parent_id, usize::MAX)?;
            self.store
                .update_many(&Self::placement_records(&staged, id, current_parent))?;
        } else {
            let record = Self::record_of(&staged, id).ok_or(FavoritesError::NotFound(id))?;
            self.store.update_one(&record)?;
        }
        debug!("favorites: renamed {} to '{}'", id, new_title);
        self.commit()
    }

    fn root(&self) -> &BookmarkNode {
        self.tree.root()
    }
}
