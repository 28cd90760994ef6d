//! In-memory favorites tree.
//!
//! `TreeStore` owns the synthetic root; every node owns its children and only
//! refers to its parent by id. The tree is rebuilt from flat records with
//! [`TreeStore::build`], which repairs whatever a corrupted store hands it
//! instead of failing.

use std::collections::{HashMap, HashSet};

use log::warn;

use crate::types::bookmark::{normalize_tags, BookmarkNode, NodeKind, PersistedRecord, ROOT_ID, TRANSIENT_ID};
use crate::types::errors::FavoritesError;

/// Owned favorites tree rooted at a synthetic folder with id [`ROOT_ID`].
#[derive(Debug, Clone, PartialEq)]
pub struct TreeStore {
    root: BookmarkNode,
}

impl Default for TreeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeStore {
    /// An empty tree holding only the root.
    pub fn new() -> Self {
        Self {
            root: BookmarkNode::root(),
        }
    }

    /// Builds the tree from flat records.
    ///
    /// Siblings are ordered by `position`, ties keep input order. Records are
    /// reparented under the root when their parent is unknown, is a bookmark,
    /// or when linking them would close a cycle. Records with a non-positive
    /// or repeated id are dropped. Never fails.
    pub fn build(records: &[PersistedRecord]) -> Self {
        let mut index: HashMap<i64, usize> = HashMap::with_capacity(records.len());
        let mut accepted: Vec<&PersistedRecord> = Vec::with_capacity(records.len());
        for record in records {
            if record.id <= ROOT_ID {
                warn!("favorites: skipping record with reserved id {}", record.id);
                continue;
            }
            if index.contains_key(&record.id) {
                warn!("favorites: skipping duplicate record id {}", record.id);
                continue;
            }
            index.insert(record.id, accepted.len());
            accepted.push(record);
        }

        let mut parents: HashMap<i64, i64> = HashMap::with_capacity(accepted.len());
        for record in &accepted {
            let parent = match record.parent_id {
                ROOT_ID => ROOT_ID,
                pid => match index.get(&pid) {
                    None => {
                        warn!(
                            "favorites: record {} points at missing parent {}, attaching to root",
                            record.id, pid
                        );
                        ROOT_ID
                    }
                    Some(&i) if !accepted[i].kind.is_folder() => {
                        warn!(
                            "favorites: record {} points at bookmark {}, attaching to root",
                            record.id, pid
                        );
                        ROOT_ID
                    }
                    Some(_) => pid,
                },
            };
            parents.insert(record.id, parent);
        }

        // Walk each ancestor chain once; a chain that comes back to the
        // record itself is cut at that record.
        for record in &accepted {
            let mut visited: HashSet<i64> = HashSet::new();
            visited.insert(record.id);
            let mut current = parents.get(&record.id).copied().unwrap_or(ROOT_ID);
            while current != ROOT_ID {
                if current == record.id {
                    warn!("favorites: record {} is its own ancestor, attaching to root", record.id);
                    parents.insert(record.id, ROOT_ID);
                    break;
                }
                if !visited.insert(current) {
                    // Cycle that does not pass through this record; cut when its members come up.
                    break;
                }
                current = parents.get(&current).copied().unwrap_or(ROOT_ID);
            }
        }

        let mut grouped: HashMap<i64, Vec<&PersistedRecord>> = HashMap::new();
        for record in &accepted {
            let parent = parents.get(&record.id).copied().unwrap_or(ROOT_ID);
            grouped.entry(parent).or_default().push(record);
        }
        for siblings in grouped.values_mut() {
            siblings.sort_by_key(|r| r.position);
        }

        let mut root = BookmarkNode::root();
        root.children = attach(ROOT_ID, &mut grouped);
        Self { root }
    }

    /// The synthetic root.
    pub fn root(&self) -> &BookmarkNode {
        &self.root
    }

    /// Consumes the store and returns its root.
    pub fn into_root(self) -> BookmarkNode {
        self.root
    }

    /// Lazy pre-order traversal of every node below the root.
    ///
    /// Each call starts a fresh traversal; the iterator is `Clone`.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder {
            stack: self.root.children.iter().rev().collect(),
        }
    }

    /// Number of nodes below the root.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.find(id).is_some()
    }

    /// Looks a node up by id; `ROOT_ID` returns the root.
    pub fn find(&self, id: i64) -> Option<&BookmarkNode> {
        if id == ROOT_ID {
            return Some(&self.root);
        }
        self.iter().find(|node| node.id == id)
    }

    /// First bookmark in pre-order whose URL equals `url` exactly.
    pub fn find_by_url(&self, url: &str) -> Option<&BookmarkNode> {
        self.iter().find(|node| node.url() == Some(url))
    }

    /// Parent id of a node, `None` for the root or an unknown id.
    pub fn parent_of(&self, id: i64) -> Option<i64> {
        self.find(id).and_then(|node| node.parent)
    }

    /// Whether `id` sits strictly below `ancestor`.
    pub fn is_descendant(&self, ancestor: i64, id: i64) -> bool {
        match self.find(ancestor) {
            Some(node) => PreOrder {
                stack: node.children.iter().collect(),
            }
            .any(|n| n.id == id),
            None => false,
        }
    }

    /// Appends `node` to the children of `parent_id`.
    pub fn add_child(&mut self, parent_id: i64, mut node: BookmarkNode) -> Result<(), FavoritesError> {
        if !node.is_folder() && !node.children.is_empty() {
            return Err(FavoritesError::MalformedRecord(format!(
                "bookmark '{}' cannot carry children",
                node.title
            )));
        }
        if node.id != TRANSIENT_ID && self.contains(node.id) {
            return Err(FavoritesError::MalformedRecord(format!(
                "favorite {} is already in the tree",
                node.id
            )));
        }
        let parent = find_in_mut(&mut self.root, parent_id).ok_or(FavoritesError::NotFound(parent_id))?;
        if !parent.is_folder() {
            return Err(FavoritesError::InvalidParent(parent_id));
        }
        node.parent = Some(parent_id);
        relink(&mut node);
        parent.children.push(node);
        Ok(())
    }

    /// Detaches a node together with its whole subtree and returns it.
    pub fn remove_node(&mut self, id: i64) -> Result<BookmarkNode, FavoritesError> {
        if id == ROOT_ID {
            return Err(FavoritesError::NotFound(id));
        }
        detach(&mut self.root, id).ok_or(FavoritesError::NotFound(id))
    }

    /// Moves `id` under `new_parent_id` at `index`, clamped to the sibling count.
    ///
    /// When the node stays under the same parent, `index` is counted after the
    /// node has been taken out. The tree is untouched on error.
    pub fn move_node(&mut self, id: i64, new_parent_id: i64, index: usize) -> Result<(), FavoritesError> {
        if !self.contains(id) {
            return Err(FavoritesError::NotFound(id));
        }
        let target_is_folder = match self.find(new_parent_id) {
            Some(target) => target.is_folder(),
            None => return Err(FavoritesError::NotFound(new_parent_id)),
        };
        if id == new_parent_id || self.is_descendant(id, new_parent_id) {
            return Err(FavoritesError::CycleDetected(id, new_parent_id));
        }
        if !target_is_folder {
            return Err(FavoritesError::InvalidParent(new_parent_id));
        }

        let mut node = detach(&mut self.root, id).ok_or(FavoritesError::NotFound(id))?;
        let parent = find_in_mut(&mut self.root, new_parent_id).ok_or(FavoritesError::NotFound(new_parent_id))?;
        node.parent = Some(new_parent_id);
        let index = index.min(parent.children.len());
        parent.children.insert(index, node);
        Ok(())
    }

    /// Changes title and URL in place. A folder takes an empty URL, a bookmark a non-empty one.
    pub fn rename_node(&mut self, id: i64, title: &str, url: &str) -> Result<(), FavoritesError> {
        if id == ROOT_ID {
            return Err(FavoritesError::NotFound(id));
        }
        let node = find_in_mut(&mut self.root, id).ok_or(FavoritesError::NotFound(id))?;
        let kind = NodeKind::from_parts(node.is_folder(), url).ok_or_else(|| {
            FavoritesError::MalformedRecord(if node.is_folder() {
                format!("folder {} cannot take url '{}'", id, url)
            } else {
                format!("bookmark {} needs a non-empty url", id)
            })
        })?;
        node.title = title.to_string();
        node.kind = kind;
        Ok(())
    }

    /// Sets or clears the cached favicon path of a node.
    pub fn set_icon(&mut self, id: i64, icon_path: Option<String>) -> Result<(), FavoritesError> {
        if id == ROOT_ID {
            return Err(FavoritesError::NotFound(id));
        }
        let node = find_in_mut(&mut self.root, id).ok_or(FavoritesError::NotFound(id))?;
        node.icon_path = icon_path;
        Ok(())
    }

    /// Replaces the tags of a node.
    pub fn set_tags(&mut self, id: i64, tags: Vec<String>) -> Result<(), FavoritesError> {
        if id == ROOT_ID {
            return Err(FavoritesError::NotFound(id));
        }
        let node = find_in_mut(&mut self.root, id).ok_or(FavoritesError::NotFound(id))?;
        node.tags = normalize_tags(tags);
        Ok(())
    }

    /// Bookmarks whose title, URL or one of whose tags contains `query`,
    /// case-insensitively, in display order.
    pub fn search(&self, query: &str) -> Vec<&BookmarkNode> {
        let needle = query.to_lowercase();
        self.iter()
            .filter(|node| match node.url() {
                Some(url) => {
                    node.title.to_lowercase().contains(&needle)
                        || url.to_lowercase().contains(&needle)
                        || node.tags.iter().any(|tag| tag.to_lowercase().contains(&needle))
                }
                None => false,
            })
            .collect()
    }

    /// Every bookmark URL in display order.
    pub fn urls(&self) -> Vec<&str> {
        self.iter().filter_map(|node| node.url()).collect()
    }

    /// Flattens the tree into records, parents before children, positions renumbered from 0.
    pub fn to_records(&self) -> Vec<PersistedRecord> {
        let mut out = Vec::new();
        flatten(&self.root, &mut out);
        out
    }
}

/// Pre-order iterator over a [`TreeStore`].
#[derive(Debug, Clone)]
pub struct PreOrder<'a> {
    stack: Vec<&'a BookmarkNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a BookmarkNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

impl<'a> IntoIterator for &'a TreeStore {
    type Item = &'a BookmarkNode;
    type IntoIter = PreOrder<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn attach(parent_id: i64, grouped: &mut HashMap<i64, Vec<&PersistedRecord>>) -> Vec<BookmarkNode> {
    let Some(siblings) = grouped.remove(&parent_id) else {
        return Vec::new();
    };
    siblings
        .into_iter()
        .map(|record| {
            let mut node = record.to_node();
            node.parent = Some(parent_id);
            node.children = attach(record.id, grouped);
            node
        })
        .collect()
}

fn find_in_mut(node: &mut BookmarkNode, id: i64) -> Option<&mut BookmarkNode> {
    if node.id == id {
        return Some(node);
    }
    for child in node.children.iter_mut() {
        if let Some(found) = find_in_mut(child, id) {
            return Some(found);
        }
    }
    None
}

fn detach(node: &mut BookmarkNode, id: i64) -> Option<BookmarkNode> {
    if let Some(pos) = node.children.iter().position(|child| child.id == id) {
        let mut removed = node.children.remove(pos);
        removed.parent = None;
        return Some(removed);
    }
    for child in node.children.iter_mut() {
        if let Some(found) = detach(child, id) {
            return Some(found);
        }
    }
    None
}

/// Rewrites the parent back-references below `node`.
fn relink(node: &mut BookmarkNode) {
    let id = node.id;
    for child in node.children.iter_mut() {
        child.parent = Some(id);
        relink(child);
    }
}

fn flatten(node: &BookmarkNode, out: &mut Vec<PersistedRecord>) {
    for (position, child) in node.children.iter().enumerate() {
        out.push(child.to_record(node.id, position as i64));
        flatten(child, out);
    }
}
