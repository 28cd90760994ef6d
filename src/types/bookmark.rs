use serde::{Deserialize, Serialize};

/// Id carried by a node that has not been written to a store yet.
pub const TRANSIENT_ID: i64 = -1;

/// Id of the synthetic root. Never stored; `parent_id == ROOT_ID` means "top level".
pub const ROOT_ID: i64 = 0;

/// Splits a comma-separated tag list, trimming blanks and dropping repeats.
pub fn parse_tags(text: &str) -> Vec<String> {
    normalize_tags(text.split(','))
}

/// Trims each tag and keeps the first occurrence of every non-empty one.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Comma-joined form stored in the `tags` column.
pub fn join_tags(tags: &[String]) -> String {
    tags.join(",")
}

/// Whether an entry is a container or a link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Folder,
    Bookmark { url: String },
}

impl NodeKind {
    pub fn is_folder(&self) -> bool {
        matches!(self, NodeKind::Folder)
    }

    /// The bookmark URL, or `None` for a folder.
    pub fn url(&self) -> Option<&str> {
        match self {
            NodeKind::Folder => None,
            NodeKind::Bookmark { url } => Some(url),
        }
    }

    /// Rebuilds a kind from the flat `(is_folder, url)` pair used on disk.
    ///
    /// Returns `None` for the two contradictory shapes: a folder with a URL
    /// and a bookmark without one.
    pub fn from_parts(is_folder: bool, url: &str) -> Option<Self> {
        match (is_folder, url.is_empty()) {
            (true, true) => Some(NodeKind::Folder),
            (false, false) => Some(NodeKind::Bookmark {
                url: url.to_string(),
            }),
            _ => None,
        }
    }
}

/// A node of the in-memory favorites tree.
///
/// The parent owns its children. `parent` is a plain id back-reference and is
/// rewritten every time the node is attached somewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkNode {
    pub id: i64,
    pub title: String,
    pub kind: NodeKind,
    pub icon_path: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: i64,
    pub parent: Option<i64>,
    pub children: Vec<BookmarkNode>,
}

impl BookmarkNode {
    /// The synthetic root folder.
    pub fn root() -> Self {
        Self {
            id: ROOT_ID,
            title: "Root".to_string(),
            kind: NodeKind::Folder,
            icon_path: None,
            tags: Vec::new(),
            created_at: 0,
            parent: None,
            children: Vec::new(),
        }
    }

    /// A bookmark that has not been persisted yet.
    pub fn transient_bookmark(title: &str, url: &str, created_at: i64) -> Self {
        Self {
            id: TRANSIENT_ID,
            title: title.to_string(),
            kind: NodeKind::Bookmark {
                url: url.to_string(),
            },
            icon_path: None,
            tags: Vec::new(),
            created_at,
            parent: None,
            children: Vec::new(),
        }
    }

    /// A folder that has not been persisted yet.
    pub fn transient_folder(title: &str, created_at: i64) -> Self {
        Self {
            id: TRANSIENT_ID,
            title: title.to_string(),
            kind: NodeKind::Folder,
            icon_path: None,
            tags: Vec::new(),
            created_at,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }

    pub fn url(&self) -> Option<&str> {
        self.kind.url()
    }

    pub fn is_transient(&self) -> bool {
        self.id == TRANSIENT_ID
    }

    /// Converts the node (not its children) into a storable record.
    pub fn to_record(&self, parent_id: i64, position: i64) -> PersistedRecord {
        PersistedRecord {
            id: self.id,
            title: self.title.clone(),
            kind: self.kind.clone(),
            icon_path: self.icon_path.clone(),
            tags: self.tags.clone(),
            parent_id,
            position,
            created_at: self.created_at,
        }
    }
}

/// One row of the store: a node flattened with its parent id and sibling position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub id: i64,
    pub title: String,
    pub kind: NodeKind,
    pub icon_path: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub parent_id: i64,
    pub position: i64,
    pub created_at: i64,
}

impl PersistedRecord {
    pub fn url(&self) -> Option<&str> {
        self.kind.url()
    }

    /// Materializes a childless node from the record.
    pub fn to_node(&self) -> BookmarkNode {
        BookmarkNode {
            id: self.id,
            title: self.title.clone(),
            kind: self.kind.clone(),
            icon_path: self.icon_path.clone(),
            tags: self.tags.clone(),
            created_at: self.created_at,
            parent: None,
            children: Vec::new(),
        }
    }
}
