use serde::{Deserialize, Serialize};

/// Which store backs the favorites tree.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// SQLite `favorites` table. The canonical store.
    Sqlite,
    /// Legacy nested JSON array.
    Json,
}

/// Favorites engine configuration, stored as JSON next to the browser settings.
///
/// Path fields are optional; `None` resolves to the platform directories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FavoritesConfig {
    pub backend: StoreBackend,
    pub store_path: Option<String>,
    pub legacy_json_path: Option<String>,
    pub favicon_cache_dir: Option<String>,
    pub favicon_timeout_secs: u64,
    pub migrate_on_startup: bool,
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            store_path: None,
            legacy_json_path: None,
            favicon_cache_dir: None,
            favicon_timeout_secs: 10,
            migrate_on_startup: true,
        }
    }
}
