//! Durable storage for favorites.
//!
//! Both backends speak in flat [`PersistedRecord`]s; turning those into a tree
//! is the job of [`TreeStore`](crate::managers::tree_store::TreeStore).
//!
//! Add policy is the same for both: the parent must be the root or an existing
//! folder, and a bookmark URL may only be stored once.

pub mod json_file;
pub mod sqlite;

use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::bookmark::PersistedRecord;
use crate::types::config::StoreBackend;
use crate::types::errors::FavoritesError;

pub use json_file::JsonFavoritesStore;
pub use sqlite::SqliteFavoritesStore;

/// Storage operations shared by the SQLite and JSON backends.
pub trait FavoritesStore {
    /// Every readable record. Malformed entries are skipped and logged.
    fn load(&self) -> Result<Vec<PersistedRecord>, FavoritesError>;
    /// Replaces the whole store with `records`.
    fn save(&mut self, records: &[PersistedRecord]) -> Result<(), FavoritesError>;
    /// Appends a record under its `parent_id` and returns the id it was stored under.
    fn add_one(&mut self, record: &PersistedRecord) -> Result<i64, FavoritesError>;
    /// Rewrites title, URL, icon, parent and position of an existing record.
    fn update_one(&mut self, record: &PersistedRecord) -> Result<(), FavoritesError>;
    /// Applies several updates in order, touching no other record.
    fn update_many(&mut self, records: &[PersistedRecord]) -> Result<(), FavoritesError> {
        for record in records {
            self.update_one(record)?;
        }
        Ok(())
    }
    /// Deletes a record and all of its descendants.
    fn delete_one(&mut self, id: i64) -> Result<(), FavoritesError>;
    /// Imports legacy data, all or nothing. Returns the number of imported records.
    fn migrate(&mut self) -> Result<usize, FavoritesError>;
    /// Number of stored records.
    fn count(&self) -> Result<usize, FavoritesError>;
    fn backend(&self) -> StoreBackend;
}

/// Returns the current UNIX timestamp in seconds.
pub(crate) fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
