//! App Core for SimpleBrowser.
//!
//! Wires the configuration, the favorites service and the favicon fetcher
//! together and owns the favorites lifecycle (store selection, legacy import).

use std::time::Duration;

use log::{error, info, warn};

use crate::managers::bookmark_service::BookmarkService;
use crate::services::config::{ConfigEngine, ConfigEngineTrait};
use crate::services::favicon_fetcher::{FaviconCompletions, FaviconFetcher, HttpGet, ReqwestFetch};
use crate::store::{FavoritesStore, JsonFavoritesStore, SqliteFavoritesStore};
use crate::types::config::StoreBackend;
use crate::types::errors::FavoritesError;

/// Central application struct.
///
/// The favicon completion queue is handed out separately by the constructors
/// so the event loop can await it while holding `&mut App` elsewhere.
pub struct App<C = ReqwestFetch> {
    pub config: ConfigEngine,
    pub favorites: BookmarkService,
    pub favicons: FaviconFetcher<C>,
}

impl App<ReqwestFetch> {
    /// Creates the App with a reqwest-backed favicon client.
    pub fn new(config: ConfigEngine) -> Result<(Self, FaviconCompletions), Box<dyn std::error::Error>> {
        let timeout = Duration::from_secs(config.get_config().favicon_timeout_secs);
        let client = ReqwestFetch::new(timeout)?;
        Ok(Self::with_client(config, client)?)
    }
}

impl<C: HttpGet + 'static> App<C> {
    /// Opens the configured store and builds the App around `client`.
    pub fn with_client(config: ConfigEngine, client: C) -> Result<(Self, FaviconCompletions), FavoritesError> {
        let store = open_store(&config)?;
        Ok(Self::with_parts(config, store, client))
    }

    /// Builds the App from an already opened store.
    pub fn with_parts(config: ConfigEngine, store: Box<dyn FavoritesStore>, client: C) -> (Self, FaviconCompletions) {
        let favorites = BookmarkService::new(store);
        let (favicons, completions) = FaviconFetcher::new(client, config.favicon_cache_dir());
        (
            Self {
                config,
                favorites,
                favicons,
            },
            completions,
        )
    }

    /// Startup sequence: import the legacy flat file when configured to.
    ///
    /// A failed import is logged and leaves the store as it was.
    pub fn startup(&mut self) {
        if !self.config.get_config().migrate_on_startup {
            return;
        }
        match self.favorites.migrate() {
            Ok(0) => {}
            Ok(n) => info!("favorites: imported {} legacy entries", n),
            Err(e) => warn!("favorites: legacy import skipped: {}", e),
        }
    }

    /// Forwards a page-load-finished event; returns whether a fetch was started.
    pub fn page_load_finished(&self, url: &str, ok: bool) -> bool {
        self.favicons.on_load_finished(url, ok).is_some()
    }

    /// Applies every favicon fetch that has already completed.
    ///
    /// Returns how many of them were attached to a bookmark.
    pub fn pump_favicons(&mut self, completions: &mut FaviconCompletions) -> usize {
        let mut attached = 0;
        while let Some(outcome) = completions.try_next() {
            if self.favorites.apply_favicon(outcome).is_some() {
                attached += 1;
            }
        }
        attached
    }
}

/// Opens the configured backend. An unusable store degrades to an in-memory one.
fn open_store(config: &ConfigEngine) -> Result<Box<dyn FavoritesStore>, FavoritesError> {
    let path = config.store_path();
    let opened: Result<Box<dyn FavoritesStore>, FavoritesError> = match config.get_config().backend {
        StoreBackend::Sqlite => SqliteFavoritesStore::open(&path).map(|store| {
            Box::new(store.with_legacy_file(config.legacy_json_path())) as Box<dyn FavoritesStore>
        }),
        StoreBackend::Json => {
            JsonFavoritesStore::open(&path).map(|store| Box::new(store) as Box<dyn FavoritesStore>)
        }
    };

    match opened {
        Ok(store) => {
            info!("favorites: using {} ({:?})", path.display(), store.backend());
            Ok(store)
        }
        Err(e) => {
            error!("favorites: {}; changes will not survive a restart", e);
            Ok(Box::new(SqliteFavoritesStore::open_in_memory()?))
        }
    }
}
