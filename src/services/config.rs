// SimpleBrowser favorites configuration
// Loads and saves `FavoritesConfig` as JSON and resolves the effective store,
// legacy and favicon cache paths against the platform directories.

use std::fs;
use std::path::{Path, PathBuf};

use crate::platform;
use crate::types::config::{FavoritesConfig, StoreBackend};
use crate::types::errors::ConfigError;

/// Trait defining the configuration interface.
pub trait ConfigEngineTrait {
    fn load(&mut self) -> Result<FavoritesConfig, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn get_config(&self) -> &FavoritesConfig;
    fn set_config(&mut self, config: FavoritesConfig) -> Result<(), ConfigError>;
    fn get_config_path(&self) -> &str;
}

/// JSON-file backed configuration.
pub struct ConfigEngine {
    config_path: String,
    config: FavoritesConfig,
}

impl ConfigEngine {
    /// Creates a new ConfigEngine.
    ///
    /// With `path_override == None` the file is `favorites.json` in the platform config dir.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = match path_override {
            Some(p) => p,
            None => platform::get_config_dir()
                .join("favorites.json")
                .to_string_lossy()
                .to_string(),
        };

        Self {
            config_path,
            config: FavoritesConfig::default(),
        }
    }

    /// Builds an engine around an in-memory config; nothing is read from disk.
    pub fn with_config(config: FavoritesConfig) -> Self {
        let mut engine = Self::new(None);
        engine.config = config;
        engine
    }

    /// Where the favorites store lives for the configured backend.
    pub fn store_path(&self) -> PathBuf {
        match (&self.config.store_path, self.config.backend) {
            (Some(p), _) => PathBuf::from(p),
            (None, StoreBackend::Sqlite) => platform::favorites_db_path(),
            (None, StoreBackend::Json) => platform::favorites_json_path(),
        }
    }

    /// The flat file imported into SQLite on startup.
    pub fn legacy_json_path(&self) -> PathBuf {
        self.config
            .legacy_json_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(platform::favorites_json_path)
    }

    pub fn favicon_cache_dir(&self) -> PathBuf {
        self.config
            .favicon_cache_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(platform::favicon_cache_dir)
    }
}

impl ConfigEngineTrait for ConfigEngine {
    /// Loads the config file; a missing file yields defaults, a malformed one an error.
    fn load(&mut self) -> Result<FavoritesConfig, ConfigError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            self.config = FavoritesConfig::default();
            return Ok(self.config.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("Failed to read config file: {}", e)))?;

        let config: FavoritesConfig = serde_json::from_str(&content).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;

        self.config = config;
        Ok(self.config.clone())
    }

    /// Saves the current config, creating parent directories as needed.
    fn save(&self) -> Result<(), ConfigError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ConfigError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.config).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| ConfigError::IoError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_config(&self) -> &FavoritesConfig {
        &self.config
    }

    /// Replaces the config and persists it.
    fn set_config(&mut self, config: FavoritesConfig) -> Result<(), ConfigError> {
        self.config = config;
        self.save()
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
