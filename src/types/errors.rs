use std::fmt;

// === FavoritesError ===

/// Errors raised by the favorites tree, its stores and the bookmark service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoritesError {
    /// The backing store could not be opened, read or written.
    StoreUnavailable(String),
    /// A bookmark with the same URL already exists.
    DuplicateEntry(String),
    /// A stored or submitted record is not well formed.
    MalformedRecord(String),
    /// Moving node `.0` under `.1` would make the node its own ancestor.
    CycleDetected(i64, i64),
    /// The target parent is a bookmark, which cannot hold children.
    InvalidParent(i64),
    /// No node with the given ID exists.
    NotFound(i64),
    /// The legacy import was rolled back.
    MigrationFailure(String),
}

impl fmt::Display for FavoritesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FavoritesError::StoreUnavailable(msg) => {
                write!(f, "Favorites store unavailable: {}", msg)
            }
            FavoritesError::DuplicateEntry(url) => write!(f, "Duplicate favorite URL: {}", url),
            FavoritesError::MalformedRecord(msg) => write!(f, "Malformed favorite record: {}", msg),
            FavoritesError::CycleDetected(id, target) => {
                write!(f, "Cannot move favorite {} under its own descendant {}", id, target)
            }
            FavoritesError::InvalidParent(id) => {
                write!(f, "Favorite {} is a bookmark and cannot have children", id)
            }
            FavoritesError::NotFound(id) => write!(f, "Favorite not found: {}", id),
            FavoritesError::MigrationFailure(msg) => {
                write!(f, "Favorites migration rolled back: {}", msg)
            }
        }
    }
}

impl std::error::Error for FavoritesError {}

impl From<rusqlite::Error> for FavoritesError {
    fn from(e: rusqlite::Error) -> Self {
        FavoritesError::StoreUnavailable(e.to_string())
    }
}

// === FaviconError ===

/// Errors from a single favicon fetch. None of them is fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaviconError {
    /// The page URL has no http(s) host to derive a favicon URL from.
    InvalidUrl(String),
    /// The transport failed (DNS, TLS, timeout, reset).
    Network(String),
    /// The server answered with a non-success status.
    HttpStatus(u16),
    /// The server answered 2xx with no body.
    EmptyBody(String),
    /// Writing the icon to the cache directory failed.
    Cache(String),
}

impl fmt::Display for FaviconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaviconError::InvalidUrl(url) => write!(f, "No favicon host for URL: {}", url),
            FaviconError::Network(msg) => write!(f, "Favicon network error: {}", msg),
            FaviconError::HttpStatus(code) => write!(f, "Favicon request failed with status {}", code),
            FaviconError::EmptyBody(url) => write!(f, "Empty favicon body from {}", url),
            FaviconError::Cache(msg) => write!(f, "Favicon cache error: {}", msg),
        }
    }
}

impl std::error::Error for FaviconError {}

// === ConfigError ===

/// Errors related to loading or saving the favorites configuration file.
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading or writing the config file.
    IoError(String),
    /// Failed to serialize or deserialize the config file.
    SerializationError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::SerializationError(msg) => {
                write!(f, "Config serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
