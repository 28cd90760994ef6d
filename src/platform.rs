// SimpleBrowser platform paths
// One canonical location per file, chosen at compile time with `cfg(target_os)`:
//
//   Linux:   $XDG_{CONFIG,DATA,CACHE}_HOME/simplebrowser (default ~/.config, ~/.local/share, ~/.cache)
//   macOS:   ~/Library/Application Support/SimpleBrowser, ~/Library/Caches/SimpleBrowser
//   Windows: %APPDATA%\SimpleBrowser, %LOCALAPPDATA%\SimpleBrowser\cache

use std::env;
use std::path::PathBuf;

#[cfg(target_os = "linux")]
const APP_DIR: &str = "simplebrowser";
#[cfg(not(target_os = "linux"))]
const APP_DIR: &str = "SimpleBrowser";

/// Environment variable that relocates data and cache (used by tests and portable installs).
pub const DATA_DIR_ENV: &str = "SIMPLEBROWSER_DATA_DIR";

fn home_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    let var = "USERPROFILE";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";
    PathBuf::from(env::var(var).unwrap_or_else(|_| String::from("/tmp")))
}

/// `$var` if set and non-empty, otherwise `fallback`.
fn env_dir(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.is_empty() => PathBuf::from(v),
        _ => fallback,
    }
}

/// Directory holding `favorites.json` (the engine config).
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        env_dir("XDG_CONFIG_HOME", home_dir().join(".config")).join(APP_DIR)
    }
    #[cfg(target_os = "macos")]
    {
        home_dir().join("Library").join("Application Support").join(APP_DIR)
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        env_dir("APPDATA", home_dir().join("AppData").join("Roaming")).join(APP_DIR)
    }
}

/// Directory holding the favorites store. `SIMPLEBROWSER_DATA_DIR` wins when set.
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    #[cfg(target_os = "linux")]
    {
        env_dir("XDG_DATA_HOME", home_dir().join(".local").join("share")).join(APP_DIR)
    }
    #[cfg(not(target_os = "linux"))]
    {
        get_config_dir()
    }
}

/// Directory for disposable files such as cached favicons.
pub fn get_cache_dir() -> PathBuf {
    if let Ok(dir) = env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir).join("cache");
        }
    }
    #[cfg(target_os = "linux")]
    {
        env_dir("XDG_CACHE_HOME", home_dir().join(".cache")).join(APP_DIR)
    }
    #[cfg(target_os = "macos")]
    {
        home_dir().join("Library").join("Caches").join(APP_DIR)
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        env_dir("LOCALAPPDATA", home_dir().join("AppData").join("Local"))
            .join(APP_DIR)
            .join("cache")
    }
}

/// Default SQLite store.
pub fn favorites_db_path() -> PathBuf {
    get_data_dir().join("favorites.db")
}

/// Default flat-file store, also the legacy file imported into SQLite.
pub fn favorites_json_path() -> PathBuf {
    get_data_dir().join("favorites.json")
}

/// Default favicon cache.
pub fn favicon_cache_dir() -> PathBuf {
    get_cache_dir().join("favicons")
}
