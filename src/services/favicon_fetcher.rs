//! Favicon fetcher for SimpleBrowser.
//!
//! Each finished page load triggers one GET of `scheme://host/favicon.ico`.
//! The request runs as a `spawn_local` task on the browser's single-threaded
//! loop; its outcome is queued on a channel and applied to the favorites tree
//! by whoever drains [`FaviconCompletions`]. Failures are only logged.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use log::debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use crate::types::errors::FaviconError;

/// Async HTTP GET returning the response body.
pub trait HttpGet {
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FaviconError>>;
}

/// [`HttpGet`] over a shared `reqwest::Client`.
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    /// Builds a client whose whole-request timeout is `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FaviconError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("SimpleBrowser/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FaviconError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpGet for ReqwestFetch {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FaviconError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FaviconError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FaviconError::HttpStatus(status.as_u16()));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| FaviconError::Network(e.to_string()))?;
        Ok(body.to_vec())
    }
}

/// Result of one fetch, keyed by the page that triggered it.
#[derive(Debug, Clone, PartialEq)]
pub struct FaviconOutcome {
    pub page_url: String,
    /// Path of the cached icon file on success.
    pub result: Result<PathBuf, FaviconError>,
}

/// Receiving side of the fetcher; owned by the event loop.
pub struct FaviconCompletions {
    rx: mpsc::UnboundedReceiver<FaviconOutcome>,
}

impl FaviconCompletions {
    /// Waits for the next completed fetch.
    pub async fn next(&mut self) -> Option<FaviconOutcome> {
        self.rx.recv().await
    }

    /// Returns a completed fetch if one is already queued.
    pub fn try_next(&mut self) -> Option<FaviconOutcome> {
        self.rx.try_recv().ok()
    }
}

/// Issues favicon requests and caches the icons under `cache_dir`.
///
/// Concurrent fetches for the same host are not merged; they write the same
/// file with the same bytes.
pub struct FaviconFetcher<C> {
    client: Rc<C>,
    cache_dir: PathBuf,
    tx: mpsc::UnboundedSender<FaviconOutcome>,
}

impl<C: HttpGet + 'static> FaviconFetcher<C> {
    pub fn new<P: AsRef<Path>>(client: C, cache_dir: P) -> (Self, FaviconCompletions) {
        let (tx, rx) = mpsc::unbounded_channel();
        let fetcher = Self {
            client: Rc::new(client),
            cache_dir: cache_dir.as_ref().to_path_buf(),
            tx,
        };
        (fetcher, FaviconCompletions { rx })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Reacts to a page-load-finished event from the web view.
    ///
    /// Failed loads and URLs without an http(s) host are ignored. Otherwise a
    /// local task is spawned; it must run inside a `tokio::task::LocalSet`.
    pub fn on_load_finished(&self, page_url: &str, ok: bool) -> Option<JoinHandle<()>> {
        if !ok {
            return None;
        }
        let (icon_url, host) = match favicon_url(page_url) {
            Ok(parts) => parts,
            Err(e) => {
                debug!("favicon: {}", e);
                return None;
            }
        };

        let client = Rc::clone(&self.client);
        let target = cache_path(&self.cache_dir, &host);
        let tx = self.tx.clone();
        let page_url = page_url.to_string();
        Some(tokio::task::spawn_local(async move {
            let result = fetch_and_cache(client.as_ref(), &icon_url, &target).await;
            // The receiver is gone only when the loop is shutting down.
            let _ = tx.send(FaviconOutcome { page_url, result });
        }))
    }
}

async fn fetch_and_cache<C: HttpGet>(client: &C, icon_url: &str, target: &Path) -> Result<PathBuf, FaviconError> {
    let bytes = client.get(icon_url).await?;
    if bytes.is_empty() {
        return Err(FaviconError::EmptyBody(icon_url.to_string()));
    }
    if let Some(dir) = target.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| FaviconError::Cache(format!("{}: {}", dir.display(), e)))?;
    }
    tokio::fs::write(target, &bytes)
        .await
        .map_err(|e| FaviconError::Cache(format!("{}: {}", target.display(), e)))?;
    debug!("favicon: cached {} bytes from {} at {}", bytes.len(), icon_url, target.display());
    Ok(target.to_path_buf())
}

/// Derives `scheme://host[:port]/favicon.ico` and the host from a page URL.
pub fn favicon_url(page_url: &str) -> Result<(String, String), FaviconError> {
    let parsed = Url::parse(page_url).map_err(|_| FaviconError::InvalidUrl(page_url.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(FaviconError::InvalidUrl(page_url.to_string()));
    }
    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| FaviconError::InvalidUrl(page_url.to_string()))?;
    let authority = match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    Ok((
        format!("{}://{}/favicon.ico", parsed.scheme(), authority),
        host.to_string(),
    ))
}

/// Cache file for a host: `<cache_dir>/<host>.ico`.
pub fn cache_path(cache_dir: &Path, host: &str) -> PathBuf {
    let name: String = host
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    cache_dir.join(format!("{}.ico", name))
}
