//! RPC method handler for the SimpleBrowser JSON-RPC protocol.
//!
//! Kept apart from `rpc_server.rs` so it can be unit-tested. `handle_method`
//! dispatches one call to the favorites service or the favicon fetcher held
//! by the [`App`].

use std::fs;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::warn;
use serde_json::{json, Value};
use url::Url;

use crate::app::App;
use crate::managers::bookmark_service::BookmarkServiceTrait;
use crate::services::favicon_fetcher::HttpGet;
use crate::types::bookmark::{normalize_tags, parse_tags, BookmarkNode, ROOT_ID};

/// Encode bytes to base64 string.
pub fn base64_encode(data: &[u8]) -> String {
    BASE64.encode(data)
}

/// Decode base64 string to bytes.
pub fn base64_decode(input: &str) -> Result<Vec<u8>, String> {
    BASE64.decode(input).map_err(|e| format!("base64 decode error: {}", e))
}

/// JSON shape of a node as the shell renders it.
pub fn node_json(node: &BookmarkNode) -> Value {
    json!({
        "id": node.id,
        "title": node.title,
        "url": node.url().unwrap_or(""),
        "folder": node.is_folder(),
        "icon_path": node.icon_path,
        "tags": node.tags,
        "created_at": node.created_at,
        "children": node.children.iter().map(node_json).collect::<Vec<_>>(),
    })
}

fn str_param<'a>(params: &'a Value, key: &str) -> Result<&'a str, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing {}", key))
}

fn id_param(params: &Value, key: &str) -> Result<i64, String> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| format!("missing {}", key))
}

/// `tags` as an array of strings or one comma-separated string.
fn tags_param(params: &Value) -> Result<Vec<String>, String> {
    match params.get("tags") {
        Some(Value::String(text)) => Ok(parse_tags(text)),
        Some(Value::Array(items)) => Ok(normalize_tags(items.iter().filter_map(|v| v.as_str()))),
        _ => Err("missing tags".to_string()),
    }
}

fn check_url(url: &str) -> Result<(), String> {
    Url::parse(url).map(|_| ()).map_err(|e| format!("invalid url: {}", e))
}

/// Dispatch a JSON-RPC method call.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
/// `page.load_finished` spawns a local task and must run inside a `LocalSet`.
pub fn handle_method<C: HttpGet + 'static>(app: &mut App<C>, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true, "version": env!("CARGO_PKG_VERSION")})),

        // ─── Favorites ───
        "favorites.tree" => Ok(node_json(app.favorites.root())),
        "favorites.add" => {
            let url = str_param(params, "url")?;
            let title = str_param(params, "title")?;
            check_url(url)?;
            let parent = params.get("parent_id").and_then(|v| v.as_i64()).unwrap_or(ROOT_ID);
            let tags = match params.get("tags") {
                Some(_) => tags_param(params)?,
                None => Vec::new(),
            };
            let id = app.favorites.add(title, url, parent).map_err(|e| e.to_string())?;
            if !tags.is_empty() {
                app.favorites.set_tags(id, &tags).map_err(|e| e.to_string())?;
            }
            Ok(json!({"id": id, "url": url, "title": title}))
        }
        "favorites.add_folder" => {
            let title = str_param(params, "title")?;
            let parent = params.get("parent_id").and_then(|v| v.as_i64()).unwrap_or(ROOT_ID);
            let id = app.favorites.add_folder(title, parent).map_err(|e| e.to_string())?;
            Ok(json!({"id": id, "title": title}))
        }
        "favorites.delete" => {
            let id = id_param(params, "id")?;
            app.favorites.delete(id).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "favorites.move" => {
            let id = id_param(params, "id")?;
            let parent = id_param(params, "parent_id")?;
            let moved = match params.get("index").and_then(|v| v.as_u64()) {
                Some(index) => app.favorites.move_to(id, parent, index as usize),
                None => app.favorites.move_node(id, parent),
            };
            moved.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "favorites.rename" => {
            let id = id_param(params, "id")?;
            let title = str_param(params, "title")?;
            let node = app
                .favorites
                .tree()
                .find(id)
                .filter(|n| n.id != ROOT_ID)
                .ok_or_else(|| format!("Favorite not found: {}", id))?;
            let url = match params.get("url").and_then(|v| v.as_str()) {
                Some(url) => url.to_string(),
                None => node.url().unwrap_or("").to_string(),
            };
            if !url.is_empty() {
                check_url(&url)?;
            }
            let parent = params
                .get("parent_id")
                .and_then(|v| v.as_i64())
                .unwrap_or_else(|| node.parent.unwrap_or(ROOT_ID));
            app.favorites.rename(id, title, &url, parent).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "favorites.set_tags" => {
            let id = id_param(params, "id")?;
            let tags = tags_param(params)?;
            app.favorites.set_tags(id, &tags).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "favorites.is_favorite" => {
            let url = str_param(params, "url")?;
            Ok(json!({"favorite": app.favorites.is_favorite(url)}))
        }
        "favorites.toggle" => {
            let url = str_param(params, "url")?;
            let title = params.get("title").and_then(|v| v.as_str()).unwrap_or(url);
            check_url(url)?;
            let favorite = app.favorites.toggle_favorite(url, title).map_err(|e| e.to_string())?;
            Ok(json!({"favorite": favorite}))
        }
        "favorites.search" => {
            let query = str_param(params, "query")?;
            let hits: Vec<Value> = app
                .favorites
                .search(query)
                .into_iter()
                .map(|n| json!({"id": n.id, "title": n.title, "url": n.url(), "icon_path": n.icon_path, "tags": n.tags}))
                .collect();
            Ok(json!(hits))
        }
        "favorites.urls" => Ok(json!(app.favorites.urls())),
        "favorites.icon" => {
            let url = str_param(params, "url")?;
            let icon = app.favorites.find_by_url(url).and_then(|n| n.icon_path.clone());
            match icon {
                Some(path) => match fs::read(&path) {
                    Ok(bytes) => Ok(json!({"data": base64_encode(&bytes), "path": path})),
                    Err(e) => {
                        warn!("favorites: cannot read cached icon {} for {}: {}", path, url, e);
                        Ok(json!({"data": null}))
                    }
                },
                None => Ok(json!({"data": null})),
            }
        }
        "favorites.migrate" => {
            let imported = app.favorites.migrate().map_err(|e| e.to_string())?;
            Ok(json!({"imported": imported}))
        }

        // ─── Web view events ───
        "page.load_finished" => {
            let url = str_param(params, "url")?;
            let ok = params.get("ok").and_then(|v| v.as_bool()).unwrap_or(true);
            Ok(json!({"fetching": app.page_load_finished(url, ok)}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
