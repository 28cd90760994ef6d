//! SimpleBrowser RPC Server: JSON-RPC over stdin/stdout for the browser shell.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"favorites.add", "params":{"url":"...","title":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//! Events:   {"event":"ready",...} once, {"event":"favorites.changed",...} after every tree change.
//!
//! Everything runs on one thread; favicon fetches are local tasks whose
//! results are applied between requests.

use std::cell::Cell;
use std::io::{self, Write};
use std::rc::Rc;

use log::{error, info, warn};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::LocalSet;

use simplebrowser::app::App;
use simplebrowser::rpc_handler::handle_method;
use simplebrowser::services::config::{ConfigEngine, ConfigEngineTrait};
use simplebrowser::services::favicon_fetcher::HttpGet;

fn emit(value: &Value) {
    println!("{}", value);
    let _ = io::stdout().flush();
}

fn handle_line<C: HttpGet + 'static>(app: &mut App<C>, line: &str) {
    if line.trim().is_empty() {
        return;
    }
    let req: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            emit(&json!({"id": null, "error": format!("parse error: {}", e)}));
            return;
        }
    };

    let id = req.get("id").cloned().unwrap_or(Value::Null);
    let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
    let params = req.get("params").cloned().unwrap_or(json!({}));

    let response = match handle_method(app, method, &params) {
        Ok(val) => json!({"id": id, "result": val}),
        Err(err) => json!({"id": id, "error": err}),
    };
    emit(&response);
}

async fn serve() {
    let mut config = ConfigEngine::new(None);
    if let Err(e) = config.load() {
        warn!("{}; using default favorites config", e);
    }

    let (mut app, mut completions) = match App::new(config) {
        Ok(parts) => parts,
        Err(e) => {
            error!("failed to initialize SimpleBrowser favorites: {}", e);
            return;
        }
    };
    app.startup();

    let revision = Rc::new(Cell::new(0u64));
    let counter = Rc::clone(&revision);
    app.favorites.subscribe(move |_| counter.set(counter.get() + 1));
    let mut announced = revision.get();

    emit(&json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => handle_line(&mut app, &line),
                Ok(None) => break,
                Err(e) => {
                    error!("stdin: {}", e);
                    break;
                }
            },
            Some(outcome) = completions.next() => {
                app.favorites.apply_favicon(outcome);
            }
        }

        if revision.get() != announced {
            announced = revision.get();
            emit(&json!({"event": "favorites.changed", "revision": announced}));
        }
    }
    info!("stdin closed, shutting down");
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!("failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };
    LocalSet::new().block_on(&runtime, serve());
}
