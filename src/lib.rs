//! SimpleBrowser favorites engine.
//!
//! The bookmark tree, its SQLite and JSON stores, favicon caching and the
//! JSON-RPC surface the browser shell talks to. The library crate exposes all
//! modules for use by the binaries and integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod store;
pub mod types;
