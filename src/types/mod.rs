// SimpleBrowser shared type definitions
// Each submodule defines types used across the favorites engine.

pub mod bookmark;
pub mod config;
pub mod errors;
