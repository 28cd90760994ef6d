// SimpleBrowser services

pub mod config;
pub mod favicon_fetcher;
