// SimpleBrowser state managers

pub mod bookmark_service;
pub mod tree_store;
