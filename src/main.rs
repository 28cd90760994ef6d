//! SimpleBrowser favorites: console demo.
//!
//! Builds a small tree in an in-memory store, exercises the tree operations
//! and prints the result. The browser shell itself talks to `simplebrowser-rpc`.

use simplebrowser::managers::bookmark_service::{BookmarkService, BookmarkServiceTrait};
use simplebrowser::store::{json_file, SqliteFavoritesStore};
use simplebrowser::types::bookmark::{BookmarkNode, ROOT_ID};
use simplebrowser::types::errors::FavoritesError;

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

fn print_tree(node: &BookmarkNode, depth: usize) {
    for child in &node.children {
        let indent = "  ".repeat(depth + 1);
        match child.url() {
            Some(url) => println!("{}[{}] {} <{}>", indent, child.id, child.title, url),
            None => println!("{}[{}] {}/", indent, child.id, child.title),
        }
        print_tree(child, depth + 1);
    }
}

fn run() -> Result<(), FavoritesError> {
    let store = SqliteFavoritesStore::open_in_memory()?;
    let mut favorites = BookmarkService::new(Box::new(store));
    favorites.subscribe(|root| println!("  (tree changed, {} top-level entries)", root.children.len()));

    section("Adding favorites");
    let docs = favorites.add_folder("Docs", ROOT_ID)?;
    let rust = favorites.add_folder("Rust", docs)?;
    favorites.add("The Rust Book", "https://doc.rust-lang.org/book/", rust)?;
    favorites.add("Qt", "https://qt.io", ROOT_ID)?;
    favorites.add("SQLite", "https://sqlite.org/docs.html", docs)?;
    print_tree(favorites.root(), 0);

    section("Duplicate and cycle checks");
    match favorites.add("Qt again", "https://qt.io", docs) {
        Err(e) => println!("  rejected: {}", e),
        Ok(id) => println!("  unexpectedly added {}", id),
    }
    match favorites.move_node(docs, rust) {
        Err(e) => println!("  rejected: {}", e),
        Ok(()) => println!("  unexpectedly moved"),
    }

    section("Moving and renaming");
    favorites.move_node(rust, ROOT_ID)?;
    favorites.rename(docs, "Reference", "", ROOT_ID)?;
    print_tree(favorites.root(), 0);

    section("Star button");
    println!("  qt.io favorite: {}", favorites.is_favorite("https://qt.io"));
    favorites.toggle_favorite("https://qt.io", "Qt")?;
    println!("  qt.io favorite after toggle: {}", favorites.is_favorite("https://qt.io"));

    section("Flat-file export");
    println!("{}", json_file::encode(favorites.root())?);
    Ok(())
}

fn main() {
    env_logger::init();

    println!("SimpleBrowser favorites v{} (demo mode)", env!("CARGO_PKG_VERSION"));
    println!();
    if let Err(e) = run() {
        eprintln!("demo failed: {}", e);
        std::process::exit(1);
    }
}
