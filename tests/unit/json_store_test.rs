//! Unit tests for the flat-file favorites store and its codec.

use std::fs;

use simplebrowser::managers::tree_store::TreeStore;
use simplebrowser::store::json_file::{decode, decode_legacy, encode};
use simplebrowser::store::{FavoritesStore, JsonFavoritesStore};
use simplebrowser::types::bookmark::{NodeKind, PersistedRecord, ROOT_ID, TRANSIENT_ID};
use simplebrowser::types::config::StoreBackend;
use simplebrowser::types::errors::FavoritesError;
use tempfile::TempDir;

fn setup() -> (TempDir, JsonFavoritesStore) {
    let dir = TempDir::new().unwrap();
    let store = JsonFavoritesStore::open(dir.path().join("favorites.json")).unwrap();
    (dir, store)
}

fn new_folder(title: &str, parent_id: i64) -> PersistedRecord {
    PersistedRecord {
        id: TRANSIENT_ID,
        title: title.to_string(),
        kind: NodeKind::Folder,
        icon_path: None,
        parent_id,
        position: 0,
        created_at: 0,
        tags: Vec::new(),
    }
}

fn new_bookmark(title: &str, url: &str, parent_id: i64) -> PersistedRecord {
    PersistedRecord {
        id: TRANSIENT_ID,
        title: title.to_string(),
        kind: NodeKind::Bookmark { url: url.to_string() },
        icon_path: None,
        parent_id,
        position: 0,
        created_at: 0,
        tags: Vec::new(),
    }
}

// === codec ===

#[test]
fn test_decode_nested_file() {
    let records = decode(
        r#"[
          {"id": 1, "title": "Qt", "folder": true, "created_at": 5, "children": [
            {"id": 2, "title": "Docs", "url": "https://doc.qt.io", "folder": false, "favicon": "/c/doc.qt.io.ico"}
          ]},
          {"id": 3, "title": "Rust", "url": "https://rust-lang.org"}
        ]"#,
        true,
    )
    .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].kind, NodeKind::Folder);
    assert_eq!(records[0].created_at, 5);
    assert_eq!(records[1].parent_id, 1);
    assert_eq!(records[1].icon_path.as_deref(), Some("/c/doc.qt.io.ico"));
    assert_eq!((records[2].parent_id, records[2].position), (ROOT_ID, 1));
}

#[test]
fn test_decode_rejects_non_array() {
    assert!(matches!(decode(r#"{"title": "x"}"#, false), Err(FavoritesError::MalformedRecord(_))));
    assert!(matches!(decode("not json", false), Err(FavoritesError::MalformedRecord(_))));
}

#[test]
fn test_decode_lenient_skips_bad_entries() {
    let text = r#"[
      {"title": "folder with url", "folder": true, "url": "https://x.example"},
      {"title": "bookmark without url"},
      {"no_title": 1},
      {"id": 4, "title": "ok", "url": "https://ok.example"},
      {"id": 4, "title": "repeated id", "url": "https://again.example"},
      {"id": 6, "title": "bookmark with children", "url": "https://b.example",
       "children": [{"title": "lost", "url": "https://lost.example"}]}
    ]"#;

    let records = decode(text, false).unwrap();
    let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["ok", "repeated id", "bookmark with children"]);
    assert_eq!(records[0].id, 4);
    assert!(records[1].id > 6, "a repeated id is replaced by a fresh one");
    assert_eq!(records.iter().map(|r| r.position).collect::<Vec<_>>(), vec![0, 1, 2]);
}

#[test]
fn test_decode_strict_fails_on_first_problem() {
    let text = r#"[{"title": "ok", "url": "https://ok.example"}, {"title": "bookmark without url"}]"#;
    assert!(matches!(decode(text, true), Err(FavoritesError::MalformedRecord(_))));
}

#[test]
fn test_encode_omits_empty_optional_fields() {
    let tree = TreeStore::build(&[
        PersistedRecord { id: 1, ..new_folder("Empty", ROOT_ID) },
        PersistedRecord { id: 2, ..new_bookmark("Qt", "https://qt.io", ROOT_ID) },
    ]);
    let json = encode(tree.root()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value[0]["folder"], true);
    assert_eq!(value[0]["url"], "");
    assert!(value[0].get("children").is_none());
    assert_eq!(value[1]["url"], "https://qt.io");
    assert!(value[1].get("favicon").is_none());
}

// === store ===

#[test]
fn test_missing_or_empty_file_loads_nothing() {
    let (dir, store) = setup();
    assert!(store.load().unwrap().is_empty());
    fs::write(dir.path().join("favorites.json"), "  \n").unwrap();
    assert!(store.load().unwrap().is_empty());
    assert_eq!(store.backend(), StoreBackend::Json);
}

#[test]
fn test_open_on_directory_is_unavailable() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        JsonFavoritesStore::open(dir.path()),
        Err(FavoritesError::StoreUnavailable(_))
    ));
}

#[test]
fn test_add_one_writes_file_with_stable_ids() {
    let (_dir, mut store) = setup();
    let docs = store.add_one(&new_folder("Docs", ROOT_ID)).unwrap();
    let qt = store.add_one(&new_bookmark("Qt", "https://qt.io", docs)).unwrap();
    assert_eq!((docs, qt), (1, 2));
    assert!(store.path().exists());
    assert!(!store.path().with_extension("json.tmp").exists());

    let tree = TreeStore::build(&store.load().unwrap());
    assert_eq!(tree.parent_of(qt), Some(docs));
    assert!(tree.find(qt).unwrap().created_at > 0);
    assert_eq!(store.count().unwrap(), 2);
}

#[test]
fn test_add_one_rejections() {
    let (_dir, mut store) = setup();
    let qt = store.add_one(&new_bookmark("Qt", "https://qt.io", ROOT_ID)).unwrap();
    assert_eq!(
        store.add_one(&new_bookmark("Dup", "https://qt.io", ROOT_ID)),
        Err(FavoritesError::DuplicateEntry("https://qt.io".to_string()))
    );
    assert_eq!(
        store.add_one(&new_bookmark("Child", "https://child.example", qt)),
        Err(FavoritesError::InvalidParent(qt))
    );
    assert_eq!(
        store.add_one(&new_folder("Orphan", 77)),
        Err(FavoritesError::NotFound(77))
    );
}

#[test]
fn test_update_one_renames_and_moves() {
    let (_dir, mut store) = setup();
    let docs = store.add_one(&new_folder("Docs", ROOT_ID)).unwrap();
    let qt = store.add_one(&new_bookmark("Qt", "https://qt.io", ROOT_ID)).unwrap();

    let record = PersistedRecord {
        id: qt,
        title: "Qt Home".to_string(),
        kind: NodeKind::Bookmark { url: "https://www.qt.io".to_string() },
        icon_path: Some("/c/qt.ico".to_string()),
        parent_id: docs,
        position: 0,
        created_at: 0,
        tags: Vec::new(),
    };
    store.update_one(&record).unwrap();

    let tree = TreeStore::build(&store.load().unwrap());
    let node = tree.find(qt).unwrap();
    assert_eq!(node.title, "Qt Home");
    assert_eq!(node.url(), Some("https://www.qt.io"));
    assert_eq!(node.icon_path.as_deref(), Some("/c/qt.ico"));
    assert_eq!(tree.parent_of(qt), Some(docs));
}

#[test]
fn test_update_one_rejects_kind_change_and_missing() {
    let (_dir, mut store) = setup();
    let docs = store.add_one(&new_folder("Docs", ROOT_ID)).unwrap();
    let as_bookmark = PersistedRecord { id: docs, ..new_bookmark("Docs", "https://x.example", ROOT_ID) };
    assert!(matches!(store.update_one(&as_bookmark), Err(FavoritesError::MalformedRecord(_))));
    let missing = PersistedRecord { id: 50, ..new_folder("Missing", ROOT_ID) };
    assert_eq!(store.update_one(&missing), Err(FavoritesError::NotFound(50)));
}

#[test]
fn test_delete_one_removes_subtree() {
    let (_dir, mut store) = setup();
    let docs = store.add_one(&new_folder("Docs", ROOT_ID)).unwrap();
    store.add_one(&new_bookmark("Qt", "https://qt.io", docs)).unwrap();
    store.add_one(&new_bookmark("Rust", "https://rust-lang.org", ROOT_ID)).unwrap();

    store.delete_one(docs).unwrap();
    assert_eq!(store.count().unwrap(), 1);
    assert_eq!(store.delete_one(docs), Err(FavoritesError::NotFound(docs)));
}

#[test]
fn test_migrate_is_noop() {
    let (_dir, mut store) = setup();
    assert_eq!(store.migrate().unwrap(), 0);
}

#[test]
fn test_legacy_file_without_ids_gets_ids_on_first_write() {
    let (dir, mut store) = setup();
    fs::write(
        dir.path().join("favorites.json"),
        r#"[{"title": "Qt", "url": "https://qt.io"}, {"title": "Rust", "url": "https://rust-lang.org"}]"#,
    )
    .unwrap();

    let added = store.add_one(&new_bookmark("Docs", "https://doc.qt.io", ROOT_ID)).unwrap();
    assert_eq!(added, 3);
    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("favorites.json")).unwrap()).unwrap();
    let ids: Vec<i64> = written.as_array().unwrap().iter().map(|v| v["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn test_deleted_ids_are_not_handed_out_again() {
    let (_dir, mut store) = setup();
    let qt = store.add_one(&new_bookmark("Qt", "https://qt.io", ROOT_ID)).unwrap();
    let rust = store.add_one(&new_bookmark("Rust", "https://rust-lang.org", ROOT_ID)).unwrap();
    store.delete_one(rust).unwrap();

    let docs = store.add_one(&new_bookmark("Docs", "https://doc.qt.io", ROOT_ID)).unwrap();
    assert_eq!((qt, rust, docs), (1, 2, 3));
}

#[test]
fn test_tags_are_written_as_array_and_read_back() {
    let (dir, mut store) = setup();
    let mut record = new_bookmark("Qt", "https://qt.io", ROOT_ID);
    record.tags = vec!["gui".to_string(), "c++".to_string()];
    let id = store.add_one(&record).unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("favorites.json")).unwrap()).unwrap();
    assert_eq!(written[0]["tags"], serde_json::json!(["gui", "c++"]));
    let loaded = store.load().unwrap();
    assert_eq!(loaded[0].id, id);
    assert_eq!(loaded[0].tags, vec!["gui".to_string(), "c++".to_string()]);
}

#[test]
fn test_update_many_writes_once_and_keeps_order() {
    let (_dir, mut store) = setup();
    let docs = store.add_one(&new_folder("Docs", ROOT_ID)).unwrap();
    let qt = store.add_one(&new_bookmark("Qt", "https://qt.io", ROOT_ID)).unwrap();
    let rust = store.add_one(&new_bookmark("Rust", "https://rust-lang.org", ROOT_ID)).unwrap();

    let moved = PersistedRecord { id: qt, position: 0, ..new_bookmark("Qt", "https://qt.io", docs) };
    let shifted = PersistedRecord { id: rust, position: 1, ..new_bookmark("Rust", "https://rust-lang.org", ROOT_ID) };
    store.update_many(&[moved, shifted]).unwrap();

    let tree = TreeStore::build(&store.load().unwrap());
    assert_eq!(tree.parent_of(qt), Some(docs));
    let top: Vec<i64> = tree.root().children.iter().map(|n| n.id).collect();
    assert_eq!(top, vec![docs, rust]);
}

#[test]
fn test_older_shapes_only_through_legacy_decode() {
    let text = r#"[{"name": "Qt", "url": "", "children": [{"name": "Docs", "url": "https://doc.qt.io"}]}]"#;
    assert!(matches!(decode(text, true), Err(FavoritesError::MalformedRecord(_))));

    let records = decode_legacy(text).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[0].kind.is_folder());
    assert_eq!(records[1].parent_id, records[0].id);
    assert_eq!(records[1].title, "Docs");
}
