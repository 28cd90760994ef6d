//! Property-based tests for the star-button operations of the bookmark service.
//!
//! These tests verify that `is_favorite` tracks add, delete and toggle for
//! arbitrary valid URLs and titles.

use proptest::prelude::*;
use simplebrowser::managers::bookmark_service::{BookmarkService, BookmarkServiceTrait};
use simplebrowser::store::SqliteFavoritesStore;
use simplebrowser::types::bookmark::ROOT_ID;

/// Strategy for generating valid URL strings.
/// Produces URLs with http/https scheme, alphanumeric host, and optional path.
fn arb_url() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just("https"), Just("http")],
        "[a-z][a-z0-9]{2,15}",
        prop_oneof![Just(".com"), Just(".org"), Just(".net"), Just(".io")],
        proptest::option::of("/[a-z0-9]{1,10}"),
    )
        .prop_map(|(scheme, host, tld, path)| format!("{}://{}{}{}", scheme, host, tld, path.unwrap_or_default()))
}

/// Strategy for generating non-empty bookmark titles.
fn arb_title() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9 ]{1,30}"
}

fn setup() -> BookmarkService {
    let store = SqliteFavoritesStore::open_in_memory().expect("Failed to open in-memory store");
    BookmarkService::new(Box::new(store))
}

// **Property: add-then-is_favorite, delete-then-not**
//
// *For any* valid URL and title, adding a bookmark makes `is_favorite` true
// and deleting it makes it false again.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn add_then_delete_tracks_is_favorite(url in arb_url(), title in arb_title()) {
        let mut service = setup();
        prop_assert!(!service.is_favorite(&url));

        let id = service.add(&title, &url, ROOT_ID).expect("add should succeed for valid inputs");
        prop_assert!(service.is_favorite(&url));
        prop_assert_eq!(service.find_by_url(&url).map(|n| n.id), Some(id));

        service.delete(id).expect("delete should succeed");
        prop_assert!(!service.is_favorite(&url));
    }

    #[test]
    fn toggle_twice_restores_state(
        urls in prop::collection::hash_set(arb_url(), 1..6),
        title in arb_title(),
    ) {
        let mut service = setup();
        for url in &urls {
            prop_assert!(service.toggle_favorite(url, &title).unwrap());
        }
        let before = service.urls().len();

        let first = urls.iter().next().unwrap();
        prop_assert!(!service.toggle_favorite(first, &title).unwrap());
        prop_assert!(service.toggle_favorite(first, &title).unwrap());
        prop_assert!(service.is_favorite(first));
        prop_assert_eq!(service.urls().len(), before);
    }
}
