//! Property-based tests for moving nodes inside the favorites tree.
//!
//! A move must be rejected exactly when it would make a node its own
//! ancestor, and otherwise must land the node under the requested folder
//! without losing or duplicating anything.

use proptest::prelude::*;
use simplebrowser::managers::tree_store::TreeStore;
use simplebrowser::types::bookmark::{NodeKind, PersistedRecord, ROOT_ID};
use simplebrowser::types::errors::FavoritesError;

/// Strategy for a consistent tree of up to 15 nodes.
///
/// Node `i + 1` hangs off the root or an earlier folder; roughly a third of
/// the nodes are bookmarks.
fn arb_tree() -> impl Strategy<Value = TreeStore> {
    prop::collection::vec((0usize..16, 0u8..3), 1..16).prop_map(|shape| {
        let mut records: Vec<PersistedRecord> = Vec::with_capacity(shape.len());
        for (i, (parent_pick, kind_pick)) in shape.into_iter().enumerate() {
            let folders: Vec<i64> = records.iter().filter(|r| r.kind.is_folder()).map(|r| r.id).collect();
            let parent_id = if parent_pick == 0 || parent_pick > folders.len() {
                ROOT_ID
            } else {
                folders[parent_pick - 1]
            };
            let id = i as i64 + 1;
            let kind = if kind_pick == 0 {
                NodeKind::Bookmark {
                    url: format!("https://node{}.example", id),
                }
            } else {
                NodeKind::Folder
            };
            records.push(PersistedRecord {
                id,
                title: format!("node {}", id),
                kind,
                icon_path: None,
                parent_id,
                position: i as i64,
                created_at: 0,
                tags: Vec::new(),
            });
        }
        TreeStore::build(&records)
    })
}

// **Property: cycle rejection is exact**
//
// *For any* tree, node n and target t, moving n under t fails with
// CycleDetected iff t == n or t is a descendant of n. Otherwise it fails with
// InvalidParent iff t is a bookmark, and succeeds with parent(n) == t.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn move_rejects_exactly_the_cycles(
        tree in arb_tree(),
        n_pick in any::<prop::sample::Index>(),
        t_pick in any::<prop::sample::Index>(),
    ) {
        let ids: Vec<i64> = tree.iter().map(|node| node.id).collect();
        let n = ids[n_pick.index(ids.len())];
        let mut targets = ids.clone();
        targets.push(ROOT_ID);
        let t = targets[t_pick.index(targets.len())];

        let would_cycle = t == n || tree.is_descendant(n, t);
        let target_is_folder = tree.find(t).map(|node| node.is_folder()).unwrap_or(false);

        let mut moved = tree.clone();
        let result = moved.move_node(n, t, usize::MAX);

        if would_cycle {
            prop_assert_eq!(result, Err(FavoritesError::CycleDetected(n, t)));
            prop_assert_eq!(&moved, &tree);
        } else if !target_is_folder {
            prop_assert_eq!(result, Err(FavoritesError::InvalidParent(t)));
            prop_assert_eq!(&moved, &tree);
        } else {
            prop_assert_eq!(result, Ok(()));
            prop_assert_eq!(moved.parent_of(n), Some(t));
            prop_assert_eq!(moved.len(), tree.len());
            let last = moved.find(t).and_then(|parent| parent.children.last()).map(|c| c.id);
            prop_assert_eq!(last, Some(n));
        }
    }
}
