use super::*;
use crate::element::{Shape, StrokeStyle};
use crate::viewport::Point;

// =============================================================
// Helpers
// =============================================================

fn element(id: &str) -> DrawElement {
    DrawElement {
        id: id.to_string(),
        shape: Shape::Line {
            start: Point::new(0.0, 0.0),
            end: Point::new(10.0, 10.0),
        },
        color: "#8B5CF6".to_string(),
        line_width: 3.0,
        stroke_style: StrokeStyle::Solid,
        opacity: 100,
        author_id: "alice".to_string(),
    }
}

fn ids(store: &ElementStore) -> Vec<&str> {
    store.elements().iter().map(|el| el.id.as_str()).collect()
}

// =============================================================
// Construction
// =============================================================

#[test]
fn new_store_is_empty_with_one_snapshot() {
    let store = ElementStore::new();
    assert!(store.is_empty());
    assert_eq!(store.len(), 0);
    assert!(!store.can_undo());
    assert!(!store.can_redo());
}

// =============================================================
// Commit and remove
// =============================================================

#[test]
fn commit_appends_in_order() {
    let mut store = ElementStore::new();
    store.commit(element("a"));
    store.commit(element("b"));
    assert_eq!(ids(&store), vec!["a", "b"]);
}

#[test]
fn remove_deletes_by_id() {
    let mut store = ElementStore::new();
    store.commit(element("a"));
    store.commit(element("b"));
    let removed = store.remove("a");
    assert_eq!(removed.map(|el| el.id), Some("a".to_string()));
    assert_eq!(ids(&store), vec!["b"]);
}

#[test]
fn remove_unknown_id_is_noop() {
    let mut store = ElementStore::new();
    store.commit(element("a"));
    assert!(store.remove("missing").is_none());
    assert_eq!(store.len(), 1);
    // No snapshot was pushed: a single undo returns to empty.
    assert!(store.undo());
    assert!(store.is_empty());
    assert!(!store.can_undo());
}

#[test]
fn get_and_contains_find_live_elements() {
    let mut store = ElementStore::new();
    store.commit(element("a"));
    assert!(store.contains("a"));
    assert!(!store.contains("b"));
    assert_eq!(store.get("a").map(|el| el.id.as_str()), Some("a"));
    assert!(store.get("b").is_none());
}

// =============================================================
// Undo / redo
// =============================================================

#[test]
fn commits_then_undos_return_to_empty() {
    let mut store = ElementStore::new();
    for id in ["a", "b", "c", "d"] {
        store.commit(element(id));
    }
    for _ in 0..4 {
        assert!(store.undo());
    }
    assert!(store.is_empty());
    assert!(!store.undo());
}

#[test]
fn undo_then_redo_restores_state() {
    let mut store = ElementStore::new();
    store.commit(element("a"));
    store.commit(element("b"));
    assert!(store.undo());
    assert_eq!(ids(&store), vec!["a"]);
    assert!(store.redo());
    assert_eq!(ids(&store), vec!["a", "b"]);
    assert!(!store.redo());
}

#[test]
fn undo_restores_a_removed_element() {
    let mut store = ElementStore::new();
    store.commit(element("a"));
    store.remove("a");
    assert!(store.is_empty());
    assert!(store.undo());
    assert_eq!(ids(&store), vec!["a"]);
}

#[test]
fn commit_discards_redo_tail() {
    let mut store = ElementStore::new();
    store.commit(element("a"));
    store.commit(element("b"));
    store.undo();
    store.commit(element("c"));
    assert_eq!(ids(&store), vec!["a", "c"]);
    assert!(!store.can_redo());
    // The undone "b" state is gone for good.
    store.undo();
    assert_eq!(ids(&store), vec!["a"]);
    store.redo();
    assert_eq!(ids(&store), vec!["a", "c"]);
}

#[test]
fn undo_at_oldest_and_redo_at_newest_are_noops() {
    let mut store = ElementStore::new();
    assert!(!store.undo());
    assert!(!store.redo());
    store.commit(element("a"));
    assert!(!store.redo());
    store.undo();
    assert!(!store.undo());
}

// =============================================================
// Remote merges and reloads
// =============================================================

#[test]
fn merge_remote_insert_is_idempotent() {
    let mut store = ElementStore::new();
    assert!(store.merge_remote_insert(element("a")));
    assert!(!store.merge_remote_insert(element("a")));
    assert_eq!(store.len(), 1);
}

#[test]
fn merge_remote_insert_does_not_snapshot() {
    let mut store = ElementStore::new();
    store.merge_remote_insert(element("a"));
    assert!(!store.can_undo());
    // A later local commit snapshots the merged state, so undo keeps it.
    store.commit(element("b"));
    store.undo();
    assert_eq!(ids(&store), vec!["a"]);
}

#[test]
fn replace_live_does_not_snapshot() {
    let mut store = ElementStore::new();
    store.commit(element("a"));
    store.replace_live(vec![element("x"), element("y")]);
    assert_eq!(ids(&store), vec!["x", "y"]);
    assert!(store.can_undo());
    // Undo still walks the local timeline recorded before the reload.
    store.undo();
    assert!(store.is_empty());
}

#[test]
fn load_initial_resets_history_to_loaded_state() {
    let mut store = ElementStore::new();
    store.commit(element("scratch"));
    store.load_initial(vec![element("a"), element("b")]);
    assert_eq!(ids(&store), vec!["a", "b"]);
    assert!(!store.can_undo());
    assert!(!store.can_redo());
    // Undo after one local commit returns to the loaded state, not empty.
    store.commit(element("c"));
    store.undo();
    assert_eq!(ids(&store), vec!["a", "b"]);
}
