//! Element store: the live element list plus a linear undo history.
//!
//! History is a vector of full snapshots with a cursor. Local edits
//! (commit, remove) push a snapshot and truncate any redo tail. Remote
//! merges and reloads mutate the live list only, so undo and redo walk
//! this client's own edit timeline and never replay another user's work.
//!
//! Invariant: the history always holds at least one snapshot and the
//! cursor always points inside it.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use crate::element::DrawElement;

/// In-memory store of committed elements, in insertion order.
#[derive(Debug, Clone)]
pub struct ElementStore {
    live: Vec<DrawElement>,
    history: Vec<Vec<DrawElement>>,
    cursor: usize,
}

impl ElementStore {
    /// Create an empty store whose history is a single empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self { live: Vec::new(), history: vec![Vec::new()], cursor: 0 }
    }

    /// The live elements, oldest first.
    #[must_use]
    pub fn elements(&self) -> &[DrawElement] {
        &self.live
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&DrawElement> {
        self.live.iter().find(|el| el.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.live.iter().any(|el| el.id == id)
    }

    /// Number of live elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns `true` if no elements are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Append a locally committed element and snapshot the new state.
    pub fn commit(&mut self, element: DrawElement) {
        self.live.push(element);
        self.push_snapshot();
    }

    /// Remove an element by id and snapshot the new state. Returns the
    /// removed element; an unknown id changes nothing.
    pub fn remove(&mut self, id: &str) -> Option<DrawElement> {
        let index = self.live.iter().position(|el| el.id == id)?;
        let removed = self.live.remove(index);
        self.push_snapshot();
        Some(removed)
    }

    /// Step back one snapshot, replacing the live list wholesale.
    /// Returns `false` when already at the oldest state.
    pub fn undo(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.live = self.history[self.cursor].clone();
        true
    }

    /// Step forward one snapshot, replacing the live list wholesale.
    /// Returns `false` when already at the newest state.
    pub fn redo(&mut self) -> bool {
        if self.cursor + 1 >= self.history.len() {
            return false;
        }
        self.cursor += 1;
        self.live = self.history[self.cursor].clone();
        true
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.history.len()
    }

    /// Install the shared state fetched on connect: the loaded elements
    /// become both the live list and the single history snapshot, so undo
    /// stops at the world as it was joined.
    pub fn load_initial(&mut self, elements: Vec<DrawElement>) {
        self.live.clone_from(&elements);
        self.history = vec![elements];
        self.cursor = 0;
    }

    /// Merge an element another client committed. Idempotent on id; the
    /// history is left untouched either way.
    pub fn merge_remote_insert(&mut self, element: DrawElement) -> bool {
        if self.contains(&element.id) {
            return false;
        }
        self.live.push(element);
        true
    }

    /// Replace the live list wholesale after a refetch. The history is
    /// left untouched.
    pub fn replace_live(&mut self, elements: Vec<DrawElement>) {
        self.live = elements;
    }

    fn push_snapshot(&mut self) {
        self.history.truncate(self.cursor + 1);
        self.history.push(self.live.clone());
        self.cursor = self.history.len() - 1;
    }
}

impl Default for ElementStore {
    fn default() -> Self {
        Self::new()
    }
}
