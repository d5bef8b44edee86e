//! Synchronization: merging remote events and queueing local writes.
//!
//! Drawing is optimistic: local edits land in the store immediately and
//! the matching write waits in the [`Outbox`] until the host reports the
//! send outcome. Remote events flow the other way through [`merge`],
//! which never touches the undo history — undo is scoped to this
//! client's own edits.

#[cfg(test)]
#[path = "sync_test.rs"]
mod sync_test;

use std::collections::VecDeque;

use crate::consts::{MAX_WRITE_ATTEMPTS, OUTBOX_CAPACITY};
use crate::element::DrawElement;
use crate::store::ElementStore;

/// A change observed on the realtime channel.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// Another client committed an element.
    Inserted(DrawElement),
    /// Another client erased an element.
    Deleted { id: String },
    /// Presence heartbeat carrying the connected-client count.
    Presence { online: usize },
}

/// What applying a [`RemoteEvent`] did, and what the host owes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The element was new and joined the live list.
    Inserted,
    /// The element id was already present; nothing changed.
    AlreadyPresent,
    /// The host must refetch the shared element set and hand it to
    /// [`ElementStore::replace_live`].
    RefetchRequired,
    /// Only the online-user count changed.
    PresenceUpdated,
}

/// Connection and presence state surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStatus {
    pub connected: bool,
    /// Connected-client count, never shown below 1 (this client counts).
    pub online: usize,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self { connected: false, online: 1 }
    }
}

/// Apply one remote event to local state.
///
/// Inserts are idempotent by element id, so an echo of this client's own
/// write merges as [`MergeOutcome::AlreadyPresent`]. Deletes are not
/// applied directly: removal invalidates the whole view coarsely and the
/// host refetches, which also picks up anything missed while
/// disconnected.
pub fn merge(store: &mut ElementStore, status: &mut SyncStatus, event: RemoteEvent) -> MergeOutcome {
    match event {
        RemoteEvent::Inserted(element) => {
            if store.merge_remote_insert(element) {
                MergeOutcome::Inserted
            } else {
                MergeOutcome::AlreadyPresent
            }
        }
        RemoteEvent::Deleted { .. } => MergeOutcome::RefetchRequired,
        RemoteEvent::Presence { online } => {
            status.online = online.max(1);
            MergeOutcome::PresenceUpdated
        }
    }
}

/// A local write not yet acknowledged by the shared store.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingWrite {
    Insert(DrawElement),
    Delete { id: String },
}

impl PendingWrite {
    /// Element id this write concerns.
    #[must_use]
    pub fn element_id(&self) -> &str {
        match self {
            Self::Insert(element) => &element.id,
            Self::Delete { id } => id,
        }
    }
}

/// Bounded FIFO of unacknowledged writes.
///
/// The host sends [`Outbox::next_pending`] and reports the outcome with
/// [`Outbox::acknowledge`] or [`Outbox::record_failure`]. A write that
/// keeps failing is dropped after [`MAX_WRITE_ATTEMPTS`] attempts, and
/// enqueueing past [`OUTBOX_CAPACITY`] evicts the oldest entry; both
/// paths hand the dropped write back so the host can log the loss.
#[derive(Debug, Default)]
pub struct Outbox {
    queue: VecDeque<PendingWrite>,
    /// Failed attempts for the write at the head of the queue.
    head_attempts: u32,
}

impl Outbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a write. Returns the oldest write if capacity forced it out.
    pub fn enqueue(&mut self, write: PendingWrite) -> Option<PendingWrite> {
        let mut evicted = None;
        if self.queue.len() >= OUTBOX_CAPACITY {
            evicted = self.queue.pop_front();
            self.head_attempts = 0;
        }
        self.queue.push_back(write);
        evicted
    }

    /// The write the host should send next.
    #[must_use]
    pub fn next_pending(&self) -> Option<&PendingWrite> {
        self.queue.front()
    }

    /// The head write was persisted; drop it and reset the attempt count.
    pub fn acknowledge(&mut self) -> Option<PendingWrite> {
        self.head_attempts = 0;
        self.queue.pop_front()
    }

    /// The head write failed to send. It stays queued for retry until the
    /// attempt cap is reached, at which point it is dropped and returned.
    pub fn record_failure(&mut self) -> Option<PendingWrite> {
        if self.queue.is_empty() {
            return None;
        }
        self.head_attempts += 1;
        if self.head_attempts >= MAX_WRITE_ATTEMPTS {
            self.head_attempts = 0;
            return self.queue.pop_front();
        }
        None
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
