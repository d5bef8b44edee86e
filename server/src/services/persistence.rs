//! Background flush of dirty elements to Postgres.
//!
//! DESIGN
//! ======
//! Inserts only mark elements dirty; a background task batches them into
//! Postgres on an interval so websocket handling never blocks on writes.
//!
//! ERROR HANDLING
//! ==============
//! Dirty ids are cleared only after a successful write. Elements are
//! immutable, so a retried flush can at worst hit `ON CONFLICT DO NOTHING`
//! on rows that already landed.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::services::canvas;
use crate::state::AppState;

const DEFAULT_ELEMENT_FLUSH_INTERVAL_MS: u64 = 100;

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Spawn the background flush task. Returns a handle for shutdown.
pub fn spawn_flush_task(state: AppState) -> JoinHandle<()> {
    let flush_interval_ms = env_parse("ELEMENT_FLUSH_INTERVAL_MS", DEFAULT_ELEMENT_FLUSH_INTERVAL_MS);
    info!(flush_interval_ms, "element persistence flush configured");
    tokio::spawn(async move {
        loop {
            flush_dirty(&state).await;
            tokio::time::sleep(Duration::from_millis(flush_interval_ms)).await;
        }
    })
}

async fn flush_dirty(state: &AppState) {
    // Snapshot dirty elements under the read lock, then write lock-free.
    let pending = {
        let canvas = state.canvas.read().await;
        if canvas.dirty.is_empty() {
            return;
        }
        canvas.dirty.iter().filter_map(|id| canvas.elements.get(id).cloned()).collect::<Vec<_>>()
    };
    if pending.is_empty() {
        return;
    }

    match canvas::flush_elements(&state.pool, &pending).await {
        Ok(()) => {
            let mut canvas = state.canvas.write().await;
            for element in &pending {
                canvas.dirty.remove(&element.record.id);
            }
            debug!(count = pending.len(), "flushed elements");
        }
        Err(e) => {
            // Dirty ids survive so the next tick retries.
            error!(error = %e, count = pending.len(), "element flush failed");
        }
    }
}

#[cfg(test)]
pub(crate) async fn flush_dirty_for_tests(state: &AppState) {
    flush_dirty(state).await;
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
