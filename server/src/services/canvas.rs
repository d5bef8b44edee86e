//! Canvas service: join/leave, hydration, fan-out, and element storage.
//!
//! DESIGN
//! ======
//! One shared canvas per process. Elements are hydrated from Postgres when
//! the first client joins and kept in memory while any client is connected.
//!
//! ERROR HANDLING
//! ==============
//! On last-client leave, dirty elements are flushed before eviction. If
//! that flush fails, the canvas stays in memory with its dirty ids intact
//! so the persistence task can retry instead of losing strokes.

use sqlx::PgPool;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use canvas::element::ElementRecord;
use wire::Frame;

use crate::state::{AppState, ConnectedClient, StoredElement};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl wire::ErrorCode for CanvasError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        true
    }
}

/// What a joining client gets back: every element in creation order plus
/// the connection count including itself.
#[derive(Debug, serde::Serialize)]
pub struct JoinSnapshot {
    pub elements: Vec<ElementRecord>,
    pub online: usize,
}

// =============================================================================
// JOIN / LEAVE
// =============================================================================

/// Join the canvas: hydrate from Postgres if this is the first client,
/// register the client's sender, and return the current snapshot.
///
/// # Errors
///
/// Returns a database error if hydration fails.
pub async fn join(
    state: &AppState,
    client_id: Uuid,
    user_id: &str,
    tx: mpsc::Sender<Frame>,
) -> Result<JoinSnapshot, CanvasError> {
    let cold = {
        let canvas = state.canvas.read().await;
        canvas.clients.is_empty() && canvas.dirty.is_empty()
    };

    // Fetch outside the lock; applied below only if the canvas is still
    // cold once the write lock is held.
    let hydration = if cold { Some(fetch_all_elements(&state.pool).await?) } else { None };

    let mut canvas = state.canvas.write().await;
    if let Some(stored) = hydration {
        if canvas.clients.is_empty() && canvas.dirty.is_empty() {
            canvas.elements = stored.into_iter().map(|s| (s.record.id.clone(), s)).collect();
            info!(count = canvas.elements.len(), "hydrated canvas from database");
        }
    }

    canvas.clients.insert(client_id, ConnectedClient { user_id: user_id.to_string(), tx });

    let snapshot = JoinSnapshot { elements: canvas.snapshot(), online: canvas.online() };
    info!(%client_id, %user_id, online = snapshot.online, "client joined canvas");
    Ok(snapshot)
}

/// Leave the canvas and return the remaining connection count. When the
/// last client leaves, dirty elements are flushed and the in-memory
/// canvas is evicted; a failed flush retains both.
pub async fn leave(state: &AppState, client_id: Uuid) -> usize {
    let pending = {
        let mut canvas = state.canvas.write().await;
        canvas.clients.remove(&client_id);
        let online = canvas.online();
        info!(%client_id, online, "client left canvas");

        if online > 0 {
            return online;
        }
        if canvas.dirty.is_empty() {
            let evicted = canvas.elements.len();
            canvas.elements.clear();
            info!(evicted, "evicted canvas from memory");
            return 0;
        }
        canvas.dirty.iter().filter_map(|id| canvas.elements.get(id).cloned()).collect::<Vec<_>>()
    };

    // Final flush runs outside the lock. Dirty ids are cleared only for
    // elements that actually reached Postgres.
    let flush_result = flush_elements(&state.pool, &pending).await;

    let mut canvas = state.canvas.write().await;
    match flush_result {
        Ok(()) => {
            for element in &pending {
                canvas.dirty.remove(&element.record.id);
            }
            if canvas.clients.is_empty() && canvas.dirty.is_empty() {
                let evicted = canvas.elements.len();
                canvas.elements.clear();
                info!(flushed = pending.len(), evicted, "final flush complete; evicted canvas");
            }
        }
        Err(e) => {
            error!(error = %e, count = pending.len(), "final flush failed; canvas retained for retry");
        }
    }

    canvas.online()
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Send a frame to every connected client, optionally excluding one.
pub async fn broadcast(state: &AppState, frame: &Frame, exclude: Option<Uuid>) {
    let canvas = state.canvas.read().await;
    for (client_id, client) in &canvas.clients {
        if exclude == Some(*client_id) {
            continue;
        }
        // Best-effort: if a client's channel is full, skip it.
        let _ = client.tx.try_send(frame.clone());
    }
}

// =============================================================================
// STORAGE
// =============================================================================

type ElementRow = (
    String,                    // id
    String,                    // kind
    Option<serde_json::Value>, // points
    Option<serde_json::Value>, // start_point
    Option<serde_json::Value>, // end_point
    Option<String>,            // text
    String,                    // color
    f64,                       // line_width
    String,                    // author_id
    String,                    // stroke_style
    i16,                       // opacity
    i64,                       // created_at
);

/// Load every element in creation order.
///
/// # Errors
///
/// Returns a database error if the query fails. Rows that no longer parse
/// as element records are skipped with a warning.
pub async fn fetch_all_elements(pool: &PgPool) -> Result<Vec<StoredElement>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ElementRow>(
        "SELECT id, kind, points, start_point, end_point, text, color, line_width,
                author_id, stroke_style, opacity, created_at
         FROM elements
         ORDER BY created_at ASC, id ASC",
    )
    .fetch_all(pool)
    .await?;

    let mut elements = Vec::with_capacity(rows.len());
    for row in rows {
        let id = row.0.clone();
        match row_to_stored(row) {
            Ok(stored) => elements.push(stored),
            Err(e) => warn!(id = %id, error = %e, "skipping malformed element row"),
        }
    }
    Ok(elements)
}

fn row_to_stored(row: ElementRow) -> Result<StoredElement, serde_json::Error> {
    let (
        id,
        kind,
        points,
        start_point,
        end_point,
        text,
        color,
        line_width,
        author_id,
        stroke_style,
        opacity,
        created_at,
    ) = row;
    let record = serde_json::from_value(serde_json::json!({
        "id": id,
        "kind": kind,
        "points": points,
        "start_point": start_point,
        "end_point": end_point,
        "text": text,
        "color": color,
        "line_width": line_width,
        "author_id": author_id,
        "stroke_style": stroke_style,
        "opacity": opacity,
    }))?;
    Ok(StoredElement { record, created_at })
}

/// Batch insert elements. Elements never change after insert, so rows that
/// already exist are left untouched.
///
/// # Errors
///
/// Returns a database error if any insert fails.
pub async fn flush_elements(pool: &PgPool, elements: &[StoredElement]) -> Result<(), sqlx::Error> {
    for stored in elements {
        let record = &stored.record;
        sqlx::query(
            "INSERT INTO elements (id, kind, points, start_point, end_point, text, color,
                                   line_width, author_id, stroke_style, opacity, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(&record.id)
        .bind(record.kind.as_str())
        .bind(record.points.as_ref().map(|p| serde_json::to_value(p).unwrap_or_default()))
        .bind(record.start_point.map(|p| serde_json::to_value(p).unwrap_or_default()))
        .bind(record.end_point.map(|p| serde_json::to_value(p).unwrap_or_default()))
        .bind(record.text.as_deref())
        .bind(&record.color)
        .bind(record.line_width)
        .bind(&record.author_id)
        .bind(record.stroke_style.as_str())
        .bind(i16::from(record.opacity))
        .bind(stored.created_at)
        .execute(pool)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "canvas_test.rs"]
mod tests;
