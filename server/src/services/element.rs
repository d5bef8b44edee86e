//! Element service: insert and delete against the shared canvas.
//!
//! DESIGN
//! ======
//! Elements are immutable once drawn. Insert is idempotent on element id
//! so a client retrying a dropped write can never duplicate a stroke;
//! the retry is acknowledged without touching state. Mutations update
//! memory immediately and mark the element dirty for the background
//! flush; only delete touches Postgres inline.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use canvas::element::{DrawElement, ElementRecord, RecordError};

use crate::state::{AppState, StoredElement};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ElementError {
    #[error("element not found: {0}")]
    NotFound(String),
    #[error("element {0} belongs to another author")]
    NotOwner(String),
    #[error("join the canvas before touching elements")]
    CanvasNotLoaded,
    #[error("element payload is not a record: {0}")]
    Payload(#[from] serde_json::Error),
    #[error(transparent)]
    Malformed(#[from] RecordError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl wire::ErrorCode for ElementError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_ELEMENT_NOT_FOUND",
            Self::NotOwner(_) => "E_NOT_OWNER",
            Self::CanvasNotLoaded => "E_CANVAS_NOT_LOADED",
            Self::Payload(_) | Self::Malformed(_) => "E_MALFORMED_ELEMENT",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Result of an idempotent insert.
#[derive(Debug)]
pub enum InsertOutcome {
    /// First time this id was seen; carries the stored record.
    Inserted(ElementRecord),
    /// The id already exists; nothing changed.
    Duplicate,
}

// =============================================================================
// INSERT
// =============================================================================

/// Insert a drawn element into the live canvas.
///
/// The connection's identity overrides whatever `author_id` the payload
/// claims. Geometry is validated before anything is stored.
///
/// # Errors
///
/// Returns `Malformed` if the record's columns don't form a valid element.
pub async fn insert(
    state: &AppState,
    author_id: &str,
    mut record: ElementRecord,
) -> Result<InsertOutcome, ElementError> {
    record.author_id = author_id.to_string();
    DrawElement::try_from(record.clone())?;

    let mut canvas = state.canvas.write().await;
    if canvas.elements.contains_key(&record.id) {
        info!(id = %record.id, "duplicate element insert acknowledged");
        return Ok(InsertOutcome::Duplicate);
    }

    let created_at = now_ms();
    canvas.dirty.insert(record.id.clone());
    canvas
        .elements
        .insert(record.id.clone(), StoredElement { record: record.clone(), created_at });

    info!(id = %record.id, author_id = %record.author_id, kind = record.kind.as_str(), "element inserted");
    Ok(InsertOutcome::Inserted(record))
}

// =============================================================================
// DELETE
// =============================================================================

/// Delete an element. Only its author may remove it.
///
/// # Errors
///
/// Returns `NotFound` for unknown ids, `NotOwner` when the identity does
/// not match, and a database error if the row delete fails.
pub async fn delete(
    state: &AppState,
    author_id: &str,
    element_id: &str,
) -> Result<(), ElementError> {
    {
        let mut canvas = state.canvas.write().await;
        let Some(stored) = canvas.elements.get(element_id) else {
            return Err(ElementError::NotFound(element_id.to_string()));
        };
        if stored.record.author_id != author_id {
            return Err(ElementError::NotOwner(element_id.to_string()));
        }
        canvas.elements.remove(element_id);
        canvas.dirty.remove(element_id);
    }

    // The row may not exist yet if the element never flushed; that is fine.
    sqlx::query("DELETE FROM elements WHERE id = $1")
        .bind(element_id)
        .execute(&state.pool)
        .await?;

    info!(id = %element_id, "element deleted");
    Ok(())
}

fn now_ms() -> i64 {
    let Ok(elapsed) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(elapsed.as_millis()).unwrap_or(0)
}

#[cfg(test)]
#[path = "element_test.rs"]
mod tests;
