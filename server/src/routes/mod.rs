//! HTTP surface: health check, element snapshot, websocket upgrade.

pub mod ws;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use canvas::element::ElementRecord;

use crate::services;
use crate::state::AppState;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    // Browser clients load from arbitrary origins; the API carries no
    // credentials, so CORS stays wide open.
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/elements", get(list_elements))
        .route("/api/ws", get(ws::handle_ws))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Read-only element snapshot in creation order. Served from memory while
/// clients hold the canvas live, straight from Postgres otherwise.
async fn list_elements(
    State(state): State<AppState>,
) -> Result<Json<Vec<ElementRecord>>, (StatusCode, String)> {
    {
        let canvas = state.canvas.read().await;
        if !canvas.clients.is_empty() {
            return Ok(Json(canvas.snapshot()));
        }
    }

    match services::canvas::fetch_all_elements(&state.pool).await {
        Ok(stored) => Ok(Json(stored.into_iter().map(|s| s.record).collect())),
        Err(e) => {
            error!(error = %e, "element listing failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "database unavailable".to_string()))
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
