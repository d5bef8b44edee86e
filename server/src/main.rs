//! Server entrypoint: canvas sync over websocket, element snapshots over
//! REST, Postgres persistence behind a background flush task.

mod db;
mod routes;
mod services;
mod state;

use tracing::info;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let port = services::persistence::env_parse("PORT", 3000u16);

    let pool = db::init_pool(&database_url).await.expect("database init failed");
    let state = state::AppState::new(pool);

    services::persistence::spawn_flush_task(state.clone());

    let app = routes::app(state);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await.expect("failed to bind");
    info!(%addr, "freedraw server listening");
    axum::serve(listener, app).await.expect("server crashed");
}
