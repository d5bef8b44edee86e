//! Connection pool setup and schema migrations.
//!
//! The pool is shared by the websocket routes, the REST snapshot route,
//! and the background element flush task. Migrations run before the
//! listener binds so a half-migrated schema never serves traffic.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::services::persistence::env_parse;

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Connect to Postgres and bring the `elements` schema up to date.
///
/// # Errors
///
/// Returns an error if the connection or a migration fails.
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let max_connections = env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS);
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("src/db/migrations").run(&pool).await?;

    Ok(pool)
}
