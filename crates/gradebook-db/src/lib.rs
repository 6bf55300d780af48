//! # Gradebook DB
//!
//! Database pool initialization for the Gradebook API.
//!
//! # Example
//!
//! ```ignore
//! use gradebook_db::init_db_pool;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sqlx::Error> {
//!     let pool = init_db_pool().await?;
//!     gradebook_db::run_migrations(&pool).await?;
//!     Ok(())
//! }
//! ```

use std::env;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Initializes a PostgreSQL connection pool from `DATABASE_URL`.
///
/// `DB_MAX_CONNECTIONS` caps the pool size (default: 10).
///
/// # Errors
///
/// Returns [`sqlx::Error::Configuration`] when `DATABASE_URL` is not set, or
/// the connection error when the database cannot be reached.
pub async fn init_db_pool() -> Result<PgPool, sqlx::Error> {
    let database_url = env::var("DATABASE_URL")
        .map_err(|_| sqlx::Error::Configuration("DATABASE_URL must be set".into()))?;

    let max_connections = env::var("DB_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_CONNECTIONS);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&database_url)
        .await?;

    tracing::info!(max_connections, "Database pool initialized");
    Ok(pool)
}

/// Applies the SQL migrations under `migrations/` at the workspace root.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

// Re-export PgPool for convenience
pub use sqlx::PgPool;
