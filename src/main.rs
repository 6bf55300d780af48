use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;

use gradebook::logging::init_tracing;
use gradebook::router::init_router;
use gradebook::state::AppState;
use gradebook_db::{init_db_pool, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing().context("Failed to initialize logging")?;

    let db = init_db_pool()
        .await
        .context("Failed to connect to database")?;
    run_migrations(&db)
        .await
        .context("Failed to run database migrations")?;

    let state = AppState::new(db);
    let app = init_router(state);

    let addr = std::env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(addr = %addr, "Server running");
    info!("Swagger UI available at /swagger-ui, Scalar at /scalar");
    axum::serve(listener, app).await?;

    Ok(())
}
