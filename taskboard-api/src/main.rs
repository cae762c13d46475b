//! # Taskboard API Server
//!
//! HTTP API for projects and tasks with JWT authentication, role-based
//! access, optimistic updates, and a Redis read-through cache.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskboard-api
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use taskboard_api::app::{build_router, AppState};
use taskboard_shared::cache::RedisCache;
use taskboard_shared::config::Config;
use taskboard_shared::db::{migrations::run_migrations, pool::create_pool};
use taskboard_shared::seed::seed_demo_users;
use taskboard_shared::store::PgStore;
use taskboard_shared::telemetry::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing("taskboard_api=debug,tower_http=debug", config.log_format);

    tracing::info!(
        "Taskboard API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(config.database.clone()).await?;
    run_migrations(&pool).await?;
    let store = Arc::new(PgStore::new(pool));

    let cache = Arc::new(RedisCache::new(config.redis.clone()).await?);

    let state = AppState::new(store, cache, config.clone());

    if config.seed_demo_users {
        let created = seed_demo_users(&state.accounts).await?;
        tracing::info!(created, "demo users seeded");
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
