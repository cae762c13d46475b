//! # Taskboard Worker
//!
//! Marks past-due tasks `Overdue` on a fixed interval and invalidates the
//! cached task lists of the projects it touched.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskboard-worker
//! ```

use std::sync::Arc;
use taskboard_shared::cache::RedisCache;
use taskboard_shared::config::Config;
use taskboard_shared::db::{migrations::run_migrations, pool::create_pool};
use taskboard_shared::service::Services;
use taskboard_shared::store::PgStore;
use taskboard_shared::telemetry::init_tracing;
use taskboard_worker::scheduler::SweepScheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing("taskboard_worker=debug,taskboard_shared=info", config.log_format);

    tracing::info!(
        "Taskboard Worker v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(config.database.clone()).await?;
    run_migrations(&pool).await?;
    let store = Arc::new(PgStore::new(pool));
    let cache = Arc::new(RedisCache::new(config.redis.clone()).await?);

    let services = Services::new(store, cache, &config);
    let scheduler = SweepScheduler::new(services.tasks, config.sweep.interval);

    let shutdown = scheduler.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
        }
        tracing::info!("Shutdown signal received, stopping scheduler...");
        shutdown.cancel();
    });

    scheduler.run().await;

    Ok(())
}
