use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use referral_ledger_api::app::{build_router, AppState};
use referral_ledger_api::config::Config;
use referral_ledger_api::jobs::{JobScheduler, PoolMetricsJob, ReleaseCommissionsJob};
use referral_ledger_api::middleware::{init_metrics, logging::init_logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load().context("loading configuration")?;

    init_logging(&config.logging).context("initializing logging")?;
    init_metrics().context("installing Prometheus recorder")?;

    info!("Starting Referral Ledger API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&config.database.pool_config())
        .await
        .context("connecting to database")?;

    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await
        .context("running migrations")?;
    info!("Migrations completed");

    let addr = config.socket_addr()?;
    let release_interval = Duration::from_secs(config.referral.release_job_interval_secs);
    let state = AppState::new(config, pool.clone()).context("building JWT verifier")?;

    let mut scheduler = JobScheduler::new();
    scheduler.register(ReleaseCommissionsJob::new(
        state.ledger.clone(),
        release_interval,
    ));
    scheduler.register(PoolMetricsJob::new(pool));
    scheduler.start();

    let app = build_router(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(30)).await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
