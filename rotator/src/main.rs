// Rotator service entry point: schedules title rotation for every enabled
// guild and serves the admin API from the same process, so settings changes
// reach the in-process job registry directly.

use std::sync::Arc;

use common::config::Settings;
use common::db::DbPool;
use common::gateway::{MembershipGateway, RestGateway};
use common::registry::GuildJobRegistry;
use common::rotation::RotationExecutor;
use common::scheduler::RotationScheduler;
use common::stores::{GuildConfigStore, LeaderboardStore, PgGuildConfigStore, PgLeaderboardStore};
use common::telemetry;
use rotator::routes;
use rotator::state::AppState;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let settings = Settings::load().map_err(|e| anyhow::anyhow!("Failed to load settings: {e}"))?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid settings: {e}"))?;

    // Initialize tracing/logging and metrics
    telemetry::init_logging(
        &settings.observability.log_level,
        settings.observability.tracing_endpoint.as_deref(),
    )?;
    telemetry::init_metrics(settings.observability.metrics_port)?;

    info!("Starting Laurel rotator");

    // Initialize database connection pool
    let db_pool = DbPool::new(&settings.database).await.map_err(|e| {
        error!(error = %e, "Failed to initialize database pool");
        anyhow::anyhow!(e)
    })?;
    info!("Database connection pool initialized");

    // Chat-platform gateway
    let gateway = Arc::new(RestGateway::new(&settings.gateway).map_err(|e| {
        error!(error = %e, "Failed to initialize membership gateway");
        anyhow::anyhow!(e)
    })?);
    info!("Membership gateway initialized");

    // Stores
    let config_store = Arc::new(PgGuildConfigStore::new(db_pool.clone()));
    let leaderboard = Arc::new(PgLeaderboardStore::new(db_pool.clone()));

    // Rotation core: executor, registry, scheduler
    let executor = Arc::new(RotationExecutor::new(
        Arc::clone(&config_store) as Arc<dyn GuildConfigStore>,
        Arc::clone(&leaderboard) as Arc<dyn LeaderboardStore>,
        Arc::clone(&gateway) as Arc<dyn MembershipGateway>,
    ));
    let registry = Arc::new(GuildJobRegistry::new());
    let scheduler = Arc::new(RotationScheduler::new(
        Arc::clone(&config_store) as Arc<dyn GuildConfigStore>,
        Arc::clone(&gateway) as Arc<dyn MembershipGateway>,
        Arc::clone(&registry),
        executor,
        settings.default_timezone(),
    ));
    info!("Rotation scheduler created");

    // Install jobs for every guild with rotation enabled
    match scheduler.resync_all().await {
        Ok(installed) => info!(installed, "Rotation jobs installed"),
        Err(e) => {
            // The service still comes up; the admin surface can reschedule
            // guilds once the store recovers.
            error!(error = %e, "Startup resync failed");
        }
    }

    // Serve the admin API
    let app_state = AppState {
        db_pool,
        scheduler: Arc::clone(&scheduler),
        config_store,
        leaderboard,
    };
    let router = routes::create_router(app_state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        error!(error = %e, addr = %addr, "Failed to bind admin API listener");
        anyhow::anyhow!(e)
    })?;
    info!(addr = %addr, "Admin API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop timers; in-flight cycles run to completion on the runtime.
    registry.shutdown();
    telemetry::shutdown_tracer();
    info!("Rotator stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
