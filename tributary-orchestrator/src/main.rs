use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tributary_orchestrator::config::Config;
use tributary_orchestrator::plan::StandardPlanGenerator;
use tributary_orchestrator::repository::{MemoryStore, PgPipelineQueue, PgStore};
use tributary_orchestrator::scheduler::TokioCron;
use tributary_orchestrator::service::BlueprintService;
use tributary_orchestrator::{api, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tributary_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    config.validate().context("Invalid configuration")?;

    tracing::info!("Starting Tributary Orchestrator...");

    let generator = Arc::new(StandardPlanGenerator::builtin());
    let engine = Box::new(TokioCron::new());

    let service = if config.in_memory {
        tracing::warn!("Running with the in-memory store, nothing will be persisted");
        let store = Arc::new(MemoryStore::new());
        BlueprintService::new(store.clone(), generator, store, engine)
    } else {
        tracing::info!("Connecting to database...");

        let pool = db::create_pool(&config.database_url, config.max_connections)
            .await
            .context("Failed to create database pool")?;

        tracing::info!("Database connection pool created");

        db::run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;

        BlueprintService::new(
            Arc::new(PgStore::new(pool.clone())),
            generator,
            Arc::new(PgPipelineQueue::new(pool)),
            engine,
        )
    };
    let service = Arc::new(service);

    // Schedule the blueprints already stored
    service
        .reload()
        .await
        .context("Failed to schedule stored blueprints")?;

    // Build router with all API endpoints
    let app = api::create_router(service.clone());

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to start server")?;

    service.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
