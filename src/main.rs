//! podcast-performance binary entry point

use std::sync::Arc;

use podcast_performance::{AppState, config, data::Database, federation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging and metrics
/// 3. Connect the database
/// 4. Start the delivery worker
/// 5. Initialize AppState and build the Axum router
/// 6. Serve until Ctrl-C, then close the database
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging
    init_tracing(&config.logging);
    podcast_performance::metrics::init_metrics();

    tracing::info!(
        domain = %config.server.domain,
        protocol = %config.server.protocol,
        actor = %config.actor.handle,
        "Starting podcast-performance..."
    );

    // 3. Connect the database
    let db = Arc::new(Database::connect(&config.database.path).await?);

    // 4. Delivery queue; jobs go to the log until a substrate sink is attached
    let (queue, receiver) =
        federation::InProcessQueue::new(config.federation.delivery_queue_capacity);

    // 5. Application state and router
    let state = AppState::new(config.clone(), db.clone(), Arc::new(queue)).await?;
    let worker = tokio::spawn(federation::run_delivery_worker(
        receiver,
        state.followers.clone(),
        Arc::new(federation::LogSink),
    ));
    let app = podcast_performance::build_router(state);

    // 6. Serve
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Public URL: {}", config.server.base_url());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router owned the last queue sender; the worker drains and exits.
    if let Err(error) = worker.await {
        tracing::error!(%error, "Delivery worker terminated abnormally");
    }
    db.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// `RUST_LOG` overrides `logging.level`; `logging.format` is "json" or "pretty".
fn init_tracing(logging: &config::LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("podcast_performance={},tower_http=debug", logging.level).into()
    });

    if logging.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
