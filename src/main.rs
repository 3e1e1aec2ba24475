//! oic-gateway server entry point.
//!
//! Starts the transfer poller and the Axum HTTP server with REST and
//! WebSocket endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use oic_gateway::api;
use oic_gateway::app_state::AppState;
use oic_gateway::config::{GatewayConfig, PaymentLinks};
use oic_gateway::source::{PostgresTransferSource, TransferFeed, TransferPoller, TransferSource};
use oic_gateway::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = GatewayConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, "starting oic-gateway");

    // Connect lazily so the server comes up before the database does
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect_lazy(&config.database_url)?;
    let source: Arc<dyn TransferSource> =
        Arc::new(PostgresTransferSource::new(pool, &config.transfer_table)?);
    tracing::info!(table = %config.transfer_table, "transfer source configured");

    // Start the poller
    let feed = TransferFeed::new(config.feed_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller = TransferPoller::new(
        Arc::clone(&source),
        feed.clone(),
        config.poll_interval(),
        config.poll_batch_size,
    )
    .starting_at(config.poll_start_timestamp);
    let poller_task = tokio::spawn(poller.run(shutdown_rx));

    // Build application state
    let app_state = AppState {
        feed,
        source,
        payment_links: Arc::new(PaymentLinks::from(&config)),
        manual_check_limit: config.manual_check_limit,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(err) = poller_task.await {
        tracing::error!(error = %err, "poller task failed");
    }
    tracing::info!("oic-gateway stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
