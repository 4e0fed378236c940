//! # EcoMarket Branch API
//!
//! Sales server for one physical branch.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Branch API Server                                │
//! │                                                                         │
//! │  POS ───► POST /sales ───► local stock + ledger                         │
//! │                                │                                        │
//! │                                ▼ (detached)                             │
//! │                     NotificationDispatcher ───► Central                 │
//! │                                                                         │
//! │  retry queue ───► QueueRelayWorker ───► Central (always running)        │
//! │  Central ───► POST /sync-sale-history ───► SyncReceiver ───► ledger     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use ecomarket_store::{RedisStore, SharedStore};
use ecomarket_sync::{
    AmqpPublisher, BranchLedger, BrokerConfig, CircuitBreaker, HttpNotifier,
    NotificationDispatcher, QueueRelayWorker, SyncReceiver,
};

use crate::config::BranchConfig;
use crate::state::BranchState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .init();

    info!("Starting EcoMarket Branch API...");

    // Load configuration
    let config = BranchConfig::load()?;
    info!(
        branch_id = %config.branch_id,
        port = config.http_port,
        central = %config.central_url,
        mode = %config.initial_mode,
        "Configuration loaded"
    );

    // Durable retry queue lives in the shared store
    let store: SharedStore = Arc::new(RedisStore::connect(&config.redis_url).await?);

    // Delivery plumbing
    let breaker = Arc::new(CircuitBreaker::new(
        config.breaker_threshold,
        Duration::from_secs(config.breaker_recovery_secs),
    ));
    let dispatcher = Arc::new(NotificationDispatcher::new(
        config.branch_id.clone(),
        config.initial_mode,
        HttpNotifier::new(&config.central_url),
        breaker,
        Arc::clone(&store),
        config.queue_key.clone(),
        AmqpPublisher::new(BrokerConfig::new(config.amqp_url.clone())),
    ));

    // Ledger shared by local sales and the sync receiver
    let ledger = Arc::new(RwLock::new(BranchLedger::default()));
    let receiver = SyncReceiver::new(
        config.branch_id.clone(),
        config.test_product_id,
        Arc::clone(&ledger),
    );

    // Relay worker runs from startup regardless of the active mode, so
    // sales queued under mode 4 drain even after the operator moves on.
    let relay = QueueRelayWorker::new(
        Arc::clone(&store),
        config.queue_key.clone(),
        HttpNotifier::new(&config.central_url),
    );
    tokio::spawn(relay.run());

    // HTTP server
    let state = Arc::new(BranchState::new(
        config.clone(),
        ledger,
        dispatcher,
        receiver,
        store,
    ));
    let app = routes::router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    info!(%addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
