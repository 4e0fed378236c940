//! # EcoMarket Central API
//!
//! Central ingestion server for the branch network.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Central API Server                               │
//! │                                                                         │
//! │  Branches ───► HTTP (8000) ──────┐                                      │
//! │  Branches ───► AMQP exchanges ───┤──► CentralIngestor ───► Redis        │
//! │                                  │          │                           │
//! │                                  │          ▼                           │
//! │                                  │   history broadcast ───► Branches    │
//! │                                  │                                      │
//! │  User events ─► fanout queues ───┴──► notifications / statistics        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod broadcast;
mod config;
mod error;
mod ingest;
mod inventory;
mod routes;
mod users;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use ecomarket_store::{RedisStore, SharedStore};
use ecomarket_sync::{spawn_supervised, BrokerConfig, BrokerListener, ListenerBinding};

use crate::broadcast::HttpBroadcaster;
use crate::config::CentralConfig;
use crate::ingest::{CentralIngestor, SaleMessageHandler};
use crate::routes::AppState;
use crate::users::{UserEventProcessor, UserRole};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .init();

    info!("Starting EcoMarket Central API...");

    // Load configuration
    let config = CentralConfig::load()?;
    info!(
        port = config.http_port,
        branches = config.branch_urls.len(),
        instance = %config.instance_id,
        "Configuration loaded"
    );

    // Connect to the shared state store and seed the catalog
    let store: SharedStore = Arc::new(RedisStore::connect(&config.redis_url).await?);
    inventory::seed_if_empty(&store, config.test_product_id).await?;

    // Ingestion pipeline with detached branch broadcast
    let broadcaster = HttpBroadcaster::new(config.branch_urls.clone());
    let ingestor = Arc::new(CentralIngestor::new(
        Arc::clone(&store),
        Arc::new(broadcaster),
        config.test_product_id,
        Duration::from_secs(config.dedup_ttl_secs),
    ));

    // Broker listeners, each supervised so a fault restarts the consumer
    let broker = BrokerConfig::new(config.amqp_url.clone());
    let sale_handler = SaleMessageHandler::new(Arc::clone(&ingestor));

    spawn_listener(
        "direct-sales-listener",
        broker.clone(),
        ListenerBinding::DirectSales,
        sale_handler.clone(),
    );
    spawn_listener(
        "fanout-sales-listener",
        broker.clone(),
        ListenerBinding::FanoutSales {
            instance: config.instance_id.clone(),
        },
        sale_handler,
    );
    spawn_listener(
        "user-notifications-listener",
        broker.clone(),
        ListenerBinding::UserEvents {
            role: UserRole::Notifications.label().to_string(),
        },
        UserEventProcessor::new(
            Arc::clone(&store),
            UserRole::Notifications,
            Duration::from_secs(config.dedup_ttl_secs),
        ),
    );
    spawn_listener(
        "user-statistics-listener",
        broker,
        ListenerBinding::UserEvents {
            role: UserRole::Statistics.label().to_string(),
        },
        UserEventProcessor::new(
            Arc::clone(&store),
            UserRole::Statistics,
            Duration::from_secs(config.dedup_ttl_secs),
        ),
    );

    // HTTP server
    let state = Arc::new(AppState {
        ingestor,
        store,
        config: config.clone(),
    });
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

/// Spawns one supervised broker listener.
fn spawn_listener<H>(
    name: &'static str,
    config: BrokerConfig,
    binding: ListenerBinding,
    handler: H,
) where
    H: ecomarket_sync::MessageHandler + Clone + 'static,
{
    spawn_supervised(name, move || {
        let listener = BrokerListener::new(config.clone(), binding.clone(), handler.clone());
        listener.run()
    });
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
