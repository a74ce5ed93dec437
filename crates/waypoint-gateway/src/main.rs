//! The gateway binary — HTTP entry point and process wiring for the
//! orchestration core: load config, open the store, build
//! the model adapter and transport sink, wire the orchestrator and the
//! notification engine's background task, then serve.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use waypoint_core::config::WaypointConfig;
use waypoint_core::model::ModelAdapter;
use waypoint_core::transport::NoopTransportSink;
use waypoint_dispatch::Orchestrator;
use waypoint_notify::NotificationEngine;
use waypoint_resultcache::ResultSetCache;
use waypoint_store::SqliteStore;

mod app;
mod auth;
mod http;
mod model_client;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "waypoint_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("WAYPOINT_CONFIG").ok();
    let config = match WaypointConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("fatal configuration error: {e}");
            std::process::exit(1);
        }
    };

    let store = match SqliteStore::open(&config.store.dsn) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("store unreachable at startup ({}): {e}", config.store.dsn);
            std::process::exit(2);
        }
    };

    let model: Arc<dyn ModelAdapter> = match &config.model.adapter_url {
        Some(url) => Arc::new(model_client::HttpModelAdapter::new(url.clone())),
        None => {
            warn!("no model.adapter_url configured — intent parsing, goal decomposition and summarization will fail until one is set");
            Arc::new(model_client::NullModelAdapter)
        }
    };

    let cache = ResultSetCache::new(config.result_set.capacity, config.result_set.ttl_s);
    let orchestrator = Orchestrator::new(Arc::clone(&store), Arc::clone(&model), cache, &config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let notify_engine = NotificationEngine::new(
        Arc::clone(&store),
        Arc::new(NoopTransportSink),
        config.notification.rate_per_s,
    );
    let notify_handle = tokio::spawn(notify_engine.run(shutdown_rx));

    let shutdown_token = CancellationToken::new();
    let state = Arc::new(app::AppState {
        orchestrator,
        transport_api_token: config.transport_api_token.clone(),
        request_timeout: Duration::from_millis(config.gateway.request_timeout_ms),
        shutdown_token: shutdown_token.clone(),
    });
    let router = app::build_router(state);

    let addr: SocketAddr = match format!("{}:{}", config.gateway.bind, config.gateway.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("fatal configuration error: invalid bind address: {e}");
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("fatal: could not bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    info!("waypoint gateway listening on {addr}");

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("gateway server error: {e}");
    }

    shutdown_token.cancel();
    let _ = shutdown_tx.send(true);
    let _ = notify_handle.await;
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
