//! Thicket Store - local HTTP facade over the client state layer
//!
//! Runs the store against the in-process loopback backing store with the
//! profile and memberships persisted under the configured data directory.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use thicket_store::api::{create_router, AppState};
use thicket_store::persist::FileKv;
use thicket_store::remote::LocalChannel;
use thicket_store::{Config, Store};

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the store (loads profile and memberships, starts warm-up)
/// 4. Create Axum router with all endpoints
/// 5. Start HTTP server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "thicket_store=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Thicket Store");

    let config = Config::from_env();
    info!(
        "Configuration loaded: data_dir={}, port={}, warmup_concurrency={}, eager_warmup={}",
        config.data_dir.display(),
        config.server_port,
        config.warmup_concurrency,
        config.eager_warmup
    );

    let kv = Arc::new(FileKv::new(config.data_dir.clone()));
    let remote = Arc::new(LocalChannel::with_capacity(config.event_capacity));
    let port = config.server_port;

    let store = Store::open(remote, kv, config)
        .await
        .context("opening store")?;
    let state = AppState::new(store);
    let store = state.store.clone();

    let app = create_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(store))
        .await
        .context("serving HTTP")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops background work.
async fn shutdown_signal(store: Arc<Store>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    store.abort_background();
    warn!("Background warm-up aborted");
}
