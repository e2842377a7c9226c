//! Coinshop Server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use coinshop_admission::MemoryStore;
use coinshop_server::AppState;
use coinshop_server::config::Config;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    let config = Config::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let store = MemoryStore::new();
    let state = match AppState::new(&config, Arc::new(store.clone())) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "invalid admission configuration");
            std::process::exit(2);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        quotas = config.quotas.len(),
        rate_window = config.rate_window,
        max_errors = config.max_errors,
        ban_duration = config.ban_duration,
        trust_forwarded_for = config.trust_forwarded_for,
        "Coinshop Server starting",
    );

    let app = coinshop_server::router(state);

    let addr = SocketAddr::new(config.host.parse().expect("invalid host"), config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");

    // Spawn expired-entry cleanup task
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(PURGE_INTERVAL).await;
            let removed = store.purge_expired();
            if removed > 0 {
                tracing::debug!(removed, "Purged expired admission entries");
            }
        }
    });

    tracing::info!(%addr, "Coinshop Server ready");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("server error");

    tracing::info!("Coinshop Server shut down");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install signal handler");
    tracing::info!("Shutdown signal received");
}
