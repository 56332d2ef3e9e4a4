#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use rangeid::{Issuer, RangeAllocator};
use server::config::{CliArgs, ServerConfig, StoreKind};
use server::service::{AppState, router};
use server::store::BackingStore;
use server::telemetry::init_telemetry;
use tokio::net::TcpListener;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry(config.log_format)?;

    let store = BackingStore::from_config(&config);
    let store_kind = store.kind();
    let issuer = Issuer::new(
        RangeAllocator::new(store, config.allocator.clone()),
        config.encoder.clone(),
    );
    let app = router(AppState::new(issuer));

    let listener = TcpListener::bind(&config.server_addr).await?;
    log_startup_info(&config, store_kind);

    let res = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    match &res {
        Ok(()) => tracing::info!("Service shut down successfully"),
        Err(e) => tracing::error!("Server error: {e}"),
    }
    providers.shutdown();
    Ok(res?)
}

fn log_startup_info(config: &ServerConfig, store: StoreKind) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting tracking number service on {} with full config: {:#?}",
            config.server_addr,
            config
        );
    } else {
        tracing::info!(
            "Starting tracking number service on {} ({:?} store, batch size {})",
            config.server_addr,
            store,
            config.allocator.batch_size
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");
}
