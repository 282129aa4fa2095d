//! Ghost webhook fan-out service — binary entrypoint.
//!
//! Boots the Axum HTTP server: settings from env, Prometheus recorder,
//! JSONL audit store, file-backed channel configuration, graceful shutdown
//! on SIGINT/SIGTERM.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ghost_notify::api::{create_router, AppState};
use ghost_notify::audit::JsonlAuditStore;
use ghost_notify::config::{FileConfigSource, Settings};
use ghost_notify::metrics::Metrics;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ghost_notify=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();

    init_tracing();

    let settings = Settings::from_env();
    let metrics = Metrics::init();

    let store = Arc::new(JsonlAuditStore::open(&settings.audit_log_dir).await?);
    let configs = Arc::new(FileConfigSource::new(&settings.channels_config_path));
    let state = AppState::new(configs, store);

    let router = create_router(state).merge(metrics.router());

    let addr = format!("0.0.0.0:{}", settings.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    tracing::info!(%addr, "webhook handler running");
    tracing::info!(
        webhook_url = %format!("http://localhost:{}/webhook/ghost", settings.port),
        "waiting for Ghost publish events"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    tracing::info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let ctrl_c = tokio::signal::ctrl_c();
    let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        _ = term.recv() => tracing::info!("received SIGTERM, shutting down"),
    }
}
