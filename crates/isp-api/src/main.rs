//! # isp-system-service: Binary Entry Point
//!
//! Loads configuration, connects storage, provisions the baseline, and
//! serves the Axum router until SIGINT or SIGTERM.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use isp_api::config::{AppConfig, Cli, LogFormat};
use isp_api::middleware::metrics::install_recorder;
use isp_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli)?;

    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter()));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    let mut state = match &config.database {
        Some(db) => {
            let pool = isp_api::db::init_pool(db).await.map_err(|e| {
                tracing::error!("Database initialization failed: {e}");
                e
            })?;
            tracing::info!(host = %db.host, database = %db.database, "connected to Postgres");
            AppState::with_pool(pool)
        }
        None => {
            tracing::warn!("No database configured. Running on the in-memory backend; data is lost on exit.");
            AppState::in_memory()
        }
    };

    if config.metrics.enabled {
        let handle = install_recorder().context("installing Prometheus recorder")?;
        state = state.with_metrics(handle);
    }

    state
        .services
        .baseline
        .run(&config.baseline.initial_admin_ui_token)
        .await
        .map_err(|e| {
            tracing::error!("Baseline provisioning failed: {e}");
            e
        })?;

    let app = isp_api::with_request_timeout(
        isp_api::app(state),
        Duration::from_secs(config.request_timeout_secs),
    );

    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("ISP system service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
