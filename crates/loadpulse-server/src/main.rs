//! loadpulse server.
//!
//! - Trigger API: POST /cpu, /io, /cpui (default :9091)
//! - Metrics: GET /metrics in Prometheus text format (default :9092)
//! - Runtime flavor from config: one worker thread keeps scheduling cooperative

use std::future::IntoFuture;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use loadpulse_core::error::{LoadpulseError, Result};
use loadpulse_server::{app_state::AppState, config, router};

fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = config::load()?;

    let threads = cfg.runtime.worker_threads;
    let runtime = if threads == 1 {
        tokio::runtime::Builder::new_current_thread().enable_all().build()
    } else {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(threads)
            .enable_all()
            .build()
    }
    .map_err(|e| LoadpulseError::Internal(format!("runtime build failed: {e}")))?;

    runtime.block_on(serve(cfg))
}

async fn serve(cfg: config::LoadpulseConfig) -> Result<()> {
    let api_addr = cfg.api.addr("api")?;
    let metrics_addr = cfg.metrics.addr("metrics")?;
    let worker_threads = cfg.runtime.worker_threads;

    let state = AppState::new(&cfg);
    let api = router::build_api_router(state.clone());
    let metrics = router::build_metrics_router(state.clone());

    let api_listener = bind(api_addr).await?;
    let metrics_listener = bind(metrics_addr).await?;
    tracing::info!(%api_addr, %metrics_addr, worker_threads, "loadpulse starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_state = state.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_state.set_draining();
        let _ = shutdown_tx.send(true);
    });

    let api_server =
        axum::serve(api_listener, api).with_graceful_shutdown(wait_for(shutdown_rx.clone()));
    let metrics_server =
        axum::serve(metrics_listener, metrics).with_graceful_shutdown(wait_for(shutdown_rx));

    tokio::try_join!(into_result(api_server), into_result(metrics_server))?;
    tracing::info!("loadpulse stopped");
    Ok(())
}

async fn bind(addr: std::net::SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| LoadpulseError::Internal(format!("failed to bind {addr}: {e}")))
}

async fn into_result(server: impl IntoFuture<Output = std::io::Result<()>>) -> Result<()> {
    server
        .await
        .map_err(|e| LoadpulseError::Internal(format!("server failed: {e}")))
}

async fn wait_for(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
    tracing::info!("signal received, draining");
}
