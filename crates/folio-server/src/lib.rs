//! folio-server: HTTP API server and background maintenance for folio.
//!
//! This crate ties the other folio crates together into a running server
//! application. It provides:
//!
//! - Axum-based JSON API with session authentication and login rate limiting
//! - Outbound clients for Google Books, Wikipedia and Wiktionary
//! - On-disk cover image storage with thumbnails
//! - A session sweeper and graceful shutdown via signal handling

pub mod clients;
pub mod context;
pub mod error;
pub mod images;
pub mod middleware;
pub mod router;
pub mod routes;

use std::net::SocketAddr;
use std::time::Duration;

use folio_core::config::Config;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;

/// Start the folio server.
///
/// Opens the database, constructs the [`AppContext`], spawns the session
/// sweeper and serves HTTP until a shutdown signal is received.
pub async fn start(config: Config) -> folio_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let db_path = &config.server.db_path;
    let existed = db_path.exists();
    let db = folio_db::pool::init_pool(db_path)?;
    if existed {
        tracing::info!("Database opened (existing) at {}", db_path.display());
    } else {
        tracing::info!("Database created (new) at {}", db_path.display());
    }

    let ctx = AppContext::new(db, config.clone())?;

    let cancel = CancellationToken::new();

    let sweeper_ctx = ctx.clone();
    let sweeper_cancel = cancel.clone();
    let sweeper_handle = tokio::spawn(async move {
        run_session_sweeper(sweeper_ctx, sweeper_cancel).await;
    });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| folio_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let app = router::build_router(ctx, config.server.static_dir.clone());

    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| folio_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await
        .map_err(|e| folio_core::Error::Internal(format!("Server error: {e}")))?;

    cancel.cancel();
    let _ = sweeper_handle.await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Periodically delete expired session tokens until cancelled.
pub async fn run_session_sweeper(ctx: AppContext, cancel: CancellationToken) {
    let period = Duration::from_secs(ctx.config.auth.sweep_interval_secs.max(1));
    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match sweep_sessions(&ctx) {
                    Ok(0) => {}
                    Ok(n) => tracing::info!("Removed {n} expired sessions"),
                    Err(e) => tracing::warn!("Session sweep failed: {e}"),
                }
            }
            _ = cancel.cancelled() => break,
        }
    }

    tracing::debug!("Session sweeper stopped");
}

fn sweep_sessions(ctx: &AppContext) -> folio_core::Result<usize> {
    let conn = ctx.conn()?;
    folio_db::queries::auth::delete_expired_tokens(&conn, chrono::Utc::now())
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
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
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
