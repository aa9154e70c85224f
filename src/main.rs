use conversion_pulse::api::state::AppState;
use conversion_pulse::config::Config;
use conversion_pulse::query::cache::QueryCache;
use conversion_pulse::query::executor::DuckDbExecutor;
use conversion_pulse::{server, storage};
use duckdb::Connection;
use parking_lot::Mutex;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conversion_pulse=info,tower_http=info".into()),
        )
        .init();

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref().map(std::path::Path::new));

    tracing::info!(
        host = %config.host,
        port = config.port,
        database = ?config.database_path,
        converted_status = config.converted_status_id,
        "Starting conversion-pulse"
    );

    let conn = match &config.database_path {
        Some(path) => Connection::open(path)?,
        None => {
            tracing::warn!("No database_path set, serving from an empty in-memory database");
            Connection::open_in_memory()?
        }
    };
    storage::migrations::run_migrations(&conn)?;

    let conn = Arc::new(Mutex::new(conn));
    let executor = DuckDbExecutor::new(conn, config.converted_status_id);
    let query_cache = QueryCache::new(config.cache_ttl_secs);

    // Sweep expired cache entries
    if config.cache_ttl_secs > 0 {
        let sweep_cache = query_cache.clone();
        let every = Duration::from_secs(config.cache_ttl_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                sweep_cache.cleanup_expired();
            }
        });
    }

    let state = Arc::new(AppState::new(
        Arc::new(executor),
        query_cache,
        config.dashboard_origin.clone(),
    ));

    let app = server::build_router(state);
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Listening");

    let shutdown = Arc::new(tokio::sync::Notify::new());
    let notify = Arc::clone(&shutdown);
    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        notify.notify_one();
    });

    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    tokio::select! {
        result = serve.into_future() => result?,
        () = async {
            shutdown.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(timeout_secs = config.shutdown_timeout_secs, "Shutdown timed out, dropping open connections");
        }
    }

    tracing::info!("Stopped");
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
