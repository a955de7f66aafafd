//! p3bird server binary.
//!
//! Starts an axum HTTP server with structured logging, database pool
//! creation, table setup, and graceful shutdown on SIGTERM/SIGINT.

use p3bird_server::{app, config, models, AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let (config_path, config_source) =
        config::resolve_config_path(std::env::args().nth(1), |key| std::env::var(key).ok());

    let config = config::load_config(Some(config_path.as_str()))
        .expect("failed to load configuration, the server cannot start without valid config");

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = %config_path,
        "resolved startup configuration path"
    );

    // Fail on a bad model declaration before touching the database.
    models::ensure_models().expect("invalid model declaration");

    let db = p3bird_db::create_pool(&config.database)
        .expect("failed to create database pool, check [database] in config");

    models::create_tables(&db)
        .await
        .expect("failed to create model tables");

    let app = app(AppState { db });
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting p3bird server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address, is another process using this port?");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("p3bird server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
