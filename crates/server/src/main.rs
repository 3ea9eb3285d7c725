//! Reportline server entry point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use reportline_api::{router as api_router, AppState};
use reportline_common::Config;
use reportline_core::AppContext;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reportline=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting reportline server...");

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Connect to database
    let db = reportline_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    reportline_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);
    let ctx = AppContext::open(&config, db).await?;

    // Follow the configured collection and log its size as it changes
    let coordinator = ctx.sync_coordinator();
    coordinator.start()?;
    let mut sync_state = coordinator.watch();
    tokio::spawn(async move {
        while sync_state.changed().await.is_ok() {
            let state = sync_state.borrow_and_update().clone();
            match state.error {
                Some(e) => tracing::warn!(error = %e, "Collection sync error"),
                None => info!(reports = state.reports.len(), "Collection updated"),
            }
        }
    });

    let identity = ctx.identity.current();
    info!(
        display_name = %identity.display_name(),
        valid = identity.is_valid(),
        "Loaded identity preferences"
    );

    let state = AppState::new(ctx.local_reports.clone());

    let app = Router::new()
        .merge(api_router(&config.collection.path))
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    coordinator.shutdown();
    info!("Server shutdown complete");
    Ok(())
}
