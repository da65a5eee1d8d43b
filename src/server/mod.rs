//! HTTP surface: `POST /convert` and a liveness probe.

pub mod error;
pub mod handlers;

use anyhow::{Context, Result};
use axum::http::Method;
use axum::routing::{get, post};
use axum::{Router, middleware};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultOnFailure, TraceLayer};
use tracing::{Level, error, info};

use crate::core::config::ServerConfig;
use crate::core::currency::RateTableProvider;

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn RateTableProvider>,
}

impl AppState {
    pub fn new(provider: Arc<dyn RateTableProvider>) -> Self {
        AppState { provider }
    }
}

pub fn build_router(state: AppState) -> Router {
    // Any origin may call the proxy.
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/convert", post(handlers::convert_currency))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(middleware::from_fn(handlers::log_request))
        // Failures are already logged by the error response itself.
        .layer(
            TraceLayer::new_for_http().on_failure(DefaultOnFailure::new().level(Level::DEBUG)),
        )
        .layer(cors)
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn serve(config: &ServerConfig, provider: Arc<dyn RateTableProvider>) -> Result<()> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    info!("Server is running at http://localhost:{}", config.port);

    serve_with_shutdown(listener, AppState::new(provider), shutdown_signal()).await
}

pub async fn serve_with_shutdown<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server terminated unexpectedly")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
