//! HTTP server wiring — builds the service context and serves the REST API.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::onboarding::{OnboardingManager, OnboardingRouteState, onboarding_routes};
use crate::store::{Database, LibSqlBackend};

/// Build the full application router around an existing database.
pub fn app(db: Arc<dyn Database>, config: &ServerConfig) -> Router {
    let manager = Arc::new(OnboardingManager::new(db, config.autosave.clone()));
    onboarding_routes(OnboardingRouteState { manager }).layer(CorsLayer::permissive())
}

/// Open the database and serve until the process receives Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_local(&config.db_path).await?);
    let router = app(db, &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Onboarding API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
