//! Staffhub API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use staffhub_core::AppError;
use tracing::info;

use crate::api_config::{ApiConfig, StoreBackendConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    if config.migrate_only {
        if let StoreBackendConfig::Postgres { database_url } = &config.store_backend {
            api_services::connect_and_migrate(database_url).await?;
        }
        info!("database migrations applied successfully");
        return Ok(());
    }

    let store = api_services::build_document_store(&config).await?;
    let app_state = api_services::build_app_state(store, &config)?;
    let reference_slices = api_services::open_reference_slices(&app_state.sync_service).await?;

    let app = api_router::build_router(app_state, &config.frontend_url, &config.blob_root)?;

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "staffhub-api listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")));

    let disposed = reference_slices.dispose_all();
    info!(channels = disposed, "staffhub-api stopped");
    served
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
