use std::sync::Arc;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use staffhub_application::DocumentStore;
use staffhub_core::AppError;
use staffhub_infrastructure::{InMemoryDocumentStore, PostgresDocumentStore};
use tracing::{info, warn};

use crate::api_config::{ApiConfig, StoreBackendConfig};

pub async fn connect_and_migrate(database_url: &str) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    Ok(pool)
}

pub async fn build_document_store(config: &ApiConfig) -> Result<Arc<dyn DocumentStore>, AppError> {
    match &config.store_backend {
        StoreBackendConfig::Postgres { database_url } => {
            let pool = connect_and_migrate(database_url).await?;
            info!("using postgres document store");
            Ok(Arc::new(PostgresDocumentStore::connect(pool).await?))
        }
        StoreBackendConfig::Memory => {
            warn!("using in-memory document store; data is lost on restart");
            Ok(Arc::new(InMemoryDocumentStore::new()))
        }
    }
}
