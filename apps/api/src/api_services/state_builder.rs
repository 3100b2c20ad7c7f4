use std::sync::Arc;

use staffhub_application::{
    ApplicationState, AttachmentService, BlobStorage, DocumentStore, MutationPipeline,
    NotificationService, NotificationTransport, PaginationService, SyncService,
};
use staffhub_core::AppError;
use staffhub_infrastructure::{
    EmailNotificationTransport, LocalBlobStorage, StoreNotificationTransport,
    WebhookNotificationTransport,
};

use crate::api_config::ApiConfig;
use crate::state::AppState;

use super::email::build_email_service;

pub fn build_app_state(
    store: Arc<dyn DocumentStore>,
    config: &ApiConfig,
) -> Result<AppState, AppError> {
    let blobs: Arc<dyn BlobStorage> = Arc::new(LocalBlobStorage::new(
        config.blob_root.clone(),
        config.public_files_url.clone(),
    ));

    let mut transports: Vec<Arc<dyn NotificationTransport>> =
        vec![Arc::new(StoreNotificationTransport::new(store.clone()))];
    if config.email_notifications {
        transports.push(Arc::new(EmailNotificationTransport::new(
            store.clone(),
            build_email_service(config)?,
        )));
    }
    if let Some(webhook) = &config.webhook {
        transports.push(Arc::new(WebhookNotificationTransport::new(
            reqwest::Client::new(),
            webhook.endpoint.clone(),
            webhook.max_attempts,
            webhook.retry_backoff_ms,
        )));
    }

    assemble_app_state(
        store,
        blobs,
        transports,
        config.page_size,
        config.frontend_url.clone(),
    )
}

pub fn assemble_app_state(
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStorage>,
    transports: Vec<Arc<dyn NotificationTransport>>,
    page_size: usize,
    frontend_url: String,
) -> Result<AppState, AppError> {
    Ok(AppState {
        sync_service: SyncService::new(store.clone(), ApplicationState::new()),
        mutation_pipeline: MutationPipeline::new(store.clone()),
        pagination_service: PaginationService::new(store.clone(), page_size)?,
        attachment_service: AttachmentService::new(blobs),
        notification_service: NotificationService::new(transports),
        store,
        frontend_url,
    })
}
