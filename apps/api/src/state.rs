use std::sync::Arc;

use staffhub_application::{
    AttachmentService, DocumentStore, MutationPipeline, NotificationService, PaginationService,
    SyncService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub sync_service: SyncService,
    pub mutation_pipeline: MutationPipeline,
    pub pagination_service: PaginationService,
    pub attachment_service: AttachmentService,
    pub notification_service: NotificationService,
    pub frontend_url: String,
}
