use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use staffhub_application::{ChannelStatus, MutationOutcome};
use staffhub_core::{AppError, AppResult, UserId};
use staffhub_domain::{ActionType, Attachment, Entity, Page};

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Filters of a one-shot list or a stream.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Restricts to entities owned by this user.
    pub owner: Option<String>,
    /// Window start, inclusive.
    pub from: Option<DateTime<Utc>>,
    /// Window end, exclusive.
    pub until: Option<DateTime<Utc>>,
    /// Timestamp field the window applies to.
    pub field: Option<String>,
    pub limit: Option<usize>,
}

/// Result of a mutation plus the affected data.
#[derive(Debug, Serialize)]
pub struct MutationResponse<T> {
    #[serde(flatten)]
    pub outcome: MutationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> MutationResponse<T> {
    pub fn succeeded(message: impl Into<String>, data: T) -> Self {
        Self {
            outcome: MutationOutcome::succeeded(message),
            data: Some(data),
        }
    }
}

impl MutationResponse<()> {
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            outcome: MutationOutcome::succeeded(message),
            data: None,
        }
    }
}

/// New entity fields plus users to notify beyond its subscribers.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest<F> {
    #[serde(flatten)]
    pub fields: F,
    #[serde(default)]
    pub notify_users: Vec<UserId>,
}

/// Replacement fields for an update. `attachments` replaces the list when present.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest<F> {
    #[serde(flatten)]
    pub fields: F,
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default)]
    pub notify_users: Vec<UserId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub action: ActionType,
    #[serde(default)]
    pub notify_users: Vec<UserId>,
}

/// Optional body of a delete.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    #[serde(default)]
    pub notify_users: Vec<UserId>,
}

impl DeleteRequest {
    /// Parses a JSON body; an empty body means no extra recipients.
    pub fn from_body(body: &[u8]) -> AppResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        serde_json::from_slice(body)
            .map_err(|error| AppError::Validation(format!("invalid delete body: {error}")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub notify_users: Vec<UserId>,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub liked: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub owner: Option<String>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    /// Folder under the entity, `attachments` by default.
    pub folder: Option<String>,
}

/// One page of entities, newest first.
#[derive(Debug, Serialize)]
pub struct PageResponse<F> {
    pub page: Page,
    pub items: Vec<Entity<F>>,
}

/// Event sent on a snapshot stream when channel health changes.
#[derive(Debug, Serialize)]
pub struct StatusEvent {
    pub status: ChannelStatus,
}
