use std::convert::Infallible;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Extension, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::future::ready;
use futures_util::{Stream, StreamExt, stream};
use serde::Serialize;
use staffhub_application::{
    Notification, SubscribeOptions, Subscription, UpdateInput, Upload,
};
use staffhub_core::{Actor, AppError, AppResult, UserId};
use staffhub_domain::{
    Attachment, Comment, CommentId, CommentInput, CounterScope, DocumentId, Entity, EntityFields,
    NotificationKind, TimeWindow,
};
use tracing::warn;

use crate::dto::{
    ActionRequest, CommentRequest, CreateRequest, DeleteRequest, LikeResponse, ListQuery,
    MutationResponse, PageQuery, PageResponse, StatusEvent, UpdateRequest, UploadQuery,
};
use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_WINDOW_FIELD: &str = "metadata.createdAt";
const DEFAULT_UPLOAD_FOLDER: &str = "attachments";
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Routes for one business kind, nested under `/api/{collection}`.
pub fn entity_routes<F: EntityFields>() -> Router<AppState> {
    Router::new()
        .route("/", get(list_handler::<F>).post(create_handler::<F>))
        .route("/stream", get(stream_handler::<F>))
        .route("/pages/{page}", get(page_handler::<F>))
        .route("/locate/{id}", get(locate_handler::<F>))
        .route(
            "/{id}",
            get(get_handler::<F>)
                .put(update_handler::<F>)
                .delete(delete_handler::<F>),
        )
        .route("/{id}/stream", get(document_stream_handler::<F>))
        .route("/{id}/actions", post(action_handler::<F>))
        .route("/{id}/comments", post(comment_handler::<F>))
        .route(
            "/{id}/comments/{comment_id}/likes",
            post(like_handler::<F>),
        )
        .route(
            "/{id}/uploads",
            post(upload_handler::<F>).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
}

pub async fn list_handler<F: EntityFields>(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Entity<F>>>> {
    let options = subscribe_options::<F>(&query)?;
    let items = state.sync_service.fetch::<F>(options.query()).await?;

    Ok(Json(items))
}

pub async fn create_handler<F: EntityFields>(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateRequest<F>>,
) -> ApiResult<(StatusCode, Json<MutationResponse<Entity<F>>>)> {
    let entity = state.mutation_pipeline.create(&actor, request.fields).await?;
    notify(
        &state,
        Notification::about(NotificationKind::Created, &entity, &actor)
            .map(|notification| notification.with_notify_users(request.notify_users)),
    );

    Ok((
        StatusCode::CREATED,
        Json(MutationResponse::succeeded(
            format!("{} created", F::COLLECTION.label()),
            entity,
        )),
    ))
}

pub async fn stream_handler<F: EntityFields>(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let options = subscribe_options::<F>(&query)?;
    let subscription = state.sync_service.subscribe(options).await?;

    Ok(Sse::new(snapshot_events(subscription)).keep_alive(KeepAlive::default()))
}

pub async fn document_stream_handler<F: EntityFields>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let subscription = state
        .sync_service
        .subscribe_document::<F>(DocumentId::new(id)?)
        .await?;

    Ok(Sse::new(snapshot_events(subscription)).keep_alive(KeepAlive::default()))
}

pub async fn get_handler<F: EntityFields>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Entity<F>>> {
    Ok(Json(load::<F>(&state, &id).await?))
}

pub async fn update_handler<F: EntityFields>(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(request): Json<UpdateRequest<F>>,
) -> ApiResult<Json<MutationResponse<Entity<F>>>> {
    let current = load::<F>(&state, &id).await?;
    let replaces_attachments = request.attachments.is_some();
    let updated = state
        .mutation_pipeline
        .update(
            &actor,
            &current,
            UpdateInput {
                fields: request.fields,
                attachments: request.attachments,
            },
        )
        .await?;

    if replaces_attachments {
        state
            .attachment_service
            .reconcile(current.attachments(), updated.attachments())
            .await;
    }
    notify(
        &state,
        Notification::about(NotificationKind::Updated, &updated, &actor)
            .map(|notification| notification.with_notify_users(request.notify_users)),
    );

    Ok(Json(MutationResponse::succeeded(
        format!("{} updated", F::COLLECTION.label()),
        updated,
    )))
}

pub async fn delete_handler<F: EntityFields>(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<MutationResponse<()>>> {
    let request = DeleteRequest::from_body(&body)?;
    let current = load::<F>(&state, &id).await?;
    let deleted_at = state.mutation_pipeline.delete(&actor, &current).await?;

    let stored_files: Vec<Attachment> = current
        .attachments()
        .iter()
        .chain(current.comments().iter().flat_map(Comment::attachments))
        .cloned()
        .collect();
    state.attachment_service.reconcile(&stored_files, &[]).await;
    notify(
        &state,
        Notification::about(NotificationKind::Deleted, &current, &actor).map(|notification| {
            notification
                .with_occurred_at(deleted_at)
                .with_notify_users(request.notify_users)
        }),
    );

    Ok(Json(MutationResponse::message_only(format!(
        "{} deleted",
        F::COLLECTION.label()
    ))))
}

pub async fn action_handler<F: EntityFields>(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(request): Json<ActionRequest>,
) -> ApiResult<Json<MutationResponse<Entity<F>>>> {
    let current = load::<F>(&state, &id).await?;
    let updated = state
        .mutation_pipeline
        .transition(&actor, &current, request.action)
        .await?;
    notify(
        &state,
        Notification::about(NotificationKind::StatusChanged, &updated, &actor)
            .map(|notification| {
                notification
                    .with_status(request.action)
                    .with_notify_users(request.notify_users)
            }),
    );

    Ok(Json(MutationResponse::succeeded(
        format!(
            "{} marked {}",
            F::COLLECTION.label(),
            request.action.as_str().to_lowercase()
        ),
        updated,
    )))
}

pub async fn comment_handler<F: EntityFields>(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(request): Json<CommentRequest>,
) -> ApiResult<(StatusCode, Json<MutationResponse<Comment>>)> {
    let current = load::<F>(&state, &id).await?;
    let input = CommentInput {
        user: actor.user_id().clone(),
        body: request.body,
        attachments: request.attachments,
        notify_users: request.notify_users,
    };
    let (updated, comment) = state
        .mutation_pipeline
        .append_comment(&actor, &current, input)
        .await?;
    notify(
        &state,
        Notification::about(NotificationKind::Commented, &updated, &actor).map(|notification| {
            notification
                .with_body(comment.body())
                .with_notify_users(comment.notify_users().to_vec())
        }),
    );

    Ok((
        StatusCode::CREATED,
        Json(MutationResponse::succeeded("Comment added", comment)),
    ))
}

pub async fn like_handler<F: EntityFields>(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((id, comment_id)): Path<(String, String)>,
) -> ApiResult<Json<MutationResponse<LikeResponse>>> {
    let current = load::<F>(&state, &id).await?;
    let comment_id = CommentId::new(comment_id)?;
    let liked = state
        .mutation_pipeline
        .toggle_comment_like(&actor, &current, &comment_id)
        .await?;

    let message = if liked { "Comment liked" } else { "Like removed" };
    Ok(Json(MutationResponse::succeeded(
        message,
        LikeResponse { liked },
    )))
}

pub async fn upload_handler<F: EntityFields>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<MutationResponse<Vec<Attachment>>>)> {
    let entity = load::<F>(&state, &id).await?;
    let entity_id = entity.require_id()?.clone();

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| AppError::Validation(format!("invalid multipart body: {error}")))?
    {
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await.map_err(|error| {
            AppError::Validation(format!("failed to read upload '{file_name}': {error}"))
        })?;
        files.push(Upload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    if files.is_empty() {
        return Err(AppError::Validation("no files were uploaded".to_owned()).into());
    }

    let folder = query.folder.as_deref().unwrap_or(DEFAULT_UPLOAD_FOLDER);
    let attachments = state
        .attachment_service
        .upload(F::COLLECTION, &entity_id, folder, files)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MutationResponse::succeeded(
            format!("{} file(s) uploaded", attachments.len()),
            attachments,
        )),
    ))
}

pub async fn page_handler<F: EntityFields>(
    State(state): State<AppState>,
    Path(page_number): Path<usize>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<PageResponse<F>>> {
    let scope = counter_scope(query.owner.as_deref())?;
    let page = state
        .pagination_service
        .get_page(F::COLLECTION, scope, page_number, query.page_size)
        .await?;
    let items = state.pagination_service.hydrate::<F>(&page).await?;

    Ok(Json(PageResponse { page, items }))
}

pub async fn locate_handler<F: EntityFields>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<PageResponse<F>>> {
    let scope = counter_scope(query.owner.as_deref())?;
    let id = DocumentId::new(id)?;
    let page = state
        .pagination_service
        .locate(F::COLLECTION, scope, &id, query.page_size)
        .await?;
    let items = state.pagination_service.hydrate::<F>(&page).await?;

    Ok(Json(PageResponse { page, items }))
}

async fn load<F: EntityFields>(state: &AppState, id: &str) -> AppResult<Entity<F>> {
    let id = DocumentId::new(id)?;
    state
        .sync_service
        .fetch_one::<F>(&id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "{} '{id}' does not exist",
                F::COLLECTION.label()
            ))
        })
}

fn subscribe_options<F: EntityFields>(query: &ListQuery) -> AppResult<SubscribeOptions<F>> {
    let mut options = SubscribeOptions::<F>::new();
    if let Some(owner) = query.owner.as_deref() {
        options = options.owned_by(&UserId::new(owner)?)?;
    }

    match (query.from, query.until) {
        (Some(from), Some(until)) => {
            let field = query.field.as_deref().unwrap_or(DEFAULT_WINDOW_FIELD);
            options = options.window(TimeWindow::new(field, from, until)?);
        }
        (None, None) => {}
        _ => {
            return Err(AppError::Validation(
                "a time window needs both 'from' and 'until'".to_owned(),
            ));
        }
    }

    if let Some(limit) = query.limit {
        options = options.limit(limit);
    }

    Ok(options)
}

fn counter_scope(owner: Option<&str>) -> AppResult<CounterScope> {
    Ok(match owner {
        Some(owner) => CounterScope::Owner(UserId::new(owner)?),
        None => CounterScope::Collection,
    })
}

fn notify(state: &AppState, notification: AppResult<Notification>) {
    match notification {
        Ok(notification) => state.notification_service.dispatch_detached(notification),
        Err(error) => warn!(error = %error, "notification skipped"),
    }
}

fn snapshot_events<F: EntityFields>(
    subscription: Subscription<F>,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    let statuses = subscription
        .watcher()
        .status_stream()
        .map(|status| sse_event("status", &StatusEvent { status }));
    let snapshots = subscription
        .into_stream()
        .map(|snapshot| sse_event("snapshot", &snapshot));

    stream::select(snapshots, statuses)
        .filter_map(ready)
        .map(Ok)
}

fn sse_event<T: Serialize>(name: &'static str, payload: &T) -> Option<Event> {
    match Event::default().event(name).json_data(payload) {
        Ok(event) => Some(event),
        Err(error) => {
            warn!(error = %error, event = name, "failed to encode stream event");
            None
        }
    }
}

#[cfg(test)]
mod tests;
