use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{Duration, TimeZone, Utc};
use serde_json::{Value, json};
use staffhub_application::{BlobStorage, DocumentStore, NotificationTransport};
use staffhub_core::{Actor, AppError, Feedback, UserId};
use staffhub_domain::{
    ActionType, CollectionId, CollectionQuery, Entity, LeaveRequestFields, PromotionFields,
};
use staffhub_infrastructure::{InMemoryDocumentStore, LocalBlobStorage, StoreNotificationTransport};

use crate::api_services::assemble_app_state;
use crate::dto::{ActionRequest, CommentRequest, CreateRequest, ListQuery, PageQuery};
use crate::error::ApiError;
use crate::state::AppState;

use super::{
    action_handler, comment_handler, create_handler, delete_handler, get_handler, like_handler,
    list_handler, page_handler,
};

fn test_state() -> (AppState, Arc<InMemoryDocumentStore>) {
    let store = Arc::new(InMemoryDocumentStore::new());
    let shared: Arc<dyn DocumentStore> = store.clone();
    let blobs: Arc<dyn BlobStorage> = Arc::new(LocalBlobStorage::new(
        std::env::temp_dir().join("staffhub-api-tests"),
        "http://localhost:3001/files",
    ));
    let transports: Vec<Arc<dyn NotificationTransport>> =
        vec![Arc::new(StoreNotificationTransport::new(shared.clone()))];
    let state = assemble_app_state(
        shared,
        blobs,
        transports,
        2,
        "http://localhost:3000".to_owned(),
    )
    .unwrap_or_else(|_| unreachable!());

    (state, store)
}

fn actor(user: &str) -> Actor {
    Actor::new(
        UserId::new(user).unwrap_or_else(|_| unreachable!()),
        format!("User {user}"),
        None,
    )
}

fn promotion(title: &str, user: &str) -> PromotionFields {
    serde_json::from_value(json!({
        "title": title,
        "body": "Two for one on safety boots",
        "user": user,
    }))
    .unwrap_or_else(|_| unreachable!())
}

fn leave_request(start_offset_days: i64, length_days: i64) -> LeaveRequestFields {
    let start = Utc
        .with_ymd_and_hms(2026, 11, 2, 8, 0, 0)
        .single()
        .unwrap_or_else(|| unreachable!())
        + Duration::days(start_offset_days);
    serde_json::from_value(json!({
        "leaveType": "Annual",
        "start": start,
        "end": start + Duration::days(length_days),
        "hours": 7.5,
        "manager": "manager",
        "user": "staff",
    }))
    .unwrap_or_else(|_| unreachable!())
}

fn plain<F>(fields: F) -> CreateRequest<F> {
    CreateRequest {
        fields,
        notify_users: Vec::new(),
    }
}

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap_or_else(|_| unreachable!())
}

async fn stored_recipients(store: &InMemoryDocumentStore, expected: usize) -> Vec<String> {
    let query = CollectionQuery::all(CollectionId::Notifications);
    tokio::time::timeout(StdDuration::from_secs(5), async {
        loop {
            let records = store.query(&query).await.unwrap_or_else(|_| unreachable!());
            if records.len() >= expected {
                return records
                    .iter()
                    .filter_map(|record| record.data()["recipient"].as_str().map(str::to_owned))
                    .collect::<Vec<_>>();
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| unreachable!())
}

async fn create_promotion(state: &AppState, title: &str, user: &str) -> Entity<PromotionFields> {
    let (_, Json(response)) = create_handler::<PromotionFields>(
        State(state.clone()),
        Extension(actor(user)),
        Json(plain(promotion(title, user))),
    )
    .await
    .unwrap_or_else(|_| unreachable!());

    response.data.unwrap_or_else(|| unreachable!())
}

fn entity_id<F>(entity: &Entity<F>) -> String
where
    F: staffhub_domain::EntityFields,
{
    entity
        .id()
        .map(|id| id.as_str().to_owned())
        .unwrap_or_else(|| unreachable!())
}

#[tokio::test]
async fn create_returns_created_entity_and_snackbar_outcome() {
    let (state, _) = test_state();

    let (status, Json(response)) = create_handler::<PromotionFields>(
        State(state.clone()),
        Extension(actor("u-1")),
        Json(plain(promotion("Boot sale", "u-1"))),
    )
    .await
    .unwrap_or_else(|_| unreachable!());

    assert_eq!(status, StatusCode::CREATED);
    assert!(response.outcome.success);
    assert_eq!(response.outcome.feedback, Feedback::Snackbar);

    let created = response.data.unwrap_or_else(|| unreachable!());
    let Json(loaded) = get_handler::<PromotionFields>(State(state), Path(entity_id(&created)))
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(loaded.fields().title, "Boot sale");
    assert_eq!(loaded.actions().len(), 1);
}

#[tokio::test]
async fn invalid_fields_are_rejected_before_any_write() {
    let (state, store) = test_state();

    let result = create_handler::<LeaveRequestFields>(
        State(state),
        Extension(actor("staff")),
        Json(plain(leave_request(0, -1))),
    )
    .await;

    let error = result.err().unwrap_or_else(|| unreachable!());
    assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.document_count(CollectionId::LeaveRequests).await, 0);
    assert_eq!(store.document_count(CollectionId::Counters).await, 0);
}

#[tokio::test]
async fn leave_request_moves_through_workflow_and_refuses_delete() {
    let (state, _) = test_state();
    let (_, Json(created)) = create_handler::<LeaveRequestFields>(
        State(state.clone()),
        Extension(actor("staff")),
        Json(plain(leave_request(0, 2))),
    )
    .await
    .unwrap_or_else(|_| unreachable!());
    let id = entity_id(&created.data.unwrap_or_else(|| unreachable!()));

    let paid_too_early = action_handler::<LeaveRequestFields>(
        State(state.clone()),
        Extension(actor("manager")),
        Path(id.clone()),
        Json(ActionRequest {
            action: ActionType::Paid,
            notify_users: Vec::new(),
        }),
    )
    .await;
    assert!(matches!(
        paid_too_early,
        Err(ApiError(AppError::Conflict(_)))
    ));

    let Json(approved) = action_handler::<LeaveRequestFields>(
        State(state.clone()),
        Extension(actor("manager")),
        Path(id.clone()),
        Json(ActionRequest {
            action: ActionType::Approved,
            notify_users: Vec::new(),
        }),
    )
    .await
    .unwrap_or_else(|_| unreachable!());
    let approved = approved.data.unwrap_or_else(|| unreachable!());
    assert_eq!(approved.status(), Some(ActionType::Approved));

    let deleted = delete_handler::<LeaveRequestFields>(
        State(state),
        Extension(actor("staff")),
        Path(id),
        Bytes::new(),
    )
    .await;
    let error = deleted.err().unwrap_or_else(|| unreachable!());
    assert_eq!(error.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn comment_likes_toggle() {
    let (state, _) = test_state();
    let promotion = create_promotion(&state, "Boot sale", "u-1").await;
    let id = entity_id(&promotion);

    let (status, Json(commented)) = comment_handler::<PromotionFields>(
        State(state.clone()),
        Extension(actor("u-2")),
        Path(id.clone()),
        Json(CommentRequest {
            body: "Does this include steel caps?".to_owned(),
            attachments: Vec::new(),
            notify_users: Vec::new(),
        }),
    )
    .await
    .unwrap_or_else(|_| unreachable!());
    assert_eq!(status, StatusCode::CREATED);
    let comment_id = commented
        .data
        .map(|comment| comment.comment_id().as_str().to_owned())
        .unwrap_or_else(|| unreachable!());

    let mut liked = Vec::new();
    for _ in 0..2 {
        let Json(response) = like_handler::<PromotionFields>(
            State(state.clone()),
            Extension(actor("u-3")),
            Path((id.clone(), comment_id.clone())),
        )
        .await
        .unwrap_or_else(|_| unreachable!());
        liked.push(response.data.map(|like| like.liked));
    }

    assert_eq!(liked, vec![Some(true), Some(false)]);
}

#[tokio::test]
async fn blank_comment_is_inline_validation() {
    let (state, _) = test_state();
    let promotion = create_promotion(&state, "Boot sale", "u-1").await;

    let result = comment_handler::<PromotionFields>(
        State(state),
        Extension(actor("u-2")),
        Path(entity_id(&promotion)),
        Json(CommentRequest {
            body: "   ".to_owned(),
            attachments: Vec::new(),
            notify_users: Vec::new(),
        }),
    )
    .await;

    let error = result.err().unwrap_or_else(|| unreachable!());
    assert_eq!(error.0.feedback(), Feedback::Inline);
}

#[tokio::test]
async fn pages_serve_newest_first_and_redirect_out_of_range() {
    let (state, _) = test_state();
    for title in ["First", "Second", "Third"] {
        create_promotion(&state, title, "u-1").await;
    }

    let Json(first_page) = page_handler::<PromotionFields>(
        State(state.clone()),
        Path(1),
        Query(PageQuery::default()),
    )
    .await
    .unwrap_or_else(|_| unreachable!());
    let titles: Vec<&str> = first_page
        .items
        .iter()
        .map(|item| item.fields().title.as_str())
        .collect();
    assert_eq!(titles, vec!["Third", "Second"]);
    assert_eq!(first_page.page.total_pages(), 2);

    let Json(out_of_range) = page_handler::<PromotionFields>(
        State(state),
        Path(9),
        Query(PageQuery::default()),
    )
    .await
    .unwrap_or_else(|_| unreachable!());
    assert!(out_of_range.page.redirected());
    assert_eq!(out_of_range.page.page_number(), 1);
}

#[tokio::test]
async fn list_filters_by_owner() {
    let (state, _) = test_state();
    create_promotion(&state, "Mine", "u-1").await;
    create_promotion(&state, "Theirs", "u-2").await;

    let Json(items) = list_handler::<PromotionFields>(
        State(state),
        Query(ListQuery {
            owner: Some("u-1".to_owned()),
            ..ListQuery::default()
        }),
    )
    .await
    .unwrap_or_else(|_| unreachable!());

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].fields().title, "Mine");
}

#[tokio::test]
async fn half_open_window_is_rejected() {
    let (state, _) = test_state();

    let result = list_handler::<PromotionFields>(
        State(state),
        Query(ListQuery {
            from: Some(Utc::now()),
            ..ListQuery::default()
        }),
    )
    .await;

    assert!(matches!(result, Err(ApiError(AppError::Validation(_)))));
}

#[tokio::test]
async fn missing_entity_is_not_found() {
    let (state, _) = test_state();

    let result = get_handler::<PromotionFields>(State(state), Path("missing".to_owned())).await;

    let error = result.err().unwrap_or_else(|| unreachable!());
    assert_eq!(error.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn error_response_carries_outcome_body() {
    let response =
        ApiError(AppError::Persistence("store unavailable".to_owned())).into_response();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_else(|_| unreachable!());
    let body: Value = serde_json::from_slice(&bytes).unwrap_or_else(|_| unreachable!());
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["feedback"], json!("dialog"));
}

#[tokio::test]
async fn create_notifies_listed_users_but_not_the_actor() {
    let (state, store) = test_state();

    create_handler::<PromotionFields>(
        State(state),
        Extension(actor("u-1")),
        Json(CreateRequest {
            fields: promotion("Boot sale", "u-1"),
            notify_users: vec![user("u-9"), user("u-1")],
        }),
    )
    .await
    .unwrap_or_else(|_| unreachable!());

    let recipients = stored_recipients(&store, 1).await;
    assert_eq!(recipients, vec!["u-9".to_owned()]);
}

#[tokio::test]
async fn delete_body_names_extra_recipients() {
    let (state, store) = test_state();
    let promotion = create_promotion(&state, "Boot sale", "u-1").await;

    delete_handler::<PromotionFields>(
        State(state),
        Extension(actor("u-1")),
        Path(entity_id(&promotion)),
        Bytes::from_static(br#"{"notifyUsers": ["u-4"]}"#),
    )
    .await
    .unwrap_or_else(|_| unreachable!());

    let recipients = stored_recipients(&store, 1).await;
    assert_eq!(recipients, vec!["u-4".to_owned()]);
}

#[tokio::test]
async fn malformed_delete_body_is_rejected() {
    let (state, _) = test_state();
    let promotion = create_promotion(&state, "Boot sale", "u-1").await;

    let result = delete_handler::<PromotionFields>(
        State(state),
        Extension(actor("u-1")),
        Path(entity_id(&promotion)),
        Bytes::from_static(b"{not json"),
    )
    .await;

    assert!(matches!(result, Err(ApiError(AppError::Validation(_)))));
}
