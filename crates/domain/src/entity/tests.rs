use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use staffhub_core::{AppError, UserId};

use super::{Entity, Metadata};
use crate::{
    ActionType, DocumentId, EntityFields, LeaveRequestFields, ResourceFields, StoredDocument,
};

fn user(value: &str) -> UserId {
    UserId::new(value).unwrap_or_else(|_| unreachable!())
}

fn resource() -> ResourceFields {
    ResourceFields {
        name: "Leave policy".to_owned(),
        folder: "HR".to_owned(),
        link: "https://intranet/leave-policy.pdf".to_owned(),
    }
}

#[test]
fn draft_has_no_id_or_actions() {
    let entity = Entity::draft(resource()).unwrap_or_else(|_| unreachable!());
    assert!(entity.id().is_none());
    assert!(entity.actions().is_empty());
    assert!(matches!(entity.require_id(), Err(AppError::Internal(_))));
}

#[test]
fn stamp_created_records_creation_action() {
    let at = Utc::now();
    let entity = Entity::draft(resource())
        .and_then(|entity| {
            entity.stamp_created(DocumentId::new("r-1")?, at, user("u-1"))
        })
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(entity.status(), Some(ActionType::Create));
    assert_eq!(entity.metadata().map(Metadata::created_at), Some(at));
}

#[test]
fn workflow_kinds_start_in_their_creation_status() {
    assert_eq!(
        LeaveRequestFields::creation_action(),
        ActionType::Submitted
    );
}

#[test]
fn storage_record_omits_id_and_round_trips() {
    let at = Utc
        .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
        .single()
        .unwrap_or_else(|| unreachable!());
    let entity = Entity::draft(resource())
        .and_then(|entity| entity.stamp_created(DocumentId::new("r-1")?, at, user("u-1")))
        .unwrap_or_else(|_| unreachable!());

    let record = entity.to_storage_record().unwrap_or_else(|_| unreachable!());
    assert!(record.get("id").is_none());
    assert_eq!(record["folder"], json!("HR"));
    assert_eq!(record["metadata"]["createdBy"], json!("u-1"));

    let document = StoredDocument::new(DocumentId::new("r-1").unwrap_or_else(|_| unreachable!()), record)
        .unwrap_or_else(|_| unreachable!());
    let restored = Entity::<ResourceFields>::from_storage(document).unwrap_or_else(|_| unreachable!());
    assert_eq!(restored, entity);
}

#[test]
fn restamp_never_moves_updated_at_backwards() {
    let at = Utc::now();
    let mut entity = Entity::draft(resource())
        .and_then(|entity| entity.stamp_created(DocumentId::new("r-1")?, at, user("u-1")))
        .unwrap_or_else(|_| unreachable!());

    let result = entity.restamp(at - Duration::seconds(5), user("u-2"));
    assert!(result.is_ok());
    let metadata = entity.metadata().cloned().unwrap_or_else(|| unreachable!());
    assert_eq!(metadata.updated_at(), at);
    assert_eq!(metadata.updated_by(), &user("u-2"));
}

#[test]
fn metadata_with_inverted_stamps_is_rejected() {
    let document = StoredDocument::new(
        DocumentId::new("r-1").unwrap_or_else(|_| unreachable!()),
        json!({
            "metadata": {
                "createdAt": "2024-02-01T00:00:00Z",
                "createdBy": "u-1",
                "updatedAt": "2024-01-01T00:00:00Z",
                "updatedBy": "u-1"
            },
            "actions": [{"actionType": "CREATE", "actionedAt": "2024-02-01T00:00:00Z", "actionedBy": "u-1"}],
            "name": "Leave policy",
            "folder": "HR",
            "link": "https://intranet/leave-policy.pdf"
        }),
    )
    .unwrap_or_else(|_| unreachable!());

    assert!(matches!(
        Entity::<ResourceFields>::from_storage(document),
        Err(AppError::Persistence(_))
    ));
}

#[test]
fn empty_action_log_is_rejected() {
    let document = StoredDocument::new(
        DocumentId::new("r-1").unwrap_or_else(|_| unreachable!()),
        json!({
            "metadata": {
                "createdAt": "2024-01-01T00:00:00Z",
                "createdBy": "u-1",
                "updatedAt": "2024-01-01T00:00:00Z",
                "updatedBy": "u-1"
            },
            "actions": [],
            "name": "Leave policy",
            "folder": "HR",
            "link": "https://intranet/leave-policy.pdf"
        }),
    )
    .unwrap_or_else(|_| unreachable!());

    assert!(Entity::<ResourceFields>::from_storage(document).is_err());
}
