use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use staffhub_core::{AppError, AppResult};
use staffhub_domain::{
    ActionType, DocumentId, Entity, LeaveRequestFields, NotificationKind, NotificationRecord,
};
use tokio::sync::Mutex;

use crate::delivery_ports::NotificationTransport;
use crate::test_support::{actor, user};

use super::{Notification, NotificationService};

#[derive(Default)]
struct RecordingTransport {
    delivered: Mutex<Vec<NotificationRecord>>,
}

#[async_trait]
impl NotificationTransport for RecordingTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn deliver(&self, record: &NotificationRecord) -> AppResult<()> {
        self.delivered.lock().await.push(record.clone());
        Ok(())
    }
}

struct FailingTransport;

#[async_trait]
impl NotificationTransport for FailingTransport {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn deliver(&self, _record: &NotificationRecord) -> AppResult<()> {
        Err(AppError::Notification("transport offline".to_owned()))
    }
}

fn service_over(transports: Vec<Arc<dyn NotificationTransport>>) -> NotificationService {
    NotificationService::new(transports)
}

fn leave_request() -> Entity<LeaveRequestFields> {
    let now = Utc::now();
    let fields = LeaveRequestFields {
        leave_type: "Annual".to_owned(),
        start: now,
        end: now + chrono::Duration::days(2),
        hours: 16.0,
        reason: Some("Family visit".to_owned()),
        manager: user("manager"),
        user: user("staff"),
    };
    Entity::draft(fields)
        .and_then(|draft| {
            draft.stamp_created(
                DocumentId::new("leave-1").unwrap_or_else(|_| unreachable!()),
                now,
                user("staff"),
            )
        })
        .unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn recipients_exclude_the_actor() {
    let transport = Arc::new(RecordingTransport::default());
    let service = service_over(vec![transport.clone() as Arc<dyn NotificationTransport>]);
    let notification =
        Notification::about(NotificationKind::Created, &leave_request(), &actor("staff"))
            .unwrap_or_else(|_| unreachable!());

    let report = service.dispatch(&notification).await;

    assert_eq!(report.recipients, 1);
    assert_eq!(report.delivered, 1);
    let delivered = transport.delivered.lock().await;
    assert_eq!(delivered[0].recipient, user("manager"));
    assert_eq!(delivered[0].sender, user("staff"));
}

#[tokio::test]
async fn explicit_users_are_merged_without_duplicates() {
    let transport = Arc::new(RecordingTransport::default());
    let service = service_over(vec![transport.clone() as Arc<dyn NotificationTransport>]);
    let notification =
        Notification::about(NotificationKind::Commented, &leave_request(), &actor("hr"))
            .unwrap_or_else(|_| unreachable!())
            .with_body("Approved in principle")
            .with_notify_users([user("manager"), user("payroll"), user("hr")]);

    let report = service.dispatch(&notification).await;

    assert_eq!(report.recipients, 3);
    let delivered = transport.delivered.lock().await;
    let mut recipients = delivered
        .iter()
        .map(|record| record.recipient.as_str().to_owned())
        .collect::<Vec<_>>();
    recipients.sort();
    assert_eq!(recipients, ["manager", "payroll", "staff"]);
    assert!(
        delivered
            .iter()
            .all(|record| record.body.as_deref() == Some("Approved in principle"))
    );
}

#[tokio::test]
async fn failures_are_counted_not_returned() {
    let recording = Arc::new(RecordingTransport::default());
    let service = service_over(vec![
        Arc::new(FailingTransport) as Arc<dyn NotificationTransport>,
        recording.clone() as Arc<dyn NotificationTransport>,
    ]);
    let notification =
        Notification::about(NotificationKind::StatusChanged, &leave_request(), &actor("manager"))
            .unwrap_or_else(|_| unreachable!())
            .with_status(ActionType::Approved);

    let report = service.dispatch(&notification).await;

    assert_eq!(report.recipients, 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);
    let delivered = recording.delivered.lock().await;
    assert_eq!(delivered[0].status, Some(ActionType::Approved));
}

#[tokio::test]
async fn records_carry_the_entity_update_time() {
    let transport = Arc::new(RecordingTransport::default());
    let service = service_over(vec![transport.clone() as Arc<dyn NotificationTransport>]);
    let request = leave_request();
    let updated_at = request
        .metadata()
        .map(|metadata| metadata.updated_at())
        .unwrap_or_else(|| unreachable!());
    let deleted_at = updated_at + chrono::Duration::minutes(5);

    let created = Notification::about(NotificationKind::Created, &request, &actor("staff"))
        .unwrap_or_else(|_| unreachable!());
    let deleted = Notification::about(NotificationKind::Deleted, &request, &actor("staff"))
        .unwrap_or_else(|_| unreachable!())
        .with_occurred_at(deleted_at);
    service.dispatch(&created).await;
    service.dispatch(&deleted).await;

    let delivered = transport.delivered.lock().await;
    assert_eq!(delivered[0].created_at, updated_at);
    assert_eq!(delivered[1].created_at, deleted_at);
}

#[tokio::test]
async fn self_only_audience_sends_nothing() {
    let transport = Arc::new(RecordingTransport::default());
    let service = service_over(vec![transport.clone() as Arc<dyn NotificationTransport>]);
    let mut request = leave_request();
    let mut fields = request.fields().clone();
    fields.manager = user("staff");
    request
        .replace_fields(fields)
        .unwrap_or_else(|_| unreachable!());

    let notification = Notification::about(NotificationKind::Updated, &request, &actor("staff"))
        .unwrap_or_else(|_| unreachable!());
    let report = service.dispatch(&notification).await;

    assert_eq!(report.recipients, 0);
    assert!(transport.delivered.lock().await.is_empty());
}

#[test]
fn unsaved_entities_cannot_be_announced() {
    let draft = Entity::draft(leave_request().fields().clone()).unwrap_or_else(|_| unreachable!());
    let result = Notification::about(NotificationKind::Created, &draft, &actor("staff"));
    assert!(matches!(result, Err(AppError::Internal(_))));
}

#[test]
fn title_names_actor_verb_and_subject() {
    let notification =
        Notification::about(NotificationKind::Commented, &leave_request(), &actor("hr"))
            .unwrap_or_else(|_| unreachable!());
    assert!(notification.title().starts_with("User hr commented on"));
}
