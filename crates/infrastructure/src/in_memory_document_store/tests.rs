use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::json;
use staffhub_application::{
    ApplicationState, DocumentStore, ListenTarget, MutationPipeline, SubscribeOptions,
    SyncService, WriteBatch,
};
use staffhub_core::{Actor, AppError, UserId};
use staffhub_domain::{
    CollectionId, CollectionQuery, CommentInput, DocumentId, FieldPath, FieldTransform,
    PromotionFields,
};
use tokio::time::timeout;

use super::InMemoryDocumentStore;

fn user(value: &str) -> UserId {
    UserId::new(value).unwrap_or_else(|_| unreachable!())
}

fn actor(value: &str) -> Actor {
    Actor::new(user(value), value, None)
}

fn id(value: &str) -> DocumentId {
    DocumentId::new(value).unwrap_or_else(|_| unreachable!())
}

fn promotion(title: &str) -> PromotionFields {
    PromotionFields {
        title: title.to_owned(),
        body: "Body".to_owned(),
        expiry: None,
        user: user("author"),
    }
}

#[tokio::test]
async fn server_time_is_strictly_increasing() {
    let store = InMemoryDocumentStore::new();
    let mut previous = store.server_time().await.unwrap_or_else(|_| unreachable!());
    for _ in 0..100 {
        let next = store.server_time().await.unwrap_or_else(|_| unreachable!());
        assert!(next > previous);
        previous = next;
    }
}

#[tokio::test]
async fn failed_batch_leaves_store_untouched() {
    let store = InMemoryDocumentStore::new();
    let mut batch = WriteBatch::new();
    batch
        .create(CollectionId::Vendors, id("v-1"), json!({ "name": "Acme" }))
        .merge(
            CollectionId::Vendors,
            id("missing"),
            vec![(FieldPath::field("name"), json!("Ghost"))],
        );

    let result = store.commit(batch).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(store.document_count(CollectionId::Vendors).await, 0);
}

#[tokio::test]
async fn later_ops_see_earlier_ops_in_the_same_batch() {
    let store = InMemoryDocumentStore::new();
    let mut batch = WriteBatch::new();
    batch
        .create(CollectionId::Vendors, id("v-1"), json!({ "name": "Acme" }))
        .transform(
            CollectionId::Vendors,
            id("v-1"),
            FieldPath::field("tags"),
            FieldTransform::ArrayUnion(vec![json!("office")]),
        );

    store.commit(batch).await.unwrap_or_else(|_| unreachable!());

    let stored = store
        .get(CollectionId::Vendors, &id("v-1"))
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    assert_eq!(stored.data()["tags"], json!(["office"]));
}

#[tokio::test]
async fn listen_emits_initial_and_changed_snapshots() {
    let store = InMemoryDocumentStore::new();
    let mut feed = store
        .listen(ListenTarget::Query(CollectionQuery::all(CollectionId::Vendors)))
        .await
        .unwrap_or_else(|_| unreachable!());

    let initial = feed
        .next()
        .await
        .unwrap_or_else(|| unreachable!())
        .unwrap_or_else(|_| unreachable!());
    assert!(initial.documents.is_empty());

    let mut unrelated = WriteBatch::new();
    unrelated.create(CollectionId::Customers, id("c-1"), json!({ "name": "Globex" }));
    store.commit(unrelated).await.unwrap_or_else(|_| unreachable!());
    let mut related = WriteBatch::new();
    related.create(CollectionId::Vendors, id("v-1"), json!({ "name": "Acme" }));
    store.commit(related).await.unwrap_or_else(|_| unreachable!());

    let changed = feed
        .next()
        .await
        .unwrap_or_else(|| unreachable!())
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(changed.documents.len(), 1);
    assert_eq!(changed.documents[0].id(), &id("v-1"));
}

#[tokio::test]
async fn concurrent_likes_by_two_users_both_persist() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let mutations = MutationPipeline::new(store.clone());
    let created = mutations
        .create(&actor("author"), promotion("Vote"))
        .await
        .unwrap_or_else(|_| unreachable!());
    let (_, comment) = mutations
        .append_comment(
            &actor("author"),
            &created,
            CommentInput {
                user: user("author"),
                body: "Like this".to_owned(),
                attachments: Vec::new(),
                notify_users: Vec::new(),
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    let first = mutations.clone();
    let second = mutations.clone();
    let (entity_a, entity_b) = (created.clone(), created.clone());
    let (comment_a, comment_b) = (comment.comment_id().clone(), comment.comment_id().clone());
    let (left, right) = tokio::join!(
        tokio::spawn(async move {
            first
                .toggle_comment_like(&actor("alice"), &entity_a, &comment_a)
                .await
        }),
        tokio::spawn(async move {
            second
                .toggle_comment_like(&actor("bob"), &entity_b, &comment_b)
                .await
        }),
    );
    assert!(matches!(left, Ok(Ok(true))));
    assert!(matches!(right, Ok(Ok(true))));

    let stored = store
        .get(
            CollectionId::Promotions,
            created.id().unwrap_or_else(|| unreachable!()),
        )
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    assert_eq!(stored.data()["comments"][0]["likes"], json!(["alice", "bob"]));
}

#[tokio::test]
async fn disposed_channel_observes_no_later_commit() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let sync = SyncService::new(store.clone(), ApplicationState::new());
    let mutations = MutationPipeline::new(store);

    let mut subscription = sync
        .subscribe(SubscribeOptions::<PromotionFields>::new())
        .await
        .unwrap_or_else(|_| unreachable!());
    let first = timeout(Duration::from_secs(2), subscription.next_snapshot())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(first.is_some());

    subscription.dispose();
    mutations
        .create(&actor("author"), promotion("Too late"))
        .await
        .unwrap_or_else(|_| unreachable!());

    let after = timeout(Duration::from_secs(2), subscription.next_snapshot())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(after.is_none());
    assert!(
        subscription
            .latest()
            .is_some_and(|snapshot| snapshot.items.is_empty())
    );
}
