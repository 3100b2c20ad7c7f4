use std::sync::Arc;

use staffhub_core::AppError;
use staffhub_domain::{CollectionId, CounterScope, DocumentId, PromotionFields};

use crate::MutationPipeline;
use crate::test_support::{FakeDocumentStore, actor, promotion, user};

use super::PaginationService;

async fn seeded(count: usize) -> (PaginationService, Vec<DocumentId>) {
    let store = Arc::new(FakeDocumentStore::default());
    let mutations = MutationPipeline::new(store.clone());
    let mut ids = Vec::with_capacity(count);
    for index in 0..count {
        let owner = if index % 2 == 0 { "u-even" } else { "u-odd" };
        let created = mutations
            .create(&actor(owner), promotion(&format!("Promotion {index}"), owner))
            .await
            .unwrap_or_else(|_| unreachable!());
        ids.push(created.id().cloned().unwrap_or_else(|| unreachable!()));
    }

    (PaginationService::with_default_page_size(store), ids)
}

#[tokio::test]
async fn pages_are_newest_first() {
    let (pages, ids) = seeded(12).await;

    let first = pages
        .get_page(CollectionId::Promotions, CounterScope::Collection, 1, None)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(first.total_items(), 12);
    assert_eq!(first.total_pages(), 3);
    assert_eq!(first.ids()[0], ids[11]);

    let last = pages
        .get_page(CollectionId::Promotions, CounterScope::Collection, 3, None)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(last.ids(), &[ids[1].clone(), ids[0].clone()]);
}

#[tokio::test]
async fn out_of_range_page_redirects_to_first() {
    let (pages, _ids) = seeded(3).await;

    let page = pages
        .get_page(CollectionId::Promotions, CounterScope::Collection, 9, Some(2))
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(page.redirected());
    assert_eq!(page.page_number(), 1);
}

#[tokio::test]
async fn owner_scope_counts_only_owned_records() {
    let (pages, ids) = seeded(5).await;

    let page = pages
        .get_page(
            CollectionId::Promotions,
            CounterScope::Owner(user("u-odd")),
            1,
            None,
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(page.total_items(), 2);
    assert_eq!(page.ids(), &[ids[3].clone(), ids[1].clone()]);
}

#[tokio::test]
async fn locate_lands_on_containing_page() {
    let (pages, ids) = seeded(12).await;

    let page = pages
        .locate(CollectionId::Promotions, CounterScope::Collection, &ids[2], None)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(page.page_number(), 2);
    assert_eq!(page.focus(), Some(&ids[2]));
    assert!(!page.redirected());
}

#[tokio::test]
async fn hydrate_loads_page_entities_in_order() {
    let (pages, ids) = seeded(4).await;
    let page = pages
        .get_page(CollectionId::Promotions, CounterScope::Collection, 1, Some(2))
        .await
        .unwrap_or_else(|_| unreachable!());

    let items = pages
        .hydrate::<PromotionFields>(&page)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id(), Some(&ids[3]));
    assert_eq!(items[0].fields().title, "Promotion 3");
}

#[tokio::test]
async fn missing_counter_reads_as_empty() {
    let (pages, _ids) = seeded(0).await;

    let page = pages
        .get_page(CollectionId::Vendors, CounterScope::Collection, 1, None)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(page.total_items(), 0);
    assert!(page.ids().is_empty());
    assert!(!page.redirected());
}

#[tokio::test]
async fn uncounted_collections_are_rejected() {
    let (pages, _ids) = seeded(0).await;

    let result = pages
        .get_page(CollectionId::Events, CounterScope::Collection, 1, None)
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[test]
fn zero_default_page_size_is_rejected() {
    let store = Arc::new(FakeDocumentStore::default());
    assert!(PaginationService::new(store, 0).is_err());
}
