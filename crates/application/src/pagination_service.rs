use std::sync::Arc;

use staffhub_core::{AppError, AppResult};
use staffhub_domain::{
    CollectionId, Counter, CounterScope, DEFAULT_PAGE_SIZE, DocumentId, Entity, EntityFields,
    Page, page_containing, page_of,
};
use tracing::debug;

use crate::store_ports::DocumentStore;

/// Serves pages from denormalized counters without scanning collections.
#[derive(Clone)]
pub struct PaginationService {
    store: Arc<dyn DocumentStore>,
    default_page_size: usize,
}

impl PaginationService {
    /// Creates a pagination service.
    pub fn new(store: Arc<dyn DocumentStore>, default_page_size: usize) -> AppResult<Self> {
        if default_page_size == 0 {
            return Err(AppError::Validation(
                "default page size must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            store,
            default_page_size,
        })
    }

    /// Creates a pagination service with the default page size.
    #[must_use]
    pub fn with_default_page_size(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Returns the page size used when callers pass none.
    #[must_use]
    pub fn default_page_size(&self) -> usize {
        self.default_page_size
    }

    /// Reads the counter of a collection slice. A missing counter is empty.
    pub async fn counter(&self, collection: CollectionId, scope: CounterScope) -> AppResult<Counter> {
        if !collection.is_counted() {
            return Err(AppError::Validation(format!(
                "{} records are not counted",
                collection.label()
            )));
        }

        let id = scope.document_id(collection)?;
        match self.store.get(CollectionId::Counters, &id).await? {
            Some(document) => Counter::from_storage(collection, scope, document.data()),
            None => Ok(Counter::empty(collection, scope)),
        }
    }

    /// Returns one page, newest first. Out-of-range pages redirect to page 1.
    pub async fn get_page(
        &self,
        collection: CollectionId,
        scope: CounterScope,
        page_number: usize,
        page_size: Option<usize>,
    ) -> AppResult<Page> {
        let counter = self.counter(collection, scope).await?;
        let page = page_of(
            &counter.newest_first(),
            page_number,
            page_size.unwrap_or(self.default_page_size),
        )?;
        if page.redirected() {
            debug!(
                collection = %collection,
                requested = page_number,
                total_pages = page.total_pages(),
                "page out of range, serving first page"
            );
        }

        Ok(page)
    }

    /// Returns the page holding `id`, flagged with focus on it.
    pub async fn locate(
        &self,
        collection: CollectionId,
        scope: CounterScope,
        id: &DocumentId,
        page_size: Option<usize>,
    ) -> AppResult<Page> {
        let counter = self.counter(collection, scope).await?;
        page_containing(
            &counter.newest_first(),
            id,
            page_size.unwrap_or(self.default_page_size),
        )
    }

    /// Loads the entities of a page in page order. Ids whose document is gone are skipped.
    pub async fn hydrate<F: EntityFields>(&self, page: &Page) -> AppResult<Vec<Entity<F>>> {
        let mut items = Vec::with_capacity(page.ids().len());
        for id in page.ids() {
            if let Some(document) = self.store.get(F::COLLECTION, id).await? {
                items.push(Entity::from_storage(document)?);
            }
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests;
