use std::sync::Arc;

use staffhub_core::{AppError, AppResult, UserId};
use staffhub_domain::{
    CollectionQuery, Entity, EntityFields, FieldFilter, ForeignKey, OrderBy, TimeWindow,
};

/// Client-side filter applied after the store query.
pub type EntityPredicate<F> = Arc<dyn Fn(&Entity<F>) -> bool + Send + Sync>;

/// Options for opening a collection channel.
pub struct SubscribeOptions<F> {
    pub(super) query: CollectionQuery,
    pub(super) predicate: Option<EntityPredicate<F>>,
    pub(super) joins: Vec<ForeignKey>,
    pub(super) publish: bool,
}

impl<F: EntityFields> Default for SubscribeOptions<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: EntityFields> SubscribeOptions<F> {
    /// Whole collection in the kind's default order with its default joins.
    #[must_use]
    pub fn new() -> Self {
        Self {
            query: CollectionQuery::all(F::COLLECTION).order_by(F::default_order()),
            predicate: None,
            joins: F::foreign_keys().to_vec(),
            publish: false,
        }
    }

    /// Restricts the channel to entities owned by `user`.
    pub fn owned_by(mut self, user: &UserId) -> AppResult<Self> {
        let field = F::OWNER_FIELD.ok_or_else(|| {
            AppError::Validation(format!("{} entities have no owner", F::COLLECTION))
        })?;
        self.query = self.query.filter(FieldFilter::equals(field, user.as_str()));
        Ok(self)
    }

    /// Adds a store-side filter.
    #[must_use]
    pub fn filter(mut self, filter: FieldFilter) -> Self {
        self.query = self.query.filter(filter);
        self
    }

    /// Restricts the channel to a time window.
    #[must_use]
    pub fn window(mut self, window: TimeWindow) -> Self {
        self.query = self.query.window(window);
        self
    }

    /// Overrides the ordering.
    #[must_use]
    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.query = self.query.order_by(order_by);
        self
    }

    /// Caps the number of entities.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.query = self.query.limit(limit);
        self
    }

    /// Adds a client-side predicate.
    #[must_use]
    pub fn predicate(
        mut self,
        predicate: impl Fn(&Entity<F>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Disables foreign key joins.
    #[must_use]
    pub fn without_joins(mut self) -> Self {
        self.joins.clear();
        self
    }

    /// Publishes every snapshot into the collection's application state slice.
    #[must_use]
    pub fn publish(mut self) -> Self {
        self.publish = true;
        self
    }

    /// Returns the store query.
    #[must_use]
    pub fn query(&self) -> &CollectionQuery {
        &self.query
    }
}
