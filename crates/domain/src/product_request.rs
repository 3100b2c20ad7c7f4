use serde::{Deserialize, Serialize};
use staffhub_core::{AppError, AppResult, UserId};

use crate::entity::require_text;
use crate::{ActionType, CollectionId, DocumentId, Entity, EntityFields, ForeignKey};

/// Request to stock a vendor product.
pub type ProductRequest = Entity<ProductRequestFields>;

/// Domain fields of a product request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequestFields {
    /// Supplying vendor.
    pub vendor: DocumentId,
    /// Vendor stock keeping unit.
    pub vendor_sku: String,
    /// Product description.
    pub description: String,
    /// Unit cost in cents.
    pub cost_cents: i64,
    /// Requesting user.
    pub user: UserId,
}

const PRODUCT_REQUEST_FOREIGN_KEYS: &[ForeignKey] = &[ForeignKey {
    field: "vendor",
    target: CollectionId::Vendors,
}];

impl EntityFields for ProductRequestFields {
    const COLLECTION: CollectionId = CollectionId::ProductRequests;
    const OWNER_FIELD: Option<&'static str> = Some("user");

    fn validate(&self) -> AppResult<()> {
        require_text("vendor SKU", &self.vendor_sku)?;
        require_text("product description", &self.description)?;
        if self.cost_cents < 0 {
            return Err(AppError::Validation(
                "product cost must not be negative".to_owned(),
            ));
        }

        Ok(())
    }

    fn title(&self) -> String {
        format!("{} ({})", self.description, self.vendor_sku)
    }

    fn creation_action() -> ActionType {
        ActionType::Requested
    }

    fn allows_status(status: ActionType) -> bool {
        matches!(status, ActionType::Approved | ActionType::Rejected)
    }

    fn foreign_keys() -> &'static [ForeignKey] {
        PRODUCT_REQUEST_FOREIGN_KEYS
    }

    fn owner(&self) -> Option<&UserId> {
        Some(&self.user)
    }
}
