use serde::{Deserialize, Serialize};
use staffhub_core::AppResult;

use crate::entity::require_text;
use crate::{CollectionId, Entity, EntityFields, OrderBy};

/// Customer record.
pub type Customer = Entity<CustomerFields>;
/// Vendor record.
pub type Vendor = Entity<VendorFields>;

/// Fields shared by customers and vendors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerDetails {
    /// Trading name.
    pub name: String,
    /// System the record was imported from, e.g. `manual` or `crm`.
    pub source: String,
    /// Identifier in the source system.
    #[serde(default)]
    pub source_id: Option<String>,
}

impl PartnerDetails {
    fn validate(&self) -> AppResult<()> {
        require_text("name", &self.name)?;
        require_text("source", &self.source)
    }
}

/// Domain fields of a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerFields(pub PartnerDetails);

/// Domain fields of a vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorFields(pub PartnerDetails);

impl EntityFields for CustomerFields {
    const COLLECTION: CollectionId = CollectionId::Customers;

    fn validate(&self) -> AppResult<()> {
        self.0.validate()
    }

    fn title(&self) -> String {
        self.0.name.clone()
    }

    fn default_order() -> OrderBy {
        OrderBy::asc("name")
    }
}

impl EntityFields for VendorFields {
    const COLLECTION: CollectionId = CollectionId::Vendors;

    fn validate(&self) -> AppResult<()> {
        self.0.validate()
    }

    fn title(&self) -> String {
        self.0.name.clone()
    }

    fn default_order() -> OrderBy {
        OrderBy::asc("name")
    }
}
