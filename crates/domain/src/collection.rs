use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use staffhub_core::AppError;

/// Named document collections held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollectionId {
    /// Staff calendar events.
    Events,
    /// Leave requests.
    LeaveRequests,
    /// Expense claims.
    ExpenseClaims,
    /// Customer projects.
    Projects,
    /// News feed promotions.
    Promotions,
    /// Shared links grouped by folder.
    Resources,
    /// Vendor product requests.
    ProductRequests,
    /// Customers.
    Customers,
    /// Vendors.
    Vendors,
    /// Staff directory profiles.
    Users,
    /// Branch locations.
    Locations,
    /// Denormalized counters.
    Counters,
    /// Outgoing notification records.
    Notifications,
}

/// Whether documents of a collection may be physically removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Documents are removed on delete.
    Hard,
    /// Documents are kept for audit; only status transitions are allowed.
    Retain,
}

impl CollectionId {
    /// Returns all known collections.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[CollectionId] = &[
            CollectionId::Events,
            CollectionId::LeaveRequests,
            CollectionId::ExpenseClaims,
            CollectionId::Projects,
            CollectionId::Promotions,
            CollectionId::Resources,
            CollectionId::ProductRequests,
            CollectionId::Customers,
            CollectionId::Vendors,
            CollectionId::Users,
            CollectionId::Locations,
            CollectionId::Counters,
            CollectionId::Notifications,
        ];

        ALL
    }

    /// Returns the stable storage name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::LeaveRequests => "leave-requests",
            Self::ExpenseClaims => "expense-claims",
            Self::Projects => "projects",
            Self::Promotions => "promotions",
            Self::Resources => "resources",
            Self::ProductRequests => "product-requests",
            Self::Customers => "customers",
            Self::Vendors => "vendors",
            Self::Users => "users",
            Self::Locations => "locations",
            Self::Counters => "counters",
            Self::Notifications => "notifications",
        }
    }

    /// Returns a human-readable singular label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Events => "Event",
            Self::LeaveRequests => "Leave request",
            Self::ExpenseClaims => "Expense claim",
            Self::Projects => "Project",
            Self::Promotions => "Promotion",
            Self::Resources => "Resource",
            Self::ProductRequests => "Product request",
            Self::Customers => "Customer",
            Self::Vendors => "Vendor",
            Self::Users => "User",
            Self::Locations => "Location",
            Self::Counters => "Counter",
            Self::Notifications => "Notification",
        }
    }

    /// Returns the delete policy for documents in this collection.
    #[must_use]
    pub fn delete_policy(&self) -> DeletePolicy {
        match self {
            Self::LeaveRequests
            | Self::ExpenseClaims
            | Self::ProductRequests
            | Self::Users
            | Self::Locations => DeletePolicy::Retain,
            Self::Events
            | Self::Projects
            | Self::Promotions
            | Self::Resources
            | Self::Customers
            | Self::Vendors
            | Self::Counters
            | Self::Notifications => DeletePolicy::Hard,
        }
    }

    /// Returns whether creates and deletes maintain a denormalized counter.
    #[must_use]
    pub fn is_counted(&self) -> bool {
        matches!(
            self,
            Self::Customers
                | Self::Vendors
                | Self::ProductRequests
                | Self::LeaveRequests
                | Self::ExpenseClaims
                | Self::Promotions
                | Self::Users
        )
    }
}

impl Display for CollectionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for CollectionId {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|collection| collection.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown collection '{value}'")))
    }
}
