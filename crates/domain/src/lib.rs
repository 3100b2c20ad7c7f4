//! Domain entities, document model and invariants.

#![forbid(unsafe_code)]

mod action;
mod calendar_event;
mod collection;
mod comment;
mod counter;
mod date_range;
mod directory;
mod document;
mod entity;
mod expense_claim;
mod leave_request;
mod notification;
mod pagination;
mod partner;
mod product_request;
mod project;
mod promotion;
mod query;
mod resource;

pub use action::{ActionEntry, ActionType};
pub use calendar_event::{CalendarEvent, EventFields};
pub use collection::{CollectionId, DeletePolicy};
pub use comment::{Attachment, Comment, CommentId, CommentInput};
pub use counter::{COUNT_FIELD, Counter, CounterScope, DOCUMENTS_FIELD};
pub use date_range::DateRange;
pub use directory::{Location, LocationFields, UserProfile, UserProfileFields};
pub use document::{
    DocumentId, FieldPath, FieldTransform, PathSegment, StoredDocument, apply_transform, read_path,
};
pub use entity::{
    ACTIONS_FIELD, ATTACHMENTS_FIELD, COMMENTS_FIELD, Entity, EntityFields, ForeignKey,
    METADATA_FIELD, Metadata,
};
pub use expense_claim::{ExpenseClaim, ExpenseClaimFields, ExpenseLine};
pub use leave_request::{LeaveRequest, LeaveRequestFields};
pub use notification::{NotificationKind, NotificationRecord, compute_recipients};
pub use pagination::{DEFAULT_PAGE_SIZE, Page, page_containing, page_of, total_pages};
pub use partner::{Customer, CustomerFields, PartnerDetails, Vendor, VendorFields};
pub use product_request::{ProductRequest, ProductRequestFields};
pub use project::{Project, ProjectFields};
pub use promotion::{Promotion, PromotionFields};
pub use query::{
    CollectionQuery, FieldFilter, FilterOp, OrderBy, SortDirection, TimeWindow, compare_values,
    lookup_field, parse_timestamp, sort_documents,
};
pub use resource::{Resource, ResourceFields};
