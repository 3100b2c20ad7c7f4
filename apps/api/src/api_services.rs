mod database;
mod email;
mod reference_slices;
mod state_builder;

pub use database::{build_document_store, connect_and_migrate};
pub use reference_slices::open_reference_slices;
pub use state_builder::{assemble_app_state, build_app_state};
