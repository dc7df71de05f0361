//! Core domain logic for the resource store.
//! This crate is the single source of truth for resource and attachment invariants.

pub mod db;
pub mod envelope;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use envelope::{error_message, parse_draft, Envelope, Operation};
pub use logging::{default_log_level, init_logging, LoggingError, StoreTarget};
pub use model::category::{categories, find_category, find_category_by_name, Category, CategoryId};
pub use model::resource::{
    Attachment, ContentMap, Resource, ResourceContent, ResourceDraft, ResourceId,
    ResourceValidationError, LOCATION_KEY,
};
pub use repo::resource_repo::{RepoError, RepoResult, ResourceRepository, SqliteResourceRepository};
pub use service::error::{StoreError, StoreErrorKind, StoreResult};
pub use service::query_service::QueryService;
pub use service::store_service::{AddOutcome, ResourceService, UpdateOutcome, STATUS_OK};

/// Minimal health-check API, the store's liveness probe.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
