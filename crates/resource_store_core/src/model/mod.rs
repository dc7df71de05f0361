//! Resource domain model and static category catalog.
//!
//! # Responsibility
//! - Define canonical data structures used by store business logic.
//! - Keep the attachment cardinality rule in the content type itself.
//!
//! # Invariants
//! - Every record is identified by a stable `ResourceId`.
//! - A `ResourceContent` carries at most one attachment.

pub mod category;
pub mod resource;
