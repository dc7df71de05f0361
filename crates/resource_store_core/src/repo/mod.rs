//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Every multi-row write (primary, derived record, index entries) commits
//!   in one transaction or not at all.
//! - Repository APIs return semantic errors (`NotFound`, `AlreadyExists`) in
//!   addition to DB transport errors.

pub mod category_index;
pub mod resource_repo;
