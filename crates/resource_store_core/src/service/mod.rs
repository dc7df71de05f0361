//! Store use-case services.
//!
//! # Responsibility
//! - Orchestrate the attachment splitter and repository into use-case APIs.
//! - Keep adapters decoupled from storage details.

pub mod error;
pub mod query_service;
pub mod splitter;
pub mod store_service;
