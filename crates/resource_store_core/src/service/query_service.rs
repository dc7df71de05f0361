//! Resource read use-cases.
//!
//! # Responsibility
//! - Point lookup, ordered batch lookup, category scan.
//! - Serve the static category catalog.
//!
//! # Invariants
//! - Batch lookup is all-or-nothing: one missing id fails the whole call.
//! - Batch results are sorted ascending by id string.
//! - An empty category scan is reported as not found, never as `[]`.

use crate::model::category::{
    categories, find_category, find_category_by_name, Category, CategoryId,
};
use crate::model::resource::{Resource, ResourceId};
use crate::repo::resource_repo::ResourceRepository;
use crate::service::error::{StoreError, StoreResult};
use log::debug;
use std::collections::BTreeSet;

/// Use-case service for resource reads.
pub struct QueryService<R: ResourceRepository> {
    repo: R,
}

impl<R: ResourceRepository> QueryService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns the stored record for `id`.
    pub fn get_resource(&self, id: ResourceId) -> StoreResult<Resource> {
        self.repo
            .get_resource(id)?
            .ok_or(StoreError::ResourceNotFound(id))
    }

    /// Returns all records named by `ids`, sorted ascending by id.
    ///
    /// Repeated ids are collapsed. An empty request, or any id without a
    /// stored record, fails with not-found and returns nothing.
    pub fn get_resources(&self, ids: &[ResourceId]) -> StoreResult<Vec<Resource>> {
        let requested: BTreeSet<ResourceId> = ids.iter().copied().collect();
        if requested.is_empty() {
            return Err(StoreError::ResourcesNotFound(Vec::new()));
        }

        let unique: Vec<ResourceId> = requested.iter().copied().collect();
        let mut resources = self.repo.get_resources(&unique)?;

        let found: BTreeSet<ResourceId> = resources.iter().map(|resource| resource.id).collect();
        let missing: Vec<ResourceId> = requested.difference(&found).copied().collect();
        if !missing.is_empty() {
            debug!(
                "event=resources_get module=query status=not_found requested={} missing={}",
                requested.len(),
                missing.len()
            );
            return Err(StoreError::ResourcesNotFound(missing));
        }

        resources.sort_by_cached_key(|resource| resource.id.to_string());
        Ok(resources)
    }

    /// Returns every record in `category`. Callers must not rely on order.
    pub fn get_resources_by_category(&self, category: CategoryId) -> StoreResult<Vec<Resource>> {
        let resources = self.repo.list_by_category(category)?;
        if resources.is_empty() {
            return Err(StoreError::CategoryEmpty(category));
        }
        Ok(resources)
    }

    /// Returns the static catalog.
    pub fn categories(&self) -> &'static [Category] {
        categories()
    }

    /// Returns one catalog entry.
    pub fn category(&self, id: CategoryId) -> StoreResult<&'static Category> {
        find_category(id).ok_or(StoreError::CategoryUnknown(id))
    }

    /// Returns the catalog entry with display name `name` (exact match).
    pub fn category_named(&self, name: &str) -> StoreResult<&'static Category> {
        find_category_by_name(name).ok_or_else(|| StoreError::CategoryNameUnknown(name.to_string()))
    }
}
