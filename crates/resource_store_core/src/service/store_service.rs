//! Resource write use-cases (add/update/delete).
//!
//! # Responsibility
//! - Run the attachment splitter over incoming drafts.
//! - Hand the resulting write set to the repository as one atomic unit.
//! - Shape the success payloads returned to adapters.
//!
//! # Invariants
//! - A failed call persists nothing.
//! - Update never rewrites `id` or `category`.

use crate::model::resource::{DerivedWrite, Resource, ResourceDraft, ResourceId};
use crate::repo::resource_repo::ResourceRepository;
use crate::service::error::{StoreError, StoreErrorKind, StoreResult};
use crate::service::splitter::{split_new, split_update};
use log::{error, info, warn};
use serde::Serialize;

/// Literal status value carried by successful write payloads.
pub const STATUS_OK: &str = "OK";

/// Success payload of `add_resource`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddOutcome {
    pub add: &'static str,
    /// Derived `Content` record, present only when one was created.
    #[serde(rename = "added-attachements", skip_serializing_if = "Option::is_none")]
    pub added_attachment: Option<Resource>,
    /// Stored primary record.
    #[serde(skip)]
    pub resource: Resource,
}

/// Success payload of `update_resource`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    pub update: &'static str,
    #[serde(rename = "updated-item")]
    pub updated_item: Resource,
    /// Derived record created or rewritten by this update.
    #[serde(rename = "new-items", skip_serializing_if = "Option::is_none")]
    pub new_item: Option<Resource>,
}

/// Use-case service for resource writes.
pub struct ResourceService<R: ResourceRepository> {
    repo: R,
}

impl<R: ResourceRepository> ResourceService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Adds a resource and, when its content names an attachment, the
    /// derived `Content` record.
    ///
    /// # Errors
    /// - `TooManyAttachments` for more than one attachment key.
    /// - `DuplicateId` when the resource or derived id already exists.
    /// - `Validation` for malformed content or unknown category.
    pub fn add_resource(&self, draft: &ResourceDraft) -> StoreResult<AddOutcome> {
        let result = split_new(draft)
            .map_err(StoreError::from)
            .and_then(|write_set| {
                let mut records = vec![write_set.primary.clone()];
                records.extend(write_set.derived.as_ref().map(|d| d.record().clone()));
                self.repo.insert_resources(&records)?;
                Ok(AddOutcome {
                    add: STATUS_OK,
                    added_attachment: write_set.derived.map(DerivedWrite::into_record),
                    resource: write_set.primary,
                })
            });

        match &result {
            Ok(outcome) => info!(
                "event=resource_add module=store status=ok resource_id={} derived_id={}",
                draft.id,
                display_id(outcome.added_attachment.as_ref())
            ),
            Err(err) => log_failure("resource_add", draft.id, err),
        }
        result
    }

    /// Merges `draft.content` into the stored resource `draft.id`.
    ///
    /// # Errors
    /// - `ResourceNotFound` when `draft.id` does not exist.
    /// - `TooManyAttachments` when the merge would hold two attachments.
    /// - `DuplicateId` when a newly introduced attachment id is taken.
    pub fn update_resource(&self, draft: &ResourceDraft) -> StoreResult<UpdateOutcome> {
        let result = self
            .repo
            .modify_resource(draft.id, |existing| {
                split_update(existing, draft).map_err(StoreError::from)
            })
            .map(|write_set| UpdateOutcome {
                update: STATUS_OK,
                updated_item: write_set.primary,
                new_item: write_set.derived.map(DerivedWrite::into_record),
            });

        match &result {
            Ok(outcome) => info!(
                "event=resource_update module=store status=ok resource_id={} derived_id={}",
                draft.id,
                display_id(outcome.new_item.as_ref())
            ),
            Err(err) => log_failure("resource_update", draft.id, err),
        }
        result
    }

    /// Deletes one resource. Its derived record, if any, is left in place.
    pub fn delete_resource(&self, id: ResourceId) -> StoreResult<()> {
        self.delete(id, false).map(|_| ())
    }

    /// Deletes one resource together with its derived record.
    ///
    /// Returns the removed ids, primary first. A derived record that was
    /// already deleted is skipped silently.
    pub fn delete_resource_with_attachment(&self, id: ResourceId) -> StoreResult<Vec<ResourceId>> {
        self.delete(id, true)
    }

    fn delete(&self, id: ResourceId, with_attachment: bool) -> StoreResult<Vec<ResourceId>> {
        let result = self
            .repo
            .delete_resource(id, with_attachment)
            .map_err(StoreError::from);

        match &result {
            Ok(removed) => info!(
                "event=resource_delete module=store status=ok resource_id={} removed={}",
                id,
                removed.len()
            ),
            Err(err) => log_failure("resource_delete", id, err),
        }
        result
    }
}

fn display_id(resource: Option<&Resource>) -> String {
    resource.map_or_else(|| "none".to_string(), |resource| resource.id.to_string())
}

fn log_failure(event: &str, resource_id: ResourceId, err: &StoreError) {
    let kind = err.kind();
    if kind == StoreErrorKind::Internal {
        error!(
            "event={event} module=store status=error resource_id={resource_id} error_kind={} error={err}",
            kind.as_str()
        );
    } else {
        warn!(
            "event={event} module=store status=rejected resource_id={resource_id} error_kind={}",
            kind.as_str()
        );
    }
}
