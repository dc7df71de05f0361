//! Attachment splitter.
//!
//! # Responsibility
//! - Turn an incoming draft into a typed primary record plus the derived
//!   `Content` record its attachment requires.
//! - Merge update drafts into existing content before splitting.
//!
//! # Invariants
//! - Pure: no storage access, the repository commits the result.
//! - Cardinality is checked on the raw mapping before any other rule, so an
//!   oversized payload always reports `TooManyAttachments`.

use crate::model::resource::{
    ContentMap, DerivedWrite, Resource, ResourceContent, ResourceDraft, ResourceValidationError,
    WriteSet, LOCATION_KEY,
};
use uuid::Uuid;

/// Splits an add payload.
///
/// # Errors
/// - `TooManyAttachments` when the mapping has more than one extra key.
/// - Other validation errors for missing/blank location, a non-UUID
///   attachment key, or an unknown category.
pub fn split_new(draft: &ResourceDraft) -> Result<WriteSet, ResourceValidationError> {
    let content = normalize_keys(&draft.content);
    ensure_cardinality(&content)?;

    let primary = Resource {
        id: draft.id,
        category: draft.category,
        content: ResourceContent::from_map(&content)?,
    };
    primary.validate()?;

    let derived = primary.derived_record().map(DerivedWrite::Create);
    Ok(WriteSet { primary, derived })
}

/// Merges an update payload into `existing` and splits the result.
///
/// Payload entries override existing ones, entries absent from the payload
/// are kept. `id` and `category` always come from `existing`.
///
/// A derived record is produced only when the attachment is newly
/// introduced (`Create`) or its location changed (`Replace`).
pub fn split_update(
    existing: &Resource,
    draft: &ResourceDraft,
) -> Result<WriteSet, ResourceValidationError> {
    let mut merged = existing.content.to_map();
    merged.extend(normalize_keys(&draft.content));
    ensure_cardinality(&merged)?;

    let primary = Resource {
        id: existing.id,
        category: existing.category,
        content: ResourceContent::from_map(&merged)?,
    };
    primary.validate()?;

    let derived = match (&existing.content.attachment, &primary.content.attachment) {
        (_, None) => None,
        (Some(before), Some(after)) if before.id == after.id => {
            if before.location == after.location {
                None
            } else {
                Some(DerivedWrite::Replace(Resource::derived_from(after)))
            }
        }
        (_, Some(after)) => Some(DerivedWrite::Create(Resource::derived_from(after))),
    };

    Ok(WriteSet { primary, derived })
}

fn ensure_cardinality(content: &ContentMap) -> Result<(), ResourceValidationError> {
    let count = content
        .keys()
        .filter(|key| key.as_str() != LOCATION_KEY)
        .count();
    if count > 1 {
        return Err(ResourceValidationError::TooManyAttachments { count });
    }
    Ok(())
}

/// Rewrites UUID-shaped keys to canonical lowercase form so the same
/// attachment spelled differently is not counted twice.
fn normalize_keys(content: &ContentMap) -> ContentMap {
    content
        .iter()
        .map(|(key, value)| {
            let key = match Uuid::parse_str(key) {
                Ok(id) => id.to_string(),
                Err(_) => key.clone(),
            };
            (key, value.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{split_new, split_update};
    use crate::model::category::CategoryId;
    use crate::model::resource::{
        DerivedWrite, Resource, ResourceContent, ResourceDraft, ResourceValidationError,
        LOCATION_KEY,
    };
    use uuid::Uuid;

    fn id(value: &str) -> Uuid {
        Uuid::parse_str(value).unwrap()
    }

    const PARENT: &str = "495adc20-8718-4f03-ae95-58ff88ffe8db";
    const CHILD: &str = "fee03454-438b-4c4f-8d61-6ebcc429180c";
    const OTHER: &str = "bceb2193-beca-4cf8-8ea0-fee6479aed9f";

    #[test]
    fn split_new_without_attachment_has_no_derived_record() {
        let draft =
            ResourceDraft::new(id(PARENT), CategoryId::NEWS_FEED).with_entry(LOCATION_KEY, "L");
        let split = split_new(&draft).unwrap();
        assert_eq!(split.primary, Resource::new(id(PARENT), CategoryId::NEWS_FEED, "L"));
        assert!(split.derived.is_none());
    }

    #[test]
    fn split_new_derives_content_record_from_attachment() {
        let draft = ResourceDraft::new(id(PARENT), CategoryId::NEWS_FEED)
            .with_entry(LOCATION_KEY, "L")
            .with_entry(CHILD, "L/child.bin");
        let split = split_new(&draft).unwrap();

        assert_eq!(
            split.derived,
            Some(DerivedWrite::Create(Resource::new(
                id(CHILD),
                CategoryId::CONTENT,
                "L/child.bin"
            )))
        );
        assert_eq!(split.primary.content.to_map(), draft.content);
    }

    #[test]
    fn split_new_checks_cardinality_before_other_rules() {
        let draft = ResourceDraft::new(id(PARENT), CategoryId(42))
            .with_entry(CHILD, "a")
            .with_entry(OTHER, "b");
        assert_eq!(
            split_new(&draft).unwrap_err(),
            ResourceValidationError::TooManyAttachments { count: 2 }
        );
    }

    #[test]
    fn split_update_merges_new_attachment_into_existing_content() {
        let existing = Resource::new(id(PARENT), CategoryId::NEWS_FEED, "L");
        let draft = ResourceDraft::new(id(PARENT), CategoryId::NEWS_FEED)
            .with_entry(LOCATION_KEY, "L")
            .with_entry(CHILD, "L/child.jpg");

        let split = split_update(&existing, &draft).unwrap();
        assert_eq!(
            split.primary.content,
            ResourceContent::with_attachment("L", id(CHILD), "L/child.jpg")
        );
        assert!(matches!(split.derived, Some(DerivedWrite::Create(ref r)) if r.id == id(CHILD)));
    }

    #[test]
    fn split_update_rejects_second_attachment() {
        let existing = Resource {
            id: id(PARENT),
            category: CategoryId::NEWS_FEED,
            content: ResourceContent::with_attachment("L", id(CHILD), "L/child.jpg"),
        };
        let draft = ResourceDraft::new(id(PARENT), CategoryId::NEWS_FEED).with_entry(OTHER, "x");
        assert_eq!(
            split_update(&existing, &draft).unwrap_err(),
            ResourceValidationError::TooManyAttachments { count: 2 }
        );
    }

    #[test]
    fn split_update_replaces_derived_only_when_location_changes() {
        let existing = Resource {
            id: id(PARENT),
            category: CategoryId::NEWS_FEED,
            content: ResourceContent::with_attachment("L", id(CHILD), "L/child.jpg"),
        };

        let unchanged = ResourceDraft::new(id(PARENT), CategoryId::NEWS_FEED)
            .with_entry(CHILD.to_uppercase(), "L/child.jpg");
        assert!(split_update(&existing, &unchanged).unwrap().derived.is_none());

        let moved = ResourceDraft::new(id(PARENT), CategoryId::NEWS_FEED)
            .with_entry(CHILD, "M/child.jpg");
        let split = split_update(&existing, &moved).unwrap();
        assert_eq!(
            split.derived,
            Some(DerivedWrite::Replace(Resource::new(
                id(CHILD),
                CategoryId::CONTENT,
                "M/child.jpg"
            )))
        );
    }

    #[test]
    fn split_update_keeps_existing_category() {
        let existing = Resource::new(id(PARENT), CategoryId::NEWS_FEED, "L");
        let draft =
            ResourceDraft::new(id(PARENT), CategoryId::CONTENT).with_entry(LOCATION_KEY, "M");
        let split = split_update(&existing, &draft).unwrap();
        assert_eq!(split.primary.category, CategoryId::NEWS_FEED);
        assert_eq!(split.primary.content.location, "M");
    }
}
