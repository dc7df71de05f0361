use resource_store_core::{
    CategoryId, QueryService, Resource, ResourceContent, ResourceDraft, ResourceRepository,
    ResourceService, SqliteResourceRepository, StoreError, StoreErrorKind, LOCATION_KEY,
};
use serde_json::json;
use uuid::Uuid;

const A: &str = "495adc20-8718-4f03-ae95-58ff88ffe8db";
const X: &str = "fee03454-438b-4c4f-8d61-6ebcc429180c";
const Y: &str = "bceb2193-beca-4cf8-8ea0-fee6479aed9f";

fn id(value: &str) -> Uuid {
    Uuid::parse_str(value).unwrap()
}

#[test]
fn add_and_get_roundtrip() {
    let repo = SqliteResourceRepository::open_in_memory().unwrap();
    let store = ResourceService::new(&repo);
    let query = QueryService::new(&repo);

    let draft = ResourceDraft::new(id(A), CategoryId::NEWS_FEED).with_entry(LOCATION_KEY, "L");
    let outcome = store.add_resource(&draft).unwrap();
    assert_eq!(outcome.add, "OK");
    assert!(outcome.added_attachment.is_none());

    let loaded = query.get_resource(id(A)).unwrap();
    assert_eq!(loaded, Resource::new(id(A), CategoryId::NEWS_FEED, "L"));
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        json!({ "add": "OK" })
    );
}

#[test]
fn add_with_attachment_creates_derived_content_record() {
    let repo = SqliteResourceRepository::open_in_memory().unwrap();
    let store = ResourceService::new(&repo);
    let query = QueryService::new(&repo);

    let draft = ResourceDraft::new(id(A), CategoryId::NEWS_FEED)
        .with_entry(LOCATION_KEY, "L")
        .with_entry(X, "L/X.bin");
    let outcome = store.add_resource(&draft).unwrap();

    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        json!({
            "add": "OK",
            "added-attachements": {
                "id": X,
                "category": 2,
                "content": { "location": "L/X.bin" }
            }
        })
    );

    let parent = query.get_resource(id(A)).unwrap();
    assert_eq!(
        parent.content,
        ResourceContent::with_attachment("L", id(X), "L/X.bin")
    );
    let child = query.get_resource(id(X)).unwrap();
    assert_eq!(child, Resource::new(id(X), CategoryId::CONTENT, "L/X.bin"));
}

#[test]
fn duplicate_add_fails_and_keeps_original_record() {
    let repo = SqliteResourceRepository::open_in_memory().unwrap();
    let store = ResourceService::new(&repo);
    let query = QueryService::new(&repo);

    let draft = ResourceDraft::new(id(A), CategoryId::NEWS_FEED)
        .with_entry(LOCATION_KEY, "L")
        .with_entry(X, "L/X.bin");
    store.add_resource(&draft).unwrap();

    let err = store.add_resource(&draft).unwrap_err();
    assert!(matches!(err, StoreError::DuplicateId(dup) if dup == id(A)));

    let changed = ResourceDraft::new(id(A), CategoryId::NEWS_FEED).with_entry(LOCATION_KEY, "M");
    let err = store.add_resource(&changed).unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::DuplicateId);

    let loaded = query.get_resource(id(A)).unwrap();
    assert_eq!(loaded.content.location, "L");
    assert_eq!(repo.category_index_mismatches().unwrap(), 0);
}

#[test]
fn add_whose_attachment_id_is_taken_persists_nothing() {
    let repo = SqliteResourceRepository::open_in_memory().unwrap();
    let store = ResourceService::new(&repo);

    store
        .add_resource(&ResourceDraft::new(id(X), CategoryId::NEWS_FEED).with_entry(LOCATION_KEY, "X"))
        .unwrap();

    let draft = ResourceDraft::new(id(A), CategoryId::NEWS_FEED)
        .with_entry(LOCATION_KEY, "L")
        .with_entry(X, "L/X.bin");
    let err = store.add_resource(&draft).unwrap_err();
    assert!(matches!(err, StoreError::DuplicateId(dup) if dup == id(X)));

    assert!(repo.get_resource(id(A)).unwrap().is_none());
    let untouched = repo.get_resource(id(X)).unwrap().unwrap();
    assert_eq!(untouched.category, CategoryId::NEWS_FEED);
}

#[test]
fn add_with_two_attachments_fails_and_persists_nothing() {
    let repo = SqliteResourceRepository::open_in_memory().unwrap();
    let store = ResourceService::new(&repo);

    let draft = ResourceDraft::new(id(A), CategoryId::NEWS_FEED)
        .with_entry(LOCATION_KEY, "L")
        .with_entry(X, "L/X.bin")
        .with_entry(Y, "L/Y.bin");
    let err = store.add_resource(&draft).unwrap_err();
    assert!(matches!(err, StoreError::TooManyAttachments { count: 2 }));

    let found = repo.get_resources(&[id(A), id(X), id(Y)]).unwrap();
    assert!(found.is_empty());
}

#[test]
fn add_rejects_invalid_content_and_unknown_category() {
    let repo = SqliteResourceRepository::open_in_memory().unwrap();
    let store = ResourceService::new(&repo);

    let missing_location = ResourceDraft::new(id(A), CategoryId::NEWS_FEED);
    assert_eq!(
        store.add_resource(&missing_location).unwrap_err().kind(),
        StoreErrorKind::Validation
    );

    let bad_key = ResourceDraft::new(id(A), CategoryId::NEWS_FEED)
        .with_entry(LOCATION_KEY, "L")
        .with_entry("cover", "L/cover.jpg");
    assert_eq!(
        store.add_resource(&bad_key).unwrap_err().kind(),
        StoreErrorKind::Validation
    );

    let unknown_category =
        ResourceDraft::new(id(A), CategoryId(9)).with_entry(LOCATION_KEY, "L");
    assert!(matches!(
        store.add_resource(&unknown_category).unwrap_err(),
        StoreError::Validation(_)
    ));

    assert!(repo.get_resource(id(A)).unwrap().is_none());
}

#[test]
fn uppercase_attachment_key_is_stored_canonically() {
    let repo = SqliteResourceRepository::open_in_memory().unwrap();
    let store = ResourceService::new(&repo);

    let draft = ResourceDraft::new(id(A), CategoryId::NEWS_FEED)
        .with_entry(LOCATION_KEY, "L")
        .with_entry(X.to_uppercase(), "L/X.bin");
    let outcome = store.add_resource(&draft).unwrap();

    assert_eq!(outcome.added_attachment.unwrap().id, id(X));
    let parent = repo.get_resource(id(A)).unwrap().unwrap();
    assert!(parent.content.to_map().contains_key(X));
}
