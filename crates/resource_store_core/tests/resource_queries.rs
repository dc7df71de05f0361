use resource_store_core::{
    categories, CategoryId, QueryService, ResourceDraft, ResourceId, ResourceService,
    SqliteResourceRepository, StoreError, LOCATION_KEY,
};
use std::collections::HashSet;
use uuid::Uuid;

fn add(repo: &SqliteResourceRepository, category: CategoryId, location: &str) -> ResourceId {
    let id = Uuid::new_v4();
    let draft = ResourceDraft::new(id, category).with_entry(LOCATION_KEY, location);
    ResourceService::new(repo).add_resource(&draft).unwrap();
    id
}

#[test]
fn batch_lookup_returns_records_sorted_by_id() {
    let repo = SqliteResourceRepository::open_in_memory().unwrap();
    let query = QueryService::new(&repo);
    let ids: Vec<ResourceId> = (0..6)
        .map(|index| add(&repo, CategoryId::NEWS_FEED, &format!("L{index}")))
        .collect();

    let mut reversed = ids.clone();
    reversed.reverse();
    let loaded = query.get_resources(&reversed).unwrap();

    let loaded_ids: Vec<String> = loaded.iter().map(|r| r.id.to_string()).collect();
    let mut expected: Vec<String> = ids.iter().map(ToString::to_string).collect();
    expected.sort();
    assert_eq!(loaded_ids, expected);
}

#[test]
fn batch_lookup_collapses_repeated_ids() {
    let repo = SqliteResourceRepository::open_in_memory().unwrap();
    let query = QueryService::new(&repo);
    let id = add(&repo, CategoryId::NEWS_FEED, "L");

    let loaded = query.get_resources(&[id, id, id]).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, id);
}

#[test]
fn batch_lookup_is_all_or_nothing() {
    let repo = SqliteResourceRepository::open_in_memory().unwrap();
    let query = QueryService::new(&repo);
    let present = add(&repo, CategoryId::NEWS_FEED, "L");
    let missing = Uuid::new_v4();

    let err = query.get_resources(&[present, missing]).unwrap_err();
    match err {
        StoreError::ResourcesNotFound(ids) => assert_eq!(ids, vec![missing]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn batch_lookup_with_no_ids_is_not_found() {
    let repo = SqliteResourceRepository::open_in_memory().unwrap();
    let query = QueryService::new(&repo);
    add(&repo, CategoryId::NEWS_FEED, "L");

    assert!(matches!(
        query.get_resources(&[]).unwrap_err(),
        StoreError::ResourcesNotFound(ids) if ids.is_empty()
    ));
}

#[test]
fn category_scan_returns_exactly_matching_set() {
    let repo = SqliteResourceRepository::open_in_memory().unwrap();
    let query = QueryService::new(&repo);

    let feed: HashSet<ResourceId> = (0..3)
        .map(|index| add(&repo, CategoryId::NEWS_FEED, &format!("feed{index}")))
        .collect();
    let content: HashSet<ResourceId> = (0..2)
        .map(|index| add(&repo, CategoryId::CONTENT, &format!("content{index}")))
        .collect();

    let scanned: HashSet<ResourceId> = query
        .get_resources_by_category(CategoryId::NEWS_FEED)
        .unwrap()
        .into_iter()
        .map(|resource| resource.id)
        .collect();
    assert_eq!(scanned, feed);

    let scanned: HashSet<ResourceId> = query
        .get_resources_by_category(CategoryId::CONTENT)
        .unwrap()
        .into_iter()
        .map(|resource| resource.id)
        .collect();
    assert_eq!(scanned, content);
}

#[test]
fn category_scan_includes_derived_children() {
    let repo = SqliteResourceRepository::open_in_memory().unwrap();
    let query = QueryService::new(&repo);
    let child = Uuid::new_v4();
    let draft = ResourceDraft::new(Uuid::new_v4(), CategoryId::NEWS_FEED)
        .with_entry(LOCATION_KEY, "L")
        .with_entry(child.to_string(), "L/child.png");
    ResourceService::new(&repo).add_resource(&draft).unwrap();

    let content = query.get_resources_by_category(CategoryId::CONTENT).unwrap();
    assert_eq!(content.len(), 1);
    assert_eq!(content[0].id, child);
}

#[test]
fn empty_category_scan_is_not_found() {
    let repo = SqliteResourceRepository::open_in_memory().unwrap();
    let query = QueryService::new(&repo);
    add(&repo, CategoryId::NEWS_FEED, "L");

    assert!(matches!(
        query.get_resources_by_category(CategoryId::CONTENT).unwrap_err(),
        StoreError::CategoryEmpty(CategoryId::CONTENT)
    ));
    assert!(matches!(
        query.get_resources_by_category(CategoryId(77)).unwrap_err(),
        StoreError::CategoryEmpty(_)
    ));
}

#[test]
fn categories_are_constant() {
    let repo = SqliteResourceRepository::open_in_memory().unwrap();
    let query = QueryService::new(&repo);
    let before = serde_json::to_value(query.categories()).unwrap();

    add(&repo, CategoryId::NEWS_FEED, "L");
    let after = serde_json::to_value(query.categories()).unwrap();

    assert_eq!(before, after);
    assert_eq!(query.categories(), categories());
    assert_eq!(query.categories().len(), 2);
    assert_eq!(query.category(CategoryId::NEWS_FEED).unwrap().name, "News feed");
    assert!(matches!(
        query.category(CategoryId(3)).unwrap_err(),
        StoreError::CategoryUnknown(CategoryId(3))
    ));
}

#[test]
fn category_lookup_by_name_is_exact() {
    let repo = SqliteResourceRepository::open_in_memory().unwrap();
    let query = QueryService::new(&repo);

    assert_eq!(query.category_named("Content").unwrap().id, CategoryId::CONTENT);
    assert_eq!(query.category_named("News feed").unwrap().id, CategoryId::NEWS_FEED);
    assert!(matches!(
        query.category_named("content").unwrap_err(),
        StoreError::CategoryNameUnknown(name) if name == "content"
    ));
}
