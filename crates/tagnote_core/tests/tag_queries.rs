use rusqlite::Connection;
use tagnote_core::db::open_db_in_memory;
use tagnote_core::{CancellationToken, EntityRef, SqliteTagRepository, TagService};

fn set_tags(conn: &mut Connection, entity: &EntityRef, labels: &[&str]) {
    let labels: Vec<String> = labels.iter().map(|label| label.to_string()).collect();
    let repo = SqliteTagRepository::try_new(conn).unwrap();
    let mut service = TagService::new(repo);
    service
        .set_tags(entity, &labels, &CancellationToken::new())
        .unwrap();
}

fn tagged_entities(conn: &mut Connection, labels: &[&str]) -> Vec<EntityRef> {
    let labels: Vec<String> = labels.iter().map(|label| label.to_string()).collect();
    let repo = SqliteTagRepository::try_new(conn).unwrap();
    let service = TagService::new(repo);
    service
        .tagged_entities(&labels, &CancellationToken::new())
        .unwrap()
}

#[test]
fn any_of_query_returns_each_entity_once() {
    let mut conn = open_db_in_memory().unwrap();
    let e1 = EntityRef::new("article", "a-1");
    let e2 = EntityRef::new("article", "a-2");
    let both = EntityRef::new("reader", "7");

    set_tags(&mut conn, &e1, &["x"]);
    set_tags(&mut conn, &e2, &["y"]);
    set_tags(&mut conn, &both, &["x", "y"]);

    let found = tagged_entities(&mut conn, &["x", "y"]);
    assert_eq!(found.len(), 3);
    assert_eq!(found, vec![e1, e2, both]);
}

#[test]
fn query_labels_match_case_insensitively() {
    let mut conn = open_db_in_memory().unwrap();
    let entity = EntityRef::new("article", "a-1");
    set_tags(&mut conn, &entity, &["Rust"]);

    assert_eq!(tagged_entities(&mut conn, &["RUST"]), vec![entity.clone()]);
    assert_eq!(tagged_entities(&mut conn, &["rust"]), vec![entity]);
}

#[test]
fn unknown_and_blank_labels_match_nothing() {
    let mut conn = open_db_in_memory().unwrap();
    let entity = EntityRef::new("article", "a-1");
    set_tags(&mut conn, &entity, &["known"]);

    assert!(tagged_entities(&mut conn, &["unknown"]).is_empty());
    assert!(tagged_entities(&mut conn, &[""]).is_empty());
    assert!(tagged_entities(&mut conn, &[]).is_empty());
}

#[test]
fn results_are_ordered_by_earliest_matching_link() {
    let mut conn = open_db_in_memory().unwrap();
    let late = EntityRef::new("article", "late");
    let early = EntityRef::new("article", "early");

    set_tags(&mut conn, &late, &["other"]);
    set_tags(&mut conn, &early, &["wanted"]);
    set_tags(&mut conn, &late, &["other", "wanted"]);

    let found = tagged_entities(&mut conn, &["wanted"]);
    assert_eq!(found, vec![early, late]);
}

#[test]
fn catalog_listing_is_sorted_and_includes_orphans() {
    let mut conn = open_db_in_memory().unwrap();
    let entity = EntityRef::new("article", "a-1");

    set_tags(&mut conn, &entity, &["zebra", "apple"]);
    set_tags(&mut conn, &entity, &["apple"]);

    let repo = SqliteTagRepository::try_new(&mut conn).unwrap();
    let service = TagService::new(repo);
    let catalog = service.list_tags(&CancellationToken::new()).unwrap();

    let normalized: Vec<&str> = catalog
        .iter()
        .map(|tag| tag.normalized_name.as_str())
        .collect();
    assert_eq!(normalized, vec!["APPLE", "ZEBRA"]);
}
