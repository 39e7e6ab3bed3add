use std::sync::{Arc, Barrier};
use std::thread;
use tagnote_core::db::open_db;
use tagnote_core::{CancellationToken, EntityRef, SqliteTagRepository, TagService};

/// Two writers racing on the same fresh label must end with one catalog row
/// and one link each, and neither may see a duplicate-key failure.
#[test]
fn concurrent_writers_share_one_catalog_row_for_a_fresh_label() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.db");

    // Apply migrations once before spawning the contenders.
    drop(open_db(&path).unwrap());

    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for worker in 0..2 {
        let path = path.clone();
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            let mut conn = open_db(&path).unwrap();
            let entity = EntityRef::new("article", format!("a-{worker}"));
            barrier.wait();

            let repo = SqliteTagRepository::try_new(&mut conn).unwrap();
            let mut service = TagService::new(repo);
            service
                .set_tags(&entity, &["new".to_string()], &CancellationToken::new())
                .unwrap();
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let conn = open_db(&path).unwrap();
    let tag_rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM tags WHERE normalized_name = 'NEW';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    let link_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM tag_links;", [], |row| row.get(0))
        .unwrap();

    assert_eq!(tag_rows, 1);
    assert_eq!(link_rows, 2);
}
