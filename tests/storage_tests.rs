use std::time::Duration;

use chrono::Utc;
use files_api::context::RequestContext;
use files_api::storage::{
    Database, DatabaseError, DownloadEvent, MetadataStore, MetadataStoreError, NewFileRecord,
};

fn test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    (dir, db)
}

fn sample_file(bucket: &str, key: &str) -> NewFileRecord {
    NewFileRecord {
        bucket: bucket.to_string(),
        key: key.to_string(),
        display_name: "Holiday Photo.png".to_string(),
        size: 1024,
        mime_type: "image/png".to_string(),
        category: "portfolio-image".to_string(),
    }
}

fn sample_event(file_id: u64, source: Option<&str>) -> DownloadEvent {
    DownloadEvent {
        file_id,
        category: "portfolio-image".to_string(),
        file_name: "Holiday Photo.png".to_string(),
        size: 1024,
        mime_type: "image/png".to_string(),
        source: source.map(str::to_string),
        occurred_at: Utc::now(),
    }
}

#[test]
fn test_create_and_get_file() {
    let (_dir, db) = test_db();

    let created = db.create_file(sample_file("images", "a.png")).unwrap();
    assert_eq!(created.id, 1);

    let retrieved = db.get_file(created.id).unwrap().expect("file should exist");
    assert_eq!(retrieved, created);
    assert_eq!(retrieved.bucket, "images");
    assert_eq!(retrieved.key, "a.png");
    assert_eq!(retrieved.display_name, "Holiday Photo.png");
    assert_eq!(retrieved.size, 1024);
    assert_eq!(retrieved.category, "portfolio-image");
}

#[test]
fn test_ids_increase() {
    let (_dir, db) = test_db();

    let first = db.create_file(sample_file("images", "a.png")).unwrap();
    let second = db.create_file(sample_file("images", "b.png")).unwrap();
    let third = db.create_file(sample_file("documents", "c.pdf")).unwrap();

    assert!(first.id < second.id);
    assert!(second.id < third.id);
}

#[test]
fn test_ids_not_reused_after_delete() {
    let (_dir, db) = test_db();

    let first = db.create_file(sample_file("images", "a.png")).unwrap();
    assert!(db.delete_file(first.id).unwrap());

    let second = db.create_file(sample_file("images", "a.png")).unwrap();
    assert!(second.id > first.id);
}

#[test]
fn test_ids_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let first = {
        let db = Database::open(dir.path().join("data")).unwrap();
        db.create_file(sample_file("images", "a.png")).unwrap()
    };

    let db = Database::open(dir.path().join("data")).unwrap();
    let second = db.create_file(sample_file("images", "b.png")).unwrap();
    assert!(second.id > first.id);
    assert!(db.get_file(first.id).unwrap().is_some());
}

#[test]
fn test_get_file_by_key() {
    let (_dir, db) = test_db();
    let created = db.create_file(sample_file("images", "a.png")).unwrap();

    let retrieved = db
        .get_file_by_key("images", "a.png")
        .unwrap()
        .expect("file should exist");
    assert_eq!(retrieved.id, created.id);

    // Same key in another bucket is a different location
    assert!(db.get_file_by_key("miniatures", "a.png").unwrap().is_none());
}

#[test]
fn test_get_file_not_found() {
    let (_dir, db) = test_db();
    assert!(db.get_file(42).unwrap().is_none());
    assert!(db.get_file_by_key("images", "nope").unwrap().is_none());
}

#[test]
fn test_duplicate_key_rejected() {
    let (_dir, db) = test_db();
    db.create_file(sample_file("images", "a.png")).unwrap();

    let result = db.create_file(sample_file("images", "a.png"));
    assert!(matches!(result, Err(DatabaseError::DuplicateKey { .. })));
    assert_eq!(db.get_file(2).unwrap(), None);
}

#[test]
fn test_delete_file() {
    let (_dir, db) = test_db();
    let created = db.create_file(sample_file("images", "a.png")).unwrap();

    assert!(db.delete_file(created.id).unwrap());
    assert!(db.get_file(created.id).unwrap().is_none());
    assert!(db.get_file_by_key("images", "a.png").unwrap().is_none());

    // Second delete is a no-op
    assert!(!db.delete_file(created.id).unwrap());
}

#[test]
fn test_download_events() {
    let (_dir, db) = test_db();
    let file = db.create_file(sample_file("images", "a.png")).unwrap();
    let other = db.create_file(sample_file("images", "b.png")).unwrap();

    db.append_download_event(&sample_event(file.id, Some("admin-web")))
        .unwrap();
    db.append_download_event(&sample_event(other.id, None))
        .unwrap();
    db.append_download_event(&sample_event(file.id, None))
        .unwrap();

    let events = db.download_events_for(file.id).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].source.as_deref(), Some("admin-web"));
    assert_eq!(events[1].source, None);
}

#[tokio::test]
async fn test_metadata_store_port() {
    let (_dir, db) = test_db();
    let store: &dyn MetadataStore = &db;
    let ctx = RequestContext::background();

    let created = store
        .create(&ctx, sample_file("documents", "r.pdf"))
        .await
        .unwrap();
    assert_eq!(
        store.get_by_id(&ctx, created.id).await.unwrap(),
        Some(created.clone())
    );
    assert_eq!(
        store
            .get_by_key(&ctx, "documents", "r.pdf")
            .await
            .unwrap()
            .map(|r| r.id),
        Some(created.id)
    );
    assert!(store.delete(&ctx, created.id).await.unwrap());
    assert!(!store.delete(&ctx, created.id).await.unwrap());
    assert_eq!(store.get_by_id(&ctx, created.id).await.unwrap(), None);
}

#[tokio::test]
async fn test_metadata_store_respects_expired_deadline() {
    let (_dir, db) = test_db();
    let store: &dyn MetadataStore = &db;
    let expired = RequestContext::new("late").with_timeout(Duration::ZERO);

    let result = store.create(&expired, sample_file("images", "late.png")).await;
    assert!(matches!(result, Err(MetadataStoreError::DeadlineExceeded)));
    assert!(db.get_file_by_key("images", "late.png").unwrap().is_none());

    let created = db.create_file(sample_file("images", "kept.png")).unwrap();
    assert!(matches!(
        store.get_by_id(&expired, created.id).await,
        Err(MetadataStoreError::DeadlineExceeded)
    ));
    assert!(matches!(
        store.delete(&expired, created.id).await,
        Err(MetadataStoreError::DeadlineExceeded)
    ));
    assert!(db.get_file(created.id).unwrap().is_some());
}
