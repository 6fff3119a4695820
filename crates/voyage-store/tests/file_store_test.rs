//! FileStore behavior against a real temp directory.

use voyage_store::{FileStore, PlanStore, StoreError};
use voyage_test_utils::sample_saved_plan;

fn store(dir: &tempfile::TempDir) -> FileStore {
    FileStore::new(dir.path().join("nested").join("plans.json"))
}

#[tokio::test]
async fn missing_file_lists_empty() {
    let dir = tempfile::tempdir().unwrap();
    assert!(store(&dir).list().await.unwrap().is_empty());
}

#[tokio::test]
async fn put_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    store.put(&sample_saved_plan(1)).await.unwrap();
    assert!(store.path().exists());
}

#[tokio::test]
async fn list_is_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    for id in [200, 300, 100] {
        store.put(&sample_saved_plan(id)).await.unwrap();
    }
    let ids: Vec<i64> = store.list().await.unwrap().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![300, 200, 100]);
}

#[tokio::test]
async fn put_same_id_replaces() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    store.put(&sample_saved_plan(7)).await.unwrap();
    let mut updated = sample_saved_plan(7);
    updated.plan.trip_title = "Second".to_owned();
    store.put(&updated).await.unwrap();

    let plans = store.list().await.unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].plan.trip_title, "Second");
}

#[tokio::test]
async fn delete_removes_only_matching_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    store.put(&sample_saved_plan(1)).await.unwrap();
    store.put(&sample_saved_plan(2)).await.unwrap();

    store.delete(1).await.unwrap();
    store.delete(99).await.unwrap();

    let ids: Vec<i64> = store.list().await.unwrap().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![2]);
}

#[tokio::test]
async fn legacy_record_without_country_reads_as_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plans.json");
    let mut legacy = serde_json::to_value(sample_saved_plan(5)).unwrap();
    legacy.as_object_mut().unwrap().remove("country");
    std::fs::write(&path, serde_json::to_vec(&vec![legacy]).unwrap()).unwrap();

    let plans = FileStore::new(&path).list().await.unwrap();
    assert_eq!(plans[0].trip.country.as_deref(), Some("Japan"));

    // Reading does not rewrite the file.
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(!raw.contains("country"));
}

#[tokio::test]
async fn malformed_file_is_an_error_and_left_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plans.json");
    std::fs::write(&path, "{ not a list").unwrap();
    let store = FileStore::new(&path);

    assert!(matches!(store.list().await, Err(StoreError::Malformed { .. })));
    assert!(store.put(&sample_saved_plan(1)).await.is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not a list");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_puts_all_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);

    for round in 0..10i64 {
        let handles: Vec<_> = (0..8i64)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.put(&sample_saved_plan(round * 100 + i)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    }

    // Updates may be lost under contention, but the file stays readable.
    assert!(!store.list().await.unwrap().is_empty());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("nested"))
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .filter(|name| name != "plans.json")
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
}
