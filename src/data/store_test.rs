//! Store tests

use super::*;
use serde_json::json;
use tempfile::TempDir;

/// Helper to create a test store
async fn create_test_store() -> (SqliteStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let store = SqliteStore::connect(&db_path).await.unwrap();
    (store, temp_dir)
}

#[tokio::test]
async fn test_store_connection() {
    let (store, _temp_dir) = create_test_store().await;
    assert_eq!(store.get("").await.unwrap(), None);
}

#[tokio::test]
async fn test_set_and_get_nested_document() {
    let (store, _temp_dir) = create_test_store().await;

    let document = json!({
        "id": "a1",
        "status": "pending",
        "contact": { "email": "juan@example.com", "phone": "0917" },
        "tags": ["noise", "night"],
        "count": 3,
        "flag": false,
    });
    store.set("appointments/a1", document.clone()).await.unwrap();

    assert_eq!(store.get("appointments/a1").await.unwrap(), Some(document));
    assert_eq!(
        store.get("appointments/a1/contact/email").await.unwrap(),
        Some(json!("juan@example.com"))
    );
    assert_eq!(
        store.get("appointments").await.unwrap().unwrap()["a1"]["tags"],
        json!(["noise", "night"])
    );
}

#[tokio::test]
async fn test_set_replaces_whole_subtree() {
    let (store, _temp_dir) = create_test_store().await;

    store
        .set("events/e1", json!({ "name": "Clean-up Drive", "featured": true }))
        .await
        .unwrap();
    store
        .set("events/e1", json!({ "name": "Feeding Program" }))
        .await
        .unwrap();

    assert_eq!(
        store.get("events/e1").await.unwrap(),
        Some(json!({ "name": "Feeding Program" }))
    );
}

#[tokio::test]
async fn test_update_merges_fields() {
    let (store, _temp_dir) = create_test_store().await;

    store
        .set("blotter/b1", json!({ "status": "pending", "priority": "low", "notes": "x" }))
        .await
        .unwrap();

    let mut fields = serde_json::Map::new();
    fields.insert("status".to_string(), json!("investigating"));
    fields.insert("notes".to_string(), serde_json::Value::Null);
    fields.insert("meta/reviewer".to_string(), json!("staff-1"));
    store.update("blotter/b1", fields).await.unwrap();

    assert_eq!(
        store.get("blotter/b1").await.unwrap(),
        Some(json!({
            "status": "investigating",
            "priority": "low",
            "meta": { "reviewer": "staff-1" },
        }))
    );
}

#[tokio::test]
async fn test_write_below_scalar_replaces_it() {
    let (store, _temp_dir) = create_test_store().await;

    store.set("users/u1/profile", json!("legacy")).await.unwrap();
    store.set("users/u1/profile/email", json!("a@b.c")).await.unwrap();

    assert_eq!(
        store.get("users/u1").await.unwrap(),
        Some(json!({ "profile": { "email": "a@b.c" } }))
    );
}

#[tokio::test]
async fn test_remove_leaves_siblings() {
    let (store, _temp_dir) = create_test_store().await;

    store.set("blotter/b1", json!({ "type": "Noise" })).await.unwrap();
    store.set("blotter/b10", json!({ "type": "Theft" })).await.unwrap();
    store.remove("blotter/b1").await.unwrap();

    assert_eq!(store.get("blotter/b1").await.unwrap(), None);
    assert_eq!(
        store.get("blotter/b10/type").await.unwrap(),
        Some(json!("Theft"))
    );
}

#[tokio::test]
async fn test_query_by_child() {
    let (store, _temp_dir) = create_test_store().await;

    store
        .set("appointments/a1", json!({ "userId": "u1", "status": "pending" }))
        .await
        .unwrap();
    store
        .set("appointments/a2", json!({ "userId": "u2", "status": "pending" }))
        .await
        .unwrap();
    store
        .set(
            "residents/r1",
            json!({ "verification": { "status": "verified" } }),
        )
        .await
        .unwrap();

    let rows = store
        .query_by_child("appointments", "userId", json!("u2"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, "a2");

    let rows = store
        .query_by_child("residents", "verification/status", json!("verified"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);

    let rows = store
        .query_by_child("missing", "status", json!("pending"))
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_write_paths_rejects_overlapping_paths() {
    let (store, _temp_dir) = create_test_store().await;

    store.set("certificates/c1", json!({ "status": "pending" })).await.unwrap();

    let result = store
        .write_paths(vec![
            PathWrite::delete("certificates/c1"),
            PathWrite::put("archives/certificates/c1", json!({ "id": "c1" })),
            PathWrite::put("archives/certificates/c1/extra", json!(1)),
        ])
        .await;
    assert!(matches!(result, Err(crate::error::AppError::Validation(_))));

    assert_eq!(
        store.get("certificates/c1").await.unwrap(),
        Some(json!({ "status": "pending" }))
    );
    assert_eq!(store.get("archives").await.unwrap(), None);
}

#[tokio::test]
async fn test_increment_seeds_then_counts() {
    let (store, _temp_dir) = create_test_store().await;

    assert_eq!(store.increment("counters/appointments", 6).await.unwrap(), 6);
    assert_eq!(store.increment("counters/appointments", 6).await.unwrap(), 7);
    assert_eq!(store.increment("counters/appointments", 1).await.unwrap(), 8);
    assert_eq!(
        store.get("counters/appointments").await.unwrap(),
        Some(json!(8))
    );
}

#[tokio::test]
async fn test_concurrent_increments_are_distinct() {
    let (store, _temp_dir) = create_test_store().await;
    let store = std::sync::Arc::new(store);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.increment("counters/blotter", 1).await.unwrap()
        }));
    }

    let mut values = Vec::new();
    for handle in handles {
        values.push(handle.await.unwrap());
    }
    values.sort();
    assert_eq!(values, (1..=8).collect::<Vec<i64>>());
}
