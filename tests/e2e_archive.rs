//! E2E tests for soft delete, restore and purge

mod common;

use common::TestServer;
use serde_json::json;

fn blotter_report() -> serde_json::Value {
    json!({
        "type": "Noise complaint",
        "description": "Loud karaoke past midnight",
        "reportedBy": "Jose Cruz",
        "contactNumber": "09181234567",
        "email": "jose@example.com",
        "priority": "medium",
        "location": "Purok 3"
    })
}

#[tokio::test]
async fn test_delete_then_restore_reproduces_record() {
    let server = TestServer::new().await;
    let (_, created) = server.post("/api/blotter", blotter_report()).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();
    let (_, before) = server.get(&format!("/api/blotter/{id}")).await;

    let (status, archived) = server
        .delete(&format!("/api/blotter/{id}?archivedBy=official-1"))
        .await;
    assert_eq!(status, 200);
    assert_eq!(archived["data"]["archivedBy"], "official-1");
    assert_eq!(archived["data"]["preview"]["type"], "Noise complaint");

    let (status, _) = server.get(&format!("/api/blotter/{id}")).await;
    assert_eq!(status, 404);

    let (_, listing) = server.get("/api/archives?entity=blotter").await;
    assert_eq!(listing["data"].as_array().unwrap().len(), 1);

    let (status, _) = server
        .post(&format!("/api/archives/blotter/{id}/restore"), json!({}))
        .await;
    assert_eq!(status, 200);

    let (_, after) = server.get(&format!("/api/blotter/{id}")).await;
    assert_eq!(after, before);
    let (_, listing) = server.get("/api/archives").await;
    assert_eq!(listing["data"], json!([]));
}

#[tokio::test]
async fn test_purge_removes_entry_for_good() {
    let server = TestServer::new().await;
    let (_, created) = server
        .post(
            "/api/events",
            json!({
                "name": "Feeding Program",
                "date": common::local_date(7),
                "time": "08:00",
                "location": "Day Care Center",
                "description": "Lugaw for kids",
                "category": "Health",
                "organizer": "BHW",
                "contact": "09190000000"
            }),
        )
        .await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    server.delete(&format!("/api/events/{id}")).await;
    let (status, _) = server.delete(&format!("/api/archives/events/{id}")).await;
    assert_eq!(status, 200);

    let (status, _) = server
        .post(&format!("/api/archives/events/{id}/restore"), json!({}))
        .await;
    assert_eq!(status, 404);
    let (status, _) = server.get(&format!("/api/events/{id}")).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_deleting_unknown_record_is_not_found() {
    let server = TestServer::new().await;

    let (status, json) = server.delete("/api/certificates/nope").await;

    assert_eq!(status, 404);
    assert_eq!(json["success"], false);
    let (_, listing) = server.get("/api/archives").await;
    assert_eq!(listing["data"], json!([]));
}

fn registration() -> serde_json::Value {
    json!({
        "personalInfo": {"firstName": "Ana", "lastName": "Lopez"},
        "contactInfo": {"email": "ana@example.com", "phone": "09201234567"},
        "addressInfo": {"street": "Mabini St."},
        "emergencyContact": {"name": "Luis Lopez", "relationship": "Father", "phone": "09201111111"},
        "idFrontPhotoUrl": "https://files.test.example.com/ids/f.jpg",
        "idBackPhotoUrl": "https://files.test.example.com/ids/b.jpg",
        "selfiePhotoUrl": "https://files.test.example.com/ids/s.jpg"
    })
}

#[tokio::test]
async fn test_resident_and_profile_restore_together() {
    let server = TestServer::new().await;
    server
        .state
        .store
        .set("users/u9", json!({"email": "ana@example.com", "role": "resident"}))
        .await
        .unwrap();

    let (status, _) = server.put("/api/residents/u9", registration()).await;
    assert_eq!(status, 200);
    let profile_before = server.state.store.get("users/u9").await.unwrap();

    let (status, archived) = server.delete("/api/residents/u9").await;
    assert_eq!(status, 200);
    assert_eq!(archived["data"]["paths"].as_array().unwrap().len(), 2);
    assert!(server.state.store.get("users/u9").await.unwrap().is_none());

    server
        .post("/api/archives/residents/u9/restore", json!({}))
        .await;

    assert_eq!(server.state.store.get("users/u9").await.unwrap(), profile_before);
    let (_, resident) = server.get("/api/residents/u9").await;
    assert_eq!(resident["data"]["verification"]["status"], "pending");
    assert_eq!(resident["data"]["uid"], "u9");
}

#[tokio::test]
async fn test_reregistered_resident_conflicts_instead_of_overwriting() {
    let server = TestServer::new().await;
    let (status, _) = server.put("/api/residents/u7", registration()).await;
    assert_eq!(status, 200);
    let (status, _) = server
        .post(
            "/api/residents/u7/verification",
            json!({"status": "verified", "reviewedBy": "admin-1"}),
        )
        .await;
    assert_eq!(status, 200);

    let (status, json) = server.put("/api/residents/u7", registration()).await;
    assert_eq!(status, 409);
    assert_eq!(json["success"], false);

    let (status, _) = server.delete("/api/residents/u7?archivedBy=staff-a").await;
    assert_eq!(status, 200);
    let (status, _) = server.put("/api/residents/u7", registration()).await;
    assert_eq!(status, 200);

    let (status, _) = server
        .post("/api/archives/residents/u7/restore", json!({}))
        .await;
    assert_eq!(status, 409);
    let (status, _) = server.delete("/api/residents/u7?archivedBy=staff-b").await;
    assert_eq!(status, 409);

    let (_, entry) = server.get("/api/archives/residents/u7").await;
    assert_eq!(entry["data"]["archivedBy"], "staff-a");
    assert_eq!(entry["data"]["preview"]["verificationStatus"], "verified");
}
