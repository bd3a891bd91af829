//! Feedback service integration tests.

use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};

use super::{TestFixture, FEEDBACK_PASSWORD};

fn feedback_form(user_id: &str, text: &str) -> Form {
    Form::new()
        .text("id", user_id.to_string())
        .text("time", "2025-09-09 12:00:00")
        .text("feedback", text.to_string())
}

async fn submit(fixture: &TestFixture, form: Form) -> reqwest::Response {
    fixture
        .client
        .post(fixture.url("/api/feedback"))
        .multipart(form)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_submit_feedback_without_images() {
    let fixture = TestFixture::feedback().await;

    let response = submit(&fixture, feedback_form("user-1", "Works great")).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["images"], json!([]));

    let body: Value = fixture.get("/api/feedback").await.json().await.unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["user_id"], "user-1");
    assert_eq!(body["data"][0]["feedback"], "Works great");
    assert_eq!(body["data"][0]["note"], "");
}

#[tokio::test]
async fn test_submit_feedback_missing_field() {
    let fixture = TestFixture::feedback().await;

    let form = Form::new().text("id", "user-1").text("time", "now");
    let response = submit(&fixture, form).await;
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"], "Missing required field: feedback");

    let body: Value = fixture.get("/api/feedback").await.json().await.unwrap();
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_images_are_stored_served_and_removed() {
    let mut fixture = TestFixture::feedback().await;

    let form = feedback_form("user-2", "Screenshot attached")
        .part(
            "images",
            Part::bytes(b"fake-png".to_vec()).file_name("screen shot.png"),
        )
        .part(
            "images",
            Part::bytes(b"not an image".to_vec()).file_name("notes.txt"),
        );
    let body: Value = submit(&fixture, form).await.json().await.unwrap();

    let images = body["data"]["images"].as_array().unwrap().clone();
    assert_eq!(images.len(), 1);
    let stored = images[0].as_str().unwrap().to_string();
    assert!(stored.starts_with("user-2_"));
    assert!(stored.ends_with("screen_shot.png"));
    assert!(fixture.upload_dir.join(&stored).exists());

    let response = fixture.get(&format!("/uploads/{}", stored)).await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.bytes().await.unwrap().as_ref(), b"fake-png");

    fixture.login(FEEDBACK_PASSWORD).await;
    let id = body["data"]["id"].as_i64().unwrap();
    let response = fixture.post_empty(&format!("/admin/delete/{}", id)).await;
    assert_eq!(response.status(), 200);

    assert!(!fixture.upload_dir.join(&stored).exists());
    let body: Value = fixture.get("/api/feedback").await.json().await.unwrap();
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_update_note() {
    let mut fixture = TestFixture::feedback().await;
    let body: Value = submit(&fixture, feedback_form("u", "text"))
        .await
        .json()
        .await
        .unwrap();
    let id = body["data"]["id"].as_i64().unwrap();

    fixture.login(FEEDBACK_PASSWORD).await;
    let response = fixture
        .post_json(&format!("/admin/update_note/{}", id), &json!({ "note": "fixed in 2.1" }))
        .await;
    assert_eq!(response.status(), 200);

    let body: Value = fixture.get("/admin").await.json().await.unwrap();
    assert_eq!(body["data"][0]["note"], "fixed in 2.1");

    let response = fixture
        .post_form("/admin/update_note/9999", &[("note", "x")])
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_apk_activation_leaves_one_active() {
    let mut fixture = TestFixture::feedback().await;

    let response = fixture.get("/api/apk/version").await;
    assert_eq!(response.status(), 404);

    fixture.login(FEEDBACK_PASSWORD).await;
    let response = fixture
        .post_json(
            "/admin/apk/add",
            &json!({
                "version_code": "100",
                "version_name": "1.0.0",
                "update_notes": "First release",
                "download_url": "https://cdn.example.com/a.apk",
                "file_size": "2048"
            }),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = fixture
        .post_form(
            "/admin/apk/add",
            &[
                ("version_code", "101"),
                ("update_notes", "Fixes"),
                ("download_url", "http://cdn.example.com/b.apk"),
                ("file_size", "unknown"),
            ],
        )
        .await;
    assert_eq!(response.status(), 200);

    let body: Value = fixture.get("/admin/apk/list").await.json().await.unwrap();
    let versions = body["data"].as_array().unwrap();
    assert_eq!(versions.len(), 2);
    let active: Vec<&Value> = versions
        .iter()
        .filter(|v| v["is_active"] == json!(true))
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["version_code"], "101");
    assert_eq!(active[0]["file_size"], 0);

    let body: Value = fixture.get("/api/apk/version").await.json().await.unwrap();
    assert_eq!(body["version_code"], "101");
    assert_eq!(body["version_name"], "v101");
}

#[tokio::test]
async fn test_latest_apk_version_fields_are_top_level() {
    let mut fixture = TestFixture::feedback().await;

    let response = fixture.get("/api/apk/version").await;
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    fixture.login(FEEDBACK_PASSWORD).await;
    fixture
        .post_json(
            "/admin/apk/add",
            &json!({
                "version_code": "250909",
                "version_name": "2.5.0",
                "update_notes": "Lane guidance",
                "download_url": "https://cdn.example.com/carrot.apk",
                "file_size": 4096
            }),
        )
        .await;

    let body: Value = fixture.get("/api/apk/version").await.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["version_code"], "250909");
    assert_eq!(body["version_name"], "2.5.0");
    assert_eq!(body["update_notes"], "Lane guidance");
    assert_eq!(body["download_url"], "https://cdn.example.com/carrot.apk");
    assert_eq!(body["file_size"], 4096);
    assert!(body["upload_time"].is_string());
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn test_apk_validation_and_conflict() {
    let mut fixture = TestFixture::feedback().await;
    fixture.login(FEEDBACK_PASSWORD).await;

    let response = fixture
        .post_json(
            "/admin/apk/add",
            &json!({
                "version_code": "1",
                "update_notes": "notes",
                "download_url": "ftp://example.com/a.apk"
            }),
        )
        .await;
    assert_eq!(response.status(), 400);

    let version = json!({
        "version_code": "1",
        "update_notes": "notes",
        "download_url": "https://example.com/a.apk"
    });
    assert_eq!(fixture.post_json("/admin/apk/add", &version).await.status(), 200);

    let response = fixture.post_json("/admin/apk/add", &version).await;
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "CONFLICT");

    // The original row stays active
    let body: Value = fixture.get("/api/apk/version").await.json().await.unwrap();
    assert_eq!(body["version_code"], "1");
}

#[tokio::test]
async fn test_donation_dedup_per_device() {
    let mut fixture = TestFixture::feedback().await;

    let response = fixture
        .post_json("/api/donation", &json!({ "amount": 10, "device_id": "DEV-1" }))
        .await;
    assert_eq!(response.status(), 200);

    let response = fixture
        .post_form("/api/donation", &[("amount", "25.5"), ("device_id", "DEV-1")])
        .await;
    assert_eq!(response.status(), 200);

    fixture
        .post_json("/api/donation", &json!({ "amount": "5" }))
        .await;

    let body: Value = fixture.get("/api/donations").await.json().await.unwrap();
    assert_eq!(body["count"], 2);
    let rows = body["data"].as_array().unwrap();
    let device_rows: Vec<&Value> = rows.iter().filter(|r| r["device_id"] == "DEV-1").collect();
    assert_eq!(device_rows.len(), 1);
    assert_eq!(device_rows[0]["amount"], 25.5);

    fixture.login(FEEDBACK_PASSWORD).await;
    let body: Value = fixture
        .get("/admin/donations/list")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 2);

    let id = device_rows[0]["id"].as_i64().unwrap();
    let response = fixture
        .post_empty(&format!("/admin/donations/delete/{}", id))
        .await;
    assert_eq!(response.status(), 200);
    let response = fixture
        .post_empty(&format!("/admin/donations/delete/{}", id))
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_donation_rejects_bad_amounts() {
    let fixture = TestFixture::feedback().await;

    for amount in [json!(0), json!(-3), json!("abc"), json!(null)] {
        let response = fixture
            .post_json("/api/donation", &json!({ "amount": amount }))
            .await;
        assert_eq!(response.status(), 400, "amount {:?}", amount);
    }

    let body: Value = fixture.get("/api/donations").await.json().await.unwrap();
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_admin_routes_require_session() {
    let fixture = TestFixture::feedback().await;

    let body: Value = submit(&fixture, feedback_form("u", "keep me"))
        .await
        .json()
        .await
        .unwrap();
    let id = body["data"]["id"].as_i64().unwrap();
    fixture
        .post_json("/api/donation", &json!({ "amount": 3, "device_id": "D" }))
        .await;

    let posts = [
        format!("/admin/delete/{}", id),
        format!("/admin/update_note/{}", id),
        "/admin/apk/add".to_string(),
        "/admin/apk/delete/1".to_string(),
        "/admin/donations/delete/1".to_string(),
    ];
    for path in &posts {
        let response = fixture
            .post_json(
                path,
                &json!({
                    "note": "hacked",
                    "version_code": "9",
                    "update_notes": "x",
                    "download_url": "https://x"
                }),
            )
            .await;
        assert_eq!(response.status(), 401, "{}", path);
    }
    for path in ["/admin", "/admin/apk/list", "/admin/donations/list"] {
        assert_eq!(fixture.get(path).await.status(), 401, "{}", path);
    }

    // Nothing changed
    let body: Value = fixture.get("/api/feedback").await.json().await.unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["note"], "");
    assert_eq!(fixture.get("/api/apk/version").await.status(), 404);
    let body: Value = fixture.get("/api/donations").await.json().await.unwrap();
    assert_eq!(body["count"], 1);
}
