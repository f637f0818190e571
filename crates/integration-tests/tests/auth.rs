//! Sign-up, sign-in, sessions and account deactivation.

#![allow(clippy::unwrap_used)]

use katha_vault_integration_tests::{ADMIN_EMAIL, PASSWORD, TestApp};
use serde_json::{Value, json};

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let res = client.get("/health").send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "ok");

    let res = client.get("/health/ready").send().await.unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn test_sign_up_starts_session() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let user = client.sign_up("Asha Rao", "Asha_R").await;
    assert_eq!(user["username"], "asha_r");
    assert_eq!(user["role"], "reader");
    assert_eq!(user["active"], true);

    let me = client.get_json("/api/auth/me").await;
    assert_eq!(me["id"], user["id"]);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::spawn().await;
    let res = app
        .client()
        .get("/health")
        .header("x-request-id", "trace-123")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "trace-123");
}

#[tokio::test]
async fn test_sign_up_validation_errors_are_per_field() {
    let app = TestApp::spawn().await;
    let res = app
        .client()
        .post("/api/auth/sign-up")
        .json(&json!({
            "name": "A",
            "username": "asha",
            "email": "not-an-email",
            "password": "short",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 422);

    let body: Value = res.json().await.unwrap();
    let fields = body["fields"].as_object().unwrap();
    assert!(fields.contains_key("name"));
    assert!(fields.contains_key("email"));
    assert!(fields.contains_key("password"));
    assert!(!fields.contains_key("username"));
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = TestApp::spawn().await;
    app.client().sign_up("Asha Rao", "asha").await;

    let res = app
        .client()
        .post("/api/auth/sign-up")
        .json(&json!({
            "name": "Someone Else",
            "username": "someone",
            "email": "asha@katha.test",
            "password": PASSWORD,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 409);
}

#[tokio::test]
async fn test_sign_out_then_sign_in() {
    let app = TestApp::spawn().await;
    let client = app.client();
    client.sign_up("Asha Rao", "asha").await;

    let res = client.post("/api/auth/sign-out").send().await.unwrap();
    assert_eq!(res.status(), 204);
    let res = client.get("/api/auth/me").send().await.unwrap();
    assert_eq!(res.status(), 401);

    let res = client
        .post("/api/auth/sign-in")
        .json(&json!({"email": "asha@katha.test", "password": "wrong password"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    let res = client
        .post("/api/auth/sign-in")
        .json(&json!({"email": "ASHA@katha.test", "password": PASSWORD}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(client.get_json("/api/auth/me").await["username"], "asha");
}

#[tokio::test]
async fn test_admin_email_gets_admin_role() {
    let app = TestApp::spawn().await;
    let admin = app.client().sign_up_as("Editor", "editor", ADMIN_EMAIL).await;
    assert_eq!(admin["role"], "admin");
}

#[tokio::test]
async fn test_deactivated_account_is_locked_out() {
    let app = TestApp::spawn().await;
    let admin = app.client();
    admin.sign_up_as("Editor", "editor", ADMIN_EMAIL).await;
    let reader = app.client();
    let user = reader.sign_up("Asha Rao", "asha").await;

    let res = admin
        .post(&format!("/api/admin/users/{}/active", user["id"]))
        .json(&json!({"active": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    // The live session is rejected and cleared.
    let res = reader.get("/api/auth/me").send().await.unwrap();
    assert_eq!(res.status(), 403);
    let res = reader.get("/api/auth/me").send().await.unwrap();
    assert_eq!(res.status(), 401);

    let res = app
        .client()
        .post("/api/auth/sign-in")
        .json(&json!({"email": "asha@katha.test", "password": PASSWORD}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);
}

#[tokio::test]
async fn test_profile_update_renames_novels() {
    let app = TestApp::spawn().await;
    let author = app.client();
    author.sign_up("Mira K", "mira").await;
    let novel = author.create_novel("The River King", &["Fantasy"]).await;
    author.publish(novel["id"].as_i64().unwrap()).await;

    let res = author
        .put("/api/profile")
        .json(&json!({"name": "Mira Kapoor", "bio": "Writes about rivers."}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let profile = app.client().get_json("/api/users/mira").await;
    assert_eq!(profile["name"], "Mira Kapoor");
    assert_eq!(profile["bio"], "Writes about rivers.");
    assert_eq!(profile["novels"][0]["author"], "Mira Kapoor");
    assert!(profile.get("email").is_none());
}
