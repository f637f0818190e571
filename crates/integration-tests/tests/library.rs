//! Reader library and follows.

#![allow(clippy::unwrap_used)]

use katha_vault_integration_tests::TestApp;
use serde_json::Value;

#[tokio::test]
async fn test_save_and_unsave_novels() {
    let app = TestApp::spawn().await;
    let mira = app.client();
    mira.sign_up("Mira K", "mira").await;
    let published = mira.create_novel("The River King", &["Fantasy"]).await["id"]
        .as_i64()
        .unwrap();
    mira.publish(published).await;
    let draft = mira.create_novel("Unfinished", &["Fantasy"]).await["id"]
        .as_i64()
        .unwrap();

    let asha = app.client();
    asha.sign_up("Asha Rao", "asha").await;

    let res = asha.put(&format!("/api/library/{published}")).send().await.unwrap();
    assert_eq!(res.status(), 204);
    // Saving twice keeps one entry.
    asha.put(&format!("/api/library/{published}")).send().await.unwrap();
    let res = asha.put(&format!("/api/library/{draft}")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    let shelf = asha.get_json("/api/library").await;
    assert_eq!(shelf.as_array().unwrap().len(), 1);
    assert_eq!(shelf[0]["title"], "The River King");

    // Unpublished novels drop off the shelf without being forgotten.
    mira.post(&format!("/api/novels/{published}/unpublish")).send().await.unwrap();
    assert!(asha.get_json("/api/library").await.as_array().unwrap().is_empty());
    mira.publish(published).await;
    assert_eq!(asha.get_json("/api/library").await.as_array().unwrap().len(), 1);

    let res = asha.delete(&format!("/api/library/{published}")).send().await.unwrap();
    assert_eq!(res.status(), 204);
    assert!(asha.get_json("/api/library").await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_deleted_novel_leaves_library_without_aliasing() {
    let app = TestApp::spawn().await;
    let mira = app.client();
    mira.sign_up("Mira K", "mira").await;
    let saved = mira.create_novel("The River King", &["Fantasy"]).await["id"]
        .as_i64()
        .unwrap();
    mira.publish(saved).await;

    let asha = app.client();
    asha.sign_up("Asha Rao", "asha").await;
    asha.put(&format!("/api/library/{saved}")).send().await.unwrap();
    assert_eq!(asha.get_json("/api/library").await.as_array().unwrap().len(), 1);

    let res = mira.delete(&format!("/api/novels/{saved}")).send().await.unwrap();
    assert_eq!(res.status(), 204);
    let other = mira.create_novel("Totally Different", &["Romance"]).await["id"]
        .as_i64()
        .unwrap();
    mira.publish(other).await;

    let shelf: Value = asha.get_json("/api/library").await;
    assert!(shelf.as_array().unwrap().is_empty(), "unexpected shelf {shelf}");
}

#[tokio::test]
async fn test_library_requires_sign_in() {
    let app = TestApp::spawn().await;
    let res = app.client().get("/api/library").send().await.unwrap();
    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn test_follow_rules() {
    let app = TestApp::spawn().await;
    let mira = app.client();
    let mira_user = mira.sign_up("Mira K", "mira").await;
    let asha = app.client();
    let asha_user = asha.sign_up("Asha Rao", "asha").await;

    let res = asha.put(&format!("/api/following/{}", asha_user["id"])).send().await.unwrap();
    assert_eq!(res.status(), 400);
    let res = asha.put("/api/following/999").send().await.unwrap();
    assert_eq!(res.status(), 404);

    let res = asha.put(&format!("/api/following/{}", mira_user["id"])).send().await.unwrap();
    assert_eq!(res.status(), 204);
    let following: Value = asha.get_json("/api/following").await;
    assert_eq!(following.as_array().unwrap().len(), 1);
    assert_eq!(following[0]["username"], "mira");
    assert!(following[0].get("email").is_none());

    let res = asha
        .delete(&format!("/api/following/{}", mira_user["id"]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);
    assert!(asha.get_json("/api/following").await.as_array().unwrap().is_empty());
}
