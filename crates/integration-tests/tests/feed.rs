//! Community feed: posts, filters, likes and post comments.

#![allow(clippy::unwrap_used)]

use katha_vault_integration_tests::{ADMIN_EMAIL, TestApp, TestClient};
use serde_json::{Value, json};

async fn post(client: &TestClient, content: &str, genre: Option<&str>) -> Value {
    let res = client
        .post("/api/posts")
        .json(&json!({"content": content, "genre_tag": genre}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    res.json().await.unwrap()
}

#[tokio::test]
async fn test_feed_is_newest_first_with_filters() {
    let app = TestApp::spawn().await;
    let mira = app.client();
    let mira_user = mira.sign_up("Mira K", "mira").await;
    let vik = app.client();
    vik.sign_up("Vikram", "vik").await;

    post(&mira, "Chapter 3 of The River King is up!", Some("Fantasy")).await;
    post(&vik, "Anyone else reading lighthouse romances?", Some("Romance")).await;
    post(&mira, "Taking a week off to plot.", None).await;

    let anon = app.client();
    let all = anon.get_json("/api/posts").await;
    let contents: Vec<&str> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["content"].as_str().unwrap())
        .collect();
    assert_eq!(
        contents,
        vec![
            "Taking a week off to plot.",
            "Anyone else reading lighthouse romances?",
            "Chapter 3 of The River King is up!",
        ]
    );

    let fantasy = anon.get_json("/api/posts?genre=fantasy").await;
    assert_eq!(fantasy.as_array().unwrap().len(), 1);

    let by_mira = anon
        .get_json(&format!("/api/posts?author={}", mira_user["id"]))
        .await;
    assert_eq!(by_mira.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_following_feed_requires_session() {
    let app = TestApp::spawn().await;
    let mira = app.client();
    let mira_user = mira.sign_up("Mira K", "mira").await;
    let vik = app.client();
    vik.sign_up("Vikram", "vik").await;
    post(&mira, "New chapter tonight", None).await;
    post(&vik, "Reading list for the monsoon", None).await;

    let res = app.client().get("/api/posts?following=true").send().await.unwrap();
    assert_eq!(res.status(), 401);

    let asha = app.client();
    asha.sign_up("Asha Rao", "asha").await;
    assert!(asha.get_json("/api/posts?following=true").await.as_array().unwrap().is_empty());

    let res = asha
        .put(&format!("/api/following/{}", mira_user["id"]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);
    let followed = asha.get_json("/api/posts?following=true").await;
    assert_eq!(followed.as_array().unwrap().len(), 1);
    assert_eq!(followed[0]["author"], "Mira K");
}

#[tokio::test]
async fn test_post_likes_and_comments() {
    let app = TestApp::spawn().await;
    let mira = app.client();
    mira.sign_up("Mira K", "mira").await;
    let asha = app.client();
    asha.sign_up("Asha Rao", "asha").await;

    let created = post(&mira, "Which character should return?", None).await;
    let pid = created["id"].as_i64().unwrap();

    let like: Value = asha
        .post(&format!("/api/posts/{pid}/like"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(like, json!({"liked": true, "likes": 1}));

    let comment: Value = asha
        .post(&format!("/api/posts/{pid}/comments"))
        .json(&json!({"text": "The ferryman, obviously."}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let reply = mira
        .post(&format!("/api/posts/{pid}/comments"))
        .json(&json!({"text": "Noted!", "parent_id": comment["id"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(reply.status(), 201);

    let res = mira
        .post(&format!("/api/posts/{pid}/comments/{}/like", comment["id"]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let feed = asha.get_json("/api/posts").await;
    assert_eq!(feed[0]["liked"], true);
    assert_eq!(feed[0]["comment_count"], 2);
    assert_eq!(feed[0]["comments"][0]["likes"], 1);
    assert_eq!(feed[0]["comments"][0]["liked"], false);

    let res = mira
        .delete(&format!("/api/posts/{pid}/comments/{}", comment["id"]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);
    let res = asha
        .delete(&format!("/api/posts/{pid}/comments/{}", comment["id"]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);
    assert_eq!(asha.get_json("/api/posts").await[0]["comment_count"], 0);
}

#[tokio::test]
async fn test_post_delete_by_author_or_admin() {
    let app = TestApp::spawn().await;
    let mira = app.client();
    mira.sign_up("Mira K", "mira").await;
    let asha = app.client();
    asha.sign_up("Asha Rao", "asha").await;
    let admin = app.client();
    admin.sign_up_as("Editor", "editor", ADMIN_EMAIL).await;

    let first = post(&mira, "First", None).await["id"].as_i64().unwrap();
    let second = post(&mira, "Second", None).await["id"].as_i64().unwrap();

    assert_eq!(asha.delete(&format!("/api/posts/{first}")).send().await.unwrap().status(), 403);
    assert_eq!(mira.delete(&format!("/api/posts/{first}")).send().await.unwrap().status(), 204);
    assert_eq!(admin.delete(&format!("/api/posts/{second}")).send().await.unwrap().status(), 204);
    assert!(asha.get_json("/api/posts").await.as_array().unwrap().is_empty());
    assert_eq!(mira.delete(&format!("/api/posts/{first}")).send().await.unwrap().status(), 404);
}

#[tokio::test]
async fn test_empty_post_is_rejected() {
    let app = TestApp::spawn().await;
    let mira = app.client();
    mira.sign_up("Mira K", "mira").await;
    let res = mira
        .post("/api/posts")
        .json(&json!({"content": "  "}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 422);
}
