//! Admin moderation: dashboard, user and novel search, comment moderation
//! and the home page layout.

#![allow(clippy::unwrap_used)]

use katha_vault_integration_tests::{ADMIN_EMAIL, TestApp, TestClient};
use serde_json::{Value, json};

struct World {
    admin: TestClient,
    admin_user: Value,
    mira: TestClient,
    asha: TestClient,
    asha_user: Value,
    novel_id: i64,
    chapter_id: i64,
}

async fn world(app: &TestApp) -> World {
    let admin = app.client();
    let admin_user = admin.sign_up_as("Editor", "editor", ADMIN_EMAIL).await;
    let mira = app.client();
    mira.sign_up("Mira K", "mira").await;
    let asha = app.client();
    let asha_user = asha.sign_up("Asha Rao", "asha").await;

    let novel_id = mira.create_novel("The River King", &["Fantasy"]).await["id"]
        .as_i64()
        .unwrap();
    let chapter_id = mira.add_chapter(novel_id, "The Crossing").await;
    mira.publish(novel_id).await;
    mira.create_novel("Unfinished Draft", &["Mystery"]).await;

    World {
        admin,
        admin_user,
        mira,
        asha,
        asha_user,
        novel_id,
        chapter_id,
    }
}

#[tokio::test]
async fn test_admin_routes_are_guarded() {
    let app = TestApp::spawn().await;
    let w = world(&app).await;

    let res = app.client().get("/api/admin/stats").send().await.unwrap();
    assert_eq!(res.status(), 401);
    let res = w.asha.get("/api/admin/stats").send().await.unwrap();
    assert_eq!(res.status(), 403);
    let res = w.mira.get("/api/admin/users").send().await.unwrap();
    assert_eq!(res.status(), 403);
}

#[tokio::test]
async fn test_dashboard_counts_everything() {
    let app = TestApp::spawn().await;
    let w = world(&app).await;

    let path = format!("/api/novels/{}/chapters/{}/comments", w.novel_id, w.chapter_id);
    w.asha.post(&path).json(&json!({"text": "Lovely"})).send().await.unwrap();
    w.asha
        .post("/api/posts")
        .json(&json!({"content": "Just finished chapter one"}))
        .send()
        .await
        .unwrap();
    w.asha
        .get(&format!("/api/novels/{}/chapters/{}", w.novel_id, w.chapter_id))
        .send()
        .await
        .unwrap();

    let stats = w.admin.get_json("/api/admin/stats").await;
    assert_eq!(stats["users"], 3);
    assert_eq!(stats["inactive_users"], 0);
    assert_eq!(stats["novels"], 2);
    assert_eq!(stats["published_novels"], 1);
    assert_eq!(stats["draft_novels"], 1);
    assert_eq!(stats["chapters"], 1);
    assert_eq!(stats["total_views"], 1);
    assert_eq!(stats["posts"], 1);
    assert_eq!(stats["comments"], 1);
}

#[tokio::test]
async fn test_user_search_and_deactivation() {
    let app = TestApp::spawn().await;
    let w = world(&app).await;

    let found = w.admin.get_json("/api/admin/users?q=asha").await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["email"], "asha@katha.test");

    let res = w
        .admin
        .post(&format!("/api/admin/users/{}/active", w.admin_user["id"]))
        .json(&json!({"active": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let res = w
        .admin
        .post(&format!("/api/admin/users/{}/active", w.asha_user["id"]))
        .json(&json!({"active": false}))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["active"], false);

    let inactive = w.admin.get_json("/api/admin/users?active=false").await;
    assert_eq!(inactive.as_array().unwrap().len(), 1);
    assert_eq!(
        app.client().get("/api/users/asha").send().await.unwrap().status(),
        404
    );

    let res = w
        .admin
        .post("/api/admin/users/999/active")
        .json(&json!({"active": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn test_novel_search_includes_drafts_and_delete() {
    let app = TestApp::spawn().await;
    let w = world(&app).await;

    let all = w.admin.get_json("/api/admin/novels").await;
    assert_eq!(all.as_array().unwrap().len(), 2);
    let drafts = w.admin.get_json("/api/admin/novels?status=draft").await;
    assert_eq!(drafts[0]["title"], "Unfinished Draft");
    let by_title = w.admin.get_json("/api/admin/novels?q=river").await;
    assert_eq!(by_title.as_array().unwrap().len(), 1);

    let path = format!("/api/novels/{}/chapters/{}/comments", w.novel_id, w.chapter_id);
    w.asha.post(&path).json(&json!({"text": "Lovely"})).send().await.unwrap();

    let res = w
        .admin
        .delete(&format!("/api/admin/novels/{}", w.novel_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);
    let res = app
        .client()
        .get(&format!("/api/novels/{}", w.novel_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(w.admin.get_json("/api/admin/stats").await["comments"], 0);
}

#[tokio::test]
async fn test_comment_moderation_across_chapters_and_posts() {
    let app = TestApp::spawn().await;
    let w = world(&app).await;

    let path = format!("/api/novels/{}/chapters/{}/comments", w.novel_id, w.chapter_id);
    let root: Value = w
        .asha
        .post(&path)
        .json(&json!({"text": "Spoilers ahead: the ferryman is the king"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    w.mira
        .post(&path)
        .json(&json!({"text": "Shh!", "parent_id": root["id"]}))
        .send()
        .await
        .unwrap();

    let post: Value = w
        .asha
        .post("/api/posts")
        .json(&json!({"content": "No spoilers please"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    w.mira
        .post(&format!("/api/posts/{}/comments", post["id"]))
        .json(&json!({"text": "More spoilers in the thread"}))
        .send()
        .await
        .unwrap();

    let hits = w.admin.get_json("/api/admin/comments?q=spoilers").await;
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 2);
    let chapter_hit = hits
        .iter()
        .find(|h| h["location"]["type"] == "chapter")
        .unwrap();
    assert_eq!(chapter_hit["descendants"], 1);
    assert_eq!(chapter_hit["location"]["novel_id"], w.novel_id);

    let res = w
        .admin
        .delete("/api/admin/comments")
        .json(&json!({"location": chapter_hit["location"], "comment_id": chapter_hit["comment_id"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);
    assert!(w.asha.get_json(&path).await.as_array().unwrap().is_empty());

    let post_hit = hits.iter().find(|h| h["location"]["type"] == "post").unwrap();
    let res = w
        .admin
        .delete("/api/admin/comments")
        .json(&json!({"location": post_hit["location"], "comment_id": post_hit["comment_id"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);

    // Already gone.
    let res = w
        .admin
        .delete("/api/admin/comments")
        .json(&json!({"location": post_hit["location"], "comment_id": post_hit["comment_id"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(w.admin.get_json("/api/admin/stats").await["comments"], 0);
}

#[tokio::test]
async fn test_home_layout_drives_home_sections() {
    let app = TestApp::spawn().await;
    let w = world(&app).await;

    let layout = w.admin.get_json("/api/admin/layout").await;
    assert_eq!(layout["show_all_section"], true);

    let res = w
        .admin
        .put("/api/admin/layout")
        .json(&json!({"genres": ["Horror", "fantasy", "Horror"], "show_all_section": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let saved: Value = res.json().await.unwrap();
    assert_eq!(saved["genres"].as_array().unwrap().len(), 2);

    let home = app.client().get_json("/api/home").await;
    let kinds: Vec<&str> = home
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["trending", "genre", "genre"]);
    assert_eq!(home[1]["genre"], "Horror");
    assert!(home[1]["novels"].as_array().unwrap().is_empty());
    assert_eq!(home[2]["novels"].as_array().unwrap().len(), 1);

    let res = w
        .mira
        .put("/api/admin/layout")
        .json(&json!({"genres": [], "show_all_section": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);
}
