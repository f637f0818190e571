//! Novel lifecycle: drafts, publishing, chapters, views, trending, discovery,
//! ratings and cover uploads.

#![allow(clippy::unwrap_used)]

use katha_vault_integration_tests::{TestApp, TestClient};
use serde_json::{Value, json};

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

async fn author(app: &TestApp) -> TestClient {
    let client = app.client();
    client.sign_up("Mira K", "mira").await;
    client
}

fn id(value: &Value) -> i64 {
    value["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_drafts_are_private_until_published() {
    let app = TestApp::spawn().await;
    let mira = author(&app).await;
    let novel = mira.create_novel("The River King", &["Fantasy"]).await;
    assert_eq!(novel["status"], "draft");
    assert_eq!(novel["chapter_count"], 0);

    let path = format!("/api/novels/{}", id(&novel));
    let stranger = app.client();
    let res = stranger.get(&path).send().await.unwrap();
    assert_eq!(res.status(), 404);
    assert!(stranger.get_json("/api/novels").await.as_array().unwrap().is_empty());

    // The author still sees it.
    assert_eq!(mira.get_json(&path).await["title"], "The River King");
    assert_eq!(mira.get_json("/api/novels/mine").await.as_array().unwrap().len(), 1);

    mira.publish(id(&novel)).await;
    assert_eq!(stranger.get_json(&path).await["status"], "published");

    let res = mira
        .post(&format!("/api/novels/{}/unpublish", id(&novel)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(stranger.get(&path).send().await.unwrap().status(), 404);
}

#[tokio::test]
async fn test_create_requires_sign_in_and_valid_fields() {
    let app = TestApp::spawn().await;
    let res = app
        .client()
        .post("/api/novels")
        .json(&json!({"title": "Nope", "genres": ["Fantasy"], "synopsis": "Long enough synopsis."}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    let mira = author(&app).await;
    let res = mira
        .post("/api/novels")
        .json(&json!({"title": "", "genres": [], "synopsis": "short"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 422);
    let body: Value = res.json().await.unwrap();
    assert!(body["fields"]["title"].is_string());
    assert!(body["fields"]["synopsis"].is_string());
}

#[tokio::test]
async fn test_only_the_author_can_edit() {
    let app = TestApp::spawn().await;
    let mira = author(&app).await;
    let novel = mira.create_novel("The River King", &["Fantasy"]).await;
    mira.publish(id(&novel)).await;

    let vik = app.client();
    vik.sign_up("Vikram", "vik").await;
    let path = format!("/api/novels/{}", id(&novel));

    let res = vik.put(&path).json(&json!({"title": "Mine now"})).send().await.unwrap();
    assert_eq!(res.status(), 403);
    let res = vik.delete(&path).send().await.unwrap();
    assert_eq!(res.status(), 403);

    let res = mira
        .put(&path)
        .json(&json!({"title": "The River Queen", "genres": ["Fantasy", "Romance"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["title"], "The River Queen");
    assert_eq!(updated["genres"], json!(["Fantasy", "Romance"]));
}

#[tokio::test]
async fn test_reading_chapters_counts_views_and_links_neighbours() {
    let app = TestApp::spawn().await;
    let mira = author(&app).await;
    let novel = mira.create_novel("The River King", &["Fantasy"]).await;
    let nid = id(&novel);
    let first = mira.add_chapter(nid, "The Crossing").await;
    let second = mira.add_chapter(nid, "Flood Season").await;

    // Drafts don't count views, even for the author.
    let read = mira.get_json(&format!("/api/novels/{nid}/chapters/{first}")).await;
    assert_eq!(read["views"], 0);

    mira.publish(nid).await;
    let reader = app.client();
    let read = reader.get_json(&format!("/api/novels/{nid}/chapters/{first}")).await;
    assert_eq!(read["number"], 1);
    assert_eq!(read["total"], 2);
    assert_eq!(read["prev"], Value::Null);
    assert_eq!(read["next"], second);
    assert_eq!(read["views"], 1);

    let read = reader.get_json(&format!("/api/novels/{nid}/chapters/{second}")).await;
    assert_eq!(read["prev"], first);
    assert_eq!(read["views"], 2);

    let detail = reader.get_json(&format!("/api/novels/{nid}")).await;
    assert_eq!(detail["views"], 2);
    assert_eq!(detail["chapters"].as_array().unwrap().len(), 2);
    assert!(detail["chapters"][0].get("content").is_none());

    let res = reader
        .get(&format!("/api/novels/{nid}/chapters/999"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn test_chapter_edit_and_delete() {
    let app = TestApp::spawn().await;
    let mira = author(&app).await;
    let nid = id(&mira.create_novel("The River King", &["Fantasy"]).await);
    let cid = mira.add_chapter(nid, "The Crossing").await;
    let path = format!("/api/novels/{nid}/chapters/{cid}");

    let res = mira
        .put(&path)
        .json(&json!({"title": "The Night Crossing", "content": "Rewritten from the ferryman's side of the river."}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(mira.get_json(&path).await["chapter"]["title"], "The Night Crossing");

    let res = mira.delete(&path).send().await.unwrap();
    assert_eq!(res.status(), 204);
    assert_eq!(mira.get(&path).send().await.unwrap().status(), 404);
}

#[tokio::test]
async fn test_trending_home_and_discover() {
    let app = TestApp::spawn().await;
    let mira = author(&app).await;
    let reader = app.client();

    let mut ids = Vec::new();
    for (title, genre, reads) in [
        ("Salt Letters", "Romance", 1),
        ("The River King", "Fantasy", 4),
        ("Glass Monsoon", "Science Fiction", 3),
        ("Locked Room", "Mystery", 2),
    ] {
        let nid = id(&mira.create_novel(title, &[genre]).await);
        let cid = mira.add_chapter(nid, "Opening").await;
        mira.publish(nid).await;
        for _ in 0..reads {
            reader.get_json(&format!("/api/novels/{nid}/chapters/{cid}")).await;
        }
        ids.push(nid);
    }

    let trending = reader.get_json("/api/novels/trending").await;
    let titles: Vec<&str> = trending
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["The River King", "Glass Monsoon", "Locked Room"]);

    let home = reader.get_json("/api/home").await;
    let sections = home.as_array().unwrap();
    assert_eq!(sections[0]["kind"], "trending");
    assert_eq!(sections[1]["genre"], "Fantasy");
    assert_eq!(sections[1]["novels"][0]["trending"], true);
    assert_eq!(sections.last().unwrap()["kind"], "all");
    assert_eq!(sections.last().unwrap()["novels"].as_array().unwrap().len(), 4);

    let found = reader.get_json("/api/novels?q=river").await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    let romance = reader.get_json("/api/novels?genre=romance").await;
    assert_eq!(romance[0]["title"], "Salt Letters");
    assert_eq!(romance[0]["trending"], false);
    let by_title = reader.get_json("/api/novels?sort=title").await;
    assert_eq!(by_title[0]["title"], "Glass Monsoon");
}

#[tokio::test]
async fn test_rating_averages_one_score_per_reader() {
    let app = TestApp::spawn().await;
    let mira = author(&app).await;
    let nid = id(&mira.create_novel("The River King", &["Fantasy"]).await);
    mira.publish(nid).await;
    let path = format!("/api/novels/{nid}/rating");

    let asha = app.client();
    asha.sign_up("Asha Rao", "asha").await;
    let res = asha.post(&path).json(&json!({"rating": 6})).send().await.unwrap();
    assert_eq!(res.status(), 422);

    for _ in 0..5 {
        asha.post(&path).json(&json!({"rating": 5})).send().await.unwrap();
    }
    let vikram = app.client();
    vikram.sign_up("Vikram S", "vikram").await;
    let res = vikram.post(&path).json(&json!({"rating": 2})).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["rating_count"], 2);
    assert!((body["rating"].as_f64().unwrap() - 3.5).abs() < 1e-6);

    // A second rating replaces the reader's first one.
    let res = asha.post(&path).json(&json!({"rating": 4})).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["rating_count"], 2);
    assert!((body["rating"].as_f64().unwrap() - 3.0).abs() < 1e-6);

    let detail = asha.get_json(&format!("/api/novels/{nid}")).await;
    assert_eq!(detail["rating_count"], 2);
}

#[tokio::test]
async fn test_author_cannot_rate_own_novel() {
    let app = TestApp::spawn().await;
    let mira = author(&app).await;
    let nid = id(&mira.create_novel("The River King", &["Fantasy"]).await);
    mira.publish(nid).await;

    let path = format!("/api/novels/{nid}/rating");
    let res = mira.post(&path).json(&json!({"rating": 5})).send().await.unwrap();
    assert_eq!(res.status(), 403);
    let detail = mira.get_json(&format!("/api/novels/{nid}")).await;
    assert_eq!(detail["rating_count"], 0);
}

#[tokio::test]
async fn test_deleted_novel_ids_are_not_reused() {
    let app = TestApp::spawn().await;
    let mira = author(&app).await;
    let first = id(&mira.create_novel("The River King", &["Fantasy"]).await);
    let doomed = id(&mira.create_novel("Salt Letters", &["Romance"]).await);
    let res = mira.delete(&format!("/api/novels/{doomed}")).send().await.unwrap();
    assert_eq!(res.status(), 204);

    let fresh = id(&mira.create_novel("Glass Monsoon", &["Mystery"]).await);
    assert_ne!(fresh, doomed);
    assert!(fresh > first);
    let res = mira.get(&format!("/api/novels/{doomed}")).send().await.unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn test_cover_upload_and_removal() {
    let app = TestApp::spawn().await;
    let mira = author(&app).await;
    let nid = id(&mira.create_novel("The River King", &["Fantasy"]).await);
    let path = format!("/api/novels/{nid}/cover");

    let part = reqwest::multipart::Part::bytes(b"not an image".to_vec())
        .file_name("cover.png")
        .mime_str("image/png")
        .unwrap();
    let res = mira
        .post(&path)
        .multipart(reqwest::multipart::Form::new().part("cover", part))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 415);

    let part = reqwest::multipart::Part::bytes(PNG.to_vec())
        .file_name("cover.png")
        .mime_str("image/png")
        .unwrap();
    let res = mira
        .post(&path)
        .multipart(reqwest::multipart::Form::new().part("cover", part))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let novel: Value = res.json().await.unwrap();
    let cover = novel["cover_image"].as_str().unwrap().to_owned();
    assert!(cover.starts_with("/uploads/") && cover.ends_with(".png"));

    let served = mira.get(&cover).send().await.unwrap();
    assert_eq!(served.status(), 200);
    assert_eq!(served.bytes().await.unwrap().as_ref(), PNG);

    let file = app.uploads_dir.join(cover.trim_start_matches("/uploads/"));
    assert!(file.exists());
    let res = mira.delete(&format!("/api/novels/{nid}")).send().await.unwrap();
    assert_eq!(res.status(), 204);
    assert!(!file.exists());
}
