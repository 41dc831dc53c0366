// tests/wordpress_http.rs
//
// WordPress client against a local stand-in for the REST API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use wp_optimizer_pro::config::WordPressConfig;
use wp_optimizer_pro::contract::ContentContract;
use wp_optimizer_pro::error::WpError;
use wp_optimizer_pro::wordpress::{PostUpdate, WordPressClient};

const KNOWN_ID: u64 = 7;

#[derive(Clone, Default)]
struct Fake {
    /// Number of update attempts that answer 500 before succeeding.
    failures_left: Arc<AtomicUsize>,
    update_hits: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<String>>>,
}

fn post(id: u64) -> Value {
    json!({
        "id": id,
        "title": { "rendered": "Keto Meal Prep &amp; Planning" },
        "content": { "rendered": "<p>One two three four</p>" },
        "excerpt": { "rendered": "<p>Short summary</p>" },
        "slug": "keto-meal-prep",
        "status": "publish",
        "link": "https://blog.test/keto-meal-prep/",
        "modified": "2024-05-01T10:00:00"
    })
}

async fn get_post(State(f): State<Fake>, headers: HeaderMap, Path(id): Path<u64>) -> Result<Json<Value>, StatusCode> {
    if let Some(v) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        f.auth.lock().unwrap().push(v.to_string());
    }
    if id == KNOWN_ID {
        Ok(Json(post(id)))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn list_posts(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    match q.get("slug").map(String::as_str) {
        Some("keto-meal-prep") => Json(json!([post(KNOWN_ID)])),
        Some("broken") => Json(json!({ "not": "a list" })),
        _ => Json(json!([])),
    }
}

async fn update_post(
    State(f): State<Fake>,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    f.update_hits.fetch_add(1, Ordering::SeqCst);
    f.bodies.lock().unwrap().push(body.clone());
    if id != KNOWN_ID {
        return Err(StatusCode::NOT_FOUND);
    }
    let left = f.failures_left.load(Ordering::SeqCst);
    if left > 0 {
        f.failures_left.store(left - 1, Ordering::SeqCst);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    let mut p = post(id);
    p["content"]["rendered"] = body["content"].clone();
    Ok(Json(p))
}

async fn serve(fake: Fake) -> String {
    let app = Router::new()
        .route("/wp-json/wp/v2/posts", get(list_posts))
        .route("/wp-json/wp/v2/posts/{id}", get(get_post).post(update_post))
        .with_state(fake);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

fn client(site: &str, attempts: u32) -> WordPressClient {
    let mut cfg = WordPressConfig::new(site, "editor", "secret");
    cfg.max_attempts = attempts;
    cfg.delay_ms = 1;
    cfg.backoff_multiplier = 2.0;
    WordPressClient::new(&cfg).unwrap()
}

#[tokio::test]
async fn fetches_by_id_with_basic_auth() {
    let fake = Fake::default();
    let site = serve(fake.clone()).await;
    let wp = client(&site, 1);

    let p = wp.get_post_by_id(KNOWN_ID).await.unwrap();
    assert_eq!(p.slug, "keto-meal-prep");
    assert_eq!(fake.auth.lock().unwrap()[0], "Basic ZWRpdG9yOnNlY3JldA==");

    match wp.get_post_by_id(99).await {
        Err(WpError::Http { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected 404, got {other:?}"),
    }
}

#[tokio::test]
async fn finds_posts_by_url_slug() {
    let site = serve(Fake::default()).await;
    let wp = client(&site, 1);

    let found = wp.get_post_by_url("https://blog.test/keto-meal-prep/").await.unwrap();
    assert_eq!(found.map(|p| p.id), Some(KNOWN_ID));
    assert!(wp.get_post_by_url("https://blog.test/nothing-here/").await.unwrap().is_none());
    assert!(wp.get_post_by_url("https://blog.test/").await.unwrap().is_none());
    assert!(matches!(
        wp.get_post_by_url("https://blog.test/broken/").await,
        Err(WpError::Decode(_))
    ));
}

#[tokio::test]
async fn update_retries_transient_failures() {
    let fake = Fake::default();
    fake.failures_left.store(2, Ordering::SeqCst);
    let site = serve(fake.clone()).await;
    let wp = client(&site, 3);

    let mut contract = ContentContract::new("Keto Meal Prep", "keto-meal-prep", "<p>Fresh body</p>");
    contract.meta_description = "Plan a week of keto meals.".into();
    let updated = wp.update_post(KNOWN_ID, &PostUpdate::from_contract(&contract)).await.unwrap();

    assert_eq!(updated.content.rendered, "<p>Fresh body</p>");
    assert_eq!(fake.update_hits.load(Ordering::SeqCst), 3);
    let last = fake.bodies.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last["excerpt"], "Plan a week of keto meals.");
    assert_eq!(last["title"], "Keto Meal Prep");
    assert!(last.get("status").is_none());
}

#[tokio::test]
async fn update_gives_up_after_max_attempts() {
    let fake = Fake::default();
    fake.failures_left.store(10, Ordering::SeqCst);
    let site = serve(fake.clone()).await;
    let wp = client(&site, 3);

    let err = wp.update_post(KNOWN_ID, &PostUpdate::default()).await.unwrap_err();
    assert!(matches!(err, WpError::Http { status: 500, .. }));
    assert_eq!(fake.update_hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn bulk_helpers_skip_failures() {
    let site = serve(Fake::default()).await;
    let wp = client(&site, 2);

    let urls = vec![
        "https://blog.test/keto-meal-prep/".to_string(),
        "https://blog.test/missing/".to_string(),
        "https://blog.test/broken/".to_string(),
    ];
    let found = wp.fetch_posts_from_urls(&urls).await;
    assert_eq!(found.len(), 1);
    let meta = &found["https://blog.test/keto-meal-prep/"];
    assert_eq!(meta.title, "Keto Meal Prep & Planning");
    assert_eq!(meta.excerpt, "Short summary");
    assert_eq!(meta.word_count, 4);

    let contract = ContentContract::new("T", "t", "<p>x</p>");
    let batch = wp
        .batch_update_posts(&[(KNOWN_ID, contract.clone()), (404, contract)])
        .await;
    assert_eq!(batch.successful, 1);
    assert_eq!(batch.failed, 1);
    assert!(batch.results[0].success);
    assert_eq!(batch.results[1].error.as_deref(), Some("Update failed"));
}
