// tests/serp_http.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use wp_optimizer_pro::config::SerperConfig;
use wp_optimizer_pro::error::SerpError;
use wp_optimizer_pro::serp::{FeatureKind, IntentKind, OpportunityKind, SerpIntelligence, SerperSearch};

async fn search(State(hits): State<Arc<AtomicUsize>>, Json(body): Json<Value>) -> Result<Json<Value>, StatusCode> {
    hits.fetch_add(1, Ordering::SeqCst);
    if body["q"] == "down" {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(json!({
        "organic": [
            { "title": "Best Running Shoes of the Year", "link": "https://www.runnersworld.com/gear/best-shoes", "snippet": "Tested by Runners World editors.", "position": 1 },
            { "title": "Shop Nike Running", "link": "https://www.nike.com/running", "snippet": "Nike Pegasus and more." },
            { "title": "Trail Shoe Guide", "link": "https://runnersworld.com/trail", "snippet": "Grip matters on Trails." }
        ],
        "answerBox": { "snippet": "The best running shoe depends on your gait." },
        "peopleAlsoAsk": [
            { "question": "Which running shoe lasts longest?" },
            { "question": "" }
        ]
    })))
}

async fn serve() -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new().route("/search", post(search)).with_state(hits.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/"), hits)
}

fn intelligence(base: &str, key: &str) -> SerpIntelligence {
    let cfg = SerperConfig {
        api_key: key.into(),
        base_url: base.into(),
    };
    SerpIntelligence::new(Arc::new(SerperSearch::new(&cfg)))
}

#[tokio::test]
async fn analysis_from_serper_payload() {
    let (base, hits) = serve().await;
    let serp = intelligence(&base, "k");

    let a = serp.analyze("Best Running Shoes").await.unwrap();
    assert_eq!(a.intent.primary, IntentKind::Commercial);
    assert_eq!(a.results.len(), 3);
    assert_eq!(a.results[1].position, 2);
    assert_eq!(a.results[1].domain, "nike.com");
    // two domains, plus the answer box
    assert_eq!(a.difficulty, 30 + 2 * 5 + 15);
    assert_eq!(a.questions, vec!["Which running shoe lasts longest?"]);
    assert!(a.features.iter().any(|f| f.kind == FeatureKind::FeaturedSnippet
        && f.content.as_deref() == Some("The best running shoe depends on your gait.")));

    let rw = a.competitors.iter().find(|c| c.domain == "runnersworld.com").unwrap();
    assert!((rw.avg_position - 2.0).abs() < 1e-9);
    assert_eq!(rw.strengths, vec!["Multiple rankings"]);

    assert_eq!(a.opportunities.len(), 1);
    assert_eq!(a.opportunities[0].kind, OpportunityKind::Paa);

    let brief = serp.generate_content_brief("  best running shoes").await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1, "brief should reuse the cached analysis");
    assert_eq!(brief.snippet_format, "list");
    assert_eq!(brief.recommended_word_count, IntentKind::Commercial.recommended_word_count());
    assert!(brief.entities.contains(&"Nike".to_string()));
    assert!(brief.entities.contains(&"Trails".to_string()));
    assert_eq!(serp.cache_len(), 1);

    serp.clear_cache();
    serp.analyze("best running shoes").await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn upstream_errors_surface() {
    let (base, hits) = serve().await;
    let err = intelligence(&base, "k").analyze("down").await.unwrap_err();
    assert!(matches!(err, SerpError::Status(503)));
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let err = intelligence(&base, "").analyze("anything").await.unwrap_err();
    assert!(matches!(err, SerpError::MissingApiKey));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
