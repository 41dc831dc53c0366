//! SERP intelligence: search-intent classification, competitor grouping,
//! ranking opportunities and content briefs on top of a pluggable search
//! source (Serper.dev by default).

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::SerperConfig;
use crate::error::SerpError;

pub const CACHE_TTL: Duration = Duration::from_secs(3600);

static TRANSACTIONAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(buy|purchase|price|cheap|deal|discount|order|shop)").expect("static regex")
});
static COMMERCIAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(best|top|review|compare|vs|versus|alternative)").expect("static regex")
});
static NAVIGATIONAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(login|sign in|official|website)|\.[a-z]{2,4}$").expect("static regex")
});
static CAPITALIZED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][a-z]+").expect("static regex"));

// ------------------------------------------------------------
// Model
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    Informational,
    Navigational,
    Transactional,
    Commercial,
}

impl IntentKind {
    pub fn recommended_word_count(self) -> usize {
        match self {
            IntentKind::Informational => 1500,
            IntentKind::Commercial => 2000,
            IntentKind::Transactional => 800,
            IntentKind::Navigational => 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchIntent {
    pub primary: IntentKind,
    pub confidence: f64,
    pub signals: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    FeaturedSnippet,
    PeopleAlsoAsk,
    KnowledgePanel,
    Video,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SerpFeature {
    #[serde(rename = "type")]
    pub kind: FeatureKind,
    pub position: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SerpResult {
    pub position: u32,
    pub url: String,
    pub title: String,
    pub description: String,
    pub domain: String,
}

/// Raw page of results as returned by a [`SerpSource`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SerpPage {
    pub results: Vec<SerpResult>,
    pub features: Vec<SerpFeature>,
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorAnalysis {
    pub domain: String,
    pub avg_position: f64,
    pub strengths: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    FeaturedSnippet,
    Paa,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentOpportunity {
    #[serde(rename = "type")]
    pub kind: OpportunityKind,
    pub description: String,
    pub difficulty: f64,
    pub potential_impact: f64,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SerpAnalysis {
    pub keyword: String,
    pub intent: SearchIntent,
    pub difficulty: u32,
    pub results: Vec<SerpResult>,
    pub features: Vec<SerpFeature>,
    pub questions: Vec<String>,
    pub competitors: Vec<CompetitorAnalysis>,
    pub opportunities: Vec<ContentOpportunity>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBrief {
    pub target_keyword: String,
    pub search_intent: IntentKind,
    pub recommended_word_count: usize,
    pub headings: Vec<String>,
    pub questions: Vec<String>,
    pub topics: Vec<String>,
    pub entities: Vec<String>,
    pub snippet_format: &'static str,
    pub competitor_insights: Vec<CompetitorAnalysis>,
    pub opportunities: Vec<ContentOpportunity>,
}

// ------------------------------------------------------------
// Sources
// ------------------------------------------------------------

#[async_trait]
pub trait SerpSource: Send + Sync {
    async fn search(&self, keyword: &str) -> Result<SerpPage, SerpError>;
}

/// Serper.dev `/search` client.
pub struct SerperSearch {
    http: reqwest::Client,
    api_key: String,
    url: String,
}

impl SerperSearch {
    pub fn new(cfg: &SerperConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: cfg.api_key.clone(),
            url: format!("{}/search", cfg.base_url.trim_end_matches('/')),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SerperResponse {
    organic: Vec<Organic>,
    answer_box: Option<serde_json::Value>,
    people_also_ask: Vec<Paa>,
    videos: Vec<serde_json::Value>,
    knowledge_graph: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Organic {
    title: String,
    link: String,
    snippet: String,
    position: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Paa {
    question: String,
}

impl SerperResponse {
    fn into_page(self) -> SerpPage {
        let mut features = Vec::new();
        if let Some(ab) = &self.answer_box {
            let content = ab
                .get("snippet")
                .or_else(|| ab.get("answer"))
                .and_then(|v| v.as_str())
                .map(str::to_string);
            features.push(SerpFeature {
                kind: FeatureKind::FeaturedSnippet,
                position: 0,
                content,
            });
        }
        if !self.people_also_ask.is_empty() {
            features.push(SerpFeature {
                kind: FeatureKind::PeopleAlsoAsk,
                position: 0,
                content: None,
            });
        }
        if self.knowledge_graph.is_some() {
            features.push(SerpFeature {
                kind: FeatureKind::KnowledgePanel,
                position: 0,
                content: None,
            });
        }
        if !self.videos.is_empty() {
            features.push(SerpFeature {
                kind: FeatureKind::Video,
                position: 0,
                content: None,
            });
        }
        let results = self
            .organic
            .into_iter()
            .enumerate()
            .map(|(i, o)| SerpResult {
                position: o.position.unwrap_or(i as u32 + 1),
                domain: domain_of(&o.link),
                url: o.link,
                title: o.title,
                description: o.snippet,
            })
            .collect();
        SerpPage {
            results,
            features,
            questions: self
                .people_also_ask
                .into_iter()
                .map(|p| p.question)
                .filter(|q| !q.is_empty())
                .collect(),
        }
    }
}

#[async_trait]
impl SerpSource for SerperSearch {
    async fn search(&self, keyword: &str) -> Result<SerpPage, SerpError> {
        if self.api_key.trim().is_empty() {
            return Err(SerpError::MissingApiKey);
        }
        let resp = self
            .http
            .post(&self.url)
            .header("X-API-KEY", &self.api_key)
            .json(&json!({ "q": keyword, "gl": "us", "hl": "en", "num": 10 }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SerpError::Status(resp.status().as_u16()));
        }
        Ok(resp.json::<SerperResponse>().await?.into_page())
    }
}

fn domain_of(link: &str) -> String {
    url::Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_default()
}

// ------------------------------------------------------------
// Analysis
// ------------------------------------------------------------

pub struct SerpIntelligence {
    source: Arc<dyn SerpSource>,
    ttl: Duration,
    cache: Mutex<HashMap<String, (Instant, SerpAnalysis)>>,
}

impl SerpIntelligence {
    pub fn new(source: Arc<dyn SerpSource>) -> Self {
        Self {
            source,
            ttl: CACHE_TTL,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub async fn analyze(&self, keyword: &str) -> Result<SerpAnalysis, SerpError> {
        let key = keyword.trim().to_lowercase();
        {
            let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((at, hit)) = cache.get(&key) {
                if at.elapsed() < self.ttl {
                    tracing::debug!(target: "wpo::serp", keyword, "serp cache hit");
                    return Ok(hit.clone());
                }
            }
        }

        let page = self.source.search(keyword).await?;
        let has = |k: FeatureKind| page.features.iter().any(|f| f.kind == k);
        let opportunities = opportunities(has(FeatureKind::FeaturedSnippet), has(FeatureKind::PeopleAlsoAsk));
        let analysis = SerpAnalysis {
            keyword: keyword.to_string(),
            intent: classify_intent(keyword),
            difficulty: difficulty(&page),
            competitors: competitors(&page.results),
            opportunities,
            results: page.results,
            features: page.features,
            questions: page.questions,
            timestamp: Utc::now(),
        };
        tracing::info!(
            target: "wpo::serp",
            keyword,
            results = analysis.results.len(),
            intent = ?analysis.intent.primary,
            difficulty = analysis.difficulty,
            "serp analyzed"
        );
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, (Instant::now(), analysis.clone()));
        Ok(analysis)
    }

    pub async fn generate_content_brief(&self, keyword: &str) -> Result<ContentBrief, SerpError> {
        let analysis = self.analyze(keyword).await?;
        Ok(content_brief(&analysis))
    }

    pub fn clear_cache(&self) {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Keyword-only intent guess. Checked in order: transactional, commercial,
/// navigational; anything else is informational.
pub fn classify_intent(keyword: &str) -> SearchIntent {
    let k = keyword.to_lowercase();
    let (primary, confidence, signal) = if TRANSACTIONAL.is_match(&k) {
        (IntentKind::Transactional, 0.85, "transactional_keyword")
    } else if COMMERCIAL.is_match(&k) {
        (IntentKind::Commercial, 0.8, "commercial_keyword")
    } else if NAVIGATIONAL.is_match(&k) {
        (IntentKind::Navigational, 0.9, "navigational_keyword")
    } else {
        (IntentKind::Informational, 0.7, "informational_default")
    };
    SearchIntent {
        primary,
        confidence,
        signals: vec![signal.to_string()],
    }
}

/// Distinct capitalized words, first occurrence order, trailing punctuation
/// trimmed.
pub fn extract_entities(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| CAPITALIZED.is_match(w))
        .filter(|w| seen.insert(w.to_string()))
        .map(str::to_string)
        .collect()
}

pub fn content_brief(analysis: &SerpAnalysis) -> ContentBrief {
    let kw = &analysis.keyword;
    let corpus: String = analysis
        .results
        .iter()
        .map(|r| format!("{} {}", r.title, r.description))
        .collect::<Vec<_>>()
        .join(" ");
    ContentBrief {
        target_keyword: kw.clone(),
        search_intent: analysis.intent.primary,
        recommended_word_count: analysis.intent.primary.recommended_word_count(),
        headings: vec![
            format!("What is {kw}?"),
            format!("How {kw} Works"),
            format!("Benefits of {kw}"),
            format!("{kw} Best Practices"),
            format!("Common {kw} Mistakes to Avoid"),
            "Conclusion".to_string(),
        ],
        questions: analysis.questions.clone(),
        topics: analysis.results.iter().take(5).map(|r| r.title.clone()).collect(),
        entities: extract_entities(&corpus),
        snippet_format: if analysis.intent.primary == IntentKind::Informational {
            "paragraph"
        } else {
            "list"
        },
        competitor_insights: analysis.competitors.iter().take(5).cloned().collect(),
        opportunities: analysis.opportunities.clone(),
    }
}

fn competitors(results: &[SerpResult]) -> Vec<CompetitorAnalysis> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_domain: HashMap<&str, Vec<u32>> = HashMap::new();
    for r in results.iter().filter(|r| !r.domain.is_empty()) {
        by_domain
            .entry(r.domain.as_str())
            .or_insert_with(|| {
                order.push(r.domain.as_str());
                Vec::new()
            })
            .push(r.position);
    }
    order
        .into_iter()
        .map(|d| {
            let positions = &by_domain[d];
            CompetitorAnalysis {
                domain: d.to_string(),
                avg_position: positions.iter().map(|p| f64::from(*p)).sum::<f64>() / positions.len() as f64,
                strengths: if positions.len() > 1 {
                    vec!["Multiple rankings".to_string()]
                } else {
                    Vec::new()
                },
            }
        })
        .collect()
}

fn opportunities(has_snippet: bool, has_paa: bool) -> Vec<ContentOpportunity> {
    let mut out = Vec::new();
    if !has_snippet {
        out.push(ContentOpportunity {
            kind: OpportunityKind::FeaturedSnippet,
            description: "No featured snippet present - opportunity to capture position 0".into(),
            difficulty: 0.6,
            potential_impact: 0.9,
            recommendations: vec![
                "Create concise, direct answers (40-60 words)".into(),
                "Use structured formatting (lists, tables)".into(),
                "Include the exact question in your content".into(),
            ],
        });
    }
    if has_paa {
        out.push(ContentOpportunity {
            kind: OpportunityKind::Paa,
            description: "People Also Ask section present - answer these questions".into(),
            difficulty: 0.4,
            potential_impact: 0.7,
            recommendations: vec![
                "Create FAQ section addressing PAA questions".into(),
                "Use schema markup for FAQs".into(),
                "Provide comprehensive answers".into(),
            ],
        });
    }
    out
}

/// 30 base, +5 per distinct ranking domain, +15 for a featured snippet,
/// +10 for a knowledge panel; capped at 100.
fn difficulty(page: &SerpPage) -> u32 {
    let domains: HashSet<&str> = page
        .results
        .iter()
        .map(|r| r.domain.as_str())
        .filter(|d| !d.is_empty())
        .collect();
    let mut d = 30 + 5 * domains.len() as u32;
    for f in &page.features {
        d += match f.kind {
            FeatureKind::FeaturedSnippet => 15,
            FeatureKind::KnowledgePanel => 10,
            _ => 0,
        };
    }
    d.min(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSource {
        calls: AtomicUsize,
        page: SerpPage,
    }

    #[async_trait]
    impl SerpSource for FixedSource {
        async fn search(&self, _keyword: &str) -> Result<SerpPage, SerpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.page.clone())
        }
    }

    fn result(pos: u32, domain: &str, title: &str) -> SerpResult {
        SerpResult {
            position: pos,
            url: format!("https://{domain}/{pos}"),
            title: title.into(),
            description: String::new(),
            domain: domain.into(),
        }
    }

    #[test]
    fn intent_classification() {
        assert_eq!(classify_intent("buy running shoes").primary, IntentKind::Transactional);
        assert_eq!(classify_intent("best running shoes").primary, IntentKind::Commercial);
        assert_eq!(classify_intent("nike login").primary, IntentKind::Navigational);
        assert_eq!(classify_intent("nike.com").primary, IntentKind::Navigational);
        let info = classify_intent("how do marathons work");
        assert_eq!(info.primary, IntentKind::Informational);
        assert!((info.confidence - 0.7).abs() < 1e-9);
        // "canvas" must not trip the "vs" signal.
        assert_eq!(classify_intent("canvas painting").primary, IntentKind::Informational);
    }

    #[test]
    fn entities_are_capitalized_unique_in_order() {
        let e = extract_entities("Python beats Rust? Rust, then Python again and NASA.");
        assert_eq!(e, vec!["Python", "Rust"]);
    }

    #[tokio::test]
    async fn analysis_groups_competitors_and_caches() {
        let source = Arc::new(FixedSource {
            calls: AtomicUsize::new(0),
            page: SerpPage {
                results: vec![
                    result(1, "a.com", "Keto Guide"),
                    result(2, "b.com", "Keto Basics"),
                    result(3, "a.com", "Keto Recipes"),
                ],
                features: vec![SerpFeature {
                    kind: FeatureKind::PeopleAlsoAsk,
                    position: 0,
                    content: None,
                }],
                questions: vec!["Is keto safe?".into()],
            },
        });
        let serp = SerpIntelligence::new(source.clone());
        let a = serp.analyze("Keto Diet").await.unwrap();
        assert_eq!(a.competitors.len(), 2);
        assert_eq!(a.competitors[0].domain, "a.com");
        assert!((a.competitors[0].avg_position - 2.0).abs() < 1e-9);
        assert_eq!(a.competitors[0].strengths, vec!["Multiple rankings"]);
        let kinds: Vec<_> = a.opportunities.iter().map(|o| o.kind).collect();
        assert_eq!(kinds, vec![OpportunityKind::FeaturedSnippet, OpportunityKind::Paa]);
        assert_eq!(a.difficulty, 40);

        serp.analyze("keto diet ").await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let brief = serp.generate_content_brief("keto diet").await.unwrap();
        assert_eq!(brief.recommended_word_count, 1500);
        assert_eq!(brief.headings.len(), 6);
        assert_eq!(brief.questions, vec!["Is keto safe?"]);
        assert!(brief.entities.contains(&"Keto".to_string()));
        assert_eq!(brief.snippet_format, "paragraph");
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let source = Arc::new(FixedSource {
            calls: AtomicUsize::new(0),
            page: SerpPage::default(),
        });
        let serp = SerpIntelligence::new(source.clone()).with_ttl(Duration::ZERO);
        serp.analyze("x").await.unwrap();
        serp.analyze("x").await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        serp.clear_cache();
        assert_eq!(serp.cache_len(), 0);
    }

    #[test]
    fn serper_payload_maps_features() {
        let raw: SerperResponse = serde_json::from_value(json!({
            "organic": [{ "title": "T", "link": "https://www.site.org/p", "snippet": "S", "position": 1 }],
            "answerBox": { "snippet": "Direct answer" },
            "peopleAlsoAsk": [{ "question": "Why?" }],
            "knowledgeGraph": { "title": "K" }
        }))
        .unwrap();
        let page = raw.into_page();
        assert_eq!(page.results[0].domain, "site.org");
        assert_eq!(page.questions, vec!["Why?"]);
        assert_eq!(page.features.len(), 3);
        assert_eq!(page.features[0].content.as_deref(), Some("Direct answer"));
        assert_eq!(difficulty(&page), 60);
    }
}
