//! YouTube video discovery (via Serper video search), validation and embed
//! rendering.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::components::{json_ld_script, youtube_embed};
use crate::config::SerperConfig;
use crate::error::SerpError;
use crate::text::escape_html;

pub const OEMBED_URL: &str = "https://www.youtube.com/oembed";

const ENOUGH_CANDIDATES: usize = 5;
const MAX_ALTERNATES: usize = 4;

static VIDEO_ID_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([A-Za-z0-9_-]{11})")
            .expect("static regex"),
        Regex::new(r"youtube\.com/v/([A-Za-z0-9_-]{11})").expect("static regex"),
        Regex::new(r"youtube\.com/shorts/([A-Za-z0-9_-]{11})").expect("static regex"),
    ]
});
static H2_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<h2[^>]*>").expect("static regex"));

fn default_min_views() -> u64 {
    1000
}
fn default_min_duration() -> u64 {
    60
}
fn default_max_duration() -> u64 {
    3600
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeConfig {
    #[serde(default = "default_min_views")]
    pub min_views: u64,
    #[serde(default = "default_min_duration")]
    pub min_duration_secs: u64,
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: u64,
    #[serde(default = "default_true")]
    pub enable_caching: bool,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            min_views: default_min_views(),
            min_duration_secs: default_min_duration(),
            max_duration_secs: default_max_duration(),
            enable_caching: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeVideo {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub views: u64,
    #[serde(default)]
    pub duration: Option<String>,
    pub thumbnail_url: String,
    pub embed_url: String,
    #[serde(default)]
    pub description: Option<String>,
    pub relevance_score: f64,
}

impl YouTubeVideo {
    pub fn new(
        video_id: impl Into<String>,
        title: impl Into<String>,
        channel: impl Into<String>,
        views: u64,
    ) -> Self {
        let video_id = video_id.into();
        Self {
            thumbnail_url: format!("https://img.youtube.com/vi/{video_id}/hqdefault.jpg"),
            embed_url: format!("https://www.youtube.com/embed/{video_id}"),
            video_id,
            title: title.into(),
            channel: channel.into(),
            views,
            duration: None,
            description: None,
            relevance_score: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoSearchResult {
    pub video: Option<YouTubeVideo>,
    pub source: &'static str,
    pub alternates: Vec<YouTubeVideo>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedStyle {
    #[default]
    Full,
    Minimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoPosition {
    #[default]
    AfterIntro,
    BeforeConclusion,
    Middle,
}

#[derive(Debug, Deserialize)]
struct SerperVideos {
    #[serde(default)]
    videos: Vec<SerperVideo>,
}

#[derive(Debug, Deserialize)]
struct SerperVideo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    views: Option<serde_json::Value>,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

pub struct YouTubeVideoService {
    http: reqwest::Client,
    api_key: String,
    config: YouTubeConfig,
    search_url: String,
    oembed_url: String,
    query_delay: Duration,
    cache: Mutex<HashMap<String, VideoSearchResult>>,
}

impl YouTubeVideoService {
    pub fn new(api_key: impl Into<String>, config: YouTubeConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: api_key.into(),
            config,
            search_url: format!("{}/videos", crate::config::SERPER_BASE_URL),
            oembed_url: OEMBED_URL.to_string(),
            query_delay: Duration::from_millis(300),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(serper: &SerperConfig, config: &YouTubeConfig) -> Self {
        Self::new(serper.api_key.clone(), config.clone()).with_serper_base(&serper.base_url)
    }

    pub fn with_serper_base(mut self, base: &str) -> Self {
        self.search_url = format!("{}/videos", base.trim_end_matches('/'));
        self
    }

    pub fn with_oembed_url(mut self, url: impl Into<String>) -> Self {
        self.oembed_url = url.into();
        self
    }

    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = delay;
        self
    }

    /// Runs up to four search phrasings, keeps YouTube links above the view
    /// threshold and returns the most relevant one plus alternates. Failed
    /// queries are skipped.
    pub async fn find_best_video(&self, topic: &str) -> Result<VideoSearchResult, SerpError> {
        let cache_key = topic.trim().to_lowercase();
        if self.config.enable_caching {
            let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = cache.get(&cache_key) {
                tracing::debug!(target: "wpo::youtube", topic, "video cache hit");
                return Ok(hit.clone());
            }
        }
        if self.api_key.trim().is_empty() {
            return Err(SerpError::MissingApiKey);
        }

        let year = Utc::now().year();
        let queries = [
            format!("{topic} tutorial guide"),
            format!("{topic} explained {year}"),
            format!("how to {topic}"),
            format!("{topic} for beginners"),
        ];

        let mut videos: Vec<YouTubeVideo> = Vec::new();
        for (i, query) in queries.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.query_delay).await;
            }
            match self.search(query).await {
                Ok(found) => {
                    for raw in found {
                        if let Some(v) = self.candidate(raw, topic) {
                            if !videos.iter().any(|x| x.video_id == v.video_id) {
                                videos.push(v);
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(target: "wpo::youtube", %query, error = %e, "video search failed");
                }
            }
            if videos.len() >= ENOUGH_CANDIDATES {
                break;
            }
        }

        videos.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        let mut iter = videos.into_iter();
        let result = VideoSearchResult {
            video: iter.next(),
            source: "serper",
            alternates: iter.take(MAX_ALTERNATES).collect(),
        };
        tracing::info!(
            target: "wpo::youtube",
            topic,
            found = result.video.is_some(),
            alternates = result.alternates.len(),
            "video search complete"
        );
        if self.config.enable_caching {
            self.cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(cache_key, result.clone());
        }
        Ok(result)
    }

    async fn search(&self, query: &str) -> Result<Vec<SerperVideo>, SerpError> {
        let resp = self
            .http
            .post(&self.search_url)
            .header("X-API-KEY", &self.api_key)
            .json(&json!({ "q": query, "gl": "us", "hl": "en", "num": 10 }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SerpError::Status(resp.status().as_u16()));
        }
        Ok(resp.json::<SerperVideos>().await?.videos)
    }

    fn candidate(&self, raw: SerperVideo, topic: &str) -> Option<YouTubeVideo> {
        let link = raw.link?;
        if !link.contains("youtube.com") && !link.contains("youtu.be") {
            return None;
        }
        let id = extract_youtube_video_id(&link)?;
        let views = raw.views.as_ref().map(parse_view_count).unwrap_or(0);
        if views < self.config.min_views {
            return None;
        }
        if let Some(secs) = raw.duration.as_deref().and_then(parse_duration_secs) {
            if secs < self.config.min_duration_secs || secs > self.config.max_duration_secs {
                return None;
            }
        }
        let title = raw.title.unwrap_or_else(|| "Video".to_string());
        let mut video = YouTubeVideo::new(
            id,
            title,
            raw.channel.unwrap_or_else(|| "Unknown".to_string()),
            views,
        );
        video.relevance_score = video_relevance(&video.title, topic, views);
        video.duration = raw.duration;
        video.description = raw.snippet;
        Some(video)
    }

    /// True when YouTube's oEmbed endpoint knows the video.
    pub async fn validate_video(&self, video_id: &str) -> bool {
        let watch = format!("https://www.youtube.com/watch?v={video_id}");
        match self
            .http
            .get(&self.oembed_url)
            .query(&[("url", watch.as_str()), ("format", "json")])
            .send()
            .await
        {
            Ok(r) => r.status().is_success(),
            Err(e) => {
                tracing::debug!(target: "wpo::youtube", video_id, error = %e, "oEmbed check failed");
                false
            }
        }
    }
}

/// 50 base, up to 30 for topic words found in the title, plus a popularity
/// bonus; capped at 100.
fn video_relevance(title: &str, topic: &str, views: u64) -> f64 {
    let title = title.to_lowercase();
    let words: Vec<String> = topic
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .map(str::to_string)
        .collect();
    let matching = words.iter().filter(|w| title.contains(w.as_str())).count();
    let mut score = 50.0 + (matching as f64 / words.len().max(1) as f64 * 30.0).min(30.0);
    score += match views {
        v if v >= 1_000_000 => 15.0,
        v if v >= 100_000 => 10.0,
        v if v >= 50_000 => 5.0,
        _ => 0.0,
    };
    score.min(100.0)
}

pub fn extract_youtube_video_id(url: &str) -> Option<String> {
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .map(|c| c[1].to_string())
}

/// Accepts numbers or strings like `"1,234"`, `"12K views"`, `"1.5M"`.
pub fn parse_view_count(raw: &serde_json::Value) -> u64 {
    match raw {
        serde_json::Value::Number(n) => n.as_u64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0).max(0.0) as u64),
        serde_json::Value::String(s) => parse_view_str(s),
        _ => 0,
    }
}

fn parse_view_str(s: &str) -> u64 {
    let lower = s.to_lowercase().replace(',', "");
    for (suffix, mult) in [('k', 1e3), ('m', 1e6), ('b', 1e9)] {
        if lower.contains(suffix) {
            let num: String = lower.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
            return num.parse::<f64>().map(|n| (n * mult).round() as u64).unwrap_or(0);
        }
    }
    lower
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

/// `"m:ss"` or `"h:mm:ss"` to seconds.
pub fn parse_duration_secs(s: &str) -> Option<u64> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    parts.iter().try_fold(0u64, |acc, p| {
        let n: u64 = p.trim().parse().ok()?;
        Some(acc * 60 + n)
    })
}

/// Player markup. `Full` adds a VideoObject JSON-LD block and the info card.
pub fn generate_embed(video: &YouTubeVideo, title: &str, style: EmbedStyle) -> String {
    match style {
        EmbedStyle::Minimal => format!(
            "\n<div style=\"position: relative; padding-bottom: 56.25%; height: 0; overflow: hidden; border-radius: 12px; margin: 32px 0;\">\
<iframe src=\"https://www.youtube.com/embed/{}?rel=0\" title=\"{}\" frameborder=\"0\" \
allow=\"accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture\" allowfullscreen loading=\"lazy\" \
style=\"position: absolute; top: 0; left: 0; width: 100%; height: 100%; border: none;\"></iframe></div>",
            escape_html(&video.video_id),
            escape_html(if video.title.is_empty() { title } else { &video.title })
        ),
        EmbedStyle::Full => {
            let schema = json!({
                "@context": "https://schema.org",
                "@type": "VideoObject",
                "name": video.title,
                "description": video.description.clone().unwrap_or_else(|| format!("Video about {title}")),
                "thumbnailUrl": [format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", video.video_id)],
                "uploadDate": Utc::now().format("%Y-%m-%d").to_string(),
                "embedUrl": video.embed_url,
                "contentUrl": format!("https://www.youtube.com/watch?v={}", video.video_id),
            });
            format!("\n{}{}", json_ld_script(&schema), youtube_embed(video))
        }
    }
}

/// Inserts the full embed before an H2 chosen by `position`; appends when
/// the content has no H2.
pub fn inject_video_into_content(
    html: &str,
    video: &YouTubeVideo,
    title: &str,
    position: VideoPosition,
) -> String {
    let embed = generate_embed(video, title, EmbedStyle::Full);
    let h2s: Vec<usize> = H2_OPEN.find_iter(html).map(|m| m.start()).collect();
    let at = match position {
        VideoPosition::AfterIntro => h2s.first().copied(),
        VideoPosition::BeforeConclusion => h2s.last().copied(),
        VideoPosition::Middle => h2s.get(h2s.len() * 2 / 5).copied(),
    };
    match at {
        Some(i) => format!("{}{embed}\n\n{}", &html[..i], &html[i..]),
        None => format!("{html}\n\n{embed}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ids_from_all_url_shapes() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "https://youtube.com/shorts/dQw4w9WgXcQ",
        ] {
            assert_eq!(extract_youtube_video_id(url).as_deref(), Some("dQw4w9WgXcQ"), "{url}");
        }
        assert!(extract_youtube_video_id("https://vimeo.com/123").is_none());
    }

    #[test]
    fn view_counts_with_suffixes() {
        assert_eq!(parse_view_count(&json!("1.5M views")), 1_500_000);
        assert_eq!(parse_view_count(&json!("12K")), 12_000);
        assert_eq!(parse_view_count(&json!("2B")), 2_000_000_000);
        assert_eq!(parse_view_count(&json!("1,234 views")), 1234);
        assert_eq!(parse_view_count(&json!(987)), 987);
        assert_eq!(parse_view_count(&json!(null)), 0);
        assert_eq!(parse_view_count(&json!("none")), 0);
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration_secs("4:05"), Some(245));
        assert_eq!(parse_duration_secs("1:02:03"), Some(3723));
        assert_eq!(parse_duration_secs("live"), None);
    }

    #[test]
    fn relevance_rewards_title_match_and_views() {
        let full = video_relevance("Keto Diet Explained", "keto diet", 2_000_000);
        assert!((full - 95.0).abs() < 1e-9);
        let partial = video_relevance("Diet basics", "keto diet", 60_000);
        assert!((partial - 70.0).abs() < 1e-9);
        assert!((video_relevance("x", "a b", 0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn injection_positions() {
        let v = YouTubeVideo::new("dQw4w9WgXcQ", "Guide", "Chan", 10);
        let html = "<p>intro</p><h2>A</h2><p>a</p><h2>B</h2><p>b</p><h2>C</h2>";
        let after = inject_video_into_content(html, &v, "t", VideoPosition::AfterIntro);
        assert!(after.find("youtube.com/embed").unwrap() < after.find("<h2>A").unwrap());
        let before = inject_video_into_content(html, &v, "t", VideoPosition::BeforeConclusion);
        let embed_at = before.find("youtube.com/embed").unwrap();
        assert!(embed_at > before.find("<h2>B").unwrap() && embed_at < before.find("<h2>C").unwrap());
        let mid = inject_video_into_content(html, &v, "t", VideoPosition::Middle);
        let embed_at = mid.find("youtube.com/embed").unwrap();
        assert!(embed_at > mid.find("<h2>A").unwrap() && embed_at < mid.find("<h2>B").unwrap());
        let plain = inject_video_into_content("<p>only</p>", &v, "t", VideoPosition::Middle);
        assert!(plain.starts_with("<p>only</p>\n\n"));
    }

    #[test]
    fn full_embed_carries_video_object() {
        let v = YouTubeVideo::new("dQw4w9WgXcQ", "Guide", "Chan", 10);
        let full = generate_embed(&v, "Topic", EmbedStyle::Full);
        assert!(full.contains("\"@type\":\"VideoObject\""));
        assert!(full.contains("Video about Topic"));
        let minimal = generate_embed(&v, "Topic", EmbedStyle::Minimal);
        assert!(!minimal.contains("ld+json"));
        assert!(minimal.contains("embed/dQw4w9WgXcQ?rel=0"));
    }

    #[tokio::test]
    async fn missing_key_is_an_error() {
        let svc = YouTubeVideoService::new("", YouTubeConfig::default());
        assert!(matches!(svc.find_best_video("keto").await, Err(SerpError::MissingApiKey)));
    }
}
