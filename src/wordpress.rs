//! WordPress REST client (`/wp-json/wp/v2/posts`) with retry and backoff,
//! plus the bulk fetch/update helpers built on it.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use metrics::counter;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::WordPressConfig;
use crate::contract::ContentContract;
use crate::error::WpError;
use crate::text::{count_words, extract_slug_from_url, strip_html};

const FETCH_BATCH: usize = 10;
const EXCERPT_CHARS: usize = 150;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WpPost {
    pub id: u64,
    pub title: Rendered,
    pub content: Rendered,
    pub excerpt: Rendered,
    pub slug: String,
    pub status: String,
    pub link: String,
    pub date: String,
    pub modified: String,
    pub categories: Vec<u64>,
    pub tags: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMetadata {
    pub id: u64,
    pub url: String,
    pub title: String,
    pub excerpt: String,
    pub status: String,
    pub word_count: usize,
    pub last_modified: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl PostUpdate {
    /// HTML, title and meta description (sent as the excerpt) of a contract.
    pub fn from_contract(contract: &ContentContract) -> Self {
        Self {
            title: Some(contract.title.clone()).filter(|t| !t.trim().is_empty()),
            content: Some(contract.html_content.clone()),
            excerpt: Some(contract.meta_description.clone()),
            status: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostUpdateOutcome {
    pub id: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchUpdateResult {
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<PostUpdateOutcome>,
}

#[derive(Clone)]
pub struct WordPressClient {
    http: reqwest::Client,
    base: String,
    username: String,
    password: String,
    max_attempts: u32,
    delay: Duration,
    multiplier: f64,
}

impl WordPressClient {
    pub fn new(cfg: &WordPressConfig) -> Result<Self, WpError> {
        let site = cfg.site_url.trim().trim_end_matches('/');
        url::Url::parse(site).map_err(|e| WpError::Config(format!("site_url {site:?}: {e}")))?;
        if cfg.username.trim().is_empty() {
            return Err(WpError::Config("username is empty".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        tracing::info!(target: "wpo::wordpress", site_url = site, "WordPress client ready");
        Ok(Self {
            http,
            base: format!("{site}/wp-json/wp/v2"),
            username: cfg.username.clone(),
            password: cfg.application_password.clone(),
            max_attempts: cfg.max_attempts.max(1),
            delay: Duration::from_millis(cfg.delay_ms),
            multiplier: cfg.backoff_multiplier,
        })
    }

    /// Delay before retry number `attempt` (1-based): `delay × multiplier^(attempt-1)`.
    fn backoff(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        self.delay.mul_f64(self.multiplier.powi(exp))
    }

    async fn with_retry<T, F, Fut>(&self, op: &str, mut call: F) -> Result<T, WpError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, WpError>>,
    {
        let mut attempt = 1;
        loop {
            counter!("wpo_wp_requests_total").increment(1);
            match call().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.max_attempts => {
                    let wait = self.backoff(attempt);
                    tracing::warn!(
                        target: "wpo::wordpress",
                        op,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "request failed; retrying"
                    );
                    counter!("wpo_wp_retries_total").increment(1);
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T, WpError> {
        let resp = req
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WpError::Http {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| WpError::Decode(e.to_string()))
    }

    pub async fn get_post_by_id(&self, id: u64) -> Result<WpPost, WpError> {
        let url = format!("{}/posts/{id}", self.base);
        self.with_retry("get_post", || self.send_json(self.http.get(&url)))
            .await
    }

    /// Looks the post up by the last path segment of `post_url`.
    pub async fn get_post_by_url(&self, post_url: &str) -> Result<Option<WpPost>, WpError> {
        let slug = extract_slug_from_url(post_url);
        if slug.is_empty() {
            return Ok(None);
        }
        let url = format!("{}/posts", self.base);
        let posts: Vec<WpPost> = self
            .with_retry("find_post", || {
                self.send_json(self.http.get(&url).query(&[("slug", slug.as_str())]))
            })
            .await?;
        Ok(posts.into_iter().next())
    }

    pub async fn update_post(&self, id: u64, update: &PostUpdate) -> Result<WpPost, WpError> {
        tracing::info!(target: "wpo::wordpress", post_id = id, "updating post");
        let url = format!("{}/posts/{id}", self.base);
        self.with_retry("update_post", || self.send_json(self.http.post(&url).json(update)))
            .await
    }

    /// Pushes the contract's HTML, title and meta description (as excerpt).
    /// Failures are logged and reported as `false`.
    pub async fn update_post_with_contract(&self, id: u64, contract: &ContentContract) -> bool {
        match self.update_post(id, &PostUpdate::from_contract(contract)).await {
            Ok(_) => {
                tracing::info!(target: "wpo::wordpress", post_id = id, "post updated");
                true
            }
            Err(e) => {
                tracing::error!(target: "wpo::wordpress", post_id = id, error = %e, "post update failed");
                false
            }
        }
    }

    /// Fetches posts concurrently in batches of ten; URLs that fail or have
    /// no matching post are left out of the map.
    pub async fn fetch_posts_from_urls(&self, urls: &[String]) -> HashMap<String, PostMetadata> {
        let mut out = HashMap::new();
        for batch in urls.chunks(FETCH_BATCH) {
            let found = join_all(batch.iter().map(|u| async move {
                (u, self.get_post_by_url(u).await)
            }))
            .await;
            for (url, res) in found {
                match res {
                    Ok(Some(post)) => {
                        out.insert(url.clone(), extract_post_metadata(&post));
                    }
                    Ok(None) => {
                        tracing::debug!(target: "wpo::wordpress", %url, "no post for url");
                    }
                    Err(e) => {
                        tracing::warn!(target: "wpo::wordpress", %url, error = %e, "post fetch failed");
                    }
                }
            }
        }
        tracing::info!(target: "wpo::wordpress", requested = urls.len(), fetched = out.len(), "bulk fetch done");
        out
    }

    /// Sequential updates; one failure does not stop the rest.
    pub async fn batch_update_posts(&self, updates: &[(u64, ContentContract)]) -> BatchUpdateResult {
        let mut result = BatchUpdateResult::default();
        for (id, contract) in updates {
            let ok = self.update_post_with_contract(*id, contract).await;
            if ok {
                result.successful += 1;
            } else {
                result.failed += 1;
            }
            result.results.push(PostUpdateOutcome {
                id: *id,
                success: ok,
                error: (!ok).then(|| "Update failed".to_string()),
            });
        }
        tracing::info!(
            target: "wpo::wordpress",
            successful = result.successful,
            failed = result.failed,
            "batch update done"
        );
        result
    }
}

/// Plain-text summary of a fetched post.
pub fn extract_post_metadata(post: &WpPost) -> PostMetadata {
    let excerpt: String = strip_html(&post.excerpt.rendered)
        .chars()
        .take(EXCERPT_CHARS)
        .collect();
    PostMetadata {
        id: post.id,
        url: post.link.clone(),
        title: html_escape::decode_html_entities(&post.title.rendered).into_owned(),
        excerpt,
        status: post.status.clone(),
        word_count: count_words(&post.content.rendered),
        last_modified: post.modified.clone(),
    }
}
