//! Sitemap reader: turns a `sitemap.xml` `<urlset>` into link targets.

use anyhow::{Context, Result};
use quick_xml::de::from_str;
use serde::{Deserialize, Serialize};

use crate::contract::InternalLinkTarget;
use crate::text::{extract_slug_from_url, sanitize_title};

#[derive(Debug, Deserialize)]
struct UrlSet {
    #[serde(rename = "url", default)]
    urls: Vec<UrlEntry>,
}

#[derive(Debug, Deserialize)]
struct UrlEntry {
    loc: String,
    lastmod: Option<String>,
    changefreq: Option<String>,
    priority: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapPage {
    pub url: String,
    pub slug: String,
    pub title: String,
    pub lastmod: Option<String>,
    pub changefreq: Option<String>,
    pub priority: Option<f32>,
}

pub fn parse_sitemap(xml: &str) -> Result<Vec<SitemapPage>> {
    let set: UrlSet = from_str(xml).context("parsing sitemap xml")?;
    Ok(set
        .urls
        .into_iter()
        .filter_map(|u| {
            let url = u.loc.trim().to_string();
            if url.is_empty() {
                return None;
            }
            let slug = extract_slug_from_url(&url);
            let title = sanitize_title("", Some(&slug));
            Some(SitemapPage {
                url,
                slug,
                title,
                lastmod: u.lastmod,
                changefreq: u.changefreq,
                priority: u.priority,
            })
        })
        .collect())
}

/// Pages with a usable slug, as link-injection candidates.
pub fn to_link_targets(pages: &[SitemapPage]) -> Vec<InternalLinkTarget> {
    pages
        .iter()
        .filter(|p| !p.slug.is_empty())
        .map(|p| InternalLinkTarget {
            url: p.url.clone(),
            title: p.title.clone(),
            slug: p.slug.clone(),
            keywords: p.slug.split('-').filter(|w| w.len() > 3).map(str::to_string).collect(),
            relevance_score: p.priority.map(f64::from),
            ..Default::default()
        })
        .collect()
}

pub async fn fetch_sitemap(client: &reqwest::Client, url: &str) -> Result<Vec<SitemapPage>> {
    let body = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("fetching sitemap {url}"))?
        .error_for_status()
        .context("sitemap status")?
        .text()
        .await
        .context("reading sitemap body")?;
    let pages = parse_sitemap(&body)?;
    tracing::info!(target: "wpo::links", url, pages = pages.len(), "sitemap loaded");
    Ok(pages)
}
