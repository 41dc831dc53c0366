//! SEO metrics calculator.
//!
//! Parses a content fragment into a DOM, counts structural features and folds
//! them into five weighted 0–100 scores. Never fails: empty or malformed
//! markup yields zeroed metrics.

pub mod analyzer;

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::text::text_of;

/// Phrases counted as E-E-A-T evidence in body text.
pub const EEAT_PHRASES: &[&str] = &[
    "according to",
    "research shows",
    "studies indicate",
    "experts recommend",
    "peer-reviewed",
    "published in",
    "data suggests",
    "analysis reveals",
];

const FAQ_MARKERS: &[&str] = &["frequently asked", "faq", "❓"];

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static SEL_H1: Lazy<Selector> = Lazy::new(|| sel("h1"));
static SEL_H2: Lazy<Selector> = Lazy::new(|| sel("h2"));
static SEL_H3: Lazy<Selector> = Lazy::new(|| sel("h3"));
static SEL_HEADINGS: Lazy<Selector> = Lazy::new(|| sel("h1, h2, h3, h4, h5, h6"));
static SEL_IMG: Lazy<Selector> = Lazy::new(|| sel("img"));
static SEL_LISTS: Lazy<Selector> = Lazy::new(|| sel("ul, ol"));
static SEL_TABLE: Lazy<Selector> = Lazy::new(|| sel("table"));
static SEL_BLOCKQUOTE: Lazy<Selector> = Lazy::new(|| sel("blockquote"));
static SEL_DETAILS: Lazy<Selector> = Lazy::new(|| sel("details, summary"));
static SEL_LINKS: Lazy<Selector> = Lazy::new(|| sel("a[href]"));
static SEL_LD_JSON: Lazy<Selector> =
    Lazy::new(|| sel(r#"script[type="application/ld+json"]"#));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoMetrics {
    pub word_count: usize,
    pub content_depth: u32,
    pub readability: u32,
    pub heading_structure: u32,
    pub aeo_score: u32,
    pub geo_score: u32,
    pub eeat_signals: u32,
    pub internal_link_score: u32,
    pub schema_detected: bool,
    pub schema_types: Vec<String>,
    pub h2_count: usize,
    pub h3_count: usize,
    pub image_count: usize,
    pub faq_count: usize,
}

/// Structural counts shared by the individual scores.
#[derive(Debug, Clone, Copy, Default)]
struct Counts {
    words: usize,
    h1: usize,
    h2: usize,
    h3: usize,
    images: usize,
    lists: usize,
    tables: usize,
    blockquotes: usize,
    details: usize,
}

fn clamp_score(v: f64) -> u32 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 100.0) as u32
}

/// `full` when `n >= target`, otherwise the proportional share of `full`.
fn tiered(n: usize, target: usize, full: f64) -> f64 {
    if n >= target {
        full
    } else {
        n as f64 / target as f64 * full
    }
}

pub fn calculate_seo_metrics(html: &str, _title: &str, slug: &str) -> SeoMetrics {
    if html.trim().is_empty() {
        return SeoMetrics::default();
    }

    let doc = Html::parse_fragment(html);
    let text = text_of(&doc);
    let lower_html = html.to_lowercase();

    let c = Counts {
        words: text.split_whitespace().count(),
        h1: doc.select(&SEL_H1).count(),
        h2: doc.select(&SEL_H2).count(),
        h3: doc.select(&SEL_H3).count(),
        images: doc.select(&SEL_IMG).count(),
        lists: doc.select(&SEL_LISTS).count(),
        tables: doc.select(&SEL_TABLE).count(),
        blockquotes: doc.select(&SEL_BLOCKQUOTE).count(),
        details: doc.select(&SEL_DETAILS).count(),
    };

    let faq_count = FAQ_MARKERS
        .iter()
        .filter(|m| lower_html.contains(*m))
        .count();

    let content_depth = content_depth(&c);
    let readability = readability(&text, c.words);
    let heading_structure = heading_structure(c.h1, c.h2, c.h3);
    let aeo_score = aeo_score(html, &c, faq_count);
    let geo_score = geo_score(&c, content_depth);
    let eeat_signals = eeat_signals(&text);
    let internal_link_score = internal_link_score(&doc, slug);

    let has_ld_json = doc.select(&SEL_LD_JSON).next().is_some();
    let schema_detected = has_ld_json
        || html.contains(r#"itemtype="https://schema.org"#)
        || html.contains("FAQPage");
    let schema_types = if schema_detected {
        detect_schema_types(html)
    } else {
        Vec::new()
    };

    SeoMetrics {
        word_count: c.words,
        content_depth,
        readability,
        heading_structure,
        aeo_score,
        geo_score,
        eeat_signals,
        internal_link_score,
        schema_detected,
        schema_types,
        h2_count: c.h2,
        h3_count: c.h3,
        image_count: c.images,
        faq_count,
    }
}

fn content_depth(c: &Counts) -> u32 {
    let mut score = tiered(c.words, 3000, 25.0)
        + tiered(c.h2, 8, 20.0)
        + tiered(c.h3, 15, 20.0)
        + tiered(c.images, 5, 15.0);
    if c.lists >= 5 {
        score += 10.0;
    }
    if c.tables >= 1 {
        score += 10.0;
    }
    clamp_score(score)
}

fn readability(text: &str, words: usize) -> u32 {
    let sentences = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();
    let avg = words as f64 / sentences.max(1) as f64;
    match avg {
        a if a <= 15.0 => 90,
        a if a <= 20.0 => 80,
        a if a <= 25.0 => 70,
        a if a <= 30.0 => 60,
        _ => 50,
    }
}

pub(crate) fn heading_structure(h1: usize, h2: usize, h3: usize) -> u32 {
    if h1 == 0 && h2 >= 5 && h3 >= 10 {
        100
    } else if h1 == 0 && h2 >= 3 {
        80
    } else if h1 > 0 {
        60u32.saturating_sub(20u32.saturating_mul(h1 as u32))
    } else {
        60
    }
}

fn aeo_score(html: &str, c: &Counts, faq_count: usize) -> u32 {
    let mut score = 0u32;
    if html.contains("quick answer") || html.contains("Quick Answer") {
        score += 20;
    }
    if faq_count > 0 {
        score += 25;
    }
    if c.details > 0 {
        score += 15;
    }
    if c.tables > 0 {
        score += 15;
    }
    if c.h3 >= 10 {
        score += 15;
    }
    if c.lists >= 5 {
        score += 10;
    }
    score.min(100)
}

fn geo_score(c: &Counts, content_depth: u32) -> u32 {
    let depth = if content_depth >= 80 {
        25.0
    } else {
        content_depth as f64 / 80.0 * 25.0
    };
    let mut score =
        tiered(c.words, 4000, 30.0) + depth + tiered(c.h2, 8, 20.0) + tiered(c.images, 3, 15.0);
    if c.blockquotes > 0 {
        score += 10.0;
    }
    clamp_score(score)
}

fn eeat_signals(text: &str) -> u32 {
    let lower = text.to_lowercase();
    let found = EEAT_PHRASES.iter().filter(|p| lower.contains(*p)).count() as u32;
    (found * 12).min(100)
}

fn internal_link_score(doc: &Html, slug: &str) -> u32 {
    let needle = if slug.is_empty() { "internal" } else { slug };
    let n = doc
        .select(&SEL_LINKS)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.starts_with('/') || href.contains(needle))
        .count() as u32;
    n.saturating_mul(5).min(100)
}

fn detect_schema_types(html: &str) -> Vec<String> {
    let mut types = Vec::new();
    if html.contains("FAQPage") {
        types.push("FAQPage".to_string());
    }
    if html.contains("Article") {
        types.push("Article".to_string());
    }
    if html.contains("BreadcrumbList") {
        types.push("BreadcrumbList".to_string());
    }
    if html.contains("VideoObject") {
        types.push("VideoObject".to_string());
    }
    types
}

// ------------------------------------------------------------
// Existing content snapshot
// ------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingContentAnalysis {
    pub word_count: usize,
    pub image_count: usize,
    #[serde(rename = "hasFAQ")]
    pub has_faq: bool,
    pub has_schema: bool,
    pub heading_count: usize,
    pub internal_links: usize,
    pub external_links: usize,
}

/// Quick structural inventory of a post before it is rewritten.
pub fn analyze_existing_content(html: &str) -> ExistingContentAnalysis {
    if html.trim().is_empty() {
        return ExistingContentAnalysis::default();
    }
    let doc = Html::parse_fragment(html);
    let text = text_of(&doc);

    let (mut internal, mut external) = (0, 0);
    for href in doc.select(&SEL_LINKS).filter_map(|a| a.value().attr("href")) {
        if href.starts_with('/') || href.starts_with('#') {
            internal += 1;
        } else if href.starts_with("http") {
            external += 1;
        }
    }

    let lower = html.to_lowercase();
    ExistingContentAnalysis {
        word_count: text.split_whitespace().count(),
        image_count: doc.select(&SEL_IMG).count(),
        has_faq: lower.contains("frequently asked")
            || lower.contains("faq")
            || html.contains("FAQPage"),
        has_schema: html.contains("application/ld+json")
            || html.contains(r#"itemtype="https://schema.org"#),
        heading_count: doc.select(&SEL_HEADINGS).count(),
        internal_links: internal,
        external_links: external,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repeat(tag: &str, n: usize) -> String {
        (0..n).map(|i| format!("<{tag}>Heading {i}</{tag}>")).collect()
    }

    #[test]
    fn empty_html_gives_zeroes() {
        assert_eq!(calculate_seo_metrics("", "t", "s"), SeoMetrics::default());
        assert_eq!(calculate_seo_metrics("   ", "t", "s").content_depth, 0);
    }

    #[test]
    fn seven_h2_twenty_h3_is_perfect_structure() {
        let html = format!("{}{}", repeat("h2", 7), repeat("h3", 20));
        let m = calculate_seo_metrics(&html, "t", "s");
        assert_eq!(m.h2_count, 7);
        assert_eq!(m.h3_count, 20);
        assert_eq!(m.heading_structure, 100);
    }

    #[test]
    fn h1_penalty_follows_formula() {
        for h1 in 1..5 {
            let html = format!("{}{}", repeat("h1", h1), repeat("h2", 6));
            let m = calculate_seo_metrics(&html, "t", "s");
            assert_eq!(m.heading_structure, 60u32.saturating_sub(20 * h1 as u32));
        }
    }

    #[test]
    fn readability_bands() {
        let short = "Cats sleep. Dogs run. Birds fly.";
        assert_eq!(readability(short, 6), 90);
        let long = format!("{}.", "word ".repeat(40));
        assert_eq!(readability(&long, 40), 50);
    }

    #[test]
    fn detects_schema_and_aeo_signals() {
        let html = r#"
            <div class="quick">Quick Answer: yes.</div>
            <section itemscope itemtype="https://schema.org/FAQPage"><h2>Frequently Asked Questions</h2></section>
            <details><summary>More</summary>Hidden</details>
            <table><tr><td>a</td></tr></table>
        "#;
        let m = calculate_seo_metrics(html, "t", "s");
        assert!(m.schema_detected);
        assert_eq!(m.schema_types, vec!["FAQPage".to_string()]);
        assert_eq!(m.aeo_score, 20 + 25 + 15 + 15);
        assert!(m.faq_count >= 2);
    }

    #[test]
    fn eeat_and_internal_links() {
        let html = r#"<p>According to the survey, research shows gains.</p>
            <a href="/guide">a</a><a href="https://x.com/my-post/part">b</a><a href="https://other.com">c</a>"#;
        let m = calculate_seo_metrics(html, "t", "my-post");
        assert_eq!(m.eeat_signals, 24);
        assert_eq!(m.internal_link_score, 10);
    }

    #[test]
    fn scores_stay_within_bounds() {
        let body: String = (0..60)
            .map(|i| format!("<h2>S{i}</h2><h3>a</h3><h3>b</h3><ul><li>x</li></ul><img src=\"{i}.png\"><p>{}</p>", "word ".repeat(120)))
            .collect();
        let html = format!("{body}<table></table><blockquote>q</blockquote>");
        let m = calculate_seo_metrics(&html, "t", "s");
        for v in [m.content_depth, m.readability, m.heading_structure, m.aeo_score, m.geo_score, m.eeat_signals, m.internal_link_score] {
            assert!(v <= 100);
        }
        assert_eq!(m.content_depth, 100);
        assert_eq!(m.geo_score, 100);
    }

    #[test]
    fn existing_content_inventory() {
        let html = r##"<h2>A</h2><h3>B</h3><p>one two three</p><img src="a.png">
            <a href="/x">i</a><a href="#top">i</a><a href="https://e.com">e</a>
            <script type="application/ld+json">{}</script>"##;
        let a = analyze_existing_content(html);
        assert_eq!(a.heading_count, 2);
        assert_eq!(a.image_count, 1);
        assert_eq!(a.internal_links, 2);
        assert_eq!(a.external_links, 1);
        assert!(a.has_schema);
        assert!(!a.has_faq);
    }
}
