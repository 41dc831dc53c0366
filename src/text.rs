//! Text utilities shared by the scorers, the link injector and the renderers:
//! word counting, HTML stripping/escaping, slug and title sanitization,
//! H1 removal and small formatting helpers.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Node};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("static regex"));
static RE_SLUG_INVALID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9-]").expect("static regex"));
static RE_DASH_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("static regex"));

// ------------------------------------------------------------
// Word counting / stripping
// ------------------------------------------------------------

/// Counts whitespace-separated words after replacing every tag with a space.
pub fn count_words(html: &str) -> usize {
    if html.is_empty() {
        return 0;
    }
    RE_TAG.replace_all(html, " ").split_whitespace().count()
}

/// Plain text content of an HTML fragment with entities decoded.
/// Text nodes are joined with a single space; `<script>` and `<style>`
/// bodies are skipped.
pub fn strip_html(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let doc = Html::parse_fragment(html);
    text_of(&doc)
}

/// Text of an already parsed document, same rules as [`strip_html`].
pub(crate) fn text_of(doc: &Html) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in doc.tree.nodes() {
        if let Node::Text(t) = node.value() {
            let skip = node
                .parent()
                .and_then(|p| p.value().as_element().map(|e| e.name()))
                .is_some_and(|name| matches!(name, "script" | "style"));
            if !skip {
                let s = t.trim();
                if !s.is_empty() {
                    parts.push(s);
                }
            }
        }
    }
    parts.join(" ")
}

/// Escapes `& < > " '` for safe interpolation into markup and attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}

// ------------------------------------------------------------
// Slugs / titles
// ------------------------------------------------------------

/// Last non-empty path segment of a URL. Relative or unparsable input falls
/// back to splitting on `/`.
pub fn extract_slug_from_url(raw: &str) -> String {
    if let Ok(parsed) = url::Url::parse(raw) {
        if let Some(last) = parsed
            .path_segments()
            .and_then(|segs| segs.filter(|s| !s.is_empty()).last())
        {
            return last.to_string();
        }
        return String::new();
    }
    raw.split(['?', '#'])
        .next()
        .unwrap_or_default()
        .split('/')
        .filter(|s| !s.is_empty())
        .last()
        .unwrap_or_default()
        .to_string()
}

pub fn sanitize_slug(s: &str) -> String {
    let lower = s.to_lowercase();
    let replaced = RE_SLUG_INVALID.replace_all(&lower, "-");
    let collapsed = RE_DASH_RUN.replace_all(&replaced, "-");
    collapsed.trim_matches('-').to_string()
}

/// Usable page title: the trimmed title when meaningful, otherwise the
/// title-cased slug, otherwise "Untitled Page".
pub fn sanitize_title(title: &str, fallback_slug: Option<&str>) -> String {
    let trimmed = title.trim();
    if trimmed.chars().count() > 3 && !trimmed.eq_ignore_ascii_case("home") {
        return trimmed.to_string();
    }
    match fallback_slug.filter(|s| !s.trim().is_empty()) {
        Some(slug) => slug
            .split('-')
            .filter(|w| !w.is_empty())
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" "),
        None => "Untitled Page".to_string(),
    }
}

fn capitalize(w: &str) -> String {
    let mut chars = w.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ------------------------------------------------------------
// Formatting
// ------------------------------------------------------------

pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let minutes = ms / 60_000;
        let seconds = ((ms % 60_000) as f64 / 1000.0).round() as u64;
        format!("{minutes}m {seconds}s")
    }
}

pub fn format_number(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1000 {
        format!("{:.1}K", n as f64 / 1000.0)
    } else {
        n.to_string()
    }
}

/// `1234567` -> `"1,234,567"`.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Short, stable fingerprint used in logs instead of raw content.
pub fn fingerprint(s: &str) -> String {
    let digest = Sha256::digest(s.as_bytes());
    digest[..6].iter().map(|b| format!("{b:02x}")).collect()
}

// ------------------------------------------------------------
// H1 handling
// ------------------------------------------------------------

static RE_H1_PRESENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<h1").expect("static regex"));
static RE_H1_PAIRED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<h1[^>]*>.*?</h1>").expect("static regex"));
static RE_H1_SELF_CLOSING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<h1[^>]*/>").expect("static regex"));
static RE_H1_STRAY_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<h1\b[^>]*>").expect("static regex"));
static RE_H1_STRAY_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</h1>").expect("static regex"));
static RE_H1_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)h1").expect("static regex"));
static RE_H1_OPEN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<h1[^>]*>").expect("static regex"));
static RE_NEWLINE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("static regex"));

/// Removes every H1 element (the WordPress theme renders the post title as
/// the page H1). Input without any `<h1` is returned untouched; otherwise the
/// result is trimmed with newline runs collapsed. Applying it twice yields the
/// same output as applying it once.
pub fn remove_all_h1_tags(html: &str) -> String {
    if html.is_empty() || !RE_H1_PRESENT.is_match(html) {
        return html.to_string();
    }

    let mut out = html.to_string();
    // Nested or concatenated fragments can expose a new pair after removal.
    for _ in 0..3 {
        out = RE_H1_PAIRED.replace_all(&out, "").into_owned();
        out = RE_H1_SELF_CLOSING.replace_all(&out, "").into_owned();
    }
    out = RE_H1_STRAY_OPEN.replace_all(&out, "").into_owned();
    out = RE_H1_STRAY_CLOSE.replace_all(&out, "").into_owned();
    out = RE_NEWLINE_RUN.replace_all(&out, "\n\n").into_owned();
    out = out.trim().to_string();

    if RE_H1_PRESENT.is_match(&out) {
        tracing::warn!(target: "wpo::text", "h1 fragments survived removal, demoting to h2");
        out = RE_H1_NAME.replace_all(&out, "h2").into_owned();
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct H1Check {
    pub valid: bool,
    pub count: usize,
}

pub fn validate_no_h1(html: &str) -> H1Check {
    let count = RE_H1_OPEN_TAG.find_iter(html).count();
    H1Check {
        valid: count == 0,
        count,
    }
}

// ------------------------------------------------------------
// Opportunity score
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityScore {
    pub total: u32,
    pub title_score: u32,
    pub length_score: u32,
    pub freshness_score: u32,
}

/// Ranks how much a page would gain from optimization, from its title length
/// and (when known) its word count.
pub fn calculate_opportunity_score(title: &str, word_count: Option<usize>) -> OpportunityScore {
    let len = title.chars().count();
    let title_score = if len == 0 {
        50
    } else if (50..=60).contains(&len) {
        100
    } else if (40..=70).contains(&len) {
        80
    } else if len < 30 || len > 80 {
        30
    } else {
        50
    };

    let length_score = match word_count {
        Some(wc) if wc >= 4000 => 100,
        Some(wc) if wc >= 2500 => 80,
        Some(wc) if wc >= 1500 => 60,
        Some(wc) if wc >= 800 => 40,
        Some(_) => 20,
        None => 50,
    };

    let freshness_score = 50;
    let total = (title_score as f64 * 0.3 + length_score as f64 * 0.5 + freshness_score as f64 * 0.2)
        .round() as u32;

    OpportunityScore {
        total,
        title_score,
        length_score,
        freshness_score,
    }
}
