//! Internal link injector.
//!
//! Scans long paragraphs, scores each candidate target against the paragraph
//! text by token overlap and wraps a matching title phrase in an anchor.
//! Placement respects a minimum distance between links and an overall cap,
//! plus an optional cap per `<h2>` section.

pub mod sitemap;

use std::collections::HashMap;

use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::contract::{InternalLinkResult, InternalLinkTarget};
use crate::text::{escape_html, extract_slug_from_url};

static RE_PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<p(?:\s[^>]*)?>([^<]{100,})</p>").expect("static regex"));
static RE_H2_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<h2[\s>]").expect("static regex"));

const CONTEXT_CHARS: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkInjectionOptions {
    /// Below this count the run is logged as under-linked; it never forces links.
    pub min_links: usize,
    pub max_links: usize,
    pub min_relevance: f64,
    pub min_distance_between_links: usize,
    /// Opt-in cap per `<h2>` section; `None` leaves sections unlimited.
    pub max_links_per_section: Option<usize>,
}

impl Default for LinkInjectionOptions {
    fn default() -> Self {
        Self {
            min_links: 10,
            max_links: 20,
            min_relevance: 0.5,
            min_distance_between_links: 400,
            max_links_per_section: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkInjectionResult {
    pub html: String,
    pub links_added: Vec<InternalLinkResult>,
    pub total_links: usize,
}

/// A `<p>` candidate site, addressed by byte offsets into the source HTML.
#[derive(Debug)]
struct Paragraph<'a> {
    start: usize,
    text_start: usize,
    text: &'a str,
    section: usize,
}

fn collect_paragraphs(html: &str) -> Vec<Paragraph<'_>> {
    let h2_offsets: Vec<usize> = RE_H2_OPEN.find_iter(html).map(|m| m.start()).collect();
    RE_PARAGRAPH
        .captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let inner = caps.get(1)?;
            Some(Paragraph {
                start: whole.start(),
                text_start: inner.start(),
                text: inner.as_str(),
                section: h2_offsets.partition_point(|&o| o < whole.start()),
            })
        })
        .collect()
}

pub fn inject_internal_links(
    html: &str,
    targets: &[InternalLinkTarget],
    current_url: &str,
    options: &LinkInjectionOptions,
) -> LinkInjectionResult {
    let unchanged = || LinkInjectionResult {
        html: html.to_string(),
        links_added: Vec::new(),
        total_links: 0,
    };
    if html.is_empty() || targets.is_empty() {
        return unchanged();
    }

    let current_slug = extract_slug_from_url(current_url);
    let eligible: Vec<&InternalLinkTarget> = targets
        .iter()
        .filter(|t| t.url != current_url)
        .filter(|t| current_slug.is_empty() || !t.url.contains(&current_slug))
        .collect();

    let paragraphs = collect_paragraphs(html);
    if eligible.is_empty() || paragraphs.is_empty() {
        return unchanged();
    }

    let mut links: Vec<InternalLinkResult> = Vec::new();
    // (paragraph index, rewritten paragraph text)
    let mut edits: Vec<(usize, String)> = Vec::new();
    let mut last_position: Option<usize> = None;
    let mut per_section: HashMap<usize, usize> = HashMap::new();

    for target in eligible {
        if links.len() >= options.max_links {
            break;
        }
        for (idx, para) in paragraphs.iter().enumerate() {
            if edits.iter().any(|(used, _)| *used == idx) {
                continue;
            }
            if let Some(last) = last_position {
                if para.start < last.saturating_add(options.min_distance_between_links) {
                    continue;
                }
            }
            if let Some(cap) = options.max_links_per_section {
                if per_section.get(&para.section).copied().unwrap_or(0) >= cap {
                    continue;
                }
            }

            let relevance = relevance_score(target, &para.text.to_lowercase());
            if relevance < options.min_relevance {
                continue;
            }

            let Some(anchor) = find_anchor(&target.title, para.text) else {
                continue;
            };

            let link = format!(
                r#"<a href="{}" title="{}">{}</a>"#,
                escape_html(&target.url),
                escape_html(&target.title),
                &para.text[anchor.start..anchor.end]
            );
            let rewritten = format!(
                "{}{}{}",
                &para.text[..anchor.start],
                link,
                &para.text[anchor.end..]
            );

            links.push(InternalLinkResult {
                url: target.url.clone(),
                anchor_text: para.text[anchor.start..anchor.end].to_string(),
                relevance_score: relevance,
                position: para.start,
                context: Some(para.text.chars().take(CONTEXT_CHARS).collect()),
            });
            edits.push((idx, rewritten));
            last_position = Some(para.start);
            *per_section.entry(para.section).or_insert(0) += 1;
            break;
        }
    }

    if links.len() < options.min_links {
        tracing::debug!(
            target: "wpo::links",
            added = links.len(),
            min = options.min_links,
            "fewer internal links than requested"
        );
    }
    counter!("wpo_links_injected_total").increment(links.len() as u64);

    // Splice from the back so earlier offsets stay valid.
    edits.sort_by_key(|(idx, _)| std::cmp::Reverse(paragraphs[*idx].text_start));
    let mut out = html.to_string();
    for (idx, rewritten) in edits {
        let para = &paragraphs[idx];
        out.replace_range(para.text_start..para.text_start + para.text.len(), &rewritten);
    }

    LinkInjectionResult {
        html: out,
        total_links: links.len(),
        links_added: links,
    }
}

/// Token-overlap relevance of `target` for a lowercased paragraph, in [0, 1].
pub fn relevance_score(target: &InternalLinkTarget, text_lower: &str) -> f64 {
    let title_lower = target.title.to_lowercase();
    let title_words: Vec<&str> = title_lower
        .split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .collect();
    let title_hits = title_words.iter().filter(|w| text_lower.contains(*w)).count();
    let mut score = title_hits as f64 / title_words.len().max(1) as f64 * 0.5;

    let slug = if target.slug.is_empty() {
        extract_slug_from_url(&target.url)
    } else {
        target.slug.clone()
    };
    let slug_lower = slug.to_lowercase();
    let slug_words: Vec<&str> = slug_lower.split('-').filter(|w| !w.is_empty()).collect();
    let slug_hits = slug_words
        .iter()
        .filter(|w| w.chars().count() > 3 && text_lower.contains(*w))
        .count();
    score += slug_hits as f64 / slug_words.len().max(1) as f64 * 0.3;

    if !target.keywords.is_empty() {
        let kw_hits = target
            .keywords
            .iter()
            .filter(|k| text_lower.contains(&k.to_lowercase()))
            .count();
        score += kw_hits as f64 / target.keywords.len() as f64 * 0.2;
    }

    score.clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AnchorSpan {
    start: usize,
    end: usize,
}

/// First title window (5, then 4, then 3 words) that occurs in `text`
/// case-insensitively on word boundaries.
fn find_anchor(title: &str, text: &str) -> Option<AnchorSpan> {
    let words: Vec<&str> = title.split_whitespace().collect();
    if words.len() < 3 {
        return None;
    }
    for len in (3..=5usize).rev() {
        if len > words.len() {
            continue;
        }
        for window in words.windows(len) {
            let phrase = window.join(" ");
            if let Some(span) = locate_phrase(text, &phrase) {
                return Some(span);
            }
        }
    }
    None
}

fn locate_phrase(text: &str, phrase: &str) -> Option<AnchorSpan> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let lead = if phrase.starts_with(is_word) { r"\b" } else { "" };
    let trail = if phrase.ends_with(is_word) { r"\b" } else { "" };
    let pattern = format!("(?i){lead}{}{trail}", regex::escape(phrase));
    let re = Regex::new(&pattern).ok()?;
    re.find(text).map(|m| AnchorSpan {
        start: m.start(),
        end: m.end(),
    })
}
