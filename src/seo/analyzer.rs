//! Keyword-focused analyzer for a full HTML page (with `<title>` and meta
//! description): density, a complexity-weighted readability estimate, meta
//! checks and prioritized suggestions.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("static regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static RE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<title[^>]*>([^<]*)</title>").expect("static regex"));
static RE_META_DESC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]*name="description"[^>]*content="([^"]*)""#).expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionLevel {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoSuggestion {
    #[serde(rename = "type")]
    pub level: SuggestionLevel,
    pub category: String,
    pub message: String,
    pub impact: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaAnalysis {
    pub title_length: usize,
    pub title_optimal: bool,
    pub description_length: usize,
    pub description_optimal: bool,
    pub keyword_in_title: bool,
    pub keyword_in_description: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoAnalysis {
    pub overall_score: u32,
    /// Percentage, two decimals.
    pub keyword_density: f64,
    pub readability_score: u32,
    pub suggestions: Vec<SeoSuggestion>,
    pub meta_analysis: MetaAnalysis,
}

pub struct SeoAnalyzer<'a> {
    html: &'a str,
    content: String,
    keyword: String,
}

impl<'a> SeoAnalyzer<'a> {
    pub fn new(html: &'a str, keyword: &str) -> Self {
        let spaced = RE_TAG.replace_all(html, " ");
        let content = RE_WS.replace_all(&spaced, " ").trim().to_string();
        Self {
            html,
            content,
            keyword: keyword.to_lowercase(),
        }
    }

    pub fn analyze(&self) -> SeoAnalysis {
        let keyword_density = self.keyword_density();
        let readability_score = self.readability();
        let meta_analysis = self.meta();
        let suggestions = suggestions(keyword_density, readability_score, &meta_analysis);
        let overall_score = overall(keyword_density, readability_score, &meta_analysis);
        SeoAnalysis {
            overall_score,
            keyword_density,
            readability_score,
            suggestions,
            meta_analysis,
        }
    }

    fn words(&self) -> Vec<&str> {
        self.content.split_whitespace().collect()
    }

    fn keyword_density(&self) -> f64 {
        let words = self.words();
        if words.is_empty() || self.keyword.is_empty() {
            return 0.0;
        }
        let hits = words
            .iter()
            .filter(|w| w.to_lowercase().contains(&self.keyword))
            .count();
        (hits as f64 / words.len() as f64 * 100.0 * 100.0).round() / 100.0
    }

    fn readability(&self) -> u32 {
        let words = self.words();
        if words.is_empty() {
            return 0;
        }
        let sentences = self
            .content
            .split(['.', '!', '?'])
            .filter(|s| !s.trim().is_empty())
            .count();
        let avg = words.len() as f64 / sentences.max(1) as f64;
        let complex = words.iter().filter(|w| w.chars().count() > 10).count();
        let complex_ratio = complex as f64 / words.len() as f64;
        ((1.0 - complex_ratio) * (1.0 - (avg / 30.0).min(1.0)) * 100.0).round() as u32
    }

    fn meta(&self) -> MetaAnalysis {
        let title = RE_TITLE
            .captures(self.html)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let desc = RE_META_DESC
            .captures(self.html)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let title_len = title.chars().count();
        let desc_len = desc.chars().count();
        MetaAnalysis {
            title_length: title_len,
            title_optimal: (30..=60).contains(&title_len),
            description_length: desc_len,
            description_optimal: (120..=160).contains(&desc_len),
            keyword_in_title: title.to_lowercase().contains(&self.keyword),
            keyword_in_description: desc.to_lowercase().contains(&self.keyword),
        }
    }
}

fn overall(density: f64, readability: u32, meta: &MetaAnalysis) -> u32 {
    let mut score = 0.0;
    if (1.0..=3.0).contains(&density) {
        score += 25.0;
    } else if density > 0.0 {
        score += 10.0;
    }
    score += readability as f64 * 0.3;
    if meta.title_optimal {
        score += 15.0;
    }
    if meta.description_optimal {
        score += 15.0;
    }
    if meta.keyword_in_title {
        score += 10.0;
    }
    if meta.keyword_in_description {
        score += 5.0;
    }
    (score.round() as u32).min(100)
}

fn suggestions(density: f64, readability: u32, meta: &MetaAnalysis) -> Vec<SeoSuggestion> {
    let mut out = Vec::new();
    let mut push = |level, category: &str, message: &str, impact| {
        out.push(SeoSuggestion {
            level,
            category: category.to_string(),
            message: message.to_string(),
            impact,
        })
    };
    if density < 1.0 {
        push(SuggestionLevel::Critical, "Keywords", "Increase keyword density to at least 1%", 15);
    }
    if density > 3.0 {
        push(
            SuggestionLevel::Warning,
            "Keywords",
            "Reduce keyword density below 3% to avoid over-optimization",
            10,
        );
    }
    if !meta.keyword_in_title {
        push(SuggestionLevel::Critical, "Meta", "Add primary keyword to title tag", 10);
    }
    if !meta.title_optimal {
        push(SuggestionLevel::Warning, "Meta", "Optimize title length (30-60 characters)", 8);
    }
    if !meta.description_optimal {
        push(
            SuggestionLevel::Warning,
            "Meta",
            "Optimize meta description (120-160 characters)",
            8,
        );
    }
    if readability < 60 {
        push(SuggestionLevel::Info, "Readability", "Simplify content for better readability", 5);
    }
    out.sort_by(|a, b| b.impact.cmp(&a.impact));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_counts_words_containing_keyword() {
        let html = "<p>Keto diet basics. The keto plan works. Eat well now.</p>";
        let a = SeoAnalyzer::new(html, "Keto").analyze();
        // 2 of 10 words
        assert_eq!(a.keyword_density, 20.0);
        assert!(a.suggestions.iter().any(|s| s.message.starts_with("Reduce keyword")));
    }

    #[test]
    fn meta_checks_title_and_description() {
        let desc = "d".repeat(130);
        let html = format!(
            r#"<html><head><title>The Complete Keto Diet Guide For Beginners</title>
            <meta name="description" content="keto {desc}"></head><body><p>keto text here.</p></body></html>"#
        );
        let a = SeoAnalyzer::new(&html, "keto").analyze();
        assert!(a.meta_analysis.title_optimal);
        assert!(a.meta_analysis.description_optimal);
        assert!(a.meta_analysis.keyword_in_title);
        assert!(a.meta_analysis.keyword_in_description);
    }

    #[test]
    fn suggestions_sorted_by_impact() {
        let a = SeoAnalyzer::new("<p>nothing relevant.</p>", "widgets").analyze();
        let impacts: Vec<u32> = a.suggestions.iter().map(|s| s.impact).collect();
        let mut sorted = impacts.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(impacts, sorted);
        assert_eq!(a.suggestions[0].level, SuggestionLevel::Critical);
    }

    #[test]
    fn empty_content_is_zero() {
        let a = SeoAnalyzer::new("", "x").analyze();
        assert_eq!(a.keyword_density, 0.0);
        assert_eq!(a.readability_score, 0);
    }
}
