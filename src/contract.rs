//! Shared data model: the generated article and the inputs/outputs that flow
//! between the scorers, the link injector and the WordPress updater.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatedReference {
    pub url: String,
    pub title: String,
    pub source: String,
    pub year: Option<String>,
    pub status: Option<u16>,
    pub is_valid: Option<bool>,
    pub domain: Option<String>,
    pub is_authority: Option<bool>,
    pub snippet: Option<String>,
    pub author: Option<String>,
    pub authority_score: Option<u32>,
    pub favicon: Option<String>,
}

/// The generated article. Built once per run and handed to QA and then to
/// the WordPress updater.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentContract {
    pub title: String,
    #[serde(default)]
    pub meta_description: String,
    pub slug: String,
    pub html_content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub word_count: usize,
    #[serde(default)]
    pub faqs: Vec<FaqItem>,
    /// JSON-LD document(s) to embed alongside the content.
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub references: Vec<ValidatedReference>,
    #[serde(default)]
    pub internal_links: Vec<InternalLinkResult>,
}

impl ContentContract {
    pub fn new(title: impl Into<String>, slug: impl Into<String>, html: impl Into<String>) -> Self {
        let html_content = html.into();
        Self {
            title: title.into(),
            slug: slug.into(),
            word_count: crate::text::count_words(&html_content),
            html_content,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalLinkTarget {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub relevance_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalLinkResult {
    pub url: String,
    pub anchor_text: String,
    pub relevance_score: f64,
    /// Byte offset of the host paragraph in the original HTML.
    pub position: usize,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeuronTermKind {
    Critical,
    Title,
    Header,
    Body,
}

/// Target term with a recommended usage frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuronTerm {
    pub term: String,
    #[serde(rename = "type")]
    pub kind: NeuronTermKind,
    pub importance: f64,
    pub recommended: u32,
    #[serde(default)]
    pub current: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityGapAnalysis {
    pub competitor_entities: Vec<String>,
    pub missing_entities: Vec<String>,
    pub top_keywords: Vec<String>,
    pub paa_questions: Vec<String>,
    pub content_gaps: Vec<String>,
    pub avg_word_count: usize,
    pub competitor_urls: Vec<String>,
    pub recommended_word_count: usize,
    pub topic_clusters: Vec<String>,
    pub semantic_terms: Vec<String>,
    pub validated_references: Vec<ValidatedReference>,
}
