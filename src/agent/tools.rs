//! The closed set of tools the agent can invoke, dispatched by name over an
//! [`AgentWorkspace`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::components::{faq_accordion, faq_schema_json_ld, key_takeaways, quick_answer_box};
use crate::contract::{ContentContract, FaqItem, InternalLinkTarget};
use crate::error::ToolError;
use crate::links::{inject_internal_links, LinkInjectionOptions};
use crate::memory::VectorMemorySystem;
use crate::qa::run_qa_swarm;
use crate::seo::calculate_seo_metrics;
use crate::text::{count_words, remove_all_h1_tags, validate_no_h1};
use crate::wordpress::{PostUpdate, WordPressClient};
use crate::youtube::{inject_video_into_content, VideoPosition, YouTubeVideoService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    CalculateSeoMetrics,
    RemoveH1Tags,
    InjectInternalLinks,
    RunQaSwarm,
    AddQuickAnswer,
    AddKeyTakeaways,
    AddFaqSection,
    FindVideo,
    RecallMemory,
    PublishPost,
}

const TOOL_TABLE: [(ToolKind, &str, &str); 10] = [
    (
        ToolKind::CalculateSeoMetrics,
        "calculate_seo_metrics",
        "Score the current content (depth, readability, headings, AEO, GEO, E-E-A-T, links, schema)",
    ),
    (
        ToolKind::RemoveH1Tags,
        "remove_h1_tags",
        "Remove every H1 from the content body",
    ),
    (
        ToolKind::InjectInternalLinks,
        "inject_internal_links",
        "Add contextual internal links to the known site pages. Params: maxLinks?",
    ),
    (
        ToolKind::RunQaSwarm,
        "run_qa_swarm",
        "Run all quality checks and report the aggregate score",
    ),
    (
        ToolKind::AddQuickAnswer,
        "add_quick_answer",
        "Insert a quick-answer box after the first paragraph. Params: answer, title?",
    ),
    (
        ToolKind::AddKeyTakeaways,
        "add_key_takeaways",
        "Append a key takeaways box. Params: takeaways[]",
    ),
    (
        ToolKind::AddFaqSection,
        "add_faq_section",
        "Append an FAQ accordion with FAQPage schema. Params: faqs[{question, answer}]?",
    ),
    (
        ToolKind::FindVideo,
        "find_video",
        "Find a relevant YouTube video and embed it. Params: topic?, position?",
    ),
    (
        ToolKind::RecallMemory,
        "recall_memory",
        "Search long-term memory for related notes. Params: query?, topK?",
    ),
    (
        ToolKind::PublishPost,
        "publish_post",
        "Push the content to the WordPress post being optimized",
    ),
];

impl ToolKind {
    pub fn all() -> impl Iterator<Item = ToolKind> {
        TOOL_TABLE.iter().map(|(k, _, _)| *k)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        TOOL_TABLE
            .iter()
            .find(|(_, n, _)| *n == name.trim())
            .map(|(k, _, _)| *k)
    }

    pub fn name(self) -> &'static str {
        self.entry().1
    }

    pub fn description(self) -> &'static str {
        self.entry().2
    }

    fn entry(self) -> &'static (ToolKind, &'static str, &'static str) {
        // Every variant has exactly one row.
        TOOL_TABLE
            .iter()
            .find(|(k, _, _)| *k == self)
            .unwrap_or(&TOOL_TABLE[0])
    }
}

/// What the agent is working on: the article plus what the link tools need.
#[derive(Debug, Clone, Default)]
pub struct AgentWorkspace {
    pub contract: ContentContract,
    pub targets: Vec<InternalLinkTarget>,
    pub current_url: String,
    pub post_id: Option<u64>,
    pub link_options: LinkInjectionOptions,
}

impl AgentWorkspace {
    pub fn new(contract: ContentContract) -> Self {
        Self {
            contract,
            ..Self::default()
        }
    }

    fn set_html(&mut self, html: String) {
        self.contract.word_count = count_words(&html);
        self.contract.html_content = html;
    }
}

/// Optional backends for the tools that talk to the outside world.
#[derive(Clone, Default)]
pub struct ToolServices {
    pub youtube: Option<Arc<YouTubeVideoService>>,
    pub memory: Option<Arc<VectorMemorySystem>>,
    pub wordpress: Option<Arc<WordPressClient>>,
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    services: ToolServices,
}

impl ToolRegistry {
    pub fn new(services: ToolServices) -> Self {
        Self { services }
    }

    /// Tools whose backing services are present.
    pub fn available(&self) -> Vec<ToolKind> {
        ToolKind::all()
            .filter(|k| match k {
                ToolKind::FindVideo => self.services.youtube.is_some(),
                ToolKind::RecallMemory => self.services.memory.is_some(),
                ToolKind::PublishPost => self.services.wordpress.is_some(),
                _ => true,
            })
            .collect()
    }

    /// `- name: description` lines for prompts.
    pub fn catalog(&self) -> String {
        self.available()
            .into_iter()
            .map(|k| format!("- {}: {}", k.name(), k.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub async fn execute(
        &self,
        name: &str,
        params: &Value,
        ws: &mut AgentWorkspace,
    ) -> Result<Value, ToolError> {
        let kind = ToolKind::from_name(name).ok_or_else(|| ToolError::Unknown(name.to_string()))?;
        tracing::debug!(target: "wpo::agent", tool = kind.name(), "executing tool");
        match kind {
            ToolKind::CalculateSeoMetrics => {
                let c = &ws.contract;
                let m = calculate_seo_metrics(&c.html_content, &c.title, &c.slug);
                to_json(kind, &m)
            }
            ToolKind::RemoveH1Tags => {
                let before = validate_no_h1(&ws.contract.html_content).count;
                let html = remove_all_h1_tags(&ws.contract.html_content);
                ws.set_html(html);
                Ok(json!({ "removed": before }))
            }
            ToolKind::InjectInternalLinks => inject_links(params, ws),
            ToolKind::RunQaSwarm => to_json(kind, &run_qa_swarm(&ws.contract, None, None)),
            ToolKind::AddQuickAnswer => add_quick_answer(params, ws),
            ToolKind::AddKeyTakeaways => add_key_takeaways(params, ws),
            ToolKind::AddFaqSection => add_faq_section(params, ws),
            ToolKind::FindVideo => self.find_video(params, ws).await,
            ToolKind::RecallMemory => self.recall_memory(params, ws).await,
            ToolKind::PublishPost => self.publish_post(ws).await,
        }
    }

    async fn find_video(&self, params: &Value, ws: &mut AgentWorkspace) -> Result<Value, ToolError> {
        let kind = ToolKind::FindVideo;
        let service = self.services.youtube.as_ref().ok_or(ToolError::Unavailable {
            tool: kind.name(),
            reason: "YouTube search is not configured",
        })?;

        #[derive(Deserialize, Default)]
        #[serde(default)]
        struct P {
            topic: Option<String>,
            position: Option<VideoPosition>,
        }
        let p: P = parse(kind, params)?;
        let topic = p.topic.unwrap_or_else(|| ws.contract.title.clone());
        let found = service.find_best_video(&topic).await.map_err(|e| ToolError::Failed {
            tool: kind.name(),
            reason: e.to_string(),
        })?;
        let video = found.video.ok_or_else(|| ToolError::Failed {
            tool: kind.name(),
            reason: format!("no suitable video for {topic:?}"),
        })?;
        let html = inject_video_into_content(
            &ws.contract.html_content,
            &video,
            &topic,
            p.position.unwrap_or(VideoPosition::Middle),
        );
        ws.set_html(html);
        to_json(kind, &video)
    }

    async fn recall_memory(&self, params: &Value, ws: &AgentWorkspace) -> Result<Value, ToolError> {
        let kind = ToolKind::RecallMemory;
        let memory = self.services.memory.as_ref().ok_or(ToolError::Unavailable {
            tool: kind.name(),
            reason: "vector memory is not configured",
        })?;

        #[derive(Deserialize, Default)]
        #[serde(default, rename_all = "camelCase")]
        struct P {
            query: Option<String>,
            top_k: Option<usize>,
        }
        let p: P = parse(kind, params)?;
        let query = p.query.unwrap_or_else(|| ws.contract.title.clone());
        let hits = memory.search(&query, p.top_k.unwrap_or(5)).await;
        let out: Vec<Value> = hits
            .iter()
            .map(|h| json!({ "id": h.entry.id, "content": h.entry.content, "score": h.score }))
            .collect();
        Ok(json!({ "query": query, "memories": out }))
    }

    async fn publish_post(&self, ws: &AgentWorkspace) -> Result<Value, ToolError> {
        let kind = ToolKind::PublishPost;
        let client = self.services.wordpress.as_ref().ok_or(ToolError::Unavailable {
            tool: kind.name(),
            reason: "WordPress is not configured",
        })?;
        let id = ws.post_id.ok_or_else(|| ToolError::InvalidParams {
            tool: kind.name(),
            reason: "no post id in workspace".into(),
        })?;
        let post = client
            .update_post(id, &PostUpdate::from_contract(&ws.contract))
            .await
            .map_err(|e| ToolError::Failed {
                tool: kind.name(),
                reason: e.to_string(),
            })?;
        Ok(json!({ "postId": post.id, "link": post.link }))
    }
}

fn inject_links(params: &Value, ws: &mut AgentWorkspace) -> Result<Value, ToolError> {
    let kind = ToolKind::InjectInternalLinks;

    #[derive(Deserialize, Default)]
    #[serde(default, rename_all = "camelCase")]
    struct P {
        max_links: Option<usize>,
    }
    let p: P = parse(kind, params)?;
    let mut options = ws.link_options;
    if let Some(n) = p.max_links.filter(|n| *n > 0) {
        options.max_links = n;
    }
    let result = inject_internal_links(&ws.contract.html_content, &ws.targets, &ws.current_url, &options);
    let added = result.links_added.len();
    ws.contract.internal_links.extend(result.links_added);
    ws.set_html(result.html);
    Ok(json!({ "linksAdded": added, "totalLinks": ws.contract.internal_links.len() }))
}

fn add_quick_answer(params: &Value, ws: &mut AgentWorkspace) -> Result<Value, ToolError> {
    let kind = ToolKind::AddQuickAnswer;

    #[derive(Deserialize)]
    struct P {
        answer: String,
        #[serde(default)]
        title: Option<String>,
    }
    let p: P = parse(kind, params)?;
    if p.answer.trim().is_empty() {
        return Err(ToolError::InvalidParams {
            tool: kind.name(),
            reason: "answer is empty".into(),
        });
    }
    let block = quick_answer_box(&p.answer, p.title.as_deref());
    let html = &ws.contract.html_content;
    let updated = match html.find("</p>") {
        Some(i) => format!("{}{block}{}", &html[..i + 4], &html[i + 4..]),
        None => format!("{block}\n{html}"),
    };
    ws.set_html(updated);
    Ok(json!({ "inserted": true }))
}

fn add_key_takeaways(params: &Value, ws: &mut AgentWorkspace) -> Result<Value, ToolError> {
    let kind = ToolKind::AddKeyTakeaways;

    #[derive(Deserialize)]
    struct P {
        takeaways: Vec<String>,
    }
    let p: P = parse(kind, params)?;
    let items: Vec<String> = p.takeaways.into_iter().filter(|t| !t.trim().is_empty()).collect();
    if items.is_empty() {
        return Err(ToolError::InvalidParams {
            tool: kind.name(),
            reason: "takeaways is empty".into(),
        });
    }
    let html = format!("{}{}", ws.contract.html_content, key_takeaways(&items));
    ws.set_html(html);
    Ok(json!({ "takeaways": items.len() }))
}

fn add_faq_section(params: &Value, ws: &mut AgentWorkspace) -> Result<Value, ToolError> {
    let kind = ToolKind::AddFaqSection;

    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct P {
        faqs: Vec<FaqItem>,
    }
    let p: P = parse(kind, params)?;
    if !p.faqs.is_empty() {
        ws.contract.faqs = p.faqs;
    }
    if ws.contract.faqs.is_empty() {
        return Err(ToolError::InvalidParams {
            tool: kind.name(),
            reason: "no FAQs supplied and the contract has none".into(),
        });
    }
    let html = format!(
        "{}{}\n{}",
        ws.contract.html_content,
        faq_accordion(&ws.contract.faqs),
        faq_schema_json_ld(&ws.contract.faqs)
    );
    ws.set_html(html);
    Ok(json!({ "faqs": ws.contract.faqs.len() }))
}

/// Null parameters decode as an empty object.
fn parse<P: DeserializeOwned>(kind: ToolKind, params: &Value) -> Result<P, ToolError> {
    let v = if params.is_null() { json!({}) } else { params.clone() };
    serde_json::from_value(v).map_err(|e| ToolError::InvalidParams {
        tool: kind.name(),
        reason: e.to_string(),
    })
}

fn to_json<T: serde::Serialize>(kind: ToolKind, v: &T) -> Result<Value, ToolError> {
    serde_json::to_value(v).map_err(|e| ToolError::Failed {
        tool: kind.name(),
        reason: e.to_string(),
    })
}
