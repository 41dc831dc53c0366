//! Chat-completion client abstraction.
//!
//! * [`LlmClient`]: the seam the agent talks to.
//! * [`OpenRouterClient`]: OpenRouter-compatible HTTP provider.
//! * [`ScriptedLlm`]: queued canned replies for tests and offline runs.
//! * [`BudgetedClient`]: per-day call cap around any client.
//! * [`decode_json`]: strict typed decode of JSON-shaped replies.

mod budget;
mod scripted;

pub use budget::BudgetedClient;
pub use scripted::ScriptedLlm;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::LlmError;

// ------------------------------------------------------------
// Request model
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    /// Single-turn prompt that must be answered with JSON.
    pub fn json_prompt(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            messages: vec![
                ChatMessage::system("Always respond with valid JSON"),
                ChatMessage::user(prompt),
            ],
            temperature: 0.3,
            max_tokens,
        }
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Returns the assistant message content.
    async fn complete(&self, req: &ChatRequest) -> Result<String, LlmError>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynLlm = Arc<dyn LlmClient>;

// ------------------------------------------------------------
// OpenRouter provider
// ------------------------------------------------------------

pub const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

pub struct OpenRouterClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    /// Overrides the per-request temperature when set.
    temperature: Option<f32>,
}

impl OpenRouterClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("wp-optimizer-pro/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: OPENROUTER_ENDPOINT.to_string(),
            temperature: None,
        }
    }

    pub fn from_config(cfg: &LlmConfig) -> Self {
        let mut client = Self::new(cfg.api_key.clone(), cfg.model.clone()).with_endpoint(cfg.endpoint.clone());
        client.temperature = Some(cfg.temperature);
        client
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn complete(&self, req: &ChatRequest) -> Result<String, LlmError> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: &'a [ChatMessage],
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: Option<String>,
        }

        counter!("wpo_llm_requests_total").increment(1);
        let body = Req {
            model: &self.model,
            messages: &req.messages,
            temperature: self.temperature.unwrap_or(req.temperature),
            max_tokens: req.max_tokens,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .inspect_err(|_| counter!("wpo_llm_errors_total").increment(1))?;

        let status = resp.status();
        if !status.is_success() {
            counter!("wpo_llm_errors_total").increment(1);
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(target: "wpo::llm", status = status.as_u16(), model = %self.model, "chat completion rejected");
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Resp = resp.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse)?;
        tracing::debug!(target: "wpo::llm", model = %self.model, chars = content.len(), "chat completion ok");
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "openrouter"
    }
}

/// Builds the configured client wrapped with the daily call cap.
pub fn build_client(cfg: &LlmConfig) -> DynLlm {
    let inner = OpenRouterClient::from_config(cfg);
    Arc::new(BudgetedClient::new(inner, cfg.daily_limit))
}

// ------------------------------------------------------------
// Strict JSON decoding
// ------------------------------------------------------------

/// Decodes a model reply into `T`. Tolerates Markdown code fences and prose
/// around a single JSON object; anything else is [`LlmError::Decode`].
pub fn decode_json<T: DeserializeOwned>(raw: &str) -> Result<T, LlmError> {
    let candidate = extract_json_object(raw).ok_or_else(|| LlmError::Decode {
        reason: "no JSON object found".to_string(),
        raw: raw.to_string(),
    })?;
    serde_json::from_str(candidate).map_err(|e| LlmError::Decode {
        reason: e.to_string(),
        raw: raw.to_string(),
    })
}

fn extract_json_object(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```").trim())
        .unwrap_or(trimmed);
    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    (end > start).then(|| &unfenced[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Thought {
        reasoning: String,
        #[serde(rename = "toolToUse")]
        tool: String,
    }

    #[test]
    fn decodes_plain_and_fenced_json() {
        let plain: Thought = decode_json(r#"{"reasoning":"r","toolToUse":"t"}"#).unwrap();
        assert_eq!(plain.tool, "t");
        let fenced: Thought =
            decode_json("```json\n{\"reasoning\":\"r\",\"toolToUse\":\"x\"}\n```").unwrap();
        assert_eq!(fenced.tool, "x");
        let chatty: Thought =
            decode_json("Sure! {\"reasoning\":\"r\",\"toolToUse\":\"y\"} hope that helps").unwrap();
        assert_eq!(chatty.tool, "y");
    }

    #[test]
    fn non_json_is_a_decode_error() {
        let err = decode_json::<Thought>("I think we should run QA").unwrap_err();
        assert!(matches!(err, LlmError::Decode { .. }));
        let err = decode_json::<Thought>(r#"{"reasoning": 1}"#).unwrap_err();
        match err {
            LlmError::Decode { raw, .. } => assert!(raw.contains("reasoning")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_key_fails_fast() {
        let c = OpenRouterClient::new("", "m");
        let err = c.complete(&ChatRequest::json_prompt("hi", 10)).await.unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }

    #[test]
    fn json_prompt_shape() {
        let r = ChatRequest::json_prompt("plan", 4000);
        assert_eq!(r.messages[0].content, "Always respond with valid JSON");
        assert_eq!(r.messages[1].role, "user");
        assert_eq!(r.max_tokens, 4000);
        assert!((r.temperature - 0.3).abs() < f32::EPSILON);
    }
}
