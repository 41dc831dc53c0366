use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::error::LlmError;

/// Input longer than this is cut before it is sent.
pub const MAX_EMBEDDING_INPUT_CHARS: usize = 8000;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;
}

/// OpenAI-compatible `/v1/embeddings` client.
pub struct OpenAiEmbeddings {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiEmbeddings {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: crate::config::llm::OPENAI_EMBEDDINGS_ENDPOINT.to_string(),
        }
    }

    pub fn from_config(cfg: &EmbeddingConfig) -> Self {
        Self::new(cfg.api_key.clone(), cfg.model.clone()).with_endpoint(cfg.endpoint.clone())
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            input: String,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            data: Vec<Item>,
        }
        #[derive(Deserialize)]
        struct Item {
            embedding: Vec<f32>,
        }

        let input: String = text.chars().take(MAX_EMBEDDING_INPUT_CHARS).collect();
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&Req {
                model: &self.model,
                input,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: Resp = resp.json().await?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|i| i.embedding)
            .filter(|v| !v.is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}
