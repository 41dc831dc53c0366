// src/config/llm.rs
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;

use crate::llm::OPENROUTER_ENDPOINT;

pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const OPENAI_EMBEDDINGS_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";

fn default_provider() -> String {
    "openrouter".to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_endpoint() -> String {
    OPENROUTER_ENDPOINT.to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_daily_limit() -> u32 {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Only "openrouter" is wired; the name is kept for diagnostics.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from OPENROUTER_API_KEY.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: String::new(),
            endpoint: default_endpoint(),
            temperature: default_temperature(),
            daily_limit: default_daily_limit(),
        }
    }
}

impl LlmConfig {
    pub(crate) fn resolve(&mut self) -> Result<()> {
        self.provider = self.provider.trim().to_lowercase();
        if self.provider != "openrouter" {
            return Err(anyhow!("Unsupported LLM provider in config: {}", self.provider));
        }
        self.api_key = resolve_secret(&self.api_key, "OPENROUTER_API_KEY")?;
        if !(0.0..=2.0).contains(&self.temperature) {
            self.temperature = default_temperature();
        }
        if self.daily_limit == 0 {
            self.daily_limit = default_daily_limit();
        }
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}
fn default_embedding_endpoint() -> String {
    OPENAI_EMBEDDINGS_ENDPOINT.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "ENV" means: read from OPENAI_API_KEY.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_embedding_model(),
            endpoint: default_embedding_endpoint(),
        }
    }
}

impl EmbeddingConfig {
    pub(crate) fn resolve(&mut self) -> Result<()> {
        self.api_key = resolve_secret(&self.api_key, "OPENAI_API_KEY")?;
        Ok(())
    }
}

/// `"ENV"` (any case) pulls the value from `var`; anything else is taken verbatim.
pub(crate) fn resolve_secret(value: &str, var: &str) -> Result<String> {
    if value.trim().eq_ignore_ascii_case("env") {
        env::var(var).map_err(|_| anyhow!("Missing {var} env var"))
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[serial_test::serial]
    #[test]
    fn env_key_resolution() {
        env::set_var("OPENROUTER_API_KEY", "sk-test");
        let mut cfg = LlmConfig {
            api_key: "ENV".into(),
            ..Default::default()
        };
        cfg.resolve().unwrap();
        assert_eq!(cfg.api_key, "sk-test");

        env::remove_var("OPENROUTER_API_KEY");
        let mut cfg = LlmConfig {
            api_key: "env".into(),
            ..Default::default()
        };
        assert!(cfg.resolve().is_err());
    }

    #[test]
    fn sanitizes_ranges_and_provider() {
        let mut cfg = LlmConfig {
            provider: " OpenRouter ".into(),
            temperature: 7.0,
            daily_limit: 0,
            ..Default::default()
        };
        cfg.resolve().unwrap();
        assert_eq!(cfg.provider, "openrouter");
        assert!((cfg.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(cfg.daily_limit, 500);

        let mut bad = LlmConfig {
            provider: "groq".into(),
            ..Default::default()
        };
        assert!(bad.resolve().is_err());
    }
}
