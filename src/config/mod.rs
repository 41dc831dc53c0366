//! Runtime configuration.
//!
//! Loaded from TOML (`$WPO_CONFIG_PATH`, default `config/optimizer.toml`).
//! A missing default file yields built-in defaults; secrets written as `"ENV"`
//! are pulled from the environment.

pub mod llm;

pub use llm::{EmbeddingConfig, LlmConfig};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::agent::AgentConfig;
use crate::links::LinkInjectionOptions;
use crate::youtube::YouTubeConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/optimizer.toml";
pub const ENV_CONFIG_PATH: &str = "WPO_CONFIG_PATH";
pub const ENV_LLM_MODEL: &str = "WPO_LLM_MODEL";
pub const ENV_WP_SITE_URL: &str = "WPO_WP_SITE_URL";

pub const SERPER_BASE_URL: &str = "https://google.serper.dev";

fn default_serper_base() -> String {
    SERPER_BASE_URL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerperConfig {
    /// "ENV" means: read from SERPER_API_KEY.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_serper_base")]
    pub base_url: String,
}

impl Default for SerperConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_serper_base(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_delay_ms() -> u64 {
    1000
}
fn default_multiplier() -> f64 {
    2.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordPressConfig {
    pub site_url: String,
    pub username: String,
    /// "ENV" means: read from WP_APP_PASSWORD.
    pub application_password: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub backoff_multiplier: f64,
}

impl WordPressConfig {
    pub fn new(
        site_url: impl Into<String>,
        username: impl Into<String>,
        application_password: impl Into<String>,
    ) -> Self {
        Self {
            site_url: site_url.into(),
            username: username.into(),
            application_password: application_password.into(),
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
            backoff_multiplier: default_multiplier(),
        }
    }
}

fn default_history_capacity() -> usize {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub llm: LlmConfig,
    pub embeddings: EmbeddingConfig,
    pub serper: SerperConfig,
    pub wordpress: Option<WordPressConfig>,
    pub links: LinkInjectionOptions,
    pub agent: AgentConfig,
    pub youtube: YouTubeConfig,
    pub server: ServerConfig,
}

impl OptimizerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: OptimizerConfig = toml::from_str(s).context("parsing optimizer config")?;
        cfg.finish()?;
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    /// `$WPO_CONFIG_PATH` must exist when set; the default path is optional.
    pub fn load() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from_file(&default);
        }
        let mut cfg = Self::default();
        cfg.finish()?;
        Ok(cfg)
    }

    fn finish(&mut self) -> Result<()> {
        self.apply_env_overrides();
        self.llm.resolve()?;
        self.embeddings.resolve()?;
        self.serper.api_key = llm::resolve_secret(&self.serper.api_key, "SERPER_API_KEY")?;
        if let Some(wp) = self.wordpress.as_mut() {
            wp.application_password =
                llm::resolve_secret(&wp.application_password, "WP_APP_PASSWORD")?;
            if wp.max_attempts == 0 {
                wp.max_attempts = 1;
            }
            if !(1.0..=10.0).contains(&wp.backoff_multiplier) {
                wp.backoff_multiplier = default_multiplier();
            }
        }
        self.sanitize();
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var(ENV_LLM_MODEL) {
            if !model.trim().is_empty() {
                self.llm.model = model.trim().to_string();
            }
        }
        if let (Ok(site), Some(wp)) = (std::env::var(ENV_WP_SITE_URL), self.wordpress.as_mut()) {
            if !site.trim().is_empty() {
                wp.site_url = site.trim().to_string();
            }
        }
    }

    fn sanitize(&mut self) {
        let defaults = LinkInjectionOptions::default();
        if !(0.0..=1.0).contains(&self.links.min_relevance) {
            self.links.min_relevance = defaults.min_relevance;
        }
        if self.links.max_links == 0 {
            self.links.max_links = defaults.max_links;
        }
        if self.links.max_links_per_section == Some(0) {
            self.links.max_links_per_section = defaults.max_links_per_section;
        }
        if !(0.0..=1.0).contains(&self.agent.confidence_threshold) {
            self.agent.confidence_threshold = AgentConfig::default().confidence_threshold;
        }
        if self.agent.max_iterations == 0 {
            self.agent.max_iterations = AgentConfig::default().max_iterations;
        }
        if self.youtube.min_duration_secs > self.youtube.max_duration_secs {
            std::mem::swap(
                &mut self.youtube.min_duration_secs,
                &mut self.youtube.max_duration_secs,
            );
        }
        if self.server.history_capacity == 0 {
            self.server.history_capacity = default_history_capacity();
        }
    }
}
