//! Error kinds shared across the crate.
//!
//! Each outbound integration has its own enum; [`OptimizerError`] wraps them
//! for callers that only care whether a failure is operational (bad input,
//! upstream hiccup, misconfiguration) or unexpected.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM API key is not configured")]
    MissingApiKey,

    #[error("LLM network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("LLM API error: {status}")]
    Status { status: u16, body: String },

    #[error("LLM response had no choices")]
    EmptyResponse,

    /// The model answered, but not with the JSON shape we asked for.
    #[error("LLM response is not valid JSON for the expected shape: {reason}")]
    Decode { reason: String, raw: String },

    #[error("daily LLM call limit of {0} reached")]
    DailyLimit(u32),
}

#[derive(Debug, Error)]
pub enum WpError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("WordPress network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("WordPress response decode failed: {0}")]
    Decode(String),

    #[error("invalid WordPress configuration: {0}")]
    Config(String),
}

#[derive(Debug, Error)]
pub enum SerpError {
    #[error("Serper API key is not configured")]
    MissingApiKey,

    #[error("SERP request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("SERP API error: {0}")]
    Status(u16),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    Unknown(String),

    #[error("invalid parameters for {tool}: {reason}")]
    InvalidParams { tool: &'static str, reason: String },

    /// The backing service (YouTube, memory, WordPress) is not configured.
    #[error("{tool} is unavailable: {reason}")]
    Unavailable { tool: &'static str, reason: &'static str },

    #[error("{tool} failed: {reason}")]
    Failed { tool: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("goal description is empty")]
    EmptyGoal,

    #[error("Failed to generate execution plan: {0}")]
    Planning(#[source] LlmError),

    #[error("Failed to reason about task: {0}")]
    Reasoning(#[source] LlmError),
}

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    WordPress(#[from] WpError),

    #[error(transparent)]
    Serp(#[from] SerpError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl OptimizerError {
    pub fn is_operational(&self) -> bool {
        !matches!(self, OptimizerError::Unexpected(_))
    }

    /// Stable machine-readable code for API responses and logs.
    pub fn code(&self) -> &'static str {
        match self {
            OptimizerError::Validation(_) => "VALIDATION_ERROR",
            OptimizerError::Llm(_) => "LLM_ERROR",
            OptimizerError::WordPress(_) => "WORDPRESS_ERROR",
            OptimizerError::Serp(_) => "SERP_ERROR",
            OptimizerError::Agent(AgentError::EmptyGoal) => "VALIDATION_ERROR",
            OptimizerError::Agent(_) => "AGENT_ERROR",
            OptimizerError::Config(_) => "CONFIG_ERROR",
            OptimizerError::Unexpected(_) => "INTERNAL_ERROR",
        }
    }

    /// Logs at `warn` for operational failures and at `error` (tagged fatal)
    /// for everything else.
    pub fn report(&self, context: &str) {
        if self.is_operational() {
            tracing::warn!(target: "wpo::error", code = self.code(), context, error = %self, "operational error");
        } else {
            tracing::error!(target: "wpo::error", code = self.code(), context, fatal = true, error = ?self, "unexpected error");
        }
    }
}
