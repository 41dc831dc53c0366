// src/lib.rs
// Public library surface for the binary, integration tests and reuse.

pub mod agent;
pub mod api;
pub mod components;
pub mod config;
pub mod contract;
pub mod error;
pub mod history;
pub mod links;
pub mod llm;
pub mod memory;
pub mod metrics;
pub mod pipeline;
pub mod qa;
pub mod seo;
pub mod serp;
pub mod telemetry;
pub mod text;
pub mod wordpress;
pub mod youtube;

pub use crate::config::OptimizerConfig;
pub use crate::contract::ContentContract;
pub use crate::error::OptimizerError;

use anyhow::Context;
use axum::Router;

/// Router over an explicit configuration.
pub fn build_app(config: OptimizerConfig) -> Router {
    let metrics = crate::metrics::Metrics::init();
    api::create_router(api::AppState::new(config), &metrics)
}

/// Loads configuration (see [`OptimizerConfig::load`]) and builds the router.
pub fn app() -> anyhow::Result<Router> {
    let config = OptimizerConfig::load().context("loading optimizer config")?;
    tracing::info!(
        target: "wpo::api",
        model = %config.llm.model,
        llm_configured = config.llm.is_configured(),
        wordpress = config.wordpress.is_some(),
        "configuration loaded"
    );
    Ok(build_app(config))
}
