use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::config::OptimizerConfig;
use crate::contract::{ContentContract, EntityGapAnalysis, InternalLinkTarget, NeuronTerm};
use crate::error::OptimizerError;
use crate::history::{GlobalStats, RunHistory, RunRecord};
use crate::links::{inject_internal_links, LinkInjectionOptions, LinkInjectionResult};
use crate::metrics::Metrics;
use crate::pipeline::{optimize_contract, OptimizationReport, OptimizeOptions};
use crate::qa::{run_qa_swarm, QaSwarmResult};
use crate::seo::analyzer::{SeoAnalysis, SeoAnalyzer};
use crate::seo::{analyze_existing_content, calculate_seo_metrics, ExistingContentAnalysis, SeoMetrics};
use crate::text::{remove_all_h1_tags, validate_no_h1};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<OptimizerConfig>,
    pub history: Arc<RunHistory>,
}

impl AppState {
    pub fn new(config: OptimizerConfig) -> Self {
        let history = Arc::new(RunHistory::with_capacity(config.server.history_capacity));
        Self {
            config: Arc::new(config),
            history,
        }
    }
}

pub fn create_router(state: AppState, metrics: &Metrics) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/seo/metrics", post(seo_metrics))
        .route("/seo/analyze", post(seo_analyze))
        .route("/content/remove-h1", post(remove_h1))
        .route("/links/inject", post(links_inject))
        .route("/qa", post(qa))
        .route("/optimize", post(optimize))
        .route("/stats", get(stats))
        .route("/debug/history", get(debug_history))
        .merge(metrics.router())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

impl IntoResponse for OptimizerError {
    fn into_response(self) -> Response {
        self.report("api");
        let status = match &self {
            OptimizerError::Validation(_) => StatusCode::BAD_REQUEST,
            OptimizerError::Llm(_) | OptimizerError::WordPress(_) | OptimizerError::Serp(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error": self.to_string(), "code": self.code() }));
        (status, body).into_response()
    }
}

fn require(html: &str) -> Result<(), OptimizerError> {
    if html.trim().is_empty() {
        return Err(OptimizerError::Validation("html is empty".into()));
    }
    Ok(())
}

#[derive(Deserialize)]
struct HtmlReq {
    html: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    slug: String,
}

async fn seo_metrics(Json(body): Json<HtmlReq>) -> Result<Json<SeoMetrics>, OptimizerError> {
    require(&body.html)?;
    Ok(Json(calculate_seo_metrics(&body.html, &body.title, &body.slug)))
}

#[derive(Deserialize)]
struct AnalyzeReq {
    html: String,
    keyword: String,
}

#[derive(Serialize)]
struct AnalyzeResp {
    analysis: SeoAnalysis,
    existing: ExistingContentAnalysis,
}

async fn seo_analyze(Json(body): Json<AnalyzeReq>) -> Result<Json<AnalyzeResp>, OptimizerError> {
    require(&body.html)?;
    if body.keyword.trim().is_empty() {
        return Err(OptimizerError::Validation("keyword is empty".into()));
    }
    Ok(Json(AnalyzeResp {
        analysis: SeoAnalyzer::new(&body.html, body.keyword.trim()).analyze(),
        existing: analyze_existing_content(&body.html),
    }))
}

#[derive(Serialize)]
struct RemoveH1Resp {
    html: String,
    removed: usize,
}

async fn remove_h1(Json(body): Json<HtmlReq>) -> Json<RemoveH1Resp> {
    let removed = validate_no_h1(&body.html).count;
    Json(RemoveH1Resp {
        html: remove_all_h1_tags(&body.html),
        removed,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InjectReq {
    html: String,
    #[serde(default)]
    targets: Vec<InternalLinkTarget>,
    #[serde(default)]
    current_url: String,
    #[serde(default)]
    options: Option<LinkInjectionOptions>,
}

async fn links_inject(State(state): State<AppState>, Json(body): Json<InjectReq>) -> Json<LinkInjectionResult> {
    let options = body.options.unwrap_or(state.config.links);
    Json(inject_internal_links(&body.html, &body.targets, &body.current_url, &options))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QaReq {
    contract: ContentContract,
    #[serde(default)]
    entity_gap: Option<EntityGapAnalysis>,
    #[serde(default)]
    neuron_terms: Option<Vec<NeuronTerm>>,
}

async fn qa(Json(body): Json<QaReq>) -> Json<QaSwarmResult> {
    Json(run_qa_swarm(
        &body.contract,
        body.entity_gap.as_ref(),
        body.neuron_terms.as_deref(),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptimizeReq {
    contract: ContentContract,
    #[serde(default)]
    targets: Vec<InternalLinkTarget>,
    #[serde(default)]
    current_url: String,
    #[serde(default)]
    options: Option<OptimizeOptions>,
}

async fn optimize(
    State(state): State<AppState>,
    Json(body): Json<OptimizeReq>,
) -> Result<Json<OptimizationReport>, OptimizerError> {
    let options = body.options.unwrap_or_else(|| OptimizeOptions {
        links: state.config.links,
        ..OptimizeOptions::default()
    });
    let report = optimize_contract(body.contract, &body.targets, &body.current_url, &options)?;
    state.history.record(&report);
    Ok(Json(report))
}

async fn stats(State(state): State<AppState>) -> Json<GlobalStats> {
    Json(state.history.global_stats())
}

#[derive(Deserialize)]
struct HistoryQuery {
    n: Option<usize>,
}

async fn debug_history(State(state): State<AppState>, Query(q): Query<HistoryQuery>) -> Json<Vec<RunRecord>> {
    Json(state.history.snapshot_last_n(q.n.unwrap_or(10)))
}
