//! One-shot optimization of a generated article: strip H1s, add internal
//! links, then score and QA the result.

use std::time::Instant;

use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::contract::{ContentContract, EntityGapAnalysis, InternalLinkTarget, NeuronTerm};
use crate::error::OptimizerError;
use crate::links::{inject_internal_links, LinkInjectionOptions};
use crate::qa::{run_qa_swarm, QaSwarmResult};
use crate::seo::{calculate_seo_metrics, SeoMetrics};
use crate::text::{count_words, fingerprint, remove_all_h1_tags, validate_no_h1};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimizeOptions {
    pub links: LinkInjectionOptions,
    pub entity_gap: Option<EntityGapAnalysis>,
    pub neuron_terms: Option<Vec<NeuronTerm>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationReport {
    pub contract: ContentContract,
    pub h1_removed: usize,
    pub links_added: usize,
    pub metrics: SeoMetrics,
    pub qa: QaSwarmResult,
    /// Short hash of the final HTML.
    pub fingerprint: String,
    pub duration_ms: u64,
}

pub fn optimize_contract(
    mut contract: ContentContract,
    targets: &[InternalLinkTarget],
    current_url: &str,
    options: &OptimizeOptions,
) -> Result<OptimizationReport, OptimizerError> {
    if contract.html_content.trim().is_empty() {
        return Err(OptimizerError::Validation("html_content is empty".into()));
    }
    let started = Instant::now();
    counter!("wpo_optimize_runs_total").increment(1);

    let h1_removed = validate_no_h1(&contract.html_content).count;
    let html = remove_all_h1_tags(&contract.html_content);

    let linked = inject_internal_links(&html, targets, current_url, &options.links);
    let links_added = linked.links_added.len();
    contract.internal_links.extend(linked.links_added);
    contract.html_content = linked.html;
    contract.word_count = count_words(&contract.html_content);

    let metrics = calculate_seo_metrics(&contract.html_content, &contract.title, &contract.slug);
    let qa = run_qa_swarm(
        &contract,
        options.entity_gap.as_ref(),
        options.neuron_terms.as_deref(),
    );
    let fp = fingerprint(&contract.html_content);

    tracing::info!(
        target: "wpo::pipeline",
        slug = %contract.slug,
        fingerprint = %fp,
        h1_removed,
        links_added,
        words = contract.word_count,
        qa_score = qa.score,
        passed = qa.passed,
        "contract optimized"
    );

    Ok(OptimizationReport {
        contract,
        h1_removed,
        links_added,
        metrics,
        qa,
        fingerprint: fp,
        duration_ms: started.elapsed().as_millis() as u64,
    })
}
