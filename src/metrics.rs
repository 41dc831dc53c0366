use axum::{routing::get, Router};
use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Installs the Prometheus recorder on first use and reuses it afterwards.
    /// If some other recorder already owns the process, the handle renders
    /// an empty exposition instead of failing.
    pub fn init() -> Self {
        let handle = HANDLE.get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(h) => {
                describe();
                h
            }
            Err(e) => {
                tracing::warn!(target: "wpo::api", error = %e, "prometheus recorder not installed");
                PrometheusBuilder::new().build_recorder().handle()
            }
        });
        Self {
            handle: handle.clone(),
        }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("wpo_llm_requests_total", "Chat completion requests sent");
    describe_counter!("wpo_llm_errors_total", "Chat completion requests that failed");
    describe_counter!("wpo_qa_runs_total", "QA swarm runs");
    describe_counter!("wpo_qa_passed_total", "QA swarm runs that passed");
    describe_counter!("wpo_links_injected_total", "Internal links inserted");
    describe_counter!("wpo_wp_requests_total", "WordPress REST attempts");
    describe_counter!("wpo_wp_retries_total", "WordPress REST retries");
    describe_counter!("wpo_agent_tasks_total", "Agent tasks by final status");
    describe_counter!("wpo_optimize_runs_total", "Optimization pipeline runs");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_shares_handle() {
        let a = Metrics::init();
        let b = Metrics::init();
        metrics::counter!("wpo_optimize_runs_total").increment(1);
        assert_eq!(a.handle.render(), b.handle.render());
    }
}
