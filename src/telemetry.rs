use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_LOG_FORMAT: &str = "WPO_LOG_FORMAT";
const DEFAULT_FILTER: &str = "wp_optimizer_pro=info,wpo=info,warn";

/// Installs the global subscriber: `RUST_LOG`-style filter plus a compact
/// formatter, or JSON lines when `WPO_LOG_FORMAT=json`. Calling it again is a
/// no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var(ENV_LOG_FORMAT)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry.with(fmt::layer().json().with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if installed.is_ok() {
        tracing::debug!(target: "wpo::api", json, "tracing initialised");
    }
}
