//! WP Optimizer Pro: binary entrypoint.
//! Boots the Axum HTTP server with config, tracing and metrics wired in.

use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    wp_optimizer_pro::telemetry::init_tracing();

    let router = wp_optimizer_pro::app()?;
    Ok(router.into())
}
