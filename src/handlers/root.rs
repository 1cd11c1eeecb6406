//! Root endpoint handler for the landing page.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");

    let version = env!("CARGO_PKG_VERSION");

    let uptime_secs = state.start_time.elapsed().as_secs();
    let hours = uptime_secs / 3600;
    let minutes = (uptime_secs % 3600) / 60;
    let seconds = uptime_secs % 60;
    let uptime_str = format!("{}h {}m {}s", hours, minutes, seconds);

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Container Stats Exporter</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 40px; }}
        li {{ margin: 10px 0; }}
        .desc {{ color: #666; }}
    </style>
</head>
<body>
    <h1>Container Stats Exporter</h1>
    <p>Version {version} &middot; uptime {uptime} &middot; {metrics} metrics, {containers} containers last cycle</p>
    <ul>
        <li><a href="/metrics">/metrics</a> <span class="desc">Prometheus metrics</span></li>
        <li><a href="/health">/health</a> <span class="desc">Poll loop statistics (text)</span></li>
        <li><a href="/config">/config</a> <span class="desc">Effective configuration (YAML)</span></li>
    </ul>
</body>
</html>"#,
        version = version,
        uptime = uptime_str,
        metrics = state.catalog.len(),
        containers = state.poll_stats.containers_per_cycle.snapshot().0,
    );

    Html(html)
}
