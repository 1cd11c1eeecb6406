//! Background poll loop against the Docker Engine API.
//!
//! Each tick lists containers, fetches a one-shot stats payload per container
//! and runs the metric catalog over it. Containers are polled one after the
//! other; the whole cycle is bounded by `poll_timeout_seconds`.

use anyhow::{anyhow, Context, Result};
use bollard::container::{ListContainersOptions, StatsOptions};
use bollard::models::ContainerSummary;
use bollard::Docker;
use container_stats_exporter::{
    BlockIoStatsView, ContainerAttributes, CycleReport, DeviceNameResolver, MetricCatalog,
    PollData, PollStats,
};
use futures::StreamExt;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::state::SharedState;

/// One container's contribution to a poll cycle.
pub struct ContainerSnapshot {
    pub container: ContainerAttributes,
    pub stats: Value,
}

/// Runs poll cycles forever at the configured interval.
pub async fn run(state: SharedState, docker: Docker) {
    let interval = Duration::from_secs(state.config.poll_interval());
    let budget = Duration::from_secs(state.config.poll_timeout());

    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        "Polling containers every {}s (timeout {}s)",
        interval.as_secs(),
        budget.as_secs()
    );

    loop {
        ticker.tick().await;
        match time::timeout(budget, poll_once(&state, &docker)).await {
            Ok(Ok(count)) => debug!("Poll cycle finished: {} containers", count),
            Ok(Err(e)) => {
                error!("Poll cycle failed: {:#}", e);
                state.poll_stats.record_cycle_failure();
            }
            Err(_) => {
                warn!("Poll cycle exceeded {}s, abandoned", budget.as_secs());
                state.poll_stats.record_cycle_failure();
            }
        }
    }
}

/// Performs one poll cycle and returns the number of containers updated.
#[instrument(skip_all)]
pub async fn poll_once(state: &SharedState, docker: &Docker) -> Result<usize> {
    let start = Instant::now();
    let include_stopped = state.config.include_stopped.unwrap_or(false);

    let summaries = docker
        .list_containers(Some(ListContainersOptions::<String> {
            all: include_stopped,
            ..Default::default()
        }))
        .await
        .context("listing containers")?;

    debug!("Found {} containers", summaries.len());

    let mut updated = 0usize;
    let mut live = Vec::with_capacity(summaries.len());
    for summary in summaries {
        let container = match container_from_summary(summary) {
            Ok(c) => c,
            Err(e) => {
                warn!("Skipping container: {:#}", e);
                state.poll_stats.record_container_failure();
                continue;
            }
        };

        // Still listed: keep its series even if this cycle fails for it.
        live.push(container.base_labels(state.catalog.base_labels()));

        let stats = match fetch_stats(docker, &container.id).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Skipping container {}: {:#}", container.name, e);
                state.poll_stats.record_container_failure();
                continue;
            }
        };

        let snapshot = ContainerSnapshot { container, stats };
        if apply_snapshot(
            &state.catalog,
            &state.resolver,
            &state.poll_stats,
            &snapshot,
        )
        .is_some()
        {
            updated += 1;
        }
    }

    state.catalog.retain_containers(&live);

    state.poll_stats.record_cycle(
        updated as u64,
        start.elapsed().as_secs_f64(),
        state.resolver.len() as u64,
    );
    Ok(updated)
}

/// Runs the catalog over one snapshot and books its failures.
///
/// Returns `None` when the block I/O section itself is unusable; the
/// container is then skipped entirely. A device lookup failure clears the
/// resolver cache so renamed devices are picked up on the next cycle.
pub fn apply_snapshot(
    catalog: &MetricCatalog,
    resolver: &DeviceNameResolver,
    poll_stats: &PollStats,
    snapshot: &ContainerSnapshot,
) -> Option<CycleReport> {
    let container = &snapshot.container;
    let blkio = match BlockIoStatsView::from_stats(resolver, &snapshot.stats) {
        Ok(view) => view,
        Err(e) => {
            warn!("Skipping container {}: {}", container.name, e);
            poll_stats.record_container_failure();
            return None;
        }
    };

    let labels = container.base_labels(catalog.base_labels());
    let data = PollData {
        stats: &snapshot.stats,
        container,
        blkio: &blkio,
    };
    let report = catalog.update(&data, &labels);

    poll_stats.record_extraction_errors(report.errors.len() as u64);
    if report.has_device_errors() {
        poll_stats.record_device_lookup_failure();
        resolver.clear();
        poll_stats.record_device_cache_clear();
        debug!("Device name cache cleared after lookup failure");
    }

    Some(report)
}

/// Converts a list entry into container attributes.
fn container_from_summary(summary: ContainerSummary) -> Result<ContainerAttributes> {
    let id = summary
        .id
        .clone()
        .ok_or_else(|| anyhow!("container without id"))?;
    let name = summary
        .names
        .as_ref()
        .and_then(|names| names.first())
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_else(|| id.chars().take(12).collect());
    let attrs = serde_json::to_value(&summary).context("serializing container attributes")?;
    Ok(ContainerAttributes::new(id, name, attrs))
}

/// Fetches a single, non-streaming stats payload.
async fn fetch_stats(docker: &Docker, id: &str) -> Result<Value> {
    let mut stream = docker.stats(
        id,
        Some(StatsOptions {
            stream: false,
            one_shot: true,
        }),
    );

    match stream.next().await {
        Some(Ok(stats)) => serde_json::to_value(&stats).context("serializing stats payload"),
        Some(Err(e)) => Err(e).context("fetching stats"),
        None => Err(anyhow!("stats stream ended without a payload")),
    }
}
