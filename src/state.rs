//! Application state management for the exporter.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers and used by the background poll task.

use container_stats_exporter::{DeviceNameResolver, MetricCatalog, PollStats};
use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests and background tasks.
pub struct AppState {
    pub registry: Registry,
    /// Every container metric, bound to `registry`.
    pub catalog: MetricCatalog,
    /// Device name cache shared by all poll cycles.
    pub resolver: Arc<DeviceNameResolver>,
    pub poll_stats: Arc<PollStats>,
    pub config: Arc<Config>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}
