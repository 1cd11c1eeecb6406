//! Container Stats Exporter Library
//!
//! Turns the loosely typed per-container statistics payload of the Docker
//! Engine API into typed, labeled Prometheus metrics.
//!
//! # Building blocks
//!
//! - [`DeviceNameResolver`]: cached `major:minor` to device name lookup via sysfs
//! - [`BlockIoStatsView`]: block I/O records grouped by statistic group and operation
//! - [`MetricSpec`]: name, help, kind, extra labels and extraction function of one metric
//! - [`MetricCatalog`]: every spec of [`catalog`] bound to a Prometheus registry
//!
//! # Usage
//!
//! ```rust
//! use container_stats_exporter::{
//!     catalog, BlockIoStatsView, ContainerAttributes, DeviceNameResolver, LabelSet,
//!     MetricCatalog, PollData,
//! };
//! use prometheus::Registry;
//! use serde_json::json;
//!
//! let registry = Registry::new();
//! let metrics = MetricCatalog::bind(&registry, catalog::all(), &["container_name"]).unwrap();
//!
//! let stats = json!({"cpu_stats": {"cpu_usage": {"percpu_usage": [100, 200]}}});
//! let container = ContainerAttributes::new("abc123", "web", json!({"State": "running"}));
//! let resolver = DeviceNameResolver::default();
//! let blkio = BlockIoStatsView::from_stats(&resolver, &stats).unwrap();
//!
//! let data = PollData { stats: &stats, container: &container, blkio: &blkio };
//! let report = metrics.update(&data, &LabelSet::new().with("container_name", "web"));
//! assert!(report.is_ok());
//! ```

pub mod blkio;
pub mod catalog;
pub mod container;
pub mod device;
pub mod error;
pub mod payload;
pub mod poll_stats;
pub mod registry;
pub mod spec;

// Re-export main types for convenience
pub use blkio::{BlkioEntry, BlockIoStatsView, OpKind};
pub use container::ContainerAttributes;
pub use device::DeviceNameResolver;
pub use error::{CatalogError, DeviceLookupError, ExtractError};
pub use poll_stats::PollStats;
pub use registry::{CycleReport, MetricCatalog};
pub use spec::{Extractor, LabelSet, MetricHandle, MetricKind, MetricSpec, PollData};
