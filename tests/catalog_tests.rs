//! Integration tests for the metric catalog.
//!
//! These tests bind the full catalog to a fresh registry, feed it stats
//! payloads and read the exported series back through the text encoder.

use container_stats_exporter::{
    catalog, BlockIoStatsView, CatalogError, ContainerAttributes, CycleReport, DeviceNameResolver,
    LabelSet, MetricCatalog, PollData,
};
use prometheus::{Encoder, Registry, TextEncoder};
use serde_json::{json, Value};

const BASE: &[&str] = &["container_name", "container_id"];

struct Harness {
    registry: Registry,
    catalog: MetricCatalog,
    resolver: DeviceNameResolver,
}

impl Harness {
    fn new() -> Self {
        let registry = Registry::new();
        let catalog = MetricCatalog::bind(&registry, catalog::all(), BASE).unwrap();
        Self {
            registry,
            catalog,
            resolver: DeviceNameResolver::new("/nonexistent"),
        }
    }

    fn poll(&self, stats: Value, attrs: Value) -> CycleReport {
        self.poll_container("abc123", "web", stats, attrs)
    }

    fn poll_container(&self, id: &str, name: &str, stats: Value, attrs: Value) -> CycleReport {
        let container = ContainerAttributes::new(id, name, attrs);
        let blkio = BlockIoStatsView::from_stats(&self.resolver, &stats).unwrap();
        let labels = container.base_labels(self.catalog.base_labels());
        let data = PollData {
            stats: &stats,
            container: &container,
            blkio: &blkio,
        };
        self.catalog.update(&data, &labels)
    }

    fn exposition(&self) -> String {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    /// Sample lines of `name`, excluding HELP/TYPE comments.
    fn samples(&self, name: &str) -> Vec<String> {
        self.exposition()
            .lines()
            .filter(|l| !l.starts_with('#'))
            .filter(|l| l.starts_with(&format!("{}{{", name)) || l.starts_with(&format!("{} ", name)))
            .map(String::from)
            .collect()
    }

    /// Value of the single series of `name` carrying every `labels` pair.
    fn value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        let matching: Vec<String> = self
            .samples(name)
            .into_iter()
            .filter(|l| {
                labels
                    .iter()
                    .all(|(k, v)| l.contains(&format!("{}=\"{}\"", k, v)))
            })
            .collect();
        assert!(matching.len() <= 1, "ambiguous series for {}: {:?}", name, matching);
        matching
            .first()
            .and_then(|l| l.rsplit(' ').next())
            .map(|v| v.parse().unwrap())
    }
}

#[test]
fn test_percpu_usage_one_series_per_cpu() {
    let h = Harness::new();
    let report = h.poll(
        json!({"cpu_stats": {"cpu_usage": {"percpu_usage": [100, 200, 150]}}}),
        json!({"State": "running"}),
    );
    assert!(report.is_ok(), "{:?}", report.errors);

    assert_eq!(h.samples("container_cpu_usage").len(), 3);
    assert_eq!(h.value("container_cpu_usage", &[("cpu", "0")]), Some(100.0));
    assert_eq!(h.value("container_cpu_usage", &[("cpu", "1")]), Some(200.0));
    assert_eq!(h.value("container_cpu_usage", &[("cpu", "2")]), Some(150.0));
    assert_eq!(
        h.value("container_cpu_usage", &[("cpu", "0"), ("container_name", "web"), ("container_id", "abc123")]),
        Some(100.0)
    );
}

#[test]
fn test_missing_subsystems_produce_no_series() {
    let h = Harness::new();
    let report = h.poll(json!({}), json!({}));

    assert!(report.is_ok());
    assert_eq!(report.applied, h.catalog.len());
    for spec in catalog::all() {
        assert!(h.samples(spec.name).is_empty(), "{} has series", spec.name);
    }
}

#[test]
fn test_null_sections_are_absent() {
    let h = Harness::new();
    let report = h.poll(
        json!({
            "cpu_stats": {"cpu_usage": {"percpu_usage": null}, "throttling_data": null},
            "memory_stats": null,
            "networks": null,
            "blkio_stats": {"io_service_bytes_recursive": null}
        }),
        json!({"State": null}),
    );
    assert!(report.is_ok(), "{:?}", report.errors);
    assert!(h.samples("container_cpu_usage").is_empty());
    assert!(h.samples("container_status").is_empty());
}

#[test]
fn test_cpu_and_memory_counters() {
    let h = Harness::new();
    h.poll(
        json!({
            "cpu_stats": {
                "system_cpu_usage": 5000,
                "cpu_usage": {"usage_in_kernelmode": 30, "total_usage": 120},
                "throttling_data": {"throttled_periods": 4, "throttled_time": 900}
            },
            "memory_stats": {"max_usage": 65536}
        }),
        json!({"State": "running"}),
    );

    assert_eq!(h.value("container_cpu_total_usage", &[]), Some(5000.0));
    assert_eq!(h.value("container_cpu_system_total_usage", &[]), Some(5000.0));
    assert_eq!(h.value("container_cpu_kernel_total_usage", &[]), Some(30.0));
    assert_eq!(h.value("container_cpu_user_total_usage", &[]), Some(120.0));
    assert_eq!(h.value("container_cpu_throttled_periods_count", &[]), Some(4.0));
    assert_eq!(h.value("container_cpu_throttled_periods_seconds", &[]), Some(900.0));
    assert_eq!(h.value("container_mem_max_usage_bytes", &[]), Some(65536.0));
}

#[test]
fn test_network_series_per_interface() {
    let h = Harness::new();
    h.poll(
        json!({
            "networks": {
                "eth0": {"rx_bytes": 1000, "tx_bytes": 2000, "rx_packets": 10, "tx_packets": 20,
                         "rx_errors": 0, "tx_errors": 1, "rx_dropped": 2, "tx_dropped": 3},
                "eth1": {"rx_bytes": 7}
            }
        }),
        json!({}),
    );

    assert_eq!(h.value("container_net_rx_bytes_total", &[("interface", "eth0")]), Some(1000.0));
    assert_eq!(h.value("container_net_rx_bytes_total", &[("interface", "eth1")]), Some(7.0));
    assert_eq!(h.value("container_net_tx_bytes_total", &[("interface", "eth0")]), Some(2000.0));
    assert_eq!(h.value("container_net_tx_dropped_count", &[("interface", "eth0")]), Some(3.0));
    // eth1 reports no tx fields at all.
    assert_eq!(h.samples("container_net_tx_bytes_total").len(), 1);
}

#[test]
fn test_status_values() {
    for (state, expected) in [("running", 0.0), ("exited", 1.0), ("paused", 10.0), ("Running", 0.0)] {
        let h = Harness::new();
        h.poll(json!({}), json!({"State": state}));
        assert_eq!(h.value("container_status", &[]), Some(expected), "state {}", state);
    }
}

#[test]
fn test_repeated_polls_export_latest_total() {
    let h = Harness::new();
    h.poll(json!({"memory_stats": {"max_usage": 100}}), json!({}));
    h.poll(json!({"memory_stats": {"max_usage": 250}}), json!({}));
    assert_eq!(h.value("container_mem_max_usage_bytes", &[]), Some(250.0));
}

#[test]
fn test_malformed_value_reported_and_others_applied() {
    let h = Harness::new();
    let report = h.poll(
        json!({
            "memory_stats": {"max_usage": "lots"},
            "cpu_stats": {"cpu_usage": {"percpu_usage": [1, 2]}}
        }),
        json!({"State": "running"}),
    );

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].0, "container_mem_max_usage_bytes");
    assert_eq!(report.applied, h.catalog.len() - 1);
    assert_eq!(h.samples("container_cpu_usage").len(), 2);
    assert_eq!(h.value("container_status", &[]), Some(0.0));
}

#[test]
fn test_base_labels_from_attributes() {
    let registry = Registry::new();
    let catalog =
        MetricCatalog::bind(&registry, catalog::status::SPECS.iter(), &["container_name", "Image"])
            .unwrap();
    let resolver = DeviceNameResolver::default();
    let stats = json!({});
    let container = ContainerAttributes::new(
        "abc123",
        "web",
        json!({"State": "exited", "Image": "nginx:1.27"}),
    );
    let blkio = BlockIoStatsView::from_stats(&resolver, &stats).unwrap();
    let labels = container.base_labels(catalog.base_labels());
    let data = PollData {
        stats: &stats,
        container: &container,
        blkio: &blkio,
    };
    assert!(catalog.update(&data, &labels).is_ok());

    let labels_set = LabelSet::new().with("container_name", "web").with("Image", "nginx:1.27");
    assert_eq!(labels, labels_set);
}

#[test]
fn test_departed_container_series_disappear() {
    let h = Harness::new();
    let stats = json!({
        "memory_stats": {"max_usage": 10},
        "networks": {"eth0": {"rx_bytes": 5}}
    });
    h.poll_container("a1", "a", stats.clone(), json!({"State": "running"}));
    h.poll_container("b1", "b", stats, json!({"State": "exited"}));
    assert_eq!(h.samples("container_status").len(), 2);

    // Next cycle only lists b.
    let live = [LabelSet::new().with("container_name", "b").with("container_id", "b1")];
    assert_eq!(h.catalog.retain_containers(&live), 3);

    for name in ["container_status", "container_mem_max_usage_bytes", "container_net_rx_bytes_total"] {
        assert!(h.value(name, &[("container_name", "a")]).is_none(), "{} kept a", name);
        assert!(h.value(name, &[("container_name", "b")]).is_some(), "{} lost b", name);
    }
    assert_eq!(h.value("container_status", &[("container_id", "b1")]), Some(1.0));

    // a comes back and is exported again.
    h.poll_container("a1", "a", json!({}), json!({"State": "running"}));
    assert_eq!(h.value("container_status", &[("container_name", "a")]), Some(0.0));
}

#[test]
fn test_base_labels_must_identify_container() {
    let registry = Registry::new();
    let err = MetricCatalog::bind(&registry, catalog::all(), &["Image"]).err().unwrap();
    assert!(matches!(err, CatalogError::MissingIdentity(_)));
    assert!(err.to_string().contains("Image"));
    assert!(registry.gather().is_empty());
}
