//! Integration tests for block I/O metrics against a fake sysfs tree.

use std::fs;
use std::path::Path;

use container_stats_exporter::{
    catalog, BlockIoStatsView, ContainerAttributes, DeviceNameResolver, ExtractError, LabelSet,
    MetricCatalog, OpKind, PollData,
};
use prometheus::{Encoder, Registry, TextEncoder};
use serde_json::{json, Value};
use tempfile::TempDir;

fn add_device(root: &Path, major: u64, minor: u64, name: &str) {
    let dir = root.join(format!("dev/block/{}:{}", major, minor));
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("uevent"),
        format!("MAJOR={}\nMINOR={}\nDEVNAME={}\nDEVTYPE=disk\n", major, minor, name),
    )
    .unwrap();
}

fn blkio_lines(registry: &Registry) -> Vec<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .unwrap();
    String::from_utf8(buffer)
        .unwrap()
        .lines()
        .filter(|l| l.starts_with("container_blkio_"))
        .map(String::from)
        .collect()
}

fn poll(catalog: &MetricCatalog, resolver: &DeviceNameResolver, stats: &Value) -> usize {
    let container = ContainerAttributes::new("abc123", "db", json!({"State": "running"}));
    let blkio = BlockIoStatsView::from_stats(resolver, stats).unwrap();
    let labels = LabelSet::new().with("container_name", "db");
    let data = PollData {
        stats,
        container: &container,
        blkio: &blkio,
    };
    catalog.update(&data, &labels).errors.len()
}

#[test]
fn test_read_bytes_labeled_with_device_name() {
    let sys = TempDir::new().unwrap();
    add_device(sys.path(), 8, 0, "sda");

    let registry = Registry::new();
    let catalog =
        MetricCatalog::bind(&registry, catalog::blkio::SPECS.iter(), &["container_name"]).unwrap();
    let resolver = DeviceNameResolver::new(sys.path());

    let stats = json!({
        "blkio_stats": {
            "io_service_bytes_recursive": [
                {"major": 8, "minor": 0, "op": "Read", "value": 4096}
            ]
        }
    });
    assert_eq!(poll(&catalog, &resolver, &stats), 0);

    let lines = blkio_lines(&registry);
    assert_eq!(lines.len(), 1, "{:?}", lines);
    assert!(lines[0].starts_with("container_blkio_reads_bytes_total{"));
    assert!(lines[0].contains("device=\"sda\""));
    assert!(lines[0].ends_with(" 4096"));
}

#[test]
fn test_full_blkio_section() {
    let sys = TempDir::new().unwrap();
    add_device(sys.path(), 8, 0, "sda");
    add_device(sys.path(), 253, 1, "dm-1");

    let registry = Registry::new();
    let catalog =
        MetricCatalog::bind(&registry, catalog::blkio::SPECS.iter(), &["container_name"]).unwrap();
    let resolver = DeviceNameResolver::new(sys.path());

    let record = |major: u64, minor: u64, op: &str, value: u64| {
        json!({"major": major, "minor": minor, "op": op, "value": value})
    };
    let stats = json!({
        "blkio_stats": {
            "io_service_bytes_recursive": [
                record(8, 0, "Read", 100), record(8, 0, "Write", 200),
                record(8, 0, "Sync", 50), record(8, 0, "Async", 250),
                record(8, 0, "Discard", 0), record(8, 0, "Total", 300),
                record(253, 1, "read", 7)
            ],
            "io_serviced_recursive": [
                record(8, 0, "Read", 3), record(8, 0, "Write", 4)
            ],
            "io_queue_recursive": null
        }
    });
    assert_eq!(poll(&catalog, &resolver, &stats), 0);
    assert_eq!(resolver.len(), 2);

    let lines = blkio_lines(&registry);
    let find = |name: &str, device: &str| {
        lines
            .iter()
            .find(|l| l.starts_with(&format!("{}{{", name)) && l.contains(&format!("device=\"{}\"", device)))
            .and_then(|l| l.rsplit(' ').next())
            .map(|v| v.to_string())
    };

    assert_eq!(find("container_blkio_reads_bytes_total", "sda").as_deref(), Some("100"));
    assert_eq!(find("container_blkio_reads_bytes_total", "dm-1").as_deref(), Some("7"));
    assert_eq!(find("container_blkio_writes_bytes_total", "sda").as_deref(), Some("200"));
    assert_eq!(find("container_blkio_sync_bytes_total", "sda").as_deref(), Some("50"));
    assert_eq!(find("container_blkio_async_bytes_total", "sda").as_deref(), Some("250"));
    assert_eq!(find("container_blkio_discard_bytes_total", "sda").as_deref(), Some("0"));
    assert_eq!(find("container_blkio_reads_total", "sda").as_deref(), Some("3"));
    assert_eq!(find("container_blkio_writes_total", "sda").as_deref(), Some("4"));
    assert!(find("container_blkio_sync_total", "sda").is_none());
}

#[test]
fn test_unknown_device_fails_only_its_specs() {
    let sys = TempDir::new().unwrap();

    let registry = Registry::new();
    let catalog =
        MetricCatalog::bind(&registry, catalog::blkio::SPECS.iter(), &["container_name"]).unwrap();
    let resolver = DeviceNameResolver::new(sys.path());

    let stats = json!({
        "blkio_stats": {
            "io_service_bytes_recursive": [{"major": 8, "minor": 0, "op": "Write", "value": 1}]
        }
    });
    assert_eq!(poll(&catalog, &resolver, &stats), 1);
    assert!(blkio_lines(&registry).is_empty());
}

#[test]
fn test_iter_named_resolves_lazily() {
    let sys = TempDir::new().unwrap();
    add_device(sys.path(), 8, 16, "sdb");
    let resolver = DeviceNameResolver::new(sys.path());

    let section = json!({
        "io_serviced_recursive": [
            {"major": 8, "minor": 16, "op": "Write", "value": 9},
            {"major": 9, "minor": 9, "op": "Read", "value": 1}
        ]
    });
    let view = BlockIoStatsView::new(&resolver, &section).unwrap();
    assert!(resolver.is_empty());

    let writes: Vec<_> = view
        .iter_named("io_serviced_recursive", "WRITE")
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].device, "sdb");
    assert_eq!(writes[0].op, "Write");
    assert_eq!(resolver.len(), 1);

    let reads: Vec<_> = view.iter("io_serviced_recursive", OpKind::Read).collect();
    assert_eq!(reads.len(), 1);
    assert!(reads[0].is_err());

    let err = ExtractError::from(reads.into_iter().next().unwrap().unwrap_err());
    assert!(matches!(err, ExtractError::DeviceLookup(_)));
}
