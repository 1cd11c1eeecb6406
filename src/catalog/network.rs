//! Per-interface network metrics read from `networks`.

use serde_json::Value;

use crate::error::{ExtractError, ExtractResult};
use crate::payload;
use crate::spec::{Extractor, LabelSet, MetricHandle, MetricKind, MetricSpec};

pub const SPECS: &[MetricSpec] = &[
    MetricSpec {
        name: "container_net_rx_bytes_total",
        description: "Total bytes received.",
        kind: MetricKind::Counter,
        extra_labels: &["interface"],
        extractor: Extractor::Stats(rx_bytes),
    },
    MetricSpec {
        name: "container_net_tx_bytes_total",
        description: "Total bytes send.",
        kind: MetricKind::Counter,
        extra_labels: &["interface"],
        extractor: Extractor::Stats(tx_bytes),
    },
    MetricSpec {
        name: "container_net_rx_errors_count",
        description: "Total count of received malformed frames.",
        kind: MetricKind::Counter,
        extra_labels: &["interface"],
        extractor: Extractor::Stats(rx_errors),
    },
    MetricSpec {
        name: "container_net_tx_errors_count",
        description: "Total count of errors when sending frames.",
        kind: MetricKind::Counter,
        extra_labels: &["interface"],
        extractor: Extractor::Stats(tx_errors),
    },
    MetricSpec {
        name: "container_net_rx_dropped_count",
        description: "Total count of dropped frames when receiving.",
        kind: MetricKind::Counter,
        extra_labels: &["interface"],
        extractor: Extractor::Stats(rx_dropped),
    },
    MetricSpec {
        name: "container_net_tx_dropped_count",
        description: "Total count of dropped frames when sending.",
        kind: MetricKind::Counter,
        extra_labels: &["interface"],
        extractor: Extractor::Stats(tx_dropped),
    },
    MetricSpec {
        name: "container_net_rx_packets_total",
        description: "Total packets received.",
        kind: MetricKind::Counter,
        extra_labels: &["interface"],
        extractor: Extractor::Stats(rx_packets),
    },
    MetricSpec {
        name: "container_net_tx_packets_total",
        description: "Total packets send.",
        kind: MetricKind::Counter,
        extra_labels: &["interface"],
        extractor: Extractor::Stats(tx_packets),
    },
];

/// Increments `metric` once per interface with that interface's `field`.
/// Containers with networking disabled have no `networks` key.
fn per_interface(
    metric: &MetricHandle,
    data: &Value,
    labels: &LabelSet,
    field: &str,
) -> ExtractResult {
    let Some(networks) = payload::object_at(data, &["networks"])? else {
        return Ok(());
    };
    for (interface, stats) in networks {
        let value = match stats.get(field) {
            None | Some(Value::Null) => continue,
            Some(v) => v.as_u64().ok_or_else(|| ExtractError::Malformed {
                path: format!("networks.{}.{}", interface, field),
                expected: "unsigned integer",
            })?,
        };
        metric.inc(labels, &[("interface", interface.as_str())], value)?;
    }
    Ok(())
}

fn rx_bytes(metric: &MetricHandle, data: &Value, labels: &LabelSet) -> ExtractResult {
    per_interface(metric, data, labels, "rx_bytes")
}

fn tx_bytes(metric: &MetricHandle, data: &Value, labels: &LabelSet) -> ExtractResult {
    per_interface(metric, data, labels, "tx_bytes")
}

fn rx_errors(metric: &MetricHandle, data: &Value, labels: &LabelSet) -> ExtractResult {
    per_interface(metric, data, labels, "rx_errors")
}

fn tx_errors(metric: &MetricHandle, data: &Value, labels: &LabelSet) -> ExtractResult {
    per_interface(metric, data, labels, "tx_errors")
}

fn rx_dropped(metric: &MetricHandle, data: &Value, labels: &LabelSet) -> ExtractResult {
    per_interface(metric, data, labels, "rx_dropped")
}

fn tx_dropped(metric: &MetricHandle, data: &Value, labels: &LabelSet) -> ExtractResult {
    per_interface(metric, data, labels, "tx_dropped")
}

fn rx_packets(metric: &MetricHandle, data: &Value, labels: &LabelSet) -> ExtractResult {
    per_interface(metric, data, labels, "rx_packets")
}

fn tx_packets(metric: &MetricHandle, data: &Value, labels: &LabelSet) -> ExtractResult {
    per_interface(metric, data, labels, "tx_packets")
}
