//! CPU metrics read from `cpu_stats`.

use serde_json::Value;

use super::inc_at;
use crate::error::ExtractResult;
use crate::payload;
use crate::spec::{Extractor, LabelSet, MetricHandle, MetricKind, MetricSpec};

const PERCPU_USAGE: &[&str] = &["cpu_stats", "cpu_usage", "percpu_usage"];

pub const SPECS: &[MetricSpec] = &[
    MetricSpec {
        name: "container_cpu_total_usage",
        description: "Container CPU total usage",
        kind: MetricKind::Counter,
        extra_labels: &[],
        extractor: Extractor::Stats(total_usage),
    },
    MetricSpec {
        name: "container_cpu_usage",
        description: "Container CPU percpu usage",
        kind: MetricKind::Counter,
        extra_labels: &["cpu"],
        extractor: Extractor::Stats(percpu_usage),
    },
    MetricSpec {
        name: "container_cpu_kernel_total_usage",
        description: "Ticks that CPU spends in kernel mode",
        kind: MetricKind::Counter,
        extra_labels: &[],
        extractor: Extractor::Stats(kernel_usage),
    },
    MetricSpec {
        name: "container_cpu_user_total_usage",
        description: "Ticks that CPU spends in user mode",
        kind: MetricKind::Counter,
        extra_labels: &[],
        extractor: Extractor::Stats(user_usage),
    },
    MetricSpec {
        name: "container_cpu_system_total_usage",
        description: "Ticks that CPU is executing system calls on behalf of processes",
        kind: MetricKind::Counter,
        extra_labels: &[],
        extractor: Extractor::Stats(system_usage),
    },
    MetricSpec {
        name: "container_cpu_throttled_periods_count",
        description: "Number of CPU throttling enforcements for a container",
        kind: MetricKind::Counter,
        extra_labels: &[],
        extractor: Extractor::Stats(throttled_periods),
    },
    MetricSpec {
        name: "container_cpu_throttled_periods_seconds",
        description: "Total time that a container's CPU usage was throttled",
        kind: MetricKind::Counter,
        extra_labels: &[],
        extractor: Extractor::Stats(throttled_time),
    },
];

fn total_usage(metric: &MetricHandle, data: &Value, labels: &LabelSet) -> ExtractResult {
    inc_at(metric, data, labels, &["cpu_stats", "system_cpu_usage"])
}

fn percpu_usage(metric: &MetricHandle, data: &Value, labels: &LabelSet) -> ExtractResult {
    let Some(per_cpu) = payload::array_at(data, PERCPU_USAGE)? else {
        return Ok(());
    };
    for (cpu, usage) in per_cpu.iter().enumerate() {
        let usage = payload::element_u64(usage, PERCPU_USAGE, cpu)?;
        let cpu = cpu.to_string();
        metric.inc(labels, &[("cpu", cpu.as_str())], usage)?;
    }
    Ok(())
}

fn kernel_usage(metric: &MetricHandle, data: &Value, labels: &LabelSet) -> ExtractResult {
    inc_at(metric, data, labels, &["cpu_stats", "cpu_usage", "usage_in_kernelmode"])
}

// total_usage includes kernel time as well.
fn user_usage(metric: &MetricHandle, data: &Value, labels: &LabelSet) -> ExtractResult {
    inc_at(metric, data, labels, &["cpu_stats", "cpu_usage", "total_usage"])
}

fn system_usage(metric: &MetricHandle, data: &Value, labels: &LabelSet) -> ExtractResult {
    inc_at(metric, data, labels, &["cpu_stats", "system_cpu_usage"])
}

fn throttled_periods(metric: &MetricHandle, data: &Value, labels: &LabelSet) -> ExtractResult {
    inc_at(metric, data, labels, &["cpu_stats", "throttling_data", "throttled_periods"])
}

fn throttled_time(metric: &MetricHandle, data: &Value, labels: &LabelSet) -> ExtractResult {
    inc_at(metric, data, labels, &["cpu_stats", "throttling_data", "throttled_time"])
}
