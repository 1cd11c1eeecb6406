//! Memory metrics read from `memory_stats`.

use serde_json::Value;

use super::inc_at;
use crate::error::ExtractResult;
use crate::spec::{Extractor, LabelSet, MetricHandle, MetricKind, MetricSpec};

pub const SPECS: &[MetricSpec] = &[MetricSpec {
    name: "container_mem_max_usage_bytes",
    description: "Container max memory usage recorded",
    kind: MetricKind::Counter,
    extra_labels: &[],
    extractor: Extractor::Stats(max_usage),
}];

// Only cgroup v1 hosts report max_usage.
fn max_usage(metric: &MetricHandle, data: &Value, labels: &LabelSet) -> ExtractResult {
    inc_at(metric, data, labels, &["memory_stats", "max_usage"])
}
