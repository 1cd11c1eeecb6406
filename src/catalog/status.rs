//! Container status gauge.

use crate::container::ContainerAttributes;
use crate::error::ExtractResult;
use crate::spec::{Extractor, LabelSet, MetricHandle, MetricKind, MetricSpec};

pub const STATUS_RUNNING: i64 = 0;
pub const STATUS_EXITED: i64 = 1;
pub const STATUS_OTHER: i64 = 10;

pub const SPECS: &[MetricSpec] = &[MetricSpec {
    name: "container_status",
    description: "Container status",
    kind: MetricKind::Gauge,
    extra_labels: &[],
    extractor: Extractor::Container(container_status),
}];

/// Maps a runtime state string to the exported gauge value:
/// `running` is 0, `exited` is 1, everything else is 10.
pub fn status_value(state: &str) -> i64 {
    if state.eq_ignore_ascii_case("running") {
        STATUS_RUNNING
    } else if state.eq_ignore_ascii_case("exited") {
        STATUS_EXITED
    } else {
        STATUS_OTHER
    }
}

fn container_status(
    metric: &MetricHandle,
    container: &ContainerAttributes,
    labels: &LabelSet,
) -> ExtractResult {
    if let Some(state) = container.state()? {
        metric.set(labels, &[], status_value(state))?;
    }
    Ok(())
}
