//! Per-device block I/O metrics read through [`BlockIoStatsView`].

use crate::blkio::{BlockIoStatsView, OpKind, SERVICED, SERVICE_BYTES};
use crate::error::ExtractResult;
use crate::spec::{Extractor, LabelSet, MetricHandle, MetricKind, MetricSpec};

pub const SPECS: &[MetricSpec] = &[
    MetricSpec {
        name: "container_blkio_reads_bytes_total",
        description: "Total bytes read by the container from device",
        kind: MetricKind::Counter,
        extra_labels: &["device"],
        extractor: Extractor::BlockIo(read_bytes),
    },
    MetricSpec {
        name: "container_blkio_writes_bytes_total",
        description: "Bytes written by the container",
        kind: MetricKind::Counter,
        extra_labels: &["device"],
        extractor: Extractor::BlockIo(write_bytes),
    },
    MetricSpec {
        name: "container_blkio_async_bytes_total",
        description: "Bytes transferred by asynchronous operations",
        kind: MetricKind::Counter,
        extra_labels: &["device"],
        extractor: Extractor::BlockIo(async_bytes),
    },
    MetricSpec {
        name: "container_blkio_sync_bytes_total",
        description: "Bytes transferred by synchronous operations",
        kind: MetricKind::Counter,
        extra_labels: &["device"],
        extractor: Extractor::BlockIo(sync_bytes),
    },
    MetricSpec {
        name: "container_blkio_discard_bytes_total",
        description: "Bytes discarded on the device",
        kind: MetricKind::Counter,
        extra_labels: &["device"],
        extractor: Extractor::BlockIo(discard_bytes),
    },
    MetricSpec {
        name: "container_blkio_reads_total",
        description: "Count of read operations performed, regardless of size",
        kind: MetricKind::Counter,
        extra_labels: &["device"],
        extractor: Extractor::BlockIo(reads),
    },
    MetricSpec {
        name: "container_blkio_writes_total",
        description: "Count of write operations performed, regardless of size",
        kind: MetricKind::Counter,
        extra_labels: &["device"],
        extractor: Extractor::BlockIo(writes),
    },
    MetricSpec {
        name: "container_blkio_async_total",
        description: "Count of asynchronous operations performed",
        kind: MetricKind::Counter,
        extra_labels: &["device"],
        extractor: Extractor::BlockIo(async_ops),
    },
    MetricSpec {
        name: "container_blkio_sync_total",
        description: "Count of synchronous operations performed",
        kind: MetricKind::Counter,
        extra_labels: &["device"],
        extractor: Extractor::BlockIo(sync_ops),
    },
    MetricSpec {
        name: "container_blkio_discard_total",
        description: "Count of discard operations performed",
        kind: MetricKind::Counter,
        extra_labels: &["device"],
        extractor: Extractor::BlockIo(discard_ops),
    },
];

fn per_device(
    metric: &MetricHandle,
    view: &BlockIoStatsView<'_>,
    labels: &LabelSet,
    group: &str,
    op: OpKind,
) -> ExtractResult {
    for entry in view.iter(group, op) {
        let entry = entry?;
        metric.inc(labels, &[("device", entry.device.as_str())], entry.value)?;
    }
    Ok(())
}

fn read_bytes(metric: &MetricHandle, view: &BlockIoStatsView<'_>, labels: &LabelSet) -> ExtractResult {
    per_device(metric, view, labels, SERVICE_BYTES, OpKind::Read)
}

fn write_bytes(metric: &MetricHandle, view: &BlockIoStatsView<'_>, labels: &LabelSet) -> ExtractResult {
    per_device(metric, view, labels, SERVICE_BYTES, OpKind::Write)
}

fn async_bytes(metric: &MetricHandle, view: &BlockIoStatsView<'_>, labels: &LabelSet) -> ExtractResult {
    per_device(metric, view, labels, SERVICE_BYTES, OpKind::Async)
}

fn sync_bytes(metric: &MetricHandle, view: &BlockIoStatsView<'_>, labels: &LabelSet) -> ExtractResult {
    per_device(metric, view, labels, SERVICE_BYTES, OpKind::Sync)
}

fn discard_bytes(metric: &MetricHandle, view: &BlockIoStatsView<'_>, labels: &LabelSet) -> ExtractResult {
    per_device(metric, view, labels, SERVICE_BYTES, OpKind::Discard)
}

fn reads(metric: &MetricHandle, view: &BlockIoStatsView<'_>, labels: &LabelSet) -> ExtractResult {
    per_device(metric, view, labels, SERVICED, OpKind::Read)
}

fn writes(metric: &MetricHandle, view: &BlockIoStatsView<'_>, labels: &LabelSet) -> ExtractResult {
    per_device(metric, view, labels, SERVICED, OpKind::Write)
}

fn async_ops(metric: &MetricHandle, view: &BlockIoStatsView<'_>, labels: &LabelSet) -> ExtractResult {
    per_device(metric, view, labels, SERVICED, OpKind::Async)
}

fn sync_ops(metric: &MetricHandle, view: &BlockIoStatsView<'_>, labels: &LabelSet) -> ExtractResult {
    per_device(metric, view, labels, SERVICED, OpKind::Sync)
}

fn discard_ops(metric: &MetricHandle, view: &BlockIoStatsView<'_>, labels: &LabelSet) -> ExtractResult {
    per_device(metric, view, labels, SERVICED, OpKind::Discard)
}
