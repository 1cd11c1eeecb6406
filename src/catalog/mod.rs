//! The fixed set of exported container metrics.
//!
//! Each category lives in its own module and reads one data source:
//! - `cpu`, `memory`, `network`: the raw stats payload
//! - `blkio`: the grouped block I/O view
//! - `status`: container attributes

pub mod blkio;
pub mod cpu;
pub mod memory;
pub mod network;
pub mod status;

use serde_json::Value;

use crate::error::ExtractResult;
use crate::payload;
use crate::spec::{LabelSet, MetricHandle, MetricSpec};

/// Every spec, in export order.
pub fn all() -> impl Iterator<Item = &'static MetricSpec> {
    cpu::SPECS
        .iter()
        .chain(memory::SPECS)
        .chain(network::SPECS)
        .chain(blkio::SPECS)
        .chain(status::SPECS)
}

/// Label names the catalog reserves for its own dimensions.
pub fn extra_label_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = all()
        .flat_map(|spec| spec.extra_labels.iter().copied())
        .collect();
    names.sort_unstable();
    names.dedup();
    names
}

/// Single-series counter fed from one integer in the payload.
pub(crate) fn inc_at(
    metric: &MetricHandle,
    data: &Value,
    labels: &LabelSet,
    path: &[&str],
) -> ExtractResult {
    if let Some(value) = payload::u64_at(data, path)? {
        metric.inc(labels, &[], value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::MetricKind;
    use ahash::AHashSet as HashSet;

    #[test]
    fn test_names_are_unique() {
        let mut seen = HashSet::new();
        for spec in all() {
            assert!(seen.insert(spec.name), "duplicate metric {}", spec.name);
        }
        assert_eq!(seen.len(), 27);
    }

    #[test]
    fn test_every_spec_has_help() {
        for spec in all() {
            assert!(!spec.description.is_empty(), "{} has no help text", spec.name);
        }
    }

    #[test]
    fn test_only_status_is_gauge() {
        let gauges: Vec<&str> = all()
            .filter(|s| s.kind == MetricKind::Gauge)
            .map(|s| s.name)
            .collect();
        assert_eq!(gauges, vec!["container_status"]);
    }

    #[test]
    fn test_blkio_category_size() {
        assert_eq!(blkio::SPECS.len(), 10);
        assert!(blkio::SPECS.iter().all(|s| s.extra_labels == ["device"]));
    }

    #[test]
    fn test_extra_label_names() {
        assert_eq!(extra_label_names(), vec!["cpu", "device", "interface"]);
    }
}
