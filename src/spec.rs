//! Declarative metric definitions.
//!
//! A [`MetricSpec`] ties an exported metric name, its help text, its kind and
//! its intrinsic label dimensions to a plain extraction function. The function
//! reads one of three data sources (raw stats payload, container attributes,
//! block I/O view) and writes into a [`MetricHandle`].

use ahash::AHashSet as HashSet;
use prometheus::{IntCounterVec, IntGaugeVec};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::blkio::BlockIoStatsView;
use crate::container::ContainerAttributes;
use crate::error::ExtractResult;

/// Prometheus metric type of a spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Monotonic; only incremented.
    Counter,
    /// Instantaneous; only set.
    Gauge,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Counter => f.write_str("counter"),
            MetricKind::Gauge => f.write_str("gauge"),
        }
    }
}

/// Ordered caller-supplied labels, typically the container identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    pairs: Vec<(String, String)>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a label, replacing the value if the name is already present.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(n, _)| *n == name) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// True if every label of this set appears with the same value in `series`.
    pub fn is_subset_of(&self, series: &SeriesKey) -> bool {
        self.pairs.iter().all(|pair| series.contains(pair))
    }

    /// Merges base labels with one instance of a spec's extra labels.
    fn bind<'s>(&'s self, extra: &[(&'s str, &'s str)]) -> HashMap<&'s str, &'s str> {
        let mut labels: HashMap<&str, &str> = self
            .pairs
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
            .collect();
        labels.extend(extra.iter().copied());
        labels
    }
}

/// Full label set of one exported series, sorted by label name.
pub type SeriesKey = Vec<(String, String)>;

fn series_key(labels: &HashMap<&str, &str>) -> SeriesKey {
    let mut key: SeriesKey = labels
        .iter()
        .map(|(n, v)| (n.to_string(), v.to_string()))
        .collect();
    key.sort_unstable();
    key
}

#[derive(Clone)]
enum Family {
    Counter(IntCounterVec),
    Gauge(IntGaugeVec),
}

/// A registered metric family a spec writes into.
///
/// Calling the operation that does not match the family kind is a bug in the
/// catalog and panics. Every series written through the handle is remembered
/// so it can be dropped once its container is gone.
#[derive(Clone)]
pub struct MetricHandle {
    name: &'static str,
    family: Family,
    series: Arc<Mutex<HashSet<SeriesKey>>>,
}

impl MetricHandle {
    pub fn counter(name: &'static str, vec: IntCounterVec) -> Self {
        Self {
            name,
            family: Family::Counter(vec),
            series: Arc::default(),
        }
    }

    pub fn gauge(name: &'static str, vec: IntGaugeVec) -> Self {
        Self {
            name,
            family: Family::Gauge(vec),
            series: Arc::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> MetricKind {
        match self.family {
            Family::Counter(_) => MetricKind::Counter,
            Family::Gauge(_) => MetricKind::Gauge,
        }
    }

    /// Publishes an upstream counter reading on the series `base ∪ extra`.
    ///
    /// Stats payload counters are already cumulative, so the series is reset
    /// and incremented by the reading. Repeated polls therefore export the
    /// latest total rather than a running sum of totals.
    pub fn inc(&self, base: &LabelSet, extra: &[(&str, &str)], value: u64) -> ExtractResult {
        let Family::Counter(vec) = &self.family else {
            panic!("{}: increment called on a gauge", self.name);
        };
        let labels = base.bind(extra);
        let counter = vec.get_metric_with(&labels)?;
        counter.reset();
        counter.inc_by(value);
        self.track(&labels);
        Ok(())
    }

    /// Sets the gauge series `base ∪ extra` to `value`.
    pub fn set(&self, base: &LabelSet, extra: &[(&str, &str)], value: i64) -> ExtractResult {
        let Family::Gauge(vec) = &self.family else {
            panic!("{}: set called on a counter", self.name);
        };
        let labels = base.bind(extra);
        vec.get_metric_with(&labels)?.set(value);
        self.track(&labels);
        Ok(())
    }

    /// Number of series written and not yet removed.
    pub fn series_count(&self) -> usize {
        self.series.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Removes every written series for which `keep` returns false.
    /// Returns the number of series removed.
    pub fn retain<F>(&self, keep: F) -> usize
    where
        F: Fn(&SeriesKey) -> bool,
    {
        let Ok(mut series) = self.series.lock() else {
            return 0;
        };
        let stale: Vec<SeriesKey> = series.iter().filter(|key| !keep(*key)).cloned().collect();
        for key in &stale {
            let labels: HashMap<&str, &str> =
                key.iter().map(|(n, v)| (n.as_str(), v.as_str())).collect();
            // A series already gone from the family is fine.
            let _ = match &self.family {
                Family::Counter(vec) => vec.remove(&labels),
                Family::Gauge(vec) => vec.remove(&labels),
            };
            series.remove(key);
        }
        stale.len()
    }

    fn track(&self, labels: &HashMap<&str, &str>) {
        if let Ok(mut series) = self.series.lock() {
            series.insert(series_key(labels));
        }
    }
}

/// Extraction against the raw stats payload.
pub type StatsFn = fn(&MetricHandle, &Value, &LabelSet) -> ExtractResult;
/// Extraction against container attributes.
pub type ContainerFn = fn(&MetricHandle, &ContainerAttributes, &LabelSet) -> ExtractResult;
/// Extraction against the grouped block I/O view.
pub type BlockIoFn = fn(&MetricHandle, &BlockIoStatsView<'_>, &LabelSet) -> ExtractResult;

/// Data source an extraction function reads.
#[derive(Clone, Copy)]
pub enum Extractor {
    Stats(StatsFn),
    Container(ContainerFn),
    BlockIo(BlockIoFn),
}

/// Everything one container contributes to one poll cycle.
pub struct PollData<'d> {
    pub stats: &'d Value,
    pub container: &'d ContainerAttributes,
    pub blkio: &'d BlockIoStatsView<'d>,
}

/// Static description of one exported metric.
pub struct MetricSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: MetricKind,
    /// Labels intrinsic to the metric, exported before the base labels.
    pub extra_labels: &'static [&'static str],
    pub extractor: Extractor,
}

impl MetricSpec {
    /// Applies this spec to one container's poll data.
    pub fn extract(
        &self,
        handle: &MetricHandle,
        data: &PollData<'_>,
        base: &LabelSet,
    ) -> ExtractResult {
        debug_assert_eq!(handle.kind(), self.kind, "{}: handle kind mismatch", self.name);
        match self.extractor {
            Extractor::Stats(f) => f(handle, data.stats, base),
            Extractor::Container(f) => f(handle, data.container, base),
            Extractor::BlockIo(f) => f(handle, data.blkio, base),
        }
    }

    /// Full label schema: extra labels followed by `base`.
    pub fn label_names<'s>(&'s self, base: &'s [&'s str]) -> Vec<&'s str> {
        self.extra_labels
            .iter()
            .copied()
            .chain(base.iter().copied())
            .collect()
    }

    pub fn source(&self) -> &'static str {
        match self.extractor {
            Extractor::Stats(_) => "stats",
            Extractor::Container(_) => "container",
            Extractor::BlockIo(_) => "blkio",
        }
    }
}

impl fmt::Debug for MetricSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("extra_labels", &self.extra_labels)
            .field("source", &self.source())
            .finish()
    }
}
