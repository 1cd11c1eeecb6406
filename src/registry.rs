//! Binding metric specs to Prometheus families and running them per poll.

use ahash::AHashSet as HashSet;
use prometheus::{IntCounterVec, IntGaugeVec, Opts, Registry};
use tracing::{debug, instrument, warn};

use crate::container::{CONTAINER_ID_LABEL, CONTAINER_NAME_LABEL};
use crate::error::{CatalogError, ExtractError};
use crate::spec::{LabelSet, MetricHandle, MetricKind, MetricSpec, PollData};

/// Outcome of running every spec against one container's data.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Specs that completed without error.
    pub applied: usize,
    pub errors: Vec<(&'static str, ExtractError)>,
}

impl CycleReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// True if at least one spec failed on a device name lookup.
    pub fn has_device_errors(&self) -> bool {
        self.errors
            .iter()
            .any(|(_, e)| matches!(e, ExtractError::DeviceLookup(_)))
    }
}

/// The catalog bound to a registry: one family per spec.
pub struct MetricCatalog {
    entries: Vec<(&'static MetricSpec, MetricHandle)>,
    base_labels: Vec<String>,
}

impl MetricCatalog {
    /// Creates and registers a family for every spec.
    ///
    /// Each family's label schema is the `MetricSpec`'s extra labels followed by
    /// `base_labels`. Fails on duplicate metric names, on extra labels that
    /// reuse a base label name, and on base labels that do not identify a
    /// single container (two containers would then share one series).
    pub fn bind<I>(registry: &Registry, specs: I, base_labels: &[&str]) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = &'static MetricSpec>,
    {
        if !identifies_container(base_labels) {
            return Err(CatalogError::MissingIdentity(
                base_labels.iter().map(|s| s.to_string()).collect(),
            ));
        }

        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for spec in specs {
            if !seen.insert(spec.name) {
                return Err(CatalogError::DuplicateName(spec.name));
            }
            if let Some(label) = spec.extra_labels.iter().find(|l| base_labels.contains(*l)) {
                return Err(CatalogError::LabelCollision {
                    metric: spec.name,
                    label: label.to_string(),
                });
            }

            let label_names = spec.label_names(base_labels);
            let opts = Opts::new(spec.name, spec.description);
            let register_err = |source| CatalogError::Register {
                metric: spec.name,
                source,
            };

            let handle = match spec.kind {
                MetricKind::Counter => {
                    let vec = IntCounterVec::new(opts, &label_names).map_err(register_err)?;
                    registry
                        .register(Box::new(vec.clone()))
                        .map_err(register_err)?;
                    MetricHandle::counter(spec.name, vec)
                }
                MetricKind::Gauge => {
                    let vec = IntGaugeVec::new(opts, &label_names).map_err(register_err)?;
                    registry
                        .register(Box::new(vec.clone()))
                        .map_err(register_err)?;
                    MetricHandle::gauge(spec.name, vec)
                }
            };
            debug!("Registered {} {} {:?}", spec.kind, spec.name, label_names);
            entries.push((spec, handle));
        }

        Ok(Self {
            entries,
            base_labels: base_labels.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Runs every spec against one container's poll data.
    ///
    /// A failing spec is recorded and does not stop the remaining ones.
    #[instrument(skip_all, fields(container = %data.container.name))]
    pub fn update(&self, data: &PollData<'_>, base: &LabelSet) -> CycleReport {
        let mut report = CycleReport::default();
        for (spec, handle) in &self.entries {
            match spec.extract(handle, data, base) {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    warn!("Failed to update {}: {}", spec.name, e);
                    report.errors.push((spec.name, e));
                }
            }
        }
        report
    }

    /// Drops every series whose base labels match none of `live`, i.e. series
    /// of containers the runtime no longer lists. Returns the number removed.
    #[instrument(skip_all, fields(live = live.len()))]
    pub fn retain_containers(&self, live: &[LabelSet]) -> usize {
        let removed: usize = self
            .entries
            .iter()
            .map(|(_, handle)| handle.retain(|key| live.iter().any(|base| base.is_subset_of(key))))
            .sum();
        if removed > 0 {
            debug!("Removed {} series of departed containers", removed);
        }
        removed
    }

    pub fn handle(&self, name: &str) -> Option<&MetricHandle> {
        self.entries
            .iter()
            .find(|(spec, _)| spec.name == name)
            .map(|(_, handle)| handle)
    }

    pub fn specs(&self) -> impl Iterator<Item = &'static MetricSpec> + '_ {
        self.entries.iter().map(|(spec, _)| *spec)
    }

    pub fn base_labels(&self) -> &[String] {
        &self.base_labels
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Base labels must carry `container_id` or `container_name`.
pub fn identifies_container<S: AsRef<str>>(base_labels: &[S]) -> bool {
    base_labels
        .iter()
        .any(|l| matches!(l.as_ref(), CONTAINER_ID_LABEL | CONTAINER_NAME_LABEL))
}
