//! Catalog command implementation.
//!
//! Lists every exported metric without connecting to Docker.

use container_stats_exporter::{catalog, MetricSpec};
use serde::Serialize;

use crate::cli::ConfigFormat;
use crate::config::{render, Config};

#[derive(Serialize)]
struct CatalogEntry {
    name: &'static str,
    kind: String,
    source: &'static str,
    labels: Vec<String>,
    help: &'static str,
}

#[derive(Serialize)]
struct CatalogListing {
    metrics: Vec<CatalogEntry>,
}

impl CatalogEntry {
    fn new(spec: &'static MetricSpec, base_labels: &[&str]) -> Self {
        Self {
            name: spec.name,
            kind: spec.kind.to_string(),
            source: spec.source(),
            labels: spec
                .label_names(base_labels)
                .into_iter()
                .map(String::from)
                .collect(),
            help: spec.description,
        }
    }
}

fn listing(config: &Config) -> CatalogListing {
    let base_labels = config.base_labels();
    let base: Vec<&str> = base_labels.iter().map(String::as_str).collect();
    CatalogListing {
        metrics: catalog::all()
            .map(|spec| CatalogEntry::new(spec, &base))
            .collect(),
    }
}

/// Prints the metric catalog with the effective base labels.
pub fn command_catalog(
    config: &Config,
    format: &ConfigFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render(&listing(config), format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_uses_base_labels() {
        let config = Config {
            base_labels: Some(vec!["container_name".into()]),
            ..Config::default()
        };
        let listing = listing(&config);
        assert_eq!(listing.metrics.len(), catalog::all().count());

        let percpu = listing
            .metrics
            .iter()
            .find(|m| m.name == "container_cpu_usage")
            .unwrap();
        assert_eq!(percpu.labels, vec!["cpu", "container_name"]);
        assert_eq!(percpu.kind, "counter");
    }

    #[test]
    fn test_listing_renders_as_toml() {
        let rendered = render(&listing(&Config::default()), &ConfigFormat::Toml).unwrap();
        assert!(rendered.contains("[[metrics]]"));
        assert!(rendered.contains("container_status"));
    }
}
