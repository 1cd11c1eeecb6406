//! Configuration management for container-stats-exporter.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat};
use container_stats_exporter::catalog;
use container_stats_exporter::container::{CONTAINER_ID_LABEL, CONTAINER_NAME_LABEL};
use container_stats_exporter::device::DEFAULT_SYSFS_ROOT;
use container_stats_exporter::registry::identifies_container;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_POLL_INTERVAL: u64 = 15;
pub const DEFAULT_POLL_TIMEOUT: u64 = 10;

/// Exporter configuration. Every field is optional; `None` means default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Polling
    #[serde(alias = "poll-interval-seconds")]
    pub poll_interval_seconds: Option<u64>,
    #[serde(alias = "poll-timeout-seconds")]
    pub poll_timeout_seconds: Option<u64>,
    #[serde(alias = "include-stopped")]
    pub include_stopped: Option<bool>,

    /// Root of the sysfs mount, e.g. `/host/sys` when running in a container.
    #[serde(alias = "sysfs-root")]
    pub sysfs_root: Option<PathBuf>,

    /// Labels attached to every series, taken from the container identity.
    #[serde(alias = "base-labels")]
    pub base_labels: Option<Vec<String>>,

    // Logging
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            port: Some(DEFAULT_PORT),
            poll_interval_seconds: Some(DEFAULT_POLL_INTERVAL),
            poll_timeout_seconds: Some(DEFAULT_POLL_TIMEOUT),
            include_stopped: Some(false),
            sysfs_root: Some(PathBuf::from(DEFAULT_SYSFS_ROOT)),
            base_labels: Some(default_base_labels()),
            log_level: Some("info".into()),
        }
    }
}

fn default_base_labels() -> Vec<String> {
    vec![
        CONTAINER_NAME_LABEL.to_string(),
        CONTAINER_ID_LABEL.to_string(),
    ]
}

impl Config {
    pub fn poll_interval(&self) -> u64 {
        self.poll_interval_seconds.unwrap_or(DEFAULT_POLL_INTERVAL)
    }

    pub fn poll_timeout(&self) -> u64 {
        self.poll_timeout_seconds.unwrap_or(DEFAULT_POLL_TIMEOUT)
    }

    pub fn sysfs_root(&self) -> PathBuf {
        self.sysfs_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SYSFS_ROOT))
    }

    pub fn base_labels(&self) -> Vec<String> {
        self.base_labels.clone().unwrap_or_else(default_base_labels)
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let interval = cfg.poll_interval();
    if interval == 0 {
        return Err("poll_interval_seconds must be greater than 0".into());
    }

    let timeout = cfg.poll_timeout();
    if timeout == 0 || timeout >= interval {
        return Err(format!(
            "poll_timeout_seconds ({}) must be between 1 and poll_interval_seconds ({})",
            timeout, interval
        )
        .into());
    }

    let base_labels = cfg.base_labels();
    if base_labels.is_empty() {
        return Err("base_labels must name at least one label".into());
    }
    if !identifies_container(&base_labels) {
        return Err(format!(
            "base_labels must include {} or {} so each container gets its own series",
            CONTAINER_ID_LABEL, CONTAINER_NAME_LABEL
        )
        .into());
    }

    let reserved = catalog::extra_label_names();
    for (idx, label) in base_labels.iter().enumerate() {
        if reserved.contains(&label.as_str()) {
            return Err(format!(
                "base label '{}' collides with a metric label ({})",
                label,
                reserved.join(", ")
            )
            .into());
        }
        if base_labels[..idx].contains(label) {
            return Err(format!("base label '{}' is listed twice", label).into());
        }
    }

    if let Some(bind) = cfg.bind.as_deref() {
        if bind.parse::<std::net::IpAddr>().is_err() {
            return Err(format!("Invalid bind address '{}'", bind).into());
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }

    // Only override port if the user supplied it on the CLI.
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }

    if let Some(root) = &args.sysfs_root {
        config.sysfs_root = Some(root.clone());
    }

    if let Some(interval) = args.poll_interval {
        config.poll_interval_seconds = Some(interval);
    }

    if args.include_stopped {
        config.include_stopped = Some(true);
    }

    Ok(config)
}

/// Loads configuration from `path`, or from the first default location that
/// exists. Falls back to defaults when no file is found.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = if let Some(p) = path {
        PathBuf::from(p)
    } else {
        // Try default locations
        let defaults = [
            "/etc/container-stats-exporter/config.yaml",
            "/etc/container-stats-exporter/config.yml",
            "/etc/container-stats-exporter/config.json",
            "./container-stats-exporter.yaml",
            "./container-stats-exporter.yml",
            "./container-stats-exporter.json",
        ];

        defaults
            .iter()
            .find(|p| Path::new(p).exists())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(""))
    };

    if path.to_string_lossy().is_empty() || !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            // Default to YAML
            let config: Config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

/// Renders a serializable value in the requested format.
pub fn render<T: Serialize>(
    value: &T,
    format: &ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(value)?,
        ConfigFormat::Toml => toml::to_string_pretty(value)?,
        ConfigFormat::Yaml => serde_yaml::to_string(value)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render(config, &format)?);
    Ok(())
}
