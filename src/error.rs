//! Error types for the extraction core.
//!
//! Absent payload sections are not errors: extractors report nothing for them.
//! Everything here is a genuine failure the poll loop has to decide about.

use std::path::PathBuf;

/// A kernel device number could not be mapped to a device name.
#[derive(Debug, thiserror::Error)]
pub enum DeviceLookupError {
    #[error("cannot read {path} for device {major}:{minor}: {source}")]
    Unreadable {
        major: u64,
        minor: u64,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("device name not found for {major}:{minor}")]
    MissingDevName { major: u64, minor: u64 },
}

/// Failure while applying a metric spec to one poll's data.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    DeviceLookup(#[from] DeviceLookupError),

    /// A value is present but not of the JSON type the stats schema promises.
    #[error("malformed payload at {path}: expected {expected}")]
    Malformed { path: String, expected: &'static str },

    #[error("metric backend rejected update: {0}")]
    Metric(#[from] prometheus::Error),
}

/// Failure while binding the catalog to a registry.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("metric {0} is declared more than once")]
    DuplicateName(&'static str),

    #[error("base labels must include container_id or container_name, got {0:?}")]
    MissingIdentity(Vec<String>),

    #[error("metric {metric} declares label {label} which is also a base label")]
    LabelCollision { metric: &'static str, label: String },

    #[error("failed to register metric {metric}: {source}")]
    Register {
        metric: &'static str,
        #[source]
        source: prometheus::Error,
    },
}

pub type ExtractResult<T = ()> = Result<T, ExtractError>;
