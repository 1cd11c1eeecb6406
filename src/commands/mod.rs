//! CLI command implementations for container-stats-exporter.
//!
//! - `catalog`: Metric catalog listing

pub mod catalog;

// Re-export command functions
pub use catalog::command_catalog;
