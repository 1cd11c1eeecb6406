//! HTTP endpoint handlers for the exporter.
//!
//! - `/metrics`: Prometheus metrics endpoint
//! - `/health`: Poll loop health statistics
//! - `/config`: Effective configuration
//! - `/`: Landing page

pub mod config;
pub mod health;
pub mod metrics;
pub mod root;

// Re-export handlers
pub use config::config_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use root::root_handler;
