//! container-stats-exporter
//!
//! Prometheus exporter for per-container statistics with tracing logging.
//! This is the main entry point that starts the poll loop and HTTP server and
//! handles subcommands.

mod cli;
mod commands;
mod config;
mod handlers;
mod poller;
mod state;

use axum::{routing::get, Router};
use bollard::Docker;
use clap::{Parser, ValueEnum};
use container_stats_exporter::{catalog, DeviceNameResolver, MetricCatalog, PollStats};
use prometheus::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::{net::TcpListener, signal};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info, warn};

use cli::{Args, Commands, LogLevel};
use commands::command_catalog;
use config::{
    resolve_config, show_config, validate_effective_config, Config, DEFAULT_BIND_ADDR, DEFAULT_PORT,
};
use handlers::{config_handler, health_handler, metrics_handler, root_handler};
use state::{AppState, SharedState};

/// Effective log level: CLI flag, then config file, then `info`.
fn resolve_log_level(config: &Config, args: &Args) -> LogLevel {
    if let Some(level) = &args.log_level {
        return level.clone();
    }
    match config.log_level.as_deref() {
        Some(s) => LogLevel::from_str(s, true).unwrap_or_else(|_| {
            eprintln!("Unknown log_level '{}' in config, using info", s);
            LogLevel::Info
        }),
        None => LogLevel::Info,
    }
}

fn max_level(level: &LogLevel) -> LevelFilter {
    match level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    }
}

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config, args: &Args) {
    let level = resolve_log_level(config, args);
    let max_level = max_level(&level);

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Logging initialized with level: {:?}", level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        let config = load_validated_config(&args)?;
        return match command {
            Commands::Catalog { format } => command_catalog(&config, format),
        };
    }

    let config = load_validated_config(&args)?;

    setup_logging(&config, &args);

    info!("Starting container-stats-exporter");

    let bind_ip_str = config.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
    let port = config.port.unwrap_or(DEFAULT_PORT);

    // Initialize Prometheus metrics registry
    let registry = Registry::new();
    let base_labels = config.base_labels();
    let base: Vec<&str> = base_labels.iter().map(String::as_str).collect();
    let metric_catalog = MetricCatalog::bind(&registry, catalog::all(), &base)?;
    debug!(
        "Registered {} container metrics with base labels {:?}",
        metric_catalog.len(),
        base_labels
    );

    let resolver = Arc::new(DeviceNameResolver::new(config.sysfs_root()));
    let block_dir = resolver.root().join("dev/block");
    if !block_dir.is_dir() {
        warn!(
            "⚠️  {} not found - block I/O metrics will fail device lookups",
            block_dir.display()
        );
    }

    let docker = Docker::connect_with_local_defaults().map_err(|e| {
        error!("Failed to connect to Docker: {}", e);
        e
    })?;

    let state: SharedState = Arc::new(AppState {
        registry,
        catalog: metric_catalog,
        resolver,
        poll_stats: Arc::new(PollStats::new()),
        config: Arc::new(config.clone()),
        start_time: Instant::now(),
    });

    let poll_task = tokio::spawn(poller::run(state.clone(), docker));

    // Setup graceful shutdown signal handlers
    let shutdown_signal = async {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
            }
            _ = terminate => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    };

    // Configure HTTP server routes
    let addr: SocketAddr = format!("{}:{}", bind_ip_str, port).parse()?;

    let app = Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/config", get(config_handler))
        .with_state(state.clone());

    let listener = TcpListener::bind(addr).await?;
    info!(
        "container-stats-exporter listening on http://{}:{}",
        bind_ip_str, port
    );

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                return Err(e.into());
            }
        }
        _ = shutdown_signal => {
            info!("Shutdown signal received, exiting...");
        }
    }

    poll_task.abort();
    info!("container-stats-exporter stopped gracefully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_level_off_disables_logging() {
        assert_eq!(max_level(&LogLevel::Off), LevelFilter::OFF);
        assert_eq!(max_level(&LogLevel::Error), LevelFilter::ERROR);
        assert_eq!(max_level(&LogLevel::Trace), LevelFilter::TRACE);
        assert!(max_level(&LogLevel::Off) < LevelFilter::ERROR);
    }

    #[test]
    fn test_resolve_log_level_precedence() {
        let config = Config {
            log_level: Some("off".into()),
            ..Default::default()
        };
        let args = Args::parse_from(["container-stats-exporter"]);
        assert!(matches!(resolve_log_level(&config, &args), LogLevel::Off));

        let args = Args::parse_from(["container-stats-exporter", "--log-level", "debug"]);
        assert!(matches!(resolve_log_level(&config, &args), LogLevel::Debug));

        let args = Args::parse_from(["container-stats-exporter"]);
        assert!(matches!(resolve_log_level(&Config::default(), &args), LogLevel::Info));
    }
}
