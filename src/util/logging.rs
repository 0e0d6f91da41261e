//! Structured logging setup for planbox
//!
//! Logs go to stderr so that plans written to stdout stay machine-readable.
//! `RUST_LOG`, when set, replaces the computed filter entirely.
//!
//! # Example
//!
//! ```no_run
//! use planbox::util::logging;
//! use tracing::info;
//!
//! logging::init_from_env();
//! info!(path = "/srv/app", "Analyzing project");
//! ```

use std::env;
use std::io;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

const CRATE_TARGET: &str = "planbox";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for planbox's own targets
    pub level: Level,

    /// JSON lines instead of human-readable output
    pub use_json: bool,

    /// Include the module target (e.g., planbox::detection) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,

    pub include_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
            include_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// JSON output with source locations and thread ids
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            use_json: true,
            include_target: true,
            include_location: true,
            include_thread_ids: true,
        }
    }

    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            ..Default::default()
        }
    }

    /// Level from CLI flags: `-q` wins, each `-v` steps down from `base`
    pub fn from_flags(base: Level, verbose: u8, quiet: bool) -> Self {
        let level = if quiet {
            Level::ERROR
        } else {
            match verbose {
                0 => base,
                1 if base < Level::DEBUG => Level::DEBUG,
                1 => base,
                _ => Level::TRACE,
            }
        };
        Self::with_level(level)
    }

    /// Directive applied when `RUST_LOG` is unset
    pub fn directive(&self) -> String {
        format!(
            "{}={}",
            CRATE_TARGET,
            self.level.to_string().to_lowercase()
        )
    }
}

/// Parses a level name, case-insensitively
pub fn parse_level(level_str: &str) -> Option<Level> {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    if env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    EnvFilter::try_new(config.directive()).unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Installs the global subscriber; later calls are ignored
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(&config);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .init();
        }
    });
}

pub fn init_default() {
    init_logging(LoggingConfig::default());
}

/// Reads `PLANBOX_LOG_LEVEL` and `PLANBOX_LOG_JSON`
pub fn init_from_env() {
    let level = env::var("PLANBOX_LOG_LEVEL")
        .ok()
        .and_then(|v| parse_level(&v))
        .unwrap_or(Level::INFO);

    let use_json = env::var("PLANBOX_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    init_logging(LoggingConfig {
        level,
        use_json,
        ..Default::default()
    });
}
