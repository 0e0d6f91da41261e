//! Configuration management for planbox
//!
//! Settings are loaded from environment variables with sensible defaults.
//! CLI flags override the log level; everything else is environment-only.
//!
//! # Environment Variables
//!
//! - `PLANBOX_LOG_LEVEL`: Logging level - default: "info"
//! - `PLANBOX_MAX_DEPTH`: Directory depth the scanner descends - default: "10"
//! - `PLANBOX_MAX_FILES`: Files captured before the scan stops - default: "5000"
//! - `PLANBOX_MAX_FILE_SIZE`: Largest file detectors may read, in bytes - default: "1048576"
//! - `PLANBOX_DETECTOR_TIMEOUT_MS`: Per-detector time limit - default: "2000"
//! - `PLANBOX_CATALOG`: TOML catalog replacing the built-in image/port tables - optional
//!
//! # Example
//!
//! ```no_run
//! use planbox::PlanboxConfig;
//!
//! let config = PlanboxConfig::default();
//! config.validate().expect("Invalid configuration");
//! println!("{}", config);
//! ```

use crate::plan::Catalog;
use crate::scan::ScanConfig;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_MAX_DEPTH: usize = 10;
const DEFAULT_MAX_FILES: usize = 5000;
const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;
const DEFAULT_DETECTOR_TIMEOUT_MS: u64 = 2000;

const MAX_DEPTH_LIMIT: usize = 64;
const MAX_FILES_LIMIT: usize = 1_000_000;
const MAX_FILE_SIZE_LIMIT: u64 = 64 * 1024 * 1024;
const MAX_DETECTOR_TIMEOUT_MS: u64 = 60_000;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    #[error("Failed to load catalog {path}: {message}")]
    CatalogLoad { path: String, message: String },
}

/// Main configuration structure for planbox
#[derive(Debug, Clone, PartialEq)]
pub struct PlanboxConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    pub max_depth: usize,

    pub max_files: usize,

    /// Files above this size read as absent
    pub max_file_size: u64,

    pub detector_timeout_ms: u64,

    /// Replacement catalog; the built-in one is used when unset
    pub catalog_path: Option<PathBuf>,
}

impl Default for PlanboxConfig {
    /// Loads from `PLANBOX_*` environment variables, ignoring unparsable values
    fn default() -> Self {
        let log_level = env::var("PLANBOX_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        let max_depth = env::var("PLANBOX_MAX_DEPTH")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_DEPTH);

        let max_files = env::var("PLANBOX_MAX_FILES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_FILES);

        let max_file_size = env::var("PLANBOX_MAX_FILE_SIZE")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_MAX_FILE_SIZE);

        let detector_timeout_ms = env::var("PLANBOX_DETECTOR_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_DETECTOR_TIMEOUT_MS);

        let catalog_path = env::var("PLANBOX_CATALOG")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            log_level,
            max_depth,
            max_files,
            max_file_size,
            detector_timeout_ms,
            catalog_path,
        }
    }
}

impl PlanboxConfig {
    /// Like [`Default::default`], but unparsable values are errors
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            max_depth: parse_var("PLANBOX_MAX_DEPTH")?.unwrap_or(DEFAULT_MAX_DEPTH),
            max_files: parse_var("PLANBOX_MAX_FILES")?.unwrap_or(DEFAULT_MAX_FILES),
            max_file_size: parse_var("PLANBOX_MAX_FILE_SIZE")?.unwrap_or(DEFAULT_MAX_FILE_SIZE),
            detector_timeout_ms: parse_var("PLANBOX_DETECTOR_TIMEOUT_MS")?
                .unwrap_or(DEFAULT_DETECTOR_TIMEOUT_MS),
            ..defaults
        })
    }

    /// Checks that limits are non-zero and bounded and that the log level is known
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 || self.max_depth > MAX_DEPTH_LIMIT {
            return Err(ConfigError::ValidationFailed(format!(
                "Max depth must be between 1 and {}",
                MAX_DEPTH_LIMIT
            )));
        }
        if self.max_files == 0 || self.max_files > MAX_FILES_LIMIT {
            return Err(ConfigError::ValidationFailed(format!(
                "Max files must be between 1 and {}",
                MAX_FILES_LIMIT
            )));
        }
        if self.max_file_size == 0 || self.max_file_size > MAX_FILE_SIZE_LIMIT {
            return Err(ConfigError::ValidationFailed(
                "Max file size must be between 1 byte and 64MB".to_string(),
            ));
        }
        if self.detector_timeout_ms == 0 || self.detector_timeout_ms > MAX_DETECTOR_TIMEOUT_MS {
            return Err(ConfigError::ValidationFailed(
                "Detector timeout must be between 1ms and 60s".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            max_depth: self.max_depth,
            max_files: self.max_files,
        }
    }

    pub fn detector_timeout(&self) -> Duration {
        Duration::from_millis(self.detector_timeout_ms)
    }

    pub fn load_catalog(&self) -> Result<Catalog, ConfigError> {
        Catalog::load_or_builtin(self.catalog_path.as_deref())
    }
}

fn parse_var<T>(field: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match env::var(field) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::ParseError {
                field: field.to_string(),
                error: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

impl fmt::Display for PlanboxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Planbox Configuration:")?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        writeln!(f, "  Max Depth: {}", self.max_depth)?;
        writeln!(f, "  Max Files: {}", self.max_files)?;
        writeln!(f, "  Max File Size: {} bytes", self.max_file_size)?;
        writeln!(f, "  Detector Timeout: {}ms", self.detector_timeout_ms)?;
        match &self.catalog_path {
            Some(path) => writeln!(f, "  Catalog: {}", path.display())?,
            None => writeln!(f, "  Catalog: built-in")?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    /// Sets an environment variable and restores the previous value on drop
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    fn valid_config() -> PlanboxConfig {
        PlanboxConfig {
            log_level: "info".to_string(),
            max_depth: 10,
            max_files: 5000,
            max_file_size: 1024,
            detector_timeout_ms: 2000,
            catalog_path: None,
        }
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = vec![
            EnvGuard::unset("PLANBOX_LOG_LEVEL"),
            EnvGuard::unset("PLANBOX_MAX_DEPTH"),
            EnvGuard::unset("PLANBOX_MAX_FILES"),
            EnvGuard::unset("PLANBOX_MAX_FILE_SIZE"),
            EnvGuard::unset("PLANBOX_DETECTOR_TIMEOUT_MS"),
            EnvGuard::unset("PLANBOX_CATALOG"),
        ];

        let config = PlanboxConfig::default();

        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.max_files, DEFAULT_MAX_FILES);
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(config.detector_timeout(), Duration::from_millis(2000));
        assert!(config.catalog_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _guards = vec![
            EnvGuard::set("PLANBOX_LOG_LEVEL", "DEBUG"),
            EnvGuard::set("PLANBOX_MAX_DEPTH", "4"),
            EnvGuard::set("PLANBOX_MAX_FILES", "250"),
            EnvGuard::set("PLANBOX_DETECTOR_TIMEOUT_MS", "500"),
            EnvGuard::set("PLANBOX_CATALOG", "/etc/planbox/catalog.toml"),
        ];

        let config = PlanboxConfig::default();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.scan_config(), ScanConfig { max_depth: 4, max_files: 250 });
        assert_eq!(config.detector_timeout_ms, 500);
        assert_eq!(
            config.catalog_path,
            Some(PathBuf::from("/etc/planbox/catalog.toml"))
        );
    }

    #[test]
    #[serial]
    fn test_from_env_reports_parse_errors() {
        let _guard = EnvGuard::set("PLANBOX_MAX_FILES", "lots");

        let err = PlanboxConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { ref field, .. } if field == "PLANBOX_MAX_FILES"));
        assert_eq!(PlanboxConfig::default().max_files, DEFAULT_MAX_FILES);
    }

    #[test]
    fn test_configuration_validation_limits() {
        assert!(valid_config().validate().is_ok());

        let mut config = valid_config();
        config.max_depth = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.max_files = MAX_FILES_LIMIT + 1;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.detector_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_configuration_validation_invalid_log_level() {
        let mut config = valid_config();
        config.log_level = "invalid".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_missing_catalog_file() {
        let mut config = valid_config();
        config.catalog_path = Some(PathBuf::from("/nonexistent/catalog.toml"));
        assert!(matches!(
            config.load_catalog(),
            Err(ConfigError::CatalogLoad { .. })
        ));
        assert!(valid_config().load_catalog().is_ok());
    }

    #[test]
    fn test_config_display() {
        let display = format!("{}", valid_config());
        assert!(display.contains("Planbox Configuration:"));
        assert!(display.contains("Catalog: built-in"));
    }
}
