//! Configuration module for auditsink.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{Level, RetentionPolicy};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for auditsink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub audit: AuditConfig,
    pub logging: LoggingConfig,
}

/// Audit file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Path to the audit log. Relative paths are resolved against a base
    /// directory, see [`AuditConfig::resolved_file`].
    pub file: PathBuf,
    /// Minimum severity that is recorded.
    pub level: Level,
    /// Days to keep audit lines for. Anything below 1 disables pruning.
    pub keep_for_days: i64,
    /// Upper bound on waiting for the exclusive file lock, in milliseconds.
    pub lock_timeout_ms: u64,
    /// Whether every append is followed by `fdatasync`.
    pub sync_on_write: bool,
}

/// Diagnostic logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `pretty` or `json`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/auditsink/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("auditsink")
            .join("config.yaml")
    }
}

impl AuditConfig {
    /// The audit file path, with a relative path joined onto `base`.
    pub fn resolved_file(&self, base: &Path) -> PathBuf {
        if self.file.is_absolute() {
            self.file.clone()
        } else {
            base.join(&self.file)
        }
    }

    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::new(self.keep_for_days)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

// Config derives Default because all its fields implement Default.
// (clippy::derivable_impls)

impl Default for AuditConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("auditsink");
        Self {
            file: data_dir.join("audit.log"),
            level: Level::Info,
            keep_for_days: 30,
            lock_timeout_ms: 5_000,
            sync_on_write: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"audit.lock_timeout_ms"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["pretty", "json"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid. A non-positive
    /// `audit.keep_for_days` is not an error: it disables pruning.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- audit ---
        if self.audit.file.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "audit.file".into(),
                message: "must not be empty".into(),
            });
        } else if self.audit.file.file_name().is_none() {
            errors.push(ValidationError {
                field: "audit.file".into(),
                message: format!("not a file path: {}", self.audit.file.display()),
            });
        }
        if self.audit.lock_timeout_ms == 0 {
            errors.push(ValidationError {
                field: "audit.lock_timeout_ms".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(ValidationError {
                field: "logging.format".into(),
                message: format!(
                    "invalid format '{}'; valid options: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use auditsink_core::config::ConfigBuilder;
/// use auditsink_core::domain::Level;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .audit_file(PathBuf::from("/var/log/app/audit.log"))
///     .audit_level(Level::Notice)
///     .audit_keep_for_days(90)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- audit ---

    pub fn audit_file(mut self, file: PathBuf) -> Self {
        self.config.audit.file = file;
        self
    }

    pub fn audit_level(mut self, level: Level) -> Self {
        self.config.audit.level = level;
        self
    }

    pub fn audit_keep_for_days(mut self, days: i64) -> Self {
        self.config.audit.keep_for_days = days;
        self
    }

    pub fn audit_lock_timeout_ms(mut self, ms: u64) -> Self {
        self.config.audit.lock_timeout_ms = ms;
        self
    }

    pub fn audit_sync_on_write(mut self, sync: bool) -> Self {
        self.config.audit.sync_on_write = sync;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
