//! Configuration schema types for `inkscape-mcp.toml`
//!
//! Defines the structure and validation rules for the server configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}' (expected text or json)", other)),
        }
    }
}

/// External executable settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InkscapeConfig {
    /// Explicit path to the Inkscape executable; auto-detected when unset
    #[serde(default)]
    pub executable: Option<PathBuf>,
    /// Per-invocation wall-clock timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on simultaneously running Inkscape processes
    #[serde(default = "default_max_processes")]
    pub max_concurrent_processes: usize,
    /// Reported by `status`; no code path uses the GPU
    #[serde(default)]
    pub gpu_acceleration: bool,
    /// Directory for scratch documents (system temp dir when unset)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_processes() -> usize {
    3
}

impl Default for InkscapeConfig {
    fn default() -> Self {
        Self {
            executable: None,
            timeout_secs: default_timeout_secs(),
            max_concurrent_processes: default_max_processes(),
            gpu_acceleration: false,
            temp_dir: None,
        }
    }
}

impl InkscapeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Raster filter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Quality used when a filter writes JPEG output
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Inputs larger than this are rejected before decoding
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
}

fn default_jpeg_quality() -> u8 {
    95
}

fn default_max_file_size_mb() -> u64 {
    100
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { jpeg_quality: default_jpeg_quality(), max_file_size_mb: default_max_file_size_mb() }
    }
}

impl FilterConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Batch orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Worker threads used when a request does not name a count
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Maximum per-file entries reported in a batch result
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
}

fn default_max_workers() -> usize {
    4
}

fn default_result_limit() -> usize {
    100
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_workers: default_max_workers(), result_limit: default_result_limit() }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (overridden by `INKSCAPE_MCP_LOG`)
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: LogFormat::default() }
    }
}

/// Root configuration structure for inkscape-mcp.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub inkscape: InkscapeConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "inkscape.timeout_secs")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "inkscape-mcp.toml: '{}' {}", self.field, self.message)
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

impl Config {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut check = |ok: bool, field: &str, message: &str| {
            if !ok {
                errors.push(ConfigValidationError {
                    field: field.to_string(),
                    message: message.to_string(),
                });
            }
        };

        let ink = &self.inkscape;
        check(
            (5..=300).contains(&ink.timeout_secs),
            "inkscape.timeout_secs",
            "must be between 5 and 300",
        );
        check(
            (1..=10).contains(&ink.max_concurrent_processes),
            "inkscape.max_concurrent_processes",
            "must be between 1 and 10",
        );
        check(
            (1..=100).contains(&self.filters.jpeg_quality),
            "filters.jpeg_quality",
            "must be between 1 and 100",
        );
        check(self.filters.max_file_size_mb > 0, "filters.max_file_size_mb", "must be positive");
        check(
            (1..=8).contains(&self.batch.max_workers),
            "batch.max_workers",
            "must be between 1 and 8",
        );
        check(self.batch.result_limit > 0, "batch.result_limit", "must be positive");

        // Accept either a bare level or a full filter directive such as "inkscape_mcp=debug".
        let level = self.logging.level.to_ascii_lowercase();
        check(
            level.contains('=') || LOG_LEVELS.contains(&level.as_str()),
            "logging.level",
            "must be one of trace, debug, info, warn, error, off or a filter directive",
        );

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
