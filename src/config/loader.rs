//! Configuration loading and discovery for `inkscape-mcp.toml`
//!
//! Precedence, lowest first: built-in defaults, the config file,
//! `INKSCAPE_MCP_*` environment variables, then command-line flags.

use super::schema::{Config, LogFormat};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name searched for during discovery
pub const CONFIG_FILE_NAME: &str = "inkscape-mcp.toml";

pub const ENV_EXECUTABLE: &str = "INKSCAPE_MCP_EXECUTABLE";
pub const ENV_MAX_PROCESSES: &str = "INKSCAPE_MCP_MAX_PROCESSES";
pub const ENV_TIMEOUT: &str = "INKSCAPE_MCP_TIMEOUT";
pub const ENV_GPU: &str = "INKSCAPE_MCP_GPU";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse inkscape-mcp.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override the Inkscape executable path
    pub executable: Option<PathBuf>,
    /// Override the per-process timeout (seconds)
    pub timeout_secs: Option<u64>,
    /// Override the concurrent process limit
    pub max_concurrent_processes: Option<usize>,
    /// Override the log filter
    pub log_level: Option<String>,
    /// Override the log format
    pub log_format: Option<LogFormat>,
}

/// Find inkscape-mcp.toml by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for inkscape-mcp.toml
/// 2. Check XDG_CONFIG_HOME/inkscape-mcp/inkscape-mcp.toml (or ~/.config/...)
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find inkscape-mcp.toml in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("inkscape-mcp").join(CONFIG_FILE_NAME);
    config_path.exists().then_some(config_path)
}

/// Find inkscape-mcp.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from an inkscape-mcp.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => {
            tracing::debug!(path = %p.display(), "loading configuration");
            load_config_file(&p)
        }
        None => Ok(Config::default()),
    }
}

/// Load configuration from a specific file path.
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    ensure_valid(&config)?;
    Ok(config)
}

fn ensure_valid(config: &Config) -> Result<(), ConfigError> {
    let errors = config.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()))
    }
}

/// Apply `INKSCAPE_MCP_*` variables from the process environment.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    apply_env_overrides_from(config, |key| env::var(key).ok())
}

/// Apply environment overrides using an arbitrary lookup.
///
/// Unparseable values are reported as validation errors rather than ignored.
pub fn apply_env_overrides_from<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut errors = Vec::new();

    if let Some(path) = lookup(ENV_EXECUTABLE).filter(|v| !v.trim().is_empty()) {
        config.inkscape.executable = Some(PathBuf::from(path.trim()));
    }

    if let Some(raw) = lookup(ENV_MAX_PROCESSES) {
        match raw.trim().parse::<usize>() {
            Ok(n) => config.inkscape.max_concurrent_processes = n,
            Err(_) => errors.push(format!("{}: '{}' is not a positive integer", ENV_MAX_PROCESSES, raw)),
        }
    }

    if let Some(raw) = lookup(ENV_TIMEOUT) {
        match raw.trim().parse::<u64>() {
            Ok(n) => config.inkscape.timeout_secs = n,
            Err(_) => errors.push(format!("{}: '{}' is not a number of seconds", ENV_TIMEOUT, raw)),
        }
    }

    if let Some(raw) = lookup(ENV_GPU) {
        match parse_flag(&raw) {
            Some(flag) => config.inkscape.gpu_acceleration = flag,
            None => errors.push(format!("{}: '{}' is not a boolean", ENV_GPU, raw)),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors))
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file and environment values.
pub fn merge_cli_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(ref exe) = overrides.executable {
        config.inkscape.executable = Some(exe.clone());
    }
    if let Some(timeout) = overrides.timeout_secs {
        config.inkscape.timeout_secs = timeout;
    }
    if let Some(n) = overrides.max_concurrent_processes {
        config.inkscape.max_concurrent_processes = n;
    }
    if let Some(ref level) = overrides.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = overrides.log_format {
        config.logging.format = format;
    }
}

/// Load, overlay environment and CLI values, then validate the result.
pub fn resolve_config(path: Option<&Path>, overrides: &CliOverrides) -> Result<Config, ConfigError> {
    let mut config = load_config(path)?;
    apply_env_overrides(&mut config)?;
    merge_cli_overrides(&mut config, overrides);
    ensure_valid(&config)?;
    Ok(config)
}
