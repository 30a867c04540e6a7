//! Tracing subscriber setup.
//!
//! Everything is written to stderr: stdout carries the MCP transport when
//! the server runs over stdio.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Environment variable that overrides the configured filter.
pub const ENV_LOG: &str = "INKSCAPE_MCP_LOG";

/// Build the filter from `INKSCAPE_MCP_LOG`, falling back to the config level.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_env(ENV_LOG)
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn init(config: &LoggingConfig) {
    let filter = build_filter(config);
    let result = match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_filter_from_config_level() {
        std::env::remove_var(ENV_LOG);
        let config = LoggingConfig { level: "debug".into(), format: LogFormat::Text };
        assert_eq!(build_filter(&config).to_string(), "debug");
    }

    #[test]
    #[serial]
    fn test_env_overrides_config_level() {
        std::env::set_var(ENV_LOG, "warn");
        let config = LoggingConfig { level: "debug".into(), format: LogFormat::Text };
        let filter = build_filter(&config);
        std::env::remove_var(ENV_LOG);
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    #[serial]
    fn test_init_twice_is_harmless() {
        let config = LoggingConfig::default();
        init(&config);
        init(&config);
    }
}
