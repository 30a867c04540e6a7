//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::config::{resolve_config, CliOverrides, Config, LogFormat};

/// Process exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// inkscape-mcp - Inkscape automation and raster filters over MCP
#[derive(Parser)]
#[command(name = "inkscape-mcp")]
#[command(about = "inkscape-mcp - Inkscape automation and raster image filters for AI agents")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: discover inkscape-mcp.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter directive, e.g. "debug" or "inkscape_mcp=trace"
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format: text or json
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Inkscape executable to use instead of auto-detection
    #[arg(long, global = true)]
    pub executable: Option<PathBuf>,

    /// Per-invocation Inkscape timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the MCP server on stdin/stdout
    #[cfg(feature = "mcp")]
    Serve,

    /// Locate Inkscape and report how it was found
    Detect {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,

    /// Invoke one tool once and print its result envelope
    Call {
        /// Tool name such as vector, filter, color or file (the inkscape_ prefix is optional)
        tool: String,

        /// Parameters as a JSON object
        #[arg(long, conflicts_with = "params_file")]
        params: Option<String>,

        /// Read parameters from a JSON file
        #[arg(long)]
        params_file: Option<PathBuf>,
    },
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            executable: self.executable.clone(),
            timeout_secs: self.timeout,
            max_concurrent_processes: None,
            log_level: self.log_level.clone(),
            log_format: self.log_format,
        }
    }
}

fn load(cli: &Cli) -> Result<Config, ExitCode> {
    resolve_config(cli.config.as_deref(), &cli.overrides()).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::from(EXIT_INVALID_ARGS)
    })
}

/// Parse arguments, load configuration, and run the chosen command
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let config = match load(&cli) {
        Ok(config) => config,
        Err(code) => return code,
    };
    crate::logging::init(&config.logging);

    match cli.command {
        #[cfg(feature = "mcp")]
        Commands::Serve => commands::run_serve(config),
        Commands::Detect { json } => commands::run_detect(&config, json),
        Commands::Config => commands::run_config(&config),
        Commands::Call { tool, params, params_file } => {
            commands::run_call(config, &tool, params.as_deref(), params_file.as_deref())
        }
    }
}
