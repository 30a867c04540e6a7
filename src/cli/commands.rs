//! Implementations of the serve, detect, config and call subcommands.

use std::path::Path;
use std::process::ExitCode;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::runtime::Runtime;

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::config::Config;
use crate::detector::Detector;
use crate::envelope::ToolResult;
use crate::tools::{self, ToolContext};

fn runtime() -> Result<Runtime, ExitCode> {
    Runtime::new().map_err(|e| {
        eprintln!("Error: Failed to create async runtime: {}", e);
        ExitCode::from(EXIT_ERROR)
    })
}

/// Execute the MCP server command
#[cfg(feature = "mcp")]
pub fn run_serve(config: Config) -> ExitCode {
    let rt = match runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };
    let ctx = ToolContext::detect(config);
    match rt.block_on(crate::mcp::run_server(ctx)) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Error: MCP server failed: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Execute the detect command
pub fn run_detect(config: &Config, json: bool) -> ExitCode {
    let found = Detector::for_current_os(config.inkscape.executable.clone()).detect();
    if json {
        let report = serde_json::json!({ "found": found.is_some(), "installation": found });
        println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
    } else {
        match &found {
            Some(inst) => {
                println!("Inkscape: {}", inst.path.display());
                println!("Version:  {}", inst.version.as_deref().unwrap_or("unknown"));
                println!("Found by: {:?}", inst.strategy);
            }
            None => println!("Inkscape not found"),
        }
    }
    if found.is_some() {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        ExitCode::from(EXIT_ERROR)
    }
}

/// Execute the config command
pub fn run_config(config: &Config) -> ExitCode {
    match toml::to_string_pretty(config) {
        Ok(text) => {
            print!("{}", text);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: Failed to serialize config: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn read_params(inline: Option<&str>, file: Option<&Path>) -> Result<Value, String> {
    let text = match (inline, file) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) => {
            std::fs::read_to_string(path).map_err(|e| format!("Cannot read {}: {}", path.display(), e))?
        }
        (None, None) => return Err("one of --params or --params-file is required".to_string()),
    };
    let value: Value = serde_json::from_str(&text).map_err(|e| format!("Invalid params JSON: {}", e))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err("params must be a JSON object".to_string())
    }
}

fn parse<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    serde_json::from_value(value).map_err(|e| format!("Invalid parameters: {}", e))
}

async fn call(ctx: &ToolContext, tool: &str, params: Value) -> Result<ToolResult, String> {
    Ok(match tool.strip_prefix("inkscape_").unwrap_or(tool) {
        "vector" => tools::vector::dispatch(ctx, parse(params)?).await,
        "filter" => tools::filter::dispatch(ctx, parse(params)?).await,
        "color" => tools::color::dispatch(ctx, parse(params)?).await,
        "transform" => tools::transform::dispatch(ctx, parse(params)?).await,
        "analysis" => tools::analysis::dispatch(ctx, parse(params)?).await,
        "file" => tools::file::dispatch(ctx, parse(params)?).await,
        "layer" => tools::layer::dispatch(ctx, parse(params)?).await,
        "batch" => tools::batch::dispatch(ctx, parse(params)?).await,
        "system" => tools::system::dispatch(ctx, parse(params)?).await,
        other => {
            return Err(format!(
                "Unknown tool '{}'. Valid: vector, filter, color, transform, analysis, file, layer, batch, system",
                other
            ));
        }
    })
}

/// Execute the call command: one dispatcher invocation, envelope on stdout
pub fn run_call(config: Config, tool: &str, inline: Option<&str>, file: Option<&Path>) -> ExitCode {
    let params = match read_params(inline, file) {
        Ok(params) => params,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    let rt = match runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };

    let ctx = ToolContext::detect(config);
    match rt.block_on(call(&ctx, tool, params)) {
        Ok(result) => {
            println!("{}", result.to_json());
            if result.success {
                ExitCode::from(EXIT_SUCCESS)
            } else {
                ExitCode::from(EXIT_ERROR)
            }
        }
        Err(msg) => {
            eprintln!("Error: {}", msg);
            ExitCode::from(EXIT_INVALID_ARGS)
        }
    }
}
