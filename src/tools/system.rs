//! `inkscape_system`: installation status, operation catalog, effective
//! configuration and self-checks. Nothing here requires Inkscape to be
//! installed.

use std::time::Instant;

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

use super::{finish, operation_names, parse_operation, ToolContext};
use crate::envelope::{Outcome, ToolResult};
use crate::error::ToolOutcome;
use crate::imaging::io::{encode_png, PngCompression};

/// Input parameters for the inkscape_system tool.
#[derive(Debug, Default, Clone, Deserialize, JsonSchema)]
pub struct SystemParams {
    #[schemars(description = "status, help, config, version or diagnostics")]
    pub operation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemOperation {
    Status,
    Help,
    Config,
    Version,
    Diagnostics,
}

pub const OPERATIONS: &[(&str, SystemOperation)] = &[
    ("status", SystemOperation::Status),
    ("help", SystemOperation::Help),
    ("config", SystemOperation::Config),
    ("version", SystemOperation::Version),
    ("diagnostics", SystemOperation::Diagnostics),
];

pub fn operations() -> Vec<&'static str> {
    operation_names(OPERATIONS)
}

pub async fn dispatch(ctx: &ToolContext, params: SystemParams) -> ToolResult {
    let started = Instant::now();
    let name = params.operation.trim().to_string();
    let op = match parse_operation("system", &name, OPERATIONS) {
        Ok(op) => op,
        Err(err) => return ToolResult::from_outcome(&name, started, Err(err)),
    };
    finish(&name, started, async { run(ctx, op) }).await
}

fn run(ctx: &ToolContext, op: SystemOperation) -> ToolOutcome<Outcome> {
    Ok(match op {
        SystemOperation::Status => status(ctx),
        SystemOperation::Help => Outcome::new("Available operations per tool")
            .with("inkscape_vector", super::vector::operations())
            .with("inkscape_filter", super::filter::operations())
            .with("inkscape_color", super::color::operations())
            .with("inkscape_transform", super::transform::operations())
            .with("inkscape_analysis", super::analysis::operations())
            .with("inkscape_file", super::file::operations())
            .with("inkscape_layer", super::layer::operations())
            .with("inkscape_batch", super::batch::operations())
            .with("inkscape_system", operations()),
        SystemOperation::Config => Outcome::new("Effective configuration").with("config", ctx.config.as_ref()),
        SystemOperation::Version => Outcome::new(format!("inkscape-mcp {}", env!("CARGO_PKG_VERSION")))
            .with("server_version", env!("CARGO_PKG_VERSION"))
            .with("inkscape_version", ctx.installation().and_then(|found| found.version.clone())),
        SystemOperation::Diagnostics => diagnostics(ctx),
    })
}

/// One self-check line in the diagnostics report.
#[derive(Debug, Clone, Serialize)]
struct Check {
    name: &'static str,
    ok: bool,
    detail: String,
}

impl Check {
    fn new(name: &'static str, result: Result<String, String>) -> Self {
        match result {
            Ok(detail) => Self { name, ok: true, detail },
            Err(detail) => Self { name, ok: false, detail },
        }
    }
}

fn check_executable(ctx: &ToolContext) -> Result<String, String> {
    let cli = ctx.cli().map_err(|e| e.to_string())?;
    let path = cli.executable();
    if path.is_file() {
        Ok(path.display().to_string())
    } else {
        Err(format!("{} is not a file", path.display()))
    }
}

fn check_config(ctx: &ToolContext) -> Result<String, String> {
    let errors = ctx.config.validate();
    if errors.is_empty() {
        return Ok("configuration is valid".to_string());
    }
    Err(errors.iter().map(|e| format!("{}: {}", e.field, e.message)).collect::<Vec<_>>().join("; "))
}

fn check_temp_dir() -> Result<String, String> {
    let dir = std::env::temp_dir();
    tempfile::NamedTempFile::new_in(&dir).map_err(|e| format!("{}: {}", dir.display(), e))?;
    Ok(dir.display().to_string())
}

fn check_codecs() -> Result<String, String> {
    let pixel = image::DynamicImage::ImageRgba8(image::RgbaImage::new(1, 1));
    let bytes = encode_png(&pixel, PngCompression::Fast).map_err(|e| e.to_string())?;
    image::load_from_memory(&bytes).map_err(|e| e.to_string())?;
    Ok("png encode and decode".to_string())
}

/// Self-checks for the executable, configuration, scratch space and image
/// codecs. A failed check is reported in data, not as a failed call.
fn diagnostics(ctx: &ToolContext) -> Outcome {
    let checks = vec![
        Check::new("inkscape_executable", check_executable(ctx)),
        Check::new("configuration", check_config(ctx)),
        Check::new("temp_dir", check_temp_dir()),
        Check::new("image_codecs", check_codecs()),
    ];
    let failed: Vec<&str> = checks.iter().filter(|c| !c.ok).map(|c| c.name).collect();
    let message = if failed.is_empty() {
        "All checks passed".to_string()
    } else {
        format!("{} check(s) failed: {}", failed.len(), failed.join(", "))
    };
    tracing::debug!(failed = failed.len(), "diagnostics complete");
    Outcome::new(message)
        .with("healthy", failed.is_empty())
        .with("checks", &checks)
        .with("detected", ctx.installation().is_some())
        .with("server_version", env!("CARGO_PKG_VERSION"))
}

fn status(ctx: &ToolContext) -> Outcome {
    let inkscape = &ctx.config.inkscape;
    let limits = json!({
        "timeout_secs": inkscape.timeout_secs,
        "max_concurrent_processes": inkscape.max_concurrent_processes,
        "batch_max_workers": ctx.config.batch.max_workers,
        "max_file_size_mb": ctx.config.filters.max_file_size_mb,
    });
    let outcome = match (ctx.installation(), ctx.cli()) {
        (Some(found), _) => Outcome::new(format!(
            "Inkscape {} available at {}",
            found.version.as_deref().unwrap_or("(unknown version)"),
            found.path.display()
        ))
        .with("available", true)
        .with("path", found.path.display().to_string())
        .with("version", &found.version)
        .with("strategy", found.strategy),
        (None, Ok(cli)) => Outcome::new(format!("Inkscape configured at {}", cli.executable().display()))
            .with("available", true)
            .with("path", cli.executable().display().to_string()),
        (None, Err(_)) => Outcome::new("Inkscape not found; raster tools remain available").with("available", false),
    };
    outcome.with("gpu_acceleration", inkscape.gpu_acceleration).with("limits", limits)
}
