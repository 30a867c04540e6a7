//! Tool dispatchers.
//!
//! Each public tool takes an `operation` name plus flat parameters, routes
//! to exactly one handler, and always answers with a [`ToolResult`]. Errors
//! from handlers are folded into the envelope here and never escape.

pub mod analysis;
pub mod batch;
pub mod color;
pub mod file;
pub mod filter;
pub mod layer;
pub mod system;
pub mod transform;
pub mod vector;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use image::{DynamicImage, RgbaImage};
use tracing::Instrument;

use crate::config::Config;
use crate::detector::{Detector, Installation};
use crate::envelope::{Outcome, ToolResult};
use crate::error::{ToolError, ToolOutcome};
use crate::imaging::io::{check_overwrite, load_image, save_image};
use crate::process::{ensure_input_exists, InkscapeCli};

/// Shared state handed to every handler: effective configuration and the
/// Inkscape wrapper, when an installation was found.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub config: Arc<Config>,
    cli: Option<InkscapeCli>,
    installation: Option<Installation>,
}

impl ToolContext {
    pub fn new(config: Config, installation: Option<Installation>) -> Self {
        let cli = installation.as_ref().map(|found| InkscapeCli::from_config(&found.path, &config.inkscape));
        Self { config: Arc::new(config), cli, installation }
    }

    /// Run detection with the configured override and build a context from it.
    pub fn detect(config: Config) -> Self {
        let installation = Detector::for_current_os(config.inkscape.executable.clone()).detect();
        match &installation {
            Some(found) => tracing::info!(
                path = %found.path.display(),
                version = found.version.as_deref().unwrap_or("unknown"),
                strategy = ?found.strategy,
                "inkscape detected"
            ),
            None => tracing::warn!("inkscape not found; vector operations that need it will fail"),
        }
        Self::new(config, installation)
    }

    /// Use an explicit wrapper without running detection.
    pub fn with_cli(config: Config, cli: InkscapeCli) -> Self {
        Self { config: Arc::new(config), cli: Some(cli), installation: None }
    }

    pub fn cli(&self) -> ToolOutcome<&InkscapeCli> {
        self.cli.as_ref().ok_or(ToolError::ExecutableNotFound)
    }

    pub fn installation(&self) -> Option<&Installation> {
        self.installation.as_ref()
    }
}

/// Parse an operation tag against `(name, value)` pairs.
pub(crate) fn parse_operation<T: Copy>(tool: &str, name: &str, table: &[(&str, T)]) -> ToolOutcome<T> {
    table.iter().find(|(key, _)| *key == name).map(|(_, op)| *op).ok_or_else(|| {
        let valid: Vec<&str> = table.iter().map(|(key, _)| *key).collect();
        ToolError::invalid(format!("Unknown {} operation '{}'. Valid: {}", tool, name, valid.join(", ")))
    })
}

/// Operation names accepted by a tool, in catalog order.
pub(crate) fn operation_names<T>(table: &[(&'static str, T)]) -> Vec<&'static str> {
    table.iter().map(|(key, _)| *key).collect()
}

/// Unwrap a parameter the operation cannot run without.
pub(crate) fn required<'a, T: ?Sized>(value: Option<&'a T>, param: &str, operation: &str) -> ToolOutcome<&'a T> {
    value.ok_or_else(|| ToolError::missing(param, operation))
}

/// Required path parameter; empty strings count as absent.
pub(crate) fn required_path(value: Option<&str>, param: &str, operation: &str) -> ToolOutcome<PathBuf> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(PathBuf::from(v)),
        _ => Err(ToolError::missing(param, operation)),
    }
}

/// Absolute form of `path` for reporting. Falls back to the path as given.
pub(crate) fn display_path(path: &Path) -> String {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()).display().to_string()
}

pub(crate) fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Run CPU-bound work off the async executor.
pub(crate) async fn blocking<T, F>(work: F) -> ToolOutcome<T>
where
    T: Send + 'static,
    F: FnOnce() -> ToolOutcome<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| ToolError::Io(std::io::Error::other(e)))?
}

/// Write a generated text document, creating parent directories.
pub(crate) async fn write_document(path: &Path, content: &str) -> ToolOutcome<u64> {
    crate::process::prepare_output(path)?;
    tokio::fs::write(path, content).await?;
    Ok(content.len() as u64)
}

/// Dimensions before and after a raster edit, plus the bytes written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Rewritten {
    pub original: (u32, u32),
    pub width: u32,
    pub height: u32,
    pub size: u64,
}

/// Load `input`, run `edit` on a worker thread, and save the result to
/// `output`. Missing inputs and unwanted overwrites fail before decoding.
pub(crate) async fn rewrite_image<F>(
    ctx: &ToolContext,
    input: &Path,
    output: &Path,
    overwrite: bool,
    edit: F,
) -> ToolOutcome<Rewritten>
where
    F: FnOnce(&DynamicImage) -> ToolOutcome<RgbaImage> + Send + 'static,
{
    ensure_input_exists(input)?;
    check_overwrite(output, overwrite)?;
    let max_bytes = ctx.config.filters.max_file_size_bytes();
    let quality = ctx.config.filters.jpeg_quality;
    let (src, dst) = (input.to_path_buf(), output.to_path_buf());
    blocking(move || {
        let image = load_image(&src, max_bytes)?;
        let original = (image.width(), image.height());
        let result = edit(&image)?;
        let (width, height) = result.dimensions();
        let size = save_image(&DynamicImage::ImageRgba8(result), &dst, quality)?;
        Ok(Rewritten { original, width, height, size })
    })
    .await
}

/// Wrap a handler outcome into the envelope, with a span per call.
pub(crate) async fn finish<F>(operation: &str, started: Instant, handler: F) -> ToolResult
where
    F: std::future::Future<Output = ToolOutcome<Outcome>>,
{
    let span = tracing::info_span!("operation", name = operation);
    let outcome = handler.instrument(span).await;
    let result = ToolResult::from_outcome(operation, started, outcome);
    tracing::info!(operation, success = result.success, elapsed_ms = result.execution_time_ms, "operation finished");
    result
}
