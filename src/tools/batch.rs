//! `inkscape_batch`: apply one raster operation to every matching file in a
//! directory.
//!
//! # How It Works
//!
//! 1. Validate parameters and resolve defaults (fail before touching files)
//! 2. Discover files: expand brace alternatives, glob, keep known raster
//!    extensions, sort
//! 3. Process files on a rayon pool of `max_workers` threads; each file
//!    yields its own record and a failure never stops the others
//! 4. Count outcomes over all files and report the first `result_limit`
//!    records in file order

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Instant;

use glob::glob;
use image::{DynamicImage, ImageFormat, RgbaImage};
use rayon::prelude::*;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{blocking, display_path, finish, operation_names, parse_operation, required_path, ToolContext};
use crate::envelope::{Outcome, ToolResult};
use crate::error::{ToolError, ToolOutcome};
use crate::imaging::geometry::{apply_watermark, resize, rotate_expand, target_size, WatermarkPosition};
use crate::imaging::io::{encode, format_for_path, format_from_name, is_image_path, is_lossy, load_image, save_image};
use crate::imaging::kernel::{self, Kernel};

/// Lowest JPEG quality the optimizer will step down to.
pub const OPTIMIZE_QUALITY_FLOOR: u8 = 20;
const OPTIMIZE_QUALITY_STEP: u8 = 5;
const MAX_WORKERS: usize = 8;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)(?::([^}]*))?\}").expect("valid regex"));

/// Input parameters for the inkscape_batch tool.
#[derive(Debug, Default, Clone, Deserialize, JsonSchema)]
pub struct BatchParams {
    #[schemars(description = "resize, convert, process, watermark, rename or optimize")]
    pub operation: String,

    #[schemars(description = "Directory holding the source images")]
    pub input_directory: Option<String>,

    #[schemars(description = "Directory receiving the results (created if missing)")]
    pub output_directory: Option<String>,

    #[schemars(description = "resize: target width")]
    pub width: Option<u32>,
    #[schemars(description = "resize: target height")]
    pub height: Option<u32>,
    #[schemars(description = "resize: keep the aspect ratio (default: true)")]
    pub maintain_aspect: Option<bool>,

    #[schemars(description = "convert: jpg, jpeg, png, webp, tiff, bmp or gif (default: jpg)")]
    pub output_format: Option<String>,
    #[schemars(description = "convert: JPEG quality 1-100 (default: 90)")]
    pub quality: Option<u8>,

    #[schemars(description = "process: steps such as {\"operation\": \"rotate\", \"angle\": 90}")]
    pub operations_chain: Option<Vec<ChainStep>>,

    #[schemars(description = "watermark: overlay image")]
    pub watermark_path: Option<String>,
    #[schemars(
        description = "watermark: top-left, top-right, bottom-left, bottom-right or center (default: bottom-right)"
    )]
    pub watermark_position: Option<String>,
    #[schemars(description = "watermark: opacity 0-1 (default: 0.5)")]
    pub watermark_opacity: Option<f32>,
    #[schemars(description = "watermark: width relative to the image width (default: 0.2)")]
    pub watermark_scale: Option<f32>,

    #[schemars(
        description = "rename: pattern with {name}, {index}, {index:04d}, {date}, {ext} (default: {name}_{index:04d})"
    )]
    pub rename_pattern: Option<String>,

    #[schemars(description = "optimize: starting JPEG quality (default: 85)")]
    pub optimize_quality: Option<u8>,
    #[schemars(description = "optimize: target size in KB; quality steps down by 5 until met or 20")]
    pub optimize_max_size_kb: Option<u64>,

    #[schemars(description = "Glob for input files; brace alternatives allowed (default: *.jpg)")]
    pub file_pattern: Option<String>,
    #[schemars(description = "Descend into subdirectories (default: false)")]
    pub recursive: Option<bool>,
    #[schemars(description = "Replace existing outputs instead of skipping them (default: false)")]
    pub overwrite: Option<bool>,
    #[schemars(description = "Worker threads 1-8 (default: from configuration)")]
    pub max_workers: Option<usize>,
}

/// One step of a `process` chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum ChainStep {
    Resize {
        width: Option<u32>,
        height: Option<u32>,
    },
    Rotate {
        #[serde(default)]
        angle: f32,
    },
    Sharpen,
    Blur {
        #[serde(default = "default_chain_blur")]
        radius: f32,
    },
}

fn default_chain_blur() -> f32 {
    2.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOperation {
    Resize,
    Convert,
    Process,
    Watermark,
    Rename,
    Optimize,
}

pub const OPERATIONS: &[(&str, BatchOperation)] = &[
    ("resize", BatchOperation::Resize),
    ("convert", BatchOperation::Convert),
    ("process", BatchOperation::Process),
    ("watermark", BatchOperation::Watermark),
    ("rename", BatchOperation::Rename),
    ("optimize", BatchOperation::Optimize),
];

pub fn operations() -> Vec<&'static str> {
    operation_names(OPERATIONS)
}

/// Per-file work, fully resolved before any file is touched.
#[derive(Debug, Clone)]
enum Job {
    Resize { width: Option<u32>, height: Option<u32>, maintain_aspect: bool },
    Convert { format: ImageFormat, extension: String, quality: u8 },
    Process { steps: Vec<ChainStep> },
    Watermark { mark: Arc<RgbaImage>, position: WatermarkPosition, opacity: f32, scale: f32 },
    Rename { pattern: String, date: String },
    Optimize { quality: u8, max_bytes: Option<u64> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Processed,
    Failed,
    Skipped,
}

/// Outcome for one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub file: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Counts over every file of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total_files: usize,
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchSummary {
    pub fn tally(records: &[FileRecord]) -> Self {
        records.iter().fold(Self { total_files: records.len(), ..Self::default() }, |mut acc, r| {
            match r.status {
                FileStatus::Processed => acc.processed += 1,
                FileStatus::Failed => acc.failed += 1,
                FileStatus::Skipped => acc.skipped += 1,
            }
            acc
        })
    }
}

// ============================================================================
// Discovery
// ============================================================================

/// Expand `{a,b}` alternatives, left to right. Groups do not nest.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };
    let Some(close) = pattern[open..].find('}').map(|i| open + i) else {
        return vec![pattern.to_string()];
    };
    let (head, body, tail) = (&pattern[..open], &pattern[open + 1..close], &pattern[close + 1..]);
    body.split(',').flat_map(|alt| expand_braces(&format!("{}{}{}", head, alt, tail))).collect()
}

/// Sorted raster files under `dir` matching `pattern`.
pub fn discover_files(dir: &Path, pattern: &str, recursive: bool) -> ToolOutcome<Vec<PathBuf>> {
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let mut files = BTreeSet::new();
    for alternative in expand_braces(pattern) {
        let full = if recursive { format!("{}/**/{}", base, alternative) } else { format!("{}/{}", base, alternative) };
        let paths =
            glob(&full).map_err(|e| ToolError::invalid(format!("Invalid file_pattern '{}': {}", pattern, e)))?;
        for entry in paths {
            match entry {
                Ok(path) if path.is_file() && is_image_path(&path) => {
                    files.insert(path);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "unreadable path skipped during discovery"),
            }
        }
    }
    Ok(files.into_iter().collect())
}

// ============================================================================
// Naming
// ============================================================================

/// Render a rename pattern for the 1-based `index`.
///
/// Placeholders: `{name}` (file stem), `{index}`, `{index:04d}` style
/// zero-padded or `{index:4d}` space-padded, `{date}` (YYYYMMDD) and
/// `{ext}` (with the leading dot).
pub fn render_name(pattern: &str, stem: &str, index: usize, date: &str, ext: &str) -> ToolOutcome<String> {
    let mut out = String::with_capacity(pattern.len() + stem.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(pattern) {
        let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&pattern[last..whole.start()]);
        let pad = caps.get(2).map(|m| m.as_str());
        match (key.as_str(), pad) {
            ("name", None) => out.push_str(stem),
            ("date", None) => out.push_str(date),
            ("ext", None) => out.push_str(ext),
            ("index", None) => out.push_str(&index.to_string()),
            ("index", Some(pad)) => out.push_str(&format_index(index, pad)?),
            _ => {
                return Err(ToolError::invalid(format!(
                    "Unknown placeholder '{}' in rename_pattern. Valid: {{name}}, {{index}}, {{index:04d}}, {{date}}, {{ext}}",
                    whole.as_str()
                )))
            }
        }
        last = whole.end();
    }
    out.push_str(&pattern[last..]);
    Ok(out)
}

fn format_index(index: usize, pad: &str) -> ToolOutcome<String> {
    let digits = pad.strip_suffix('d').unwrap_or(pad);
    let zero = digits.starts_with('0');
    let width: usize = if digits.is_empty() {
        0
    } else {
        digits.parse().map_err(|_| ToolError::invalid(format!("Invalid index format '{}' in rename_pattern", pad)))?
    };
    Ok(if zero { format!("{:0width$}", index, width = width) } else { format!("{:width$}", index, width = width) })
}

fn output_path_for(job: &Job, input_dir: &Path, output_dir: &Path, file: &Path, index: usize) -> ToolOutcome<PathBuf> {
    let relative = file.strip_prefix(input_dir).unwrap_or(file);
    let parent = relative.parent().unwrap_or_else(|| Path::new(""));
    let stem = file.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
    let name = match job {
        Job::Convert { extension, .. } => format!("{}.{}", stem, extension),
        Job::Rename { pattern, date } => {
            let ext = file.extension().and_then(|e| e.to_str()).map(|e| format!(".{}", e)).unwrap_or_default();
            format!("{}{}", render_name(pattern, stem, index + 1, date, &ext)?, ext)
        }
        _ => relative.file_name().and_then(|n| n.to_str()).unwrap_or(stem).to_string(),
    };
    Ok(output_dir.join(parent).join(name))
}

// ============================================================================
// Per-file work
// ============================================================================

fn sharpen_kernel() -> Kernel {
    Kernel::new(3, vec![-2.0, -2.0, -2.0, -2.0, 32.0, -2.0, -2.0, -2.0, -2.0])
}

fn apply_chain(mut image: RgbaImage, steps: &[ChainStep]) -> RgbaImage {
    for step in steps {
        image = match *step {
            ChainStep::Resize { width, height } if width.is_some() || height.is_some() => {
                let (w, h) = (width.unwrap_or(image.width()), height.unwrap_or(image.height()));
                resize(&image, w, h)
            }
            ChainStep::Resize { .. } => image,
            ChainStep::Rotate { angle } => rotate_expand(&image, angle),
            ChainStep::Sharpen => kernel::convolve(&image, &sharpen_kernel()),
            ChainStep::Blur { radius } => kernel::gaussian(&image, radius),
        };
    }
    image
}

/// Encode at falling quality until the size target is met or the floor is
/// reached. Lossless formats are encoded once.
pub fn optimize_bytes(image: &DynamicImage, format: ImageFormat, quality: u8, max_bytes: Option<u64>) -> ToolOutcome<(Vec<u8>, u8)> {
    let mut quality = quality.clamp(1, 100);
    let mut bytes = encode(image, format, quality)?;
    if !is_lossy(format) {
        return Ok((bytes, quality));
    }
    if let Some(limit) = max_bytes {
        while bytes.len() as u64 > limit && quality > OPTIMIZE_QUALITY_FLOOR {
            quality = quality.saturating_sub(OPTIMIZE_QUALITY_STEP).max(OPTIMIZE_QUALITY_FLOOR);
            bytes = encode(image, format, quality)?;
        }
    }
    Ok((bytes, quality))
}

fn process_file(job: &Job, input: &Path, output: &Path, max_input: u64, jpeg_quality: u8) -> ToolOutcome<()> {
    match job {
        Job::Resize { width, height, maintain_aspect } => {
            let image = load_image(input, max_input)?.to_rgba8();
            let (w, h) = target_size(image.dimensions(), *width, *height, *maintain_aspect)
                .ok_or_else(|| ToolError::missing("width or height", "resize"))?;
            save_image(&DynamicImage::ImageRgba8(resize(&image, w, h)), output, jpeg_quality)?;
        }
        Job::Convert { format, quality, .. } => {
            let image = load_image(input, max_input)?;
            crate::process::prepare_output(output)?;
            std::fs::write(output, encode(&image, *format, *quality)?)?;
        }
        Job::Process { steps } => {
            let image = apply_chain(load_image(input, max_input)?.to_rgba8(), steps);
            save_image(&DynamicImage::ImageRgba8(image), output, jpeg_quality)?;
        }
        Job::Watermark { mark, position, opacity, scale } => {
            let mut image = load_image(input, max_input)?.to_rgba8();
            if !apply_watermark(&mut image, mark, *position, *opacity, *scale) {
                return Err(ToolError::invalid("watermark_scale leaves an empty watermark"));
            }
            save_image(&DynamicImage::ImageRgba8(image), output, jpeg_quality)?;
        }
        Job::Rename { .. } => {
            crate::process::prepare_output(output)?;
            std::fs::copy(input, output)?;
        }
        Job::Optimize { quality, max_bytes } => {
            let image = load_image(input, max_input)?;
            let format = format_for_path(output)?;
            let (bytes, final_quality) = optimize_bytes(&image, format, *quality, *max_bytes)?;
            tracing::debug!(file = %input.display(), quality = final_quality, bytes = bytes.len(), "optimized");
            crate::process::prepare_output(output)?;
            std::fs::write(output, bytes)?;
        }
    }
    Ok(())
}

struct Run {
    job: Job,
    input_dir: PathBuf,
    output_dir: PathBuf,
    overwrite: bool,
    workers: usize,
    max_input: u64,
    jpeg_quality: u8,
}

impl Run {
    fn record(&self, index: usize, file: &Path) -> FileRecord {
        let mut record = FileRecord {
            file: file.display().to_string(),
            status: FileStatus::Failed,
            output: None,
            reason: None,
            error: None,
        };
        let output = match output_path_for(&self.job, &self.input_dir, &self.output_dir, file, index) {
            Ok(output) => output,
            Err(err) => {
                record.error = Some(err.to_string());
                return record;
            }
        };
        if output.exists() && !self.overwrite {
            record.status = FileStatus::Skipped;
            record.reason = Some("exists".to_string());
            return record;
        }
        match process_file(&self.job, file, &output, self.max_input, self.jpeg_quality) {
            Ok(()) => {
                record.status = FileStatus::Processed;
                record.output = Some(output.display().to_string());
            }
            Err(err) => {
                tracing::warn!(file = %file.display(), error = %err, "batch item failed");
                record.error = Some(err.to_string());
            }
        }
        record
    }

    /// Process `files` in parallel. Records come back in file order.
    fn execute(&self, files: &[PathBuf]) -> ToolOutcome<Vec<FileRecord>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| ToolError::Io(std::io::Error::other(e)))?;
        Ok(pool.install(|| files.par_iter().enumerate().map(|(i, file)| self.record(i, file)).collect::<Vec<_>>()))
    }
}

// ============================================================================
// Dispatch
// ============================================================================

fn build_job(op: BatchOperation, name: &str, p: &BatchParams) -> ToolOutcome<Job> {
    let quality_in_range = |q: u8, param: &str| {
        if (1..=100).contains(&q) {
            Ok(q)
        } else {
            Err(ToolError::invalid(format!("{} must be between 1 and 100", param)))
        }
    };
    Ok(match op {
        BatchOperation::Resize => {
            if p.width.is_none() && p.height.is_none() {
                return Err(ToolError::missing("width or height", name));
            }
            if p.width == Some(0) || p.height == Some(0) {
                return Err(ToolError::invalid("width and height must be positive"));
            }
            Job::Resize { width: p.width, height: p.height, maintain_aspect: p.maintain_aspect.unwrap_or(true) }
        }
        BatchOperation::Convert => {
            let extension = p.output_format.as_deref().unwrap_or("jpg").trim_start_matches('.').to_ascii_lowercase();
            let format = format_from_name(&extension)?;
            Job::Convert { format, extension, quality: quality_in_range(p.quality.unwrap_or(90), "quality")? }
        }
        BatchOperation::Process => Job::Process { steps: p.operations_chain.clone().unwrap_or_default() },
        BatchOperation::Watermark => {
            let path = required_path(p.watermark_path.as_deref(), "watermark_path", name)?;
            crate::process::ensure_input_exists(&path)?;
            let mark = image::open(&path)?.to_rgba8();
            Job::Watermark {
                mark: Arc::new(mark),
                position: WatermarkPosition::parse(p.watermark_position.as_deref().unwrap_or("bottom-right"))?,
                opacity: p.watermark_opacity.unwrap_or(0.5),
                scale: p.watermark_scale.unwrap_or(0.2),
            }
        }
        BatchOperation::Rename => {
            let pattern = p.rename_pattern.clone().unwrap_or_else(|| "{name}_{index:04d}".to_string());
            // Reject bad placeholders once, up front.
            render_name(&pattern, "x", 1, "19700101", ".x")?;
            Job::Rename { pattern, date: chrono::Local::now().format("%Y%m%d").to_string() }
        }
        BatchOperation::Optimize => {
            let max_bytes = match p.optimize_max_size_kb {
                Some(kb) => Some(
                    kb.checked_mul(1024)
                        .ok_or_else(|| ToolError::invalid("optimize_max_size_kb is too large"))?,
                ),
                None => None,
            };
            Job::Optimize { quality: quality_in_range(p.optimize_quality.unwrap_or(85), "optimize_quality")?, max_bytes }
        }
    })
}

/// Route one call. Always returns an envelope.
pub async fn dispatch(ctx: &ToolContext, params: BatchParams) -> ToolResult {
    let started = Instant::now();
    let name = params.operation.trim().to_string();
    let op = match parse_operation("batch", &name, OPERATIONS) {
        Ok(op) => op,
        Err(err) => return ToolResult::from_outcome(&name, started, Err(err)),
    };
    finish(&name, started, run(ctx, op, &name, params)).await
}

async fn run(ctx: &ToolContext, op: BatchOperation, name: &str, p: BatchParams) -> ToolOutcome<Outcome> {
    let input_dir = required_path(p.input_directory.as_deref(), "input_directory", name)?;
    let output_dir = required_path(p.output_directory.as_deref(), "output_directory", name)?;
    let workers = p.max_workers.unwrap_or(ctx.config.batch.max_workers);
    if !(1..=MAX_WORKERS).contains(&workers) {
        return Err(ToolError::invalid(format!("max_workers must be between 1 and {}", MAX_WORKERS)));
    }
    if !input_dir.is_dir() {
        return Err(ToolError::FileNotFound(input_dir));
    }
    let job = build_job(op, name, &p)?;

    let pattern = p.file_pattern.clone().unwrap_or_else(|| "*.jpg".to_string());
    let recursive = p.recursive.unwrap_or(false);
    let run = Run {
        job,
        input_dir: input_dir.clone(),
        output_dir: output_dir.clone(),
        overwrite: p.overwrite.unwrap_or(false),
        workers,
        max_input: ctx.config.filters.max_file_size_bytes(),
        jpeg_quality: ctx.config.filters.jpeg_quality,
    };

    let records = blocking(move || {
        std::fs::create_dir_all(&run.output_dir)?;
        let files = discover_files(&run.input_dir, &pattern, recursive)?;
        tracing::info!(files = files.len(), workers = run.workers, "batch started");
        run.execute(&files)
    })
    .await?;

    let summary = BatchSummary::tally(&records);
    let limit = ctx.config.batch.result_limit;
    let message = if summary.total_files == 0 {
        "No matching files found".to_string()
    } else {
        format!(
            "Processed {}/{} files ({} failed, {} skipped)",
            summary.processed, summary.total_files, summary.failed, summary.skipped
        )
    };

    Ok(Outcome::new(message)
        .with_success(summary.failed == 0)
        .with("input_directory", display_path(&input_dir))
        .with("output_directory", display_path(&output_dir))
        .with("total_files", summary.total_files)
        .with("processed", summary.processed)
        .with("failed", summary.failed)
        .with("skipped", summary.skipped)
        .with("workers", workers)
        .with("results_truncated", records.len() > limit)
        .with("results", &records[..records.len().min(limit)]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_braces() {
        assert_eq!(expand_braces("*.{jpg,png}"), vec!["*.jpg", "*.png"]);
        assert_eq!(expand_braces("{a,b}_{1,2}.png"), vec!["a_1.png", "a_2.png", "b_1.png", "b_2.png"]);
        assert_eq!(expand_braces("*.jpg"), vec!["*.jpg"]);
        assert_eq!(expand_braces("odd{.png"), vec!["odd{.png"]);
    }

    #[test]
    fn test_render_name() {
        assert_eq!(render_name("{name}_{index:04d}", "cat", 7, "20240101", ".jpg").unwrap(), "cat_0007");
        assert_eq!(render_name("{date}-{index}", "cat", 12, "20240101", ".jpg").unwrap(), "20240101-12");
        assert_eq!(render_name("{index:3d}{ext}", "cat", 5, "d", ".png").unwrap(), "  5.png");
        assert_eq!(render_name("plain", "cat", 1, "d", ".png").unwrap(), "plain");
        assert_eq!(render_name("{owner}", "cat", 1, "d", ".png").unwrap_err().tag(), "ValueError");
    }

    #[test]
    fn test_chain_step_deserialize() {
        let steps: Vec<ChainStep> = serde_json::from_str(
            r#"[{"operation": "resize", "width": 10}, {"operation": "rotate", "angle": 90}, {"operation": "sharpen"}, {"operation": "blur"}]"#,
        )
        .unwrap();
        assert_eq!(steps[0], ChainStep::Resize { width: Some(10), height: None });
        assert_eq!(steps[1], ChainStep::Rotate { angle: 90.0 });
        assert_eq!(steps[3], ChainStep::Blur { radius: 2.0 });
    }

    #[test]
    fn test_chain_rotates_and_resizes() {
        let img = RgbaImage::from_pixel(20, 10, image::Rgba([50, 60, 70, 255]));
        let out = apply_chain(
            img,
            &[ChainStep::Rotate { angle: 90.0 }, ChainStep::Resize { width: Some(5), height: None }, ChainStep::Sharpen],
        );
        assert_eq!(out.dimensions(), (5, 20));
    }

    #[test]
    fn test_optimize_reaches_floor() {
        let noisy = RgbaImage::from_fn(64, 64, |x, y| {
            let v = ((x * 7919 + y * 104729) % 251) as u8;
            image::Rgba([v, v.wrapping_mul(3), v.wrapping_add(91), 255])
        });
        let image = DynamicImage::ImageRgba8(noisy);
        let (_, quality) = optimize_bytes(&image, ImageFormat::Jpeg, 85, Some(1)).unwrap();
        assert_eq!(quality, OPTIMIZE_QUALITY_FLOOR);

        let (_, quality) = optimize_bytes(&image, ImageFormat::Png, 85, Some(1)).unwrap();
        assert_eq!(quality, 85);
    }

    #[test]
    fn test_summary_tally() {
        let rec = |status| FileRecord { file: "f".into(), status, output: None, reason: None, error: None };
        let summary = BatchSummary::tally(&[rec(FileStatus::Processed), rec(FileStatus::Failed), rec(FileStatus::Skipped)]);
        assert_eq!(summary, BatchSummary { total_files: 3, processed: 1, failed: 1, skipped: 1 });
    }

    #[test]
    fn test_resize_requires_a_dimension() {
        let p = BatchParams::default();
        assert_eq!(build_job(BatchOperation::Resize, "resize", &p).unwrap_err().tag(), "ValueError");
    }
}
