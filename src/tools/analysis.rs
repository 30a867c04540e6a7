//! `inkscape_analysis`: read-only inspection of raster images.
//!
//! Every operation decodes the input once on a worker thread and reports
//! numbers; nothing is written.

use std::path::{Path, PathBuf};
use std::time::Instant;

use image::DynamicImage;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{blocking, display_path, file_size, finish, operation_names, parse_operation, required_path, ToolContext};
use crate::envelope::{Outcome, ToolResult};
use crate::error::ToolOutcome;
use crate::imaging::container::{exif_block, exif_fields, icc_profile, icc_summary, png_text, tiff_page_count};
use crate::imaging::io::{format_label, load_image, mode_name, sniff_format};
use crate::imaging::stats::{self, IssueCheck, ALL_CHECKS};
use crate::process::ensure_input_exists;

/// Input parameters for the inkscape_analysis tool.
#[derive(Debug, Default, Clone, Deserialize, JsonSchema)]
pub struct AnalysisParams {
    #[schemars(
        description = "Analysis: quality, statistics, histogram, compare, detect_issues, report, color_profile, metadata"
    )]
    pub operation: String,

    #[schemars(description = "Image to analyze")]
    pub input_path: Option<String>,

    #[schemars(description = "compare: second image; resampled to the first image's size when they differ")]
    pub compare_path: Option<String>,

    #[schemars(description = "statistics: include 256-bin histograms (default: true)")]
    pub include_histogram: Option<bool>,

    #[schemars(description = "statistics: include dominant colours (default: true)")]
    pub include_color_info: Option<bool>,

    #[schemars(description = "detect_issues: any of exposure, sharpness, noise, color, or all (default: [all])")]
    pub check_types: Option<Vec<String>>,

    #[schemars(description = "report: detailed or summary (default: detailed)")]
    pub report_format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisOperation {
    Quality,
    Statistics,
    Histogram,
    Compare,
    DetectIssues,
    Report,
    ColorProfile,
    Metadata,
}

pub const OPERATIONS: &[(&str, AnalysisOperation)] = &[
    ("quality", AnalysisOperation::Quality),
    ("statistics", AnalysisOperation::Statistics),
    ("histogram", AnalysisOperation::Histogram),
    ("compare", AnalysisOperation::Compare),
    ("detect_issues", AnalysisOperation::DetectIssues),
    ("report", AnalysisOperation::Report),
    ("color_profile", AnalysisOperation::ColorProfile),
    ("metadata", AnalysisOperation::Metadata),
];

pub fn operations() -> Vec<&'static str> {
    operation_names(OPERATIONS)
}

/// Number of dominant colours reported by `statistics`.
const DOMINANT_COLORS: usize = 5;

/// Route one call. Always returns an envelope.
pub async fn dispatch(ctx: &ToolContext, params: AnalysisParams) -> ToolResult {
    let started = Instant::now();
    let name = params.operation.trim().to_string();
    let op = match parse_operation("analysis", &name, OPERATIONS) {
        Ok(op) => op,
        Err(err) => return ToolResult::from_outcome(&name, started, Err(err)),
    };
    finish(&name, started, run(ctx, op, &name, params)).await
}

/// `check_types` resolved to concrete checks; `all` expands to every check.
pub fn parse_checks(names: Option<&[String]>) -> ToolOutcome<Vec<IssueCheck>> {
    let names = match names {
        Some(names) if !names.is_empty() => names,
        _ => return Ok(ALL_CHECKS.to_vec()),
    };
    if names.iter().any(|n| n.trim().eq_ignore_ascii_case("all")) {
        return Ok(ALL_CHECKS.to_vec());
    }
    let mut checks = Vec::new();
    for name in names {
        let check = IssueCheck::parse(name)?;
        if !checks.contains(&check) {
            checks.push(check);
        }
    }
    Ok(checks)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportFormat {
    Detailed,
    Summary,
}

fn parse_report_format(name: Option<&str>) -> ToolOutcome<ReportFormat> {
    crate::imaging::filters::parse_choice(
        name.unwrap_or("detailed"),
        "report format",
        &[("detailed", ReportFormat::Detailed), ("summary", ReportFormat::Summary)],
    )
}

async fn run(ctx: &ToolContext, op: AnalysisOperation, name: &str, p: AnalysisParams) -> ToolOutcome<Outcome> {
    let input = required_path(p.input_path.as_deref(), "input_path", name)?;
    ensure_input_exists(&input)?;
    let max_bytes = ctx.config.filters.max_file_size_bytes();

    match op {
        AnalysisOperation::Compare => {
            let other = required_path(p.compare_path.as_deref(), "compare_path", name)?;
            ensure_input_exists(&other)?;
            compare(input, other, max_bytes).await
        }
        AnalysisOperation::DetectIssues => {
            let checks = parse_checks(p.check_types.as_deref())?;
            let src = input.clone();
            let found = blocking(move || Ok(issues(&load_image(&src, max_bytes)?, &checks))).await?;
            let message = format!(
                "Found {} issue(s) and {} warning(s)",
                found["issue_count"], found["warning_count"]
            );
            Ok(with_fields(Outcome::new(message), found))
        }
        AnalysisOperation::Report => {
            let format = parse_report_format(p.report_format.as_deref())?;
            let src = input.clone();
            let report = blocking(move || report(&src, max_bytes, format)).await?;
            Ok(with_fields(Outcome::new(format!("Analysis report for {}", file_name(&input))), report))
        }
        _ => {
            let include_histogram = p.include_histogram.unwrap_or(true);
            let include_colors = p.include_color_info.unwrap_or(true);
            let src = input.clone();
            let (message, data) = blocking(move || {
                let image = load_image(&src, max_bytes)?;
                Ok(match op {
                    AnalysisOperation::Quality => {
                        let q = stats::quality(&image);
                        (format!("Quality score: {:.1}/100", q["overall_score"].as_f64().unwrap_or(0.0)), q)
                    }
                    AnalysisOperation::Statistics => (
                        format!(
                            "Statistics for {}x{} {} image",
                            image.width(),
                            image.height(),
                            mode_name(image.color())
                        ),
                        statistics(&src, &image, include_histogram, include_colors),
                    ),
                    AnalysisOperation::Histogram => {
                        let bands = stats::band_names(&image);
                        (format!("Histogram for {} channel(s)", bands.len()), histogram(&image))
                    }
                    AnalysisOperation::ColorProfile => {
                        let profile = color_profile(&src, &image)?;
                        let found = if profile["has_profile"] == Value::Bool(true) { "Found" } else { "None embedded" };
                        (format!("Color profile: {}", found), profile)
                    }
                    _ => {
                        let meta = metadata(&src, &image)?;
                        (format!("Extracted metadata from {} image", meta["format"].as_str().unwrap_or("unknown")), meta)
                    }
                })
            })
            .await?;
            Ok(with_fields(Outcome::new(message), data).with("path", display_path(&input)))
        }
    }
}

/// Copy every field of a JSON object into the outcome's data.
fn with_fields(mut outcome: Outcome, value: Value) -> Outcome {
    if let Value::Object(map) = value {
        for (key, v) in map {
            outcome = outcome.with(&key, v);
        }
    }
    outcome
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

fn histogram(image: &DynamicImage) -> Value {
    let hists: Map<String, Value> = stats::histograms(image).into_iter().map(|(band, h)| (band.to_string(), json!(h))).collect();
    json!({ "channels": stats::band_names(image), "histograms": hists, "bins": 256 })
}

fn statistics(path: &Path, image: &DynamicImage, include_histogram: bool, include_colors: bool) -> Value {
    let channels: Map<String, Value> =
        stats::statistics(image).into_iter().map(|(band, s)| (band.to_string(), json!(s))).collect();
    let mut data = json!({
        "dimensions": { "width": image.width(), "height": image.height() },
        "mode": mode_name(image.color()),
        "channels": stats::band_names(image).len(),
        "total_pixels": image.width() as u64 * image.height() as u64,
        "file_size_bytes": file_size(path),
        "channel_statistics": channels,
    });
    if include_histogram {
        let mut hist = histogram(image);
        data["histogram"] = hist["histograms"].take();
    }
    if include_colors {
        let (dominant, unique) = stats::dominant_colors(&image.to_rgba8(), DOMINANT_COLORS);
        data["color_info"] = json!({ "dominant_colors": dominant, "unique_colors_estimate": unique });
    }
    data
}

fn issues(image: &DynamicImage, checks: &[IssueCheck]) -> Value {
    let found = stats::detect_issues(&image.to_rgba8(), checks);
    json!({
        "issue_count": found.issues.len(),
        "warning_count": found.warnings.len(),
        "issues": found.issues,
        "warnings": found.warnings,
        "checks_performed": checks.iter().map(|c| c.name()).collect::<Vec<_>>(),
    })
}

fn color_profile(path: &Path, image: &DynamicImage) -> ToolOutcome<Value> {
    let bytes = std::fs::read(path)?;
    let profile = icc_profile(&bytes).map(|embedded| {
        let mut value = match icc_summary(&embedded.data) {
            Some(summary) => json!(summary),
            None => json!({ "raw": "Present but could not parse" }),
        };
        value["name"] = json!(embedded.name);
        value["length_bytes"] = json!(embedded.data.len());
        value
    });
    Ok(json!({
        "mode": mode_name(image.color()),
        "has_profile": profile.is_some(),
        "profile": profile,
    }))
}

fn metadata(path: &Path, image: &DynamicImage) -> ToolOutcome<Value> {
    let bytes = std::fs::read(path)?;
    let format = sniff_format(path)?.map(format_label);
    let mut data = json!({
        "format": format,
        "mode": mode_name(image.color()),
        "size": [image.width(), image.height()],
        "info": png_text(&bytes),
    });
    if let Some(block) = exif_block(&bytes) {
        data["exif"] = json!(exif_fields(block));
    }
    if let Some(pages) = tiff_page_count(&bytes) {
        data["pages"] = json!(pages);
    }
    Ok(data)
}

fn report(path: &Path, max_bytes: u64, format: ReportFormat) -> ToolOutcome<Value> {
    let image = load_image(path, max_bytes)?;
    let quality = stats::quality(&image);
    let found = issues(&image, &ALL_CHECKS);
    let summary = json!({
        "file": file_name(path),
        "quality_score": quality["overall_score"],
        "issue_count": found["issue_count"],
        "warning_count": found["warning_count"],
    });
    if format == ReportFormat::Summary {
        return Ok(json!({ "summary": summary }));
    }
    Ok(json!({
        "summary": summary,
        "quality": quality,
        "statistics": statistics(path, &image, true, true),
        "issues": found,
        "metadata": metadata(path, &image)?,
    }))
}

async fn compare(input: PathBuf, other: PathBuf, max_bytes: u64) -> ToolOutcome<Outcome> {
    let (a_path, b_path) = (input.clone(), other.clone());
    let (result, resized) = blocking(move || {
        let a = load_image(&a_path, max_bytes)?.to_rgba8();
        let b = load_image(&b_path, max_bytes)?.to_rgba8();
        let resized = a.dimensions() != b.dimensions();
        Ok((stats::compare(&a, &b), resized))
    })
    .await?;

    let round = |v: f64, places: i32| (v * 10f64.powi(places)).round() / 10f64.powi(places);
    let identical = result.mse == 0.0;
    let psnr = if result.psnr.is_finite() { Some(round(result.psnr, 2)) } else { None };
    let message = match psnr {
        Some(db) => format!("PSNR: {:.2} dB, SSIM: {:.4}", db, result.ssim),
        None => format!("PSNR: inf dB, SSIM: {:.4}", result.ssim),
    };
    Ok(Outcome::new(message)
        .with("psnr", psnr)
        .with("ssim", round(result.ssim, 4))
        .with("mse", round(result.mse, 2))
        .with("max_difference", result.max_difference)
        .with("mean_difference", round(result.mean_difference, 2))
        .with("identical", identical)
        .with("similar", result.ssim > 0.95)
        .with("resized", resized)
        .with("input_path", display_path(&input))
        .with("compare_path", display_path(&other)))
}
