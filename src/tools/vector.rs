//! `inkscape_vector`: SVG editing through Inkscape plus native generators.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    blocking, display_path, file_size, finish, operation_names, parse_operation, required, required_path,
    write_document, ToolContext,
};
use crate::envelope::{Outcome, ToolResult};
use crate::error::{ToolError, ToolOutcome};
use crate::imaging::io::load_image;
use crate::process::{ensure_input_exists, ActionList, ExportOptions};
use crate::svg::{self, GradientStop};

/// Input parameters for the inkscape_vector tool.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct VectorParams {
    #[schemars(description = "Operation to perform, e.g. apply_boolean, render_preview, query_document")]
    pub operation: String,

    #[schemars(description = "Input SVG (or raster image for trace_image)")]
    pub input_path: Option<String>,

    #[schemars(description = "Output file; a directory for layers_to_files")]
    pub output_path: Option<String>,

    #[schemars(description = "trace_image: brightness or alpha (default: brightness)")]
    pub trace_type: Option<String>,

    #[schemars(description = "trace_image: 0-255 cut-off (default: 128)")]
    pub threshold: Option<u8>,

    #[schemars(
        description = "apply_boolean: union, difference, intersection, exclusion, division, cut_path (default: union)"
    )]
    pub boolean_op: Option<String>,

    #[schemars(description = "Ids of objects to operate on")]
    pub object_ids: Option<Vec<String>>,

    #[schemars(description = "apply_boolean: operate on everything when no ids are given")]
    pub select_all: Option<bool>,

    #[schemars(description = "render_preview / layers_to_files: export resolution (default: 300)")]
    pub dpi: Option<u32>,

    #[schemars(description = "construct_svg: free-text description of the drawing")]
    pub description: Option<String>,

    #[schemars(description = "measure_object: id of the object to measure")]
    pub object_id: Option<String>,

    #[schemars(description = "measure_object: x, y, width, height or bbox (default: bbox)")]
    pub measurement: Option<String>,

    #[schemars(
        description = "path_operations: simplify, reverse, union, difference, intersection, exclusion, division (default: simplify)"
    )]
    pub path_op: Option<String>,

    #[schemars(description = "generate_laser_dot: x position (default: 100)")]
    pub dot_x: Option<f64>,

    #[schemars(description = "generate_laser_dot: y position (default: 100)")]
    pub dot_y: Option<f64>,

    #[schemars(description = "generate_barcode_qr: payload to encode")]
    pub barcode_data: Option<String>,

    #[schemars(description = "generate_barcode_qr: code type; only qr is available (default: qr)")]
    pub barcode_type: Option<String>,

    #[schemars(description = "create_mesh_gradient: colour stops")]
    pub gradient_stops: Option<Vec<GradientStop>>,

    #[schemars(description = "text_to_path: text to convert")]
    pub text_content: Option<String>,

    #[schemars(description = "text_to_path: font family (default: Sans)")]
    pub font_family: Option<String>,

    #[schemars(description = "text_to_path: font size (default: 24)")]
    pub font_size: Option<f64>,

    #[schemars(description = "path_inset_outset: positive insets, zero or negative outsets (default: 5)")]
    pub inset_amount: Option<f64>,

    #[schemars(description = "path_combine / path_break_apart / object_to_path: ids to select")]
    pub target_objects: Option<Vec<String>>,

    #[schemars(description = "count_nodes: id of the path to inspect")]
    pub target_object: Option<String>,

    #[schemars(description = "export_dxf: DXF flavour label (default: R14)")]
    pub dxf_version: Option<String>,

    #[schemars(description = "layers_to_files: only export layers whose label or id contains this text")]
    pub layer_pattern: Option<String>,

    #[schemars(description = "layers_to_files: export format (default: png)")]
    pub output_format: Option<String>,

    #[schemars(description = "Override the Inkscape timeout for this call, in seconds")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorOperation {
    TraceImage,
    ApplyBoolean,
    OptimizeSvg,
    RenderPreview,
    ConstructSvg,
    MeasureObject,
    QueryDocument,
    PathOperations,
    ScourSvg,
    GenerateLaserDot,
    GenerateBarcodeQr,
    CreateMeshGradient,
    TextToPath,
    PathInsetOutset,
    PathClean,
    PathCombine,
    PathBreakApart,
    ObjectToPath,
    CountNodes,
    ExportDxf,
    LayersToFiles,
    FitCanvasToDrawing,
}

pub const OPERATIONS: &[(&str, VectorOperation)] = &[
    ("trace_image", VectorOperation::TraceImage),
    ("apply_boolean", VectorOperation::ApplyBoolean),
    ("optimize_svg", VectorOperation::OptimizeSvg),
    ("render_preview", VectorOperation::RenderPreview),
    ("construct_svg", VectorOperation::ConstructSvg),
    ("measure_object", VectorOperation::MeasureObject),
    ("query_document", VectorOperation::QueryDocument),
    ("path_operations", VectorOperation::PathOperations),
    ("scour_svg", VectorOperation::ScourSvg),
    ("generate_laser_dot", VectorOperation::GenerateLaserDot),
    ("generate_barcode_qr", VectorOperation::GenerateBarcodeQr),
    ("create_mesh_gradient", VectorOperation::CreateMeshGradient),
    ("text_to_path", VectorOperation::TextToPath),
    ("path_inset_outset", VectorOperation::PathInsetOutset),
    ("path_clean", VectorOperation::PathClean),
    ("path_combine", VectorOperation::PathCombine),
    ("path_break_apart", VectorOperation::PathBreakApart),
    ("object_to_path", VectorOperation::ObjectToPath),
    ("count_nodes", VectorOperation::CountNodes),
    ("export_dxf", VectorOperation::ExportDxf),
    ("layers_to_files", VectorOperation::LayersToFiles),
    ("fit_canvas_to_drawing", VectorOperation::FitCanvasToDrawing),
];

pub fn operations() -> Vec<&'static str> {
    operation_names(OPERATIONS)
}

const BOOLEAN_ACTIONS: &[(&str, &str)] = &[
    ("union", "selection-union"),
    ("difference", "selection-diff"),
    ("intersection", "selection-intersect"),
    ("exclusion", "selection-exclusion"),
    ("division", "selection-division"),
    ("cut_path", "selection-cutpath"),
];

const PATH_ACTIONS: &[(&str, &str)] = &[
    ("simplify", "selection-simplify"),
    ("reverse", "selection-reverse"),
    ("union", "selection-union"),
    ("difference", "selection-diff"),
    ("intersection", "selection-intersect"),
    ("exclusion", "selection-exclusion"),
    ("division", "selection-division"),
];

fn lookup_action(what: &str, name: &str, table: &[(&str, &'static str)]) -> ToolOutcome<&'static str> {
    table.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, action)| *action).ok_or_else(|| {
        let valid: Vec<&str> = table.iter().map(|(key, _)| *key).collect();
        ToolError::invalid(format!("Unknown {} '{}'. Valid: {}", what, name, valid.join(", ")))
    })
}

/// Route one call. Always returns an envelope.
pub async fn dispatch(ctx: &ToolContext, params: VectorParams) -> ToolResult {
    let started = Instant::now();
    let name = params.operation.trim().to_string();
    let op = match parse_operation("vector", &name, OPERATIONS) {
        Ok(op) => op,
        Err(err) => return ToolResult::from_outcome(&name, started, Err(err)),
    };
    finish(&name, started, run(ctx, op, &name, &params)).await
}

async fn run(ctx: &ToolContext, op: VectorOperation, name: &str, p: &VectorParams) -> ToolOutcome<Outcome> {
    use VectorOperation::*;
    match op {
        TraceImage => trace_image(ctx, p).await,
        ApplyBoolean => apply_boolean(ctx, p).await,
        OptimizeSvg | ScourSvg | PathClean => cleanup(ctx, op, name, p).await,
        RenderPreview => render_preview(ctx, p).await,
        ConstructSvg => construct_svg(p).await,
        MeasureObject => measure_object(ctx, p).await,
        QueryDocument => query_document(ctx, p).await,
        PathOperations => path_operations(ctx, p).await,
        GenerateLaserDot => laser_dot(p).await,
        GenerateBarcodeQr => barcode_qr(p).await,
        CreateMeshGradient => mesh_gradient(p).await,
        TextToPath => text_to_path(ctx, p).await,
        PathInsetOutset => inset_outset(ctx, p).await,
        PathCombine | PathBreakApart | ObjectToPath => selection_action(ctx, op, name, p).await,
        CountNodes => count_nodes(p).await,
        ExportDxf => export_dxf(ctx, p).await,
        LayersToFiles => layers_to_files(ctx, p).await,
        FitCanvasToDrawing => fit_canvas(ctx, p).await,
    }
}

fn io_paths(p: &VectorParams, op: &str) -> ToolOutcome<(PathBuf, PathBuf)> {
    Ok((required_path(p.input_path.as_deref(), "input_path", op)?, required_path(p.output_path.as_deref(), "output_path", op)?))
}

fn timeout(p: &VectorParams) -> Option<Duration> {
    p.timeout_secs.map(Duration::from_secs)
}

/// Number of selected objects, or `"all"` for a select-all run.
fn object_count(ids: &[String]) -> Value {
    if ids.is_empty() {
        json!("all")
    } else {
        json!(ids.len())
    }
}

fn transfer_data(outcome: Outcome, input: &Path, output: &Path) -> Outcome {
    outcome.with("input_path", display_path(input)).with("output_path", display_path(output))
}

async fn run_actions(
    ctx: &ToolContext,
    p: &VectorParams,
    actions: &ActionList,
    input: &Path,
    output: &Path,
) -> ToolOutcome<()> {
    ctx.cli()?.execute_actions(actions, input, Some(output), timeout(p)).await?;
    Ok(())
}

// ============================================================================
// Inkscape-backed operations
// ============================================================================

async fn apply_boolean(ctx: &ToolContext, p: &VectorParams) -> ToolOutcome<Outcome> {
    let (input, output) = io_paths(p, "apply_boolean")?;
    let ids = p.object_ids.clone().unwrap_or_default();
    if ids.is_empty() && !p.select_all.unwrap_or(false) {
        return Err(ToolError::invalid("apply_boolean requires 'object_ids' or select_all=true"));
    }
    let boolean_op = p.boolean_op.as_deref().unwrap_or("union");
    let action = lookup_action("boolean_op", boolean_op, BOOLEAN_ACTIONS)?;

    let actions = ActionList::new().select(&ids).push(action);
    run_actions(ctx, p, &actions, &input, &output).await?;

    let message = match ids.len() {
        0 => format!("Applied {} operation to all objects", boolean_op),
        n => format!("Applied {} operation to {} objects", boolean_op, n),
    };
    Ok(transfer_data(Outcome::new(message), &input, &output)
        .with("boolean_op", boolean_op)
        .with("object_count", object_count(&ids))
        .with("object_ids", &ids))
}

async fn path_operations(ctx: &ToolContext, p: &VectorParams) -> ToolOutcome<Outcome> {
    let (input, output) = io_paths(p, "path_operations")?;
    let path_op = p.path_op.as_deref().unwrap_or("simplify");
    let action = lookup_action("path_op", path_op, PATH_ACTIONS)?;
    let ids = p.object_ids.clone().unwrap_or_default();

    let actions = ActionList::new().select(&ids).push(action);
    run_actions(ctx, p, &actions, &input, &output).await?;

    Ok(transfer_data(Outcome::new(format!("Applied path operation: {}", path_op)), &input, &output)
        .with("path_op", path_op)
        .with("action", action)
        .with("object_count", object_count(&ids)))
}

async fn selection_action(
    ctx: &ToolContext,
    op: VectorOperation,
    name: &str,
    p: &VectorParams,
) -> ToolOutcome<Outcome> {
    let (input, output) = io_paths(p, name)?;
    let (action, message) = match op {
        VectorOperation::PathCombine => ("path-combine", "Applied combine to paths"),
        VectorOperation::PathBreakApart => ("path-break-apart", "Applied break apart to paths"),
        _ => ("object-to-path", "Converted objects to editable paths"),
    };
    let ids = p.target_objects.clone().or_else(|| p.object_ids.clone()).unwrap_or_default();

    let actions = ActionList::new().select(&ids).push(action);
    run_actions(ctx, p, &actions, &input, &output).await?;

    Ok(transfer_data(Outcome::new(message), &input, &output).with("object_count", object_count(&ids)))
}

async fn inset_outset(ctx: &ToolContext, p: &VectorParams) -> ToolOutcome<Outcome> {
    let (input, output) = io_paths(p, "path_inset_outset")?;
    let amount = p.inset_amount.unwrap_or(5.0);
    let (action, label) = if amount > 0.0 { ("path-inset", "inset") } else { ("path-outset", "outset") };
    let ids = p.object_ids.clone().unwrap_or_default();

    let actions = ActionList::new().select(&ids).push(action);
    run_actions(ctx, p, &actions, &input, &output).await?;

    Ok(transfer_data(Outcome::new(format!("Applied {} of {} units", label, amount.abs())), &input, &output)
        .with("inset_amount", amount)
        .with("object_count", object_count(&ids)))
}

async fn cleanup(ctx: &ToolContext, op: VectorOperation, name: &str, p: &VectorParams) -> ToolOutcome<Outcome> {
    let (input, output) = io_paths(p, name)?;
    let actions = ActionList::new().push("file-vacuum-defs").push("file-cleanup");
    run_actions(ctx, p, &actions, &input, &output).await?;

    let input_size = file_size(&input);
    let output_size = file_size(&output);
    let saved = input_size as i64 - output_size as i64;
    let percent = if input_size > 0 { saved as f64 / input_size as f64 * 100.0 } else { 0.0 };
    let verb = match op {
        VectorOperation::ScourSvg => "Scoured",
        VectorOperation::PathClean => "Cleaned",
        _ => "Optimized",
    };

    Ok(transfer_data(
        Outcome::new(format!("{} SVG: saved {} bytes ({:.1}%)", verb, saved, percent)),
        &input,
        &output,
    )
    .with("input_size_bytes", input_size)
    .with("output_size_bytes", output_size)
    .with("bytes_saved", saved)
    .with("percent_saved", (percent * 10.0).round() / 10.0))
}

async fn fit_canvas(ctx: &ToolContext, p: &VectorParams) -> ToolOutcome<Outcome> {
    let (input, output) = io_paths(p, "fit_canvas_to_drawing")?;
    let actions = ActionList::new().push("fit-canvas-to-drawing");
    run_actions(ctx, p, &actions, &input, &output).await?;
    Ok(transfer_data(Outcome::new("Fitted canvas to drawing boundaries"), &input, &output))
}

async fn text_to_path(ctx: &ToolContext, p: &VectorParams) -> ToolOutcome<Outcome> {
    let text = required(p.text_content.as_deref(), "text_content", "text_to_path")?;
    let output = required_path(p.output_path.as_deref(), "output_path", "text_to_path")?;
    let font_family = p.font_family.as_deref().unwrap_or("Sans");
    let font_size = p.font_size.unwrap_or(24.0);
    if font_size <= 0.0 {
        return Err(ToolError::invalid("font_size must be positive"));
    }
    let cli = ctx.cli()?;

    // Removed when dropped, after Inkscape has read it.
    let source = tempfile::Builder::new().prefix("inkscape-mcp-text-").suffix(".svg").tempfile()?;
    tokio::fs::write(source.path(), svg::text_document(text, font_family, font_size)).await?;

    let actions = ActionList::new().select(&[svg::TEXT_ELEMENT_ID.to_string()]).push("object-to-path");
    cli.execute_actions(&actions, source.path(), Some(&output), timeout(p)).await?;

    Ok(Outcome::new(format!("Converted text to paths: {}...", svg::truncate_chars(text, 20)))
        .with("output_path", display_path(&output))
        .with("text_content", text)
        .with("font_family", font_family)
        .with("font_size", font_size)
        .with("output_size_bytes", file_size(&output)))
}

async fn render_preview(ctx: &ToolContext, p: &VectorParams) -> ToolOutcome<Outcome> {
    let (input, output) = io_paths(p, "render_preview")?;
    let dpi = p.dpi.unwrap_or(300);
    if dpi == 0 {
        return Err(ToolError::invalid("dpi must be positive"));
    }
    let options = ExportOptions { format: Some("png".to_string()), dpi: Some(dpi), export_id: None };
    ctx.cli()?.export(&input, &output, &options).await?;

    Ok(transfer_data(Outcome::new(format!("Rendered preview at {} DPI", dpi)), &input, &output)
        .with("dpi", dpi)
        .with("output_size_bytes", file_size(&output)))
}

async fn export_dxf(ctx: &ToolContext, p: &VectorParams) -> ToolOutcome<Outcome> {
    let (input, output) = io_paths(p, "export_dxf")?;
    let version = p.dxf_version.as_deref().unwrap_or("R14");
    let options = ExportOptions { format: Some("dxf".to_string()), dpi: None, export_id: None };
    ctx.cli()?.export(&input, &output, &options).await?;

    Ok(transfer_data(Outcome::new(format!("Exported to DXF {} format", version)), &input, &output)
        .with("dxf_version", version)
        .with("output_size_bytes", file_size(&output)))
}

/// Keep file names portable whatever the layer label holds.
fn file_stem_for(label: &str) -> String {
    let stem: String =
        label.chars().map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' }).collect();
    if stem.is_empty() {
        "layer".to_string()
    } else {
        stem
    }
}

/// One file stem per layer. Repeated stems get `_2`, `_3`, ... so no export
/// overwrites another; comparison ignores case for case-folding filesystems.
fn unique_file_stems(layers: &[svg::SvgLayer]) -> Vec<String> {
    let mut used = HashSet::new();
    layers
        .iter()
        .map(|layer| {
            let base = file_stem_for(&layer.label);
            let mut stem = base.clone();
            let mut n = 2;
            while !used.insert(stem.to_lowercase()) {
                stem = format!("{}_{}", base, n);
                n += 1;
            }
            stem
        })
        .collect()
}

async fn layers_to_files(ctx: &ToolContext, p: &VectorParams) -> ToolOutcome<Outcome> {
    let (input, output_dir) = io_paths(p, "layers_to_files")?;
    let format = p.output_format.as_deref().unwrap_or("png").trim_start_matches('.').to_ascii_lowercase();
    if p.dpi == Some(0) {
        return Err(ToolError::invalid("dpi must be positive"));
    }
    ensure_input_exists(&input)?;
    let cli = ctx.cli()?;

    let source = tokio::fs::read_to_string(&input).await?;
    let layers: Vec<svg::SvgLayer> = svg::find_layers(&source)
        .into_iter()
        .filter(|layer| match p.layer_pattern.as_deref() {
            Some(pattern) => layer.label.contains(pattern) || layer.id.contains(pattern),
            None => true,
        })
        .collect();

    tokio::fs::create_dir_all(&output_dir).await?;
    let mut exported = Vec::with_capacity(layers.len());
    for (layer, stem) in layers.iter().zip(unique_file_stems(&layers)) {
        let target = output_dir.join(format!("{}.{}", stem, format));
        let options = ExportOptions { format: Some(format.clone()), dpi: p.dpi, export_id: Some(layer.id.clone()) };
        cli.export(&input, &target, &options).await?;
        tracing::debug!(layer = %layer.id, file = %target.display(), "layer exported");
        exported.push(display_path(&target));
    }

    Ok(Outcome::new(format!("Exported {} layers to {} files", exported.len(), format))
        .with("input_path", display_path(&input))
        .with("output_directory", display_path(&output_dir))
        .with("output_format", &format)
        .with("exported_files", &exported)
        .with("layer_count", exported.len()))
}

const BBOX: &[&str] = &["x", "y", "width", "height"];

async fn measure_object(ctx: &ToolContext, p: &VectorParams) -> ToolOutcome<Outcome> {
    let input = required_path(p.input_path.as_deref(), "input_path", "measure_object")?;
    let object_id = required(p.object_id.as_deref(), "object_id", "measure_object")?;
    let measurement = p.measurement.as_deref().unwrap_or("bbox");
    let properties: &[&str] = match measurement {
        "bbox" => BBOX,
        "x" => &["x"],
        "y" => &["y"],
        "width" => &["width"],
        "height" => &["height"],
        other => {
            return Err(ToolError::invalid(format!(
                "Unknown measurement '{}'. Valid: x, y, width, height, bbox",
                other
            )))
        }
    };

    let values: BTreeMap<String, Option<f64>> = ctx.cli()?.query_object(&input, Some(object_id), properties).await?;
    let shown = if properties.len() == 1 {
        values.get(properties[0]).copied().flatten().map(|v| v.to_string()).unwrap_or_else(|| "unknown".to_string())
    } else {
        serde_json::to_string(&values).unwrap_or_default()
    };

    let mut outcome = Outcome::new(format!("Measured {} for object {}: {}", measurement, object_id, shown))
        .with("object_id", object_id)
        .with("measurement", measurement)
        .with("values", &values);
    if properties.len() == 1 {
        outcome = outcome.with("value", values.get(properties[0]).copied().flatten());
    }
    Ok(outcome)
}

async fn query_document(ctx: &ToolContext, p: &VectorParams) -> ToolOutcome<Outcome> {
    let input = required_path(p.input_path.as_deref(), "input_path", "query_document")?;
    let objects = ctx.cli()?.query_all(&input).await?;
    let total_area: f64 = objects
        .iter()
        .filter_map(|o| match (o.width, o.height) {
            (Some(w), Some(h)) => Some(w * h),
            _ => None,
        })
        .sum();

    Ok(Outcome::new(format!("Found {} objects", objects.len()))
        .with("input_path", display_path(&input))
        .with("object_count", objects.len())
        .with("total_area", total_area)
        .with("objects", &objects))
}

// ============================================================================
// Native operations
// ============================================================================

async fn trace_image(ctx: &ToolContext, p: &VectorParams) -> ToolOutcome<Outcome> {
    let (input, output) = io_paths(p, "trace_image")?;
    let trace_type = p.trace_type.as_deref().unwrap_or("brightness").to_ascii_lowercase();
    let by_alpha = match trace_type.as_str() {
        "brightness" => false,
        "alpha" => true,
        other => return Err(ToolError::invalid(format!("Unknown trace_type '{}'. Valid: brightness, alpha", other))),
    };
    let threshold = p.threshold.unwrap_or(128);
    let max_bytes = ctx.config.filters.max_file_size_bytes();

    let source = input.clone();
    let (document, runs, width, height) = blocking(move || {
        let rgba = load_image(&source, max_bytes)?.to_rgba8();
        let luma = image::imageops::grayscale(&rgba);
        let (width, height) = rgba.dimensions();
        let (document, runs) = svg::trace_runs(width, height, |x, y| {
            if by_alpha {
                rgba.get_pixel(x, y)[3] >= threshold
            } else {
                luma.get_pixel(x, y)[0] < threshold
            }
        });
        Ok((document, runs, width, height))
    })
    .await?;
    let size = write_document(&output, &document).await?;

    Ok(transfer_data(Outcome::new(format!("Traced {}x{} image into {} path runs", width, height, runs)), &input, &output)
        .with("trace_type", &trace_type)
        .with("threshold", threshold)
        .with("width", width)
        .with("height", height)
        .with("path_runs", runs)
        .with("output_size_bytes", size))
}

async fn count_nodes(p: &VectorParams) -> ToolOutcome<Outcome> {
    let input = required_path(p.input_path.as_deref(), "input_path", "count_nodes")?;
    let target = required(p.target_object.as_deref(), "target_object", "count_nodes")?;
    ensure_input_exists(&input)?;

    let source = tokio::fs::read_to_string(&input).await?;
    let nodes = svg::count_nodes(&source, target)
        .ok_or_else(|| ToolError::invalid(format!("Object '{}' not found or has no path data", target)))?;

    Ok(Outcome::new(format!("Object {} has {} nodes", target, nodes))
        .with("target_object", target)
        .with("node_count", nodes)
        .with("complexity", svg::complexity(nodes)))
}

async fn construct_svg(p: &VectorParams) -> ToolOutcome<Outcome> {
    let description = required(p.description.as_deref(), "description", "construct_svg")?;
    let output = required_path(p.output_path.as_deref(), "output_path", "construct_svg")?;
    let document = svg::construct(description);
    let size = write_document(&output, &document).await?;
    let template = if svg::is_crest_request(description) { "crest" } else { "geometric" };

    Ok(Outcome::new(format!("Constructed SVG from description using the {} template", template))
        .with("output_path", display_path(&output))
        .with("description", description)
        .with("template", template)
        .with("svg_content_length", document.chars().count())
        .with("output_size_bytes", size))
}

async fn laser_dot(p: &VectorParams) -> ToolOutcome<Outcome> {
    let output = required_path(p.output_path.as_deref(), "output_path", "generate_laser_dot")?;
    let (x, y) = (p.dot_x.unwrap_or(100.0), p.dot_y.unwrap_or(100.0));
    let size = write_document(&output, &svg::laser_dot(x, y)).await?;

    Ok(Outcome::new(format!("Generated laser dot SVG at ({:.1}, {:.1})", x, y))
        .with("output_path", display_path(&output))
        .with("position", json!({ "x": x, "y": y }))
        .with("description", "Animated green laser pointer dot")
        .with("output_size_bytes", size))
}

async fn barcode_qr(p: &VectorParams) -> ToolOutcome<Outcome> {
    let data = required(p.barcode_data.as_deref(), "barcode_data", "generate_barcode_qr")?;
    let output = required_path(p.output_path.as_deref(), "output_path", "generate_barcode_qr")?;
    let kind = p.barcode_type.as_deref().unwrap_or("qr").to_ascii_lowercase();
    if kind != "qr" {
        return Err(ToolError::Unsupported(format!("generate_barcode_qr (barcode_type '{}')", kind)));
    }
    let size = write_document(&output, &svg::qr_placeholder(data)).await?;

    Ok(Outcome::new(format!("Generated QR for data: {}...", svg::truncate_chars(data, 20)))
        .with("output_path", display_path(&output))
        .with("barcode_data", data)
        .with("barcode_type", &kind)
        .with("modules", svg::QR_MODULES)
        .with("scannable", false)
        .with("output_size_bytes", size))
}

async fn mesh_gradient(p: &VectorParams) -> ToolOutcome<Outcome> {
    let stops = required(p.gradient_stops.as_deref(), "gradient_stops", "create_mesh_gradient")?;
    if stops.is_empty() {
        return Err(ToolError::invalid("gradient_stops must contain at least one stop"));
    }
    let output = required_path(p.output_path.as_deref(), "output_path", "create_mesh_gradient")?;
    let size = write_document(&output, &svg::mesh_gradient(stops)).await?;

    Ok(Outcome::new(format!("Created mesh gradient with {} stops", stops.len()))
        .with("output_path", display_path(&output))
        .with("gradient_stops", stops.len())
        .with("output_size_bytes", size))
}
