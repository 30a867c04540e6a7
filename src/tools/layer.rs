//! `inkscape_layer`: layer inspection and flattening.
//!
//! SVG layers are read from the source text; raster layers are animation
//! frames (GIF), pages (multi-page TIFF) or the single background of a flat
//! image. Editing individual layers is reported as unsupported.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

use image::codecs::gif::GifDecoder;
use image::{imageops, AnimationDecoder, DynamicImage, Rgba, RgbaImage};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{blocking, display_path, finish, operation_names, parse_operation, required_path, ToolContext};
use crate::envelope::{Outcome, ToolResult};
use crate::error::{ToolError, ToolOutcome};
use crate::imaging::container::tiff_page_sizes;
use crate::imaging::io::{check_overwrite, load_image, save_image};
use crate::process::ensure_input_exists;
use crate::svg;

/// Input parameters for the inkscape_layer tool.
#[derive(Debug, Default, Clone, Deserialize, JsonSchema)]
pub struct LayerParams {
    #[schemars(
        description = "info, flatten or merge; create, duplicate, delete, reorder, properties, rename and visibility are reported as unsupported"
    )]
    pub operation: String,

    #[schemars(description = "Source SVG or raster image")]
    pub input_path: Option<String>,

    #[schemars(description = "Destination file for flatten and merge")]
    pub output_path: Option<String>,

    #[schemars(description = "Zero-based layer index (unsupported operations only)")]
    pub layer_index: Option<u32>,

    #[schemars(description = "merge: merge the layer below into the selected one (unsupported)")]
    pub merge_down: Option<bool>,

    #[schemars(description = "merge: merge all visible layers, which flattens the image")]
    pub merge_visible: Option<bool>,

    #[schemars(description = "Replace an existing output file (default: false)")]
    pub overwrite: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerOperation {
    Info,
    Flatten,
    Merge,
    Create,
    Duplicate,
    Delete,
    Reorder,
    Properties,
    Rename,
    Visibility,
}

pub const OPERATIONS: &[(&str, LayerOperation)] = &[
    ("info", LayerOperation::Info),
    ("flatten", LayerOperation::Flatten),
    ("merge", LayerOperation::Merge),
    ("create", LayerOperation::Create),
    ("duplicate", LayerOperation::Duplicate),
    ("delete", LayerOperation::Delete),
    ("reorder", LayerOperation::Reorder),
    ("properties", LayerOperation::Properties),
    ("rename", LayerOperation::Rename),
    ("visibility", LayerOperation::Visibility),
];

pub fn operations() -> Vec<&'static str> {
    operation_names(OPERATIONS)
}

/// Route one call. Always returns an envelope.
pub async fn dispatch(ctx: &ToolContext, params: LayerParams) -> ToolResult {
    let started = Instant::now();
    let name = params.operation.trim().to_string();
    let op = match parse_operation("layer", &name, OPERATIONS) {
        Ok(op) => op,
        Err(err) => return ToolResult::from_outcome(&name, started, Err(err)),
    };
    finish(&name, started, run(ctx, op, &name, params)).await
}

async fn run(ctx: &ToolContext, op: LayerOperation, name: &str, p: LayerParams) -> ToolOutcome<Outcome> {
    match op {
        LayerOperation::Info => info(ctx, &p).await,
        LayerOperation::Flatten => flatten(ctx, name, &p).await,
        LayerOperation::Merge if p.merge_visible.unwrap_or(false) => flatten(ctx, name, &p).await,
        LayerOperation::Merge => Err(ToolError::Unsupported("merge without merge_visible=true".to_string())),
        _ => Err(ToolError::Unsupported(format!("layer {}", name))),
    }
}

fn extension(path: &Path) -> String {
    path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_ascii_lowercase()
}

fn gif_frames(path: &Path) -> ToolOutcome<Vec<image::Frame>> {
    let decoder = GifDecoder::new(BufReader::new(File::open(path)?))?;
    Ok(decoder.into_frames().collect_frames()?)
}

/// One JSON record per layer of `path`.
fn describe_layers(path: &Path, max_bytes: u64) -> ToolOutcome<Vec<Value>> {
    match extension(path).as_str() {
        "svg" => {
            let source = std::fs::read_to_string(path)?;
            Ok(svg::find_layers(&source)
                .into_iter()
                .enumerate()
                .map(|(index, layer)| {
                    json!({ "index": index, "id": layer.id, "name": layer.label, "visible": layer.visible })
                })
                .collect())
        }
        "gif" => Ok(gif_frames(path)?
            .iter()
            .enumerate()
            .map(|(index, frame)| {
                let (numer, denom) = frame.delay().numer_denom_ms();
                json!({
                    "index": index,
                    "name": format!("Frame {}", index),
                    "size": [frame.buffer().width(), frame.buffer().height()],
                    "offset": [frame.left(), frame.top()],
                    "delay_ms": if denom == 0 { 0 } else { numer / denom },
                })
            })
            .collect()),
        "tif" | "tiff" => match tiff_pages(path, max_bytes)? {
            Some(pages) => Ok(pages),
            None => flat_layer(path, max_bytes),
        },
        _ => flat_layer(path, max_bytes),
    }
}

fn flat_layer(path: &Path, max_bytes: u64) -> ToolOutcome<Vec<Value>> {
    let image = load_image(path, max_bytes)?;
    Ok(vec![json!({
        "index": 0,
        "name": "Background",
        "size": [image.width(), image.height()],
        "mode": format!("{:?}", image.color()),
    })])
}

/// One record per page of a multi-page TIFF, sized from its directory tags.
/// `None` for single-page or unreadable files.
fn tiff_pages(path: &Path, max_bytes: u64) -> ToolOutcome<Option<Vec<Value>>> {
    let size = std::fs::metadata(path)?.len();
    if size > max_bytes {
        return Err(ToolError::invalid(format!("Input file is {} bytes, above the {} byte limit", size, max_bytes)));
    }
    let pages = match tiff_page_sizes(&std::fs::read(path)?) {
        Some(pages) if pages.len() > 1 => pages,
        _ => return Ok(None),
    };
    Ok(Some(
        pages
            .iter()
            .enumerate()
            .map(|(index, size)| {
                json!({
                    "index": index,
                    "name": format!("Page {}", index),
                    "size": size.map(|(w, h)| [w, h]),
                })
            })
            .collect(),
    ))
}

async fn info(ctx: &ToolContext, p: &LayerParams) -> ToolOutcome<Outcome> {
    let input = required_path(p.input_path.as_deref(), "input_path", "info")?;
    ensure_input_exists(&input)?;
    let max_bytes = ctx.config.filters.max_file_size_bytes();
    let source = input.clone();
    let layers = blocking(move || describe_layers(&source, max_bytes)).await?;

    Ok(Outcome::new(format!("Found {} layer(s)", layers.len()))
        .with("layer_count", layers.len())
        .with("format", extension(&input))
        .with("path", display_path(&input))
        .with("layers", &layers))
}

/// Alpha-composite every frame over an opaque white canvas.
fn composite_frames(frames: &[image::Frame]) -> Option<RgbaImage> {
    let (width, height) = frames
        .iter()
        .map(|f| (f.left() + f.buffer().width(), f.top() + f.buffer().height()))
        .fold(None, |acc: Option<(u32, u32)>, (w, h)| match acc {
            Some((aw, ah)) => Some((aw.max(w), ah.max(h))),
            None => Some((w, h)),
        })?;
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    for frame in frames {
        imageops::overlay(&mut canvas, frame.buffer(), frame.left() as i64, frame.top() as i64);
    }
    Some(canvas)
}

/// Single flat image for `path` and the number of layers merged into it.
fn flattened(path: &Path, max_bytes: u64) -> ToolOutcome<(DynamicImage, usize)> {
    if extension(path) == "gif" {
        let frames = gif_frames(path)?;
        if frames.len() > 1 {
            let canvas = composite_frames(&frames).ok_or_else(|| ToolError::invalid("GIF has no frames"))?;
            return Ok((DynamicImage::ImageRgba8(canvas), frames.len()));
        }
    }
    let image = load_image(path, max_bytes)?;
    let flat = if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    };
    Ok((flat, 1))
}

async fn flatten(ctx: &ToolContext, name: &str, p: &LayerParams) -> ToolOutcome<Outcome> {
    let input = required_path(p.input_path.as_deref(), "input_path", name)?;
    let output: PathBuf = required_path(p.output_path.as_deref(), "output_path", name)?;
    ensure_input_exists(&input)?;
    if extension(&input) == "svg" {
        return Err(ToolError::Unsupported(format!(
            "{} of SVG documents; use inkscape_vector render_preview to rasterise",
            name
        )));
    }
    check_overwrite(&output, p.overwrite.unwrap_or(false))?;

    let max_bytes = ctx.config.filters.max_file_size_bytes();
    let quality = ctx.config.filters.jpeg_quality;
    let (src, dst) = (input.clone(), output.clone());
    let (layers, size) = blocking(move || {
        let (image, layers) = flattened(&src, max_bytes)?;
        Ok((layers, save_image(&image, &dst, quality)?))
    })
    .await?;

    Ok(Outcome::new("Layers flattened successfully")
        .with("input_path", display_path(&input))
        .with("output_path", display_path(&output))
        .with("layers_merged", layers)
        .with("output_size_bytes", size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Frame};

    fn ctx() -> ToolContext {
        ToolContext::new(Config::default(), None)
    }

    fn params(op: &str, input: &Path, output: Option<&Path>) -> LayerParams {
        LayerParams {
            operation: op.to_string(),
            input_path: Some(input.display().to_string()),
            output_path: output.map(|o| o.display().to_string()),
            ..Default::default()
        }
    }

    fn write_gif(path: &Path) {
        let file = File::create(path).unwrap();
        let mut encoder = GifEncoder::new(file);
        let red = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let mut clear = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        clear.put_pixel(0, 0, Rgba([0, 0, 255, 255]));
        encoder
            .encode_frames(vec![
                Frame::from_parts(red, 0, 0, Delay::from_numer_denom_ms(100, 1)),
                Frame::from_parts(clear, 0, 0, Delay::from_numer_denom_ms(100, 1)),
            ])
            .unwrap();
    }

    #[tokio::test]
    async fn test_info_svg_layers() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("doc.svg");
        std::fs::write(
            &input,
            r#"<svg><g inkscape:groupmode="layer" id="l1" inkscape:label="Sky"/><g inkscape:groupmode="layer" id="l2" style="display:none"/></svg>"#,
        )
        .unwrap();
        let result = dispatch(&ctx(), params("info", &input, None)).await;
        assert!(result.success, "{}", result.message);
        assert_eq!(result.get("layer_count"), Some(&json!(2)));
        let layers = result.get("layers").unwrap().as_array().unwrap();
        assert_eq!(layers[0]["name"], json!("Sky"));
        assert_eq!(layers[1]["visible"], json!(false));
    }

    #[tokio::test]
    async fn test_info_flat_image_is_background() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("flat.png");
        RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255])).save(&input).unwrap();
        let result = dispatch(&ctx(), params("info", &input, None)).await;
        assert_eq!(result.get("layer_count"), Some(&json!(1)));
        assert_eq!(result.get("layers").unwrap()[0]["name"], json!("Background"));
    }

    #[tokio::test]
    async fn test_info_gif_frames() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("anim.gif");
        write_gif(&input);
        let result = dispatch(&ctx(), params("info", &input, None)).await;
        assert!(result.success, "{}", result.message);
        assert_eq!(result.get("layer_count"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_info_tiff_pages() {
        use crate::imaging::container::tests::tiff_with_sizes;

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scan.tiff");
        std::fs::write(&input, tiff_with_sizes(&[(800, 600), (400, 300), (20, 10)])).unwrap();
        let result = dispatch(&ctx(), params("info", &input, None)).await;
        assert!(result.success, "{}", result.message);
        assert_eq!(result.get("layer_count"), Some(&json!(3)));
        let layers = result.get("layers").unwrap().as_array().unwrap();
        assert_eq!(layers[1]["name"], json!("Page 1"));
        assert_eq!(layers[2]["size"], json!([20, 10]));
    }

    #[tokio::test]
    async fn test_info_single_page_tiff_is_background() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("single.tif");
        RgbaImage::from_pixel(5, 4, Rgba([1, 2, 3, 255])).save(&input).unwrap();
        let result = dispatch(&ctx(), params("info", &input, None)).await;
        assert!(result.success, "{}", result.message);
        assert_eq!(result.get("layers").unwrap()[0]["name"], json!("Background"));
        assert_eq!(result.get("layers").unwrap()[0]["size"], json!([5, 4]));
    }

    #[tokio::test]
    async fn test_flatten_gif_composites_over_first_frame() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("anim.gif");
        write_gif(&input);
        let output = dir.path().join("flat.png");
        let result = dispatch(&ctx(), params("flatten", &input, Some(&output))).await;
        assert!(result.success, "{}", result.message);
        assert_eq!(result.get("layers_merged"), Some(&json!(2)));

        let flat = image::open(&output).unwrap().to_rgba8();
        assert_eq!(flat.dimensions(), (4, 4));
        let (top_left, corner) = (flat.get_pixel(0, 0), flat.get_pixel(3, 3));
        assert!(top_left[2] > 200 && top_left[0] < 50, "{:?}", top_left);
        assert!(corner[0] > 200 && corner[2] < 50, "{:?}", corner);
    }

    #[tokio::test]
    async fn test_merge_requires_merge_visible() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("flat.png");
        RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255])).save(&input).unwrap();
        let output = dir.path().join("merged.png");

        let result = dispatch(&ctx(), params("merge", &input, Some(&output))).await;
        assert_eq!(result.error.as_deref(), Some("NotImplementedError"));

        let mut p = params("merge", &input, Some(&output));
        p.merge_visible = Some(true);
        assert!(dispatch(&ctx(), p).await.success);
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_editing_operations_are_unsupported() {
        let input = PathBuf::from("unused.png");
        for op in ["create", "duplicate", "delete", "reorder", "properties", "rename", "visibility"] {
            let result = dispatch(&ctx(), params(op, &input, None)).await;
            assert_eq!(result.error.as_deref(), Some("NotImplementedError"), "{}", op);
        }
    }
}
