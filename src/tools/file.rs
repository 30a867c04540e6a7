//! `inkscape_file`: open, re-encode and check raster files.

use std::path::{Path, PathBuf};
use std::time::Instant;

use image::{DynamicImage, ImageFormat};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{blocking, display_path, file_size, finish, operation_names, parse_operation, required_path, ToolContext};
use crate::envelope::{Outcome, ToolResult};
use crate::error::{ToolError, ToolOutcome};
use crate::imaging::container::{exif_block, exif_fields, tiff_page_count};
use crate::imaging::io::{
    bit_depth, check_overwrite, encode, encode_png, format_from_name, format_label, load_image, mode_name,
    sniff_format, PngCompression,
};
use crate::process::{ensure_input_exists, prepare_output};

/// Images wider or taller than this get a warning from `validate`.
const LARGE_DIMENSION: u32 = 32_000;

/// Input parameters for the inkscape_file tool.
#[derive(Debug, Default, Clone, Deserialize, JsonSchema)]
pub struct FileParams {
    #[schemars(description = "File operation: load, save, convert, info, validate, list_formats")]
    pub operation: String,

    #[schemars(description = "Source image (all operations except list_formats)")]
    pub input_path: Option<String>,

    #[schemars(description = "Destination for save and convert; convert defaults to the input path with the new extension")]
    pub output_path: Option<String>,

    #[schemars(description = "Output format: jpg, png, gif, bmp, tiff, webp (default: from output_path)")]
    pub format: Option<String>,

    #[schemars(description = "JPEG quality 1-100 (default: 95)")]
    pub quality: Option<u8>,

    #[schemars(description = "load: include EXIF fields (default: true)")]
    pub metadata: Option<bool>,

    #[schemars(description = "PNG compression: fast, default or best (default: best)")]
    pub compression: Option<String>,

    #[schemars(description = "Replace an existing output file (default: false)")]
    pub overwrite: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Load,
    Save,
    Convert,
    Info,
    Validate,
    ListFormats,
}

pub const OPERATIONS: &[(&str, FileOperation)] = &[
    ("load", FileOperation::Load),
    ("save", FileOperation::Save),
    ("convert", FileOperation::Convert),
    ("info", FileOperation::Info),
    ("validate", FileOperation::Validate),
    ("list_formats", FileOperation::ListFormats),
];

pub fn operations() -> Vec<&'static str> {
    operation_names(OPERATIONS)
}

/// Extensions decoded by the raster tools.
pub const READ_FORMATS: &[&str] = &["bmp", "gif", "ico", "jpeg", "jpg", "pbm", "pgm", "png", "ppm", "tga", "tif", "tiff", "webp"];

/// Vector formats handled through Inkscape rather than in-process.
pub const VECTOR_FORMATS: &[&str] = &["svg", "pdf", "eps", "ps", "emf", "wmf", "dxf"];

/// Route one call. Always returns an envelope.
pub async fn dispatch(ctx: &ToolContext, params: FileParams) -> ToolResult {
    let started = Instant::now();
    let name = params.operation.trim().to_string();
    let op = match parse_operation("file", &name, OPERATIONS) {
        Ok(op) => op,
        Err(err) => return ToolResult::from_outcome(&name, started, Err(err)),
    };
    finish(&name, started, run(ctx, op, &name, params)).await
}

async fn run(ctx: &ToolContext, op: FileOperation, name: &str, p: FileParams) -> ToolOutcome<Outcome> {
    if op == FileOperation::ListFormats {
        return Ok(list_formats());
    }
    let input = required_path(p.input_path.as_deref(), "input_path", name)?;
    ensure_input_exists(&input)?;
    let max_bytes = ctx.config.filters.max_file_size_bytes();

    match op {
        FileOperation::Load => load(input, max_bytes, p.metadata.unwrap_or(true)).await,
        FileOperation::Info => load(input, max_bytes, true).await,
        FileOperation::Validate => validate(input, max_bytes).await,
        _ => {
            let output = match (op, p.output_path.as_deref()) {
                (_, Some(path)) if !path.trim().is_empty() => PathBuf::from(path),
                (FileOperation::Convert, _) => {
                    let format = p.format.as_deref().ok_or_else(|| {
                        ToolError::invalid("Either output_path or format must be given for convert")
                    })?;
                    input.with_extension(format.trim_start_matches('.').to_ascii_lowercase())
                }
                _ => return Err(ToolError::missing("output_path", name)),
            };
            save(ctx, name, &input, &output, &p).await
        }
    }
}

fn list_formats() -> Outcome {
    let write = ["bmp", "gif", "jpeg", "jpg", "png", "tif", "tiff", "webp"];
    Outcome::new(format!(
        "{} read and {} write formats available for raster files",
        READ_FORMATS.len(),
        write.len()
    ))
    .with("read_formats", READ_FORMATS)
    .with("write_formats", write)
    .with("vector_formats", VECTOR_FORMATS)
    .with("recommended", json!({
        "lossless": ["png", "tiff", "webp"],
        "lossy": ["jpg"],
        "web": ["png", "jpg", "webp", "gif"],
    }))
}

/// Dimensions, layout and (optionally) EXIF of one image.
fn describe(path: &Path, image: &DynamicImage, include_metadata: bool) -> ToolOutcome<Value> {
    let size = file_size(path);
    let format = sniff_format(path)?.map(format_label).unwrap_or_else(|| {
        path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_ascii_uppercase()
    });
    let color = image.color();
    let mut data = json!({
        "width": image.width(),
        "height": image.height(),
        "format": format,
        "color_mode": mode_name(color),
        "has_alpha": color.has_alpha(),
        "bit_depth": bit_depth(color),
        "file_size_bytes": size,
        "file_size_mb": (size as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0,
        "path": display_path(path),
    });
    if include_metadata {
        let bytes = std::fs::read(path)?;
        data["metadata"] = json!(exif_block(&bytes).map(exif_fields).unwrap_or_default());
        if let Some(pages) = tiff_page_count(&bytes) {
            data["pages"] = json!(pages);
        }
    }
    Ok(data)
}

async fn load(input: PathBuf, max_bytes: u64, include_metadata: bool) -> ToolOutcome<Outcome> {
    let data = blocking(move || {
        let image = load_image(&input, max_bytes)?;
        describe(&input, &image, include_metadata)
    })
    .await?;
    let message = format!("Loaded {}x{} {} image", data["width"], data["height"], data["format"].as_str().unwrap_or(""));
    let mut outcome = Outcome::new(message);
    if let Value::Object(map) = data {
        for (key, value) in map {
            outcome = outcome.with(&key, value);
        }
    }
    Ok(outcome)
}

/// Encoder settings for one save.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SaveSettings {
    format: ImageFormat,
    quality: u8,
    compression: PngCompression,
}

fn save_settings(output: &Path, p: &FileParams) -> ToolOutcome<SaveSettings> {
    let format = match p.format.as_deref() {
        Some(name) => format_from_name(name)?,
        None => {
            let ext = output.extension().and_then(|e| e.to_str()).unwrap_or_default();
            format_from_name(ext)?
        }
    };
    let quality = p.quality.unwrap_or(95);
    if !(1..=100).contains(&quality) {
        return Err(ToolError::invalid(format!("quality must be between 1 and 100, got {}", quality)));
    }
    let compression = match p.compression.as_deref() {
        None => PngCompression::Best,
        Some(name) if format == ImageFormat::Png => PngCompression::parse(name)?,
        Some(name) => {
            return Err(ToolError::Unsupported(format!("{} compression for {}", name, format_label(format))))
        }
    };
    Ok(SaveSettings { format, quality, compression })
}

async fn save(ctx: &ToolContext, name: &str, input: &Path, output: &Path, p: &FileParams) -> ToolOutcome<Outcome> {
    let settings = save_settings(output, p)?;
    check_overwrite(output, p.overwrite.unwrap_or(false))?;
    let max_bytes = ctx.config.filters.max_file_size_bytes();

    let (src, dst) = (input.to_path_buf(), output.to_path_buf());
    let written = blocking(move || {
        let image = load_image(&src, max_bytes)?;
        let bytes = match settings.format {
            ImageFormat::Png => encode_png(&image, settings.compression)?,
            format => encode(&image, format, settings.quality)?,
        };
        prepare_output(&dst)?;
        std::fs::write(&dst, &bytes)?;
        Ok(bytes.len() as u64)
    })
    .await?;

    let input_size = file_size(input);
    let ratio = if input_size > 0 { (written as f64 / input_size as f64 * 1000.0).round() / 1000.0 } else { 1.0 };
    tracing::debug!(operation = name, format = ?settings.format, written, "image saved");
    Ok(Outcome::new(format!("Saved to {}", output.display()))
        .with("input_path", display_path(input))
        .with("output_path", display_path(output))
        .with("format", format_label(settings.format).to_ascii_lowercase())
        .with("quality", settings.quality)
        .with("input_size_bytes", input_size)
        .with("output_size_bytes", written)
        .with("compression_ratio", ratio))
}

/// Decode fully and report structural problems. Undecodable files answer
/// `success: false` with `valid: false` rather than an error.
async fn validate(input: PathBuf, max_bytes: u64) -> ToolOutcome<Outcome> {
    let path = display_path(&input);
    let size = file_size(&input);
    let decoded = blocking(move || load_image(&input, max_bytes)).await;

    let image = match decoded {
        Ok(image) => image,
        Err(err @ ToolError::Validation(_)) => return Err(err),
        Err(err) => {
            return Ok(Outcome::new(format!("Validation failed: {}", err))
                .with("valid", false)
                .with("issues", [err.to_string()])
                .with("warnings", Vec::<String>::new())
                .with("path", path)
                .with_success(false))
        }
    };

    let mut issues = Vec::new();
    let mut warnings = Vec::new();
    let (w, h) = (image.width(), image.height());
    if w == 0 || h == 0 {
        issues.push("Image has zero dimensions".to_string());
    }
    if w > LARGE_DIMENSION || h > LARGE_DIMENSION {
        warnings.push(format!("Very large image: {}x{}", w, h));
    }
    if size == 0 {
        issues.push("File is empty".to_string());
    }
    let expected = w as u64 * h as u64 * u64::from(image.color().channel_count());
    if (size as f64) < expected as f64 * 0.1 {
        warnings.push("File may be truncated or heavily compressed".to_string());
    }

    let valid = issues.is_empty();
    let message = if valid { "Image is valid".to_string() } else { format!("Image has {} issue(s)", issues.len()) };
    Ok(Outcome::new(message)
        .with("valid", valid)
        .with("issues", issues)
        .with("warnings", warnings)
        .with("width", w)
        .with("height", h)
        .with("path", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_settings_follow_extension() {
        let p = FileParams::default();
        let s = save_settings(Path::new("out.JPG"), &p).unwrap();
        assert_eq!((s.format, s.quality), (ImageFormat::Jpeg, 95));

        let p = FileParams { format: Some("png".into()), compression: Some("fast".into()), ..Default::default() };
        let s = save_settings(Path::new("out.bin"), &p).unwrap();
        assert_eq!((s.format, s.compression), (ImageFormat::Png, PngCompression::Fast));
    }

    #[test]
    fn test_save_settings_reject_bad_values() {
        let p = FileParams { quality: Some(0), ..Default::default() };
        assert_eq!(save_settings(Path::new("a.jpg"), &p).unwrap_err().tag(), "ValueError");

        let p = FileParams { compression: Some("lzw".into()), ..Default::default() };
        assert_eq!(save_settings(Path::new("a.tiff"), &p).unwrap_err().tag(), "NotImplementedError");

        assert!(save_settings(Path::new("a.xcf"), &FileParams::default()).is_err());
    }

    #[test]
    fn test_list_formats() {
        let out = list_formats();
        assert!(out.data["read_formats"].as_array().unwrap().contains(&json!("png")));
        assert!(out.data["vector_formats"].as_array().unwrap().contains(&json!("svg")));
    }
}
