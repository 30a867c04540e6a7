//! Decoding and encoding raster files.

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{ColorType, DynamicImage, ImageEncoder, ImageFormat, ImageOutputFormat};

use super::filters::parse_choice;

use crate::error::{ToolError, ToolOutcome};
use crate::process::{ensure_input_exists, prepare_output};

/// Raster extensions recognised by the filter and batch tools.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp"];

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Resolve a user-facing format name (`jpg`, `png`, ...) to an [`ImageFormat`].
pub fn format_from_name(name: &str) -> ToolOutcome<ImageFormat> {
    match name.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "png" => Ok(ImageFormat::Png),
        "gif" => Ok(ImageFormat::Gif),
        "bmp" => Ok(ImageFormat::Bmp),
        "tif" | "tiff" => Ok(ImageFormat::Tiff),
        "webp" => Ok(ImageFormat::WebP),
        other => Err(ToolError::invalid(format!(
            "Unsupported image format '{}'. Valid: jpg, jpeg, png, gif, bmp, tiff, webp",
            other
        ))),
    }
}

pub fn format_for_path(path: &Path) -> ToolOutcome<ImageFormat> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    format_from_name(ext)
}

/// Whether re-encoding at a lower quality can shrink the file.
pub fn is_lossy(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::Jpeg)
}

/// Decode an image, rejecting missing or oversized inputs first.
pub fn load_image(path: &Path, max_bytes: u64) -> ToolOutcome<DynamicImage> {
    ensure_input_exists(path)?;
    let size = std::fs::metadata(path)?.len();
    if size > max_bytes {
        return Err(ToolError::invalid(format!(
            "Input file is {} bytes, above the {} byte limit",
            size, max_bytes
        )));
    }
    Ok(image::open(path)?)
}

/// Encode into memory. JPEG drops alpha and uses `quality`.
pub fn encode(image: &DynamicImage, format: ImageFormat, quality: u8) -> ToolOutcome<Vec<u8>> {
    let mut bytes = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let rgb = image.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
            encoder.encode_image(&rgb)?;
        }
        _ => {
            image.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::from(format))?;
        }
    }
    Ok(bytes)
}

/// zlib effort for PNG output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PngCompression {
    Fast,
    Default,
    Best,
}

impl PngCompression {
    pub fn parse(name: &str) -> ToolOutcome<Self> {
        parse_choice(name, "png compression", &[("fast", Self::Fast), ("default", Self::Default), ("best", Self::Best)])
    }
}

/// Encode as 8-bit PNG with the given effort, keeping alpha when present.
pub fn encode_png(image: &DynamicImage, compression: PngCompression) -> ToolOutcome<Vec<u8>> {
    let level = match compression {
        PngCompression::Fast => CompressionType::Fast,
        PngCompression::Default => CompressionType::Default,
        PngCompression::Best => CompressionType::Best,
    };
    let mut bytes = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut bytes, level, PngFilter::Adaptive);
    if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        encoder.write_image(rgba.as_raw(), rgba.width(), rgba.height(), ColorType::Rgba8)?;
    } else {
        let rgb = image.to_rgb8();
        encoder.write_image(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)?;
    }
    Ok(bytes)
}

/// Container format from the file's leading bytes, falling back to the
/// extension.
pub fn sniff_format(path: &Path) -> ToolOutcome<Option<ImageFormat>> {
    Ok(image::io::Reader::open(path)?.with_guessed_format()?.format())
}

/// Upper-case container name such as `PNG` or `JPEG`.
pub fn format_label(format: ImageFormat) -> String {
    format!("{:?}", format).to_ascii_uppercase()
}

/// Short pixel-layout name: `L`, `LA`, `RGB`, `RGBA`, with a `;16` or `;F`
/// suffix for wide samples.
pub fn mode_name(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 => "L",
        ColorType::La8 => "LA",
        ColorType::Rgb8 => "RGB",
        ColorType::Rgba8 => "RGBA",
        ColorType::L16 => "L;16",
        ColorType::La16 => "LA;16",
        ColorType::Rgb16 => "RGB;16",
        ColorType::Rgba16 => "RGBA;16",
        ColorType::Rgb32F => "RGB;F",
        ColorType::Rgba32F => "RGBA;F",
        _ => "unknown",
    }
}

/// Bits per channel sample.
pub fn bit_depth(color: ColorType) -> u16 {
    color.bits_per_pixel() / u16::from(color.channel_count().max(1))
}

/// Write an image, creating parent directories. Returns the byte count written.
pub fn save_image(image: &DynamicImage, path: &Path, quality: u8) -> ToolOutcome<u64> {
    let format = format_for_path(path)?;
    let bytes = encode(image, format, quality)?;
    prepare_output(path)?;
    std::fs::write(path, &bytes)?;
    Ok(bytes.len() as u64)
}

/// Refuse to clobber an existing output unless asked.
pub fn check_overwrite(path: &Path, overwrite: bool) -> ToolOutcome<()> {
    if path.exists() && !overwrite {
        return Err(ToolError::invalid(format!(
            "Output file exists: {} (set overwrite=true to replace it)",
            path.display()
        )));
    }
    Ok(())
}
