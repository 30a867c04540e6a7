//! `inkscape_transform`: geometric edits on raster images.

use std::time::Instant;

use image::{DynamicImage, Rgba, RgbaImage};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::{display_path, finish, operation_names, parse_operation, required, required_path, rewrite_image, ToolContext};
use crate::envelope::{Outcome, ToolResult};
use crate::error::{ToolError, ToolOutcome};
use crate::imaging::geometry::{
    autocrop, crop, flip, parse_fill, perspective, resize_with, rotate, target_size, FlipDirection, Interpolation,
};

/// Largest width or height a resize or scale may produce.
pub const MAX_DIMENSION: u32 = 32_000;

/// Input parameters for the inkscape_transform tool.
#[derive(Debug, Default, Clone, Deserialize, JsonSchema)]
pub struct TransformParams {
    #[schemars(description = "Transform: resize, crop, rotate, flip, scale, autocrop, perspective")]
    pub operation: String,

    #[schemars(description = "Source raster image")]
    pub input_path: Option<String>,

    #[schemars(description = "Destination image; the extension selects the format")]
    pub output_path: Option<String>,

    #[schemars(description = "resize: target width in pixels")]
    pub width: Option<u32>,
    #[schemars(description = "resize: target height in pixels")]
    pub height: Option<u32>,
    #[schemars(description = "resize: fit inside width x height keeping proportions (default: true)")]
    pub maintain_aspect: Option<bool>,
    #[schemars(description = "nearest, bilinear, bicubic or lanczos (default: lanczos)")]
    pub interpolation: Option<String>,

    #[schemars(description = "crop: left edge (default: 0)")]
    pub x: Option<u32>,
    #[schemars(description = "crop: top edge (default: 0)")]
    pub y: Option<u32>,
    #[schemars(description = "crop: region width; omitted runs to the right edge")]
    pub crop_width: Option<u32>,
    #[schemars(description = "crop: region height; omitted runs to the bottom edge")]
    pub crop_height: Option<u32>,

    #[schemars(description = "rotate: degrees counter-clockwise, -360 to 360")]
    pub angle: Option<f32>,
    #[schemars(description = "rotate: transparent, white, black or #RRGGBB (default: transparent)")]
    pub fill_color: Option<String>,
    #[schemars(description = "rotate: grow the canvas to fit (default: true)")]
    pub expand_canvas: Option<bool>,

    #[schemars(description = "flip: horizontal or vertical (default: horizontal)")]
    pub direction: Option<String>,

    #[schemars(description = "scale: size multiplier, e.g. 2.0 or 0.5")]
    pub scale_factor: Option<f32>,

    #[schemars(description = "perspective: source corners [[x, y], ...] as top-left, top-right, bottom-right, bottom-left")]
    pub corners: Option<Vec<[f64; 2]>>,

    #[schemars(description = "Replace an existing output file (default: false)")]
    pub overwrite: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformOperation {
    Resize,
    Crop,
    Rotate,
    Flip,
    Scale,
    Autocrop,
    Perspective,
}

pub const OPERATIONS: &[(&str, TransformOperation)] = &[
    ("resize", TransformOperation::Resize),
    ("crop", TransformOperation::Crop),
    ("rotate", TransformOperation::Rotate),
    ("flip", TransformOperation::Flip),
    ("scale", TransformOperation::Scale),
    ("autocrop", TransformOperation::Autocrop),
    ("perspective", TransformOperation::Perspective),
];

pub fn operations() -> Vec<&'static str> {
    operation_names(OPERATIONS)
}

/// A validated transform. Size-dependent steps resolve against the decoded
/// image in [`Transform::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    Resize { width: Option<u32>, height: Option<u32>, maintain_aspect: bool, interpolation: Interpolation },
    Crop { x: u32, y: u32, width: Option<u32>, height: Option<u32> },
    Rotate { angle: f32, fill: Rgba<u8>, expand: bool, interpolation: Interpolation },
    Flip(FlipDirection),
    Scale { factor: f32, interpolation: Interpolation },
    Autocrop,
    Perspective { corners: [(f64, f64); 4], interpolation: Interpolation },
}

fn check_dimensions(width: u32, height: u32) -> ToolOutcome<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ToolError::invalid(format!(
            "Result would be {}x{}, above the {} pixel limit",
            width, height, MAX_DIMENSION
        )));
    }
    Ok(())
}

impl Transform {
    pub fn from_params(op: TransformOperation, p: &TransformParams) -> ToolOutcome<Self> {
        let interpolation = || Interpolation::parse(p.interpolation.as_deref().unwrap_or("lanczos"));
        Ok(match op {
            TransformOperation::Resize => {
                if p.width.is_none() && p.height.is_none() {
                    return Err(ToolError::invalid("resize requires width and/or height"));
                }
                if p.width == Some(0) || p.height == Some(0) {
                    return Err(ToolError::invalid("width and height must be positive"));
                }
                Transform::Resize {
                    width: p.width,
                    height: p.height,
                    maintain_aspect: p.maintain_aspect.unwrap_or(true),
                    interpolation: interpolation()?,
                }
            }
            TransformOperation::Crop => Transform::Crop {
                x: p.x.unwrap_or(0),
                y: p.y.unwrap_or(0),
                width: p.crop_width,
                height: p.crop_height,
            },
            TransformOperation::Rotate => {
                let angle = *required(p.angle.as_ref(), "angle", "rotate")?;
                if !(-360.0..=360.0).contains(&angle) {
                    return Err(ToolError::invalid(format!("angle must be between -360 and 360, got {}", angle)));
                }
                Transform::Rotate {
                    angle,
                    fill: parse_fill(p.fill_color.as_deref().unwrap_or("transparent"))?,
                    expand: p.expand_canvas.unwrap_or(true),
                    interpolation: interpolation()?,
                }
            }
            TransformOperation::Flip => Transform::Flip(FlipDirection::parse(p.direction.as_deref().unwrap_or("horizontal"))?),
            TransformOperation::Scale => {
                let factor = *required(p.scale_factor.as_ref(), "scale_factor", "scale")?;
                if !factor.is_finite() || factor <= 0.0 {
                    return Err(ToolError::invalid(format!("scale_factor must be positive, got {}", factor)));
                }
                Transform::Scale { factor, interpolation: interpolation()? }
            }
            TransformOperation::Autocrop => Transform::Autocrop,
            TransformOperation::Perspective => {
                let raw = required(p.corners.as_deref(), "corners", "perspective")?;
                let corners: [[f64; 2]; 4] = raw
                    .try_into()
                    .map_err(|_| ToolError::invalid(format!("perspective needs exactly 4 corners, got {}", raw.len())))?;
                Transform::Perspective { corners: corners.map(|[x, y]| (x, y)), interpolation: interpolation()? }
            }
        })
    }

    pub fn apply(&self, image: &DynamicImage) -> ToolOutcome<RgbaImage> {
        let rgba = image.to_rgba8();
        match self {
            Transform::Resize { width, height, maintain_aspect, interpolation } => {
                let (w, h) = target_size(rgba.dimensions(), *width, *height, *maintain_aspect)
                    .ok_or_else(|| ToolError::invalid("resize requires width and/or height"))?;
                check_dimensions(w, h)?;
                Ok(resize_with(&rgba, w, h, *interpolation))
            }
            Transform::Crop { x, y, width, height } => crop(&rgba, *x, *y, *width, *height),
            Transform::Rotate { angle, fill, expand, interpolation } => {
                Ok(rotate(&rgba, *angle, *fill, *expand, *interpolation))
            }
            Transform::Flip(direction) => Ok(flip(&rgba, *direction)),
            Transform::Scale { factor, interpolation } => {
                let w = (rgba.width() as f64 * *factor as f64) as u64;
                let h = (rgba.height() as f64 * *factor as f64) as u64;
                if w == 0 || h == 0 {
                    return Err(ToolError::invalid(format!("scale_factor {} leaves an empty image", factor)));
                }
                let (w, h) = (w.min(u32::MAX as u64) as u32, h.min(u32::MAX as u64) as u32);
                check_dimensions(w, h)?;
                Ok(resize_with(&rgba, w, h, *interpolation))
            }
            Transform::Autocrop => Ok(autocrop(&rgba, image.color().has_alpha())),
            Transform::Perspective { corners, interpolation } => perspective(&rgba, *corners, *interpolation),
        }
    }
}

/// Route one call. Always returns an envelope.
pub async fn dispatch(ctx: &ToolContext, params: TransformParams) -> ToolResult {
    let started = Instant::now();
    let name = params.operation.trim().to_string();
    let op = match parse_operation("transform", &name, OPERATIONS) {
        Ok(op) => op,
        Err(err) => return ToolResult::from_outcome(&name, started, Err(err)),
    };
    finish(&name, started, run(ctx, op, &name, params)).await
}

async fn run(ctx: &ToolContext, op: TransformOperation, name: &str, p: TransformParams) -> ToolOutcome<Outcome> {
    let input = required_path(p.input_path.as_deref(), "input_path", name)?;
    let output = required_path(p.output_path.as_deref(), "output_path", name)?;
    let transform = Transform::from_params(op, &p)?;

    let done = rewrite_image(ctx, &input, &output, p.overwrite.unwrap_or(false), move |image| transform.apply(image)).await?;

    tracing::debug!(
        operation = name,
        from = ?done.original,
        to = ?(done.width, done.height),
        "transform applied"
    );
    Ok(Outcome::new(format!("Transform '{}' completed successfully", name))
        .with("original_dimensions", json!({ "width": done.original.0, "height": done.original.1 }))
        .with("new_dimensions", json!({ "width": done.width, "height": done.height }))
        .with("transform_applied", name)
        .with("input_path", display_path(&input))
        .with("output_path", display_path(&output))
        .with("output_size_bytes", done.size))
}
