//! `inkscape_filter`: raster effects applied in-process.

use std::path::PathBuf;
use std::time::Instant;

use image::{DynamicImage, RgbaImage};
use schemars::JsonSchema;
use serde::Deserialize;

use super::{blocking, display_path, finish, operation_names, parse_operation, required_path, ToolContext};
use crate::envelope::{Outcome, ToolResult};
use crate::error::ToolOutcome;
use crate::imaging::filters::{
    artistic, blur, distort, edge_detect, enhance, light_shadow, noise, sharpen, ArtisticEffect, BlurMethod,
    DistortEffect, EdgeMethod, EnhanceMethod, LightEffect, NoiseMethod, SharpenMethod,
};
use crate::imaging::io::{check_overwrite, load_image, save_image};
use crate::process::ensure_input_exists;

/// Input parameters for the inkscape_filter tool.
#[derive(Debug, Default, Clone, Deserialize, JsonSchema)]
pub struct FilterParams {
    #[schemars(
        description = "Filter to apply: blur, sharpen, noise, edge_detect, artistic, enhance, distort, light_shadow"
    )]
    pub operation: String,

    #[schemars(description = "Source raster image")]
    pub input_path: Option<String>,

    #[schemars(description = "Destination image; the extension selects the format")]
    pub output_path: Option<String>,

    #[schemars(description = "gaussian, box, motion or pixelize (default: gaussian)")]
    pub blur_method: Option<String>,
    #[schemars(description = "Blur radius in pixels (default: 5)")]
    pub blur_radius: Option<f32>,
    #[schemars(description = "Motion blur direction in degrees (default: 0)")]
    pub blur_angle: Option<f32>,

    #[schemars(description = "unsharp_mask, high_pass or smart (default: unsharp_mask)")]
    pub sharpen_method: Option<String>,
    #[schemars(description = "Sharpen strength (default: 1.0)")]
    pub sharpen_amount: Option<f32>,
    #[schemars(description = "Unsharp mask threshold 0-1 (default: 0)")]
    pub sharpen_threshold: Option<f32>,

    #[schemars(description = "add, reduce, despeckle or spread (default: add)")]
    pub noise_method: Option<String>,
    #[schemars(description = "Noise strength 0-1 (default: 0.1)")]
    pub noise_amount: Option<f32>,
    #[schemars(description = "Share one noise field across channels (default: true)")]
    pub noise_monochrome: Option<bool>,
    #[schemars(description = "Seed for reproducible noise")]
    pub noise_seed: Option<u64>,

    #[schemars(description = "sobel, prewitt, laplace, canny or neon (default: sobel)")]
    pub edge_method: Option<String>,
    #[schemars(description = "Edge response multiplier (default: 1.0)")]
    pub edge_amount: Option<f32>,
    #[schemars(description = "Dark edges on a light background (default: false)")]
    pub edge_invert: Option<bool>,

    #[schemars(description = "oilify, cartoon, pencil or emboss (default: oilify)")]
    pub artistic_effect: Option<String>,
    #[schemars(description = "Brush or blur size (default: 8)")]
    pub artistic_size: Option<u32>,
    #[schemars(description = "Effect intensity 0-1 (default: 0.5)")]
    pub artistic_intensity: Option<f32>,

    #[schemars(description = "sharpen, detail or smooth (default: sharpen)")]
    pub enhance_method: Option<String>,
    #[schemars(description = "Enhancement strength (default: 1.0)")]
    pub enhance_amount: Option<f32>,

    #[schemars(description = "ripple, wave or twirl (default: ripple)")]
    pub distort_effect: Option<String>,
    #[schemars(description = "Displacement amplitude (default: 10)")]
    pub distort_amplitude: Option<f32>,
    #[schemars(description = "Displacement wavelength (default: 20)")]
    pub distort_wavelength: Option<f32>,

    #[schemars(description = "vignette (default: vignette)")]
    pub light_effect: Option<String>,
    #[schemars(description = "Effect strength (default: 0.5)")]
    pub light_amount: Option<f32>,

    #[schemars(description = "Replace an existing output file (default: false)")]
    pub overwrite: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperation {
    Blur,
    Sharpen,
    Noise,
    EdgeDetect,
    Artistic,
    Enhance,
    Distort,
    LightShadow,
}

pub const OPERATIONS: &[(&str, FilterOperation)] = &[
    ("blur", FilterOperation::Blur),
    ("sharpen", FilterOperation::Sharpen),
    ("noise", FilterOperation::Noise),
    ("edge_detect", FilterOperation::EdgeDetect),
    ("artistic", FilterOperation::Artistic),
    ("enhance", FilterOperation::Enhance),
    ("distort", FilterOperation::Distort),
    ("light_shadow", FilterOperation::LightShadow),
];

pub fn operations() -> Vec<&'static str> {
    operation_names(OPERATIONS)
}

/// A fully parsed filter, ready to run on pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterPlan {
    Blur { method: BlurMethod, radius: f32, angle: f32 },
    Sharpen { method: SharpenMethod, amount: f32, threshold: f32 },
    Noise { method: NoiseMethod, amount: f32, monochrome: bool, seed: Option<u64> },
    Edge { method: EdgeMethod, amount: f32, invert: bool },
    Artistic { effect: ArtisticEffect, size: u32, intensity: f32 },
    Enhance { method: EnhanceMethod, amount: f32 },
    Distort { effect: DistortEffect, amplitude: f32, wavelength: f32 },
    Light { effect: LightEffect, amount: f32 },
}

impl FilterPlan {
    /// Resolve sub-method names and defaults. Unknown names fail here,
    /// before any file is touched.
    pub fn from_params(op: FilterOperation, p: &FilterParams) -> ToolOutcome<Self> {
        let name = |v: &Option<String>, default: &'static str| v.clone().unwrap_or_else(|| default.to_string());
        Ok(match op {
            FilterOperation::Blur => FilterPlan::Blur {
                method: BlurMethod::parse(&name(&p.blur_method, "gaussian"))?,
                radius: p.blur_radius.unwrap_or(5.0),
                angle: p.blur_angle.unwrap_or(0.0),
            },
            FilterOperation::Sharpen => FilterPlan::Sharpen {
                method: SharpenMethod::parse(&name(&p.sharpen_method, "unsharp_mask"))?,
                amount: p.sharpen_amount.unwrap_or(1.0),
                threshold: p.sharpen_threshold.unwrap_or(0.0),
            },
            FilterOperation::Noise => FilterPlan::Noise {
                method: NoiseMethod::parse(&name(&p.noise_method, "add"))?,
                amount: p.noise_amount.unwrap_or(0.1),
                monochrome: p.noise_monochrome.unwrap_or(true),
                seed: p.noise_seed,
            },
            FilterOperation::EdgeDetect => FilterPlan::Edge {
                method: EdgeMethod::parse(&name(&p.edge_method, "sobel"))?,
                amount: p.edge_amount.unwrap_or(1.0),
                invert: p.edge_invert.unwrap_or(false),
            },
            FilterOperation::Artistic => FilterPlan::Artistic {
                effect: ArtisticEffect::parse(&name(&p.artistic_effect, "oilify"))?,
                size: p.artistic_size.unwrap_or(8).max(1),
                intensity: p.artistic_intensity.unwrap_or(0.5),
            },
            FilterOperation::Enhance => FilterPlan::Enhance {
                method: EnhanceMethod::parse(&name(&p.enhance_method, "sharpen"))?,
                amount: p.enhance_amount.unwrap_or(1.0),
            },
            FilterOperation::Distort => FilterPlan::Distort {
                effect: DistortEffect::parse(&name(&p.distort_effect, "ripple"))?,
                amplitude: p.distort_amplitude.unwrap_or(10.0),
                wavelength: p.distort_wavelength.unwrap_or(20.0),
            },
            FilterOperation::LightShadow => FilterPlan::Light {
                effect: LightEffect::parse(&name(&p.light_effect, "vignette"))?,
                amount: p.light_amount.unwrap_or(0.5),
            },
        })
    }

    /// Sub-method name as reported in the envelope.
    pub fn method_name(&self) -> String {
        let debug = match self {
            FilterPlan::Blur { method, .. } => format!("{:?}", method),
            FilterPlan::Sharpen { method, .. } => format!("{:?}", method),
            FilterPlan::Noise { method, .. } => format!("{:?}", method),
            FilterPlan::Edge { method, .. } => format!("{:?}", method),
            FilterPlan::Artistic { effect, .. } => format!("{:?}", effect),
            FilterPlan::Enhance { method, .. } => format!("{:?}", method),
            FilterPlan::Distort { effect, .. } => format!("{:?}", effect),
            FilterPlan::Light { effect, .. } => format!("{:?}", effect),
        };
        snake_case(&debug)
    }

    pub fn apply(&self, image: &RgbaImage) -> RgbaImage {
        match *self {
            FilterPlan::Blur { method, radius, angle } => blur(image, method, radius, angle),
            FilterPlan::Sharpen { method, amount, threshold } => sharpen(image, method, amount, threshold),
            FilterPlan::Noise { method, amount, monochrome, seed } => noise(image, method, amount, monochrome, seed),
            FilterPlan::Edge { method, amount, invert } => edge_detect(image, method, amount, invert),
            FilterPlan::Artistic { effect, size, intensity } => artistic(image, effect, size, intensity),
            FilterPlan::Enhance { method, amount } => enhance(image, method, amount),
            FilterPlan::Distort { effect, amplitude, wavelength } => distort(image, effect, amplitude, wavelength),
            FilterPlan::Light { effect, amount } => light_shadow(image, effect, amount),
        }
    }
}

fn snake_case(camel: &str) -> String {
    let mut out = String::with_capacity(camel.len() + 4);
    for (i, c) in camel.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Route one call. Always returns an envelope.
pub async fn dispatch(ctx: &ToolContext, params: FilterParams) -> ToolResult {
    let started = Instant::now();
    let name = params.operation.trim().to_string();
    let op = match parse_operation("filter", &name, OPERATIONS) {
        Ok(op) => op,
        Err(err) => return ToolResult::from_outcome(&name, started, Err(err)),
    };
    finish(&name, started, run(ctx, op, &name, params)).await
}

async fn run(ctx: &ToolContext, op: FilterOperation, name: &str, p: FilterParams) -> ToolOutcome<Outcome> {
    let input: PathBuf = required_path(p.input_path.as_deref(), "input_path", name)?;
    let output: PathBuf = required_path(p.output_path.as_deref(), "output_path", name)?;
    let plan = FilterPlan::from_params(op, &p)?;
    ensure_input_exists(&input)?;
    check_overwrite(&output, p.overwrite.unwrap_or(false))?;

    let max_bytes = ctx.config.filters.max_file_size_bytes();
    let quality = ctx.config.filters.jpeg_quality;
    let (src, dst) = (input.clone(), output.clone());
    let (width, height, size) = blocking(move || {
        // Palette and greyscale sources are widened to RGBA here.
        let rgba = load_image(&src, max_bytes)?.to_rgba8();
        let result = plan.apply(&rgba);
        let (width, height) = result.dimensions();
        let size = save_image(&DynamicImage::ImageRgba8(result), &dst, quality)?;
        Ok((width, height, size))
    })
    .await?;

    let method = plan.method_name();
    tracing::debug!(filter = name, method = %method, width, height, "filter applied");
    Ok(Outcome::new(format!("Filter '{}' applied successfully", name))
        .with("filter_type", name)
        .with("method", &method)
        .with("input_path", display_path(&input))
        .with("output_path", display_path(&output))
        .with("output_size_bytes", size)
        .with("width", width)
        .with("height", height))
}
