//! `inkscape_color`: tonal and colour adjustments on raster images.

use std::time::Instant;

use image::RgbaImage;
use schemars::JsonSchema;
use serde::Deserialize;

use super::{display_path, finish, operation_names, parse_operation, required, required_path, rewrite_image, ToolContext};
use crate::envelope::{Outcome, ToolResult};
use crate::error::{ToolError, ToolOutcome};
use crate::imaging::adjust::{self, Channel, DesaturateMode, Levels};

/// Input parameters for the inkscape_color tool.
#[derive(Debug, Default, Clone, Deserialize, JsonSchema)]
pub struct ColorParams {
    #[schemars(
        description = "Adjustment: brightness_contrast, levels, curves, color_balance, hue_saturation, colorize, threshold, posterize, desaturate, invert, auto_levels, auto_color"
    )]
    pub operation: String,

    #[schemars(description = "Source raster image")]
    pub input_path: Option<String>,

    #[schemars(description = "Destination image; the extension selects the format")]
    pub output_path: Option<String>,

    #[schemars(description = "Brightness -100 to 100 (default: 0)")]
    pub brightness: Option<f32>,
    #[schemars(description = "Contrast -100 to 100 (default: 0)")]
    pub contrast: Option<f32>,

    #[schemars(description = "Levels input black point 0-1 (default: 0)")]
    pub input_black: Option<f32>,
    #[schemars(description = "Levels input white point 0-1 (default: 1)")]
    pub input_white: Option<f32>,
    #[schemars(description = "Levels gamma 0.1-10 (default: 1)")]
    pub gamma: Option<f32>,
    #[schemars(description = "Levels output black point 0-1 (default: 0)")]
    pub output_black: Option<f32>,
    #[schemars(description = "Levels output white point 0-1 (default: 1)")]
    pub output_white: Option<f32>,
    #[schemars(description = "Channel for levels and curves: value, red, green, blue, alpha (default: value)")]
    pub channel: Option<String>,

    #[schemars(description = "Curve points as [[x, y], ...] with x and y in 0-1")]
    pub control_points: Option<Vec<[f32; 2]>>,

    #[schemars(description = "Cyan-red shift for [shadows, midtones, highlights], each -100 to 100")]
    pub cyan_red: Option<[f32; 3]>,
    #[schemars(description = "Magenta-green shift for [shadows, midtones, highlights]")]
    pub magenta_green: Option<[f32; 3]>,
    #[schemars(description = "Yellow-blue shift for [shadows, midtones, highlights]")]
    pub yellow_blue: Option<[f32; 3]>,
    #[schemars(description = "Keep luminosity constant in color_balance (default: true)")]
    pub preserve_luminosity: Option<bool>,

    #[schemars(description = "Hue rotation -180 to 180 degrees (default: 0)")]
    pub hue: Option<f32>,
    #[schemars(description = "Saturation -100 to 100 (default: 0)")]
    pub saturation: Option<f32>,
    #[schemars(description = "Lightness -100 to 100 (default: 0)")]
    pub lightness: Option<f32>,

    #[schemars(description = "Colorize hue 0-360 (default: 0)")]
    pub colorize_hue: Option<f32>,
    #[schemars(description = "Colorize saturation 0-100 (default: 50)")]
    pub colorize_saturation: Option<f32>,
    #[schemars(description = "Colorize lightness -100 to 100 (default: 0)")]
    pub colorize_lightness: Option<f32>,

    #[schemars(description = "Threshold point 0-1 (default: 0.5)")]
    pub threshold_value: Option<f32>,
    #[schemars(description = "Posterize levels per channel 2-256 (default: 4)")]
    pub posterize_levels: Option<u32>,
    #[schemars(description = "luminosity, luma, average or lightness (default: luminosity)")]
    pub desaturate_mode: Option<String>,

    #[schemars(description = "Replace an existing output file (default: false)")]
    pub overwrite: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorOperation {
    BrightnessContrast,
    Levels,
    Curves,
    ColorBalance,
    HueSaturation,
    Colorize,
    Threshold,
    Posterize,
    Desaturate,
    Invert,
    AutoLevels,
    AutoColor,
}

pub const OPERATIONS: &[(&str, ColorOperation)] = &[
    ("brightness_contrast", ColorOperation::BrightnessContrast),
    ("levels", ColorOperation::Levels),
    ("curves", ColorOperation::Curves),
    ("color_balance", ColorOperation::ColorBalance),
    ("hue_saturation", ColorOperation::HueSaturation),
    ("colorize", ColorOperation::Colorize),
    ("threshold", ColorOperation::Threshold),
    ("posterize", ColorOperation::Posterize),
    ("desaturate", ColorOperation::Desaturate),
    ("invert", ColorOperation::Invert),
    ("auto_levels", ColorOperation::AutoLevels),
    ("auto_color", ColorOperation::AutoColor),
];

pub fn operations() -> Vec<&'static str> {
    operation_names(OPERATIONS)
}

/// A validated adjustment, ready to run on pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum Adjustment {
    BrightnessContrast { brightness: f32, contrast: f32 },
    Levels { levels: Levels, channel: Channel },
    Curves { points: Vec<(f32, f32)>, channel: Channel },
    ColorBalance { cyan_red: [f32; 3], magenta_green: [f32; 3], yellow_blue: [f32; 3], preserve_luminosity: bool },
    HueSaturation { hue: f32, saturation: f32, lightness: f32 },
    Colorize { hue: f32, saturation: f32, lightness: f32 },
    Threshold(f32),
    Posterize(u32),
    Desaturate(DesaturateMode),
    Invert,
    AutoLevels,
    AutoColor,
}

fn in_range(value: f32, lo: f32, hi: f32, param: &str) -> ToolOutcome<f32> {
    if !(lo..=hi).contains(&value) {
        return Err(ToolError::invalid(format!("{} must be between {} and {}, got {}", param, lo, hi, value)));
    }
    Ok(value)
}

fn balance(axis: Option<[f32; 3]>, param: &str) -> ToolOutcome<[f32; 3]> {
    let axis = axis.unwrap_or_default();
    for v in axis {
        in_range(v, -100.0, 100.0, param)?;
    }
    Ok(axis)
}

impl Adjustment {
    /// Resolve defaults and check ranges before any file is touched.
    pub fn from_params(op: ColorOperation, p: &ColorParams) -> ToolOutcome<Self> {
        let channel = || Channel::parse(p.channel.as_deref().unwrap_or("value"));
        let percent = |v: Option<f32>, param: &str| in_range(v.unwrap_or(0.0), -100.0, 100.0, param);
        Ok(match op {
            ColorOperation::BrightnessContrast => Adjustment::BrightnessContrast {
                brightness: percent(p.brightness, "brightness")?,
                contrast: percent(p.contrast, "contrast")?,
            },
            ColorOperation::Levels => {
                let levels = Levels {
                    input_black: p.input_black.unwrap_or(0.0),
                    input_white: p.input_white.unwrap_or(1.0),
                    gamma: p.gamma.unwrap_or(1.0),
                    output_black: p.output_black.unwrap_or(0.0),
                    output_white: p.output_white.unwrap_or(1.0),
                };
                levels.validate()?;
                Adjustment::Levels { levels, channel: channel()? }
            }
            ColorOperation::Curves => {
                let raw = required(p.control_points.as_deref(), "control_points", "curves")?;
                if raw.is_empty() {
                    return Err(ToolError::invalid("control_points needs at least one point"));
                }
                let mut points = Vec::with_capacity(raw.len());
                for [x, y] in raw {
                    points.push((in_range(*x, 0.0, 1.0, "control point x")?, in_range(*y, 0.0, 1.0, "control point y")?));
                }
                Adjustment::Curves { points, channel: channel()? }
            }
            ColorOperation::ColorBalance => Adjustment::ColorBalance {
                cyan_red: balance(p.cyan_red, "cyan_red")?,
                magenta_green: balance(p.magenta_green, "magenta_green")?,
                yellow_blue: balance(p.yellow_blue, "yellow_blue")?,
                preserve_luminosity: p.preserve_luminosity.unwrap_or(true),
            },
            ColorOperation::HueSaturation => Adjustment::HueSaturation {
                hue: in_range(p.hue.unwrap_or(0.0), -180.0, 180.0, "hue")?,
                saturation: percent(p.saturation, "saturation")?,
                lightness: percent(p.lightness, "lightness")?,
            },
            ColorOperation::Colorize => Adjustment::Colorize {
                hue: in_range(p.colorize_hue.unwrap_or(0.0), 0.0, 360.0, "colorize_hue")?,
                saturation: in_range(p.colorize_saturation.unwrap_or(50.0), 0.0, 100.0, "colorize_saturation")?,
                lightness: percent(p.colorize_lightness, "colorize_lightness")?,
            },
            ColorOperation::Threshold => {
                Adjustment::Threshold(in_range(p.threshold_value.unwrap_or(0.5), 0.0, 1.0, "threshold_value")?)
            }
            ColorOperation::Posterize => {
                let levels = p.posterize_levels.unwrap_or(4);
                if !(2..=256).contains(&levels) {
                    return Err(ToolError::invalid(format!("posterize_levels must be between 2 and 256, got {}", levels)));
                }
                Adjustment::Posterize(levels)
            }
            ColorOperation::Desaturate => {
                Adjustment::Desaturate(DesaturateMode::parse(p.desaturate_mode.as_deref().unwrap_or("luminosity"))?)
            }
            ColorOperation::Invert => Adjustment::Invert,
            ColorOperation::AutoLevels => Adjustment::AutoLevels,
            ColorOperation::AutoColor => Adjustment::AutoColor,
        })
    }

    pub fn apply(&self, image: &RgbaImage) -> RgbaImage {
        match self {
            Adjustment::BrightnessContrast { brightness, contrast } => {
                adjust::brightness_contrast(image, *brightness, *contrast)
            }
            Adjustment::Levels { levels, channel } => adjust::levels(image, levels, *channel),
            Adjustment::Curves { points, channel } => adjust::curves(image, points, *channel),
            Adjustment::ColorBalance { cyan_red, magenta_green, yellow_blue, preserve_luminosity } => {
                adjust::color_balance(image, *cyan_red, *magenta_green, *yellow_blue, *preserve_luminosity)
            }
            Adjustment::HueSaturation { hue, saturation, lightness } => {
                adjust::hue_saturation(image, *hue, *saturation, *lightness)
            }
            Adjustment::Colorize { hue, saturation, lightness } => adjust::colorize(image, *hue, *saturation, *lightness),
            Adjustment::Threshold(level) => adjust::threshold(image, *level),
            Adjustment::Posterize(levels) => adjust::posterize(image, *levels),
            Adjustment::Desaturate(mode) => adjust::desaturate(image, *mode),
            Adjustment::Invert => adjust::invert(image),
            Adjustment::AutoLevels => adjust::auto_levels(image),
            Adjustment::AutoColor => adjust::auto_color(image),
        }
    }
}

/// Route one call. Always returns an envelope.
pub async fn dispatch(ctx: &ToolContext, params: ColorParams) -> ToolResult {
    let started = Instant::now();
    let name = params.operation.trim().to_string();
    let op = match parse_operation("color", &name, OPERATIONS) {
        Ok(op) => op,
        Err(err) => return ToolResult::from_outcome(&name, started, Err(err)),
    };
    finish(&name, started, run(ctx, op, &name, params)).await
}

async fn run(ctx: &ToolContext, op: ColorOperation, name: &str, p: ColorParams) -> ToolOutcome<Outcome> {
    let input = required_path(p.input_path.as_deref(), "input_path", name)?;
    let output = required_path(p.output_path.as_deref(), "output_path", name)?;
    let adjustment = Adjustment::from_params(op, &p)?;

    let done = rewrite_image(ctx, &input, &output, p.overwrite.unwrap_or(false), move |image| {
        Ok(adjustment.apply(&image.to_rgba8()))
    })
    .await?;

    tracing::debug!(operation = name, width = done.width, height = done.height, "color adjustment applied");
    Ok(Outcome::new(format!("Color adjustment '{}' applied successfully", name))
        .with("operation_applied", name)
        .with("input_path", display_path(&input))
        .with("output_path", display_path(&output))
        .with("output_size_bytes", done.size)
        .with("width", done.width)
        .with("height", done.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_resolve() {
        let p = ColorParams::default();
        assert_eq!(
            Adjustment::from_params(ColorOperation::Posterize, &p).unwrap(),
            Adjustment::Posterize(4)
        );
        assert_eq!(
            Adjustment::from_params(ColorOperation::Desaturate, &p).unwrap(),
            Adjustment::Desaturate(DesaturateMode::Luminosity)
        );
        assert_eq!(
            Adjustment::from_params(ColorOperation::Threshold, &p).unwrap(),
            Adjustment::Threshold(0.5)
        );
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let p = ColorParams { brightness: Some(150.0), ..Default::default() };
        let err = Adjustment::from_params(ColorOperation::BrightnessContrast, &p).unwrap_err();
        assert_eq!(err.tag(), "ValueError");
        assert!(err.to_string().contains("brightness"));

        let p = ColorParams { posterize_levels: Some(1), ..Default::default() };
        assert!(Adjustment::from_params(ColorOperation::Posterize, &p).is_err());

        let p = ColorParams { cyan_red: Some([0.0, 120.0, 0.0]), ..Default::default() };
        assert!(Adjustment::from_params(ColorOperation::ColorBalance, &p).is_err());
    }

    #[test]
    fn test_curves_need_points() {
        let p = ColorParams::default();
        let err = Adjustment::from_params(ColorOperation::Curves, &p).unwrap_err();
        assert!(err.to_string().contains("control_points"));

        let p = ColorParams { control_points: Some(vec![[0.0, 0.0], [1.5, 1.0]]), ..Default::default() };
        assert!(Adjustment::from_params(ColorOperation::Curves, &p).is_err());
    }

    #[test]
    fn test_unknown_channel() {
        let p = ColorParams { channel: Some("cyan".into()), ..Default::default() };
        assert_eq!(Adjustment::from_params(ColorOperation::Levels, &p).unwrap_err().tag(), "ValueError");
    }
}
