use image::{Rgba, RgbaImage};

use super::{enhance_sharpness, parse_choice};
use crate::error::ToolOutcome;
use crate::imaging::kernel::{self, clamp_u8};

/// Blur radius used by both unsharp mask and high-pass sharpening.
const SHARPEN_SIGMA: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharpenMethod {
    UnsharpMask,
    HighPass,
    Smart,
}

impl SharpenMethod {
    pub fn parse(name: &str) -> ToolOutcome<Self> {
        parse_choice(
            name,
            "sharpen method",
            &[("unsharp_mask", Self::UnsharpMask), ("high_pass", Self::HighPass), ("smart", Self::Smart)],
        )
    }
}

/// Combine each colour sample with its blurred counterpart.
fn zip_blurred<F>(image: &RgbaImage, blurred: &RgbaImage, f: F) -> RgbaImage
where
    F: Fn(f32, f32) -> f32,
{
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let o = image.get_pixel(x, y);
        let b = blurred.get_pixel(x, y);
        Rgba([
            clamp_u8(f(o[0] as f32, b[0] as f32)),
            clamp_u8(f(o[1] as f32, b[1] as f32)),
            clamp_u8(f(o[2] as f32, b[2] as f32)),
            o[3],
        ])
    })
}

/// Unsharp mask: add `percent`% of the detail where it exceeds `threshold` levels.
pub fn unsharp_mask(image: &RgbaImage, sigma: f32, percent: f32, threshold: f32) -> RgbaImage {
    let blurred = kernel::gaussian(image, sigma);
    zip_blurred(image, &blurred, |o, b| {
        let diff = o - b;
        if diff.abs() < threshold {
            o
        } else {
            o + diff * percent / 100.0
        }
    })
}

/// High-pass layer centred on 128, blended back into the original.
pub fn high_pass(image: &RgbaImage, amount: f32) -> RgbaImage {
    let blurred = kernel::gaussian(image, SHARPEN_SIGMA);
    zip_blurred(image, &blurred, |o, b| {
        let hp = (o - b + 128.0).clamp(0.0, 255.0).trunc();
        o + (hp - 128.0) * amount
    })
}

pub fn sharpen(image: &RgbaImage, method: SharpenMethod, amount: f32, threshold: f32) -> RgbaImage {
    match method {
        SharpenMethod::UnsharpMask => {
            unsharp_mask(image, SHARPEN_SIGMA, (amount * 100.0).trunc(), (threshold * 255.0).trunc())
        }
        SharpenMethod::HighPass => high_pass(image, amount),
        SharpenMethod::Smart => enhance_sharpness(image, 1.0 + amount),
    }
}
