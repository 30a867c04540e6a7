use image::RgbaImage;

use super::{parse_choice, unsupported};
use crate::error::ToolOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightEffect {
    Vignette,
}

impl LightEffect {
    pub fn parse(name: &str) -> ToolOutcome<Self> {
        let lowered = name.trim().to_ascii_lowercase();
        if lowered == "lens_flare" || lowered == "drop_shadow" {
            return Err(unsupported("light effect", name));
        }
        parse_choice(name, "light effect", &[("vignette", Self::Vignette)])
    }
}

/// Fade toward the corners: `mask = clip(1 - (r / r_max)^2 * amount, 0, 1)`.
///
/// Every channel is scaled, so corners lose opacity as well as brightness.
pub fn vignette(image: &RgbaImage, amount: f32) -> RgbaImage {
    let (width, height) = image.dimensions();
    let (cx, cy) = ((width / 2) as f32, (height / 2) as f32);
    let r_max = (cx * cx + cy * cy).sqrt();

    let mut output = image.clone();
    if r_max <= 0.0 {
        return output;
    }
    for (x, y, p) in output.enumerate_pixels_mut() {
        let (dx, dy) = (x as f32 - cx, y as f32 - cy);
        let r = (dx * dx + dy * dy).sqrt();
        let mask = (1.0 - (r / r_max).powi(2) * amount).clamp(0.0, 1.0);
        for c in 0..4 {
            // Truncation matches an integer cast of the product.
            p[c] = (p[c] as f32 * mask) as u8;
        }
    }
    output
}

pub fn light_shadow(image: &RgbaImage, effect: LightEffect, amount: f32) -> RgbaImage {
    match effect {
        LightEffect::Vignette => vignette(image, amount),
    }
}
