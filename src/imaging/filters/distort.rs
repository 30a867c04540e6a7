use std::f32::consts::PI;

use image::RgbaImage;

use super::parse_choice;
use crate::error::ToolOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistortEffect {
    Ripple,
    Wave,
    Twirl,
}

impl DistortEffect {
    pub fn parse(name: &str) -> ToolOutcome<Self> {
        parse_choice(name, "distort effect", &[("ripple", Self::Ripple), ("wave", Self::Wave), ("twirl", Self::Twirl)])
    }
}

/// Integer displacement `(dx, dy)` for output pixel `(x, y)`.
fn displacement(effect: DistortEffect, x: f32, y: f32, center: (f32, f32), amplitude: f32, wavelength: f32) -> (i64, i64) {
    match effect {
        DistortEffect::Ripple => (
            (amplitude * (2.0 * PI * y / wavelength).sin()) as i64,
            (amplitude * (2.0 * PI * x / wavelength).sin()) as i64,
        ),
        DistortEffect::Wave => ((amplitude * (2.0 * PI * y / wavelength).sin()) as i64, 0),
        DistortEffect::Twirl => {
            let (cx, cy) = center;
            let (rx, ry) = (x - cx, y - cy);
            let r = (rx * rx + ry * ry).sqrt();
            let (sin, cos) = (amplitude * r / wavelength * PI / 180.0).sin_cos();
            ((rx * cos - ry * sin + cx - x) as i64, (rx * sin + ry * cos + cy - y) as i64)
        }
    }
}

/// Remap every output pixel to a displaced source pixel, clamped to the
/// image bounds. Nearest sample, no interpolation.
pub fn distort(image: &RgbaImage, effect: DistortEffect, amplitude: f32, wavelength: f32) -> RgbaImage {
    let (width, height) = image.dimensions();
    let wavelength = if wavelength.abs() < f32::EPSILON { 1.0 } else { wavelength };
    let center = ((width / 2) as f32, (height / 2) as f32);

    RgbaImage::from_fn(width, height, |x, y| {
        let (dx, dy) = displacement(effect, x as f32, y as f32, center, amplitude, wavelength);
        let sx = (x as i64 + dx).clamp(0, width as i64 - 1) as u32;
        let sy = (y as i64 + dy).clamp(0, height as i64 - 1) as u32;
        *image.get_pixel(sx, sy)
    })
}
