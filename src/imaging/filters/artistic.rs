use image::imageops;
use image::{GrayImage, Luma, Rgba, RgbaImage};

use super::{parse_choice, unsupported};
use crate::error::ToolOutcome;
use crate::imaging::kernel::{self, Kernel};
use crate::imaging::quantize::quantize;

/// Palette size of the flat-colour base used by the cartoon effect.
const CARTOON_COLORS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtisticEffect {
    Oilify,
    Cartoon,
    Pencil,
    Emboss,
}

impl ArtisticEffect {
    pub fn parse(name: &str) -> ToolOutcome<Self> {
        if name.eq_ignore_ascii_case("watercolor") {
            return Err(unsupported("artistic effect", name));
        }
        parse_choice(
            name,
            "artistic effect",
            &[("oilify", Self::Oilify), ("cartoon", Self::Cartoon), ("pencil", Self::Pencil), ("emboss", Self::Emboss)],
        )
    }
}

/// Darken a quantized copy wherever the edge map is bright.
fn cartoon(image: &RgbaImage, intensity: f32) -> RgbaImage {
    let edges = kernel::convolve_gray(&imageops::grayscale(image), &Kernel::laplace());
    let base = quantize(image, CARTOON_COLORS);
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let q = base.get_pixel(x, y);
        let weight = 1.0 - edges.get_pixel(x, y)[0] as f32 / 255.0 * intensity;
        // Truncate like an integer cast after the multiply.
        let shade = |c: usize| (q[c] as f32 * weight).clamp(0.0, 255.0) as u8;
        Rgba([shade(0), shade(1), shade(2), q[3]])
    })
}

/// Colour-dodge the greyscale image with its own blur.
fn pencil(image: &RgbaImage, size: u32) -> RgbaImage {
    let gray = imageops::grayscale(image);
    let blurred = kernel::gaussian_gray(&gray, size as f32);
    let sketch = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let g = gray.get_pixel(x, y)[0] as f32;
        let b = blurred.get_pixel(x, y)[0] as f32;
        Luma([(g / (256.0 - b + 1.0) * 256.0).clamp(0.0, 255.0) as u8])
    });
    kernel::gray_to_rgba(&sketch, image)
}

pub fn artistic(image: &RgbaImage, effect: ArtisticEffect, size: u32, intensity: f32) -> RgbaImage {
    match effect {
        ArtisticEffect::Oilify => kernel::median(image, size as usize | 1),
        ArtisticEffect::Cartoon => cartoon(image, intensity.clamp(0.0, 1.0)),
        ArtisticEffect::Pencil => pencil(image, size),
        ArtisticEffect::Emboss => kernel::convolve(image, &Kernel::emboss()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RgbaImage {
        RgbaImage::from_fn(12, 12, |x, y| Rgba([(x * 20) as u8, (y * 20) as u8, ((x + y) * 10) as u8, 255]))
    }

    #[test]
    fn test_watercolor_is_unsupported() {
        assert_eq!(ArtisticEffect::parse("watercolor").unwrap_err().tag(), "NotImplementedError");
        assert_eq!(ArtisticEffect::parse("mosaic").unwrap_err().tag(), "ValueError");
    }

    #[test]
    fn test_emboss_flat_is_mid_gray() {
        let flat = RgbaImage::from_pixel(5, 5, Rgba([200, 10, 90, 255]));
        let out = artistic(&flat, ArtisticEffect::Emboss, 8, 0.5);
        assert!(out.pixels().all(|p| p[0] == 128 && p[1] == 128 && p[2] == 128));
    }

    #[test]
    fn test_cartoon_uses_few_colors_without_edges() {
        let out = artistic(&sample(), ArtisticEffect::Cartoon, 8, 0.0);
        let distinct: std::collections::HashSet<[u8; 3]> = out.pixels().map(|p| [p[0], p[1], p[2]]).collect();
        assert!(distinct.len() <= CARTOON_COLORS);
    }

    #[test]
    fn test_pencil_flat_is_near_white() {
        let flat = RgbaImage::from_pixel(6, 6, Rgba([180, 180, 180, 255]));
        let out = artistic(&flat, ArtisticEffect::Pencil, 3, 0.5);
        // 180 / 77 * 256 saturates.
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_all_effects_keep_dimensions() {
        let img = sample();
        for effect in [ArtisticEffect::Oilify, ArtisticEffect::Cartoon, ArtisticEffect::Pencil, ArtisticEffect::Emboss] {
            assert_eq!(artistic(&img, effect, 4, 0.5).dimensions(), (12, 12));
        }
    }
}
