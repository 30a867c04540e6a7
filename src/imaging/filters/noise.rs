use image::RgbaImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::parse_choice;
use crate::error::ToolOutcome;
use crate::imaging::kernel::{self, clamp_u8};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseMethod {
    Add,
    Reduce,
    Despeckle,
    Spread,
}

impl NoiseMethod {
    pub fn parse(name: &str) -> ToolOutcome<Self> {
        parse_choice(
            name,
            "noise method",
            &[("add", Self::Add), ("reduce", Self::Reduce), ("despeckle", Self::Despeckle), ("spread", Self::Spread)],
        )
    }
}

/// Standard normal sample via the Box-Muller transform.
fn standard_normal<R: Rng>(rng: &mut R) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos()
}

/// Add gaussian noise with standard deviation `amount * 128`.
///
/// Monochrome noise shares one sample across the colour channels of a pixel.
pub fn add_noise(image: &RgbaImage, amount: f32, monochrome: bool, seed: Option<u64>) -> RgbaImage {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let sigma = amount * 128.0;

    let mut output = image.clone();
    for p in output.pixels_mut() {
        if monochrome {
            let n = standard_normal(&mut rng) * sigma;
            for c in 0..3 {
                p[c] = clamp_u8(p[c] as f32 + n);
            }
        } else {
            for c in 0..3 {
                let n = standard_normal(&mut rng) * sigma;
                p[c] = clamp_u8(p[c] as f32 + n);
            }
        }
    }
    output
}

pub fn noise(image: &RgbaImage, method: NoiseMethod, amount: f32, monochrome: bool, seed: Option<u64>) -> RgbaImage {
    match method {
        NoiseMethod::Add => add_noise(image, amount, monochrome, seed),
        NoiseMethod::Reduce | NoiseMethod::Despeckle => kernel::median(image, 3),
        NoiseMethod::Spread => kernel::median(image, ((amount.max(0.0) * 10.0) as usize) | 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gray(v: u8) -> RgbaImage {
        RgbaImage::from_pixel(16, 16, Rgba([v, v, v, 255]))
    }

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let img = gray(128);
        let a = noise(&img, NoiseMethod::Add, 0.2, false, Some(7));
        let b = noise(&img, NoiseMethod::Add, 0.2, false, Some(7));
        assert_eq!(a, b);
        assert_ne!(a, img);
    }

    #[test]
    fn test_monochrome_noise_keeps_pixels_gray() {
        let out = noise(&gray(128), NoiseMethod::Add, 0.3, true, Some(1));
        for p in out.pixels() {
            assert_eq!(p[0], p[1]);
            assert_eq!(p[1], p[2]);
            assert_eq!(p[3], 255);
        }
    }

    #[test]
    fn test_zero_amount_is_identity() {
        let img = gray(40);
        assert_eq!(noise(&img, NoiseMethod::Add, 0.0, false, Some(3)), img);
    }

    #[test]
    fn test_reduce_and_spread_keep_flat_image() {
        let img = gray(90);
        assert_eq!(noise(&img, NoiseMethod::Reduce, 0.5, true, None), img);
        assert_eq!(noise(&img, NoiseMethod::Spread, 0.5, true, None), img);
    }
}
