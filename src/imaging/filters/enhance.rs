use image::{Rgba, RgbaImage};

use super::parse_choice;
use crate::error::ToolOutcome;
use crate::imaging::kernel::{self, clamp_u8, Kernel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnhanceMethod {
    Sharpen,
    Detail,
    Smooth,
}

impl EnhanceMethod {
    pub fn parse(name: &str) -> ToolOutcome<Self> {
        parse_choice(
            name,
            "enhance method",
            &[("sharpen", Self::Sharpen), ("detail", Self::Detail), ("smooth", Self::Smooth)],
        )
    }
}

/// Interpolate between a smoothed copy (factor 0) and the original (factor 1).
/// Factors above 1 extrapolate away from the smoothed copy.
pub fn enhance_sharpness(image: &RgbaImage, factor: f32) -> RgbaImage {
    let degenerate = kernel::convolve(image, &Kernel::smooth());
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let o = image.get_pixel(x, y);
        let d = degenerate.get_pixel(x, y);
        let mix = |c: usize| clamp_u8(d[c] as f32 + factor * (o[c] as f32 - d[c] as f32));
        Rgba([mix(0), mix(1), mix(2), o[3]])
    })
}

pub fn enhance(image: &RgbaImage, method: EnhanceMethod, amount: f32) -> RgbaImage {
    match method {
        EnhanceMethod::Sharpen => enhance_sharpness(image, 1.0 + amount),
        EnhanceMethod::Detail => kernel::convolve(image, &Kernel::detail()),
        EnhanceMethod::Smooth => kernel::convolve(image, &Kernel::smooth_more()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_one_is_identity() {
        let img = RgbaImage::from_fn(5, 5, |x, y| Rgba([(x * 50) as u8, (y * 50) as u8, 10, 255]));
        assert_eq!(enhance_sharpness(&img, 1.0), img);
    }

    #[test]
    fn test_smooth_flattens_speck() {
        let mut img = RgbaImage::from_pixel(7, 7, Rgba([0, 0, 0, 255]));
        img.put_pixel(3, 3, Rgba([255, 255, 255, 255]));
        let out = enhance(&img, EnhanceMethod::Smooth, 1.0);
        assert!(out.get_pixel(3, 3)[0] < 255);
        assert!(out.get_pixel(3, 2)[0] > 0);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(EnhanceMethod::parse("denoise").unwrap_err().tag(), "ValueError");
    }
}
