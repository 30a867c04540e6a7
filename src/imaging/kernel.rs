//! Convolution kernels and neighbourhood primitives.
//!
//! All primitives treat the colour channels and leave alpha untouched
//! unless noted. Edges are handled by clamping sample coordinates.

use image::{GrayImage, Luma, Rgba, RgbaImage};

/// A square convolution kernel with divisor and offset.
///
/// The output sample is `sum(weight * pixel) / scale + offset`, clamped to
/// `0..=255`.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    pub size: usize,
    pub weights: Vec<f32>,
    pub scale: f32,
    pub offset: f32,
}

impl Kernel {
    /// Build a kernel whose scale is the weight sum (or 1 when the sum is zero).
    pub fn new(size: usize, weights: Vec<f32>) -> Self {
        debug_assert_eq!(weights.len(), size * size);
        let sum: f32 = weights.iter().sum();
        let scale = if sum.abs() < f32::EPSILON { 1.0 } else { sum };
        Self { size, weights, scale, offset: 0.0 }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    /// Eight-neighbour Laplacian; also used as the find-edges kernel.
    pub fn laplace() -> Self {
        Self::new(3, vec![-1.0, -1.0, -1.0, -1.0, 8.0, -1.0, -1.0, -1.0, -1.0])
    }

    /// Laplacian lifted to white, giving dark outlines on a light ground.
    pub fn contour() -> Self {
        Self::laplace().with_offset(255.0)
    }

    pub fn edge_enhance_more() -> Self {
        Self::new(3, vec![-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0])
    }

    pub fn emboss() -> Self {
        Self::new(3, vec![-1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]).with_scale(1.0).with_offset(128.0)
    }

    pub fn detail() -> Self {
        Self::new(3, vec![0.0, -1.0, 0.0, -1.0, 10.0, -1.0, 0.0, -1.0, 0.0])
    }

    pub fn smooth() -> Self {
        Self::new(3, vec![1.0, 1.0, 1.0, 1.0, 5.0, 1.0, 1.0, 1.0, 1.0])
    }

    #[rustfmt::skip]
    pub fn smooth_more() -> Self {
        Self::new(5, vec![
            1.0, 1.0, 1.0, 1.0, 1.0,
            1.0, 5.0, 5.0, 5.0, 1.0,
            1.0, 5.0, 44.0, 5.0, 1.0,
            1.0, 5.0, 5.0, 5.0, 1.0,
            1.0, 1.0, 1.0, 1.0, 1.0,
        ])
    }

    /// Weighted sum of the neighbourhood around `(x, y)`, before scale and offset.
    fn apply_at<F: Fn(u32, u32) -> f32>(&self, x: u32, y: u32, width: u32, height: u32, sample: F) -> f32 {
        let half = (self.size / 2) as i64;
        let mut acc = 0.0f32;
        for ky in 0..self.size {
            for kx in 0..self.size {
                let weight = self.weights[ky * self.size + kx];
                if weight == 0.0 {
                    continue;
                }
                let sx = (x as i64 + kx as i64 - half).clamp(0, width as i64 - 1) as u32;
                let sy = (y as i64 + ky as i64 - half).clamp(0, height as i64 - 1) as u32;
                acc += weight * sample(sx, sy);
            }
        }
        acc
    }
}

/// Round and clamp a float sample into the 8-bit range.
pub fn clamp_u8(value: f32) -> u8 {
    if value.is_nan() {
        0
    } else {
        value.round().clamp(0.0, 255.0) as u8
    }
}

/// Convolve the colour channels of an RGBA image.
pub fn convolve(image: &RgbaImage, kernel: &Kernel) -> RgbaImage {
    let (width, height) = image.dimensions();
    RgbaImage::from_fn(width, height, |x, y| {
        let mut out = [0u8; 4];
        for c in 0..3 {
            let acc = kernel.apply_at(x, y, width, height, |sx, sy| image.get_pixel(sx, sy)[c] as f32);
            out[c] = clamp_u8(acc / kernel.scale + kernel.offset);
        }
        out[3] = image.get_pixel(x, y)[3];
        Rgba(out)
    })
}

/// Convolve a greyscale image, returning unclamped float responses.
pub fn convolve_gray_f32(image: &GrayImage, kernel: &Kernel) -> Vec<f32> {
    let (width, height) = image.dimensions();
    let mut out = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let acc = kernel.apply_at(x, y, width, height, |sx, sy| image.get_pixel(sx, sy)[0] as f32);
            out.push(acc / kernel.scale + kernel.offset);
        }
    }
    out
}

/// Convolve a greyscale image with clamping.
pub fn convolve_gray(image: &GrayImage, kernel: &Kernel) -> GrayImage {
    let (width, height) = image.dimensions();
    let values = convolve_gray_f32(image, kernel);
    GrayImage::from_fn(width, height, |x, y| Luma([clamp_u8(values[(y * width + x) as usize])]))
}

/// Per-channel median over a `size`×`size` window. Even sizes are bumped to odd.
pub fn median(image: &RgbaImage, size: usize) -> RgbaImage {
    let size = size.max(1) | 1;
    if size == 1 {
        return image.clone();
    }
    let (width, height) = image.dimensions();
    let half = (size / 2) as i64;
    let mut window: Vec<u8> = Vec::with_capacity(size * size);

    let mut output = image.clone();
    for y in 0..height {
        for x in 0..width {
            let mut px = *image.get_pixel(x, y);
            for c in 0..3 {
                window.clear();
                for dy in -half..=half {
                    let sy = (y as i64 + dy).clamp(0, height as i64 - 1) as u32;
                    for dx in -half..=half {
                        let sx = (x as i64 + dx).clamp(0, width as i64 - 1) as u32;
                        window.push(image.get_pixel(sx, sy)[c]);
                    }
                }
                let mid = window.len() / 2;
                let (_, m, _) = window.select_nth_unstable(mid);
                px[c] = *m;
            }
            output.put_pixel(x, y, px);
        }
    }
    output
}

/// Separable box blur over all four channels.
pub fn box_blur(image: &RgbaImage, radius: u32) -> RgbaImage {
    if radius == 0 {
        return image.clone();
    }
    let horizontal = box_pass(image, radius, true);
    box_pass(&horizontal, radius, false)
}

fn box_pass(image: &RgbaImage, radius: u32, horizontal: bool) -> RgbaImage {
    let (width, height) = image.dimensions();
    let r = radius as i64;
    let taps = (2 * r + 1) as f32;
    RgbaImage::from_fn(width, height, |x, y| {
        let mut acc = [0f32; 4];
        for d in -r..=r {
            let (sx, sy) = if horizontal {
                ((x as i64 + d).clamp(0, width as i64 - 1) as u32, y)
            } else {
                (x, (y as i64 + d).clamp(0, height as i64 - 1) as u32)
            };
            let p = image.get_pixel(sx, sy);
            for c in 0..4 {
                acc[c] += p[c] as f32;
            }
        }
        Rgba([clamp_u8(acc[0] / taps), clamp_u8(acc[1] / taps), clamp_u8(acc[2] / taps), clamp_u8(acc[3] / taps)])
    })
}

/// Gaussian blur with standard deviation `sigma`; a no-op for `sigma <= 0`.
pub fn gaussian(image: &RgbaImage, sigma: f32) -> RgbaImage {
    if sigma <= 0.0 {
        return image.clone();
    }
    image::imageops::blur(image, sigma)
}

pub fn gaussian_gray(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return image.clone();
    }
    image::imageops::blur(image, sigma)
}

/// Expand a greyscale image to RGBA, borrowing alpha from `alpha_source`.
pub fn gray_to_rgba(gray: &GrayImage, alpha_source: &RgbaImage) -> RgbaImage {
    RgbaImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0];
        Rgba([v, v, v, alpha_source.get_pixel(x, y)[3]])
    })
}
