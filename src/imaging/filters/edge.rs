use image::imageops;
use image::{GrayImage, Luma, RgbaImage};

use super::parse_choice;
use crate::error::ToolOutcome;
use crate::imaging::kernel::{clamp_u8, convolve_gray_f32, gray_to_rgba, Kernel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMethod {
    Sobel,
    Prewitt,
    Laplace,
    Canny,
    Neon,
}

impl EdgeMethod {
    pub fn parse(name: &str) -> ToolOutcome<Self> {
        parse_choice(
            name,
            "edge method",
            &[
                ("sobel", Self::Sobel),
                ("prewitt", Self::Prewitt),
                ("laplace", Self::Laplace),
                ("canny", Self::Canny),
                ("neon", Self::Neon),
            ],
        )
    }
}

fn gradient_pair(method: EdgeMethod) -> (Kernel, Kernel) {
    let side = if method == EdgeMethod::Sobel { 2.0 } else { 1.0 };
    let gx = vec![-1.0, 0.0, 1.0, -side, 0.0, side, -1.0, 0.0, 1.0];
    let gy = vec![-1.0, -side, -1.0, 0.0, 0.0, 0.0, 1.0, side, 1.0];
    (Kernel::new(3, gx).with_scale(1.0), Kernel::new(3, gy).with_scale(1.0))
}

/// Raw (unclamped) edge response per pixel.
fn response(gray: &GrayImage, method: EdgeMethod) -> Vec<f32> {
    match method {
        EdgeMethod::Sobel | EdgeMethod::Prewitt => {
            let (kx, ky) = gradient_pair(method);
            let gx = convolve_gray_f32(gray, &kx);
            let gy = convolve_gray_f32(gray, &ky);
            gx.iter().zip(&gy).map(|(x, y)| (x * x + y * y).sqrt()).collect()
        }
        EdgeMethod::Laplace => convolve_gray_f32(gray, &Kernel::laplace()),
        EdgeMethod::Canny => convolve_gray_f32(gray, &Kernel::edge_enhance_more()),
        EdgeMethod::Neon => convolve_gray_f32(gray, &Kernel::contour()),
    }
}

/// Edge map of the greyscale image, scaled by `amount`, as an RGB-looking RGBA image.
pub fn edge_detect(image: &RgbaImage, method: EdgeMethod, amount: f32, invert: bool) -> RgbaImage {
    let gray = imageops::grayscale(image);
    let (width, height) = gray.dimensions();
    let values = response(&gray, method);

    let edges = GrayImage::from_fn(width, height, |x, y| {
        let v = clamp_u8(values[(y * width + x) as usize].clamp(0.0, 255.0) * amount);
        Luma([if invert { 255 - v } else { v }])
    });
    gray_to_rgba(&edges, image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn vertical_edge() -> RgbaImage {
        RgbaImage::from_fn(8, 8, |x, _| if x < 4 { Rgba([0, 0, 0, 255]) } else { Rgba([255, 255, 255, 255]) })
    }

    #[test]
    fn test_sobel_finds_vertical_edge() {
        let out = edge_detect(&vertical_edge(), EdgeMethod::Sobel, 1.0, false);
        assert_eq!(out.get_pixel(0, 4)[0], 0);
        assert_eq!(out.get_pixel(4, 4)[0], 255);
    }

    #[test]
    fn test_invert_flips_background() {
        let out = edge_detect(&vertical_edge(), EdgeMethod::Prewitt, 1.0, true);
        assert_eq!(out.get_pixel(0, 4)[0], 255);
    }

    #[test]
    fn test_output_is_gray() {
        let img = RgbaImage::from_fn(6, 6, |x, y| Rgba([(x * 40) as u8, (y * 40) as u8, 200, 255]));
        for method in [EdgeMethod::Sobel, EdgeMethod::Prewitt, EdgeMethod::Laplace, EdgeMethod::Canny, EdgeMethod::Neon] {
            let out = edge_detect(&img, method, 1.5, false);
            assert_eq!(out.dimensions(), (6, 6));
            assert!(out.pixels().all(|p| p[0] == p[1] && p[1] == p[2]));
        }
    }

    #[test]
    fn test_neon_on_flat_is_white() {
        let flat = RgbaImage::from_pixel(4, 4, Rgba([70, 70, 70, 255]));
        let out = edge_detect(&flat, EdgeMethod::Neon, 1.0, false);
        assert!(out.pixels().all(|p| p[0] == 255));
    }
}
