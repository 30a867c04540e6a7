use image::imageops::{self, FilterType};
use image::RgbaImage;

use super::parse_choice;
use crate::error::ToolOutcome;
use crate::imaging::kernel::{self, Kernel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurMethod {
    Gaussian,
    Box,
    Motion,
    Pixelize,
}

impl BlurMethod {
    pub fn parse(name: &str) -> ToolOutcome<Self> {
        parse_choice(
            name,
            "blur method",
            &[
                ("gaussian", Self::Gaussian),
                ("box", Self::Box),
                ("motion", Self::Motion),
                ("pixelize", Self::Pixelize),
            ],
        )
    }
}

/// Largest motion blur radius; the kernel is `(2r + 1)^2` weights.
pub const MAX_MOTION_RADIUS: f32 = 100.0;

/// Directional kernel: a line of ones through the centre at `angle_deg`,
/// normalized to unit sum. Side length is `int(2 * radius)` forced odd, with
/// the radius clamped to `0..=MAX_MOTION_RADIUS`.
pub fn motion_kernel(radius: f32, angle_deg: f32) -> Kernel {
    let size = ((radius.clamp(0.0, MAX_MOTION_RADIUS) * 2.0) as usize) | 1;
    let center = (size / 2) as f32;
    let (sin, cos) = angle_deg.to_radians().sin_cos();

    let mut weights = vec![0.0f32; size * size];
    for i in 0..size {
        let t = i as f32 - center;
        // Truncate toward zero like an integer cast of the offset position.
        let x = (center + t * cos).trunc() as i64;
        let y = (center + t * sin).trunc() as i64;
        if x >= 0 && y >= 0 && (x as usize) < size && (y as usize) < size {
            weights[y as usize * size + x as usize] = 1.0;
        }
    }

    let sum: f32 = weights.iter().sum();
    if sum > 0.0 {
        for w in &mut weights {
            *w /= sum;
        }
    } else {
        weights[size * size / 2] = 1.0;
    }
    Kernel::new(size, weights).with_scale(1.0)
}

/// Nearest-neighbour down- then up-sample by `block` pixels.
fn pixelize(image: &RgbaImage, block: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    let block = block.max(1);
    let small = imageops::resize(image, (width / block).max(1), (height / block).max(1), FilterType::Nearest);
    imageops::resize(&small, width, height, FilterType::Nearest)
}

pub fn blur(image: &RgbaImage, method: BlurMethod, radius: f32, angle_deg: f32) -> RgbaImage {
    match method {
        BlurMethod::Gaussian => kernel::gaussian(image, radius),
        BlurMethod::Box => kernel::box_blur(image, radius.max(0.0).round() as u32),
        BlurMethod::Motion => kernel::convolve(image, &motion_kernel(radius, angle_deg)),
        BlurMethod::Pixelize => pixelize(image, radius as u32),
    }
}
