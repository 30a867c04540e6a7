//! Resizing, rotation, cropping and overlay placement for the batch and
//! transform tools.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use super::filters::parse_choice;
use super::kernel::clamp_u8;
use crate::error::{ToolError, ToolOutcome};

/// Gap kept between a watermark and the image edge, in pixels.
pub const WATERMARK_MARGIN: i64 = 10;

/// Target dimensions for a resize request.
///
/// With `maintain_aspect` and both sides given, the image is fitted inside
/// the box; with one side given, the other follows the aspect ratio.
/// Without `maintain_aspect`, a missing side keeps its original length.
/// `None` when neither side is given.
pub fn target_size(original: (u32, u32), width: Option<u32>, height: Option<u32>, maintain_aspect: bool) -> Option<(u32, u32)> {
    let (ow, oh) = (original.0.max(1) as f64, original.1.max(1) as f64);
    let scaled = |v: f64| (v as u32).max(1);
    let size = match (width, height, maintain_aspect) {
        (None, None, _) => return None,
        (w, h, false) => (w.unwrap_or(original.0), h.unwrap_or(original.1)),
        (Some(w), Some(h), true) => {
            let ratio = (w as f64 / ow).min(h as f64 / oh);
            (scaled(ow * ratio), scaled(oh * ratio))
        }
        (Some(w), None, true) => (w, scaled(oh * (w as f64 / ow))),
        (None, Some(h), true) => (scaled(ow * (h as f64 / oh)), h),
    };
    Some((size.0.max(1), size.1.max(1)))
}

pub fn resize(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    imageops::resize(image, width.max(1), height.max(1), FilterType::Lanczos3)
}

/// Resampling used by resize, rotate and perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos,
}

impl Interpolation {
    pub fn parse(name: &str) -> ToolOutcome<Self> {
        parse_choice(
            name,
            "interpolation",
            &[
                ("nearest", Self::Nearest),
                ("bilinear", Self::Bilinear),
                ("bicubic", Self::Bicubic),
                ("lanczos", Self::Lanczos),
            ],
        )
    }

    pub fn filter(self) -> FilterType {
        match self {
            Interpolation::Nearest => FilterType::Nearest,
            Interpolation::Bilinear => FilterType::Triangle,
            Interpolation::Bicubic => FilterType::CatmullRom,
            Interpolation::Lanczos => FilterType::Lanczos3,
        }
    }
}

pub fn resize_with(image: &RgbaImage, width: u32, height: u32, interpolation: Interpolation) -> RgbaImage {
    imageops::resize(image, width.max(1), height.max(1), interpolation.filter())
}

/// Parse a fill colour: `transparent`, `white`, `black` or `#RRGGBB[AA]`.
pub fn parse_fill(value: &str) -> ToolOutcome<Rgba<u8>> {
    let v = value.trim().to_ascii_lowercase();
    match v.as_str() {
        "transparent" | "none" => return Ok(Rgba([0, 0, 0, 0])),
        "white" => return Ok(Rgba([255, 255, 255, 255])),
        "black" => return Ok(Rgba([0, 0, 0, 255])),
        _ => {}
    }
    let hex = v.strip_prefix('#').unwrap_or(&v);
    let byte = |i: usize| hex.get(i..i + 2).and_then(|h| u8::from_str_radix(h, 16).ok());
    match (hex.len(), byte(0), byte(2), byte(4)) {
        (6, Some(r), Some(g), Some(b)) => Ok(Rgba([r, g, b, 255])),
        (8, Some(r), Some(g), Some(b)) => match byte(6) {
            Some(a) => Ok(Rgba([r, g, b, a])),
            None => Err(ToolError::invalid(format!("Invalid fill colour '{}'", value))),
        },
        _ => Err(ToolError::invalid(format!(
            "Invalid fill colour '{}'. Use transparent, white, black or #RRGGBB",
            value
        ))),
    }
}

/// Read the pixel under continuous coordinates `(x, y)`, where pixel
/// `(i, j)` covers `[i, i+1) x [j, j+1)`. Samples off the canvas read `fill`.
pub fn sample(image: &RgbaImage, x: f32, y: f32, interpolation: Interpolation, fill: Rgba<u8>) -> Rgba<u8> {
    let (w, h) = (image.width() as i64, image.height() as i64);
    let at = |ix: i64, iy: i64| {
        if ix >= 0 && iy >= 0 && ix < w && iy < h {
            *image.get_pixel(ix as u32, iy as u32)
        } else {
            fill
        }
    };
    if interpolation == Interpolation::Nearest {
        return at(x.floor() as i64, y.floor() as i64);
    }
    let (fx, fy) = (x - 0.5, y - 0.5);
    let (x0, y0) = (fx.floor(), fy.floor());
    let (tx, ty) = (fx - x0, fy - y0);
    let (x0, y0) = (x0 as i64, y0 as i64);
    let corners = [
        (at(x0, y0), (1.0 - tx) * (1.0 - ty)),
        (at(x0 + 1, y0), tx * (1.0 - ty)),
        (at(x0, y0 + 1), (1.0 - tx) * ty),
        (at(x0 + 1, y0 + 1), tx * ty),
    ];
    let mut out = [0.0f32; 4];
    for (p, weight) in corners {
        for c in 0..4 {
            out[c] += p[c] as f32 * weight;
        }
    }
    Rgba(out.map(clamp_u8))
}

/// Rotate counter-clockwise by `angle_deg`. With `expand` the canvas grows
/// to hold the whole result; otherwise corners are clipped. Uncovered area
/// takes `fill`.
pub fn rotate(image: &RgbaImage, angle_deg: f32, fill: Rgba<u8>, expand: bool, interpolation: Interpolation) -> RgbaImage {
    let turn = angle_deg.rem_euclid(360.0);
    if turn == 0.0 {
        return image.clone();
    } else if expand && turn == 90.0 {
        return imageops::rotate270(image);
    } else if turn == 180.0 {
        return imageops::rotate180(image);
    } else if expand && turn == 270.0 {
        return imageops::rotate90(image);
    }

    let (w, h) = (image.width() as f32, image.height() as f32);
    let (sin, cos) = turn.to_radians().sin_cos();
    let (new_w, new_h) = if expand {
        (
            (w * cos.abs() + h * sin.abs()).ceil().max(1.0) as u32,
            (w * sin.abs() + h * cos.abs()).ceil().max(1.0) as u32,
        )
    } else {
        image.dimensions()
    };
    let (cx, cy) = (w / 2.0, h / 2.0);
    let (ncx, ncy) = (new_w as f32 / 2.0, new_h as f32 / 2.0);

    RgbaImage::from_fn(new_w, new_h, |x, y| {
        let (dx, dy) = (x as f32 + 0.5 - ncx, y as f32 + 0.5 - ncy);
        let sx = dx * cos - dy * sin + cx;
        let sy = dx * sin + dy * cos + cy;
        sample(image, sx, sy, interpolation, fill)
    })
}

/// Rotate counter-clockwise with an expanded, transparent canvas.
pub fn rotate_expand(image: &RgbaImage, angle_deg: f32) -> RgbaImage {
    rotate(image, angle_deg, Rgba([0, 0, 0, 0]), true, Interpolation::Nearest)
}

/// Crop to the rectangle at `(x, y)`, clamped to the image. A missing width
/// or height runs to the edge.
pub fn crop(image: &RgbaImage, x: u32, y: u32, width: Option<u32>, height: Option<u32>) -> ToolOutcome<RgbaImage> {
    let (w, h) = image.dimensions();
    let (x, y) = (x.min(w), y.min(h));
    let x2 = width.map_or(w, |cw| x.saturating_add(cw).min(w));
    let y2 = height.map_or(h, |ch| y.saturating_add(ch).min(h));
    if x2 <= x || y2 <= y {
        return Err(ToolError::invalid(format!(
            "Crop region at ({}, {}) is empty inside a {}x{} image",
            x, y, w, h
        )));
    }
    Ok(imageops::crop_imm(image, x, y, x2 - x, y2 - y).to_image())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipDirection {
    Horizontal,
    Vertical,
}

impl FlipDirection {
    pub fn parse(name: &str) -> ToolOutcome<Self> {
        parse_choice(name, "flip direction", &[("horizontal", Self::Horizontal), ("vertical", Self::Vertical)])
    }
}

pub fn flip(image: &RgbaImage, direction: FlipDirection) -> RgbaImage {
    match direction {
        FlipDirection::Horizontal => imageops::flip_horizontal(image),
        FlipDirection::Vertical => imageops::flip_vertical(image),
    }
}

/// Bounding box `(x, y, width, height)` of the content. With `by_alpha`,
/// content is any pixel that is not fully transparent; otherwise it is any
/// pixel that differs from the top-left corner. `None` for a blank image.
pub fn content_bounds(image: &RgbaImage, by_alpha: bool) -> Option<(u32, u32, u32, u32)> {
    let background = *image.get_pixel_checked(0, 0)?;
    let is_content = |p: &Rgba<u8>| if by_alpha { p[3] != 0 } else { *p != background };
    let (mut x0, mut y0, mut x1, mut y1) = (u32::MAX, u32::MAX, 0u32, 0u32);
    for (x, y, p) in image.enumerate_pixels() {
        if is_content(p) {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
    }
    (x0 != u32::MAX).then(|| (x0, y0, x1 - x0 + 1, y1 - y0 + 1))
}

pub fn autocrop(image: &RgbaImage, by_alpha: bool) -> RgbaImage {
    match content_bounds(image, by_alpha) {
        Some((x, y, w, h)) => imageops::crop_imm(image, x, y, w, h).to_image(),
        None => image.clone(),
    }
}

/// Projective map from the unit square onto a quadrilateral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
    g: f64,
    h: f64,
}

impl Homography {
    /// Map the unit square's corners (top-left, top-right, bottom-right,
    /// bottom-left) onto `quad`. `None` when the quad is degenerate.
    pub fn square_to_quad(quad: [(f64, f64); 4]) -> Option<Self> {
        let [(x0, y0), (x1, y1), (x2, y2), (x3, y3)] = quad;
        let (dx1, dx2, dx3) = (x1 - x2, x3 - x2, x0 - x1 + x2 - x3);
        let (dy1, dy2, dy3) = (y1 - y2, y3 - y2, y0 - y1 + y2 - y3);
        let (g, h) = if dx3.abs() < 1e-12 && dy3.abs() < 1e-12 {
            (0.0, 0.0)
        } else {
            let den = dx1 * dy2 - dx2 * dy1;
            if den.abs() < 1e-12 {
                return None;
            }
            ((dx3 * dy2 - dx2 * dy3) / den, (dx1 * dy3 - dx3 * dy1) / den)
        };
        let map = Self {
            a: x1 - x0 + g * x1,
            b: x3 - x0 + h * x3,
            c: x0,
            d: y1 - y0 + g * y1,
            e: y3 - y0 + h * y3,
            f: y0,
            g,
            h,
        };
        let area = (x1 - x0) * (y3 - y0) - (x3 - x0) * (y1 - y0);
        (area.abs() > 1e-9).then_some(map)
    }

    pub fn apply(&self, u: f64, v: f64) -> (f64, f64) {
        let w = self.g * u + self.h * v + 1.0;
        ((self.a * u + self.b * v + self.c) / w, (self.d * u + self.e * v + self.f) / w)
    }
}

/// Pull the quadrilateral `corners` (top-left, top-right, bottom-right,
/// bottom-left, in source pixels) out to a rectangle the size of the input.
pub fn perspective(image: &RgbaImage, corners: [(f64, f64); 4], interpolation: Interpolation) -> ToolOutcome<RgbaImage> {
    let map = Homography::square_to_quad(corners)
        .ok_or_else(|| ToolError::invalid("Perspective corners must form a non-degenerate quadrilateral"))?;
    let (w, h) = image.dimensions();
    Ok(RgbaImage::from_fn(w, h, |x, y| {
        let (sx, sy) = map.apply((x as f64 + 0.5) / w as f64, (y as f64 + 0.5) / h as f64);
        sample(image, sx as f32, sy as f32, interpolation, Rgba([0, 0, 0, 0]))
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl WatermarkPosition {
    pub fn parse(name: &str) -> ToolOutcome<Self> {
        parse_choice(
            name,
            "watermark position",
            &[
                ("top-left", Self::TopLeft),
                ("top-right", Self::TopRight),
                ("bottom-left", Self::BottomLeft),
                ("bottom-right", Self::BottomRight),
                ("center", Self::Center),
            ],
        )
    }

    /// Top-left corner of a `mark`-sized overlay on a `base`-sized image.
    pub fn origin(self, base: (u32, u32), mark: (u32, u32)) -> (i64, i64) {
        let (bw, bh) = (base.0 as i64, base.1 as i64);
        let (mw, mh) = (mark.0 as i64, mark.1 as i64);
        let m = WATERMARK_MARGIN;
        match self {
            Self::TopLeft => (m, m),
            Self::TopRight => (bw - mw - m, m),
            Self::BottomLeft => (m, bh - mh - m),
            Self::BottomRight => (bw - mw - m, bh - mh - m),
            Self::Center => ((bw - mw) / 2, (bh - mh) / 2),
        }
    }
}

/// Scale `mark` to `scale` of the base width, fade it by `opacity`, and
/// alpha-blend it onto `base`. Returns `false` when the scaled mark would be
/// empty.
pub fn apply_watermark(base: &mut RgbaImage, mark: &RgbaImage, position: WatermarkPosition, opacity: f32, scale: f32) -> bool {
    let mark_w = (base.width() as f32 * scale) as u32;
    if mark_w == 0 || mark.width() == 0 {
        return false;
    }
    let mark_h = (mark.height() as f32 * (mark_w as f32 / mark.width() as f32)) as u32;
    if mark_h == 0 {
        return false;
    }

    let mut scaled = resize(mark, mark_w, mark_h);
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity < 1.0 {
        for p in scaled.pixels_mut() {
            p[3] = (p[3] as f32 * opacity) as u8;
        }
    }
    let (x, y) = position.origin(base.dimensions(), scaled.dimensions());
    imageops::overlay(base, &scaled, x, y);
    true
}
