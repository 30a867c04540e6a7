//! Tonal and colour adjustments used by the `inkscape_color` tool.
//!
//! Adjustments work on RGBA buffers and leave alpha untouched unless a
//! channel selector names it explicitly.

use image::{Rgba, RgbaImage};

use super::filters::parse_choice;
use super::kernel::clamp_u8;
use crate::error::{ToolError, ToolOutcome};

/// Rec. 601 luma, the weighting used for "L" conversions.
pub fn luma(p: &Rgba<u8>) -> f32 {
    0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32
}

/// Which channels a levels or curves adjustment touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Value,
    Red,
    Green,
    Blue,
    Alpha,
}

impl Channel {
    pub fn parse(name: &str) -> ToolOutcome<Self> {
        parse_choice(
            name,
            "channel",
            &[
                ("value", Self::Value),
                ("red", Self::Red),
                ("green", Self::Green),
                ("blue", Self::Blue),
                ("alpha", Self::Alpha),
            ],
        )
    }

    fn indices(self) -> &'static [usize] {
        match self {
            Channel::Value => &[0, 1, 2],
            Channel::Red => &[0],
            Channel::Green => &[1],
            Channel::Blue => &[2],
            Channel::Alpha => &[3],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesaturateMode {
    Luminosity,
    Luma,
    Average,
    Lightness,
}

impl DesaturateMode {
    pub fn parse(name: &str) -> ToolOutcome<Self> {
        parse_choice(
            name,
            "desaturate mode",
            &[
                ("luminosity", Self::Luminosity),
                ("luma", Self::Luma),
                ("average", Self::Average),
                ("lightness", Self::Lightness),
            ],
        )
    }
}

/// Apply a 256-entry lookup table to the selected channels.
pub fn apply_lut(image: &RgbaImage, lut: &[u8; 256], channels: &[usize]) -> RgbaImage {
    let mut out = image.clone();
    for p in out.pixels_mut() {
        for &c in channels {
            p[c] = lut[p[c] as usize];
        }
    }
    out
}

fn map_rgb<F>(image: &RgbaImage, f: F) -> RgbaImage
where
    F: Fn([f32; 3]) -> [f32; 3],
{
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        let [r, g, b] = f([p[0] as f32, p[1] as f32, p[2] as f32]);
        Rgba([clamp_u8(r), clamp_u8(g), clamp_u8(b), p[3]])
    })
}

/// Brightness and contrast on a -100..100 scale, 0 meaning unchanged.
///
/// Brightness scales towards black; contrast scales around the mean luma
/// of the brightened image.
pub fn brightness_contrast(image: &RgbaImage, brightness: f32, contrast: f32) -> RgbaImage {
    let b = (1.0 + brightness / 100.0).max(0.0);
    let bright = map_rgb(image, |[r, g, bl]| [r * b, g * b, bl * b]);

    let count = (bright.width() as f64 * bright.height() as f64).max(1.0);
    let mean = (bright.pixels().map(|p| luma(p).floor() as f64).sum::<f64>() / count + 0.5).floor() as f32;
    let c = (1.0 + contrast / 100.0).max(0.0);
    map_rgb(&bright, |[r, g, bl]| [mean + c * (r - mean), mean + c * (g - mean), mean + c * (bl - mean)])
}

/// Input/output levels with gamma. All points are fractions of full scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Levels {
    pub input_black: f32,
    pub input_white: f32,
    pub gamma: f32,
    pub output_black: f32,
    pub output_white: f32,
}

impl Default for Levels {
    fn default() -> Self {
        Self { input_black: 0.0, input_white: 1.0, gamma: 1.0, output_black: 0.0, output_white: 1.0 }
    }
}

impl Levels {
    pub fn validate(&self) -> ToolOutcome<()> {
        if !(0.1..=10.0).contains(&self.gamma) {
            return Err(ToolError::invalid(format!("gamma must be between 0.1 and 10, got {}", self.gamma)));
        }
        let points = [self.input_black, self.input_white, self.output_black, self.output_white];
        if points.iter().any(|v| !(0.0..=1.0).contains(v)) {
            return Err(ToolError::invalid("levels points must be between 0.0 and 1.0"));
        }
        Ok(())
    }

    pub fn lut(&self) -> [u8; 256] {
        let range = (self.input_white - self.input_black).max(0.001);
        let mut lut = [0u8; 256];
        for (i, slot) in lut.iter_mut().enumerate() {
            let v = ((i as f32 / 255.0 - self.input_black) / range).clamp(0.0, 1.0);
            let v = v.powf(1.0 / self.gamma);
            let v = v * (self.output_white - self.output_black) + self.output_black;
            *slot = clamp_u8(v * 255.0);
        }
        lut
    }
}

pub fn levels(image: &RgbaImage, levels: &Levels, channel: Channel) -> RgbaImage {
    apply_lut(image, &levels.lut(), channel.indices())
}

/// Piecewise-linear curve through `points` (x and y in 0..1). The first and
/// last points are extended flat to the ends of the range.
pub fn curve_lut(points: &[(f32, f32)]) -> [u8; 256] {
    let mut pts: Vec<(f32, f32)> = points.to_vec();
    pts.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut lut = [0u8; 256];
    let (Some(&first), Some(&last)) = (pts.first(), pts.last()) else {
        for (i, slot) in lut.iter_mut().enumerate() {
            *slot = i as u8;
        }
        return lut;
    };
    if first.0 > 0.0 {
        pts.insert(0, (0.0, first.1));
    }
    if last.0 < 1.0 {
        pts.push((1.0, last.1));
    }

    for (i, slot) in lut.iter_mut().enumerate() {
        let x = i as f32 / 255.0;
        let y = pts
            .windows(2)
            .find(|w| w[0].0 <= x && x <= w[1].0)
            .map(|w| {
                let span = w[1].0 - w[0].0;
                if span > 0.0 {
                    w[0].1 + (x - w[0].0) / span * (w[1].1 - w[0].1)
                } else {
                    w[0].1
                }
            })
            .unwrap_or(last.1);
        *slot = clamp_u8((y * 255.0).floor());
    }
    lut
}

pub fn curves(image: &RgbaImage, points: &[(f32, f32)], channel: Channel) -> RgbaImage {
    if points.is_empty() {
        return image.clone();
    }
    apply_lut(image, &curve_lut(points), channel.indices())
}

/// Shift each colour axis separately in shadows, midtones and highlights.
/// Each triple is `(shadows, midtones, highlights)` on a -100..100 scale.
pub fn color_balance(
    image: &RgbaImage,
    cyan_red: [f32; 3],
    magenta_green: [f32; 3],
    yellow_blue: [f32; 3],
    preserve_luminosity: bool,
) -> RgbaImage {
    map_rgb(image, |[r, g, b]| {
        let gray = (r + g + b) / 3.0 / 255.0;
        let shadows = (1.0 - gray * 4.0).clamp(0.0, 1.0);
        let highlights = (gray * 4.0 - 3.0).clamp(0.0, 1.0);
        let midtones = (1.0 - shadows - highlights).clamp(0.0, 1.0);
        let masks = [shadows, midtones, highlights];

        let shift = |axis: [f32; 3]| axis.iter().zip(masks).map(|(adj, m)| adj * 2.55 * m).sum::<f32>();
        let mut out = [r + shift(cyan_red), g + shift(magenta_green), b + shift(yellow_blue)];

        if preserve_luminosity {
            let before = 0.299 * r + 0.587 * g + 0.114 * b;
            let after = 0.299 * out[0] + 0.587 * out[1] + 0.114 * out[2];
            let ratio = if after > 0.0 { before / (after + 1e-6) } else { 1.0 };
            out.iter_mut().for_each(|c| *c *= ratio);
        }
        out
    })
}

/// `(h, s, v)` with hue in degrees and the rest in 0..1.
pub fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let h = if delta <= 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max > 0.0 { delta / max } else { 0.0 };
    (h, s, max)
}

pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let h = h.rem_euclid(360.0) / 60.0;
    let sector = h.floor() as i32 % 6;
    let f = h - h.floor();
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);
    match sector {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

/// HLS to RGB with every component in 0..1.
pub fn hls_to_rgb(h: f32, l: f32, s: f32) -> (f32, f32, f32) {
    if s == 0.0 {
        return (l, l, l);
    }
    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;
    let component = |hue: f32| {
        let hue = hue.rem_euclid(1.0);
        if hue < 1.0 / 6.0 {
            m1 + (m2 - m1) * hue * 6.0
        } else if hue < 0.5 {
            m2
        } else if hue < 2.0 / 3.0 {
            m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
        } else {
            m1
        }
    };
    (component(h + 1.0 / 3.0), component(h), component(h - 1.0 / 3.0))
}

/// Rotate hue by degrees; saturation scales and lightness offsets on a
/// -100..100 scale.
pub fn hue_saturation(image: &RgbaImage, hue: f32, saturation: f32, lightness: f32) -> RgbaImage {
    map_rgb(image, |[r, g, b]| {
        let (h, s, v) = rgb_to_hsv(r / 255.0, g / 255.0, b / 255.0);
        let s = (s * (1.0 + saturation / 100.0)).clamp(0.0, 1.0);
        let v = (v + lightness / 100.0).clamp(0.0, 1.0);
        let (r, g, b) = hsv_to_rgb(h + hue, s, v);
        [r * 255.0, g * 255.0, b * 255.0]
    })
}

/// Replace every hue with `hue` (degrees) at `saturation` (0..100), keeping
/// each pixel's luma as lightness.
pub fn colorize(image: &RgbaImage, hue: f32, saturation: f32, lightness: f32) -> RgbaImage {
    let h = hue.rem_euclid(360.0) / 360.0;
    let s = (saturation / 100.0).clamp(0.0, 1.0);
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        let l = (luma(p).floor() / 255.0 + lightness / 100.0).clamp(0.0, 1.0);
        let (r, g, b) = hls_to_rgb(h, l, s);
        Rgba([clamp_u8(r * 255.0), clamp_u8(g * 255.0), clamp_u8(b * 255.0), p[3]])
    })
}

/// Black or white per pixel; luma strictly above `level * 255` is white.
pub fn threshold(image: &RgbaImage, level: f32) -> RgbaImage {
    let cut = (level.clamp(0.0, 1.0) * 255.0) as u32;
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        let v = if luma(p) as u32 > cut { 255 } else { 0 };
        Rgba([v, v, v, p[3]])
    })
}

/// Keep the top `ceil(log2(levels))` bits of each colour channel.
pub fn posterize(image: &RgbaImage, levels: u32) -> RgbaImage {
    let levels = levels.clamp(2, 256);
    let bits = (levels as f32).log2().ceil().clamp(1.0, 8.0) as u32;
    let mask = !((1u16 << (8 - bits)) - 1) as u8;
    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        *slot = i as u8 & mask;
    }
    apply_lut(image, &lut, &[0, 1, 2])
}

pub fn desaturate(image: &RgbaImage, mode: DesaturateMode) -> RgbaImage {
    map_rgb(image, |[r, g, b]| {
        let v = match mode {
            DesaturateMode::Luminosity => 0.299 * r + 0.587 * g + 0.114 * b,
            DesaturateMode::Luma => 0.2126 * r + 0.7152 * g + 0.0722 * b,
            DesaturateMode::Average => (r + g + b) / 3.0,
            DesaturateMode::Lightness => (r.max(g).max(b) + r.min(g).min(b)) / 2.0,
        }
        .floor();
        [v, v, v]
    })
}

pub fn invert(image: &RgbaImage) -> RgbaImage {
    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        *slot = 255 - i as u8;
    }
    apply_lut(image, &lut, &[0, 1, 2])
}

fn channel_histogram(image: &RgbaImage, c: usize) -> [u64; 256] {
    let mut hist = [0u64; 256];
    for p in image.pixels() {
        hist[p[c] as usize] += 1;
    }
    hist
}

/// Stretch each colour channel so its darkest value maps to 0 and its
/// brightest to 255.
pub fn auto_levels(image: &RgbaImage) -> RgbaImage {
    let mut out = image.clone();
    for c in 0..3 {
        let hist = channel_histogram(image, c);
        let lo = hist.iter().position(|&n| n > 0);
        let hi = hist.iter().rposition(|&n| n > 0);
        let (Some(lo), Some(hi)) = (lo, hi) else { continue };
        if hi <= lo {
            continue;
        }
        let scale = 255.0 / (hi - lo) as f32;
        let mut lut = [0u8; 256];
        for (i, slot) in lut.iter_mut().enumerate() {
            *slot = clamp_u8(((i as f32 - lo as f32) * scale).round());
        }
        out = apply_lut(&out, &lut, &[c]);
    }
    out
}

/// Lookup table that flattens a channel histogram.
pub fn equalize_lut(hist: &[u64; 256]) -> Option<[u8; 256]> {
    let used: Vec<u64> = hist.iter().copied().filter(|&n| n > 0).collect();
    if used.len() <= 1 {
        return None;
    }
    let last = used[used.len() - 1];
    let step = (used.iter().sum::<u64>() - last) / 255;
    if step == 0 {
        return None;
    }
    let mut lut = [0u8; 256];
    let mut n = step / 2;
    for (i, slot) in lut.iter_mut().enumerate() {
        *slot = (n / step).min(255) as u8;
        n += hist[i];
    }
    Some(lut)
}

/// Equalize each colour channel independently.
pub fn auto_color(image: &RgbaImage) -> RgbaImage {
    let mut out = image.clone();
    for c in 0..3 {
        if let Some(lut) = equalize_lut(&channel_histogram(image, c)) {
            out = apply_lut(&out, &lut, &[c]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> RgbaImage {
        RgbaImage::from_fn(16, 4, |x, y| Rgba([(x * 16) as u8, (y * 60) as u8, 128, 200]))
    }

    #[test]
    fn test_neutral_settings_are_identity() {
        let img = ramp();
        assert_eq!(brightness_contrast(&img, 0.0, 0.0), img);
        assert_eq!(levels(&img, &Levels::default(), Channel::Value), img);
        assert_eq!(hue_saturation(&img, 0.0, 0.0, 0.0), img);
        assert_eq!(curves(&img, &[], Channel::Value), img);
    }

    #[test]
    fn test_brightness_darkens_and_keeps_alpha() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([200, 100, 50, 77]));
        let out = brightness_contrast(&img, -50.0, 0.0);
        assert_eq!(*out.get_pixel(0, 0), Rgba([100, 50, 25, 77]));
    }

    #[test]
    fn test_levels_black_point_and_channel() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([64, 64, 64, 255]));
        let lv = Levels { input_black: 0.5, ..Levels::default() };
        assert_eq!(levels(&img, &lv, Channel::Value)[(0, 0)], Rgba([0, 0, 0, 255]));
        assert_eq!(levels(&img, &lv, Channel::Red)[(0, 0)], Rgba([0, 64, 64, 255]));
        assert!(Levels { gamma: 0.0, ..Levels::default() }.validate().is_err());
    }

    #[test]
    fn test_curve_interpolates_between_points() {
        let lut = curve_lut(&[(0.0, 0.0), (0.5, 1.0), (1.0, 1.0)]);
        assert_eq!(lut[0], 0);
        assert_eq!(lut[255], 255);
        assert!(lut[64] > 120 && lut[64] < 135);
        assert_eq!(lut[200], 255);
    }

    #[test]
    fn test_hsv_roundtrip() {
        let (h, s, v) = rgb_to_hsv(1.0, 0.5, 0.0);
        assert!((h - 30.0).abs() < 1e-4);
        let (r, g, b) = hsv_to_rgb(h, s, v);
        assert!((r - 1.0).abs() < 1e-4 && (g - 0.5).abs() < 1e-4 && b.abs() < 1e-4);
    }

    #[test]
    fn test_hue_rotation_swaps_primaries() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 255]));
        assert_eq!(hue_saturation(&img, 120.0, 0.0, 0.0)[(0, 0)], Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_colorize_zero_saturation_is_gray() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 255]));
        let out = colorize(&img, 30.0, 0.0, 0.0);
        let p = out[(0, 0)];
        assert_eq!(p[0], p[1]);
        assert_eq!(p[1], p[2]);
        assert_eq!(p[0], 76);
    }

    #[test]
    fn test_threshold_and_posterize() {
        let img = RgbaImage::from_fn(2, 1, |x, _| if x == 0 { Rgba([40, 40, 40, 255]) } else { Rgba([220, 220, 220, 255]) });
        let out = threshold(&img, 0.5);
        assert_eq!(out[(0, 0)][0], 0);
        assert_eq!(out[(1, 0)][0], 255);

        let poster = posterize(&RgbaImage::from_pixel(1, 1, Rgba([0xff, 0x7f, 0x3f, 9])), 4);
        assert_eq!(poster[(0, 0)], Rgba([0xc0, 0x40, 0x00, 9]));
    }

    #[test]
    fn test_desaturate_modes() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 255]));
        assert_eq!(desaturate(&img, DesaturateMode::Luminosity)[(0, 0)][0], 76);
        assert_eq!(desaturate(&img, DesaturateMode::Average)[(0, 0)][0], 85);
        assert_eq!(desaturate(&img, DesaturateMode::Lightness)[(0, 0)][0], 127);
        assert_eq!(desaturate(&img, DesaturateMode::Luma)[(0, 0)][0], 54);
        assert!(DesaturateMode::parse("sepia").is_err());
    }

    #[test]
    fn test_invert_keeps_alpha() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([0, 100, 255, 30]));
        assert_eq!(invert(&img)[(0, 0)], Rgba([255, 155, 0, 30]));
    }

    #[test]
    fn test_auto_levels_stretches_range() {
        let img = RgbaImage::from_fn(2, 1, |x, _| if x == 0 { Rgba([50, 50, 50, 255]) } else { Rgba([150, 150, 150, 255]) });
        let out = auto_levels(&img);
        assert_eq!(out[(0, 0)][0], 0);
        assert_eq!(out[(1, 0)][0], 255);
    }

    #[test]
    fn test_equalize_single_value_is_identity() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([9, 9, 9, 255]));
        assert_eq!(auto_color(&img), img);
    }

    #[test]
    fn test_color_balance_pushes_red_in_midtones() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([128, 128, 128, 255]));
        let out = color_balance(&img, [0.0, 50.0, 0.0], [0.0; 3], [0.0; 3], false);
        assert!(out[(0, 0)][0] > 200);
        assert_eq!(out[(0, 0)][1], 128);
    }
}
