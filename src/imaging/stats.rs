//! Pixel statistics and quality metrics for the `inkscape_analysis` tool.

use std::collections::HashMap;

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use serde::Serialize;

use super::adjust::luma;
use super::filters::parse_choice;
use crate::error::ToolOutcome;

/// Channel names reported for a decoded image, in buffer order.
pub fn band_names(image: &DynamicImage) -> &'static [&'static str] {
    let color = image.color();
    match (color.channel_count(), color.has_alpha()) {
        (1, _) => &["L"],
        (2, _) => &["L", "A"],
        (3, _) => &["R", "G", "B"],
        _ => &["R", "G", "B", "A"],
    }
}

/// Bands of `image` widened to 8-bit samples, matching [`band_names`].
fn samples(image: &DynamicImage) -> Vec<Vec<u8>> {
    let rgba = image.to_rgba8();
    let pick = |c: usize| rgba.pixels().map(|p| p[c]).collect::<Vec<u8>>();
    match band_names(image).len() {
        1 => vec![image.to_luma8().into_raw()],
        2 => {
            let la = image.to_luma_alpha8();
            vec![la.pixels().map(|p| p[0]).collect(), la.pixels().map(|p| p[1]).collect()]
        }
        3 => (0..3).map(pick).collect(),
        _ => (0..4).map(pick).collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelStats {
    pub min: u8,
    pub max: u8,
    pub mean: f64,
    pub std: f64,
    pub median: u8,
}

pub fn histogram(values: &[u8]) -> Vec<u64> {
    let mut hist = vec![0u64; 256];
    for &v in values {
        hist[v as usize] += 1;
    }
    hist
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn channel_stats(values: &[u8]) -> ChannelStats {
    let hist = histogram(values);
    let n = values.len().max(1) as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
    let half = values.len().saturating_sub(1) / 2;
    let mut seen = 0usize;
    let median = hist
        .iter()
        .position(|&count| {
            seen += count as usize;
            seen > half
        })
        .unwrap_or(0) as u8;
    ChannelStats {
        min: hist.iter().position(|&c| c > 0).unwrap_or(0) as u8,
        max: hist.iter().rposition(|&c| c > 0).unwrap_or(0) as u8,
        mean: round_to(mean, 2),
        std: round_to(var.sqrt(), 2),
        median,
    }
}

/// Per-band statistics keyed by band name.
pub fn statistics(image: &DynamicImage) -> Vec<(&'static str, ChannelStats)> {
    band_names(image).iter().copied().zip(samples(image).iter().map(|v| channel_stats(v))).collect()
}

/// 256-bin histogram per band.
pub fn histograms(image: &DynamicImage) -> Vec<(&'static str, Vec<u64>)> {
    band_names(image).iter().copied().zip(samples(image).iter().map(|v| histogram(v))).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DominantColor {
    pub rgb: [u8; 3],
    pub count: u32,
}

/// Most common colours after shrinking to 100x100 and bucketing each
/// channel to multiples of 32.
pub fn dominant_colors(image: &RgbaImage, top: usize) -> (Vec<DominantColor>, usize) {
    let small = imageops::resize(image, 100, 100, FilterType::Lanczos3);
    let mut counts: HashMap<[u8; 3], u32> = HashMap::new();
    for p in small.pixels() {
        *counts.entry([p[0] / 32 * 32, p[1] / 32 * 32, p[2] / 32 * 32]).or_default() += 1;
    }
    let unique = counts.len();
    let mut ranked: Vec<DominantColor> = counts.into_iter().map(|(rgb, count)| DominantColor { rgb, count }).collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then(a.rgb.cmp(&b.rgb)));
    ranked.truncate(top);
    (ranked, unique)
}

/// Mean of the colour channels per pixel, row-major.
fn gray_plane(image: &RgbaImage) -> Vec<f64> {
    image.pixels().map(|p| (p[0] as f64 + p[1] as f64 + p[2] as f64) / 3.0).collect()
}

fn variance(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let (sum, n) = values.clone().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        return 0.0;
    }
    let mean = sum / n as f64;
    values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64
}

/// Horizontal neighbour differences of a row-major plane.
fn row_diffs(plane: &[f64], width: usize) -> Vec<f64> {
    if width < 2 {
        return Vec::new();
    }
    plane.chunks(width).flat_map(|row| row.windows(2).map(|w| w[1] - w[0])).collect()
}

/// Variance of the 4-neighbour Laplacian with mirrored edges.
pub fn laplacian_variance(image: &RgbaImage) -> f64 {
    let (w, h) = (image.width() as i64, image.height() as i64);
    let plane = gray_plane(image);
    let at = |x: i64, y: i64| {
        let x = if x < 0 { 0 } else if x >= w { w - 1 } else { x };
        let y = if y < 0 { 0 } else if y >= h { h - 1 } else { y };
        plane[(y * w + x) as usize]
    };
    let lap = (0..h).flat_map(|y| (0..w).map(move |x| (x, y))).map(|(x, y)| {
        at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4.0 * at(x, y)
    });
    variance(lap)
}

/// Noise estimate from the spread of horizontal differences.
pub fn noise_estimate(image: &RgbaImage) -> f64 {
    let diffs = row_diffs(&gray_plane(image), image.width() as usize);
    variance(diffs.iter().copied()).sqrt() / 1.4
}

/// Variance of horizontal differences, a cheap focus measure.
pub fn edge_variance(image: &RgbaImage) -> f64 {
    let diffs = row_diffs(&gray_plane(image), image.width() as usize);
    variance(diffs.iter().copied())
}

/// Percentages of blown highlights and crushed shadows, plus mean luma.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exposure {
    pub mean_luminance: f64,
    pub overexposed_percent: f64,
    pub underexposed_percent: f64,
}

pub fn exposure(image: &RgbaImage) -> Exposure {
    let n = (image.width() as f64 * image.height() as f64).max(1.0);
    let (mut sum, mut over, mut under) = (0.0, 0usize, 0usize);
    for p in image.pixels() {
        let l = luma(p) as f64;
        sum += l;
        over += (l > 250.0) as usize;
        under += (l < 5.0) as usize;
    }
    Exposure {
        mean_luminance: sum / n,
        overexposed_percent: over as f64 / n * 100.0,
        underexposed_percent: under as f64 / n * 100.0,
    }
}

fn grade(score: f64, labels: [&'static str; 3], cuts: [f64; 2]) -> &'static str {
    if score > cuts[0] {
        labels[0]
    } else if score > cuts[1] {
        labels[1]
    } else {
        labels[2]
    }
}

/// Sharpness, noise and exposure scores out of 100 plus a weighted total.
pub fn quality(image: &DynamicImage) -> serde_json::Value {
    let rgba = image.to_rgba8();
    let sharpness = laplacian_variance(&rgba);
    let noise = noise_estimate(&rgba);
    let exp = exposure(&rgba);
    let (lo, hi) = rgba
        .pixels()
        .flat_map(|p| p.0.into_iter().take(3))
        .fold((255u8, 0u8), |(lo, hi), v| (lo.min(v), hi.max(v)));

    let sharpness_score = (sharpness / 100.0).min(100.0);
    let noise_score = (100.0 - noise * 2.0).max(0.0);
    let exposure_score = (100.0
        - (exp.mean_luminance - 128.0).abs() * 0.5
        - exp.overexposed_percent
        - exp.underexposed_percent)
        .max(0.0);
    let overall = sharpness_score * 0.4 + noise_score * 0.3 + exposure_score * 0.3;

    serde_json::json!({
        "overall_score": round_to(overall, 1),
        "sharpness": {
            "score": round_to(sharpness_score, 1),
            "value": round_to(sharpness, 2),
            "assessment": grade(sharpness_score, ["Sharp", "Soft", "Blurry"], [60.0, 30.0]),
        },
        "noise": {
            "score": round_to(noise_score, 1),
            "estimate": round_to(noise, 2),
            "assessment": grade(noise_score, ["Clean", "Moderate", "Noisy"], [70.0, 40.0]),
        },
        "exposure": {
            "score": round_to(exposure_score, 1),
            "mean_luminance": round_to(exp.mean_luminance, 1),
            "overexposed_percent": round_to(exp.overexposed_percent, 2),
            "underexposed_percent": round_to(exp.underexposed_percent, 2),
            "dynamic_range": hi.saturating_sub(lo),
            "assessment": grade(exposure_score, ["Good", "Fair", "Poor"], [70.0, 40.0]),
        },
    })
}

/// Pixel difference metrics between two images of equal size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub mse: f64,
    pub psnr: f64,
    pub ssim: f64,
    pub max_difference: u8,
    pub mean_difference: f64,
}

/// Compare the RGB planes of `a` and `b`. `b` is resampled to `a`'s size
/// when they differ. SSIM is computed over the whole image in one window.
pub fn compare(a: &RgbaImage, b: &RgbaImage) -> Comparison {
    let resized;
    let b = if a.dimensions() != b.dimensions() {
        resized = imageops::resize(b, a.width().max(1), a.height().max(1), FilterType::Lanczos3);
        &resized
    } else {
        b
    };
    let rgb = |img: &RgbaImage| img.pixels().flat_map(|p: &Rgba<u8>| p.0.into_iter().take(3)).map(f64::from).collect::<Vec<f64>>();
    let (x, y) = (rgb(a), rgb(b));
    let n = x.len().max(1) as f64;

    let mse = x.iter().zip(&y).map(|(p, q)| (p - q).powi(2)).sum::<f64>() / n;
    let psnr = if mse == 0.0 { f64::INFINITY } else { 10.0 * (255.0f64.powi(2) / mse).log10() };

    let (mx, my) = (x.iter().sum::<f64>() / n, y.iter().sum::<f64>() / n);
    let vx = x.iter().map(|v| (v - mx).powi(2)).sum::<f64>() / n;
    let vy = y.iter().map(|v| (v - my).powi(2)).sum::<f64>() / n;
    let cov = x.iter().zip(&y).map(|(p, q)| (p - mx) * (q - my)).sum::<f64>() / n;
    let (c1, c2) = ((0.01f64 * 255.0).powi(2), (0.03f64 * 255.0).powi(2));
    let ssim = ((2.0 * mx * my + c1) * (2.0 * cov + c2)) / ((mx * mx + my * my + c1) * (vx + vy + c2));

    let diffs = x.iter().zip(&y).map(|(p, q)| (p - q).abs());
    let max_difference = diffs.clone().fold(0.0f64, f64::max) as u8;
    let mean_difference = diffs.sum::<f64>() / n;
    Comparison { mse, psnr, ssim, max_difference, mean_difference }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueCheck {
    Exposure,
    Sharpness,
    Noise,
    Color,
}

pub const ALL_CHECKS: [IssueCheck; 4] = [IssueCheck::Exposure, IssueCheck::Sharpness, IssueCheck::Noise, IssueCheck::Color];

impl IssueCheck {
    pub fn parse(name: &str) -> ToolOutcome<Self> {
        parse_choice(
            name,
            "check type",
            &[
                ("exposure", Self::Exposure),
                ("sharpness", Self::Sharpness),
                ("noise", Self::Noise),
                ("color", Self::Color),
            ],
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            IssueCheck::Exposure => "exposure",
            IssueCheck::Sharpness => "sharpness",
            IssueCheck::Noise => "noise",
            IssueCheck::Color => "color",
        }
    }
}

/// Problems (`issues`) and softer `warnings` found by the requested checks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Findings {
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

pub fn detect_issues(image: &RgbaImage, checks: &[IssueCheck]) -> Findings {
    let mut found = Findings::default();
    for check in checks {
        match check {
            IssueCheck::Exposure => {
                let exp = exposure(image);
                let over = exp.overexposed_percent;
                if over > 5.0 {
                    found.issues.push(format!("Overexposed: {:.1}% of pixels blown out", over));
                } else if over > 1.0 {
                    found.warnings.push(format!("Slight overexposure: {:.1}% clipped highlights", over));
                }
                let under = exp.underexposed_percent;
                if under > 5.0 {
                    found.issues.push(format!("Underexposed: {:.1}% of pixels crushed", under));
                } else if under > 1.0 {
                    found.warnings.push(format!("Slight underexposure: {:.1}% crushed shadows", under));
                }
            }
            IssueCheck::Sharpness => {
                let v = edge_variance(image);
                if v < 100.0 {
                    found.issues.push("Image appears blurry or out of focus".to_string());
                } else if v < 300.0 {
                    found.warnings.push("Image may be slightly soft".to_string());
                }
            }
            IssueCheck::Noise => {
                let noise = noise_estimate(image);
                if noise > 20.0 {
                    found.issues.push(format!("High noise detected (estimate: {:.1})", noise));
                } else if noise > 10.0 {
                    found.warnings.push(format!("Moderate noise detected (estimate: {:.1})", noise));
                }
            }
            IssueCheck::Color => {
                let n = (image.width() as f64 * image.height() as f64).max(1.0);
                let mut means = [0.0f64; 3];
                for p in image.pixels() {
                    for (m, v) in means.iter_mut().zip(p.0) {
                        *m += v as f64;
                    }
                }
                let [r, g, b] = means.map(|m| m / n);
                let bias = (r - g).abs().max((g - b).abs()).max((r - b).abs());
                if bias > 30.0 {
                    let dominant = if r > g && r > b {
                        "Red"
                    } else if g > r && g > b {
                        "Green"
                    } else {
                        "Blue"
                    };
                    found.warnings.push(format!("Possible color cast detected ({} dominant)", dominant));
                }
            }
        }
    }
    found
}
