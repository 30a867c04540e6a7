//! Colour quantization using median cut.

use std::collections::HashMap;

use image::{Rgba, RgbaImage};

/// A box of distinct colours with their pixel counts.
#[derive(Debug, Clone)]
struct ColorBox {
    colors: Vec<([u8; 3], u32)>,
}

impl ColorBox {
    /// Channel index (0..3) with the largest value range.
    fn widest_channel(&self) -> usize {
        let mut min = [255u8; 3];
        let mut max = [0u8; 3];
        for (color, _) in &self.colors {
            for c in 0..3 {
                min[c] = min[c].min(color[c]);
                max[c] = max[c].max(color[c]);
            }
        }
        let ranges = [max[0].saturating_sub(min[0]), max[1].saturating_sub(min[1]), max[2].saturating_sub(min[2])];
        if ranges[0] >= ranges[1] && ranges[0] >= ranges[2] {
            0
        } else if ranges[1] >= ranges[2] {
            1
        } else {
            2
        }
    }

    fn range(&self) -> u8 {
        let channel = self.widest_channel();
        let (lo, hi) = self
            .colors
            .iter()
            .fold((255u8, 0u8), |(lo, hi), (c, _)| (lo.min(c[channel]), hi.max(c[channel])));
        hi.saturating_sub(lo)
    }

    /// Split at the pixel-count median of the widest channel.
    fn split(mut self) -> (ColorBox, ColorBox) {
        let channel = self.widest_channel();
        self.colors.sort_by_key(|(color, _)| color[channel]);

        let total: u64 = self.colors.iter().map(|(_, n)| *n as u64).sum();
        let mut running = 0u64;
        let mut split_idx = self.colors.len() / 2;
        for (i, (_, n)) in self.colors.iter().enumerate() {
            running += *n as u64;
            if running >= total / 2 {
                split_idx = i + 1;
                break;
            }
        }
        split_idx = split_idx.clamp(1, self.colors.len() - 1);

        let right = self.colors.split_off(split_idx);
        (ColorBox { colors: self.colors }, ColorBox { colors: right })
    }

    fn average(&self) -> [u8; 3] {
        let total: u64 = self.colors.iter().map(|(_, n)| *n as u64).sum();
        if total == 0 {
            return [0, 0, 0];
        }
        let mut sums = [0u64; 3];
        for (color, n) in &self.colors {
            for c in 0..3 {
                sums[c] += color[c] as u64 * *n as u64;
            }
        }
        [(sums[0] / total) as u8, (sums[1] / total) as u8, (sums[2] / total) as u8]
    }
}

/// Compute a palette of at most `max_colors` entries.
pub fn median_cut_palette(image: &RgbaImage, max_colors: usize) -> Vec<[u8; 3]> {
    let mut counts: HashMap<[u8; 3], u32> = HashMap::new();
    for p in image.pixels() {
        *counts.entry([p[0], p[1], p[2]]).or_insert(0) += 1;
    }
    if counts.is_empty() || max_colors == 0 {
        return Vec::new();
    }

    let mut boxes = vec![ColorBox { colors: counts.into_iter().collect() }];
    while boxes.len() < max_colors {
        // Split the splittable box with the widest range.
        let candidate = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.colors.len() > 1)
            .max_by_key(|(_, b)| b.range())
            .map(|(i, _)| i);
        let Some(index) = candidate else { break };
        let (left, right) = boxes.swap_remove(index).split();
        boxes.push(left);
        boxes.push(right);
    }

    boxes.iter().map(ColorBox::average).collect()
}

fn nearest(palette: &[[u8; 3]], color: [u8; 3]) -> [u8; 3] {
    palette
        .iter()
        .copied()
        .min_by_key(|p| {
            (0..3).map(|c| (p[c] as i32 - color[c] as i32).pow(2)).sum::<i32>()
        })
        .unwrap_or(color)
}

/// Map every pixel to its nearest palette colour, keeping alpha.
pub fn quantize(image: &RgbaImage, max_colors: usize) -> RgbaImage {
    let palette = median_cut_palette(image, max_colors);
    let mut cache: HashMap<[u8; 3], [u8; 3]> = HashMap::new();
    let mut output = image.clone();
    for p in output.pixels_mut() {
        let key = [p[0], p[1], p[2]];
        let mapped = *cache.entry(key).or_insert_with(|| nearest(&palette, key));
        *p = Rgba([mapped[0], mapped[1], mapped[2], p[3]]);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient() -> RgbaImage {
        RgbaImage::from_fn(64, 4, |x, y| Rgba([(x * 4) as u8, (y * 60) as u8, 128, 255]))
    }

    #[test]
    fn test_palette_size_bounded() {
        let palette = median_cut_palette(&gradient(), 8);
        assert_eq!(palette.len(), 8);
    }

    #[test]
    fn test_few_colors_kept() {
        let img = RgbaImage::from_fn(4, 4, |x, _| if x < 2 { Rgba([255, 0, 0, 255]) } else { Rgba([0, 0, 255, 255]) });
        let mut palette = median_cut_palette(&img, 8);
        palette.sort();
        assert_eq!(palette, vec![[0, 0, 255], [255, 0, 0]]);
    }

    #[test]
    fn test_quantize_limits_distinct_colors() {
        let out = quantize(&gradient(), 8);
        let distinct: std::collections::HashSet<[u8; 3]> = out.pixels().map(|p| [p[0], p[1], p[2]]).collect();
        assert!(distinct.len() <= 8);
        assert_eq!(out.dimensions(), (64, 4));
    }
}
