//! Criterion benchmarks for the raster filter handlers
//!
//! Each group runs one filter family over square test images of a few
//! sizes, reporting pixel throughput.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{Rgba, RgbaImage};
use inkscape_mcp::imaging::filters::{
    artistic, blur, distort, edge_detect, light_shadow, noise, sharpen, ArtisticEffect, BlurMethod, DistortEffect,
    EdgeMethod, LightEffect, NoiseMethod, SharpenMethod,
};

// =============================================================================
// Test Data Generators
// =============================================================================

const SIZES: [u32; 3] = [64, 128, 256];

/// Colourful gradient with some high-frequency detail
fn make_image(size: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, y| {
        let checker = if (x / 4 + y / 4) % 2 == 0 { 40 } else { 0 };
        Rgba([(x * 255 / size) as u8, (y * 255 / size) as u8, ((x ^ y) % 200) as u8 + checker, 255])
    })
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_blur(c: &mut Criterion) {
    let mut group = c.benchmark_group("blur");
    for size in SIZES {
        let img = make_image(size);
        group.throughput(Throughput::Elements((size * size) as u64));
        for (name, method) in [("gaussian", BlurMethod::Gaussian), ("box", BlurMethod::Box), ("motion", BlurMethod::Motion)] {
            group.bench_with_input(BenchmarkId::new(name, size), &img, |b, img| {
                b.iter(|| blur(black_box(img), method, 5.0, 30.0))
            });
        }
    }
    group.finish();
}

fn bench_sharpen_and_noise(c: &mut Criterion) {
    let mut group = c.benchmark_group("sharpen_noise");
    for size in SIZES {
        let img = make_image(size);
        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::new("unsharp_mask", size), &img, |b, img| {
            b.iter(|| sharpen(black_box(img), SharpenMethod::UnsharpMask, 1.0, 0.0))
        });
        group.bench_with_input(BenchmarkId::new("add_noise", size), &img, |b, img| {
            b.iter(|| noise(black_box(img), NoiseMethod::Add, 0.1, true, Some(1)))
        });
        group.bench_with_input(BenchmarkId::new("despeckle", size), &img, |b, img| {
            b.iter(|| noise(black_box(img), NoiseMethod::Despeckle, 0.1, true, None))
        });
    }
    group.finish();
}

fn bench_edges_and_effects(c: &mut Criterion) {
    let mut group = c.benchmark_group("effects");
    for size in SIZES {
        let img = make_image(size);
        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::new("sobel", size), &img, |b, img| {
            b.iter(|| edge_detect(black_box(img), EdgeMethod::Sobel, 1.0, false))
        });
        group.bench_with_input(BenchmarkId::new("cartoon", size), &img, |b, img| {
            b.iter(|| artistic(black_box(img), ArtisticEffect::Cartoon, 8, 0.5))
        });
        group.bench_with_input(BenchmarkId::new("twirl", size), &img, |b, img| {
            b.iter(|| distort(black_box(img), DistortEffect::Twirl, 10.0, 20.0))
        });
        group.bench_with_input(BenchmarkId::new("vignette", size), &img, |b, img| {
            b.iter(|| light_shadow(black_box(img), LightEffect::Vignette, 0.5))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_blur, bench_sharpen_and_noise, bench_edges_and_effects);
criterion_main!(benches);
