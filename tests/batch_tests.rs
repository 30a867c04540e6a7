//! Batch orchestrator tests over real directories.

use std::path::Path;

use image::{Rgba, RgbaImage};
use inkscape_mcp::config::Config;
use inkscape_mcp::tools::batch::{dispatch, BatchParams};
use inkscape_mcp::tools::ToolContext;
use serde_json::json;
use tempfile::TempDir;

fn ctx() -> ToolContext {
    ToolContext::new(Config::default(), None)
}

fn write_png(path: &Path, w: u32, h: u32) {
    RgbaImage::from_fn(w, h, |x, y| Rgba([(x * 10) as u8, (y * 10) as u8, 128, 255])).save(path).unwrap();
}

fn batch(operation: &str, input: &Path, output: &Path, pattern: &str) -> BatchParams {
    BatchParams {
        operation: operation.to_string(),
        input_directory: Some(input.display().to_string()),
        output_directory: Some(output.display().to_string()),
        file_pattern: Some(pattern.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_one_corrupt_file_does_not_abort_batch() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    for i in 1..=5 {
        let path = input.path().join(format!("img_{}.png", i));
        if i == 3 {
            std::fs::write(&path, b"not a png at all").unwrap();
        } else {
            write_png(&path, 20, 10);
        }
    }

    let mut params = batch("resize", input.path(), output.path(), "*.png");
    params.width = Some(10);
    let result = dispatch(&ctx(), params).await;

    assert!(!result.success);
    assert_eq!(result.get("total_files"), Some(&json!(5)));
    assert_eq!(result.get("processed"), Some(&json!(4)));
    assert_eq!(result.get("failed"), Some(&json!(1)));
    assert_eq!(result.get("skipped"), Some(&json!(0)));
    let results = result.get("results").and_then(|r| r.as_array()).unwrap();
    assert_eq!(results.len(), 5);
    assert_eq!(results[2]["status"], "failed");
    assert!(results[2]["file"].as_str().unwrap().ends_with("img_3.png"));
    assert_eq!(result.message, "Processed 4/5 files (1 failed, 0 skipped)");

    let resized = image::open(output.path().join("img_1.png")).unwrap();
    assert_eq!((resized.width(), resized.height()), (10, 5));
}

#[tokio::test]
async fn test_existing_outputs_are_skipped() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_png(&input.path().join("a.png"), 8, 8);
    write_png(&input.path().join("b.png"), 8, 8);
    std::fs::write(output.path().join("a.png"), b"keep me").unwrap();

    let mut params = batch("resize", input.path(), output.path(), "*.png");
    params.height = Some(4);
    let result = dispatch(&ctx(), params).await;

    assert!(result.success);
    assert_eq!(result.get("processed"), Some(&json!(1)));
    assert_eq!(result.get("skipped"), Some(&json!(1)));
    assert_eq!(std::fs::read(output.path().join("a.png")).unwrap(), b"keep me");
    let results = result.get("results").and_then(|r| r.as_array()).unwrap();
    assert_eq!(results[0]["reason"], "exists");
}

#[tokio::test]
async fn test_brace_pattern_and_convert() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_png(&input.path().join("one.png"), 6, 6);
    RgbaImage::from_pixel(6, 6, Rgba([10, 20, 30, 255])).save(input.path().join("two.bmp")).unwrap();
    std::fs::write(input.path().join("notes.txt"), "ignored").unwrap();

    let mut params = batch("convert", input.path(), output.path(), "*.{png,bmp,txt}");
    params.output_format = Some("jpg".into());
    let result = dispatch(&ctx(), params).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.get("total_files"), Some(&json!(2)));
    assert!(output.path().join("one.jpg").exists());
    assert!(output.path().join("two.jpg").exists());
}

#[tokio::test]
async fn test_optimize_terminates_at_quality_floor() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let noisy = RgbaImage::from_fn(96, 96, |x, y| {
        let v = ((x * 7919 + y * 104_729) % 251) as u8;
        Rgba([v, v.wrapping_mul(7), v.wrapping_add(77), 255])
    });
    image::DynamicImage::ImageRgba8(noisy).to_rgb8().save(input.path().join("noisy.jpg")).unwrap();

    let mut params = batch("optimize", input.path(), output.path(), "*.jpg");
    params.optimize_max_size_kb = Some(1);
    let result = dispatch(&ctx(), params).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.get("processed"), Some(&json!(1)));
    assert!(output.path().join("noisy.jpg").exists());
}

#[tokio::test]
async fn test_rename_copies_with_pattern() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_png(&input.path().join("b.png"), 4, 4);
    write_png(&input.path().join("a.png"), 4, 4);

    let mut params = batch("rename", input.path(), output.path(), "*.png");
    params.rename_pattern = Some("photo_{index:03d}".into());
    let result = dispatch(&ctx(), params).await;

    assert!(result.success);
    assert!(output.path().join("photo_001.png").exists());
    assert!(output.path().join("photo_002.png").exists());
    assert!(input.path().join("a.png").exists());
}

#[tokio::test]
async fn test_recursive_keeps_relative_layout() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    std::fs::create_dir(input.path().join("nested")).unwrap();
    write_png(&input.path().join("nested").join("deep.png"), 4, 4);
    write_png(&input.path().join("top.png"), 4, 4);

    let mut params = batch("process", input.path(), output.path(), "*.png");
    params.recursive = Some(true);
    params.operations_chain = Some(serde_json::from_value(json!([{"operation": "rotate", "angle": 90}])).unwrap());
    let result = dispatch(&ctx(), params).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.get("processed"), Some(&json!(2)));
    assert!(output.path().join("nested").join("deep.png").exists());
}

#[tokio::test]
async fn test_validation_happens_before_work() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_png(&input.path().join("a.png"), 4, 4);

    let result = dispatch(&ctx(), batch("resize", input.path(), output.path(), "*.png")).await;
    assert_eq!(result.error.as_deref(), Some("ValueError"));

    let mut params = batch("watermark", input.path(), output.path(), "*.png");
    params.watermark_path = Some(input.path().join("missing.png").display().to_string());
    let result = dispatch(&ctx(), params).await;
    assert_eq!(result.error.as_deref(), Some("FileNotFoundError"));

    let mut params = batch("resize", input.path(), output.path(), "*.png");
    params.width = Some(2);
    params.max_workers = Some(9);
    assert_eq!(dispatch(&ctx(), params).await.error.as_deref(), Some("ValueError"));

    let missing = input.path().join("nope");
    let result = dispatch(&ctx(), batch("convert", &missing, output.path(), "*.png")).await;
    assert_eq!(result.error.as_deref(), Some("FileNotFoundError"));
}

#[tokio::test]
async fn test_empty_match_succeeds() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let result = dispatch(&ctx(), batch("convert", input.path(), output.path(), "*.png")).await;
    assert!(result.success);
    assert_eq!(result.message, "No matching files found");
    assert_eq!(result.get("total_files"), Some(&json!(0)));
}

#[tokio::test]
async fn test_oversized_optimize_target_is_rejected() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_png(&input.path().join("a.png"), 4, 4);

    let mut params = batch("optimize", input.path(), output.path(), "*.png");
    params.optimize_max_size_kb = Some(u64::MAX / 512);
    let result = dispatch(&ctx(), params).await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("ValueError"));
    assert!(result.message.contains("optimize_max_size_kb"), "{}", result.message);
    assert!(!output.path().join("a.png").exists());
}
