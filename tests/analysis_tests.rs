//! Analysis tool tests: read-only reports over real files.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use inkscape_mcp::config::Config;
use inkscape_mcp::tools::analysis::{dispatch, AnalysisParams};
use inkscape_mcp::tools::ToolContext;
use serde_json::json;
use tempfile::TempDir;

fn ctx() -> ToolContext {
    ToolContext::new(Config::default(), None)
}

fn write_png(dir: &Path, name: &str, image: RgbaImage) -> PathBuf {
    let path = dir.join(name);
    image.save(&path).unwrap();
    path
}

fn gradient(dir: &Path, name: &str) -> PathBuf {
    write_png(dir, name, RgbaImage::from_fn(32, 16, |x, y| Rgba([(x * 8) as u8, (y * 16) as u8, 128, 255])))
}

fn analysis(operation: &str, input: &Path, extra: serde_json::Value) -> AnalysisParams {
    let mut value = json!({
        "operation": operation,
        "input_path": input.display().to_string(),
    });
    if let (Some(base), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
        base.extend(extra.clone());
    }
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_statistics_per_channel() {
    let dir = TempDir::new().unwrap();
    let input = write_png(dir.path(), "flat.png", RgbaImage::from_pixel(8, 4, Rgba([10, 20, 30, 255])));

    let result = dispatch(&ctx(), analysis("statistics", &input, json!({"include_color_info": false}))).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.get("mode"), Some(&json!("RGBA")));
    assert_eq!(result.get("channels"), Some(&json!(4)));
    assert_eq!(result.get("total_pixels"), Some(&json!(32)));
    assert_eq!(result.get("dimensions"), Some(&json!({"width": 8, "height": 4})));
    assert!(result.get("color_info").is_none());

    let stats = &result.get("channel_statistics").unwrap()["G"];
    assert_eq!(stats["min"], json!(20));
    assert_eq!(stats["max"], json!(20));
    assert_eq!(stats["median"], json!(20));

    let histogram = &result.get("histogram").unwrap()["B"];
    assert_eq!(histogram[30], json!(32));
}

#[tokio::test]
async fn test_histogram_has_a_band_per_channel() {
    let dir = TempDir::new().unwrap();
    let input = gradient(dir.path(), "in.png");

    let result = dispatch(&ctx(), analysis("histogram", &input, json!({}))).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.get("channels"), Some(&json!(["R", "G", "B", "A"])));
    assert_eq!(result.get("bins"), Some(&json!(256)));

    let alpha = result.get("histograms").unwrap()["A"].as_array().unwrap();
    assert_eq!(alpha.len(), 256);
    assert_eq!(alpha[255], json!(32 * 16));
}

#[tokio::test]
async fn test_quality_scores_are_bounded() {
    let dir = TempDir::new().unwrap();
    let input = gradient(dir.path(), "in.png");

    let result = dispatch(&ctx(), analysis("quality", &input, json!({}))).await;
    assert!(result.success, "{}", result.message);
    let overall = result.get("overall_score").and_then(|v| v.as_f64()).unwrap();
    assert!((0.0..=100.0).contains(&overall), "{}", overall);
    assert!(result.message.starts_with("Quality score:"), "{}", result.message);
    assert!(result.get("path").is_some());
}

#[tokio::test]
async fn test_compare_identical_and_different() {
    let dir = TempDir::new().unwrap();
    let input = gradient(dir.path(), "a.png");
    let same = gradient(dir.path(), "b.png");

    let params = analysis("compare", &input, json!({"compare_path": same.display().to_string()}));
    let result = dispatch(&ctx(), params).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.get("psnr"), Some(&json!(null)));
    assert_eq!(result.get("identical"), Some(&json!(true)));
    assert_eq!(result.get("resized"), Some(&json!(false)));
    assert!(result.message.contains("inf dB"), "{}", result.message);

    let other = write_png(dir.path(), "c.png", RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 255])));
    let params = analysis("compare", &input, json!({"compare_path": other.display().to_string()}));
    let result = dispatch(&ctx(), params).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.get("identical"), Some(&json!(false)));
    assert_eq!(result.get("resized"), Some(&json!(true)));
    assert!(result.get("psnr").and_then(|v| v.as_f64()).is_some());
}

#[tokio::test]
async fn test_compare_needs_a_second_image() {
    let dir = TempDir::new().unwrap();
    let input = gradient(dir.path(), "a.png");

    let result = dispatch(&ctx(), analysis("compare", &input, json!({}))).await;
    assert_eq!(result.error.as_deref(), Some("ValueError"));
    assert!(result.message.contains("compare_path"), "{}", result.message);

    let absent = dir.path().join("absent.png");
    let params = analysis("compare", &input, json!({"compare_path": absent.display().to_string()}));
    let result = dispatch(&ctx(), params).await;
    assert_eq!(result.error.as_deref(), Some("FileNotFoundError"));
}

#[tokio::test]
async fn test_detect_issues_on_a_black_frame() {
    let dir = TempDir::new().unwrap();
    let input = write_png(dir.path(), "black.png", RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 255])));

    let result = dispatch(&ctx(), analysis("detect_issues", &input, json!({"check_types": ["exposure"]}))).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.get("issue_count"), Some(&json!(1)));
    assert_eq!(result.get("checks_performed"), Some(&json!(["exposure"])));
    assert!(result.message.starts_with("Found 1 issue(s)"), "{}", result.message);

    let result = dispatch(&ctx(), analysis("detect_issues", &input, json!({"check_types": ["focus"]}))).await;
    assert_eq!(result.error.as_deref(), Some("ValueError"));
}

#[tokio::test]
async fn test_summary_report_is_short() {
    let dir = TempDir::new().unwrap();
    let input = gradient(dir.path(), "photo.png");

    let result = dispatch(&ctx(), analysis("report", &input, json!({"report_format": "summary"}))).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.get("summary").unwrap()["file"], json!("photo.png"));
    assert!(result.get("quality").is_none());

    let result = dispatch(&ctx(), analysis("report", &input, json!({}))).await;
    assert!(result.success, "{}", result.message);
    assert!(result.get("quality").is_some());
    assert_eq!(result.get("metadata").unwrap()["format"], json!("PNG"));

    let result = dispatch(&ctx(), analysis("report", &input, json!({"report_format": "verbose"}))).await;
    assert_eq!(result.error.as_deref(), Some("ValueError"));
}

#[tokio::test]
async fn test_metadata_and_color_profile() {
    let dir = TempDir::new().unwrap();
    let input = gradient(dir.path(), "in.png");

    let result = dispatch(&ctx(), analysis("metadata", &input, json!({}))).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.get("format"), Some(&json!("PNG")));
    assert_eq!(result.get("size"), Some(&json!([32, 16])));

    let result = dispatch(&ctx(), analysis("color_profile", &input, json!({}))).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.get("has_profile"), Some(&json!(false)));
    assert_eq!(result.get("profile"), Some(&json!(null)));
}

#[tokio::test]
async fn test_missing_input_is_reported() {
    let dir = TempDir::new().unwrap();
    let result = dispatch(&ctx(), analysis("statistics", &dir.path().join("absent.png"), json!({}))).await;
    assert_eq!(result.error.as_deref(), Some("FileNotFoundError"));
}
