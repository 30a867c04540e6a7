//! Colour tool tests: every adjustment writes a same-sized image.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use inkscape_mcp::config::Config;
use inkscape_mcp::tools::color::{dispatch, operations, ColorParams};
use inkscape_mcp::tools::ToolContext;
use serde_json::json;
use tempfile::TempDir;

fn ctx() -> ToolContext {
    ToolContext::new(Config::default(), None)
}

fn gradient(dir: &Path) -> PathBuf {
    let path = dir.join("gradient.png");
    RgbaImage::from_fn(24, 16, |x, y| Rgba([(x * 10) as u8, (y * 15) as u8, 90, 200])).save(&path).unwrap();
    path
}

fn color(operation: &str, input: &Path, output: &Path, extra: serde_json::Value) -> ColorParams {
    let mut value = json!({
        "operation": operation,
        "input_path": input.display().to_string(),
        "output_path": output.display().to_string(),
    });
    if let (Some(base), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
        base.extend(extra.clone());
    }
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_every_adjustment_keeps_dimensions() {
    let dir = TempDir::new().unwrap();
    let input = gradient(dir.path());

    for op in operations() {
        let extra = match op {
            "curves" => json!({"control_points": [[0.0, 0.1], [0.5, 0.6], [1.0, 0.9]]}),
            "brightness_contrast" => json!({"brightness": 20.0, "contrast": -10.0}),
            "color_balance" => json!({"cyan_red": [10.0, 0.0, -10.0]}),
            "hue_saturation" => json!({"hue": 90.0, "saturation": 20.0}),
            _ => json!({}),
        };
        let output = dir.path().join(format!("{}.png", op));
        let result = dispatch(&ctx(), color(op, &input, &output, extra)).await;
        assert!(result.success, "{}: {}", op, result.message);
        assert_eq!(result.get("operation_applied"), Some(&json!(op)));
        assert_eq!(result.get("width"), Some(&json!(24)), "{}", op);
        assert_eq!(result.get("height"), Some(&json!(16)), "{}", op);

        let written = image::open(&output).unwrap();
        assert_eq!((written.width(), written.height()), (24, 16), "{}", op);
    }
}

#[tokio::test]
async fn test_invert_keeps_alpha() {
    let dir = TempDir::new().unwrap();
    let input = gradient(dir.path());
    let output = dir.path().join("inverted.png");

    let result = dispatch(&ctx(), color("invert", &input, &output, json!({}))).await;
    assert!(result.success, "{}", result.message);

    let written = image::open(&output).unwrap().to_rgba8();
    assert_eq!(*written.get_pixel(2, 3), Rgba([255 - 20, 255 - 45, 255 - 90, 200]));
}

#[tokio::test]
async fn test_threshold_is_black_and_white() {
    let dir = TempDir::new().unwrap();
    let input = gradient(dir.path());
    let output = dir.path().join("bw.png");

    let result = dispatch(&ctx(), color("threshold", &input, &output, json!({"threshold_value": 0.3}))).await;
    assert!(result.success, "{}", result.message);

    let written = image::open(&output).unwrap().to_rgba8();
    assert!(written.pixels().all(|p| (p[0] == 0 || p[0] == 255) && p[0] == p[1] && p[1] == p[2]));
}

#[tokio::test]
async fn test_out_of_range_values_write_nothing() {
    let dir = TempDir::new().unwrap();
    let input = gradient(dir.path());
    let output = dir.path().join("never.png");

    let result = dispatch(&ctx(), color("brightness_contrast", &input, &output, json!({"brightness": 150.0}))).await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("ValueError"));
    assert!(result.message.contains("brightness"), "{}", result.message);

    let result = dispatch(&ctx(), color("posterize", &input, &output, json!({"posterize_levels": 1}))).await;
    assert_eq!(result.error.as_deref(), Some("ValueError"));

    let result = dispatch(&ctx(), color("curves", &input, &output, json!({}))).await;
    assert_eq!(result.error.as_deref(), Some("ValueError"));
    assert!(result.message.contains("control_points"), "{}", result.message);

    assert!(!output.exists());
}

#[tokio::test]
async fn test_existing_output_needs_overwrite() {
    let dir = TempDir::new().unwrap();
    let input = gradient(dir.path());
    let output = dir.path().join("taken.png");
    std::fs::write(&output, b"keep me").unwrap();

    let result = dispatch(&ctx(), color("invert", &input, &output, json!({}))).await;
    assert_eq!(result.error.as_deref(), Some("ValueError"));
    assert_eq!(std::fs::read(&output).unwrap(), b"keep me");

    let result = dispatch(&ctx(), color("invert", &input, &output, json!({"overwrite": true}))).await;
    assert!(result.success, "{}", result.message);
}

#[tokio::test]
async fn test_missing_input_is_reported() {
    let dir = TempDir::new().unwrap();
    let params = color("desaturate", &dir.path().join("absent.png"), &dir.path().join("out.png"), json!({}));
    let result = dispatch(&ctx(), params).await;
    assert_eq!(result.error.as_deref(), Some("FileNotFoundError"));
}
