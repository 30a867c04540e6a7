//! Filter tool tests: every operation keeps dimensions and writes a file.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use inkscape_mcp::config::Config;
use inkscape_mcp::imaging::filters::motion_kernel;
use inkscape_mcp::tools::filter::{dispatch, FilterParams};
use inkscape_mcp::tools::ToolContext;
use serde_json::json;
use tempfile::TempDir;

fn ctx() -> ToolContext {
    ToolContext::new(Config::default(), None)
}

fn gradient(dir: &Path) -> PathBuf {
    let path = dir.join("gradient.png");
    RgbaImage::from_fn(37, 23, |x, y| Rgba([(x * 6) as u8, (y * 11) as u8, ((x + y) * 4) as u8, 255]))
        .save(&path)
        .unwrap();
    path
}

fn filter(operation: &str, input: &Path, output: &Path, extra: serde_json::Value) -> FilterParams {
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
async fn test_every_filter_keeps_dimensions() {
    let dir = TempDir::new().unwrap();
    let input = gradient(dir.path());
    let cases = [
        ("blur", json!({"blur_method": "pixelize", "blur_radius": 4.0})),
        ("blur", json!({"blur_method": "motion", "blur_radius": 3.0, "blur_angle": 30.0})),
        ("sharpen", json!({"sharpen_method": "high_pass"})),
        ("noise", json!({"noise_method": "add", "noise_seed": 7})),
        ("noise", json!({"noise_method": "spread", "noise_amount": 0.3})),
        ("edge_detect", json!({"edge_method": "prewitt", "edge_invert": true})),
        ("artistic", json!({"artistic_effect": "cartoon"})),
        ("artistic", json!({"artistic_effect": "pencil", "artistic_size": 3})),
        ("enhance", json!({"enhance_method": "smooth"})),
        ("distort", json!({"distort_effect": "twirl"})),
        ("light_shadow", json!({"light_effect": "vignette", "light_amount": 0.8})),
    ];

    for (i, (operation, extra)) in cases.into_iter().enumerate() {
        let output = dir.path().join(format!("out_{}.png", i));
        let result = dispatch(&ctx(), filter(operation, &input, &output, extra)).await;
        assert!(result.success, "{} failed: {}", operation, result.message);
        let written = image::open(&output).unwrap();
        assert_eq!((written.width(), written.height()), (37, 23), "{}", operation);
        assert_eq!(result.get("width"), Some(&json!(37)));
    }
}

#[tokio::test]
async fn test_missing_input_and_unknown_method() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.png");

    let result = dispatch(&ctx(), filter("blur", &dir.path().join("absent.png"), &output, json!({}))).await;
    assert_eq!(result.error.as_deref(), Some("FileNotFoundError"));

    let input = gradient(dir.path());
    let result = dispatch(&ctx(), filter("blur", &input, &output, json!({"blur_method": "smudge"}))).await;
    assert_eq!(result.error.as_deref(), Some("ValueError"));
    assert!(result.message.contains("gaussian"));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_overwrite_guard() {
    let dir = TempDir::new().unwrap();
    let input = gradient(dir.path());
    let output = dir.path().join("taken.png");
    std::fs::write(&output, b"x").unwrap();

    let result = dispatch(&ctx(), filter("sharpen", &input, &output, json!({}))).await;
    assert_eq!(result.error.as_deref(), Some("ValueError"));

    let result = dispatch(&ctx(), filter("sharpen", &input, &output, json!({"overwrite": true}))).await;
    assert!(result.success, "{}", result.message);
}

#[tokio::test]
async fn test_jpeg_output_drops_alpha() {
    let dir = TempDir::new().unwrap();
    let input = gradient(dir.path());
    let output = dir.path().join("out.jpg");
    let result = dispatch(&ctx(), filter("enhance", &input, &output, json!({}))).await;
    assert!(result.success, "{}", result.message);
    assert!(!image::open(&output).unwrap().color().has_alpha());
}

#[test]
fn test_motion_kernel_is_normalized() {
    for radius in [1.0_f32, 2.5, 7.0, 15.0] {
        for angle in [0.0_f32, 45.0, 90.0, 200.0] {
            let sum: f32 = motion_kernel(radius, angle).weights.iter().sum();
            assert!((sum - 1.0).abs() < 1e-3, "radius {} angle {} sums to {}", radius, angle, sum);
        }
    }
}
