//! File tool tests: loading, re-encoding and validation on disk.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use inkscape_mcp::config::Config;
use inkscape_mcp::tools::file::{dispatch, FileParams};
use inkscape_mcp::tools::ToolContext;
use serde_json::json;
use tempfile::TempDir;

fn ctx() -> ToolContext {
    ToolContext::new(Config::default(), None)
}

fn write_png(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    RgbaImage::from_fn(12, 6, |x, y| Rgba([(x * 20) as u8, (y * 40) as u8, 10, 180])).save(&path).unwrap();
    path
}

fn file(operation: &str, input: &Path, extra: serde_json::Value) -> FileParams {
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
async fn test_load_describes_the_image() {
    let dir = TempDir::new().unwrap();
    let input = write_png(dir.path(), "in.png");

    let result = dispatch(&ctx(), file("load", &input, json!({}))).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.get("width"), Some(&json!(12)));
    assert_eq!(result.get("height"), Some(&json!(6)));
    assert_eq!(result.get("format"), Some(&json!("PNG")));
    assert_eq!(result.get("color_mode"), Some(&json!("RGBA")));
    assert_eq!(result.get("has_alpha"), Some(&json!(true)));
    assert_eq!(result.get("bit_depth"), Some(&json!(8)));
    assert_eq!(result.message, "Loaded 12x6 PNG image");

    let info = dispatch(&ctx(), file("info", &input, json!({}))).await;
    assert_eq!(info.get("format"), result.get("format"));
    assert!(info.get("metadata").is_some());
}

#[tokio::test]
async fn test_convert_without_output_uses_the_new_extension() {
    let dir = TempDir::new().unwrap();
    let input = write_png(dir.path(), "in.png");

    let result = dispatch(&ctx(), file("convert", &input, json!({"format": "jpg", "quality": 80}))).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.get("format"), Some(&json!("jpeg")));
    assert_eq!(result.get("quality"), Some(&json!(80)));

    let converted = dir.path().join("in.jpg");
    assert!(converted.exists());
    assert_eq!(image::ImageFormat::from_path(&converted).unwrap(), image::ImageFormat::Jpeg);
    let decoded = image::open(&converted).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (12, 6));

    let result = dispatch(&ctx(), file("convert", &input, json!({}))).await;
    assert_eq!(result.error.as_deref(), Some("ValueError"));
}

#[tokio::test]
async fn test_save_checks_its_settings() {
    let dir = TempDir::new().unwrap();
    let input = write_png(dir.path(), "in.png");
    let output = dir.path().join("out.jpg");

    let params = file("save", &input, json!({"output_path": output.display().to_string(), "quality": 0}));
    let result = dispatch(&ctx(), params).await;
    assert_eq!(result.error.as_deref(), Some("ValueError"));
    assert!(result.message.contains("quality"), "{}", result.message);

    let tiff = dir.path().join("out.tiff");
    let params = file("save", &input, json!({"output_path": tiff.display().to_string(), "compression": "best"}));
    let result = dispatch(&ctx(), params).await;
    assert_eq!(result.error.as_deref(), Some("NotImplementedError"));

    let result = dispatch(&ctx(), file("save", &input, json!({}))).await;
    assert_eq!(result.error.as_deref(), Some("ValueError"));
    assert!(result.message.contains("output_path"), "{}", result.message);

    assert!(!output.exists());
    assert!(!tiff.exists());
}

#[tokio::test]
async fn test_png_compression_levels() {
    let dir = TempDir::new().unwrap();
    let input = write_png(dir.path(), "in.png");

    for level in ["fast", "default", "best"] {
        let output = dir.path().join(format!("{}.png", level));
        let params = file("save", &input, json!({"output_path": output.display().to_string(), "compression": level}));
        let result = dispatch(&ctx(), params).await;
        assert!(result.success, "{}: {}", level, result.message);
        assert_eq!(image::open(&output).unwrap().to_rgba8(), image::open(&input).unwrap().to_rgba8());
    }
}

#[tokio::test]
async fn test_existing_output_needs_overwrite() {
    let dir = TempDir::new().unwrap();
    let input = write_png(dir.path(), "in.png");
    let output = dir.path().join("taken.png");
    std::fs::write(&output, b"keep me").unwrap();

    let params = file("save", &input, json!({"output_path": output.display().to_string()}));
    let result = dispatch(&ctx(), params).await;
    assert_eq!(result.error.as_deref(), Some("ValueError"));
    assert_eq!(std::fs::read(&output).unwrap(), b"keep me");

    let params = file("save", &input, json!({"output_path": output.display().to_string(), "overwrite": true}));
    let result = dispatch(&ctx(), params).await;
    assert!(result.success, "{}", result.message);
    assert!(image::open(&output).is_ok());
}

#[tokio::test]
async fn test_validate_good_and_broken_files() {
    let dir = TempDir::new().unwrap();
    let good = write_png(dir.path(), "good.png");

    let result = dispatch(&ctx(), file("validate", &good, json!({}))).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.get("valid"), Some(&json!(true)));
    assert_eq!(result.get("width"), Some(&json!(12)));

    let broken = dir.path().join("broken.png");
    std::fs::write(&broken, b"this is not an image").unwrap();
    let result = dispatch(&ctx(), file("validate", &broken, json!({}))).await;
    assert!(!result.success);
    assert_eq!(result.get("valid"), Some(&json!(false)));
    assert!(result.message.starts_with("Validation failed"), "{}", result.message);

    let result = dispatch(&ctx(), file("validate", &dir.path().join("absent.png"), json!({}))).await;
    assert_eq!(result.error.as_deref(), Some("FileNotFoundError"));
}

#[tokio::test]
async fn test_list_formats_needs_no_input() {
    let params: FileParams = serde_json::from_value(json!({"operation": "list_formats"})).unwrap();
    let result = dispatch(&ctx(), params).await;
    assert!(result.success, "{}", result.message);
    let read = result.get("read_formats").and_then(|v| v.as_array()).unwrap();
    assert!(read.contains(&json!("png")));
    assert!(result.get("vector_formats").unwrap().as_array().unwrap().contains(&json!("svg")));
}
