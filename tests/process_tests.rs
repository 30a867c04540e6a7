//! Process wrapper tests against small shell scripts standing in for Inkscape.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use inkscape_mcp::config::Config;
use inkscape_mcp::error::ToolError;
use inkscape_mcp::process::{ActionList, InkscapeCli};
use inkscape_mcp::tools::vector::{dispatch, VectorParams};
use inkscape_mcp::tools::ToolContext;
use serde_json::json;
use serial_test::serial;
use tempfile::TempDir;

fn fake_inkscape(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("inkscape");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn svg(dir: &Path) -> PathBuf {
    let path = dir.join("drawing.svg");
    std::fs::write(&path, r#"<svg xmlns="http://www.w3.org/2000/svg"><rect id="r1" width="5" height="5"/></svg>"#)
        .unwrap();
    path
}

#[tokio::test]
#[serial]
async fn test_query_object_parses_bbox() {
    let dir = TempDir::new().unwrap();
    let cli = InkscapeCli::new(fake_inkscape(dir.path(), "echo 10,20,80,80"), Duration::from_secs(5), 2);
    let values = cli.query_object(&svg(dir.path()), Some("r1"), &["x", "y", "width", "height"]).await.unwrap();
    assert_eq!(values.len(), 4);
    assert_eq!(values["x"], Some(10.0));
    assert_eq!(values["y"], Some(20.0));
    assert_eq!(values["width"], Some(80.0));
    assert_eq!(values["height"], Some(80.0));
}

#[tokio::test]
#[serial]
async fn test_short_query_leaves_missing_values() {
    let dir = TempDir::new().unwrap();
    let cli = InkscapeCli::new(fake_inkscape(dir.path(), "echo 10,20"), Duration::from_secs(5), 1);
    let values = cli.query_object(&svg(dir.path()), Some("r1"), &["x", "y", "width"]).await.unwrap();
    assert_eq!(values["width"], None);
}

#[tokio::test]
#[serial]
async fn test_timeout_kills_process() {
    let dir = TempDir::new().unwrap();
    let cli = InkscapeCli::new(fake_inkscape(dir.path(), "sleep 5"), Duration::from_millis(200), 1);
    let started = std::time::Instant::now();
    let err = cli.execute(&[], None).await.unwrap_err();
    assert!(matches!(err, ToolError::Timeout(_)));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
#[serial]
async fn test_non_zero_exit_carries_stderr() {
    let dir = TempDir::new().unwrap();
    let cli = InkscapeCli::new(fake_inkscape(dir.path(), "echo boom >&2\nexit 3"), Duration::from_secs(5), 1);
    let err = cli.execute(&[], None).await.unwrap_err();
    match err {
        ToolError::Execution { code, stderr } => {
            assert_eq!(code, 3);
            assert_eq!(stderr, "boom");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
#[serial]
async fn test_actions_reach_the_command_line() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("args.txt");
    let exe = fake_inkscape(dir.path(), &format!("echo \"$@\" > '{}'", log.display()));
    let cli = InkscapeCli::new(exe, Duration::from_secs(5), 1);
    let out = dir.path().join("out.svg");
    let actions = ActionList::new().select(&["a".to_string(), "b".to_string()]).push("selection-union");

    cli.execute_actions(&actions, &svg(dir.path()), Some(&out), None).await.unwrap();

    let args = std::fs::read_to_string(&log).unwrap();
    assert!(args.contains("select-by-id:a;select-by-id:b;selection-union"), "{}", args);
    assert!(args.contains("--export-filename"), "{}", args);
}

#[tokio::test]
#[serial]
async fn test_measure_object_through_dispatcher() {
    let dir = TempDir::new().unwrap();
    let cli = InkscapeCli::new(fake_inkscape(dir.path(), "echo 10,20,80,80"), Duration::from_secs(5), 1);
    let ctx = ToolContext::with_cli(Config::default(), cli);
    let params = VectorParams {
        operation: "measure_object".into(),
        input_path: Some(svg(dir.path()).display().to_string()),
        object_id: Some("r1".into()),
        ..Default::default()
    };

    let result = dispatch(&ctx, params).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.get("values"), Some(&json!({"height": 80.0, "width": 80.0, "x": 10.0, "y": 20.0})));
}

#[tokio::test]
#[serial]
async fn test_boolean_without_selection_spawns_nothing() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("ran");
    let exe = fake_inkscape(dir.path(), &format!("touch '{}'", marker.display()));
    let ctx = ToolContext::with_cli(Config::default(), InkscapeCli::new(exe, Duration::from_secs(5), 1));
    let params = VectorParams {
        operation: "apply_boolean".into(),
        input_path: Some(svg(dir.path()).display().to_string()),
        output_path: Some(dir.path().join("out.svg").display().to_string()),
        ..Default::default()
    };

    let result = dispatch(&ctx, params).await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("ValueError"));
    assert!(!marker.exists());
}

#[tokio::test]
#[serial]
async fn test_layers_with_same_label_get_distinct_files() {
    let dir = TempDir::new().unwrap();
    // Creates whatever --export-filename names.
    let exe = fake_inkscape(
        dir.path(),
        r#"for a in "$@"; do case "$a" in --export-filename=*) : > "${a#--export-filename=}";; esac; done"#,
    );
    let ctx = ToolContext::with_cli(Config::default(), InkscapeCli::new(exe, Duration::from_secs(5), 1));
    let input = dir.path().join("layers.svg");
    std::fs::write(
        &input,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape">
  <g inkscape:groupmode="layer" id="layer1" inkscape:label="Detail"/>
  <g inkscape:groupmode="layer" id="layer2" inkscape:label="Detail"/>
  <g inkscape:groupmode="layer" id="layer3" inkscape:label="Background"/>
</svg>"#,
    )
    .unwrap();
    let out = dir.path().join("out");
    let params = VectorParams {
        operation: "layers_to_files".into(),
        input_path: Some(input.display().to_string()),
        output_path: Some(out.display().to_string()),
        ..Default::default()
    };

    let result = dispatch(&ctx, params).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.get("layer_count"), Some(&json!(3)));
    for name in ["Detail.png", "Detail_2.png", "Background.png"] {
        assert!(out.join(name).exists(), "missing {}", name);
    }
}
