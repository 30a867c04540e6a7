//! Inkscape command-line invocations.
//!
//! Argument vectors are built by pure functions so they can be asserted in
//! tests; [`InkscapeCli`] runs them as subprocesses under a timeout and a
//! shared concurrency limit.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;
use tokio::sync::Semaphore;

use crate::config::InkscapeConfig;
use crate::error::{ToolError, ToolOutcome};

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Ordered Inkscape action tokens, joined with `;` on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionList(Vec<String>);

impl ActionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, action: impl Into<String>) -> Self {
        self.0.push(action.into());
        self
    }

    /// Select the given ids, or everything when the list is empty.
    pub fn select(self, ids: &[String]) -> Self {
        if ids.is_empty() {
            self.push("select-all")
        } else {
            ids.iter().fold(self, |list, id| list.push(format!("select-by-id:{}", id)))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    pub fn joined(&self) -> String {
        self.0.join(";")
    }
}

/// Options for a file export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Export type such as `png`, `pdf`, `dxf`; inferred from the extension when unset
    pub format: Option<String>,
    pub dpi: Option<u32>,
    /// Restrict the export to one object
    pub export_id: Option<String>,
}

/// One row of `--query-all` output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueriedObject {
    pub id: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// `<input> --batch-process --actions=... [--export-filename=<out> --export-do]`
pub fn action_args(input: &Path, actions: &ActionList, output: Option<&Path>) -> Vec<String> {
    let mut args = vec![path_arg(input), "--batch-process".to_string()];
    if !actions.is_empty() {
        args.push(format!("--actions={}", actions.joined()));
    }
    if let Some(out) = output {
        args.push(format!("--export-filename={}", out.display()));
        args.push("--export-do".to_string());
    }
    args
}

pub fn export_args(input: &Path, output: &Path, options: &ExportOptions) -> Vec<String> {
    let format = options.format.clone().or_else(|| {
        output.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase())
    });

    let mut args = vec![path_arg(input)];
    if let Some(format) = format {
        args.push(format!("--export-type={}", format));
    }
    if let Some(dpi) = options.dpi {
        args.push(format!("--export-dpi={}", dpi));
    }
    if let Some(id) = &options.export_id {
        args.push(format!("--export-id={}", id));
        args.push("--export-id-only".to_string());
    }
    args.push(format!("--export-filename={}", output.display()));
    args
}

/// One `--query-<property>[=<id>]` flag per requested property.
pub fn query_args(input: &Path, object_id: Option<&str>, properties: &[&str]) -> Vec<String> {
    let mut args = vec![path_arg(input)];
    for property in properties {
        match object_id {
            Some(id) => args.push(format!("--query-{}={}", property, id)),
            None => args.push(format!("--query-{}", property)),
        }
    }
    args
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Match query output positionally against the requested properties.
///
/// Values may be separated by commas or line breaks. A missing or
/// non-numeric field maps to `None`.
pub fn parse_query_output(stdout: &str, properties: &[&str]) -> BTreeMap<String, Option<f64>> {
    let fields: Vec<&str> = stdout.trim().split([',', '\n']).map(str::trim).collect();
    properties
        .iter()
        .enumerate()
        .map(|(i, property)| {
            let value = fields.get(i).and_then(|f| f.parse::<f64>().ok());
            (property.to_string(), value)
        })
        .collect()
}

/// Parse `--query-all` rows of the form `id,x,y,width,height`.
pub fn parse_query_all(stdout: &str) -> Vec<QueriedObject> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let mut parts = line.split(',').map(str::trim);
            let id = parts.next().filter(|id| !id.is_empty())?.to_string();
            let mut next = || parts.next().and_then(|v| v.parse::<f64>().ok());
            Some(QueriedObject { id, x: next(), y: next(), width: next(), height: next() })
        })
        .collect()
}

/// Fail with `FileNotFound` unless the input exists.
pub fn ensure_input_exists(path: &Path) -> ToolOutcome<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(ToolError::FileNotFound(path.to_path_buf()))
    }
}

/// Create the output's parent directories.
pub fn prepare_output(path: &Path) -> ToolOutcome<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Handle on an Inkscape executable. Clones share the concurrency limit.
#[derive(Debug, Clone)]
pub struct InkscapeCli {
    executable: PathBuf,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl InkscapeCli {
    pub fn new(executable: impl Into<PathBuf>, timeout: Duration, max_concurrent: usize) -> Self {
        Self {
            executable: executable.into(),
            timeout,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn from_config(executable: impl Into<PathBuf>, config: &InkscapeConfig) -> Self {
        Self::new(executable, config.timeout(), config.max_concurrent_processes)
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn default_timeout(&self) -> Duration {
        self.timeout
    }

    /// Run Inkscape with `args`. Non-zero exit and timeout are errors.
    pub async fn execute(&self, args: &[String], timeout: Option<Duration>) -> ToolOutcome<ProcessOutput> {
        let timeout = timeout.unwrap_or(self.timeout);
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ToolError::invalid("process limiter closed"))?;

        tracing::debug!(executable = %self.executable.display(), ?args, "running inkscape");

        let child = Command::new(&self.executable)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ToolError::ExecutableNotFound,
                _ => ToolError::Io(e),
            })?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(timeout_secs = timeout.as_secs(), "inkscape timed out");
                return Err(ToolError::Timeout(timeout));
            }
        };

        let result = ProcessOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !output.status.success() {
            return Err(ToolError::Execution { code: result.code, stderr: result.stderr.trim().to_string() });
        }
        Ok(result)
    }

    pub async fn execute_actions(
        &self,
        actions: &ActionList,
        input: &Path,
        output: Option<&Path>,
        timeout: Option<Duration>,
    ) -> ToolOutcome<ProcessOutput> {
        ensure_input_exists(input)?;
        if let Some(out) = output {
            prepare_output(out)?;
        }
        self.execute(&action_args(input, actions, output), timeout).await
    }

    pub async fn export(&self, input: &Path, output: &Path, options: &ExportOptions) -> ToolOutcome<ProcessOutput> {
        ensure_input_exists(input)?;
        prepare_output(output)?;
        self.execute(&export_args(input, output, options), None).await
    }

    pub async fn query_object(
        &self,
        input: &Path,
        object_id: Option<&str>,
        properties: &[&str],
    ) -> ToolOutcome<BTreeMap<String, Option<f64>>> {
        ensure_input_exists(input)?;
        let output = self.execute(&query_args(input, object_id, properties), None).await?;
        Ok(parse_query_output(&output.stdout, properties))
    }

    pub async fn query_all(&self, input: &Path) -> ToolOutcome<Vec<QueriedObject>> {
        ensure_input_exists(input)?;
        let output = self.execute(&[path_arg(input), "--query-all".to_string()], None).await?;
        Ok(parse_query_all(&output.stdout))
    }
}
