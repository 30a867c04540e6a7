//! Error taxonomy shared by every tool handler.
//!
//! Handlers return `Result<_, ToolError>` and propagate with `?`. The
//! dispatchers convert the error into a failed [`ToolResult`] envelope, so
//! nothing in this enum ever reaches the agent as a raw fault.
//!
//! [`ToolResult`]: crate::envelope::ToolResult

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors produced while validating or executing a tool operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ToolError {
    /// The input file named by a request does not exist.
    #[error("Input file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A parameter is missing, out of range, or names an unknown value.
    #[error("{0}")]
    Validation(String),

    /// The external process did not exit before its deadline.
    #[error("Inkscape operation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The external process exited with a non-zero status.
    #[error("Inkscape exited with code {code}: {stderr}")]
    Execution { code: i32, stderr: String },

    /// The operation exists in the catalog but has no implementation.
    #[error("Operation '{0}' is not supported")]
    Unsupported(String),

    /// No usable Inkscape executable could be located.
    #[error("Inkscape executable not found; install Inkscape or set INKSCAPE_MCP_EXECUTABLE")]
    ExecutableNotFound,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl ToolError {
    /// Shorthand for a validation failure.
    pub fn invalid(message: impl Into<String>) -> Self {
        ToolError::Validation(message.into())
    }

    /// Validation failure for a parameter the operation requires.
    pub fn missing(param: &str, operation: &str) -> Self {
        ToolError::Validation(format!("Parameter '{}' is required for operation '{}'", param, operation))
    }

    /// Machine-readable tag placed in the envelope's `error` field.
    pub fn tag(&self) -> &'static str {
        match self {
            ToolError::FileNotFound(_) => "FileNotFoundError",
            ToolError::Validation(_) => "ValueError",
            ToolError::Timeout(_) => "TimeoutError",
            ToolError::Execution { .. } => "ExecutionError",
            ToolError::Unsupported(_) => "NotImplementedError",
            ToolError::ExecutableNotFound => "ExecutableNotFoundError",
            ToolError::Io(_) => "IOError",
            ToolError::Image(_) => "ImageError",
        }
    }
}

pub type ToolOutcome<T> = Result<T, ToolError>;
