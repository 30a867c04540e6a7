//! Uniform result record returned by every tool.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ToolError, ToolOutcome};

/// The envelope an agent receives for every call, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub operation: String,
    pub message: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    pub execution_time_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn failure(operation: &str, err: &ToolError) -> Self {
        Self {
            success: false,
            operation: operation.to_string(),
            message: err.to_string(),
            data: Map::new(),
            execution_time_ms: 0.0,
            error: Some(err.tag().to_string()),
        }
    }

    /// Build the envelope from a handler outcome, stamping the elapsed time.
    pub fn from_outcome(operation: &str, started: Instant, outcome: ToolOutcome<Outcome>) -> Self {
        let mut result = match outcome {
            Ok(out) => Self {
                success: out.success,
                operation: operation.to_string(),
                message: out.message,
                data: out.data,
                execution_time_ms: 0.0,
                error: None,
            },
            Err(err) => {
                tracing::warn!(operation, error = %err, "operation failed");
                Self::failure(operation, &err)
            }
        };
        result.execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        result
    }

    /// Serialize as pretty JSON for transport.
    pub fn to_json(&self) -> String {
        // A map of JSON values with string keys always serializes.
        serde_json::to_string_pretty(self).unwrap_or_else(|_| String::from("{}"))
    }

    /// Look up a data field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

/// What a handler produces on success, before timing is attached.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
    pub data: Map<String, Value>,
}

impl Outcome {
    pub fn new(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), data: Map::new() }
    }

    /// Attach a data field. Values that fail to serialize are stored as null.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.data.insert(key.to_string(), value);
        self
    }

    /// Mark the outcome as failed while keeping its data (partial batch failure).
    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }
}
