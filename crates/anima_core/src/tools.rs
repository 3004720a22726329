//! Tool abstraction types: the seam between the mind engine and the agent
//! tool runtime.
//!
//! The engine only *produces* handlers; it never owns a dispatch loop. The
//! host runtime collects `Box<dyn ToolHandler>` values and registers them
//! alongside its other tools.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// JSON tool definition sent to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: ToolInputSchema,
}

/// JSON Schema for tool input parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: Value,
    pub required: Vec<String>,
}

impl ToolInputSchema {
    /// An object schema from a `properties` map and required field names.
    pub fn object(properties: Value, required: &[&str]) -> Self {
        Self {
            schema_type: "object".to_string(),
            properties,
            required: required.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Classification of tool execution errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// Transient: timeout, connection reset — worth retrying.
    Transient,
    /// Permanent: missing param, unknown tool — retrying won't help.
    Permanent,
}

/// Structured result from a tool execution.
///
/// `value` is the JSON document handed back to the model. Handlers report
/// malformed input as a `permanent_error`; they never panic or propagate
/// into the runtime.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub value: Value,
    pub is_error: bool,
    pub error_kind: Option<ToolErrorKind>,
}

impl ToolOutcome {
    pub fn ok(value: Value) -> Self {
        Self { value, is_error: false, error_kind: None }
    }

    /// A plain `{success: true, message}` result.
    pub fn success(message: impl Into<String>) -> Self {
        Self::ok(json!({ "success": true, "message": message.into() }))
    }

    /// A rejected call: `{success: false, message}`, no state mutated.
    pub fn permanent_error(message: impl Into<String>) -> Self {
        Self {
            value: json!({ "success": false, "message": message.into() }),
            is_error: true,
            error_kind: Some(ToolErrorKind::Permanent),
        }
    }

    pub fn transient_error(message: impl Into<String>) -> Self {
        Self {
            value: json!({ "success": false, "message": message.into() }),
            is_error: true,
            error_kind: Some(ToolErrorKind::Transient),
        }
    }
}

/// Trait for tool handlers that can be registered and dispatched.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    /// Unique name used for dispatch (must match the tool name in schema).
    fn name(&self) -> &str;

    /// Human-readable description for logging.
    fn description(&self) -> &str;

    /// JSON schema sent to the LLM so it knows how to call this tool.
    fn schema(&self) -> Tool;

    /// Execute the tool with the given JSON input.
    async fn execute(&self, input: &Value) -> ToolOutcome;
}
